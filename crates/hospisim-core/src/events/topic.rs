//! Dot-delimited topics and routing patterns.
//!
//! A pattern matches a topic iff both have the same number of segments and every
//! non-wildcard pattern segment equals the topic segment at the same position. `*`
//! stands for exactly one segment; there is no multi-segment wildcard.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::envelope::EventAction;
use crate::error::{CoreError, Result};
use crate::resource::ResourceType;

const WILDCARD: &str = "*";

fn check_segments(raw: &str) -> Result<()> {
    if raw.is_empty() {
        return Err(CoreError::invalid_topic(raw, "must not be empty"));
    }
    if raw.split('.').any(str::is_empty) {
        return Err(CoreError::invalid_topic(raw, "contains an empty segment"));
    }
    Ok(())
}

/// Topic an event is published on: `<service>.<resource-type>.<action>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic(String);

impl Topic {
    pub fn parse(raw: &str) -> Result<Self> {
        check_segments(raw)?;
        Ok(Self(raw.to_string()))
    }

    pub fn for_resource(service: &str, resource_type: ResourceType, action: EventAction) -> Self {
        Self(format!(
            "{}.{}.{}",
            service.to_ascii_lowercase(),
            resource_type.topic_segment(),
            action
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternSegment {
    Literal(String),
    Wildcard,
}

/// Routing pattern with single-segment `*` wildcards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicPattern {
    raw: String,
    segments: Vec<PatternSegment>,
}

impl TopicPattern {
    pub fn parse(raw: &str) -> Result<Self> {
        check_segments(raw)?;
        let segments = raw
            .split('.')
            .map(|segment| match segment {
                WILDCARD => PatternSegment::Wildcard,
                literal => PatternSegment::Literal(literal.to_string()),
            })
            .collect();
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[PatternSegment] {
        &self.segments
    }

    /// Matches a raw routing key. Keys are not validated, so an empty segment in the
    /// key can only match a wildcard.
    pub fn matches(&self, routing_key: &str) -> bool {
        let mut parts = routing_key.split('.');
        for segment in &self.segments {
            match (segment, parts.next()) {
                (_, None) => return false,
                (PatternSegment::Wildcard, Some(_)) => {}
                (PatternSegment::Literal(expected), Some(actual)) => {
                    if expected != actual {
                        return false;
                    }
                }
            }
        }
        parts.next().is_none()
    }

    pub fn matches_topic(&self, topic: &Topic) -> bool {
        self.matches(topic.as_str())
    }
}

impl fmt::Display for TopicPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for TopicPattern {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for TopicPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for TopicPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TopicPattern::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(raw: &str) -> TopicPattern {
        TopicPattern::parse(raw).unwrap()
    }

    #[test]
    fn wildcards_match_one_segment_each() {
        let p = pattern("pas.*.adt.*");
        assert!(p.matches("pas.encounter.adt.a01"));
        assert!(p.matches("pas.patient.adt.a08"));
        assert!(!p.matches("ehr.encounter.adt.a01"));
    }

    #[test]
    fn segment_count_must_be_equal() {
        let p = pattern("pas.*.adt.*");
        assert!(!p.matches("pas.encounter.adt"));
        assert!(!p.matches("pas.encounter.adt.a01.extra"));
        assert!(!pattern("*").matches("a.b"));
        assert!(pattern("*").matches("anything"));
    }

    #[test]
    fn literal_pattern_is_exact() {
        let p = pattern("ehr.servicerequest.created");
        assert!(p.matches("ehr.servicerequest.created"));
        assert!(!p.matches("ehr.servicerequest.updated"));
        assert!(!p.matches("ehr.ServiceRequest.created"));
    }

    #[test]
    fn rejects_empty_segments() {
        assert!(TopicPattern::parse("").is_err());
        assert!(TopicPattern::parse("a..b").is_err());
        assert!(TopicPattern::parse(".a").is_err());
        assert!(Topic::parse("ehr.patient.").is_err());
    }

    #[test]
    fn resource_topics() {
        let topic = Topic::for_resource("ehr", ResourceType::Patient, EventAction::Created);
        assert_eq!(topic.as_str(), "ehr.patient.created");
        assert_eq!(topic.segments().count(), 3);
        assert!(pattern("ehr.*.created").matches_topic(&topic));
    }

    #[test]
    fn serde_round_trips_as_string() {
        let p: TopicPattern = serde_json::from_str("\"lis.diagnosticreport.*\"").unwrap();
        assert_eq!(p.segments().len(), 3);
        assert_eq!(serde_json::to_string(&p).unwrap(), "\"lis.diagnosticreport.*\"");
        assert!(serde_json::from_str::<TopicPattern>("\"a..b\"").is_err());
    }
}
