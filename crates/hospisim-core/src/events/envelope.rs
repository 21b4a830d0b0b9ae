use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::FHIR_JSON;
use crate::id::generate_id;
use crate::resource::ResourceType;
use crate::time::{FhirDateTime, now_utc};

pub const EVENT_TYPE_PREFIX: &str = "org.hl7.fhir.r4";
pub const SPEC_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    Created,
    Updated,
}

impl EventAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventAction::Created => "created",
            EventAction::Updated => "updated",
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enveloped lifecycle event carrying the full stored document.
///
/// Envelopes are built once per successful create/update and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub spec_version: String,
    #[serde(rename = "type")]
    pub event_type: String,
    /// Name of the emitting service.
    pub source: String,
    pub id: String,
    pub time: FhirDateTime,
    pub content_type: String,
    pub data: Value,
}

impl EventEnvelope {
    pub fn new(
        service: &str,
        resource_type: ResourceType,
        action: EventAction,
        data: Value,
    ) -> Self {
        Self {
            spec_version: SPEC_VERSION.to_string(),
            event_type: format!("{EVENT_TYPE_PREFIX}.{resource_type}.{action}"),
            source: service.to_string(),
            id: generate_id(),
            time: now_utc(),
            content_type: FHIR_JSON.to_string(),
            data,
        }
    }
}
