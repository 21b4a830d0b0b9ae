//! Wildcard routing rules.
//!
//! A [`RoutingTable`] is immutable; adding a rule builds a new table that the engine
//! swaps in atomically, so in-flight messages always see one consistent rule set.

use hospisim_core::events::TopicPattern;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use super::error::RouterError;
use crate::config::RuleConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingRule {
    pub pattern: TopicPattern,
    pub destinations: Vec<String>,
}

impl RoutingRule {
    pub fn new(pattern: &str, destinations: Vec<String>) -> Result<Self, RouterError> {
        let pattern = TopicPattern::parse(pattern)?;
        if destinations.is_empty() {
            return Err(RouterError::NoDestinations(pattern.as_str().to_string()));
        }
        Ok(Self {
            pattern,
            destinations,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTable {
    rules: Vec<RoutingRule>,
}

impl RoutingTable {
    pub fn new(rules: Vec<RoutingRule>) -> Self {
        Self { rules }
    }

    pub fn from_config(rules: &[RuleConfig]) -> Result<Self, RouterError> {
        rules
            .iter()
            .map(|r| RoutingRule::new(&r.pattern, r.destinations.clone()))
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    /// Union of the destinations of every matching rule, in first-seen order.
    pub fn destinations_for(&self, routing_key: &str) -> Vec<String> {
        let mut destinations = IndexSet::new();
        for rule in self.rules.iter().filter(|r| r.pattern.matches(routing_key)) {
            destinations.extend(rule.destinations.iter().cloned());
        }
        destinations.into_iter().collect()
    }

    /// A copy of this table with `rule` added, replacing any rule with the same pattern
    /// in place.
    pub fn with_rule(&self, rule: RoutingRule) -> Self {
        let mut rules = self.rules.clone();
        match rules.iter_mut().find(|r| r.pattern == rule.pattern) {
            Some(existing) => *existing = rule,
            None => rules.push(rule),
        }
        Self { rules }
    }

    pub fn rules(&self) -> &[RoutingRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Pattern to destinations, in rule order.
    pub fn to_map(&self) -> IndexMap<String, Vec<String>> {
        self.rules
            .iter()
            .map(|r| (r.pattern.as_str().to_string(), r.destinations.clone()))
            .collect()
    }
}
