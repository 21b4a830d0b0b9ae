//! The message router: one long-lived consumer, one message at a time.
//!
//! Per message: count it, union the destinations of every matching rule, forward to
//! each, then record a log entry. A destination missing from the registry is skipped
//! with a warning. A forwarding failure stops forwarding for that message, marks the
//! entry `error` and counts it; the message is still considered handled. Nothing is
//! retried.

use std::sync::Arc;

use arc_swap::ArcSwap;
use hospisim_core::now_utc;
use metrics::counter;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::error::RouterError;
use super::forward::{Forwarder, SimulatedForwarder};
use super::log::{MessageLog, MessageStatus, RouterLogEntry};
use super::mirror::{LogMirror, LogMirrorError};
use super::registry::{ServiceHealth, ServiceRegistry};
use super::rules::{RoutingRule, RoutingTable};
use super::stats::{RouterStats, RouterStatsSnapshot};
use crate::broker::InboundMessage;
use crate::metrics::names;

pub struct IntegrationEngine {
    rules: ArcSwap<RoutingTable>,
    log: MessageLog,
    stats: RouterStats,
    registry: ServiceRegistry,
    forwarder: Arc<dyn Forwarder>,
    mirror: Option<Arc<dyn LogMirror>>,
}

impl IntegrationEngine {
    /// Engine with simulated forwarding and no log mirror.
    pub fn new(rules: RoutingTable, registry: ServiceRegistry, log_capacity: usize) -> Self {
        Self {
            rules: ArcSwap::from_pointee(rules),
            log: MessageLog::new(log_capacity),
            stats: RouterStats::default(),
            registry,
            forwarder: Arc::new(SimulatedForwarder),
            mirror: None,
        }
    }

    pub fn with_forwarder(mut self, forwarder: Arc<dyn Forwarder>) -> Self {
        self.forwarder = forwarder;
        self
    }

    pub fn with_mirror(mut self, mirror: Arc<dyn LogMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Loads the mirrored log into memory. Returns the number of entries restored.
    pub async fn restore_log(&self) -> Result<usize, LogMirrorError> {
        let Some(mirror) = &self.mirror else {
            return Ok(0);
        };
        let entries = mirror.load_recent().await?;
        self.log.restore(entries);
        Ok(self.log.len())
    }

    /// Parses the payload and routes it. An unparsable payload is recorded as an error.
    pub async fn process_inbound(&self, inbound: &InboundMessage) -> RouterLogEntry {
        match serde_json::from_str::<Value>(&inbound.payload) {
            Ok(message) => self.process(&inbound.routing_key, &message).await,
            Err(e) => {
                self.stats.record_received();
                counter!(names::ROUTER_MESSAGES_RECEIVED).increment(1);
                let entry = new_entry(&inbound.routing_key, &Value::Null);
                self.finish(entry, Err(RouterError::InvalidPayload(e.to_string())))
                    .await
            }
        }
    }

    pub async fn process(&self, routing_key: &str, message: &Value) -> RouterLogEntry {
        self.stats.record_received();
        counter!(names::ROUTER_MESSAGES_RECEIVED).increment(1);

        let mut entry = new_entry(routing_key, message);
        let outcome = self.route(routing_key, message, &mut entry).await;
        self.finish(entry, outcome).await
    }

    async fn route(
        &self,
        routing_key: &str,
        message: &Value,
        entry: &mut RouterLogEntry,
    ) -> Result<(), RouterError> {
        entry.destinations = self.rules.load().destinations_for(routing_key);
        if entry.destinations.is_empty() {
            debug!(topic = routing_key, "no routing rule matched");
        }

        for destination in &entry.destinations {
            match self.registry.url(destination) {
                Some(base_url) => {
                    self.forwarder
                        .forward(destination, base_url, message)
                        .await?
                }
                None => warn!(destination = %destination, "destination not registered, skipping"),
            }
            self.stats.record_routed();
            counter!(names::ROUTER_MESSAGES_ROUTED, "destination" => destination.clone())
                .increment(1);
        }
        Ok(())
    }

    async fn finish(
        &self,
        mut entry: RouterLogEntry,
        outcome: Result<(), RouterError>,
    ) -> RouterLogEntry {
        match outcome {
            Ok(()) => entry.status = MessageStatus::Completed,
            Err(e) => {
                warn!(topic = %entry.routing_key, error = %e, "message routing failed");
                entry.status = MessageStatus::Error;
                entry.error = Some(e.to_string());
                self.stats.record_error();
                counter!(names::ROUTER_ERRORS).increment(1);
            }
        }

        self.log.push(entry.clone());

        if let Some(mirror) = &self.mirror
            && let Err(e) = mirror.append(&entry).await
        {
            self.stats.record_mirror_failure();
            counter!(names::ROUTER_LOG_MIRROR_FAILED).increment(1);
            warn!(mirror = mirror.name(), error = %e, "failed to mirror log entry");
        }
        entry
    }

    /// Adds a rule, replacing any rule with the same pattern.
    pub fn add_rule(
        &self,
        pattern: &str,
        destinations: Vec<String>,
    ) -> Result<RoutingRule, RouterError> {
        let rule = RoutingRule::new(pattern, destinations)?;
        self.rules.rcu(|table| table.with_rule(rule.clone()));
        info!(pattern = %rule.pattern, destinations = ?rule.destinations, "routing rule added");
        Ok(rule)
    }

    pub fn routing_table(&self) -> Arc<RoutingTable> {
        self.rules.load_full()
    }

    pub fn stats(&self) -> RouterStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn recent_messages(&self, limit: usize) -> Vec<RouterLogEntry> {
        self.log.recent(limit)
    }

    pub fn message_count(&self) -> usize {
        self.log.len()
    }

    pub fn message(&self, event_id: &str) -> Option<RouterLogEntry> {
        self.log.find(event_id)
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub async fn check_service_health(&self, name: &str) -> Result<ServiceHealth, RouterError> {
        self.registry.check_health(name).await
    }

    pub fn mirror_name(&self) -> &'static str {
        self.mirror.as_ref().map_or("disabled", |m| m.name())
    }

    pub fn mirror_failures(&self) -> u64 {
        self.stats.mirror_failures()
    }
}

fn new_entry(routing_key: &str, message: &Value) -> RouterLogEntry {
    let field = |name: &str| message.get(name).and_then(Value::as_str).map(str::to_owned);
    RouterLogEntry {
        timestamp: now_utc(),
        routing_key: routing_key.to_string(),
        message_type: field("type"),
        source: field("source"),
        event_id: field("id"),
        destinations: Vec::new(),
        status: MessageStatus::Processing,
        error: None,
    }
}

/// Processes inbound messages sequentially until every sender is dropped.
pub async fn run_consumer(engine: Arc<IntegrationEngine>, mut rx: mpsc::Receiver<InboundMessage>) {
    info!("integration engine consuming messages");
    while let Some(inbound) = rx.recv().await {
        engine.process_inbound(&inbound).await;
    }
    info!("message consumer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use indexmap::IndexMap;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::time::Duration;
    use url::Url;

    fn registry(names: &[&str]) -> ServiceRegistry {
        let services: IndexMap<String, Url> = names
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let url = Url::parse(&format!("http://localhost:{}", 8001 + i)).unwrap();
                (n.to_string(), url)
            })
            .collect();
        ServiceRegistry::new(services, Duration::from_secs(1))
    }

    /// Destinations are comma separated.
    fn engine(rules: &[(&str, &str)]) -> IntegrationEngine {
        let rules = rules
            .iter()
            .map(|(p, d)| RoutingRule::new(p, d.split(',').map(str::to_owned).collect()).unwrap())
            .collect();
        IntegrationEngine::new(
            RoutingTable::new(rules),
            registry(&["ehr", "lis", "ris", "pharmacy", "billing"]),
            1000,
        )
    }

    #[derive(Default)]
    struct RecordingForwarder {
        delivered: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl Forwarder for RecordingForwarder {
        async fn forward(
            &self,
            destination: &str,
            _base_url: &Url,
            _message: &Value,
        ) -> Result<(), RouterError> {
            if self.fail_on.is_some_and(|f| f == destination) {
                return Err(RouterError::Forward {
                    destination: destination.to_string(),
                    message: "connection refused".into(),
                });
            }
            self.delivered.lock().push(destination.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryMirror {
        entries: Mutex<Vec<RouterLogEntry>>,
    }

    #[async_trait]
    impl LogMirror for MemoryMirror {
        async fn append(&self, entry: &RouterLogEntry) -> Result<(), LogMirrorError> {
            self.entries.lock().push(entry.clone());
            Ok(())
        }

        async fn load_recent(&self) -> Result<Vec<RouterLogEntry>, LogMirrorError> {
            Ok(self.entries.lock().clone())
        }

        fn name(&self) -> &'static str {
            "memory"
        }
    }

    fn adt_event() -> Value {
        json!({
            "specVersion": "1.0",
            "type": "org.hl7.fhir.r4.Encounter.adt",
            "source": "pas",
            "id": "evt-1",
            "data": {"resourceType": "Encounter", "id": "enc-1"}
        })
    }

    #[tokio::test]
    async fn routes_to_union_of_matching_rules() {
        let forwarder = Arc::new(RecordingForwarder::default());
        let engine = engine(&[
            ("pas.*.adt.*", "ehr,lis,billing"),
            ("pas.encounter.adt.a01", "ehr,ris"),
        ])
        .with_forwarder(forwarder.clone());

        let entry = engine.process("pas.encounter.adt.a01", &adt_event()).await;

        assert_eq!(entry.status, MessageStatus::Completed);
        assert_eq!(entry.destinations, vec!["ehr", "lis", "billing", "ris"]);
        assert_eq!(entry.event_id.as_deref(), Some("evt-1"));
        assert_eq!(entry.source.as_deref(), Some("pas"));
        assert_eq!(*forwarder.delivered.lock(), vec!["ehr", "lis", "billing", "ris"]);
        assert_eq!(
            engine.stats(),
            RouterStatsSnapshot {
                messages_received: 1,
                messages_routed: 4,
                errors: 0
            }
        );
    }

    #[tokio::test]
    async fn unmatched_topic_completes_with_no_destinations() {
        let engine = engine(&[("pas.*.adt.*", "ehr")]);
        let entry = engine.process("pas.encounter.adt", &adt_event()).await;
        assert_eq!(entry.status, MessageStatus::Completed);
        assert!(entry.destinations.is_empty());
        assert_eq!(engine.stats().messages_routed, 0);
        assert_eq!(engine.message_count(), 1);
    }

    #[tokio::test]
    async fn forward_failure_is_recorded_not_retried() {
        let forwarder = Arc::new(RecordingForwarder {
            fail_on: Some("lis"),
            ..Default::default()
        });
        let engine = engine(&[("ehr.servicerequest.created", "ris,lis,ehr")])
            .with_forwarder(forwarder.clone());

        let entry = engine
            .process("ehr.servicerequest.created", &json!({"id": "evt-9"}))
            .await;

        assert_eq!(entry.status, MessageStatus::Error);
        assert!(entry.error.as_deref().unwrap().contains("lis"));
        assert_eq!(*forwarder.delivered.lock(), vec!["ris"]);
        let stats = engine.stats();
        assert_eq!(stats.messages_received, 1);
        assert_eq!(stats.messages_routed, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(engine.message("evt-9").unwrap().status, MessageStatus::Error);
    }

    #[tokio::test]
    async fn unregistered_destination_is_skipped() {
        let forwarder = Arc::new(RecordingForwarder::default());
        let engine = engine(&[("a.b", "radiology-archive,ehr")]).with_forwarder(forwarder.clone());
        let entry = engine.process("a.b", &json!({"id": "evt-3"})).await;

        assert_eq!(entry.status, MessageStatus::Completed);
        assert_eq!(entry.destinations, vec!["radiology-archive", "ehr"]);
        assert_eq!(*forwarder.delivered.lock(), vec!["ehr"]);
        assert_eq!(
            engine.stats(),
            RouterStatsSnapshot {
                messages_received: 1,
                messages_routed: 2,
                errors: 0
            }
        );
    }

    #[tokio::test]
    async fn invalid_payload_is_logged_as_error() {
        let engine = engine(&[]);
        let entry = engine
            .process_inbound(&InboundMessage {
                routing_key: "ehr.patient.created".into(),
                payload: "{not json".into(),
            })
            .await;
        assert_eq!(entry.status, MessageStatus::Error);
        assert_eq!(entry.routing_key, "ehr.patient.created");
        assert_eq!(engine.stats().messages_received, 1);
        assert_eq!(engine.stats().errors, 1);
    }

    #[tokio::test]
    async fn added_rules_apply_to_later_messages() {
        let engine = engine(&[]);
        assert!(engine.process("lis.specimen.created", &json!({})).await.destinations.is_empty());

        engine
            .add_rule("lis.*.created", vec!["ehr".into()])
            .unwrap();
        engine
            .add_rule("lis.*.created", vec!["pharmacy".into()])
            .unwrap();

        assert_eq!(engine.routing_table().len(), 1);
        let entry = engine.process("lis.specimen.created", &json!({})).await;
        assert_eq!(entry.destinations, vec!["pharmacy"]);
        assert!(engine.add_rule("lis.*.", vec!["ehr".into()]).is_err());
    }

    #[tokio::test]
    async fn mirror_survives_restart() {
        let mirror = Arc::new(MemoryMirror::default());
        let first = engine(&[("a.*", "ehr")]).with_mirror(mirror.clone());
        for n in 0..3 {
            first.process("a.x", &json!({"id": format!("evt-{n}")})).await;
        }

        let second = engine(&[]).with_mirror(mirror);
        assert_eq!(second.restore_log().await.unwrap(), 3);
        let ids: Vec<_> = second
            .recent_messages(10)
            .into_iter()
            .filter_map(|e| e.event_id)
            .collect();
        assert_eq!(ids, vec!["evt-0", "evt-1", "evt-2"]);
        assert_eq!(second.mirror_name(), "memory");
    }

    #[tokio::test]
    async fn consumer_processes_in_order() {
        let engine = Arc::new(engine(&[("*.*.*", "ehr")]));
        let (tx, rx) = mpsc::channel(8);
        let consumer = tokio::spawn(run_consumer(engine.clone(), rx));
        for n in 0..3 {
            tx.send(InboundMessage {
                routing_key: "ehr.patient.created".into(),
                payload: json!({"id": format!("evt-{n}")}).to_string(),
            })
            .await
            .unwrap();
        }
        drop(tx);
        consumer.await.unwrap();

        let ids: Vec<_> = engine
            .recent_messages(10)
            .into_iter()
            .filter_map(|e| e.event_id)
            .collect();
        assert_eq!(ids, vec!["evt-0", "evt-1", "evt-2"]);
    }
}
