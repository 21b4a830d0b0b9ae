//! A service and the integration engine sharing an in-process broadcaster.

use std::sync::Arc;
use std::time::Duration;

use hospisim_core::ServiceKind;
use hospisim_core::events::EventBroadcaster;
use hospisim_db_memory::InMemoryStorage;
use hospisim_server::broker::{InboundMessage, forward_broadcast};
use hospisim_server::config::RouterConfig;
use hospisim_server::integration::{
    IntegrationEngine, MessageStatus, RoutingTable, ServiceRegistry, run_consumer,
};
use hospisim_storage::{BroadcastPublisher, ResourceStore};
use serde_json::json;
use tokio::sync::mpsc;

async fn wait_for_messages(engine: &IntegrationEngine, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while engine.message_count() < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("router log did not fill in time");
}

#[tokio::test]
async fn lifecycle_events_reach_the_router_in_order() {
    let router = RouterConfig::default();
    let engine = Arc::new(IntegrationEngine::new(
        RoutingTable::from_config(&router.rules).unwrap(),
        ServiceRegistry::from_config(&router.services, router.health_timeout()).unwrap(),
        router.log_capacity,
    ));
    engine
        .add_rule("ehr.patient.*", vec!["billing".to_string()])
        .unwrap();

    let broadcaster = EventBroadcaster::new_shared();
    let (tx, rx) = mpsc::channel::<InboundMessage>(16);
    let bridge = forward_broadcast(&broadcaster, tx);
    let consumer = tokio::spawn(run_consumer(engine.clone(), rx));

    let store = ResourceStore::new(
        ServiceKind::Ehr,
        Arc::new(InMemoryStorage::new()),
        Arc::new(BroadcastPublisher::new(broadcaster.clone())),
    )
    .unwrap();

    let created = store
        .create(
            "Patient",
            json!({"gender": "female", "birthDate": "1984-02-29"}),
        )
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["meta"]["versionId"], "1");

    let updated = store
        .update("Patient", &id, json!({"gender": "male"}))
        .await
        .unwrap();
    assert_eq!(updated["meta"]["versionId"], "2");
    assert!(updated.get("birthDate").is_none());

    // Deletes are not announced.
    store.delete("Patient", &id).await.unwrap();

    wait_for_messages(&engine, 2).await;
    let log = engine.recent_messages(10);
    let keys: Vec<&str> = log.iter().map(|e| e.routing_key.as_str()).collect();
    assert_eq!(keys, vec!["ehr.patient.created", "ehr.patient.updated"]);
    for entry in &log {
        assert_eq!(entry.status, MessageStatus::Completed);
        assert_eq!(entry.source.as_deref(), Some("ehr"));
        assert_eq!(entry.destinations, vec!["billing".to_string()]);
    }
    assert_eq!(log[0].message_type.as_deref(), Some("org.hl7.fhir.r4.Patient.created"));

    let stats = engine.stats();
    assert_eq!(stats.messages_received, 2);
    assert_eq!(stats.messages_routed, 2);
    assert_eq!(store.publish_stats().published, 2);

    drop(store);
    drop(broadcaster);
    bridge.await.unwrap();
    consumer.await.unwrap();
}
