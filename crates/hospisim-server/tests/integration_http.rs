//! REST surface of the integration engine.

use std::sync::Arc;
use std::time::Duration;

use assert_json_diff::assert_json_eq;
use hospisim_server::broker::{BrokerState, BrokerStatus, InboundMessage};
use hospisim_server::config::{RouterConfig, ServerConfig};
use hospisim_server::integration::{
    IntegrationEngine, RoutingTable, ServiceRegistry, run_consumer,
};
use hospisim_server::{IntegrationState, build_integration_app};
use indexmap::IndexMap;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn engine_with_services(services: &IndexMap<String, String>) -> Arc<IntegrationEngine> {
    let router = RouterConfig::default();
    let rules = RoutingTable::from_config(&router.rules).unwrap();
    let registry = ServiceRegistry::from_config(services, Duration::from_secs(2)).unwrap();
    Arc::new(IntegrationEngine::new(rules, registry, router.log_capacity))
}

async fn start_engine(
    engine: Arc<IntegrationEngine>,
) -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    start_app(IntegrationState::new(engine, BrokerStatus::new(BrokerState::Disabled))).await
}

async fn start_app(
    state: IntegrationState,
) -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    let app = build_integration_app(state, &ServerConfig::default());

    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });
    (format!("http://{addr}"), tx, server)
}

#[tokio::test]
async fn manual_route_is_logged_and_counted() {
    let engine = engine_with_services(&RouterConfig::default().services);
    let (base, shutdown, handle) = start_engine(engine).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{base}/route"))
        .json(&json!({
            "routing_key": "pas.patient.adt.a01",
            "id": "evt-1",
            "type": "Patient.admitted",
            "source": "pas"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_json_eq!(
        body,
        json!({"status": "routed", "routingKey": "pas.patient.adt.a01"})
    );

    let res: Value = client
        .post(format!("{base}/route"))
        .json(&json!({"note": "no key"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(res["routingKey"], "manual.test.message");

    let messages: Value = client
        .get(format!("{base}/messages"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(messages["total"], 2);
    let first = &messages["messages"][0];
    assert_eq!(first["routingKey"], "pas.patient.adt.a01");
    assert_eq!(first["status"], "completed");
    assert_eq!(first["eventId"], "evt-1");
    assert_eq!(
        first["destinations"],
        json!(["ehr", "lis", "ris", "pharmacy", "billing"])
    );
    assert_eq!(messages["messages"][1]["destinations"], json!([]));

    let one: Value = client
        .get(format!("{base}/messages/evt-1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(one["messageType"], "Patient.admitted");

    let res = client
        .get(format!("{base}/messages/evt-404"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let stats: Value = client
        .get(format!("{base}/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_json_eq!(
        stats,
        json!({
            "stats": {"messagesReceived": 2, "messagesRouted": 5, "errors": 0},
            "routingRules": 6,
            "connectedServices": ["ehr", "lis", "ris", "pharmacy", "pas", "billing"]
        })
    );

    let _ = shutdown.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn rules_can_be_listed_and_added() {
    let engine = engine_with_services(&RouterConfig::default().services);
    let (base, shutdown, handle) = start_engine(engine).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{base}/rules"))
        .json(&json!({"pattern": "ris.*.created", "destinations": ["billing"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let added: Value = res.json().await.unwrap();
    assert_json_eq!(
        added,
        json!({"status": "added", "pattern": "ris.*.created", "destinations": ["billing"]})
    );

    let rules: Value = client
        .get(format!("{base}/rules"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rules["rules"]["ris.*.created"], json!(["billing"]));
    assert_eq!(rules["rules"].as_object().unwrap().len(), 7);

    for bad in [
        json!({"pattern": "ris..created", "destinations": ["billing"]}),
        json!({"pattern": "ris.*", "destinations": []}),
        json!({"pattern": "ris.*"}),
    ] {
        let res = client
            .post(format!("{base}/rules"))
            .json(&bad)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{bad}");
    }

    let _ = shutdown.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn service_health_checks_destination() {
    let healthy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "healthy"})))
        .mount(&healthy)
        .await;
    let failing = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&failing)
        .await;

    let services: IndexMap<String, String> = [
        ("lis".to_string(), healthy.uri()),
        ("ris".to_string(), failing.uri()),
    ]
    .into_iter()
    .collect();
    let (base, shutdown, handle) = start_engine(engine_with_services(&services)).await;
    let client = reqwest::Client::new();

    let lis: Value = client
        .get(format!("{base}/services/lis/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_json_eq!(
        lis,
        json!({"service": "lis", "status": "healthy", "response": {"status": "healthy"}})
    );

    let ris: Value = client
        .get(format!("{base}/services/ris/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ris["status"], "unhealthy");
    assert!(ris["error"].is_string());

    let res = client
        .get(format!("{base}/services/radiology/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let listed: Value = client
        .get(format!("{base}/services"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed["services"]["lis"], healthy.uri());

    let _ = shutdown.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn engine_health_reports_broker_and_mirror() {
    let engine = engine_with_services(&RouterConfig::default().services);
    let (base, shutdown, handle) = start_engine(engine).await;

    let health: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_json_eq!(
        health,
        json!({
            "status": "healthy",
            "service": "integration-engine",
            "broker": "disabled",
            "logMirror": {"backend": "disabled", "failures": 0}
        })
    );

    let _ = shutdown.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn manual_route_is_queued_for_the_consumer() {
    let engine = engine_with_services(&RouterConfig::default().services);
    let (tx, rx) = tokio::sync::mpsc::channel::<InboundMessage>(8);
    let state = IntegrationState::new(engine.clone(), BrokerStatus::new(BrokerState::Disabled))
        .with_inbound(tx.clone());
    let (base, shutdown, handle) = start_app(state).await;
    let client = reqwest::Client::new();

    // Broker traffic already waiting in the queue is routed first.
    tx.send(InboundMessage {
        routing_key: "ehr.patient.created".into(),
        payload: json!({"id": "evt-broker"}).to_string(),
    })
    .await
    .unwrap();
    assert_eq!(engine.message_count(), 0);

    let res = client
        .post(format!("{base}/route"))
        .json(&json!({"routing_key": "pas.patient.adt.a01", "id": "evt-manual"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let consumer = tokio::spawn(run_consumer(engine.clone(), rx));
    tokio::time::timeout(Duration::from_secs(5), async {
        while engine.message_count() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("consumer did not drain the queue");

    let ids: Vec<_> = engine
        .recent_messages(10)
        .into_iter()
        .filter_map(|e| e.event_id)
        .collect();
    assert_eq!(ids, vec!["evt-broker", "evt-manual"]);
    assert_eq!(
        engine.message("evt-manual").unwrap().destinations,
        vec!["ehr", "lis", "ris", "pharmacy", "billing"]
    );

    consumer.abort();
    let _ = shutdown.send(());
    let _ = handle.await;
}
