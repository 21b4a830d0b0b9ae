//! Delivery of routed messages to destination systems.

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;
use url::Url;

use super::error::RouterError;

#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(
        &self,
        destination: &str,
        base_url: &Url,
        message: &Value,
    ) -> Result<(), RouterError>;
}

/// Logs each delivery instead of calling the destination.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedForwarder;

#[async_trait]
impl Forwarder for SimulatedForwarder {
    async fn forward(
        &self,
        destination: &str,
        base_url: &Url,
        message: &Value,
    ) -> Result<(), RouterError> {
        let message_type = message
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        let event_id = message.get("id").and_then(|v| v.as_str()).unwrap_or("");
        info!(
            destination,
            url = %base_url,
            message_type,
            event_id,
            "forwarding message"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn simulated_delivery_accepts_any_message() {
        let url = Url::parse("http://ehr:8001").unwrap();
        let forwarder = SimulatedForwarder;
        forwarder
            .forward(
                "ehr",
                &url,
                &json!({"type": "org.hl7.fhir.r4.Patient.created", "id": "evt-1"}),
            )
            .await
            .unwrap();
        forwarder.forward("ehr", &url, &json!("bare")).await.unwrap();
    }
}
