//! Known destination systems and on-demand health checks.

use std::time::Duration;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::error::RouterError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceHealth {
    pub service: String,
    /// `healthy` or `unhealthy`
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    services: IndexMap<String, Url>,
    client: reqwest::Client,
    timeout: Duration,
}

impl ServiceRegistry {
    pub fn new(services: IndexMap<String, Url>, timeout: Duration) -> Self {
        Self {
            services,
            client: reqwest::Client::new(),
            timeout,
        }
    }

    /// Parses `name -> base URL` pairs as they appear in configuration.
    pub fn from_config(
        services: &IndexMap<String, String>,
        timeout: Duration,
    ) -> Result<Self, url::ParseError> {
        let parsed = services
            .iter()
            .map(|(name, address)| Ok((name.clone(), Url::parse(address)?)))
            .collect::<Result<IndexMap<_, _>, url::ParseError>>()?;
        Ok(Self::new(parsed, timeout))
    }

    pub fn url(&self, name: &str) -> Option<&Url> {
        self.services.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }

    pub fn services(&self) -> &IndexMap<String, Url> {
        &self.services
    }

    /// `GET <base>/health` with the configured timeout.
    ///
    /// Transport errors, timeouts, non-2xx statuses and non-JSON bodies all report
    /// `unhealthy`; only an unknown name is an error.
    pub async fn check_health(&self, name: &str) -> Result<ServiceHealth, RouterError> {
        let base = self
            .url(name)
            .ok_or_else(|| RouterError::UnknownService(name.to_string()))?;
        let health_url = format!("{}/health", base.as_str().trim_end_matches('/'));
        debug!(service = name, url = %health_url, "probing service health");

        let outcome = async {
            let response = self
                .client
                .get(&health_url)
                .timeout(self.timeout)
                .send()
                .await?
                .error_for_status()?;
            response.json::<Value>().await
        }
        .await;

        Ok(match outcome {
            Ok(body) => ServiceHealth {
                service: name.to_string(),
                status: "healthy",
                response: Some(body),
                error: None,
            },
            Err(e) => ServiceHealth {
                service: name.to_string(),
                status: "unhealthy",
                response: None,
                error: Some(e.to_string()),
            },
        })
    }
}
