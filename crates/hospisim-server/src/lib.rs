//! Hospital IT sandbox servers.
//!
//! `hospisim-service` runs one clinical service (ehr, lis, ris, pharmacy, pas or
//! billing) over a versioned resource store. `hospisim-integration-engine` consumes the
//! lifecycle events those services publish and routes them by topic pattern.

pub mod broker;
pub mod config;
pub mod integration;
pub mod metrics;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod service;

pub use config::{AppConfig, RedisConfig, RouterConfig, ServerConfig};
pub use integration::{IntegrationEngine, IntegrationState, init_integration};
pub use observability::{apply_logging_level, init_tracing};
pub use server::{HospisimServer, build_integration_app, build_service_app};
pub use service::{ServiceState, init_service};
