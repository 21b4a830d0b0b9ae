use hospisim_core::events::TopicPattern;
use hospisim_core::{ResourceType, ServiceKind};
use hospisim_db_postgres::PostgresConfig;
use hospisim_search::SearchSettings;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Which clinical system this process plays (ignored by the integration engine)
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    /// Integration engine settings
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }
        // Service validations
        self.service_kind()?;
        self.resource_types()?;
        // Search validations
        if self.search.default_count == 0 {
            return Err("search.default_count must be > 0".into());
        }
        if self.search.max_count == 0 {
            return Err("search.max_count must be > 0".into());
        }
        if self.search.default_count > self.search.max_count {
            return Err("search.default_count must be <= search.max_count".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // Storage validation
        if self.storage.backend == StorageBackendKind::Postgres {
            let Some(ref pg) = self.storage.postgres else {
                return Err("storage.backend = \"postgres\" requires [storage.postgres]".into());
            };
            if pg.url.is_none() && pg.host.is_empty() {
                return Err("storage.postgres requires either 'url' or 'host' to be set".into());
            }
            if pg.url.is_none() && pg.database.is_empty() {
                return Err("storage.postgres.database must not be empty".into());
            }
            if pg.pool_size == 0 {
                return Err("storage.postgres.pool_size must be > 0".into());
            }
        }
        // Redis validation
        if self.redis.enabled {
            url::Url::parse(&self.redis.url)
                .map_err(|e| format!("redis.url is not a valid URL: {e}"))?;
            if self.redis.pool_size == 0 {
                return Err("redis.pool_size must be > 0".into());
            }
        }
        // Router validations
        if self.router.log_capacity == 0 {
            return Err("router.log_capacity must be > 0".into());
        }
        if self.router.health_timeout_ms == 0 {
            return Err("router.health_timeout_ms must be > 0".into());
        }
        for (name, address) in &self.router.services {
            let parsed = url::Url::parse(address)
                .map_err(|e| format!("router.services.{name} is not a valid URL: {e}"))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(format!("router.services.{name} must be an http(s) URL"));
            }
        }
        for rule in &self.router.rules {
            TopicPattern::parse(&rule.pattern)
                .map_err(|e| format!("router.rules: {e}"))?;
            if rule.destinations.is_empty() {
                return Err(format!(
                    "router.rules: pattern '{}' has no destinations",
                    rule.pattern
                ));
            }
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    pub fn service_kind(&self) -> Result<ServiceKind, String> {
        ServiceKind::from_str(&self.service.name).map_err(|e| format!("service.name: {e}"))
    }

    /// The configured override, or the service's default set.
    pub fn resource_types(&self) -> Result<Vec<ResourceType>, String> {
        match &self.service.resource_types {
            Some(names) => {
                if names.is_empty() {
                    return Err("service.resource_types must not be empty".into());
                }
                names
                    .iter()
                    .map(|n| {
                        ResourceType::from_str(n).map_err(|e| format!("service.resource_types: {e}"))
                    })
                    .collect()
            }
            None => Ok(self.service_kind()?.default_resource_types().to_vec()),
        }
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            default_count: self.search.default_count,
            max_count: self.search.max_count,
        }
    }

    /// Backend settings for this service. The table defaults to `<service>_resources`.
    pub fn postgres_config(&self) -> Option<PostgresConfig> {
        let pg = self.storage.postgres.as_ref()?;
        let table = pg
            .table
            .clone()
            .unwrap_or_else(|| format!("{}_resources", self.service.name.to_ascii_lowercase()));
        Some(PostgresConfig {
            url: pg.connection_url(),
            table,
            pool_size: pg.pool_size,
            connect_timeout_ms: pg.connect_timeout_ms,
            idle_timeout_ms: pg.idle_timeout_ms,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// One of ehr, lis, ris, pharmacy, pas, billing
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Overrides the service's default resource types
    #[serde(default)]
    pub resource_types: Option<Vec<String>>,
    /// Bundle-shaped JSON file imported at startup
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
}

fn default_service_name() -> String {
    "ehr".into()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            resource_types: None,
            seed_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackendKind,
    #[serde(default)]
    pub postgres: Option<PostgresStorageConfig>,
}

/// PostgreSQL storage configuration
///
/// Either `url`, or `host`/`port`/`user`/`password`/`database` from which a URL is built.
/// `url` takes precedence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresStorageConfig {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_postgres_host")]
    pub host: String,

    #[serde(default = "default_postgres_port")]
    pub port: u16,

    #[serde(default = "default_postgres_user")]
    pub user: String,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_postgres_database")]
    pub database: String,

    /// Defaults to `<service>_resources`
    #[serde(default)]
    pub table: Option<String>,

    #[serde(default = "default_postgres_pool_size")]
    pub pool_size: u32,

    #[serde(default = "default_postgres_connect_timeout")]
    pub connect_timeout_ms: u64,

    #[serde(default)]
    pub idle_timeout_ms: Option<u64>,
}

fn default_postgres_host() -> String {
    "localhost".into()
}
fn default_postgres_port() -> u16 {
    5432
}
fn default_postgres_user() -> String {
    "postgres".into()
}
fn default_postgres_database() -> String {
    "hospisim".into()
}
fn default_postgres_pool_size() -> u32 {
    10
}
fn default_postgres_connect_timeout() -> u64 {
    5000
}

impl PostgresStorageConfig {
    pub fn connection_url(&self) -> String {
        if let Some(ref url) = self.url {
            return url.clone();
        }

        let password_part = self
            .password
            .as_ref()
            .map(|p| format!(":{p}"))
            .unwrap_or_default();

        format!(
            "postgres://{}{}@{}:{}/{}",
            self.user, password_part, self.host, self.port, self.database
        )
    }
}

impl Default for PostgresStorageConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: default_postgres_host(),
            port: default_postgres_port(),
            user: default_postgres_user(),
            password: None,
            database: default_postgres_database(),
            table: None,
            pool_size: default_postgres_pool_size(),
            connect_timeout_ms: default_postgres_connect_timeout(),
            idle_timeout_ms: Some(300_000),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_default")]
    pub default_count: usize,
    #[serde(default = "default_search_max")]
    pub max_count: usize,
}

fn default_search_default() -> usize {
    100
}
fn default_search_max() -> usize {
    1000
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_count: default_search_default(),
            max_count: default_search_max(),
        }
    }
}

/// Redis is both the event broker (pub/sub, channel = topic) and the router's log mirror.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_redis_url")]
    pub url: String,

    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub pattern: String,
    pub destinations: Vec<String>,
}

impl RuleConfig {
    fn new(pattern: &str, destinations: &[&str]) -> Self {
        Self {
            pattern: pattern.to_string(),
            destinations: destinations.iter().map(|d| d.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Broker-side pattern for PSUBSCRIBE
    #[serde(default = "default_subscribe_pattern")]
    pub subscribe_pattern: String,

    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    #[serde(default = "default_health_timeout_ms")]
    pub health_timeout_ms: u64,

    /// System name to base URL
    #[serde(default = "default_services")]
    pub services: IndexMap<String, String>,

    #[serde(default = "default_rules")]
    pub rules: Vec<RuleConfig>,
}

fn default_subscribe_pattern() -> String {
    "*".into()
}
fn default_log_capacity() -> usize {
    1000
}
fn default_health_timeout_ms() -> u64 {
    5000
}

fn default_services() -> IndexMap<String, String> {
    [
        ("ehr", "http://localhost:8001"),
        ("lis", "http://localhost:8002"),
        ("ris", "http://localhost:8003"),
        ("pharmacy", "http://localhost:8005"),
        ("pas", "http://localhost:8006"),
        ("billing", "http://localhost:8007"),
    ]
    .into_iter()
    .map(|(name, url)| (name.to_string(), url.to_string()))
    .collect()
}

fn default_rules() -> Vec<RuleConfig> {
    vec![
        RuleConfig::new("pas.*.adt.*", &["ehr", "lis", "ris", "pharmacy", "billing"]),
        RuleConfig::new("ehr.servicerequest.created", &["lis", "ris"]),
        RuleConfig::new("lis.diagnosticreport.completed", &["ehr"]),
        RuleConfig::new("ris.diagnosticreport.completed", &["ehr"]),
        RuleConfig::new("pharmacy.medicationdispense.dispensed", &["ehr"]),
        RuleConfig::new("billing.charge.posted", &["ehr"]),
    ]
}

impl RouterConfig {
    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            subscribe_pattern: default_subscribe_pattern(),
            log_capacity: default_log_capacity(),
            health_timeout_ms: default_health_timeout_ms(),
            services: default_services(),
            rules: default_rules(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File, FileFormat};
    use std::env;
    use std::path::Path;

    pub const DEFAULT_CONFIG_FILE: &str = "hospisim.toml";
    pub const CONFIG_PATH_VAR: &str = "HOSPISIM_CONFIG";

    /// How the configuration path was determined.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ConfigSource {
        CliArgument,
        EnvironmentVariable,
        Default,
    }

    impl std::fmt::Display for ConfigSource {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::CliArgument => write!(f, "CLI argument (--config)"),
                Self::EnvironmentVariable => write!(f, "environment variable ({CONFIG_PATH_VAR})"),
                Self::Default => write!(f, "default"),
            }
        }
    }

    /// `--config <path>`, then `HOSPISIM_CONFIG`, then `hospisim.toml`.
    pub fn resolve_config_path(args: impl IntoIterator<Item = String>) -> (String, ConfigSource) {
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            if arg == "--config"
                && let Some(path) = args.next()
            {
                return (path, ConfigSource::CliArgument);
            }
        }

        if let Ok(path) = env::var(CONFIG_PATH_VAR)
            && !path.is_empty()
        {
            return (path, ConfigSource::EnvironmentVariable);
        }

        (DEFAULT_CONFIG_FILE.to_string(), ConfigSource::Default)
    }

    /// Loads `.env` if present. A missing file is not an error.
    pub fn load_dotenv() {
        if let Err(e) = dotenvy::dotenv()
            && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    /// Reads the TOML file (if it exists), applies `HOSPISIM__*` overrides and validates.
    pub fn load_config(path: Option<&Path>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        if path.exists() {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        // Environment variable overrides, e.g., HOSPISIM__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("HOSPISIM")
                .prefix_separator("__")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
