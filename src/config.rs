use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub gateway: GatewayConfig,
    pub approvals: ApprovalsConfig,
    pub school: SchoolConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Payment gateway is an opaque external collaborator; we only know its
/// base URL and credential.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalsConfig {
    /// How long a pending request stays actionable.
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,
    /// Interval for the background sweep that marks stale requests
    /// expired. Lazy expiry-on-read is the correctness mechanism; the
    /// sweep only keeps the parent inbox tidy.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchoolConfig {
    /// UTC offset of the school's local time, in minutes. Weekly and
    /// monthly budget windows are anchored to this offset.
    #[serde(default)]
    pub timezone_offset_minutes: i32,
}

fn default_ttl_hours() -> i64 {
    24
}

fn default_sweep_interval_secs() -> u64 {
    300
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for environment variable overrides)
        dotenvy::dotenv().ok();

        // Build config from config.yml (required) with environment variable overrides
        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(true))
            .add_source(
                config::Environment::with_prefix("APRENDE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
