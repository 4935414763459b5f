use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// How long a Pending booking holds its seats before the sweeper
    /// reclaims them.
    #[serde(default = "default_hold_deadline")]
    pub hold_deadline_seconds: u64,
    /// Sweeper tick interval.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_hold_deadline() -> u64 {
    900
}
fn default_sweep_interval() -> u64 {
    60
}
fn default_currency() -> String {
    "EUR".to_string()
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            hold_deadline_seconds: default_hold_deadline(),
            sweep_interval_seconds: default_sweep_interval(),
            currency: default_currency(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Environment-specific file, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // E.g. CINEBOOK__SERVER__PORT=8080
            .add_source(config::Environment::with_prefix("CINEBOOK").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
