//! Configuration — TOML file defaults + environment variable overrides.
//!
//! Tunable monitor parameters live in `config/default.toml`.
//! Secrets (bot token, database URL) come from environment variables.

use serde::Deserialize;
use std::env;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub steam: SteamConfig,
    pub monitor: MonitorConfig,
    pub telegram: TelegramConfig,
    pub web: WebConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_url")]
    pub url: String,
}

fn default_db_url() -> String {
    "sqlite://steam_bot.db".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SteamConfig {
    #[serde(default = "default_store_url")]
    pub store_api_url: String,
    /// Region whose prices drive low-price tracking.
    #[serde(default = "default_region")]
    pub default_region: String,
    /// Regions fanned out for interactive price comparison.
    #[serde(default = "default_compare_regions")]
    pub compare_regions: Vec<String>,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_store_url() -> String {
    "https://store.steampowered.com/api/appdetails".into()
}
fn default_region() -> String {
    "tw".into()
}
fn default_compare_regions() -> Vec<String> {
    ["tw", "us", "uk", "jp", "cn", "kr", "hk", "ar", "tr"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_fetch_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between full price-poll cycles.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Seconds between seasonal-sale checks.
    #[serde(default = "default_sale_interval")]
    pub sale_check_interval_secs: u64,
    /// Courtesy delay between consecutive app fetches within a cycle.
    #[serde(default = "default_entity_delay")]
    pub inter_app_delay_ms: u64,
    /// How many days ahead a sale start is announced.
    #[serde(default = "default_lookahead")]
    pub sale_lookahead_days: i64,
}

fn default_poll_interval() -> u64 {
    3600
}
fn default_sale_interval() -> u64 {
    43200
}
fn default_entity_delay() -> u64 {
    2000
}
fn default_lookahead() -> i64 {
    7
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_true() -> bool {
    true
}
fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json_output: bool,
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load configuration from `config/default.toml` merged with env vars.
    /// Overrides come from env vars prefixed with `SPB_`.
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(
                config::Environment::with_prefix("SPB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut cfg: Config = builder.try_deserialize()?;

        // Override secrets from env (these should never be in TOML)
        if let Ok(v) = env::var("DATABASE_URL") {
            cfg.database.url = v;
        }
        if let Ok(v) = env::var("TELEGRAM_BOT_TOKEN") {
            cfg.telegram.bot_token = Some(v);
        }

        Ok(cfg)
    }
}
