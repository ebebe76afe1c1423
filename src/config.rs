use std::collections::HashMap;
use std::env;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TIME_ACTIVE_DAYS: u32 = 30;
const CONFIG_DIR: &str = "config";

/// Gateway environment selector. Live and test traffic go to different hosts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayEnvironment {
    Live,
    Test,
}

impl Default for GatewayEnvironment {
    fn default() -> Self {
        Self::Test
    }
}

/// Global gateway settings, overridable per sales channel.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct GatewaySettings {
    /// Merchant API key. Mandatory before any gateway call is made.
    #[validate(length(min = 1, message = "gateway api_key must not be empty"))]
    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub environment: GatewayEnvironment,

    /// Verbose request/response logging toward the gateway
    #[serde(default)]
    pub debug: bool,

    /// Omit the shopping cart from order requests entirely
    #[serde(default)]
    pub exclude_shopping_cart: bool,

    /// Let the gateway re-prompt shoppers after failed or abandoned payments
    #[serde(default)]
    pub second_chance: bool,

    /// How long a payment link stays active, in days
    #[serde(default = "default_time_active_days")]
    pub time_active_days: u32,

    /// Override for the gateway API base URL. Used by integration tests;
    /// leave unset in production so the environment selects the host.
    #[serde(default)]
    pub api_base: Option<String>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            environment: GatewayEnvironment::default(),
            debug: false,
            exclude_shopping_cart: false,
            second_chance: false,
            time_active_days: DEFAULT_TIME_ACTIVE_DAYS,
            api_base: None,
        }
    }
}

/// Per-channel overrides. Any unset field falls back to the global settings.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChannelGatewayOverride {
    pub api_key: Option<String>,
    pub environment: Option<GatewayEnvironment>,
    pub debug: Option<bool>,
    pub exclude_shopping_cart: Option<bool>,
    pub second_chance: Option<bool>,
    pub time_active_days: Option<u32>,
    pub api_base: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Public base URL of the storefront, used for redirect/cancel/notification URLs
    #[validate(url(message = "public_base_url must be a valid URL"))]
    pub public_base_url: String,

    /// Shop platform version reported to the gateway alongside plugin metadata
    #[serde(default)]
    pub shop_version: Option<String>,

    /// Default gateway settings
    #[serde(default)]
    #[validate]
    pub gateway: GatewaySettings,

    /// Per-sales-channel gateway overrides, keyed by channel id
    #[serde(default)]
    pub channels: HashMap<String, ChannelGatewayOverride>,
}

impl AppConfig {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Resolves the effective gateway settings for a sales channel:
    /// channel override first, global default otherwise.
    pub fn gateway_settings(&self, channel_id: &str) -> GatewaySettings {
        let base = self.gateway.clone();
        match self.channels.get(channel_id) {
            Some(over) => GatewaySettings {
                api_key: over.api_key.clone().unwrap_or(base.api_key),
                environment: over.environment.unwrap_or(base.environment),
                debug: over.debug.unwrap_or(base.debug),
                exclude_shopping_cart: over
                    .exclude_shopping_cart
                    .unwrap_or(base.exclude_shopping_cart),
                second_chance: over.second_chance.unwrap_or(base.second_chance),
                time_active_days: over.time_active_days.unwrap_or(base.time_active_days),
                api_base: over.api_base.clone().or(base.api_base),
            },
            None => base,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_time_active_days() -> u32 {
    DEFAULT_TIME_ACTIVE_DAYS
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("configuration load error: {0}")]
    Load(#[from] ConfigError),
    #[error("configuration validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Loads configuration from `config/default.toml`, an optional
/// environment-specific file, and `MSP__`-prefixed environment variables.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| "development".to_string());

    let cfg: AppConfig = Config::builder()
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("MSP").separator("__"))
        .build()?
        .try_deserialize()?;

    cfg.validate()?;
    Ok(cfg)
}

/// Initializes the tracing subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("multisafepay_bridge={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}
