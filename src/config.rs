//! Application configuration loaded from environment variables.

use serde::Deserialize;
use strum::Display;

use crate::error::ShellError;

/// Which exchange environment the shell is talking to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Network {
    /// Paper-trading environment.
    #[strum(serialize = "testnet")]
    Testnet,
    /// Real money.
    #[strum(serialize = "live")]
    Live,
}

impl Network {
    /// Derive the network from a REST base URL.
    pub fn from_base_url(url: &str) -> Self {
        if url.contains("testnet") {
            Network::Testnet
        } else {
            Network::Live
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Credentials ===
    /// API key id.
    #[serde(default)]
    pub bitmex_api_key: String,

    /// API key secret.
    #[serde(default)]
    pub bitmex_api_secret: String,

    // === Endpoints ===
    /// REST base URL including the `/api/v1` prefix.
    #[serde(default = "default_base_url")]
    pub bitmex_base_url: String,

    /// Realtime feed URL.
    #[serde(default = "default_ws_url")]
    pub bitmex_ws_url: String,

    // === Session ===
    /// Symbol selected when the shell starts.
    #[serde(default = "default_symbol")]
    pub bitmex_symbol: String,

    /// Prefix for client order ids.
    #[serde(default = "default_order_id_prefix")]
    pub order_id_prefix: String,

    /// Send limit orders as post-only.
    #[serde(default = "default_true")]
    pub post_only: bool,

    // === Timeouts ===
    /// HTTP request timeout.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    /// Seconds a signed request stays valid.
    #[serde(default = "default_request_expiry_secs")]
    pub request_expiry_secs: i64,

    /// Seconds to wait for the account feed snapshots.
    #[serde(default = "default_feed_ready_timeout_secs")]
    pub feed_ready_timeout_secs: u64,

    /// Log filter (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

fn default_base_url() -> String {
    "https://testnet.bitmex.com/api/v1".to_string()
}

fn default_ws_url() -> String {
    "wss://testnet.bitmex.com/realtime".to_string()
}

fn default_symbol() -> String {
    "XBTUSD".to_string()
}

fn default_order_id_prefix() -> String {
    "cli".to_string()
}

fn default_true() -> bool {
    true
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

fn default_request_expiry_secs() -> i64 {
    60
}

fn default_feed_ready_timeout_secs() -> u64 {
    10
}

/// Filter used for `--verbose`.
const VERBOSE_LOG_FILTER: &str = "bitmex_shell=debug,warn";

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bitmex_api_key: String::new(),
            bitmex_api_secret: String::new(),
            bitmex_base_url: default_base_url(),
            bitmex_ws_url: default_ws_url(),
            bitmex_symbol: default_symbol(),
            order_id_prefix: default_order_id_prefix(),
            post_only: default_true(),
            http_timeout_ms: default_http_timeout_ms(),
            request_expiry_secs: default_request_expiry_secs(),
            feed_ready_timeout_secs: default_feed_ready_timeout_secs(),
            rust_log: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is usable.
    pub fn validate(&self) -> Result<(), ShellError> {
        if !self.has_credentials() {
            return Err(ShellError::InvalidConfig(
                "Set the API keys first (BITMEX_API_KEY, BITMEX_API_SECRET)".to_string(),
            ));
        }

        if !self.bitmex_base_url.starts_with("http://") && !self.bitmex_base_url.starts_with("https://") {
            return Err(ShellError::InvalidConfig(
                "BITMEX_BASE_URL must be an http(s) URL".to_string(),
            ));
        }

        if !self.bitmex_ws_url.starts_with("ws://") && !self.bitmex_ws_url.starts_with("wss://") {
            return Err(ShellError::InvalidConfig(
                "BITMEX_WS_URL must be a ws(s) URL".to_string(),
            ));
        }

        if self.order_id_prefix.is_empty() {
            return Err(ShellError::InvalidConfig(
                "ORDER_ID_PREFIX must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether both API key and secret are set.
    pub fn has_credentials(&self) -> bool {
        !self.bitmex_api_key.trim().is_empty() && !self.bitmex_api_secret.trim().is_empty()
    }

    /// Tracing filter directives: `rust_log`, or debug for this crate when verbose.
    pub fn log_filter(&self, verbose: bool) -> String {
        if verbose {
            VERBOSE_LOG_FILTER.to_string()
        } else {
            self.rust_log.clone()
        }
    }

    /// Network the REST base URL points at.
    pub fn network(&self) -> Network {
        Network::from_base_url(&self.bitmex_base_url)
    }

    /// API key with all but the last four characters masked.
    pub fn masked_api_key(&self) -> String {
        let visible: String = self
            .bitmex_api_key
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("****{}", visible)
    }
}
