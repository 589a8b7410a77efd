//! Tester configuration: credentials plus the knobs used by the order flows.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::error::{TesterError, TesterResult};

/// Binance USDT-M futures testnet.
pub const TESTNET_URL: &str = "https://testnet.binancefuture.com";

/// Highest leverage Binance accepts on any USDT-M contract.
pub const MAX_LEVERAGE: u32 = 125;

/// Configuration loaded once at startup and read-only afterwards.
#[derive(Clone, Deserialize)]
pub struct TesterConfig {
    /// API key sent in the `X-MBX-APIKEY` header
    pub api_key: String,

    /// HMAC secret for request signatures
    pub api_secret: String,

    /// Leverage applied before every open
    #[serde(default = "default_leverage")]
    pub leverage: u32,

    /// REST base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Minimum order value in USDT when the exchange does not report one
    #[serde(default = "default_min_notional")]
    pub min_notional_usd: Decimal,

    /// Optional `recvWindow` added to signed requests (ms)
    #[serde(default)]
    pub recv_window_ms: Option<u64>,

    /// Pause between requests when closing every position (ms)
    #[serde(default = "default_close_all_pause")]
    pub close_all_pause_ms: u64,

    /// Re-read positions after a close and warn if one is still open
    #[serde(default)]
    pub verify_close: bool,

    /// Symbol used by the quick menu entries
    #[serde(default = "default_symbol")]
    pub default_symbol: String,

    /// Order value used by the quick menu entries (USDT)
    #[serde(default = "default_amount")]
    pub default_amount_usd: Decimal,

    /// Quantity precision overrides, winning over exchange metadata
    #[serde(default)]
    pub precision_overrides: HashMap<String, u32>,
}

fn default_leverage() -> u32 {
    1
}

fn default_base_url() -> String {
    TESTNET_URL.to_string()
}

fn default_min_notional() -> Decimal {
    dec!(100)
}

fn default_close_all_pause() -> u64 {
    500
}

fn default_symbol() -> String {
    "BTCUSDT".to_string()
}

fn default_amount() -> Decimal {
    dec!(100)
}

impl TesterConfig {
    /// Build a config with defaults for everything except credentials.
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            leverage: default_leverage(),
            base_url: default_base_url(),
            min_notional_usd: default_min_notional(),
            recv_window_ms: None,
            close_all_pause_ms: default_close_all_pause(),
            verify_close: false,
            default_symbol: default_symbol(),
            default_amount_usd: default_amount(),
            precision_overrides: HashMap::new(),
        }
    }

    /// Load from a JSON file, then apply environment overrides:
    /// - BINANCE_API_KEY
    /// - BINANCE_API_SECRET
    /// - BINANCE_FUTURES_URL
    ///
    /// A missing file is tolerated when both credentials come from the
    /// environment.
    pub fn load(path: &Path) -> TesterResult<Self> {
        let env_key = std::env::var("BINANCE_API_KEY").ok();
        let env_secret = std::env::var("BINANCE_API_SECRET").ok();

        let mut config = match std::fs::read_to_string(path) {
            Ok(text) => Self::parse_json(&text)?,
            Err(e) => match (&env_key, &env_secret) {
                (Some(key), Some(secret)) => Self::new(key.clone(), secret.clone()),
                _ => {
                    return Err(TesterError::config(format!(
                        "cannot read {}: {e}",
                        path.display()
                    )))
                }
            },
        };

        if let Some(key) = env_key {
            config.api_key = key;
        }
        if let Some(secret) = env_secret {
            config.api_secret = secret;
        }
        if let Ok(url) = std::env::var("BINANCE_FUTURES_URL") {
            config.base_url = url;
        }

        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON config document.
    #[cfg(test)]
    pub fn from_json(text: &str) -> TesterResult<Self> {
        let mut config = Self::parse_json(text)?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    fn parse_json(text: &str) -> TesterResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| TesterError::config(format!("invalid config JSON: {e}")))
    }

    /// Strip whitespace that sneaks in when keys are pasted into files.
    fn normalize(&mut self) {
        self.api_key = self.api_key.trim().to_string();
        self.api_secret = self.api_secret.trim().to_string();
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        self.default_symbol = self.default_symbol.trim().to_uppercase();
        self.precision_overrides = self
            .precision_overrides
            .drain()
            .map(|(symbol, dp)| (symbol.to_uppercase(), dp))
            .collect();
    }

    pub fn validate(&self) -> TesterResult<()> {
        if self.api_key.is_empty() {
            return Err(TesterError::config("api_key is empty"));
        }
        if self.api_secret.is_empty() {
            return Err(TesterError::config("api_secret is empty"));
        }
        if !(1..=MAX_LEVERAGE).contains(&self.leverage) {
            return Err(TesterError::config(format!(
                "leverage must be between 1 and {MAX_LEVERAGE}, got {}",
                self.leverage
            )));
        }
        if self.min_notional_usd <= Decimal::ZERO {
            return Err(TesterError::config("min_notional_usd must be positive"));
        }
        if self.default_amount_usd <= Decimal::ZERO {
            return Err(TesterError::config("default_amount_usd must be positive"));
        }
        if !self.base_url.starts_with("http") {
            return Err(TesterError::config(format!(
                "base_url must be an http(s) URL, got {}",
                self.base_url
            )));
        }
        Ok(())
    }

    /// API key shortened for display: first 10 and last 4 characters.
    pub fn masked_api_key(&self) -> String {
        mask(&self.api_key)
    }

    pub fn is_testnet(&self) -> bool {
        self.base_url == TESTNET_URL
    }
}

fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 14 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..10].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

impl fmt::Debug for TesterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TesterConfig")
            .field("api_key", &self.masked_api_key())
            .field("api_secret", &"<redacted>")
            .field("leverage", &self.leverage)
            .field("base_url", &self.base_url)
            .field("min_notional_usd", &self.min_notional_usd)
            .field("recv_window_ms", &self.recv_window_ms)
            .field("close_all_pause_ms", &self.close_all_pause_ms)
            .field("verify_close", &self.verify_close)
            .field("default_symbol", &self.default_symbol)
            .field("default_amount_usd", &self.default_amount_usd)
            .field("precision_overrides", &self.precision_overrides)
            .finish()
    }
}
