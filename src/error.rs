//! Error taxonomy for the order tester.
//!
//! Every variant is reported to the operator and abandons the operation that
//! raised it. Nothing here is retried.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TesterError {
    /// Missing or invalid configuration. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport failure or timeout.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response from the exchange.
    #[error("Exchange error (HTTP {status}{}): {msg}", code_suffix(.code))]
    Exchange {
        status: u16,
        code: Option<i64>,
        msg: String,
    },

    /// Input rejected before any request was sent.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A successful response whose body did not have the expected shape.
    #[error("Failed to decode {what}: {reason}")]
    Decode { what: String, reason: String },
}

impl TesterError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<reqwest::Error> for TesterError {
    fn from(err: reqwest::Error) -> Self {
        // The URL carries the signed query string; keep it out of messages.
        let err = err.without_url();
        if err.is_timeout() {
            Self::Network(format!("request timed out: {err}"))
        } else {
            Self::Network(err.to_string())
        }
    }
}

fn code_suffix(code: &Option<i64>) -> String {
    code.map(|c| format!(", code {c}")).unwrap_or_default()
}

pub type TesterResult<T> = Result<T, TesterError>;
