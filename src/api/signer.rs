//! Signed request envelope for Binance futures endpoints.
//!
//! The exchange hashes the exact bytes it receives, so the string produced
//! here is the string that goes on the wire: query string for GET, form body
//! for POST.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{TesterError, TesterResult};

type HmacSha256 = Hmac<Sha256>;

/// Ordered request parameters. Order is preserved into the signed string.
pub type Params = Vec<(String, String)>;

/// A request ready for transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// Parameters including `timestamp` (and `recvWindow` when set)
    pub params: Params,
    pub timestamp: i64,
    /// Lowercase hex HMAC-SHA256
    pub signature: String,
}

impl SignedRequest {
    /// Full encoded payload: the signed string plus `&signature=...`.
    pub fn payload(&self) -> TesterResult<String> {
        let query = encode_params(&self.params)?;
        Ok(format!("{query}&signature={}", self.signature))
    }
}

/// Signs parameter lists with the account secret.
#[derive(Clone)]
pub struct RequestSigner {
    secret: String,
    recv_window_ms: Option<u64>,
}

impl RequestSigner {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            recv_window_ms: None,
        }
    }

    pub fn with_recv_window(mut self, recv_window_ms: Option<u64>) -> Self {
        self.recv_window_ms = recv_window_ms;
        self
    }

    /// Wrap `params` in an envelope stamped with the current time.
    pub fn sign_now(&self, params: Params) -> TesterResult<SignedRequest> {
        self.sign_at(params, timestamp_ms())
    }

    /// Wrap `params` in an envelope stamped with `timestamp`.
    ///
    /// Input must not already contain `timestamp` or `signature`.
    pub fn sign_at(&self, mut params: Params, timestamp: i64) -> TesterResult<SignedRequest> {
        if params
            .iter()
            .any(|(k, _)| k == "timestamp" || k == "signature")
        {
            return Err(TesterError::validation(
                "params must not contain timestamp or signature",
            ));
        }

        if let Some(window) = self.recv_window_ms {
            params.push(("recvWindow".to_string(), window.to_string()));
        }
        params.push(("timestamp".to_string(), timestamp.to_string()));

        let signature = sign(&params, &self.secret)?;

        Ok(SignedRequest {
            params,
            timestamp,
            signature,
        })
    }
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("secret", &"<redacted>")
            .field("recv_window_ms", &self.recv_window_ms)
            .finish()
    }
}

/// HMAC-SHA256 over the urlencoded form of `params`, hex encoded.
pub fn sign(params: &[(String, String)], secret: &str) -> TesterResult<String> {
    let query = encode_params(params)?;
    sign_payload(&query, secret)
}

/// HMAC-SHA256 over an already encoded payload, hex encoded.
pub fn sign_payload(payload: &str, secret: &str) -> TesterResult<String> {
    // HMAC accepts keys of any length; this only fails on a broken backend.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| TesterError::config("cannot initialise HMAC with the configured secret"))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// `key=value` pairs joined by `&`, form-urlencoded, order preserved.
pub fn encode_params(params: &[(String, String)]) -> TesterResult<String> {
    serde_urlencoded::to_string(params).map_err(|e| TesterError::Decode {
        what: "request parameters".to_string(),
        reason: e.to_string(),
    })
}

/// Current epoch time in milliseconds.
pub fn timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
