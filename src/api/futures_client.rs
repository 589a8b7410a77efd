//! Binance USDT-M futures REST client.
//!
//! Handles:
//! - API key header on every request
//! - HMAC-SHA256 signed envelopes for account endpoints
//! - Mapping non-2xx responses to exchange errors with code and message

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::TesterConfig;
use crate::error::{TesterError, TesterResult};
use crate::models::OrderRequest;

use super::exchange::FuturesExchange;
use super::signer::{encode_params, Params, RequestSigner};
use super::types::*;

const API_KEY_HEADER: &str = "X-MBX-APIKEY";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the futures REST API.
pub struct FuturesClient {
    http: Client,
    base_url: String,
    signer: RequestSigner,
}

impl FuturesClient {
    /// Create a client from the loaded configuration.
    pub fn new(config: &TesterConfig) -> TesterResult<Self> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| TesterError::config("api_key contains invalid header characters"))?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);

        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|e| TesterError::config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            signer: RequestSigner::new(config.api_secret.clone())
                .with_recv_window(config.recv_window_ms),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Unsigned GET with optional query parameters.
    async fn public_get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Params,
        what: &str,
    ) -> TesterResult<T> {
        let mut url = format!("{}{}", self.base_url, path);
        if !params.is_empty() {
            url = format!("{}?{}", url, encode_params(&params)?);
        }

        debug!(endpoint = %path, "Public request");

        let response = self.http.get(&url).send().await?;
        Self::handle_response(response, what).await
    }

    /// Signed request. GET/DELETE carry the payload in the query string, POST
    /// in a form body. Either way the bytes sent are the bytes signed.
    async fn signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: Params,
        what: &str,
    ) -> TesterResult<T> {
        let request = self.signer.sign_now(params)?;
        let payload = request.payload()?;
        let url = format!("{}{}", self.base_url, path);

        debug!(
            endpoint = %path,
            method = %method,
            timestamp = request.timestamp,
            "Signed request"
        );

        let builder = if method == Method::POST {
            self.http
                .post(&url)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(payload)
        } else {
            self.http.request(method, format!("{url}?{payload}"))
        };

        let response = builder.send().await?;
        Self::handle_response(response, what).await
    }

    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
        what: &str,
    ) -> TesterResult<T> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        decode_response(status, &body, what)
    }
}

/// Turn a status and body into the expected type or a classified error.
fn decode_response<T: DeserializeOwned>(status: u16, body: &str, what: &str) -> TesterResult<T> {
    if !(200..300).contains(&status) {
        return Err(match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(err) => TesterError::Exchange {
                status,
                code: Some(err.code),
                msg: err.msg,
            },
            Err(_) => TesterError::Exchange {
                status,
                code: None,
                msg: body.trim().to_string(),
            },
        });
    }

    serde_json::from_str(body).map_err(|e| TesterError::Decode {
        what: what.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl FuturesExchange for FuturesClient {
    async fn server_time(&self) -> TesterResult<i64> {
        let time: ServerTimeResponse = self
            .public_get("/fapi/v1/time", Vec::new(), "server time")
            .await?;
        Ok(time.server_time)
    }

    async fn balances(&self) -> TesterResult<Vec<BalanceEntry>> {
        self.signed(Method::GET, "/fapi/v2/balance", Vec::new(), "balance")
            .await
    }

    async fn account(&self) -> TesterResult<AccountResponse> {
        self.signed(Method::GET, "/fapi/v2/account", Vec::new(), "account")
            .await
    }

    async fn ticker_price(&self, symbol: &str) -> TesterResult<Decimal> {
        let ticker: TickerPriceResponse = self
            .public_get(
                "/fapi/v1/ticker/price",
                vec![("symbol".to_string(), symbol.to_string())],
                "ticker price",
            )
            .await?;
        Ok(ticker.price)
    }

    async fn position_risk(&self) -> TesterResult<Vec<PositionRiskEntry>> {
        self.signed(Method::GET, "/fapi/v2/positionRisk", Vec::new(), "position risk")
            .await
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> TesterResult<LeverageResponse> {
        let params = vec![
            ("symbol".to_string(), symbol.to_string()),
            ("leverage".to_string(), leverage.to_string()),
        ];
        self.signed(Method::POST, "/fapi/v1/leverage", params, "leverage")
            .await
    }

    async fn place_order(&self, order: &OrderRequest) -> TesterResult<OrderResponse> {
        self.signed(Method::POST, "/fapi/v1/order", order.to_params(), "order")
            .await
    }

    async fn exchange_info(&self) -> TesterResult<ExchangeInfo> {
        self.public_get("/fapi/v1/exchangeInfo", Vec::new(), "exchange info")
            .await
    }
}
