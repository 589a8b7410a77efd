//! The exchange surface the tester depends on.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::TesterResult;
use crate::models::OrderRequest;

use super::types::{
    AccountResponse, BalanceEntry, ExchangeInfo, LeverageResponse, OrderResponse,
    PositionRiskEntry,
};

/// Futures REST operations used by the order tester.
///
/// `FuturesClient` talks to Binance; tests substitute an in-memory exchange.
#[async_trait]
pub trait FuturesExchange: Send + Sync {
    /// Server clock in epoch milliseconds (unsigned).
    async fn server_time(&self) -> TesterResult<i64>;

    /// Per-asset futures wallet balances (signed).
    async fn balances(&self) -> TesterResult<Vec<BalanceEntry>>;

    /// Account summary (signed).
    async fn account(&self) -> TesterResult<AccountResponse>;

    /// Last traded price for a symbol (unsigned).
    async fn ticker_price(&self, symbol: &str) -> TesterResult<Decimal>;

    /// Position risk rows, including flat ones (signed).
    async fn position_risk(&self) -> TesterResult<Vec<PositionRiskEntry>>;

    /// Change initial leverage for a symbol (signed).
    async fn set_leverage(&self, symbol: &str, leverage: u32) -> TesterResult<LeverageResponse>;

    /// Submit an order (signed).
    async fn place_order(&self, order: &OrderRequest) -> TesterResult<OrderResponse>;

    /// Instrument metadata (unsigned).
    async fn exchange_info(&self) -> TesterResult<ExchangeInfo>;
}
