//! Wire types for the Binance USDT-M futures REST API.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// Response from /fapi/v1/time.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTimeResponse {
    pub server_time: i64,
}

/// Entry from /fapi/v2/balance.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceEntry {
    pub asset: String,
    #[serde(default)]
    pub balance: Decimal,
    #[serde(default)]
    pub available_balance: Decimal,
    #[serde(default)]
    pub cross_wallet_balance: Decimal,
    #[serde(default)]
    pub cross_un_pnl: Decimal,
}

/// Response from /fapi/v2/account (only the fields we display).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    #[serde(default)]
    pub total_wallet_balance: Decimal,
    #[serde(default)]
    pub available_balance: Decimal,
    #[serde(default)]
    pub total_unrealized_profit: Decimal,
    #[serde(default)]
    pub total_margin_balance: Decimal,
}

/// Response from /fapi/v1/ticker/price.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerPriceResponse {
    pub symbol: String,
    pub price: Decimal,
}

/// Entry from /fapi/v2/positionRisk.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRiskEntry {
    pub symbol: String,
    pub position_amt: Decimal,
    #[serde(default)]
    pub entry_price: Decimal,
    #[serde(default)]
    pub mark_price: Decimal,
    #[serde(default)]
    pub un_realized_profit: Decimal,
    #[serde(default)]
    pub liquidation_price: Decimal,
    #[serde(default = "default_leverage", deserialize_with = "u32_from_str_or_num")]
    pub leverage: u32,
    #[serde(default = "default_position_side")]
    pub position_side: String,
}

fn default_leverage() -> u32 {
    1
}

fn default_position_side() -> String {
    "BOTH".to_string()
}

/// Response from POST /fapi/v1/leverage.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeverageResponse {
    pub symbol: String,
    pub leverage: u32,
    #[serde(default)]
    pub max_notional_value: Option<String>,
}

/// Response from POST /fapi/v1/order with newOrderRespType=RESULT.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: i64,
    #[serde(default)]
    pub client_order_id: String,
    pub symbol: String,
    pub side: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub orig_qty: Decimal,
    #[serde(default)]
    pub executed_qty: Decimal,
    #[serde(default)]
    pub avg_price: Decimal,
    #[serde(default)]
    pub reduce_only: bool,
}

/// Error payload returned with non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub code: i64,
    pub msg: String,
}

/// Response from /fapi/v1/exchangeInfo.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub quantity_precision: Option<u32>,
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

/// Symbol filters we care about; everything else is ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
    #[serde(rename = "LOT_SIZE", rename_all = "camelCase")]
    LotSize {
        step_size: Decimal,
        #[serde(default)]
        min_qty: Decimal,
    },
    #[serde(rename = "MARKET_LOT_SIZE", rename_all = "camelCase")]
    MarketLotSize {
        step_size: Decimal,
        #[serde(default)]
        min_qty: Decimal,
    },
    #[serde(rename = "MIN_NOTIONAL")]
    MinNotional { notional: Decimal },
    #[serde(other)]
    Other,
}

/// Binance sends some integers as strings depending on endpoint version.
fn u32_from_str_or_num<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StrOrNum {
        Str(String),
        Num(u32),
    }

    match StrOrNum::deserialize(deserializer)? {
        StrOrNum::Num(n) => Ok(n),
        StrOrNum::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
