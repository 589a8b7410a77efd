//! In-memory exchange for exercising the tester flows without a network.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::{TesterError, TesterResult};
use crate::models::{OrderRequest, OrderSide};

use super::exchange::FuturesExchange;
use super::types::*;

#[derive(Default)]
pub struct MockExchange {
    pub prices: HashMap<String, Decimal>,
    pub positions: Mutex<Vec<PositionRiskEntry>>,
    pub usdt_balance: Decimal,
    pub fail_balance: bool,
    pub fail_leverage: bool,
    /// Symbols whose orders are rejected with HTTP 400
    pub reject_orders: HashSet<String>,
    /// Leave positions untouched when orders fill
    pub ignore_fills: bool,
    pub exchange_info: Option<ExchangeInfo>,
    pub orders: Mutex<Vec<OrderRequest>>,
    pub leverage_calls: Mutex<Vec<(String, u32)>>,
}

impl MockExchange {
    pub fn new() -> Self {
        Self {
            usdt_balance: Decimal::from(10_000),
            ..Default::default()
        }
    }

    pub fn with_price(mut self, symbol: &str, price: Decimal) -> Self {
        self.prices.insert(symbol.to_string(), price);
        self
    }

    pub fn with_position(self, symbol: &str, amount: Decimal, entry: Decimal) -> Self {
        self.positions.lock().unwrap().push(risk_entry(symbol, amount, entry));
        self
    }

    pub fn placed_orders(&self) -> Vec<OrderRequest> {
        self.orders.lock().unwrap().clone()
    }

    fn bad_request(msg: &str) -> TesterError {
        TesterError::Exchange {
            status: 400,
            code: Some(-1102),
            msg: msg.to_string(),
        }
    }
}

pub fn risk_entry(symbol: &str, amount: Decimal, entry: Decimal) -> PositionRiskEntry {
    PositionRiskEntry {
        symbol: symbol.to_string(),
        position_amt: amount,
        entry_price: entry,
        mark_price: entry,
        un_realized_profit: Decimal::ZERO,
        liquidation_price: Decimal::ZERO,
        leverage: 1,
        position_side: "BOTH".to_string(),
    }
}

#[async_trait]
impl FuturesExchange for MockExchange {
    async fn server_time(&self) -> TesterResult<i64> {
        Ok(1_700_000_000_000)
    }

    async fn balances(&self) -> TesterResult<Vec<BalanceEntry>> {
        if self.fail_balance {
            return Err(TesterError::Exchange {
                status: 401,
                code: Some(-2015),
                msg: "Invalid API-key, IP, or permissions for action.".to_string(),
            });
        }
        Ok(vec![BalanceEntry {
            asset: "USDT".to_string(),
            balance: self.usdt_balance,
            available_balance: self.usdt_balance,
            cross_wallet_balance: self.usdt_balance,
            cross_un_pnl: Decimal::ZERO,
        }])
    }

    async fn account(&self) -> TesterResult<AccountResponse> {
        Ok(AccountResponse {
            total_wallet_balance: self.usdt_balance,
            available_balance: self.usdt_balance,
            total_unrealized_profit: Decimal::ZERO,
            total_margin_balance: self.usdt_balance,
        })
    }

    async fn ticker_price(&self, symbol: &str) -> TesterResult<Decimal> {
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| Self::bad_request("Invalid symbol."))
    }

    async fn position_risk(&self) -> TesterResult<Vec<PositionRiskEntry>> {
        Ok(self.positions.lock().unwrap().clone())
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> TesterResult<LeverageResponse> {
        if self.fail_leverage {
            return Err(Self::bad_request("Leverage not valid."));
        }
        self.leverage_calls
            .lock()
            .unwrap()
            .push((symbol.to_string(), leverage));
        Ok(LeverageResponse {
            symbol: symbol.to_string(),
            leverage,
            max_notional_value: None,
        })
    }

    async fn place_order(&self, order: &OrderRequest) -> TesterResult<OrderResponse> {
        if self.reject_orders.contains(&order.symbol) {
            return Err(Self::bad_request("Order rejected."));
        }
        let qty = Decimal::from_str(&order.quantity).map_err(|_| Self::bad_request("Bad qty."))?;
        let signed = match order.side {
            OrderSide::Buy => qty,
            OrderSide::Sell => -qty,
        };

        if !self.ignore_fills {
            let mut positions = self.positions.lock().unwrap();
            match positions.iter_mut().find(|p| p.symbol == order.symbol) {
                Some(p) => p.position_amt += signed,
                None if !order.reduce_only => {
                    positions.push(risk_entry(&order.symbol, signed, Decimal::ZERO))
                }
                None => return Err(Self::bad_request("ReduceOnly Order is rejected.")),
            }
        }

        let mut orders = self.orders.lock().unwrap();
        orders.push(order.clone());

        Ok(OrderResponse {
            order_id: orders.len() as i64,
            client_order_id: order.client_order_id.clone(),
            symbol: order.symbol.clone(),
            side: order.side.as_str().to_string(),
            status: "FILLED".to_string(),
            orig_qty: qty,
            executed_qty: qty,
            avg_price: self.prices.get(&order.symbol).copied().unwrap_or_default(),
            reduce_only: order.reduce_only,
        })
    }

    async fn exchange_info(&self) -> TesterResult<ExchangeInfo> {
        self.exchange_info.clone().ok_or(TesterError::Exchange {
            status: 503,
            code: None,
            msg: "Service Unavailable".to_string(),
        })
    }
}
