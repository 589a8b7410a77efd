//! Order model: a single market order, built once and sent once.

use std::fmt;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order type. The tester only sends market orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Market,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
        }
    }
}

/// Market order request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    /// Fixed-decimal quantity at the instrument's precision
    pub quantity: String,
    pub reduce_only: bool,
    /// `newClientOrderId`, at most 36 characters
    pub client_order_id: String,
}

impl OrderRequest {
    /// Market order that may open or add to a position.
    pub fn market(symbol: impl Into<String>, side: OrderSide, quantity: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity: quantity.into(),
            reduce_only: false,
            client_order_id: new_client_order_id(),
        }
    }

    /// Market order that can only shrink an existing position.
    pub fn reduce_only(
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: impl Into<String>,
    ) -> Self {
        Self {
            reduce_only: true,
            ..Self::market(symbol, side, quantity)
        }
    }

    /// Request parameters in the order they are signed.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("symbol".to_string(), self.symbol.clone()),
            ("side".to_string(), self.side.as_str().to_string()),
            ("type".to_string(), self.order_type.as_str().to_string()),
            ("quantity".to_string(), self.quantity.clone()),
        ];
        if self.reduce_only {
            params.push(("reduceOnly".to_string(), "true".to_string()));
        }
        params.push(("newClientOrderId".to_string(), self.client_order_id.clone()));
        params.push(("newOrderRespType".to_string(), "RESULT".to_string()));
        params
    }
}

fn new_client_order_id() -> String {
    format!("ft-{}", uuid::Uuid::new_v4().simple())
}
