//! Results of the order flows, printable for the operator.

use std::fmt;

use rust_decimal::Decimal;

use crate::api::OrderResponse;
use crate::error::TesterError;
use crate::models::{Direction, Position};
use crate::trading::{CloseOrder, SizedQuantity};

/// Outcome of opening a position.
#[derive(Debug, Clone)]
pub struct OpenReport {
    pub symbol: String,
    pub direction: Direction,
    pub amount_usd: Decimal,
    pub leverage: u32,
    pub price: Decimal,
    pub min_notional: Decimal,
    pub sized: SizedQuantity,
    pub order: OrderResponse,
}

impl fmt::Display for OpenReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Opened {} {} ===", self.direction, self.symbol)?;
        writeln!(f, "Requested:    ${} USDT x{}", self.amount_usd, self.leverage)?;
        writeln!(f, "Price:        ${:.2}", self.price)?;
        writeln!(f, "Quantity:     {}", self.sized.to_wire())?;
        writeln!(f, "Order Value:  ${:.2}", self.sized.notional(self.price))?;
        if self.sized.floor_applied {
            writeln!(
                f,
                "Note:         size raised to meet the ${} minimum order value",
                self.min_notional
            )?;
        }
        write!(f, "{}", OrderSummary(&self.order))
    }
}

/// Outcome of closing one position.
#[derive(Debug, Clone)]
pub struct CloseReport {
    pub position: Position,
    pub close: CloseOrder,
    pub order: OrderResponse,
    /// Quantity still open after the close, when verification ran and found one
    pub still_open: Option<Decimal>,
}

impl CloseReport {
    pub fn exit_price(&self) -> Decimal {
        self.order.avg_price
    }
}

impl fmt::Display for CloseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = self
            .position
            .direction()
            .map(|d| d.to_string())
            .unwrap_or_default();
        writeln!(f, "=== Closed {} {} ===", direction, self.position.symbol)?;
        writeln!(f, "Close Side:   {}", self.close.side)?;
        writeln!(f, "Quantity:     {}", self.close.to_wire())?;
        write!(f, "{}", OrderSummary(&self.order))?;
        writeln!(f)?;
        writeln!(f, "Entry Price:  ${:.2}", self.position.entry_price)?;
        writeln!(f, "Exit Price:   ${:.2}", self.exit_price())?;
        let label = if self.position.unrealized_pnl >= Decimal::ZERO {
            "Profit"
        } else {
            "Loss"
        };
        write!(f, "{:<13} ${:.4}", format!("{label}:"), self.position.unrealized_pnl)?;
        if let Some(left) = self.still_open {
            write!(f, "\nWARNING:      position still open ({left})")?;
        }
        Ok(())
    }
}

/// Outcome of closing every position.
#[derive(Debug, Default)]
pub struct CloseAllReport {
    pub closed: Vec<CloseReport>,
    pub failed: Vec<(String, TesterError)>,
}

impl CloseAllReport {
    pub fn is_empty(&self) -> bool {
        self.closed.is_empty() && self.failed.is_empty()
    }
}

impl fmt::Display for CloseAllReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "No positions to close.");
        }
        for report in &self.closed {
            writeln!(f, "{report}\n")?;
        }
        for (symbol, err) in &self.failed {
            writeln!(f, "FAILED {symbol}: {err}")?;
        }
        write!(
            f,
            "Closed {} of {} positions.",
            self.closed.len(),
            self.closed.len() + self.failed.len()
        )
    }
}

struct OrderSummary<'a>(&'a OrderResponse);

impl fmt::Display for OrderSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.0;
        writeln!(f, "Order ID:     {}", o.order_id)?;
        writeln!(f, "Symbol:       {}", o.symbol)?;
        writeln!(f, "Side:         {}", o.side)?;
        writeln!(f, "Filled:       {} / {}", o.executed_qty, o.orig_qty)?;
        writeln!(f, "Avg Price:    ${:.2}", o.avg_price)?;
        write!(f, "Status:       {}", o.status)
    }
}
