//! Wallet balance and account summary views.

use std::fmt;

use rust_decimal::Decimal;

use crate::api::{AccountResponse, BalanceEntry};

/// Margin asset the tester trades against.
pub const QUOTE_ASSET: &str = "USDT";

/// USDT row of the futures wallet.
#[derive(Debug, Clone, PartialEq)]
pub struct UsdtBalance {
    pub asset: String,
    pub balance: Decimal,
    pub available_balance: Decimal,
    pub cross_wallet_balance: Decimal,
    pub cross_unrealized_pnl: Decimal,
}

impl UsdtBalance {
    /// Pick the USDT row out of the balance list.
    pub fn find(entries: Vec<BalanceEntry>) -> Option<Self> {
        entries
            .into_iter()
            .find(|e| e.asset == QUOTE_ASSET)
            .map(|e| Self {
                asset: e.asset,
                balance: e.balance,
                available_balance: e.available_balance,
                cross_wallet_balance: e.cross_wallet_balance,
                cross_unrealized_pnl: e.cross_un_pnl,
            })
    }
}

impl fmt::Display for UsdtBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} Balance:", self.asset)?;
        writeln!(f, "  Total:          ${:.4}", self.balance)?;
        writeln!(f, "  Available:      ${:.4}", self.available_balance)?;
        writeln!(f, "  Cross Wallet:   ${:.4}", self.cross_wallet_balance)?;
        write!(f, "  Unrealized P&L: ${:.4}", self.cross_unrealized_pnl)
    }
}

/// Account-level totals.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSummary {
    pub total_wallet_balance: Decimal,
    pub available_balance: Decimal,
    pub total_unrealized_profit: Decimal,
    pub total_margin_balance: Decimal,
}

impl From<AccountResponse> for AccountSummary {
    fn from(r: AccountResponse) -> Self {
        Self {
            total_wallet_balance: r.total_wallet_balance,
            available_balance: r.available_balance,
            total_unrealized_profit: r.total_unrealized_profit,
            total_margin_balance: r.total_margin_balance,
        }
    }
}

impl fmt::Display for AccountSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Account:")?;
        writeln!(f, "  Wallet Balance: ${:.4}", self.total_wallet_balance)?;
        writeln!(f, "  Available:      ${:.4}", self.available_balance)?;
        writeln!(f, "  Unrealized P&L: ${:.4}", self.total_unrealized_profit)?;
        write!(f, "  Margin Balance: ${:.4}", self.total_margin_balance)
    }
}
