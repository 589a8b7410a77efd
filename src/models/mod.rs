//! Data models for positions, orders, and balances.

mod balance;
mod order;
mod position;

pub use balance::{AccountSummary, UsdtBalance};
pub use order::{OrderRequest, OrderSide};
pub use position::{Direction, Position};
