//! Trading logic: instrument rules, order sizing, position closing.

mod close;
mod precision;
mod sizing;

pub use close::{resolve_close, CloseOrder};
pub use precision::{menu_symbols, InstrumentRegistry, InstrumentRules};
pub use sizing::{OrderSizer, SizedQuantity};
