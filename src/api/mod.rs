//! Binance futures REST access: request signing, wire types, and the client.

mod exchange;
mod futures_client;
mod signer;
mod types;

#[cfg(test)]
pub mod mock;

pub use exchange::FuturesExchange;
pub use futures_client::FuturesClient;
pub use signer::timestamp_ms;
pub use types::*;
