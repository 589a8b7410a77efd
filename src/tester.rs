//! Order tester: the operations behind the menu and the subcommands.
//!
//! `OrderTester` is built once from the configuration and an exchange client
//! and never mutated afterwards. Every operation runs its exchange calls one
//! after another and returns a report or the first error.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::api::{timestamp_ms, FuturesExchange};
use crate::config::TesterConfig;
use crate::error::{TesterError, TesterResult};
use crate::models::{AccountSummary, Direction, OrderRequest, Position, UsdtBalance};
use crate::report::{CloseAllReport, CloseReport, OpenReport};
use crate::trading::{resolve_close, InstrumentRegistry, InstrumentRules, OrderSizer};

/// Explicit, read-only context for all tester operations.
pub struct OrderTester<E: FuturesExchange> {
    exchange: E,
    config: TesterConfig,
    registry: InstrumentRegistry,
}

impl<E: FuturesExchange> OrderTester<E> {
    /// Build with static instrument rules only.
    pub fn new(exchange: E, config: TesterConfig) -> Self {
        let registry = InstrumentRegistry::new(
            config.precision_overrides.clone(),
            config.min_notional_usd,
        );
        Self {
            exchange,
            config,
            registry,
        }
    }

    /// Build and load instrument rules from the exchange, falling back to the
    /// static table when metadata is unavailable.
    pub async fn connect(exchange: E, config: TesterConfig) -> Self {
        let mut tester = Self::new(exchange, config);
        match tester.exchange.exchange_info().await {
            Ok(info) => {
                let loaded = tester.registry.load_exchange_info(&info);
                info!(symbols = loaded, "Loaded instrument rules from exchange");
            }
            Err(e) => {
                warn!(error = %e, "Instrument metadata unavailable, using static precision table");
            }
        }
        tester
    }

    pub fn config(&self) -> &TesterConfig {
        &self.config
    }

    #[cfg(test)]
    pub(crate) fn exchange(&self) -> &E {
        &self.exchange
    }

    pub fn rules(&self, symbol: &str) -> InstrumentRules {
        self.registry.rules(&normalize_symbol(symbol))
    }

    /// Exchange clock, or the local clock when the exchange is unreachable.
    pub async fn server_time(&self) -> DateTime<Utc> {
        let ms = match self.exchange.server_time().await {
            Ok(ms) => ms,
            Err(e) => {
                warn!(error = %e, "Server time unavailable, using local clock");
                timestamp_ms()
            }
        };
        DateTime::from_timestamp_millis(ms).unwrap_or_else(Utc::now)
    }

    pub async fn balance(&self) -> TesterResult<UsdtBalance> {
        let entries = self.exchange.balances().await?;
        UsdtBalance::find(entries).ok_or_else(|| TesterError::Decode {
            what: "balance".to_string(),
            reason: "no USDT entry in futures wallet".to_string(),
        })
    }

    pub async fn account_summary(&self) -> TesterResult<AccountSummary> {
        Ok(self.exchange.account().await?.into())
    }

    /// Active positions only.
    pub async fn positions(&self) -> TesterResult<Vec<Position>> {
        let rows = self.exchange.position_risk().await?;
        Ok(rows.into_iter().filter_map(Position::from_risk).collect())
    }

    /// Set leverage, size against the current price, send a market order.
    pub async fn open_position(
        &self,
        symbol: &str,
        direction: Direction,
        amount_usd: Decimal,
    ) -> TesterResult<OpenReport> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(TesterError::validation("symbol is empty"));
        }
        if amount_usd <= Decimal::ZERO {
            return Err(TesterError::validation(format!(
                "order value must be positive, got {amount_usd}"
            )));
        }

        let leverage = self.config.leverage;
        let applied = self.exchange.set_leverage(&symbol, leverage).await?;
        info!(symbol = %symbol, leverage = applied.leverage, "Leverage set");

        let price = self.exchange.ticker_price(&symbol).await?;
        if price <= Decimal::ZERO {
            return Err(TesterError::validation(format!(
                "no valid price for {symbol}: {price}"
            )));
        }

        let rules = self.registry.rules(&symbol);
        let sized = OrderSizer::new(&self.registry).compute_order_quantity(
            &symbol,
            amount_usd,
            price,
            leverage,
            rules.min_notional,
        )?;
        if sized.floor_applied {
            warn!(
                symbol = %symbol,
                min_notional = %rules.min_notional,
                "Quantity raised to meet minimum order value"
            );
        }

        let side = direction.opening_side();
        let request = OrderRequest::market(symbol.clone(), side, sized.to_wire());

        info!(
            symbol = %symbol,
            side = %side,
            quantity = %request.quantity,
            price = %price,
            precision = rules.precision,
            "Placing market order"
        );
        let order = self.exchange.place_order(&request).await?;

        Ok(OpenReport {
            symbol,
            direction,
            amount_usd,
            leverage,
            price,
            min_notional: rules.min_notional,
            sized,
            order,
        })
    }

    /// Close the active position in `symbol`.
    pub async fn close_position(&self, symbol: &str) -> TesterResult<CloseReport> {
        let symbol = normalize_symbol(symbol);
        let positions = self.positions().await?;
        let position = positions
            .into_iter()
            .find(|p| p.symbol == symbol)
            .ok_or_else(|| TesterError::validation(format!("no active position for {symbol}")))?;

        self.close_active(position).await
    }

    /// Close every active position, one request at a time with a fixed pause
    /// in between. A failure on one symbol does not stop the rest.
    pub async fn close_all_positions(&self) -> TesterResult<CloseAllReport> {
        let positions = self.positions().await?;
        let mut report = CloseAllReport::default();
        let pause = Duration::from_millis(self.config.close_all_pause_ms);

        for (i, position) in positions.into_iter().enumerate() {
            if i > 0 && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
            let symbol = position.symbol.clone();
            match self.close_active(position).await {
                Ok(closed) => report.closed.push(closed),
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Close failed");
                    report.failed.push((symbol, e));
                }
            }
        }

        Ok(report)
    }

    async fn close_active(&self, position: Position) -> TesterResult<CloseReport> {
        let lot = self.registry.lot_size(&position.symbol);
        let close = resolve_close(&position, lot)?;
        let request = close.to_request();

        info!(
            symbol = %close.symbol,
            side = %close.side,
            quantity = %request.quantity,
            "Closing position (reduce-only)"
        );
        let order = self.exchange.place_order(&request).await?;

        let still_open = if self.config.verify_close {
            self.remaining_quantity(&close.symbol).await
        } else {
            None
        };

        Ok(CloseReport {
            position,
            close,
            order,
            still_open,
        })
    }

    /// Post-close check. Errors are logged, not returned: the order is
    /// already on the exchange.
    async fn remaining_quantity(&self, symbol: &str) -> Option<Decimal> {
        match self.positions().await {
            Ok(positions) => {
                let left = positions
                    .into_iter()
                    .find(|p| p.symbol == symbol)
                    .map(|p| p.signed_quantity);
                if let Some(qty) = left {
                    warn!(symbol = %symbol, remaining = %qty, "Position still open after close");
                }
                left
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Could not verify close");
                None
            }
        }
    }
}

fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
