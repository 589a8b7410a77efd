//! Interactive numbered menu and the operator actions it dispatches.
//!
//! Every failed action is reported and the loop returns to the menu. Only
//! end of input, `0`, or Ctrl-C leave it.

use std::fmt::Write as _;
use std::io::Write as _;
use std::str::FromStr;

use rust_decimal::Decimal;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::{error, info};

use crate::api::FuturesExchange;
use crate::error::TesterResult;
use crate::models::Direction;
use crate::tester::OrderTester;
use crate::trading::menu_symbols;

/// Numbered menu entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Exit,
    Balance,
    Account,
    Positions,
    OpenLong,
    OpenShort,
    ClosePosition,
    CloseAll,
    CustomOrder,
}

impl FromStr for MenuChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(Self::Exit),
            "1" => Ok(Self::Balance),
            "2" => Ok(Self::Account),
            "3" => Ok(Self::Positions),
            "4" => Ok(Self::OpenLong),
            "5" => Ok(Self::OpenShort),
            "6" => Ok(Self::ClosePosition),
            "7" => Ok(Self::CloseAll),
            "8" => Ok(Self::CustomOrder),
            other => Err(format!("Invalid choice '{other}', pick 0-8")),
        }
    }
}

/// A fully specified operation, ready to run.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Balance,
    Account,
    Positions,
    Open {
        symbol: String,
        direction: Direction,
        amount_usd: Decimal,
    },
    Close {
        symbol: String,
    },
    CloseAll,
    ServerTime,
    Rules {
        symbol: String,
    },
}

/// Run an action and render its result for the operator.
pub async fn execute<E: FuturesExchange>(
    tester: &OrderTester<E>,
    action: Action,
) -> TesterResult<String> {
    match action {
        Action::Balance => Ok(tester.balance().await?.to_string()),
        Action::Account => Ok(tester.account_summary().await?.to_string()),
        Action::Positions => {
            let positions = tester.positions().await?;
            if positions.is_empty() {
                return Ok("No open positions.".to_string());
            }
            let mut out = format!("=== Open Positions ({}) ===", positions.len());
            for position in &positions {
                let _ = write!(out, "\n{position}");
            }
            Ok(out)
        }
        Action::Open {
            symbol,
            direction,
            amount_usd,
        } => Ok(tester
            .open_position(&symbol, direction, amount_usd)
            .await?
            .to_string()),
        Action::Close { symbol } => Ok(tester.close_position(&symbol).await?.to_string()),
        Action::CloseAll => Ok(tester.close_all_positions().await?.to_string()),
        Action::ServerTime => {
            let time = tester.server_time().await;
            Ok(format!("Server time: {} ({})", time.to_rfc3339(), time.timestamp_millis()))
        }
        Action::Rules { symbol } => {
            let rules = tester.rules(&symbol);
            let mut out = format!(
                "=== {} ===\nPrecision:    {} dp ({})",
                rules.symbol, rules.precision, rules.source
            );
            if let Some(step) = rules.step_size {
                let _ = write!(out, "\nStep Size:    {step}");
            }
            let _ = write!(out, "\nMin Notional: ${}", rules.min_notional);
            Ok(out)
        }
    }
}

/// Run the menu until exit, end of input, or Ctrl-C.
pub async fn run_menu<E, R>(tester: &OrderTester<E>, input: R) -> std::io::Result<()>
where
    E: FuturesExchange,
    R: AsyncBufRead + Unpin,
{
    tokio::select! {
        result = menu_loop(tester, input) => result,
        _ = tokio::signal::ctrl_c() => {
            println!("\nInterrupted.");
            info!("Menu interrupted");
            Ok(())
        }
    }
}

async fn menu_loop<E, R>(tester: &OrderTester<E>, input: R) -> std::io::Result<()>
where
    E: FuturesExchange,
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    loop {
        print_menu();
        let Some(line) = prompt(&mut lines, "Choice: ").await? else {
            break;
        };

        let choice = match line.parse::<MenuChoice>() {
            Ok(choice) => choice,
            Err(msg) => {
                println!("{msg}");
                continue;
            }
        };
        if choice == MenuChoice::Exit {
            break;
        }

        let Some(action) = gather(tester, choice, &mut lines).await? else {
            println!("Cancelled.");
            continue;
        };

        match execute(tester, action).await {
            Ok(output) => println!("\n{output}"),
            Err(e) => {
                error!(error = %e, "Operation failed");
                println!("\nError: {e}");
            }
        }
    }

    println!("Goodbye.");
    Ok(())
}

fn print_menu() {
    println!("\n=== Futures Testnet Order Tester ===");
    println!("1. Balance");
    println!("2. Account summary");
    println!("3. Open positions");
    println!("4. Open long (default symbol and amount)");
    println!("5. Open short (default symbol and amount)");
    println!("6. Close a position");
    println!("7. Close all positions");
    println!("8. Custom order");
    println!("0. Exit");
}

/// Ask the follow-up questions for a choice. `None` means cancelled.
async fn gather<E, R>(
    tester: &OrderTester<E>,
    choice: MenuChoice,
    lines: &mut Lines<R>,
) -> std::io::Result<Option<Action>>
where
    E: FuturesExchange,
    R: AsyncBufRead + Unpin,
{
    let config = tester.config();
    let action = match choice {
        MenuChoice::Exit => None,
        MenuChoice::Balance => Some(Action::Balance),
        MenuChoice::Account => Some(Action::Account),
        MenuChoice::Positions => Some(Action::Positions),
        MenuChoice::OpenLong | MenuChoice::OpenShort => {
            let direction = if choice == MenuChoice::OpenLong {
                Direction::Long
            } else {
                Direction::Short
            };
            Some(Action::Open {
                symbol: config.default_symbol.clone(),
                direction,
                amount_usd: config.default_amount_usd,
            })
        }
        MenuChoice::ClosePosition => {
            let label = format!("Symbol to close [{}]: ", config.default_symbol);
            prompt_or(lines, &label, &config.default_symbol)
                .await?
                .map(|symbol| Action::Close { symbol })
        }
        MenuChoice::CloseAll => {
            if confirm(lines, "Close ALL open positions? (y/n): ").await? {
                Some(Action::CloseAll)
            } else {
                None
            }
        }
        MenuChoice::CustomOrder => custom_order(tester, lines).await?,
    };
    Ok(action)
}

async fn custom_order<E, R>(
    tester: &OrderTester<E>,
    lines: &mut Lines<R>,
) -> std::io::Result<Option<Action>>
where
    E: FuturesExchange,
    R: AsyncBufRead + Unpin,
{
    let config = tester.config();
    println!("Symbols: {}", menu_symbols().collect::<Vec<_>>().join(", "));

    let label = format!("Symbol [{}]: ", config.default_symbol);
    let Some(symbol) = prompt_or(lines, &label, &config.default_symbol).await? else {
        return Ok(None);
    };

    let Some(side) = prompt_or(lines, "Side long/short [long]: ", "long").await? else {
        return Ok(None);
    };
    let direction = match side.parse::<Direction>() {
        Ok(d) => d,
        Err(msg) => {
            println!("{msg}");
            return Ok(None);
        }
    };

    let default_amount = config.default_amount_usd.to_string();
    let label = format!("Order value in USDT [{default_amount}]: ");
    let Some(amount) = prompt_or(lines, &label, &default_amount).await? else {
        return Ok(None);
    };
    let amount_usd = match Decimal::from_str(&amount) {
        Ok(a) => a,
        Err(_) => {
            println!("Not a number: {amount}");
            return Ok(None);
        }
    };

    let symbol = symbol.to_uppercase();
    let question = format!("Open {direction} {symbol} for ${amount_usd}? (y/n): ");
    if !confirm(lines, &question).await? {
        return Ok(None);
    }

    Ok(Some(Action::Open {
        symbol,
        direction,
        amount_usd,
    }))
}

async fn prompt<R>(lines: &mut Lines<R>, label: &str) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    print!("{label}");
    std::io::stdout().flush()?;
    Ok(lines.next_line().await?.map(|l| l.trim().to_string()))
}

/// Prompt with a default used for empty answers.
async fn prompt_or<R>(
    lines: &mut Lines<R>,
    label: &str,
    default: &str,
) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    Ok(prompt(lines, label).await?.map(|answer| {
        if answer.is_empty() {
            default.to_string()
        } else {
            answer
        }
    }))
}

async fn confirm<R>(lines: &mut Lines<R>, label: &str) -> std::io::Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    let answer = prompt(lines, label).await?.unwrap_or_default().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockExchange;
    use crate::config::TesterConfig;
    use crate::models::OrderSide;
    use rust_decimal_macros::dec;
    use tokio::io::BufReader;

    fn tester(exchange: MockExchange) -> OrderTester<MockExchange> {
        let mut config = TesterConfig::new("test-api-key-0123456789", "test-secret");
        config.close_all_pause_ms = 0;
        OrderTester::new(exchange, config)
    }

    async fn drive(tester: &OrderTester<MockExchange>, script: &str) {
        run_menu(tester, BufReader::new(script.as_bytes()))
            .await
            .unwrap();
    }

    #[test]
    fn test_parse_choices() {
        assert_eq!("0".parse::<MenuChoice>().unwrap(), MenuChoice::Exit);
        assert_eq!(" 8 ".parse::<MenuChoice>().unwrap(), MenuChoice::CustomOrder);
        assert!("9".parse::<MenuChoice>().is_err());
        assert!("".parse::<MenuChoice>().is_err());
    }

    #[tokio::test]
    async fn test_menu_survives_errors() {
        let mut exchange = MockExchange::new();
        exchange.fail_balance = true;
        let tester = tester(exchange);

        // failing balance, then bad choices, then exit
        drive(&tester, "1\nfoo\n9\n0\n").await;
    }

    #[tokio::test]
    async fn test_menu_open_long_uses_defaults() {
        let tester = tester(MockExchange::new().with_price("BTCUSDT", dec!(50000)));
        drive(&tester, "4\n0\n").await;

        let orders = tester.exchange().placed_orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].symbol, "BTCUSDT");
        assert_eq!(orders[0].side, OrderSide::Buy);
        assert_eq!(orders[0].quantity, "0.002");
    }

    #[tokio::test]
    async fn test_menu_keeps_running_after_rejected_order() {
        let mut exchange = MockExchange::new().with_price("BTCUSDT", dec!(50000));
        exchange.reject_orders.insert("BTCUSDT".to_string());
        let tester = tester(exchange);

        drive(&tester, "5\n3\n0\n").await;
        assert!(tester.exchange().placed_orders().is_empty());
    }

    #[tokio::test]
    async fn test_menu_custom_order() {
        let tester = tester(MockExchange::new().with_price("ETHUSDT", dec!(2000)));
        drive(&tester, "8\nethusdt\nshort\n250\ny\n0\n").await;

        let orders = tester.exchange().placed_orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].symbol, "ETHUSDT");
        assert_eq!(orders[0].side, OrderSide::Sell);
        assert_eq!(orders[0].quantity, "0.125");
    }

    #[tokio::test]
    async fn test_menu_survives_out_of_range_amount() {
        let tester = tester(MockExchange::new().with_price("DOGEUSDT", dec!(0.15)));
        drive(
            &tester,
            "8\nDOGEUSDT\nlong\n79228162514264337593543950335\ny\n1\n4\n0\n",
        )
        .await;

        // the later open long still reaches the exchange; it has no BTCUSDT
        // price so no order is placed
        assert!(tester.exchange().placed_orders().is_empty());
        let leverage = tester.exchange().leverage_calls.lock().unwrap().clone();
        assert_eq!(leverage.len(), 2);
    }

    #[tokio::test]
    async fn test_menu_custom_order_declined() {
        let tester = tester(MockExchange::new().with_price("BTCUSDT", dec!(50000)));
        drive(&tester, "8\n\n\n\nn\n0\n").await;
        assert!(tester.exchange().placed_orders().is_empty());
    }

    #[tokio::test]
    async fn test_menu_close_with_default_symbol() {
        let tester = tester(
            MockExchange::new()
                .with_price("BTCUSDT", dec!(50000))
                .with_position("BTCUSDT", dec!(-0.004), dec!(50000)),
        );
        drive(&tester, "6\n\n0\n").await;

        let orders = tester.exchange().placed_orders();
        assert_eq!(orders[0].side, OrderSide::Buy);
        assert!(orders[0].reduce_only);
    }

    #[tokio::test]
    async fn test_menu_ends_on_eof() {
        let tester = tester(MockExchange::new());
        drive(&tester, "").await;
        drive(&tester, "8\nBTCUSDT\n").await;
        assert!(tester.exchange().placed_orders().is_empty());
    }

    #[tokio::test]
    async fn test_execute_rules_and_positions() {
        let tester = tester(MockExchange::new());
        let rules = execute(&tester, Action::Rules { symbol: "dogeusdt".to_string() })
            .await
            .unwrap();
        assert!(rules.contains("DOGEUSDT"));
        assert!(rules.contains("Precision:    0 dp"));

        let positions = execute(&tester, Action::Positions).await.unwrap();
        assert_eq!(positions, "No open positions.");
    }
}
