//! Binance Futures Testnet Order Tester
//!
//! Opens and closes market positions on the USDT-M futures testnet with
//! signed REST requests, sized to clear the exchange's minimum order value.

mod api;
mod config;
mod error;
mod menu;
mod models;
mod report;
mod tester;
mod trading;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tokio::io::BufReader;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::api::FuturesClient;
use crate::config::TesterConfig;
use crate::menu::{execute, run_menu, Action};
use crate::models::Direction;
use crate::tester::OrderTester;

/// Futures testnet order tester CLI.
#[derive(Parser)]
#[command(name = "futures-tester")]
#[command(about = "Open and close test positions on the Binance futures testnet", long_about = None)]
struct Cli {
    /// Credentials and settings file
    #[arg(short, long, env = "FUTURES_TESTER_CONFIG", default_value = "bot_config.json")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive numbered menu (default)
    Menu,

    /// Show the USDT futures wallet balance
    Balance,

    /// Show the account summary
    Account,

    /// List open positions
    Positions,

    /// Open a position with a market order
    Open {
        /// long or short
        #[arg(short, long, default_value = "long")]
        side: Direction,

        /// Symbol, e.g. BTCUSDT (defaults to the configured symbol)
        #[arg(long)]
        symbol: Option<String>,

        /// Order value in USDT (defaults to the configured amount)
        #[arg(short, long)]
        amount: Option<Decimal>,
    },

    /// Close the open position in one symbol
    Close {
        /// Symbol, e.g. BTCUSDT
        #[arg(long)]
        symbol: String,
    },

    /// Close every open position
    CloseAll,

    /// Show the exchange server time
    Time,

    /// Show quantity precision and minimum order value for a symbol
    Rules {
        /// Symbol, e.g. BTCUSDT
        #[arg(long)]
        symbol: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = TesterConfig::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;

    println!("\n=== Binance Futures Order Tester ===");
    println!("API Key:   {}", config.masked_api_key());
    println!("Endpoint:  {}", config.base_url);
    println!("Leverage:  {}x", config.leverage);
    if !config.is_testnet() {
        warn!(base_url = %config.base_url, "Endpoint is not the futures testnet");
        println!("WARNING:   endpoint is not the testnet, orders are real");
    }

    let client = FuturesClient::new(&config)?;
    info!(base_url = %client.base_url(), "Client ready");
    let tester = OrderTester::connect(client, config).await;

    // Connectivity check
    match tester.balance().await {
        Ok(balance) => println!("\n{balance}"),
        Err(e) => {
            error!(error = %e, "Connectivity check failed");
            println!("\nCould not reach the futures API: {e}");
            println!("\nChecklist:");
            println!("  [ ] API key and secret are testnet credentials (testnet.binancefuture.com)");
            println!("  [ ] The key has futures trading enabled");
            println!("  [ ] Network access to {}", tester.config().base_url);
            println!("  [ ] The testnet is up (it is occasionally down for maintenance)");
            anyhow::bail!("connectivity check failed");
        }
    }

    let action = match cli.command.unwrap_or(Commands::Menu) {
        Commands::Menu => {
            let stdin = BufReader::new(tokio::io::stdin());
            run_menu(&tester, stdin).await?;
            return Ok(());
        }
        Commands::Balance => Action::Balance,
        Commands::Account => Action::Account,
        Commands::Positions => Action::Positions,
        Commands::Open {
            side,
            symbol,
            amount,
        } => Action::Open {
            symbol: symbol.unwrap_or_else(|| tester.config().default_symbol.clone()),
            direction: side,
            amount_usd: amount.unwrap_or(tester.config().default_amount_usd),
        },
        Commands::Close { symbol } => Action::Close { symbol },
        Commands::CloseAll => Action::CloseAll,
        Commands::Time => Action::ServerTime,
        Commands::Rules { symbol } => Action::Rules { symbol },
    };

    let output = execute(&tester, action).await?;
    println!("\n{output}");

    Ok(())
}
