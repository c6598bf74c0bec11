//! Curve Trader - command line entry point
//!
//! Runs a single buy or sell against the configured ledger node and pool
//! data service, then prints the terminal outcome as JSON.

// Compiler warning configuration
#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use curve_trader::config::TraderConfig;
use curve_trader::data_source::HttpPoolDataSource;
use curve_trader::ledger::RpcLedgerClient;
use curve_trader::metrics::Metrics;
use curve_trader::retry::RetryExecutor;
use curve_trader::tx::{ExecutionMode, TradeRequest, TransactionLifecycleManager, TransactionOutcome};

const ENV_SECRET_KEY: &str = "CURVE_TRADER_SECRET_KEY";

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Spend SOL to buy tokens
    Buy(TradeArgs),
    /// Sell tokens for SOL
    Sell(TradeArgs),
}

#[derive(ClapArgs, Debug)]
struct TradeArgs {
    /// Token mint address
    #[arg(long)]
    mint: String,

    /// SOL in for buy, tokens in for sell
    #[arg(long)]
    amount: f64,

    /// Slippage fraction in [0, 1]
    #[arg(long)]
    slippage: Option<f64>,

    /// Priority fee in SOL
    #[arg(long)]
    priority_fee: Option<f64>,

    /// Dry-run only, never submit
    #[arg(long)]
    simulate: bool,

    /// Wait for the transaction to finalize
    #[arg(long)]
    track: bool,

    /// Overall time budget for the call
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Signer secret (base58 or JSON byte array)
    #[arg(long, env = ENV_SECRET_KEY, hide_env_values = true)]
    secret: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_logging(args.verbose, args.json_logs)?;
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;
    let metrics = Arc::new(Metrics::new().context("Failed to create metrics registry")?);

    let executor = RetryExecutor::new(config.retry_policy()?).with_metrics(metrics.clone());
    let ledger = RpcLedgerClient::new(
        config.rpc.url.clone(),
        config.commitment()?,
        config.rpc_timeout(),
    );
    info!("🌐 Ledger endpoint: {}", ledger.endpoint());
    let data_source = HttpPoolDataSource::new(
        config.data.base_url.clone(),
        config.data_timeout(),
        executor.clone(),
    )?;

    let manager =
        TransactionLifecycleManager::new(Arc::new(ledger), Arc::new(data_source), executor)
            .with_settings(config.manager_settings()?)
            .with_metrics(metrics.clone());

    let outcome = match args.command {
        Command::Buy(trade) => manager.buy(build_request(trade)).await,
        Command::Sell(trade) => manager.sell(build_request(trade)).await,
    }
    .unwrap_or_else(TransactionOutcome::from);

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if args.verbose {
        eprintln!("{}", metrics.gather_text()?);
    }

    if outcome.is_failed() {
        std::process::exit(1);
    }
    Ok(())
}

fn build_request(args: TradeArgs) -> TradeRequest {
    let mode = if args.simulate {
        ExecutionMode::Simulate
    } else {
        ExecutionMode::Execute {
            track_finality: args.track,
        }
    };

    let mut request = TradeRequest::new(mode, args.secret, args.mint, args.amount);
    if let Some(slippage) = args.slippage {
        request = request.with_slippage(slippage);
    }
    if let Some(fee) = args.priority_fee {
        request = request.with_priority_fee(fee);
    }
    if let Some(secs) = args.timeout_secs {
        request = request.with_deadline(Duration::from_secs(secs));
    }
    request
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let env_filter = if verbose {
        "curve_trader=debug,info"
    } else {
        "curve_trader=info,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| env_filter.into());

    // Logs go to stderr so stdout carries only the outcome JSON
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<TraderConfig> {
    if std::path::Path::new(path).exists() {
        TraderConfig::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path))
    } else {
        warn!("Config file '{}' not found, using defaults", path);
        let mut config = TraderConfig::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}
