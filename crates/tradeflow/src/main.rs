use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use tradeflow::services::stock_trader::TraderState;
use tradeflow::services::{market_analyst, orchestrator, stock_trader};

#[derive(Parser, Debug)]
#[command(
    name = "tradeflow",
    about = "Multi-agent trading platform - orchestrator, market analyst and stock trader services"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config/tradeflow.toml")]
    config: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the trading orchestrator
    Orchestrator {
        /// Override the configured listen port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run the reference market analyst
    MarketAnalyst {
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run the reference stock trader
    StockTrader {
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respects RUST_LOG
    let logs = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if cli.json_logs {
        logs.json().init();
    } else {
        logs.init();
    }

    let config = tradeflow::load_config(&cli.config)?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Received shutdown signal");
        shutdown.cancel();
    });

    match cli.command {
        Command::Orchestrator { port } => {
            let state = tradeflow::build_orchestrator(&config.orchestrator)
                .context("Failed to build orchestrator")?;
            let bind = tradeflow::override_port(&config.orchestrator.bind, port);
            tradeflow::server::serve("orchestrator", orchestrator::router(state), &bind, cancel)
                .await
        }
        Command::MarketAnalyst { port } => {
            let bind = tradeflow::override_port(&config.market_analyst.bind, port);
            tradeflow::server::serve("market-analyst", market_analyst::router(), &bind, cancel)
                .await
        }
        Command::StockTrader { port } => {
            let bind = tradeflow::override_port(&config.stock_trader.bind, port);
            let app = stock_trader::router(Arc::new(TraderState::new()));
            tradeflow::server::serve("stock-trader", app, &bind, cancel).await
        }
    }
}
