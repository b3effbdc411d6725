//! cascade-watch - liquidation cascade simulator and TWAP position monitor
//!
//! Positions are simulated only. Nothing here places orders.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use cascade_watch::cli::commands::{self, SimulateArgs};
use cascade_watch::config::Config;

/// Liquidation cascade simulator and TWAP position monitor
#[derive(Parser)]
#[command(name = "cascade-watch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a liquidation cascade offline
    Simulate {
        /// Current price
        #[arg(long)]
        current: f64,

        /// Target price (default: current * (1 - default_drop_pct))
        #[arg(long)]
        target: Option<f64>,

        /// Open interest in USD
        #[arg(long)]
        oi: f64,

        /// JSON file with the bid ladder
        #[arg(long)]
        bids: Option<String>,

        /// Liquidation density scale
        #[arg(long)]
        k: Option<f64>,

        /// Liquidation density steepness
        #[arg(long)]
        a: Option<f64>,

        /// Drawdown below which no liquidations occur
        #[arg(long)]
        x0: Option<f64>,

        /// Share of open interest held by longs
        #[arg(long)]
        long_ratio: Option<f64>,
    },

    /// Run the live monitor until Ctrl-C
    Watch {
        /// Fixed cascade target price for per-cycle simulations
        #[arg(long)]
        target: Option<f64>,
    },

    /// Show stored positions and P&L
    Positions,

    /// Show current configuration (secrets masked)
    Config,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::from_default_env().add_directive(
        "cascade_watch=info"
            .parse()
            .unwrap_or_else(|_| tracing::Level::INFO.into()),
    );
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_tracing(cli.json);

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Simulate {
            current,
            target,
            oi,
            bids,
            k,
            a,
            x0,
            long_ratio,
        } => {
            let args = SimulateArgs {
                current,
                target,
                oi,
                bids,
                k,
                a,
                x0,
                long_ratio,
            };
            commands::simulate(&config, args).await
        }
        Commands::Watch { target } => commands::watch(&config, target).await,
        Commands::Positions => commands::positions(&config).await,
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
