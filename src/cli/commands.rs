//! CLI command implementations

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cascade::{simulate_with_range, BidLevel, CascadeResult};
use crate::config::Config;
use crate::feed::{normalize_ladder, BidLadder, HttpFeedSource};
use crate::monitor::Monitor;
use crate::notify::LogNotifier;
use crate::position::{JsonFilePositionStore, MemoryPositionStore, PositionStore};

/// Inputs for an offline simulation
#[derive(Debug, Clone, Default)]
pub struct SimulateArgs {
    pub current: f64,
    pub target: Option<f64>,
    pub oi: f64,
    /// JSON file holding a bid ladder
    pub bids: Option<String>,
    pub k: Option<f64>,
    pub a: Option<f64>,
    pub x0: Option<f64>,
    pub long_ratio: Option<f64>,
}

/// Run one cascade simulation against a bid file and print the trace
pub async fn simulate(config: &Config, args: SimulateArgs) -> Result<()> {
    let bids = match &args.bids {
        Some(path) => load_bids(path).await?,
        None => Vec::new(),
    };
    let result = run_simulation(config, &args, &bids)?;
    print_cascade(args.current, &result);
    Ok(())
}

fn run_simulation(config: &Config, args: &SimulateArgs, bids: &[BidLevel]) -> Result<CascadeResult> {
    let mut params = config.simulation.params();
    if let Some(k) = args.k {
        params.k = k;
    }
    if let Some(a) = args.a {
        params.a = a;
    }
    if let Some(x0) = args.x0 {
        params.x0 = x0;
    }
    if let Some(long_ratio) = args.long_ratio {
        params.long_ratio = long_ratio;
    }

    let target = args
        .target
        .unwrap_or_else(|| config.simulation.default_target(args.current));

    info!(
        "Simulating {:.4} -> {:.4} with OI ${:.0} and {} bid levels",
        args.current,
        target,
        args.oi,
        bids.len()
    );

    let result = simulate_with_range(
        target,
        args.current,
        args.oi,
        &[],
        bids,
        params,
        config.simulation.range(),
    )
    .context("Simulation rejected its inputs")?;
    Ok(result)
}

/// Read a bid ladder file in either object or pair form
pub async fn load_bids(path: impl AsRef<Path>) -> Result<Vec<BidLevel>> {
    let path = path.as_ref();
    let data = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Cannot read bids file {}", path.display()))?;
    let ladder: BidLadder = serde_json::from_str(&data)
        .with_context(|| format!("Invalid bids file {}", path.display()))?;
    Ok(normalize_ladder(&ladder))
}

fn print_cascade(current: f64, result: &CascadeResult) {
    println!("\n=== CASCADE TRACE ===\n");
    for step in &result.steps {
        println!(
            "{:>12.4} -> {:>12.4}  ${:>16.0}  {}",
            step.start_price, step.end_price, step.liquidated_value, step.description
        );
    }

    println!("\n=== RESULT ===\n");
    println!("Final Price: {:.4}", result.final_price);
    println!("Drop: {:.2}%", result.drop_from(current) * 100.0);
    println!(
        "Liquidations Triggered: ${:.0}",
        result.total_liquidation_triggered
    );
}

/// Open the configured position store
pub async fn open_store(config: &Config) -> Result<Arc<dyn PositionStore>> {
    match &config.store.path {
        Some(path) => {
            let store = JsonFilePositionStore::open(path)
                .await
                .with_context(|| format!("Failed to open position store {}", path))?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("No store path configured, positions will not be persisted");
            Ok(Arc::new(MemoryPositionStore::new()))
        }
    }
}

/// Run the monitor until Ctrl-C
pub async fn watch(config: &Config, target: Option<f64>) -> Result<()> {
    let source = HttpFeedSource::new(config.feed.clone()).context("Failed to build feed client")?;
    let store = open_store(config).await?;

    let monitor = Arc::new(
        Monitor::new(
            Arc::new(source),
            store,
            Arc::new(LogNotifier),
            config.simulation.clone(),
            config.monitor.clone(),
        )
        .with_target_price(target),
    );

    let shutdown = CancellationToken::new();
    let handle = monitor.spawn(shutdown.clone());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Received shutdown signal");
    shutdown.cancel();

    handle.await.context("Monitor task panicked")?;
    Ok(())
}

/// List stored positions with status and PnL
pub async fn positions(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let positions = store.list_positions().await?;

    println!("\n=== POSITIONS ===\n");
    if positions.is_empty() {
        println!("No positions.");
        return Ok(());
    }

    for p in &positions {
        let pnl = p
            .pnl_percent
            .map(|v| format!("{:+.2}%", v))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {:<4} {:<11} entry {:>10.4}  close {:>10}  PnL {:>8}  {}",
            p.created_at.format("%Y-%m-%d %H:%M"),
            p.direction.as_str(),
            p.status.label(),
            p.entry_price,
            p.close_price
                .map(|v| format!("{:.4}", v))
                .unwrap_or_else(|| "-".to_string()),
            pnl,
            p.trigger_id.as_deref().unwrap_or("-"),
        );
    }

    let open = positions.iter().filter(|p| p.is_open()).count();
    let realized: f64 = positions
        .iter()
        .filter_map(|p| p.pnl_percent.map(|pct| p.amount_usd * pct / 100.0))
        .sum();
    println!(
        "\nTotal: {}  Open: {}  Realized PnL: ${:+.2}",
        positions.len(),
        open,
        realized
    );
    Ok(())
}

/// Show current configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}
