//! Polling monitor
//!
//! One cycle reads the feed, opens positions for new triggers, closes
//! positions that hit an exit, and optionally runs a cascade simulation.
//! Cycles are bounded by `cycle_timeout_ms`; a failed or timed-out cycle is
//! logged and the next tick starts fresh.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cascade::{simulate_with_range, CascadeResult};
use crate::config::{MonitorConfig, SimulationConfig};
use crate::error::Result;
use crate::feed::{MarketDataSource, MarketSnapshot};
use crate::notify::Notifier;
use crate::position::{evaluate_positions, CreateOutcome, PositionStore, SimulatedPosition};
use crate::trigger::evaluate_triggers;

/// What one cycle did
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub price: f64,
    pub opened: usize,
    pub closed: usize,
    /// Creates rejected because the trigger id already had a position
    pub conflicts: usize,
    pub cascade: Option<CascadeResult>,
}

pub struct Monitor {
    source: Arc<dyn MarketDataSource>,
    store: Arc<dyn PositionStore>,
    notifier: Arc<dyn Notifier>,
    simulation: SimulationConfig,
    config: MonitorConfig,
    /// Fixed cascade target; derived from `default_drop_pct` when unset
    target_price: Option<f64>,
}

impl Monitor {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        store: Arc<dyn PositionStore>,
        notifier: Arc<dyn Notifier>,
        simulation: SimulationConfig,
        config: MonitorConfig,
    ) -> Self {
        Self {
            source,
            store,
            notifier,
            simulation,
            config,
            target_price: None,
        }
    }

    pub fn with_target_price(mut self, target_price: Option<f64>) -> Self {
        self.target_price = target_price;
        self
    }

    /// Run a single cycle at `now`
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<CycleReport> {
        let snapshot = self.source.snapshot().await?;
        let price = snapshot.perp_price;
        let mut report = CycleReport {
            price,
            ..CycleReport::default()
        };

        let orders = self.source.twap_orders().await?;
        let existing = self.store.list_positions().await?;
        let commands = evaluate_triggers(&orders, price, &existing);
        debug!(
            "Cycle at {:.4}: {} orders, {} positions, {} open commands",
            price,
            orders.len(),
            existing.len(),
            commands.len()
        );

        for command in &commands {
            let position = SimulatedPosition::open_from(command, now);
            match self.store.create_position(position).await? {
                CreateOutcome::Created(position) => {
                    report.opened += 1;
                    self.notifier.on_open(&position).await;
                }
                CreateOutcome::Conflict => {
                    report.conflicts += 1;
                    debug!("Skipped duplicate trigger {}", command.trigger_id);
                }
            }
        }

        let positions = self.store.list_positions().await?;
        for close in evaluate_positions(&positions, price, now) {
            let updated = self
                .store
                .update_position(&close.position_id, close.to_update())
                .await?;
            // Another cycle may have closed it first
            if updated.status == close.status && updated.close_price == Some(close.close_price) {
                report.closed += 1;
                self.notifier.on_close(&updated).await;
            }
        }

        if self.config.run_simulation {
            report.cascade = self.simulate(&snapshot).await;
        }

        Ok(report)
    }

    async fn simulate(&self, snapshot: &MarketSnapshot) -> Option<CascadeResult> {
        let bids = match self.source.bids().await {
            Ok(bids) => bids,
            Err(e) => {
                warn!("Skipping simulation, bid fetch failed: {}", e);
                return None;
            }
        };
        let heatmap = self.source.heatmap().await.unwrap_or_else(|e| {
            warn!("Heatmap fetch failed: {}", e);
            Vec::new()
        });

        let price = snapshot.perp_price;
        let target = self
            .target_price
            .unwrap_or_else(|| self.simulation.default_target(price));

        match simulate_with_range(
            target,
            price,
            snapshot.open_interest,
            &heatmap,
            &bids,
            self.simulation.params(),
            self.simulation.range(),
        ) {
            Ok(result) => {
                info!(
                    "Cascade {:.4} -> {:.4} ({:.2}% drop), ${:.0} liquidated over {} steps",
                    price,
                    result.final_price,
                    result.drop_from(price) * 100.0,
                    result.total_liquidation_triggered,
                    result.steps.len()
                );
                Some(result)
            }
            Err(e) => {
                warn!("Simulation failed: {}", e);
                None
            }
        }
    }

    /// Tick until `shutdown` is cancelled
    pub async fn run(&self, shutdown: CancellationToken) {
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let cycle_timeout = Duration::from_millis(self.config.cycle_timeout_ms);
        info!(
            "Starting monitor with {}ms poll interval",
            self.config.poll_interval_ms
        );

        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Monitor shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match timeout(cycle_timeout, self.run_cycle(Utc::now())).await {
                        Ok(Ok(report)) => debug!(
                            "Cycle done: opened={} closed={} conflicts={}",
                            report.opened, report.closed, report.conflicts
                        ),
                        Ok(Err(e)) => warn!("Monitor cycle failed: {}", e),
                        Err(_) => warn!(
                            "Monitor cycle timed out after {}ms",
                            self.config.cycle_timeout_ms
                        ),
                    }
                }
            }
        }
    }

    /// Run on a background task
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }
}
