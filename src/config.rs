//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::cascade::{ScanRange, SimulationParams};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Liquidation-density model and scan geometry
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_k")]
    pub k: f64,
    #[serde(default = "default_a")]
    pub a: f64,
    #[serde(default = "default_x0")]
    pub x0: f64,
    #[serde(default = "default_long_ratio")]
    pub long_ratio: f64,
    #[serde(default = "default_range_pct")]
    pub range_pct: f64,
    #[serde(default = "default_bins_count")]
    pub bins_count: usize,
    #[serde(default = "default_trace_every")]
    pub trace_every: usize,
    /// Target drop used when no explicit target price is given
    #[serde(default = "default_drop_pct")]
    pub default_drop_pct: f64,
}

impl SimulationConfig {
    pub fn params(&self) -> SimulationParams {
        SimulationParams {
            k: self.k,
            a: self.a,
            x0: self.x0,
            long_ratio: self.long_ratio,
        }
    }

    pub fn range(&self) -> ScanRange {
        ScanRange {
            range_pct: self.range_pct,
            bins_count: self.bins_count,
            trace_every: self.trace_every,
        }
    }

    /// Target price for a simulation run around `current_price`
    pub fn default_target(&self, current_price: f64) -> f64 {
        current_price * (1.0 - self.default_drop_pct)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            a: default_a(),
            x0: default_x0(),
            long_ratio: default_long_ratio(),
            range_pct: default_range_pct(),
            bins_count: default_bins_count(),
            trace_every: default_trace_every(),
            default_drop_pct: default_drop_pct(),
        }
    }
}

/// Upstream feed endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_snapshot_url")]
    pub snapshot_url: String,
    #[serde(default = "default_orderbook_url")]
    pub orderbook_url: String,
    #[serde(default = "default_heatmap_url")]
    pub heatmap_url: String,
    #[serde(default = "default_twap_url")]
    pub twap_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_elapsed_ms")]
    pub retry_max_elapsed_ms: u64,
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            snapshot_url: default_snapshot_url(),
            orderbook_url: default_orderbook_url(),
            heatmap_url: default_heatmap_url(),
            twap_url: default_twap_url(),
            timeout_ms: default_timeout_ms(),
            cache_ttl_ms: default_cache_ttl_ms(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_elapsed_ms: default_retry_max_elapsed_ms(),
        }
    }
}

/// Polling monitor cadence
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_cycle_timeout_ms")]
    pub cycle_timeout_ms: u64,
    /// Run a cascade simulation on every cycle
    #[serde(default = "default_true")]
    pub run_simulation: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            cycle_timeout_ms: default_cycle_timeout_ms(),
            run_simulation: true,
        }
    }
}

/// Position store location; in-memory when `path` is unset
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub path: Option<String>,
}

fn default_k() -> f64 {
    0.18
}

fn default_a() -> f64 {
    14.0
}

fn default_x0() -> f64 {
    0.05
}

fn default_long_ratio() -> f64 {
    0.6
}

fn default_range_pct() -> f64 {
    crate::cascade::RANGE_PCT
}

fn default_bins_count() -> usize {
    crate::cascade::BINS_COUNT
}

fn default_trace_every() -> usize {
    crate::cascade::TRACE_EVERY
}

fn default_drop_pct() -> f64 {
    0.10
}

fn default_snapshot_url() -> String {
    "http://127.0.0.1:8080/api/market".to_string()
}

fn default_orderbook_url() -> String {
    "http://127.0.0.1:8080/api/orderbook".to_string()
}

fn default_heatmap_url() -> String {
    "http://127.0.0.1:8080/api/heatmap".to_string()
}

fn default_twap_url() -> String {
    "http://127.0.0.1:8080/api/twap".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_cache_ttl_ms() -> u64 {
    10_000
}

fn default_retry_base_delay_ms() -> u64 {
    200
}

fn default_retry_max_elapsed_ms() -> u64 {
    3000
}

fn default_poll_interval_ms() -> u64 {
    30_000
}

fn default_cycle_timeout_ms() -> u64 {
    20_000
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix CASCADE_)
            .add_source(
                config::Environment::with_prefix("CASCADE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let sim = &self.simulation;

        if !(0.0..=1.0).contains(&sim.long_ratio) {
            anyhow::bail!("long_ratio must be between 0 and 1, got {}", sim.long_ratio);
        }

        if !(sim.range_pct > 0.0 && sim.range_pct < 1.0) {
            anyhow::bail!("range_pct must be in (0, 1), got {}", sim.range_pct);
        }

        if sim.bins_count == 0 {
            anyhow::bail!("bins_count must be positive");
        }

        if sim.trace_every == 0 {
            anyhow::bail!("trace_every must be positive");
        }

        if !(sim.default_drop_pct > 0.0 && sim.default_drop_pct <= sim.range_pct) {
            anyhow::bail!(
                "default_drop_pct must be in (0, range_pct={}], got {}",
                sim.range_pct,
                sim.default_drop_pct
            );
        }

        if ![sim.k, sim.a, sim.x0].iter().all(|v| v.is_finite()) {
            anyhow::bail!("k, a and x0 must be finite");
        }

        if self.feed.timeout_ms == 0 {
            anyhow::bail!("feed.timeout_ms must be positive");
        }

        if self.monitor.poll_interval_ms == 0 {
            anyhow::bail!("monitor.poll_interval_ms must be positive");
        }

        if self.monitor.cycle_timeout_ms == 0 {
            anyhow::bail!("monitor.cycle_timeout_ms must be positive");
        }

        if self.monitor.cycle_timeout_ms > self.monitor.poll_interval_ms {
            tracing::warn!(
                "cycle_timeout_ms ({}) exceeds poll_interval_ms ({}): cycles may overlap",
                self.monitor.cycle_timeout_ms,
                self.monitor.poll_interval_ms
            );
        }

        Ok(())
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  Simulation:
    k: {}, a: {}, x0: {}, long_ratio: {}
    range: {}% in {} bins, trace every {} bins
    default drop: {}%
  Feed:
    Snapshot: {}
    Orderbook: {}
    Heatmap: {}
    TWAP: {}
    Timeout: {}ms, Cache TTL: {}ms
  Monitor:
    Poll Interval: {}ms, Cycle Timeout: {}ms
    Simulation Each Cycle: {}
  Store:
    Path: {}
"#,
            self.simulation.k,
            self.simulation.a,
            self.simulation.x0,
            self.simulation.long_ratio,
            self.simulation.range_pct * 100.0,
            self.simulation.bins_count,
            self.simulation.trace_every,
            self.simulation.default_drop_pct * 100.0,
            mask_url(&self.feed.snapshot_url),
            mask_url(&self.feed.orderbook_url),
            mask_url(&self.feed.heatmap_url),
            mask_url(&self.feed.twap_url),
            self.feed.timeout_ms,
            self.feed.cache_ttl_ms,
            self.monitor.poll_interval_ms,
            self.monitor.cycle_timeout_ms,
            self.monitor.run_simulation,
            self.store.path.as_deref().unwrap_or("(in-memory)"),
        )
    }
}

/// Mask URL for display (hide API keys in query params)
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}
