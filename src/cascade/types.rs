//! Cascade simulation types

use serde::{Deserialize, Serialize};

/// Fraction of the current price scanned below it
pub const RANGE_PCT: f64 = 0.20;

/// Number of equal-width bins in the scanned range
pub const BINS_COUNT: usize = 100;

/// Emit a checkpoint step every this many bins scanned below the target
pub const TRACE_EVERY: usize = 25;

/// A contiguous price interval with its historical liquidation notional
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBin {
    pub start: f64,
    pub end: f64,
    pub liquidation_value: f64,
}

impl PriceBin {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.start && price < self.end
    }

    pub fn width(&self) -> f64 {
        self.end - self.start
    }
}

/// One rung of order-book bid depth
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BidLevel {
    pub price: f64,
    pub size: f64,
}

impl BidLevel {
    /// Levels with a NaN price or size carry no usable depth
    pub fn is_valid(&self) -> bool {
        !self.price.is_nan() && !self.size.is_nan()
    }
}

/// Coefficients of the liquidation-density model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationParams {
    /// Cascade intensity
    pub k: f64,
    /// Exponential growth rate of liquidation density
    pub a: f64,
    /// Drawdown past which liquidations start
    pub x0: f64,
    /// Fraction of open interest assumed long
    pub long_ratio: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            k: 0.18,
            a: 14.0,
            x0: 0.05,
            long_ratio: 0.6,
        }
    }
}

/// Scan geometry: how far below the current price to look and how finely
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRange {
    pub range_pct: f64,
    pub bins_count: usize,
    pub trace_every: usize,
}

impl Default for ScanRange {
    fn default() -> Self {
        Self {
            range_pct: RANGE_PCT,
            bins_count: BINS_COUNT,
            trace_every: TRACE_EVERY,
        }
    }
}

/// One observable point in the simulation trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeStep {
    pub start_price: f64,
    pub end_price: f64,
    pub liquidated_value: f64,
    pub description: String,
}

/// Outcome of a cascade simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeResult {
    /// Predicted cascade floor
    pub final_price: f64,
    /// USD notional liquidated down to the floor
    pub total_liquidation_triggered: f64,
    pub steps: Vec<CascadeStep>,
}

impl CascadeResult {
    /// Fractional drop from `current_price` to the floor
    pub fn drop_from(&self, current_price: f64) -> f64 {
        if current_price <= 0.0 {
            return 0.0;
        }
        (current_price - self.final_price) / current_price
    }
}
