//! Trigger engine types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order or position direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Buy, Side::Sell];

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A TWAP order observed on the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWeightedOrder {
    pub id: String,
    /// Epoch milliseconds
    pub time: i64,
    #[serde(default)]
    pub user: String,
    pub side: Side,
    pub size_usd: f64,
    #[serde(default)]
    pub price: Option<f64>,
    pub duration_minutes: i64,
}

impl TimeWeightedOrder {
    /// Order price, or `fallback` when the order carries no usable price
    pub fn price_or(&self, fallback: f64) -> f64 {
        match self.price {
            Some(p) if p.is_finite() && p > 0.0 => p,
            _ => fallback,
        }
    }

    /// Epoch milliseconds at which the order finishes executing
    pub fn end_time_ms(&self) -> i64 {
        self.time
            .saturating_add(self.duration_minutes.saturating_mul(60_000))
    }
}

/// Proposal to open a simulated position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenCommand {
    pub direction: Side,
    pub entry_price: f64,
    pub trigger_id: String,
    /// Epoch milliseconds
    pub end_time: i64,
}

/// Which rule produced a trigger id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    Large,
    Dense,
}

impl TriggerKind {
    pub const LARGE_PREFIX: &'static str = "large_";
    pub const DENSE_PREFIX: &'static str = "dense_";

    pub fn of(trigger_id: &str) -> Option<Self> {
        if trigger_id.starts_with(Self::LARGE_PREFIX) {
            Some(TriggerKind::Large)
        } else if trigger_id.starts_with(Self::DENSE_PREFIX) {
            Some(TriggerKind::Dense)
        } else {
            None
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerKind::Large => f.write_str("large order"),
            TriggerKind::Dense => f.write_str("dense cluster"),
        }
    }
}
