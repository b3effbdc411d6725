//! Liquidation cascade simulation
//!
//! Pure functions over supplied market data: no network or storage access.

pub mod bins;
pub mod simulator;
pub mod types;

pub use simulator::{simulate, simulate_with_range};
pub use types::{
    BidLevel, CascadeResult, CascadeStep, PriceBin, ScanRange, SimulationParams, BINS_COUNT,
    RANGE_PCT, TRACE_EVERY,
};
