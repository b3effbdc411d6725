//! Liquidation cascade simulator
//!
//! Scans price bins downward from the current price, accumulating modeled
//! long-liquidation sell pressure against resting bid depth. The first bin
//! at or below the target where pressure meets depth is the cascade floor.
//!
//! Sell pressure comes from a parametric density over open interest only.
//! The heatmap argument is accepted for callers that display it alongside
//! the result and is not consulted numerically.

use tracing::debug;

use super::bins::{depth_in_bin, drawdown, sanitize_bids, BinLadder};
use super::types::{BidLevel, CascadeResult, CascadeStep, PriceBin, ScanRange, SimulationParams};
use crate::error::{Error, Result};

/// Simulate a downward long-liquidation cascade with the default scan range.
///
/// `target_price < current_price` is the caller's responsibility; the
/// result is meaningless otherwise.
pub fn simulate(
    target_price: f64,
    current_price: f64,
    open_interest: f64,
    heatmap: &[PriceBin],
    bids: &[BidLevel],
    params: SimulationParams,
) -> Result<CascadeResult> {
    simulate_with_range(
        target_price,
        current_price,
        open_interest,
        heatmap,
        bids,
        params,
        ScanRange::default(),
    )
}

/// Simulate with an explicit scan range
pub fn simulate_with_range(
    target_price: f64,
    current_price: f64,
    open_interest: f64,
    heatmap: &[PriceBin],
    bids: &[BidLevel],
    params: SimulationParams,
    range: ScanRange,
) -> Result<CascadeResult> {
    validate_inputs(target_price, current_price, open_interest, &params, &range)?;

    let bids = sanitize_bids(bids);
    let long_oi = open_interest * params.long_ratio;
    let ladder = BinLadder::new(current_price, &range);
    let bin_step = ladder.bin_step();

    debug!(
        target_price,
        current_price,
        long_oi,
        bids = bids.len(),
        heatmap_bins = heatmap.len(),
        "Starting cascade scan"
    );

    let mut cumulative_pressure = 0.0;
    let mut cumulative_depth = 0.0;
    let mut below_target = 0usize;
    let mut floor: Option<f64> = None;
    let mut steps = Vec::new();

    for (_, bin_price) in ladder {
        let dd = drawdown(current_price, bin_price);
        if dd > params.x0 {
            cumulative_pressure += long_oi
                * params.k
                * (params.a * (dd - params.x0)).exp()
                * (bin_step / current_price);
        }
        if !cumulative_pressure.is_finite() {
            return Err(Error::NonFinite("cumulative sell pressure"));
        }

        cumulative_depth += depth_in_bin(&bids, bin_price, bin_step);

        if bin_price > target_price {
            continue;
        }
        below_target += 1;

        if cumulative_pressure >= cumulative_depth {
            steps.push(CascadeStep {
                start_price: current_price,
                end_price: bin_price,
                liquidated_value: cumulative_pressure * bin_price,
                description: format!(
                    "Sell pressure {:.2} meets bid depth {:.2} at {:.4}: cascade floor",
                    cumulative_pressure, cumulative_depth, bin_price
                ),
            });
            floor = Some(bin_price);
            break;
        }

        if below_target % range.trace_every == 0 {
            steps.push(CascadeStep {
                start_price: current_price,
                end_price: bin_price,
                liquidated_value: cumulative_pressure * bin_price,
                description: format!(
                    "Scanned to {:.4}: pressure {:.2} vs depth {:.2}",
                    bin_price, cumulative_pressure, cumulative_depth
                ),
            });
        }
    }

    let final_price = match floor {
        Some(price) => price,
        None => {
            steps.push(CascadeStep {
                start_price: current_price,
                end_price: target_price,
                liquidated_value: cumulative_pressure * target_price,
                description: format!(
                    "No floor in scanned range: bid depth {:.2} exceeds projected pressure {:.2}",
                    cumulative_depth, cumulative_pressure
                ),
            });
            target_price
        }
    };

    let total_liquidation_triggered = cumulative_pressure * final_price;
    if !total_liquidation_triggered.is_finite() {
        return Err(Error::NonFinite("total liquidation triggered"));
    }

    debug!(
        final_price,
        total_liquidation_triggered,
        steps = steps.len(),
        "Cascade scan complete"
    );

    Ok(CascadeResult {
        final_price,
        total_liquidation_triggered,
        steps,
    })
}

fn validate_inputs(
    target_price: f64,
    current_price: f64,
    open_interest: f64,
    params: &SimulationParams,
    range: &ScanRange,
) -> Result<()> {
    if !current_price.is_finite() || current_price <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "current_price must be positive and finite, got {}",
            current_price
        )));
    }
    if !target_price.is_finite() {
        return Err(Error::InvalidInput(format!(
            "target_price must be finite, got {}",
            target_price
        )));
    }
    if !open_interest.is_finite() || open_interest < 0.0 {
        return Err(Error::InvalidInput(format!(
            "open_interest must be non-negative and finite, got {}",
            open_interest
        )));
    }
    if ![params.k, params.a, params.x0, params.long_ratio]
        .iter()
        .all(|v| v.is_finite())
    {
        return Err(Error::InvalidInput(format!(
            "simulation params must be finite, got {:?}",
            params
        )));
    }
    if !(range.range_pct > 0.0 && range.range_pct < 1.0) || range.bins_count == 0 {
        return Err(Error::InvalidInput(format!(
            "scan range must cover (0, 1) of price with at least one bin, got {:?}",
            range
        )));
    }
    if range.trace_every == 0 {
        return Err(Error::InvalidInput("trace_every must be positive".to_string()));
    }
    Ok(())
}
