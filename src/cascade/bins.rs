//! Price-bin math shared by the simulator and heatmap consumers

use std::cmp::Ordering;

use super::types::{BidLevel, PriceBin, ScanRange};

/// Drop bid levels with a NaN price or size
pub fn sanitize_bids(bids: &[BidLevel]) -> Vec<BidLevel> {
    bids.iter().copied().filter(BidLevel::is_valid).collect()
}

/// Fractional decline from `reference` to `price`
pub fn drawdown(reference: f64, price: f64) -> f64 {
    (reference - price) / reference
}

/// Total bid size resting in `[bin_price, bin_price + bin_step)`
pub fn depth_in_bin(bids: &[BidLevel], bin_price: f64, bin_step: f64) -> f64 {
    let upper = bin_price + bin_step;
    bids.iter()
        .filter(|b| b.price >= bin_price && b.price < upper)
        .map(|b| b.size)
        .sum()
}

/// Sort heatmap bins by `start` ascending
pub fn sort_bins(bins: &mut [PriceBin]) {
    bins.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(Ordering::Equal));
}

/// Sum of liquidation notional across all bins
pub fn heatmap_total(bins: &[PriceBin]) -> f64 {
    bins.iter().map(|b| b.liquidation_value).sum()
}

/// Find the bin covering `price`, if any
pub fn bin_containing(bins: &[PriceBin], price: f64) -> Option<&PriceBin> {
    bins.iter().find(|b| b.contains(price))
}

/// Descending scan over `[current * (1 - range_pct), current]`.
///
/// Prices are produced by repeatedly subtracting the bin step from the
/// current price, so accumulated rounding follows the scan order.
#[derive(Debug, Clone)]
pub struct BinLadder {
    bin_step: f64,
    lower: f64,
    next_price: f64,
    index: usize,
    max_bins: usize,
}

impl BinLadder {
    pub fn new(current_price: f64, range: &ScanRange) -> Self {
        let bins = range.bins_count.max(1);
        Self {
            bin_step: current_price * range.range_pct / bins as f64,
            lower: current_price * (1.0 - range.range_pct),
            next_price: current_price,
            index: 0,
            max_bins: bins + 1,
        }
    }

    pub fn bin_step(&self) -> f64 {
        self.bin_step
    }

    /// Lower bound of the scanned range
    pub fn floor_price(&self) -> f64 {
        self.lower
    }
}

impl Iterator for BinLadder {
    /// `(index, bin_price)` from the current price downward
    type Item = (usize, f64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.max_bins || self.next_price < self.lower || self.bin_step <= 0.0 {
            return None;
        }
        let item = (self.index, self.next_price);
        self.index += 1;
        self.next_price -= self.bin_step;
        Some(item)
    }
}
