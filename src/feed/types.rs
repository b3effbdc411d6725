//! Wire payloads served by the market data endpoints

use serde::{Deserialize, Serialize};

pub use crate::trigger::TimeWeightedOrder;

/// Prices and open interest for the watched market
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub perp_price: f64,
    pub spot_price: f64,
    /// Open interest in USD
    pub open_interest: f64,
}

/// One order-book bid as served, decimals encoded as strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBidLevel {
    pub price: String,
    pub size: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHeatmapBin {
    pub price_bin_start: f64,
    pub price_bin_end: f64,
    pub liquidation_value: f64,
}

/// Bid ladder in either of the shapes order-book endpoints commonly use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BidLadder {
    /// `[["29.9", "120"], ...]`. Tried first: a struct also accepts a
    /// two-element sequence, an array never accepts an object.
    Pairs(Vec<[String; 2]>),
    /// `[{"price": "29.9", "size": "120"}, ...]`
    Levels(Vec<RawBidLevel>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_wire_names() {
        let snapshot: MarketSnapshot = serde_json::from_str(
            r#"{"perpPrice": 30.1, "spotPrice": 30.0, "openInterest": 10000000}"#,
        )
        .unwrap();
        assert_eq!(snapshot.perp_price, 30.1);
        assert_eq!(snapshot.open_interest, 1e7);
    }

    #[test]
    fn test_bid_ladder_accepts_both_shapes() {
        let levels: BidLadder =
            serde_json::from_str(r#"[{"price": "29.9", "size": "120"}]"#).unwrap();
        assert!(matches!(levels, BidLadder::Levels(ref v) if v.len() == 1));

        let mixed = serde_json::from_str::<BidLadder>(r#"[["29.9", "120"], {"price": "1", "size": "1"}]"#);
        assert!(matches!(mixed, Ok(BidLadder::Levels(_))));

        let pairs: BidLadder = serde_json::from_str(r#"[["29.9", "120"], ["29.8", "80"]]"#).unwrap();
        assert!(matches!(pairs, BidLadder::Pairs(ref v) if v.len() == 2));
    }
}
