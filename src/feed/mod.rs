//! Market data feed: payloads, normalization and sources

pub mod adapter;
pub mod source;
pub mod types;

pub use adapter::{bids_from_price_size_pairs, normalize_bids, normalize_heatmap, normalize_ladder};
pub use source::{HttpFeedSource, MarketDataSource};
pub use types::{BidLadder, MarketSnapshot, RawBidLevel, RawHeatmapBin, TimeWeightedOrder};
