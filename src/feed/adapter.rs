//! Normalization of raw feed payloads into simulator inputs

use tracing::debug;

use super::types::{BidLadder, RawBidLevel, RawHeatmapBin};
use crate::cascade::{BidLevel, PriceBin};

fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_level(price: &str, size: &str) -> Option<BidLevel> {
    Some(BidLevel {
        price: parse_decimal(price)?,
        size: parse_decimal(size)?,
    })
}

/// Parse string-encoded bids, dropping unparsable and non-finite entries
pub fn normalize_bids(raw: &[RawBidLevel]) -> Vec<BidLevel> {
    let bids: Vec<BidLevel> = raw
        .iter()
        .filter_map(|level| parse_level(&level.price, &level.size))
        .collect();
    if bids.len() < raw.len() {
        debug!("Dropped {} malformed bid levels", raw.len() - bids.len());
    }
    bids
}

/// Same as [`normalize_bids`] for the `[["price", "size"], ...]` shape
pub fn bids_from_price_size_pairs(pairs: &[[String; 2]]) -> Vec<BidLevel> {
    pairs
        .iter()
        .filter_map(|[price, size]| parse_level(price, size))
        .collect()
}

pub fn normalize_ladder(ladder: &BidLadder) -> Vec<BidLevel> {
    match ladder {
        BidLadder::Levels(levels) => normalize_bids(levels),
        BidLadder::Pairs(pairs) => bids_from_price_size_pairs(pairs),
    }
}

/// Map raw heatmap bins, dropping empty or inverted ones
pub fn normalize_heatmap(raw: &[RawHeatmapBin]) -> Vec<PriceBin> {
    raw.iter()
        .filter(|bin| bin.price_bin_start < bin.price_bin_end)
        .map(|bin| PriceBin {
            start: bin.price_bin_start,
            end: bin.price_bin_end,
            liquidation_value: bin.liquidation_value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(price: &str, size: &str) -> RawBidLevel {
        RawBidLevel {
            price: price.to_string(),
            size: size.to_string(),
        }
    }

    #[test]
    fn test_normalize_bids_drops_malformed() {
        let bids = normalize_bids(&[
            raw("29.95", "1200.5"),
            raw(" 29.90 ", "300"),
            raw("NaN", "10"),
            raw("29.80", "abc"),
            raw("", "1"),
            raw("inf", "1"),
        ]);
        assert_eq!(
            bids,
            vec![
                BidLevel {
                    price: 29.95,
                    size: 1200.5
                },
                BidLevel {
                    price: 29.9,
                    size: 300.0
                },
            ]
        );
    }

    #[test]
    fn test_price_size_pairs() {
        let pairs = vec![
            ["29.5".to_string(), "10".to_string()],
            ["bad".to_string(), "10".to_string()],
        ];
        let bids = bids_from_price_size_pairs(&pairs);
        assert_eq!(bids.len(), 1);
        assert_eq!(bids[0].price, 29.5);

        assert_eq!(normalize_ladder(&BidLadder::Pairs(pairs)).len(), 1);
    }

    #[test]
    fn test_normalize_heatmap_drops_inverted_bins() {
        let bins = normalize_heatmap(&[
            RawHeatmapBin {
                price_bin_start: 27.0,
                price_bin_end: 27.5,
                liquidation_value: 4.0e5,
            },
            RawHeatmapBin {
                price_bin_start: 28.0,
                price_bin_end: 28.0,
                liquidation_value: 1.0,
            },
            RawHeatmapBin {
                price_bin_start: 29.0,
                price_bin_end: 28.5,
                liquidation_value: 1.0,
            },
        ]);
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].start, 27.0);
        assert_eq!(bins[0].liquidation_value, 4.0e5);
    }
}
