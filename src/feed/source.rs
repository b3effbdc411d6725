//! Market data sources
//!
//! [`HttpFeedSource`] polls four JSON endpoints. Every payload is
//! normalized before it is cached, so a cache hit never re-parses.

use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::adapter::{normalize_heatmap, normalize_ladder};
use super::types::{BidLadder, MarketSnapshot, RawHeatmapBin, TimeWeightedOrder};
use crate::cache::{Clock, SystemClock, TtlCache};
use crate::cascade::{BidLevel, PriceBin};
use crate::config::FeedConfig;
use crate::error::{Error, Result};

/// Read-only view of the watched market
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn snapshot(&self) -> Result<MarketSnapshot>;

    /// Bid ladder below the current price
    async fn bids(&self) -> Result<Vec<BidLevel>>;

    /// Liquidation heatmap, informational only
    async fn heatmap(&self) -> Result<Vec<PriceBin>>;

    /// Recently observed time-weighted orders
    async fn twap_orders(&self) -> Result<Vec<TimeWeightedOrder>>;
}

/// JSON-over-HTTP feed with retry and per-payload caching
pub struct HttpFeedSource {
    client: reqwest::Client,
    config: FeedConfig,
    snapshots: TtlCache<String, MarketSnapshot>,
    bids: TtlCache<String, Vec<BidLevel>>,
    heatmaps: TtlCache<String, Vec<PriceBin>>,
    orders: TtlCache<String, Vec<TimeWeightedOrder>>,
}

impl HttpFeedSource {
    pub fn new(config: FeedConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: FeedConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        let ttl = config.cache_ttl();

        Ok(Self {
            client,
            snapshots: TtlCache::with_clock(ttl, clock.clone()),
            bids: TtlCache::with_clock(ttl, clock.clone()),
            heatmaps: TtlCache::with_clock(ttl, clock.clone()),
            orders: TtlCache::with_clock(ttl, clock),
            config,
        })
    }

    /// Drop every cached payload
    pub fn invalidate_all(&self) {
        self.snapshots.invalidate(&self.config.snapshot_url);
        self.bids.invalidate(&self.config.orderbook_url);
        self.heatmaps.invalidate(&self.config.heatmap_url);
        self.orders.invalidate(&self.config.twap_url);
    }

    /// GET `url` and decode its JSON body, retrying transient failures
    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(self.config.retry_base_delay_ms),
            max_interval: Duration::from_millis(self.config.retry_base_delay_ms * 4),
            max_elapsed_time: Some(Duration::from_millis(self.config.retry_max_elapsed_ms)),
            ..Default::default()
        };

        retry(backoff, || async {
            match self.fetch_once(url).await {
                Ok(value) => Ok(value),
                Err(e) if e.is_retryable() => {
                    warn!("Retryable feed error: {}", e);
                    Err(backoff::Error::transient(e))
                }
                Err(e) => {
                    warn!("Feed request failed: {}", e);
                    Err(backoff::Error::permanent(e))
                }
            }
        })
        .await
    }

    /// Single attempt
    async fn fetch_once<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::FeedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = resp.text().await.map_err(|e| self.transport_error(e))?;
        Ok(serde_json::from_str(&body)?)
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::FeedTimeout(self.config.timeout_ms)
        } else {
            Error::from(e)
        }
    }
}

#[async_trait]
impl MarketDataSource for HttpFeedSource {
    async fn snapshot(&self) -> Result<MarketSnapshot> {
        let url = &self.config.snapshot_url;
        self.snapshots
            .get_or_try_insert_with(url.clone(), || self.fetch_json::<MarketSnapshot>(url))
            .await
    }

    async fn bids(&self) -> Result<Vec<BidLevel>> {
        let url = &self.config.orderbook_url;
        self.bids
            .get_or_try_insert_with(url.clone(), || async {
                let ladder: BidLadder = self.fetch_json(url).await?;
                Ok::<_, Error>(normalize_ladder(&ladder))
            })
            .await
    }

    async fn heatmap(&self) -> Result<Vec<PriceBin>> {
        let url = &self.config.heatmap_url;
        self.heatmaps
            .get_or_try_insert_with(url.clone(), || async {
                let raw: Vec<RawHeatmapBin> = self.fetch_json(url).await?;
                Ok::<_, Error>(normalize_heatmap(&raw))
            })
            .await
    }

    async fn twap_orders(&self) -> Result<Vec<TimeWeightedOrder>> {
        let url = &self.config.twap_url;
        self.orders
            .get_or_try_insert_with(url.clone(), || {
                self.fetch_json::<Vec<TimeWeightedOrder>>(url)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `body` with `status` to every request, counting hits
    async fn serve(status: &'static str, body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}", addr), hits)
    }

    fn feed_config(base: &str) -> FeedConfig {
        FeedConfig {
            snapshot_url: format!("{}/market", base),
            orderbook_url: format!("{}/orderbook", base),
            heatmap_url: format!("{}/heatmap", base),
            twap_url: format!("{}/twap", base),
            retry_base_delay_ms: 10,
            retry_max_elapsed_ms: 100,
            ..FeedConfig::default()
        }
    }

    #[tokio::test]
    async fn test_snapshot_is_cached_until_ttl() {
        let (base, hits) = serve(
            "200 OK",
            r#"{"perpPrice": 30.0, "spotPrice": 29.98, "openInterest": 10000000}"#,
        )
        .await;
        let clock = Arc::new(ManualClock::new());
        let source = HttpFeedSource::with_clock(feed_config(&base), clock.clone()).unwrap();

        let first = source.snapshot().await.unwrap();
        let second = source.snapshot().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.open_interest, 1e7);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_millis(10_001));
        source.snapshot().await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_bids_are_normalized() {
        let (base, _) = serve("200 OK", r#"[["29.9", "100"], ["NaN", "5"], ["29.8", "50"]]"#).await;
        let source = HttpFeedSource::new(feed_config(&base)).unwrap();

        let bids = source.bids().await.unwrap();
        assert_eq!(bids.len(), 2);
        assert_eq!(bids[1].price, 29.8);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let (base, hits) = serve("404 Not Found", "{}").await;
        let source = HttpFeedSource::new(feed_config(&base)).unwrap();

        let err = source.twap_orders().await.unwrap_err();
        assert!(matches!(err, Error::FeedStatus { status: 404, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let (base, hits) = serve("503 Service Unavailable", "{}").await;
        let source = HttpFeedSource::new(feed_config(&base)).unwrap();

        let err = source.heatmap().await.unwrap_err();
        assert!(err.is_retryable());
        assert!(hits.load(Ordering::SeqCst) > 1);
    }
}
