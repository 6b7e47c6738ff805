use crate::parser::FeedParser;
use crate::traits::PullFeed;
use crate::types::{FeedSource, FetchConfig, FetchError, RawItem};
use async_trait::async_trait;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use chrono::Utc;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    /// Fetch one feed and parse it into raw items.
    pub async fn fetch(&self, source: &FeedSource) -> Result<Vec<RawItem>, FetchError> {
        let start_time = Instant::now();
        let fetched_at = Utc::now();

        let body = self.fetch_body(&source.url).await?;

        match FeedParser::parse_feed(&body, source, fetched_at) {
            Ok(items) => {
                debug!(
                    "Fetched {} items from {} in {}ms",
                    items.len(),
                    source.label,
                    start_time.elapsed().as_millis()
                );
                Ok(items)
            }
            Err(e) => {
                warn!("Malformed feed {} ({}): {}; treating as empty", source.label, source.url, e);
                Ok(Vec::new())
            }
        }
    }

    async fn fetch_body(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_millis(self.config.retry_delay_ms),
            initial_interval: Duration::from_millis(self.config.retry_delay_ms),
            max_interval: Duration::from_millis(self.config.retry_delay_ms * 8),
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        };

        let attempts = self.config.max_retries + 1;
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < attempts => {
                    let delay = backoff.next_backoff().unwrap_or(backoff.max_interval);
                    warn!(attempt, max = attempts, ?delay, error = %e, "Fetch of {} failed; retrying", url);
                    last_error = Some(e);
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_transient() => {
                    last_error = Some(e);
                }
                Err(e) => {
                    warn!(error = %e, "Fetch of {} failed with a non-retryable error", url);
                    return Err(e);
                }
            }
        }

        let last = last_error.map(|e| e.to_string()).unwrap_or_else(|| "Unknown error".to_string());
        error!("Failed to fetch feed after {} attempts: {}", attempts, url);
        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts,
            last,
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(content_length) = response.content_length() {
            let size_mb = content_length as usize / (1024 * 1024);
            if size_mb > self.config.max_feed_size_mb {
                return Err(FetchError::FeedTooLarge { size_mb });
            }
        }

        let body = response.bytes().await?;
        info!("Successfully fetched feed: {} ({} bytes)", url, body.len());
        Ok(body.to_vec())
    }
}

#[async_trait]
impl PullFeed for Fetcher {
    async fn pull(&self, source: &FeedSource) -> Result<Vec<RawItem>, FetchError> {
        self.fetch(source).await
    }
}
