use crate::types::{FeedSource, FetchError, RawItem};
use async_trait::async_trait;

/// Trait for pulling items from one configured feed
#[async_trait]
pub trait PullFeed: Send + Sync {
    /// Fetch and normalize the feed's current entries.
    ///
    /// A malformed payload yields an empty list; only transport failures
    /// that survive the retry budget surface as [`FetchError`].
    async fn pull(&self, source: &FeedSource) -> Result<Vec<RawItem>, FetchError>;
}
