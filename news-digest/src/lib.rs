pub mod types;
pub mod config;
pub mod feed_manager;
pub mod fetcher;
pub mod parser;
pub mod traits;
pub mod merger;
pub mod throttle;
pub mod llm_adapter;
pub mod summarizer;
pub mod enricher;
pub mod pipeline;
pub mod rss_utils;
pub mod utils;

pub use types::*;
pub use config::{CategoryProfile, DigestConfig};
pub use enricher::{DigestEnricher, EnrichConfig, DEGRADED_MARKER};
pub use feed_manager::SourceRegistry;
pub use fetcher::Fetcher;
pub use llm_adapter::{HttpSummaryAdapter, LlmAdapter, MockLlmAdapter, OpenRouterAdapter};
pub use merger::{merge, MergeOptions};
pub use parser::FeedParser;
pub use pipeline::{DigestPipeline, DigestRun};
pub use summarizer::{RateLimitedSummarizer, RetryPolicy, Sleeper};
pub use throttle::Throttle;
pub use traits::PullFeed;
