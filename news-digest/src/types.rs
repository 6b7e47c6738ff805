use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
// Hand-off types shared with the digest assembler live in the interfaces crate
pub use interfaces::defs::{CanonicalItem, CategoryDigest, Language, SummaryStatus};
pub use interfaces::defs::{AssembledMessage, DigestAssembler, SectionSpec};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub category: String,
    pub label: String,
    pub url: String,
}

impl FeedSource {
    pub fn new(category: &str, label: &str, url: &str) -> Self {
        Self {
            category: category.to_string(),
            label: label.to_string(),
            url: url.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    pub source_label: String,
    pub excerpt: String,
}

impl RawItem {
    pub fn into_canonical(self) -> CanonicalItem {
        CanonicalItem {
            title: self.title,
            link: self.link,
            published_at: self.published_at,
            source_label: self.source_label,
            original_excerpt: self.excerpt,
            translated_summary: None,
            translation: None,
            language: Language::Foreign,
            summary_status: SummaryStatus::Pending,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "news-digest/0.1 (+https://github.com/cwj/useful_push)".to_string(),
            timeout_seconds: 15,
            max_retries: 3,
            retry_delay_ms: 1000,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Feed size exceeds limit: {size_mb}MB")]
    FeedTooLarge { size_mb: usize },

    #[error("Gave up on {url} after {attempts} attempts: {last}")]
    Exhausted { url: String, attempts: u32, last: String },
}

impl FetchError {
    /// Connection resets, timeouts, 429 and 5xx are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SummarizerError {
    #[error("Summarizer rate limited")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Transient summarizer failure: {0}")]
    Transient(String),

    #[error("Summarizer rejected the request: {0}")]
    Rejected(String),

    #[error("Summarizer failed after {attempts} attempt(s): {reason}")]
    Terminal { attempts: u32, reason: String },
}

impl SummarizerError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SummarizerError::RateLimited { .. } | SummarizerError::Transient(_))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: String },

    #[error("Invalid feed URL for {label}: {url}")]
    InvalidFeedUrl { label: String, url: String },

    #[error("Invalid summarizer endpoint: {0}")]
    InvalidEndpoint(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("No category produced a usable source")]
    NoUsableCategory,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] FetchError),
}

pub type Result<T> = std::result::Result<T, DigestError>;
