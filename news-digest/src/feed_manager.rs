use crate::rss_utils::url::is_valid_feed_url;
use crate::types::{ConfigError, FeedSource};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// One entry of the sources file; every field is optional so that partial
/// entries can be skipped instead of failing the whole file.
#[derive(Debug, Deserialize)]
struct SourceEntry {
    category: Option<String>,
    label: Option<String>,
    url: Option<String>,
}

const DEFAULT_SOURCES: &[(&str, &str, &str)] = &[
    ("ai", "Google News - AI 热点", "https://news.google.com/rss/search?q=AI+OR+%E4%BA%BA%E5%B7%A5%E6%99%BA%E8%83%BD+when:1d&hl=zh-CN&gl=CN&ceid=CN:zh-Hans"),
    ("ai", "ars technica | AI", "https://feeds.arstechnica.com/arstechnica/technology-lab"),
    ("ai", "MIT Technology Review", "https://www.technologyreview.com/feed/"),
    ("ai", "VentureBeat AI", "https://venturebeat.com/category/ai/feed/"),
    ("ai", "Google Blog - AI", "https://blog.google/technology/ai/rss/"),
    ("ai", "Microsoft AI Blog", "https://blogs.microsoft.com/ai/feed/"),
    ("robotics", "Google News - 机器人", "https://news.google.com/rss/search?q=%E6%9C%BA%E5%99%A8%E4%BA%BA+OR+robotics+when:1d&hl=zh-CN&gl=CN&ceid=CN:zh-Hans"),
    ("robotics", "The Robot Report", "https://www.therobotreport.com/feed/"),
    ("robotics", "IEEE Spectrum", "https://spectrum.ieee.org/feed"),
    ("robotics", "Robotics Business Review", "https://www.roboticsbusinessreview.com/feed/"),
    ("robotics", "Robohub", "https://robohub.org/feed/"),
    ("robotics", "ScienceDaily - Robotics", "https://rss.sciencedaily.com/computers_math/robotics.xml"),
    ("finance", "Google News - 中国财经", "https://news.google.com/rss/search?q=%E4%B8%AD%E5%9B%BD+%E8%B4%A2%E7%BB%8F+when:1d&hl=zh-CN&gl=CN&ceid=CN:zh-Hans"),
    ("finance", "MarketWatch - Top Stories", "https://www.marketwatch.com/rss/topstories"),
    ("finance", "BBC Business", "https://feeds.bbci.co.uk/news/business/rss.xml"),
    ("finance", "The Economist - Finance & Economics", "https://www.economist.com/finance-and-economics/rss.xml"),
    ("finance", "Financial Times - World Economy", "https://www.ft.com/world-economy?format=rss"),
    ("finance", "Wall Street Journal - Markets", "https://feeds.a.dj.com/rss/RSSMarketsMain.xml"),
    ("finance", "SCMP - Economy", "https://www.scmp.com/rss/91/feed"),
    ("tech", "Google News - 科技", "https://news.google.com/rss/search?q=%E7%A7%91%E6%8A%80+when:1d&hl=zh-CN&gl=CN&ceid=CN:zh-Hans"),
    ("tech", "TechCrunch", "https://techcrunch.com/feed/"),
    ("tech", "The Verge", "https://www.theverge.com/rss/index.xml"),
    ("tech", "WIRED", "https://www.wired.com/feed/rss"),
    ("tech", "Engadget", "https://www.engadget.com/rss.xml"),
    ("tech", "CNBC Technology", "https://www.cnbc.com/id/100003114/device/rss/rss.html"),
];

/// Read-only catalog of configured feeds, kept in registration order.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: Vec<FeedSource>,
}

impl SourceRegistry {
    pub fn new(sources: Vec<FeedSource>) -> Self {
        Self { sources }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            DEFAULT_SOURCES
                .iter()
                .map(|(category, label, url)| FeedSource::new(category, label, url))
                .collect(),
        )
    }

    /// Load the registry from a JSON array of `{category, label, url}`.
    ///
    /// A missing or unparseable file falls back to the built-in sources.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Sources file {} not found, using built-in defaults", path.display());
                return Self::with_defaults();
            }
            Err(e) => {
                error!("Failed to read {} ({}), using built-in defaults", path.display(), e);
                return Self::with_defaults();
            }
        };

        match Self::from_json_str(&content) {
            Ok(registry) => {
                info!("Loaded {} feed sources from {}", registry.len(), path.display());
                registry
            }
            Err(e) => {
                error!("Failed to parse {} ({}), using built-in defaults", path.display(), e);
                Self::with_defaults()
            }
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<SourceEntry> = serde_json::from_str(content)?;
        let mut sources = Vec::with_capacity(entries.len());

        for entry in entries {
            let (category, url) = match (entry.category, entry.url) {
                (Some(category), Some(url)) if !category.trim().is_empty() && !url.trim().is_empty() => {
                    (category.trim().to_string(), url.trim().to_string())
                }
                _ => {
                    debug!("Skipping source entry without category or url");
                    continue;
                }
            };
            let label = entry
                .label
                .filter(|label| !label.trim().is_empty())
                .unwrap_or_else(|| url.clone());

            match validate_source(FeedSource { category, label, url }) {
                Ok(source) => sources.push(source),
                Err(e) => warn!("Skipping source: {}", e),
            }
        }

        Ok(Self::new(sources))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn sources(&self) -> &[FeedSource] {
        &self.sources
    }

    /// Feeds of one category in registration order.
    pub fn sources_for(&self, category: &str) -> Vec<&FeedSource> {
        self.sources.iter().filter(|s| s.category == category).collect()
    }

    /// Categories in order of first registration.
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for source in &self.sources {
            if !categories.contains(&source.category.as_str()) {
                categories.push(source.category.as_str());
            }
        }
        categories
    }
}

fn validate_source(source: FeedSource) -> Result<FeedSource, ConfigError> {
    if is_valid_feed_url(&source.url) {
        Ok(source)
    } else {
        Err(ConfigError::InvalidFeedUrl {
            label: source.label,
            url: source.url,
        })
    }
}
