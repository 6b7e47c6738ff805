use crate::config::DigestConfig;
use crate::llm_adapter::SummaryRequest;
use crate::summarizer::RateLimitedSummarizer;
use crate::types::{CanonicalItem, CategoryDigest, Language, SummaryStatus};
use crate::utils::lang;
use crate::utils::text::{local_summary, truncate_chars};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Prefix of the summary of an item the summarizer could not handle.
pub const DEGRADED_MARKER: &str = "[translation unavailable]";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnrichConfig {
    pub max_prompt_chars: usize,
    pub local_summary_chars: usize,
    pub native_threshold: f64,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self::from(&DigestConfig::default())
    }
}

impl From<&DigestConfig> for EnrichConfig {
    fn from(config: &DigestConfig) -> Self {
        Self {
            max_prompt_chars: config.max_prompt_chars,
            local_summary_chars: config.local_summary_chars,
            native_threshold: config.native_threshold,
        }
    }
}

/// Attaches a summary to every item, calling the summarizer only for
/// foreign-language items (or all items when forced).
#[derive(Debug, Clone)]
pub struct DigestEnricher {
    summarizer: Option<Arc<RateLimitedSummarizer>>,
    config: EnrichConfig,
    topic: Option<String>,
}

impl DigestEnricher {
    /// Without a summarizer every foreign item degrades.
    pub fn new(summarizer: Option<Arc<RateLimitedSummarizer>>, config: EnrichConfig) -> Self {
        Self {
            summarizer,
            config,
            topic: None,
        }
    }

    pub fn with_topic(&self, topic: impl Into<String>) -> Self {
        Self {
            topic: Some(topic.into()),
            ..self.clone()
        }
    }

    pub async fn enrich(&self, mut item: CanonicalItem, force_translate: bool) -> CanonicalItem {
        let sample = format!("{} {}", item.title, item.original_excerpt);
        item.language = lang::detect(&sample, self.config.native_threshold);

        let source_text = if item.original_excerpt.trim().is_empty() {
            item.title.clone()
        } else {
            item.original_excerpt.clone()
        };

        if item.language == Language::Native && !force_translate {
            item.translated_summary = Some(local_summary(&source_text, &item.title, self.config.local_summary_chars));
            item.summary_status = SummaryStatus::Local;
            debug!("Local summary for native item: {}", item.title);
            return item;
        }

        let Some(summarizer) = &self.summarizer else {
            warn!("No summarizer configured; degrading item: {}", item.title);
            return degrade(item, &source_text);
        };

        let request = SummaryRequest {
            text: truncate_chars(&source_text, self.config.max_prompt_chars, "…"),
            max_chars: self.config.local_summary_chars,
            title: item.title.clone(),
            topic: self.topic.clone(),
        };

        match summarizer.summarize(&request).await {
            Ok(response) => {
                item.translated_summary = Some(response.summary);
                item.translation = response.translation.filter(|t| !t.trim().is_empty());
                item.summary_status = SummaryStatus::Summarized;
                item
            }
            Err(e) => {
                warn!(error = %e, link = %item.link, "Summarizer failed; keeping original text");
                degrade(item, &source_text)
            }
        }
    }

    /// Enrich every item of `digest` in order.
    pub async fn enrich_all(&self, mut digest: CategoryDigest, force_translate: bool) -> CategoryDigest {
        let mut enriched = Vec::with_capacity(digest.items.len());
        for item in std::mem::take(&mut digest.items) {
            enriched.push(self.enrich(item, force_translate).await);
        }
        digest.items = enriched;

        let count = |status: SummaryStatus| digest.items.iter().filter(|i| i.summary_status == status).count();
        info!(
            category = %digest.category,
            local = count(SummaryStatus::Local),
            summarized = count(SummaryStatus::Summarized),
            degraded = count(SummaryStatus::Degraded),
            "Enriched category"
        );
        digest
    }
}

fn degrade(mut item: CanonicalItem, source_text: &str) -> CanonicalItem {
    item.translated_summary = Some(format!("{} {}", DEGRADED_MARKER, source_text.trim()));
    item.translation = None;
    item.summary_status = SummaryStatus::Degraded;
    item
}
