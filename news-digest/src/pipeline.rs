use crate::config::{CategoryProfile, DigestConfig};
use crate::enricher::DigestEnricher;
use crate::feed_manager::SourceRegistry;
use crate::merger::{merge, MergeOptions};
use crate::traits::PullFeed;
use crate::types::{AssembledMessage, CategoryDigest, DigestAssembler, DigestError, FeedSource, RawItem, Result};
use chrono::{DateTime, FixedOffset, Utc};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Outcome of one pipeline run.
#[derive(Debug, Clone)]
pub struct DigestRun {
    pub run_id: Uuid,
    /// One entry per category with at least one configured source, in registration order.
    pub digests: Vec<(CategoryProfile, CategoryDigest)>,
    /// Feeds that failed after retries, with the reason.
    pub failed_feeds: Vec<(FeedSource, String)>,
}

impl DigestRun {
    pub fn digest(&self, category: &str) -> Option<&CategoryDigest> {
        self.digests
            .iter()
            .find(|(profile, _)| profile.key == category)
            .map(|(_, digest)| digest)
    }

    pub fn messages<A: DigestAssembler>(&self, utc_offset: FixedOffset) -> Vec<AssembledMessage> {
        self.digests
            .iter()
            .map(|(profile, digest)| A::assemble(&profile.section_spec(utc_offset), digest))
            .collect()
    }
}

/// Main pipeline: registry → concurrent fetch → per-category merge → enrichment.
pub struct DigestPipeline {
    registry: SourceRegistry,
    fetcher: Arc<dyn PullFeed>,
    enricher: DigestEnricher,
    config: DigestConfig,
    profiles: HashMap<String, CategoryProfile>,
}

impl DigestPipeline {
    pub fn new(
        registry: SourceRegistry,
        fetcher: Arc<dyn PullFeed>,
        enricher: DigestEnricher,
        config: DigestConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            registry,
            fetcher,
            enricher,
            config,
            profiles: HashMap::new(),
        })
    }

    /// Override the presentation profile of one category.
    pub fn with_profile(mut self, profile: CategoryProfile) -> Self {
        self.profiles.insert(profile.key.clone(), profile);
        self
    }

    pub fn profile(&self, category: &str) -> CategoryProfile {
        self.profiles
            .get(category)
            .cloned()
            .unwrap_or_else(|| CategoryProfile::for_category(category))
    }

    pub fn config(&self) -> &DigestConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<DigestRun> {
        self.run_at(Utc::now()).await
    }

    /// Run with an explicit "now", the reference point of the recency window.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<DigestRun> {
        let run_id = Uuid::new_v4();
        let span = info_span!("digest_run", %run_id);
        self.execute(run_id, now).instrument(span).await
    }

    async fn execute(&self, run_id: Uuid, now: DateTime<Utc>) -> Result<DigestRun> {
        let start_time = Instant::now();
        let categories = self.registry.categories();
        info!(
            categories = categories.len(),
            feeds = self.registry.len(),
            "Starting digest run"
        );

        let (batches, failed_feeds) = self.fetch_all().await;

        let usable = categories
            .iter()
            .filter(|category| batches.iter().any(|(source, _)| source.category == **category))
            .count();
        if usable == 0 {
            error!(failed = failed_feeds.len(), "No category has a reachable source");
            return Err(DigestError::NoUsableCategory);
        }

        let merged: Vec<(CategoryProfile, CategoryDigest)> = categories
            .iter()
            .map(|category| {
                let profile = self.profile(category);
                if !batches.iter().any(|(source, _)| source.category == *category) {
                    debug!(category = *category, "Every feed of category failed");
                    return (profile, CategoryDigest::empty(category, now));
                }
                let defaults = self.config.merge_options();
                let options = MergeOptions {
                    max_items: profile.max_items.unwrap_or(defaults.max_items),
                    ..defaults
                };
                let digest = merge(category, &batches, options, now);
                (profile, digest)
            })
            .collect();

        let force = self.config.force_translate;
        let digests = join_all(merged.into_iter().map(|(profile, digest)| {
            let enricher = self.enricher.with_topic(profile.topic_label.clone());
            async move {
                let digest = enricher.enrich_all(digest, force).await;
                (profile, digest)
            }
        }))
        .await;

        info!(
            usable,
            failed_feeds = failed_feeds.len(),
            items = digests.iter().map(|(_, d)| d.items.len()).sum::<usize>(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Digest run complete"
        );

        Ok(DigestRun {
            run_id,
            digests,
            failed_feeds,
        })
    }

    /// Fetch every registered feed concurrently. A failing feed never
    /// affects its siblings; it is reported and contributes no items.
    async fn fetch_all(&self) -> (Vec<(FeedSource, Vec<RawItem>)>, Vec<(FeedSource, String)>) {
        let handles: Vec<_> = self
            .registry
            .sources()
            .iter()
            .cloned()
            .map(|source| {
                let fetcher = Arc::clone(&self.fetcher);
                tokio::spawn(
                    async move {
                        let result = fetcher.pull(&source).await;
                        (source, result)
                    }
                    .in_current_span(),
                )
            })
            .collect();

        let mut batches = Vec::with_capacity(handles.len());
        let mut failed = Vec::new();

        for (index, joined) in join_all(handles).await.into_iter().enumerate() {
            match joined {
                Ok((source, Ok(items))) => {
                    debug!("Pulled {} items from {}", items.len(), source.label);
                    batches.push((source, items));
                }
                Ok((source, Err(e))) => {
                    warn!(category = %source.category, feed = %source.label, error = %e, "Feed failed; continuing without it");
                    failed.push((source, e.to_string()));
                }
                Err(e) => {
                    let source = self.registry.sources()[index].clone();
                    warn!(feed = %source.label, error = %e, "Fetch task aborted");
                    failed.push((source, e.to_string()));
                }
            }
        }

        (batches, failed)
    }
}
