use crate::types::{FeedSource, RawItem};
use crate::utils::text::strip_html;
use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use feed_rs::parser;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
#[error("Feed parse error: {0}")]
pub struct ParseError(String);

/// Normalizes RSS, Atom and JSON Feed payloads into [`RawItem`]s.
pub struct FeedParser;

impl FeedParser {
    pub fn parse_feed(content: &[u8], source: &FeedSource, fetched_at: DateTime<Utc>) -> Result<Vec<RawItem>, ParseError> {
        debug!("Parsing feed content from {} ({} bytes)", source.label, content.len());

        let feed = parser::parse(content)
            .map_err(|e| ParseError(format!("Failed to parse feed: {}", e)))?;

        let total = feed.entries.len();
        let items: Vec<RawItem> = feed
            .entries
            .into_iter()
            .filter_map(|entry| Self::parse_entry(entry, source, fetched_at))
            .collect();

        info!("Parsed {} with {} usable entries (of {})", source.label, items.len(), total);
        Ok(items)
    }

    fn parse_entry(entry: Entry, source: &FeedSource, fetched_at: DateTime<Utc>) -> Option<RawItem> {
        let title = entry
            .title
            .as_ref()
            .map(|t| strip_html(&t.content))
            .unwrap_or_default();
        if title.is_empty() {
            debug!("Skipping untitled entry {} from {}", entry.id, source.label);
            return None;
        }

        let link = Self::select_link(&entry);

        // Prefer the summary; fall back to full content
        let excerpt = entry
            .summary
            .as_ref()
            .map(|s| strip_html(&s.content))
            .filter(|s| !s.is_empty())
            .or_else(|| {
                entry
                    .content
                    .as_ref()
                    .and_then(|c| c.body.as_deref())
                    .map(strip_html)
            })
            .unwrap_or_default();

        let published_at = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(fetched_at);

        Some(RawItem {
            title,
            link,
            published_at,
            source_label: source.label.clone(),
            excerpt,
        })
    }

    fn select_link(entry: &Entry) -> String {
        let alternate = entry.links.iter().find(|link| {
            let rel = link.rel.as_deref().unwrap_or("");
            !link.href.trim().is_empty() && (rel.is_empty() || rel.eq_ignore_ascii_case("alternate"))
        });
        if let Some(link) = alternate.or_else(|| entry.links.iter().find(|l| !l.href.trim().is_empty())) {
            return link.href.trim().to_string();
        }
        let id = entry.id.trim();
        if id.starts_with("http://") || id.starts_with("https://") {
            return id.to_string();
        }
        String::new()
    }
}
