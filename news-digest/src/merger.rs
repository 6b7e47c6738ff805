//! Cross-feed merge for one category.
//!
//! The merge is a fold over the immutable batches in registration order: no
//! accumulator is shared with the fetch tasks, so feed results may arrive in
//! any order before they are handed in here.

use crate::rss_utils::{time, url};
use crate::types::{CanonicalItem, CategoryDigest, FeedSource, RawItem};
use crate::utils::text::trim_whitespace;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
pub struct MergeOptions {
    pub window_hours: u32,
    pub max_items: usize,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            window_hours: 24,
            max_items: 20,
        }
    }
}

/// Identity of an item within a category: normalized link, or the
/// lowercased, whitespace-collapsed title when the link is unusable.
pub fn identity_key(link: &str, title: &str) -> String {
    match url::normalize_link(link) {
        Some(link) => format!("link:{}", link),
        None => format!("title:{}", trim_whitespace(title).to_lowercase()),
    }
}

struct Slot {
    item: CanonicalItem,
    // (feed position, item position) of the first sighting
    order: (usize, usize),
}

#[derive(Default)]
struct Fold {
    slots: Vec<Slot>,
    index: HashMap<String, usize>,
    duplicates: usize,
    out_of_window: usize,
}

impl Fold {
    fn absorb(mut self, order: (usize, usize), raw: &RawItem, now: DateTime<Utc>, window: Duration) -> Self {
        if !time::within_window(raw.published_at, now, window) {
            self.out_of_window += 1;
            return self;
        }
        let published_at = time::clamp_to_now(raw.published_at, now);
        let key = identity_key(&raw.link, &raw.title);

        match self.index.get(&key).copied() {
            Some(slot) => {
                let existing = &mut self.slots[slot].item;
                existing.published_at = existing.published_at.max(published_at);
                self.duplicates += 1;
                debug!("Merged duplicate {} from {}", key, raw.source_label);
            }
            None => {
                let mut item = raw.clone().into_canonical();
                item.published_at = published_at;
                self.index.insert(key, self.slots.len());
                self.slots.push(Slot { item, order });
            }
        }
        self
    }
}

/// Merge the batches of `category` into a window-bounded, recency-ordered,
/// capped digest. Batches of other categories are ignored.
pub fn merge(
    category: &str,
    batches: &[(FeedSource, Vec<RawItem>)],
    options: MergeOptions,
    now: DateTime<Utc>,
) -> CategoryDigest {
    let window = Duration::hours(i64::from(options.window_hours));

    let fold = batches
        .iter()
        .enumerate()
        .filter(|(_, (source, _))| source.category == category)
        .flat_map(|(feed_pos, (_, items))| {
            items
                .iter()
                .enumerate()
                .map(move |(item_pos, raw)| ((feed_pos, item_pos), raw))
        })
        .fold(Fold::default(), |fold, (order, raw)| fold.absorb(order, raw, now, window));

    let Fold {
        mut slots,
        duplicates,
        out_of_window,
        ..
    } = fold;

    slots.sort_by(|a, b| {
        b.item
            .published_at
            .cmp(&a.item.published_at)
            .then_with(|| a.order.cmp(&b.order))
    });
    let unique = slots.len();
    slots.truncate(options.max_items);

    let items: Vec<CanonicalItem> = slots.into_iter().map(|slot| slot.item).collect();
    let oldest = items
        .last()
        .map(|item| time::format_duration(now - item.published_at))
        .unwrap_or_else(|| "-".to_string());

    info!(
        category,
        kept = items.len(),
        unique,
        duplicates,
        out_of_window,
        oldest = %oldest,
        "Merged category"
    );

    CategoryDigest {
        category: category.to_string(),
        items,
        generated_at: now,
    }
}
