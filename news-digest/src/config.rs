use crate::merger::MergeOptions;
use crate::summarizer::RetryPolicy;
use crate::types::{ConfigError, SectionSpec};
use crate::utils::lang::DEFAULT_NATIVE_THRESHOLD;
use chrono::FixedOffset;
use std::time::Duration;

pub const DEFAULT_WINDOW_HOURS: u32 = 24;
pub const DEFAULT_MAX_ITEMS: usize = 20;
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 6000;
pub const DEFAULT_CALLS_PER_MINUTE: u32 = 12;
pub const DEFAULT_LOCAL_SUMMARY_CHARS: usize = 200;

/// Run-wide settings of the digest pipeline.
#[derive(Debug, Clone)]
pub struct DigestConfig {
    pub window_hours: u32,
    pub max_items: usize,
    pub max_prompt_chars: usize,
    pub local_summary_chars: usize,
    pub calls_per_minute: u32,
    pub native_threshold: f64,
    pub force_translate: bool,
    pub retry: RetryPolicy,
    /// Offset used when rendering item timestamps.
    pub utc_offset_hours: i32,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            window_hours: DEFAULT_WINDOW_HOURS,
            max_items: DEFAULT_MAX_ITEMS,
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
            local_summary_chars: DEFAULT_LOCAL_SUMMARY_CHARS,
            calls_per_minute: DEFAULT_CALLS_PER_MINUTE,
            native_threshold: DEFAULT_NATIVE_THRESHOLD,
            force_translate: false,
            retry: RetryPolicy::default(),
            utc_offset_hours: 8,
        }
    }
}

impl DigestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_hours == 0 {
            return Err(ConfigError::Zero { field: "window_hours" });
        }
        if self.max_items == 0 {
            return Err(ConfigError::Zero { field: "max_items" });
        }
        if self.max_prompt_chars == 0 {
            return Err(ConfigError::Zero { field: "max_prompt_chars" });
        }
        if self.local_summary_chars == 0 {
            return Err(ConfigError::Zero { field: "local_summary_chars" });
        }
        if self.calls_per_minute == 0 {
            return Err(ConfigError::Zero { field: "calls_per_minute" });
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Zero { field: "max_attempts" });
        }
        if !(0.0..=1.0).contains(&self.native_threshold) {
            return Err(ConfigError::OutOfRange {
                field: "native_threshold",
                value: self.native_threshold.to_string(),
            });
        }
        if self.retry.base_delay > self.retry.max_delay {
            return Err(ConfigError::OutOfRange {
                field: "base_delay",
                value: format!("{:?} exceeds max_delay {:?}", self.retry.base_delay, self.retry.max_delay),
            });
        }
        self.offset()?;
        Ok(())
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            window_hours: self.window_hours,
            max_items: self.max_items,
        }
    }

    pub fn throttle_window(&self) -> Duration {
        Duration::from_secs(60)
    }

    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).ok_or_else(|| ConfigError::OutOfRange {
            field: "utc_offset_hours",
            value: self.utc_offset_hours.to_string(),
        })
    }
}

/// Presentation metadata of one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryProfile {
    pub key: String,
    pub push_title: String,
    pub section_title: String,
    /// Topic handed to the summarizer prompt.
    pub topic_label: String,
    /// Per-category cap; `None` uses `DigestConfig::max_items`.
    pub max_items: Option<usize>,
}

const BUILTIN_PROFILES: &[(&str, &str, &str, &str)] = &[
    ("ai", "AI 新闻速递", "AI 热点（过去 24 小时）", "AI"),
    ("robotics", "机器人观察", "机器人行业动态（过去 24 小时）", "机器人"),
    ("finance", "财经要闻", "财经 / 宏观经济", "财经 / 宏观经济"),
    ("tech", "科技快讯", "全球科技资讯", "科技"),
];

impl CategoryProfile {
    pub fn builtin(key: &str) -> Option<Self> {
        BUILTIN_PROFILES
            .iter()
            .find(|(k, ..)| *k == key)
            .map(|(key, push_title, section_title, topic_label)| Self {
                key: key.to_string(),
                push_title: push_title.to_string(),
                section_title: section_title.to_string(),
                topic_label: topic_label.to_string(),
                max_items: None,
            })
    }

    /// Built-in profile for known categories; the key itself otherwise.
    pub fn for_category(key: &str) -> Self {
        Self::builtin(key).unwrap_or_else(|| Self {
            key: key.to_string(),
            push_title: key.to_string(),
            section_title: key.to_string(),
            topic_label: key.to_string(),
            max_items: None,
        })
    }

    pub fn section_spec(&self, utc_offset: FixedOffset) -> SectionSpec {
        SectionSpec {
            push_title: self.push_title.clone(),
            section_title: self.section_title.clone(),
            utc_offset,
        }
    }
}
