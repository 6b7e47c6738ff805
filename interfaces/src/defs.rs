use chrono::DateTime;
use chrono::FixedOffset;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// Already written in the digest's target language.
    Native,
    Foreign,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStatus {
    Pending,
    /// Summary cut locally from the excerpt, no summarizer call made.
    Local,
    Summarized,
    /// Summarizer unavailable; `translated_summary` carries the original text behind a marker.
    Degraded,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanonicalItem {
    pub title: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    pub source_label: String,
    pub original_excerpt: String,
    pub translated_summary: Option<String>,
    pub translation: Option<String>,
    pub language: Language,
    pub summary_status: SummaryStatus,
}

impl CanonicalItem {
    pub fn is_degraded(&self) -> bool {
        self.summary_status == SummaryStatus::Degraded
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryDigest {
    pub category: String,
    /// Most recent first.
    pub items: Vec<CanonicalItem>,
    pub generated_at: DateTime<Utc>,
}

impl CategoryDigest {
    pub fn empty(category: &str, generated_at: DateTime<Utc>) -> Self {
        Self {
            category: category.to_owned(),
            items: Vec::new(),
            generated_at,
        }
    }

    pub fn degraded_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_degraded()).count()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SectionSpec {
    pub push_title: String,
    pub section_title: String,
    pub utc_offset: FixedOffset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssembledMessage {
    pub title: String,
    pub body: String,
}

// Object style note:
// Assemblers are stateless formatters run once per category per run.
// Declare an empty type, e.g. `struct BaselineAssembler;`, and read
// everything needed from the parameters.

pub trait DigestAssembler {
    fn assemble(section: &SectionSpec, digest: &CategoryDigest) -> AssembledMessage;
}
