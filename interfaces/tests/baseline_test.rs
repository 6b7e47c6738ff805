use chrono::FixedOffset;
use chrono::TimeZone;
use chrono::Utc;
use interfaces::baseline::BaselineAssembler;
use interfaces::baseline::EMPTY_SECTION_TEXT;
use interfaces::baseline::TRANSLATION_UNAVAILABLE_TEXT;
use interfaces::defs::CanonicalItem;
use interfaces::defs::CategoryDigest;
use interfaces::defs::DigestAssembler;
use interfaces::defs::Language;
use interfaces::defs::SectionSpec;
use interfaces::defs::SummaryStatus;

fn section() -> SectionSpec {
    SectionSpec {
        push_title: "科技快讯".to_owned(),
        section_title: "全球科技资讯".to_owned(),
        utc_offset: FixedOffset::east_opt(8 * 3600).unwrap(),
    }
}

fn item(status: SummaryStatus, summary: Option<&str>, translation: Option<&str>) -> CanonicalItem {
    CanonicalItem {
        title: "Chip maker ships new part".to_owned(),
        link: "https://example.com/chip".to_owned(),
        published_at: Utc.with_ymd_and_hms(2025, 3, 1, 4, 30, 0).unwrap(),
        source_label: "TechCrunch".to_owned(),
        original_excerpt: "A new chip shipped today.".to_owned(),
        translated_summary: summary.map(str::to_owned),
        translation: translation.map(str::to_owned),
        language: Language::Foreign,
        summary_status: status,
    }
}

#[test]
fn empty_digest_renders_placeholder() {
    let digest = CategoryDigest::empty("tech", Utc::now());
    let message = BaselineAssembler::assemble(&section(), &digest);
    assert_eq!(message.title, "科技快讯");
    assert!(message.body.starts_with("## 全球科技资讯\n"));
    assert!(message.body.contains(EMPTY_SECTION_TEXT));
}

#[test]
fn summarized_item_shows_translation_and_original() {
    let digest = CategoryDigest {
        category: "tech".to_owned(),
        items: vec![item(SummaryStatus::Summarized, Some("新芯片发布。"), Some("今天发布了一款新芯片。"))],
        generated_at: Utc::now(),
    };
    let body = BaselineAssembler::assemble(&section(), &digest).body;
    // 04:30 UTC rendered at +08:00
    assert!(body.contains("1. [Chip maker ships new part](https://example.com/chip) · TechCrunch · 03/01 12:30"));
    assert!(body.contains("   - 摘要：新芯片发布。"));
    assert!(body.contains("   - 译文：今天发布了一款新芯片。"));
    assert!(body.contains("   - 原文：A new chip shipped today."));
    assert!(!body.contains(TRANSLATION_UNAVAILABLE_TEXT));
}

#[test]
fn degraded_item_is_marked() {
    let digest = CategoryDigest {
        category: "tech".to_owned(),
        items: vec![
            item(SummaryStatus::Degraded, Some("[translation unavailable] A new chip shipped today."), None),
            item(SummaryStatus::Local, Some("要点：A new chip shipped today."), None),
        ],
        generated_at: Utc::now(),
    };
    let body = BaselineAssembler::assemble(&section(), &digest).body;
    assert!(body.contains(&format!("> 1 条内容 {}", TRANSLATION_UNAVAILABLE_TEXT)));
    assert!(body.contains(&format!("   - 摘要：{}", TRANSLATION_UNAVAILABLE_TEXT)));
    assert!(body.contains("2. [Chip maker ships new part]"));
    assert!(!body.contains("译文"));
}
