use crate::defs::AssembledMessage;
use crate::defs::CanonicalItem;
use crate::defs::CategoryDigest;
use crate::defs::DigestAssembler;
use crate::defs::SectionSpec;
use crate::defs::SummaryStatus;

pub const EMPTY_SECTION_TEXT: &str = "暂无最新内容，稍后再来看看。";
pub const TRANSLATION_UNAVAILABLE_TEXT: &str = "translation unavailable（翻译不可用，已保留原文）";

fn format_header(section: &SectionSpec, digest: &CategoryDigest) -> Vec<String> {
    let mut lines = vec![format!("## {}", section.section_title)];
    let degraded = digest.degraded_count();
    if degraded > 0 {
        lines.push(format!("> {} 条内容 {}", degraded, TRANSLATION_UNAVAILABLE_TEXT));
    }
    lines
}

fn format_item(section: &SectionSpec, index: usize, item: &CanonicalItem) -> Vec<String> {
    let time_str = item.published_at.with_timezone(&section.utc_offset).format("%m/%d %H:%M").to_string();
    let source = if item.source_label.trim().is_empty() { "来源未知" } else { item.source_label.as_str() };
    let excerpt = item.original_excerpt.trim();
    let mut lines = vec![format!("{}. [{}]({}) · {} · {}", index, item.title, item.link, source, time_str)];
    match item.summary_status {
        SummaryStatus::Degraded => lines.push(format!("   - 摘要：{}", TRANSLATION_UNAVAILABLE_TEXT)),
        _ => lines.push(format!("   - 摘要：{}", item.translated_summary.as_deref().unwrap_or("暂无"))),
    }
    match item.translation.as_deref().map(str::trim) {
        Some(translation) if !translation.is_empty() && translation != excerpt => {
            lines.push(format!("   - 译文：{}", translation));
            lines.push(format!("   - 原文：{}", if excerpt.is_empty() { "原文缺失" } else { excerpt }));
        }
        _ => lines.push(format!("   - 原文：{}", if excerpt.is_empty() { "原文缺失" } else { excerpt })),
    }
    lines
}

fn compose_body(section: &SectionSpec, digest: &CategoryDigest) -> String {
    let mut lines = format_header(section, digest);
    if digest.items.is_empty() {
        lines.push(EMPTY_SECTION_TEXT.to_owned());
        return lines.join("\n") + "\n";
    }
    for (index, item) in digest.items.iter().enumerate() {
        lines.extend(format_item(section, index + 1, item));
    }
    lines.push(String::new());
    lines.join("\n")
}

/// Markdown layout: one numbered entry per item with summary, translation and original text.
pub struct BaselineAssembler;

impl DigestAssembler for BaselineAssembler {

    fn assemble(section: &SectionSpec, digest: &CategoryDigest) -> AssembledMessage {
        AssembledMessage {
            title: section.push_title.clone(),
            body: compose_body(section, digest),
        }
    }

}
