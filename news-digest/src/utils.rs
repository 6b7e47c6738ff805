/// Text processing utilities
pub mod text {
    use once_cell::sync::Lazy;
    use regex::Regex;

    static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>|</?[^>]+>").unwrap());
    static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
    static RE_SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[。！？!?.]").unwrap());

    /// Collapse runs of whitespace into single spaces and trim.
    pub fn trim_whitespace(text: &str) -> String {
        RE_WS.replace_all(text, " ").trim().to_string()
    }

    /// Drop markup and decode entities, leaving readable text.
    pub fn strip_html(html: &str) -> String {
        if html.is_empty() {
            return String::new();
        }
        let without_tags = RE_TAGS.replace_all(html, " ");
        let decoded = html_escape::decode_html_entities(&without_tags);
        trim_whitespace(&decoded)
    }

    /// Cut to at most `max_chars` characters, appending `ellipsis` when anything was removed.
    pub fn truncate_chars(text: &str, max_chars: usize, ellipsis: &str) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }
        let kept: String = text.chars().take(max_chars).collect();
        format!("{}{}", kept.trim_end(), ellipsis)
    }

    /// First sentence of `text`, including its terminator.
    pub fn first_sentence(text: &str) -> &str {
        match RE_SENTENCE_END.find(text) {
            Some(m) => &text[..m.end()],
            None => text,
        }
    }

    /// Summary built without calling the summarizer.
    pub fn local_summary(text: &str, title: &str, max_chars: usize) -> String {
        let clean = text.trim();
        if clean.is_empty() {
            return if title.trim().is_empty() {
                "暂无摘要。".to_string()
            } else {
                format!("要点：{}", title.trim())
            };
        }
        let sentence = first_sentence(clean);
        format!("要点：{}", truncate_chars(sentence, max_chars.saturating_sub(1).max(1), "…"))
    }
}

/// Language-dominance heuristic
pub mod lang {
    use crate::types::Language;

    pub const DEFAULT_NATIVE_THRESHOLD: f64 = 0.3;

    /// CJK Unified Ideographs, the target script of the digest.
    pub fn is_target_script(c: char) -> bool {
        ('\u{4e00}'..='\u{9fff}').contains(&c)
    }

    /// Share of target-script characters among the alphabetic characters of `text`.
    pub fn target_script_ratio(text: &str) -> f64 {
        let (target, letters) = text
            .chars()
            .filter(|c| c.is_alphabetic())
            .fold((0usize, 0usize), |(target, letters), c| {
                (target + usize::from(is_target_script(c)), letters + 1)
            });
        if letters == 0 {
            0.0
        } else {
            target as f64 / letters as f64
        }
    }

    pub fn detect(text: &str, threshold: f64) -> Language {
        if !text.trim().is_empty() && target_script_ratio(text) >= threshold {
            Language::Native
        } else {
            Language::Foreign
        }
    }
}
