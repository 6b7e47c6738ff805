use news_digest::feed_manager::SourceRegistry;
use std::path::Path;

#[test]
fn missing_file_falls_back_to_defaults() {
    let registry = SourceRegistry::load(Path::new("/definitely/not/here/news_sources.json"));

    assert!(!registry.is_empty());
    assert_eq!(registry.categories(), vec!["ai", "robotics", "finance", "tech"]);
}

#[test]
fn unparseable_file_falls_back_to_defaults() {
    let path = std::env::temp_dir().join(format!("news-sources-{}.json", std::process::id()));
    std::fs::write(&path, "{ not json").unwrap();

    let registry = SourceRegistry::load(&path);
    std::fs::remove_file(&path).ok();

    assert_eq!(registry.len(), SourceRegistry::with_defaults().len());
}

#[test]
fn incomplete_entries_are_skipped_and_labels_default() {
    let registry = SourceRegistry::from_json_str(
        r#"[
            {"category": "tech", "label": "Verge", "url": "https://www.theverge.com/rss/index.xml"},
            {"category": "tech", "url": "https://techcrunch.com/feed/"},
            {"label": "No category", "url": "https://example.com/feed"},
            {"category": "ai", "label": "No url"},
            {"category": "ai", "label": "Bad url", "url": "ftp://example.com/feed"},
            {"category": "space", "label": "NASA", "url": "https://www.nasa.gov/rss/dyn/breaking_news.rss"}
        ]"#,
    )
    .unwrap();

    assert_eq!(registry.len(), 3);
    assert_eq!(registry.categories(), vec!["tech", "space"]);
    let tech = registry.sources_for("tech");
    assert_eq!(tech[0].label, "Verge");
    assert_eq!(tech[1].label, "https://techcrunch.com/feed/");
    assert!(registry.sources_for("ai").is_empty());
}
