use chrono::{Duration, Utc};
use news_digest::fetcher::Fetcher;
use news_digest::types::{FeedSource, FetchConfig, FetchError};
use std::sync::Once;
use tracing::info;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_test_writer()
            .try_init();
    });
}

fn fast_config() -> FetchConfig {
    FetchConfig {
        retry_delay_ms: 10,
        timeout_seconds: 5,
        ..FetchConfig::default()
    }
}

fn rss_body() -> String {
    let recent = (Utc::now() - Duration::hours(2)).to_rfc2822();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example Tech</title>
    <link>https://example.com</link>
    <description>Test feed</description>
    <item>
      <title>Dated story</title>
      <link>https://example.com/dated</link>
      <description>&lt;p&gt;Chips &amp;amp; boards&lt;/p&gt;</description>
      <pubDate>{}</pubDate>
    </item>
    <item>
      <title>Undated story</title>
      <link>https://example.com/undated</link>
      <description>No date here</description>
    </item>
    <item>
      <title></title>
      <link>https://example.com/untitled</link>
    </item>
  </channel>
</rss>"#,
        recent
    )
}

fn source(server: &MockServer) -> FeedSource {
    FeedSource::new("tech", "Example Tech", &format!("{}/feed", server.uri()))
}

#[tokio::test]
async fn parses_items_and_defaults_missing_dates() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss_body()))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(fast_config()).unwrap();
    let before = Utc::now();
    let items = fetcher.fetch(&source(&server)).await.unwrap();

    info!("Fetched {} items", items.len());
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].title, "Dated story");
    assert_eq!(items[0].excerpt, "Chips & boards");
    assert_eq!(items[0].source_label, "Example Tech");
    assert!(items[0].published_at < before);
    assert!(items[1].published_at >= before - Duration::seconds(1));
    assert!(items.iter().all(|i| !i.title.is_empty()));
}

#[tokio::test]
async fn retries_server_errors_then_succeeds() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss_body()))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(fast_config()).unwrap();
    let items = fetcher.fetch(&source(&server)).await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn not_found_fails_without_retry() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(fast_config()).unwrap();
    let result = fetcher.fetch(&source(&server)).await;

    assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn persistent_server_errors_exhaust_retries() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(fast_config()).unwrap();
    let result = fetcher.fetch(&source(&server)).await;

    match result {
        Err(FetchError::Exhausted { attempts, .. }) => assert_eq!(attempts, 4),
        other => panic!("expected exhausted retries, got {:?}", other.map(|items| items.len())),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test]
async fn malformed_body_yields_no_items() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>definitely not a feed"))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(fast_config()).unwrap();
    let items = fetcher.fetch(&source(&server)).await.unwrap();

    assert!(items.is_empty());
}
