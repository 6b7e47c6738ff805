use async_trait::async_trait;
use news_digest::llm_adapter::{MockLlmAdapter, MockReply, SummaryRequest};
use news_digest::summarizer::{RateLimitedSummarizer, RetryPolicy, Sleeper};
use news_digest::throttle::Throttle;
use news_digest::types::SummarizerError;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_test_writer()
            .try_init();
    });
}

/// Records requested delays instead of sleeping.
#[derive(Default)]
struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        self.delays.lock().unwrap().push(delay);
    }
}

fn policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        ..RetryPolicy::default()
    }
    .without_jitter()
}

fn client(
    adapter: Arc<MockLlmAdapter>,
    policy: RetryPolicy,
    sleeper: Arc<RecordingSleeper>,
) -> RateLimitedSummarizer {
    let throttle = Arc::new(Throttle::per_minute(100));
    RateLimitedSummarizer::new(adapter, throttle, policy).with_sleeper(sleeper)
}

#[tokio::test]
async fn rate_limited_twice_then_success() {
    init_tracing();
    let adapter = Arc::new(
        MockLlmAdapter::new("scenario-d".to_string()).with_script([
            MockReply::RateLimited,
            MockReply::RateLimited,
            MockReply::Summary("Short summary".to_string()),
        ]),
    );
    let sleeper = Arc::new(RecordingSleeper::default());
    let summarizer = client(adapter.clone(), policy(5), sleeper.clone());

    let response = summarizer
        .summarize(&SummaryRequest::new("Long English text", 200))
        .await
        .expect("third call succeeds");

    info!("Summary: {}", response.summary);
    assert_eq!(response.summary, "Short summary");
    assert_eq!(adapter.call_count().await, 3);
    let delays = sleeper.delays();
    assert_eq!(delays.len(), 2);
    assert!(delays[0] < delays[1], "delays must grow: {:?}", delays);
}

#[tokio::test]
async fn backoff_stops_after_max_attempts() {
    init_tracing();
    let adapter = Arc::new(MockLlmAdapter::new("always-busy".to_string()).with_script(vec![MockReply::Transient; 10]));
    let sleeper = Arc::new(RecordingSleeper::default());
    let summarizer = client(adapter.clone(), policy(4), sleeper.clone());

    let result = summarizer.summarize(&SummaryRequest::new("text", 200)).await;

    match result {
        Err(SummarizerError::Terminal { attempts, .. }) => assert_eq!(attempts, 4),
        other => panic!("expected terminal failure, got {:?}", other),
    }
    assert_eq!(adapter.call_count().await, 4);
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_secs(3), Duration::from_secs(6), Duration::from_secs(12)]
    );
}

#[tokio::test]
async fn rejected_request_is_not_retried() {
    init_tracing();
    let adapter = Arc::new(MockLlmAdapter::new("strict".to_string()).with_script([MockReply::Rejected]));
    let sleeper = Arc::new(RecordingSleeper::default());
    let summarizer = client(adapter.clone(), policy(5), sleeper.clone());

    let result = summarizer.summarize(&SummaryRequest::new("text", 200)).await;

    assert!(matches!(result, Err(SummarizerError::Terminal { attempts: 1, .. })));
    assert_eq!(adapter.call_count().await, 1);
    assert!(sleeper.delays().is_empty());
}

#[test]
fn delays_double_and_cap() {
    let policy = RetryPolicy {
        base_delay: Duration::from_secs(3),
        max_delay: Duration::from_secs(20),
        ..RetryPolicy::default()
    }
    .without_jitter();

    assert_eq!(policy.delay_for(1), Duration::from_secs(3));
    assert_eq!(policy.delay_for(2), Duration::from_secs(6));
    assert_eq!(policy.delay_for(3), Duration::from_secs(12));
    assert_eq!(policy.delay_for(4), Duration::from_secs(20));
    assert_eq!(policy.delay_for(40), Duration::from_secs(20));
}

#[test]
fn jitter_stays_within_bound() {
    let policy = RetryPolicy::default();
    for retry in 1..=6 {
        let base = policy.without_jitter().delay_for(retry);
        let jittered = policy.delay_for(retry);
        assert!(jittered >= base && jittered <= base + policy.jitter);
    }
}

#[tokio::test(start_paused = true)]
async fn throttle_never_exceeds_budget_in_any_window() {
    init_tracing();
    let throttle = Arc::new(Throttle::new(3, Duration::from_secs(60)));
    let start = Instant::now();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let throttle = throttle.clone();
        handles.push(tokio::spawn(async move {
            throttle.acquire().await;
            Instant::now()
        }));
    }
    let mut admitted = Vec::new();
    for handle in handles {
        admitted.push(handle.await.unwrap());
    }
    admitted.sort();

    info!("Last admission after {:?}", admitted.last().unwrap().duration_since(start));
    for (i, at) in admitted.iter().enumerate() {
        let in_window = admitted[i..]
            .iter()
            .filter(|later| later.duration_since(*at) < Duration::from_secs(60))
            .count();
        assert!(in_window <= 3, "{} calls within 60s of call {}", in_window, i);
    }
    assert!(admitted[9].duration_since(start) >= Duration::from_secs(180));
}

#[tokio::test(start_paused = true)]
async fn summarizer_calls_respect_shared_throttle() {
    init_tracing();
    let adapter = Arc::new(MockLlmAdapter::new("paced".to_string()));
    let throttle = Arc::new(Throttle::new(2, Duration::from_secs(60)));
    let summarizer = Arc::new(RateLimitedSummarizer::new(adapter.clone(), throttle, policy(5)));

    for i in 0..5 {
        summarizer
            .summarize(&SummaryRequest::new(format!("item {}", i), 200))
            .await
            .unwrap();
    }

    let calls = adapter.calls().await;
    assert_eq!(calls.len(), 5);
    for window in calls.windows(3) {
        assert!(window[2].at.duration_since(window[0].at) >= Duration::from_secs(60));
    }
}
