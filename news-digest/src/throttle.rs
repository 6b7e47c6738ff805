use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Sliding-window call limiter shared by every summarizer call of a run.
///
/// Keeps the instants of the calls admitted during the last `window`; a
/// caller that would push the count past `max_calls` waits until the oldest
/// admission leaves the window. Built on `tokio::time`, so paused-clock tests
/// observe the waits without sleeping.
#[derive(Debug)]
pub struct Throttle {
    max_calls: usize,
    window: Duration,
    admitted: Mutex<VecDeque<Instant>>,
}

impl Throttle {
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1),
            window,
            admitted: Mutex::new(VecDeque::with_capacity(max_calls)),
        }
    }

    pub fn per_minute(max_calls: u32) -> Self {
        Self::new(max_calls as usize, Duration::from_secs(60))
    }

    /// Wait for a slot and claim it. Returns the total time spent waiting.
    pub async fn acquire(&self) -> Duration {
        let started = Instant::now();
        loop {
            let wait = {
                let mut admitted = self.admitted.lock().await;
                let now = Instant::now();
                while admitted
                    .front()
                    .is_some_and(|oldest| now.duration_since(*oldest) >= self.window)
                {
                    admitted.pop_front();
                }
                if admitted.len() < self.max_calls {
                    admitted.push_back(now);
                    return now.duration_since(started);
                }
                match admitted.front() {
                    Some(oldest) => (*oldest + self.window).saturating_duration_since(now),
                    None => Duration::ZERO,
                }
            };
            debug!(?wait, "Summarizer budget exhausted; waiting for a slot");
            sleep(wait).await;
        }
    }
}
