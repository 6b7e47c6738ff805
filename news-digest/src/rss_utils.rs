/// URL utilities
pub mod url {
    use url::Url;

    /// Query parameters that only track the click and never change the story.
    const TRACKING_PARAMS: &[&str] = &[
        "utm", "gclid", "fbclid", "yclid", "mc_cid", "mc_eid", "ref", "spm", "cmpid", "ocid",
    ];

    fn is_tracking_param(key: &str) -> bool {
        let key = key.to_ascii_lowercase();
        key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
    }

    /// Validate feed URL format
    pub fn is_valid_feed_url(url_str: &str) -> bool {
        if let Ok(url) = Url::parse(url_str) {
            matches!(url.scheme(), "http" | "https") && url.host().is_some()
        } else {
            false
        }
    }

    /// Canonical form of an article link used as its identity.
    ///
    /// Scheme, fragment, default port, tracking parameters and a trailing slash
    /// are dropped; the remaining query parameters are sorted. Returns `None`
    /// for empty or unparseable links.
    pub fn normalize_link(link: &str) -> Option<String> {
        let trimmed = link.trim();
        if trimmed.is_empty() {
            return None;
        }
        let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else if trimmed.starts_with("//") {
            format!("https:{}", trimmed)
        } else {
            format!("https://{}", trimmed)
        };
        let url = Url::parse(&with_scheme).ok()?;
        let host = url.host_str()?.to_ascii_lowercase();

        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !is_tracking_param(k))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        params.sort();

        let mut key = host;
        if let Some(port) = url.port() {
            key.push_str(&format!(":{}", port));
        }
        key.push_str(url.path().trim_end_matches('/'));
        if !params.is_empty() {
            let query = params
                .iter()
                .map(|(k, v)| if v.is_empty() { k.clone() } else { format!("{}={}", k, v) })
                .collect::<Vec<_>>()
                .join("&");
            key.push('?');
            key.push_str(&query);
        }
        Some(key)
    }
}

/// Time utilities
pub mod time {
    use chrono::{DateTime, Duration, Utc};

    /// Timestamps ahead of `now` come from clock skew; treat them as `now`.
    pub fn clamp_to_now(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
        timestamp.min(now)
    }

    /// Inclusive at the boundary: an item exactly `window` old is kept.
    pub fn within_window(timestamp: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
        now - clamp_to_now(timestamp, now) <= window
    }

    /// Format duration in human-readable form
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.num_seconds();

        if total_seconds < 60 {
            format!("{}s", total_seconds)
        } else if total_seconds < 3600 {
            format!("{}m", total_seconds / 60)
        } else if total_seconds < 86400 {
            format!("{}h", total_seconds / 3600)
        } else {
            format!("{}d", total_seconds / 86400)
        }
    }
}
