use crate::types::SummarizerError;
use crate::utils::text::{strip_html, trim_whitespace};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// One summarization request. Only `text` and `max_chars` go over the wire
/// to a plain summary endpoint; `title` and `topic` feed prompt-based adapters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRequest {
    pub text: String,
    pub max_chars: usize,
    #[serde(skip)]
    pub title: String,
    #[serde(skip)]
    pub topic: Option<String>,
}

impl SummaryRequest {
    pub fn new(text: impl Into<String>, max_chars: usize) -> Self {
        Self {
            text: text.into(),
            max_chars,
            title: String::new(),
            topic: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Trait for services that can translate and summarize one news item
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    /// Get the name of this LLM adapter
    fn adapter_name(&self) -> String;

    /// Make exactly one call. Retries and throttling belong to the caller.
    async fn summarize(&self, request: &SummaryRequest) -> Result<SummaryResponse, SummarizerError>;
}

/// Map a non-success HTTP status onto the retry taxonomy.
pub fn classify_status(status: StatusCode, retry_after: Option<Duration>, body: &str) -> SummarizerError {
    let detail = format!("HTTP {}: {}", status.as_u16(), trim_whitespace(body));
    match status.as_u16() {
        429 => SummarizerError::RateLimited { retry_after },
        408 | 500..=599 => SummarizerError::Transient(detail),
        _ => SummarizerError::Rejected(detail),
    }
}

fn classify_transport(error: reqwest::Error) -> SummarizerError {
    if error.is_builder() {
        SummarizerError::Rejected(error.to_string())
    } else {
        SummarizerError::Transient(error.to_string())
    }
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

async fn send_json(request: reqwest::RequestBuilder) -> Result<reqwest::Response, SummarizerError> {
    let response = request.send().await.map_err(classify_transport)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let wait = retry_after(&response);
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(status, wait, &body))
}

/// Adapter for a plain summary endpoint: `POST {text, max_chars}` → `{summary}`.
pub struct HttpSummaryAdapter {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl HttpSummaryAdapter {
    pub fn new(client: Client, endpoint: Url, api_key: Option<String>) -> Self {
        Self { client, endpoint, api_key }
    }
}

#[async_trait]
impl LlmAdapter for HttpSummaryAdapter {
    fn adapter_name(&self) -> String {
        format!("HTTP summary endpoint ({})", self.endpoint)
    }

    async fn summarize(&self, request: &SummaryRequest) -> Result<SummaryResponse, SummarizerError> {
        let mut builder = self.client.post(self.endpoint.clone()).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = send_json(builder).await?;
        response
            .json::<SummaryResponse>()
            .await
            .map_err(|e| SummarizerError::Transient(format!("Malformed summary response: {}", e)))
    }
}

pub const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const OPENROUTER_DEFAULT_MODEL: &str = "qwen/qwen3-235b-a22b:free";

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TranslationPayload {
    #[serde(default)]
    translation: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

/// Pull the first JSON object out of a model reply, tolerating prose around it.
pub fn extract_json_from_text(text: &str) -> Option<serde_json::Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        return value.is_object().then_some(value);
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<serde_json::Value>(&trimmed[start..=end])
        .ok()
        .filter(|value| value.is_object())
}

/// OpenAI-compatible chat completion adapter (OpenRouter by default).
pub struct OpenRouterAdapter {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenRouterAdapter {
    pub fn new(client: Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            model: OPENROUTER_DEFAULT_MODEL.to_string(),
            endpoint: OPENROUTER_ENDPOINT.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn build_prompt(request: &SummaryRequest) -> String {
        let topic = request.topic.as_deref().unwrap_or("新闻");
        let body = if request.text.trim().is_empty() { "（无摘要）" } else { request.text.as_str() };
        format!(
            "你是资讯助理。下面是一条关于{topic}的新闻。请把正文译成自然流畅的中文（原文已是中文则保持不变），\
             再用不超过两句话写出中文摘要。只输出 JSON，不要附加其它文字，格式如下：\n\
             {{\"translation\": \"<中文译文或原文>\", \"summary\": \"<中文摘要>\", \"language\": \"<原文语言，如 zh / en>\"}}\n\
             新闻原文：\n标题：{title}\n内容：{body}",
            topic = topic,
            title = request.title,
            body = body,
        )
    }
}

#[async_trait]
impl LlmAdapter for OpenRouterAdapter {
    fn adapter_name(&self) -> String {
        format!("OpenRouter ({})", self.model)
    }

    async fn summarize(&self, request: &SummaryRequest) -> Result<SummaryResponse, SummarizerError> {
        let payload = json!({
            "model": self.model,
            "temperature": 0.2,
            "messages": [{ "role": "user", "content": Self::build_prompt(request) }],
        });
        let builder = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", "https://github.com/cwj/useful_push")
            .header("X-Title", "useful_push")
            .json(&payload);

        let response = send_json(builder).await?;
        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| SummarizerError::Transient(format!("Malformed completion: {}", e)))?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| SummarizerError::Transient("Empty completion".to_string()))?;

        let parsed: TranslationPayload = extract_json_from_text(&content)
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default();
        let translation = parsed
            .translation
            .map(|t| strip_html(&t))
            .filter(|t| !t.is_empty());
        let summary = parsed
            .summary
            .map(|s| trim_whitespace(&s))
            .filter(|s| !s.is_empty());

        match (summary, translation) {
            (Some(summary), translation) => Ok(SummaryResponse {
                summary,
                translation,
                language: parsed.language,
            }),
            (None, Some(translation)) => Ok(SummaryResponse {
                summary: translation.clone(),
                translation: Some(translation),
                language: parsed.language,
            }),
            (None, None) => {
                debug!("Completion carried no JSON payload; using raw text as summary");
                Ok(SummaryResponse {
                    summary: trim_whitespace(&content),
                    translation: None,
                    language: None,
                })
            }
        }
    }
}

/// Scripted reply for [`MockLlmAdapter`].
#[derive(Debug, Clone)]
pub enum MockReply {
    Summary(String),
    RateLimited,
    Transient,
    Rejected,
}

#[derive(Debug, Clone)]
pub struct MockCall {
    pub at: Instant,
    pub request: SummaryRequest,
}

/// Mock LLM adapter for development and testing
pub struct MockLlmAdapter {
    name: String,
    response_delay_ms: u64,
    script: Mutex<VecDeque<MockReply>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockLlmAdapter {
    pub fn new(name: String) -> Self {
        Self {
            name,
            response_delay_ms: 0,
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.response_delay_ms = delay_ms;
        self
    }

    /// Replies consumed in order; once exhausted every call succeeds.
    pub fn with_script(self, replies: impl IntoIterator<Item = MockReply>) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().collect()),
            ..self
        }
    }

    pub async fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    async fn simulate_processing(&self) {
        if self.response_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.response_delay_ms)).await;
        }
    }
}

#[async_trait]
impl LlmAdapter for MockLlmAdapter {
    fn adapter_name(&self) -> String {
        format!("Mock LLM Adapter ({})", self.name)
    }

    async fn summarize(&self, request: &SummaryRequest) -> Result<SummaryResponse, SummarizerError> {
        self.calls.lock().await.push(MockCall {
            at: Instant::now(),
            request: request.clone(),
        });
        self.simulate_processing().await;

        let reply = self.script.lock().await.pop_front();
        match reply {
            Some(MockReply::Summary(summary)) => Ok(SummaryResponse {
                summary,
                translation: None,
                language: Some("en".to_string()),
            }),
            Some(MockReply::RateLimited) => {
                warn!("{} answering with a rate limit", self.adapter_name());
                Err(SummarizerError::RateLimited { retry_after: None })
            }
            Some(MockReply::Transient) => Err(SummarizerError::Transient("mock transient failure".to_string())),
            Some(MockReply::Rejected) => Err(SummarizerError::Rejected("mock rejected request".to_string())),
            None => {
                let head: String = request.text.chars().take(40).collect();
                info!("{} summarizing {} chars", self.adapter_name(), request.text.chars().count());
                Ok(SummaryResponse {
                    summary: format!("摘要：{}", head),
                    translation: Some(format!("译文：{}", head)),
                    language: Some("en".to_string()),
                })
            }
        }
    }
}
