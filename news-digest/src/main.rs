use anyhow::{bail, Context};
use clap::builder::BoolishValueParser;
use clap::{Parser, ValueEnum};
use interfaces::baseline::BaselineAssembler;
use news_digest::{
    ConfigError, DigestConfig, DigestEnricher, DigestPipeline, EnrichConfig, FetchConfig, Fetcher, HttpSummaryAdapter,
    LlmAdapter, MockLlmAdapter, OpenRouterAdapter, RateLimitedSummarizer, RetryPolicy, SourceRegistry, Throttle,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "news-digest")]
#[command(about = "Fetch, merge and summarize the daily news digest")]
#[command(version)]
struct Cli {
    /// JSON array of {category, label, url}
    #[arg(long, env = "NEWS_SOURCES_FILE", default_value = "news_sources.json")]
    sources: PathBuf,

    /// Summarizer backend
    #[arg(long, env = "SUMMARIZER_BACKEND", value_enum, default_value = "auto")]
    backend: Backend,

    #[arg(long, env = "OPENROUTER_KEY", hide_env_values = true)]
    openrouter_key: Option<String>,

    #[arg(long, env = "OPENROUTER_MODEL")]
    openrouter_model: Option<String>,

    /// Endpoint accepting POST {text, max_chars} and answering {summary}
    #[arg(long, env = "SUMMARY_ENDPOINT")]
    summary_endpoint: Option<String>,

    #[arg(long, env = "SUMMARY_API_KEY", hide_env_values = true)]
    summary_api_key: Option<String>,

    /// Send native-language items to the summarizer as well (env accepts 1/true/yes/on)
    #[arg(long, env = "OPENROUTER_ALWAYS", value_parser = BoolishValueParser::new())]
    force_translate: bool,

    #[arg(long, env = "OPENROUTER_MAX_CHARS", default_value_t = 6000)]
    max_prompt_chars: usize,

    #[arg(long, env = "NEWS_WINDOW_HOURS", default_value_t = 24)]
    window_hours: u32,

    #[arg(long, env = "NEWS_MAX_ITEMS", default_value_t = 20)]
    max_items: usize,

    #[arg(long, env = "SUMMARIZER_CALLS_PER_MINUTE", default_value_t = 12)]
    calls_per_minute: u32,

    #[arg(long, env = "SUMMARIZER_MAX_ATTEMPTS", default_value_t = 5)]
    max_attempts: u32,

    /// Hours east of UTC used for item timestamps
    #[arg(long, env = "DIGEST_UTC_OFFSET", default_value_t = 8, allow_hyphen_values = true)]
    utc_offset: i32,

    /// Write the rendered digest here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Emit the digests as JSON instead of Markdown
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// HTTP endpoint if configured, else OpenRouter if a key is set, else none
    Auto,
    Http,
    Openrouter,
    Mock,
    None,
}

/// Credentials are only ever taken from the real environment, never from the env file.
const SENSITIVE_ENV_KEYS: &[&str] = &[
    "OPENROUTER_KEY",
    "SUMMARY_API_KEY",
    "SERVERCHAN_KEY",
    "GOOGLE_SERVICE_ACCOUNT_JSON",
    "GOOGLE_CALENDAR_ID",
];

/// Apply `KEY=value` pairs from `path`. Variables already present in the
/// environment win; sensitive keys are skipped. Returns the keys applied.
fn load_env_file(path: &Path) -> Result<Vec<String>, dotenvy::Error> {
    let mut applied = Vec::new();
    for entry in dotenvy::from_path_iter(path)? {
        let (key, value) = entry?;
        if key.is_empty() || SENSITIVE_ENV_KEYS.contains(&key.as_str()) || std::env::var_os(&key).is_some() {
            continue;
        }
        std::env::set_var(&key, value);
        applied.push(key);
    }
    Ok(applied)
}

fn build_adapter(cli: &Cli) -> anyhow::Result<Option<Arc<dyn LlmAdapter>>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .context("building summarizer HTTP client")?;

    let http = |endpoint: &str| -> anyhow::Result<Arc<dyn LlmAdapter>> {
        let url = url::Url::parse(endpoint).map_err(|_| ConfigError::InvalidEndpoint(endpoint.to_string()))?;
        Ok(Arc::new(HttpSummaryAdapter::new(client.clone(), url, cli.summary_api_key.clone())))
    };
    let openrouter = |key: &str| -> Arc<dyn LlmAdapter> {
        let adapter = OpenRouterAdapter::new(client.clone(), key.to_string());
        match &cli.openrouter_model {
            Some(model) => Arc::new(adapter.with_model(model.clone())),
            None => Arc::new(adapter),
        }
    };

    let adapter = match cli.backend {
        Backend::Auto => match (&cli.summary_endpoint, &cli.openrouter_key) {
            (Some(endpoint), _) => Some(http(endpoint)?),
            (None, Some(key)) => Some(openrouter(key)),
            (None, None) => None,
        },
        Backend::Http => match &cli.summary_endpoint {
            Some(endpoint) => Some(http(endpoint)?),
            None => bail!(ConfigError::InvalidEndpoint("--summary-endpoint is required for the http backend".to_string())),
        },
        Backend::Openrouter => match &cli.openrouter_key {
            Some(key) => Some(openrouter(key)),
            None => bail!(ConfigError::InvalidEndpoint("OPENROUTER_KEY is required for the openrouter backend".to_string())),
        },
        Backend::Mock => Some(Arc::new(MockLlmAdapter::new("cli".to_string())) as Arc<dyn LlmAdapter>),
        Backend::None => None,
    };
    Ok(adapter)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_file = std::env::var("USEFUL_PUSH_ENV_FILE").unwrap_or_else(|_| ".env".to_string());
    let env_loaded = load_env_file(Path::new(&env_file));
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match env_loaded {
        Ok(keys) => debug!("Loaded {} variables from {}", keys.len(), env_file),
        Err(e) if e.not_found() => debug!("No env file at {}", env_file),
        Err(e) => warn!("Failed to load env file {}: {}", env_file, e),
    }

    let config = DigestConfig {
        window_hours: cli.window_hours,
        max_items: cli.max_items,
        max_prompt_chars: cli.max_prompt_chars,
        calls_per_minute: cli.calls_per_minute,
        force_translate: cli.force_translate,
        retry: RetryPolicy {
            max_attempts: cli.max_attempts,
            ..RetryPolicy::default()
        },
        utc_offset_hours: cli.utc_offset,
        ..DigestConfig::default()
    };
    config.validate().context("invalid digest configuration")?;

    let registry = SourceRegistry::load(&cli.sources);
    info!("Starting news digest with {} feeds", registry.len());

    let summarizer = match build_adapter(&cli)? {
        Some(adapter) => {
            info!("Summarizer backend: {}", adapter.adapter_name());
            let throttle = Arc::new(Throttle::new(config.calls_per_minute as usize, config.throttle_window()));
            Some(Arc::new(RateLimitedSummarizer::new(adapter, throttle, config.retry)))
        }
        None => {
            warn!("No summarizer configured; foreign-language items will keep their original text");
            None
        }
    };

    let fetcher = Fetcher::new(FetchConfig::default()).context("building feed HTTP client")?;
    let enricher = DigestEnricher::new(summarizer, EnrichConfig::from(&config));
    let offset = config.offset()?;
    let pipeline = DigestPipeline::new(registry, Arc::new(fetcher), enricher, config)?;

    let run = pipeline.run().await.context("digest run failed")?;
    for (source, reason) in &run.failed_feeds {
        warn!("Feed {} ({}) unavailable: {}", source.label, source.url, reason);
    }

    let rendered = if cli.json {
        let digests: Vec<_> = run.digests.iter().map(|(_, digest)| digest).collect();
        serde_json::to_string_pretty(&digests).context("serializing digests")?
    } else {
        run.messages::<BaselineAssembler>(offset)
            .into_iter()
            .map(|message| format!("# {}\n\n{}\n", message.title, message.body))
            .collect::<Vec<_>>()
            .join("\n")
    };

    match &cli.output {
        Some(path) => {
            tokio::fs::write(path, rendered)
                .await
                .with_context(|| format!("writing digest to {}", path.display()))?;
            info!("Digest written to {}", path.display());
        }
        None => println!("{}", rendered),
    }

    info!(run_id = %run.run_id, "News digest finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_translate_reads_truthy_env_values() {
        std::env::set_var("OPENROUTER_ALWAYS", "1");
        let forced = Cli::try_parse_from(["news-digest", "--backend", "none"]).unwrap();
        std::env::set_var("OPENROUTER_ALWAYS", "off");
        let unforced = Cli::try_parse_from(["news-digest", "--backend", "none"]).unwrap();
        std::env::remove_var("OPENROUTER_ALWAYS");

        assert!(forced.force_translate);
        assert!(!unforced.force_translate);
        assert!(Cli::try_parse_from(["news-digest", "--force-translate"]).unwrap().force_translate);
    }

    #[test]
    fn env_file_skips_credentials_and_existing_variables() {
        let path = std::env::temp_dir().join(format!("news-digest-env-{}", std::process::id()));
        std::fs::write(
            &path,
            "NEWS_DIGEST_ENV_FILE_MARKER=from-file\nOPENROUTER_KEY=file-secret\nNEWS_DIGEST_ENV_FILE_KEPT=file\n",
        )
        .unwrap();
        std::env::set_var("NEWS_DIGEST_ENV_FILE_KEPT", "process");

        let applied = load_env_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(applied, vec!["NEWS_DIGEST_ENV_FILE_MARKER".to_string()]);
        assert_eq!(std::env::var("NEWS_DIGEST_ENV_FILE_MARKER").as_deref(), Ok("from-file"));
        assert_eq!(std::env::var("NEWS_DIGEST_ENV_FILE_KEPT").as_deref(), Ok("process"));
        assert_ne!(std::env::var("OPENROUTER_KEY").as_deref(), Ok("file-secret"));
    }

    #[test]
    fn missing_env_file_is_not_found() {
        let error = load_env_file(Path::new("/definitely/not/here/.env")).unwrap_err();
        assert!(error.not_found());
    }
}
