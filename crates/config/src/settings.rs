use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub diarization: DiarizationSettings,
    pub claude: ClaudeSettings,
    pub similarity: SimilaritySettings,
    pub retry: RetrySettings,
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL, used to build audio URLs and the
    /// diarization callback URL.
    pub public_base_url: String,
    pub media_dir: String,
    pub cors_origins: Vec<String>,
    pub max_chunk_bytes: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub name: String,
    pub max_pool_size: Option<u32>,
    pub min_pool_size: Option<u32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiarizationSettings {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Shared secret expected in the X-Callback-Secret header of the
    /// diarization webhook. Verification is skipped when unset.
    pub callback_secret: Option<String>,
    pub num_speakers: u32,
    pub poll_interval_secs: u64,
    pub poll_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClaudeSettings {
    pub api_key: Option<String>,
    /// API origin; tests point this at a local stub.
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimilaritySettings {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub limit: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineSettings {
    /// How often the sweeper re-checks for stranded tasks.
    pub sweep_interval_secs: u64,
    /// A pending/processing task older than this is considered stranded
    /// and re-run by the sweeper.
    pub stale_after_secs: u64,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("STYLECOACH"),
            )
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 3000)?
            .set_default("app.public_base_url", "http://localhost:3000")?
            .set_default("app.media_dir", "media")?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("app.max_chunk_bytes", 10 * 1024 * 1024)?
            .set_default("database.url", "mongodb://localhost:27017")?
            .set_default("database.name", "stylecoach")?
            .set_default("diarization.base_url", None::<String>)?
            .set_default("diarization.api_key", None::<String>)?
            .set_default("diarization.callback_secret", None::<String>)?
            .set_default("diarization.num_speakers", 2)?
            .set_default("diarization.poll_interval_secs", 3)?
            .set_default("diarization.poll_timeout_secs", 120)?
            .set_default("claude.api_key", None::<String>)?
            .set_default("claude.base_url", "https://api.anthropic.com")?
            .set_default("claude.model", "claude-sonnet-4-5-20250929")?
            .set_default("claude.max_tokens", 2000)?
            .set_default("similarity.endpoint", None::<String>)?
            .set_default("similarity.api_key", None::<String>)?
            .set_default("similarity.limit", 3)?
            .set_default("retry.max_attempts", 3)?
            .set_default("retry.base_delay_ms", 500)?
            .set_default("retry.max_delay_ms", 10_000)?
            .set_default("pipeline.sweep_interval_secs", 60)?
            .set_default("pipeline.stale_after_secs", 300)?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::load().expect("Failed to load default settings")
    }
}
