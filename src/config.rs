use crate::retry::RetryPolicy;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the mediascribe server.
#[derive(Debug)]
pub struct Config {
    /// Bearer token passed to the hosted inference endpoints.
    pub api_token: String,
    /// Base URL of the inference API host.
    pub inference_base_url: String,
    /// Model identifier used for image captioning.
    pub caption_model: String,
    /// Model identifier used for chunk summarization.
    pub summarization_model: String,
    /// Model identifier used for extractive question answering.
    pub qa_model: String,
    /// Maximum characters per corpus chunk handed to the summarizer.
    pub chunk_size: usize,
    /// Upper length bound requested for each chunk summary.
    pub summary_max_length: u32,
    /// Lower length bound requested for each chunk summary.
    pub summary_min_length: u32,
    /// Nucleus sampling threshold for summarization.
    pub summary_top_p: f32,
    /// Frames sampled per second of video during extraction.
    pub frame_sample_fps: u32,
    /// Number of frames captioned concurrently per video job.
    pub caption_concurrency: usize,
    /// Attempt budget for calls to the inference endpoints.
    pub retry_max_attempts: u32,
    /// Base backoff delay in milliseconds.
    pub retry_base_delay_ms: u64,
    /// Backoff delay cap in milliseconds.
    pub retry_max_delay_ms: u64,
    /// Upper bound on the uniform random jitter in milliseconds.
    pub retry_max_jitter_ms: u64,
    /// Optional override for the ffmpeg executable.
    pub ffmpeg_path: Option<String>,
    /// Directory holding uploaded media and transient frame workspaces.
    pub upload_dir: PathBuf,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_token: load_env("HF_API_TOKEN")?,
            inference_base_url: load_env_optional("INFERENCE_BASE_URL")
                .unwrap_or_else(|| "https://api-inference.huggingface.co".to_string()),
            caption_model: load_env_optional("CAPTION_MODEL")
                .unwrap_or_else(|| "Salesforce/blip-image-captioning-base".to_string()),
            summarization_model: load_env_optional("SUMMARIZATION_MODEL")
                .unwrap_or_else(|| "facebook/bart-large-cnn".to_string()),
            qa_model: load_env_optional("QA_MODEL").unwrap_or_else(|| {
                "distilbert/distilbert-base-uncased-distilled-squad".to_string()
            }),
            chunk_size: load_env_parsed_or("CORPUS_CHUNK_SIZE", 2000)?,
            summary_max_length: load_env_parsed_or("SUMMARY_MAX_LENGTH", 200)?,
            summary_min_length: load_env_parsed_or("SUMMARY_MIN_LENGTH", 50)?,
            summary_top_p: load_env_parsed_or("SUMMARY_TOP_P", 0.95)?,
            frame_sample_fps: load_env_parsed_or("FRAME_SAMPLE_FPS", 1)?,
            caption_concurrency: load_env_parsed_or("CAPTION_CONCURRENCY", 4)?,
            retry_max_attempts: load_env_parsed_or("RETRY_MAX_ATTEMPTS", 5)?,
            retry_base_delay_ms: load_env_parsed_or("RETRY_BASE_DELAY_MS", 1_000)?,
            retry_max_delay_ms: load_env_parsed_or("RETRY_MAX_DELAY_MS", 30_000)?,
            retry_max_jitter_ms: load_env_parsed_or("RETRY_MAX_JITTER_MS", 1_000)?,
            ffmpeg_path: load_env_optional("FFMPEG_PATH"),
            upload_dir: load_env_optional("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }

    /// Build the retry policy shared by every call to the inference endpoints.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            max_jitter: Duration::from_millis(self.retry_max_jitter_ms),
        }
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_parsed_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
        .map(|parsed| parsed.unwrap_or(default))
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        inference_base_url = %config.inference_base_url,
        caption_model = %config.caption_model,
        summarization_model = %config.summarization_model,
        qa_model = %config.qa_model,
        chunk_size = config.chunk_size,
        upload_dir = %config.upload_dir.display(),
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
