use std::{env, path::PathBuf, time::Duration};

const DEFAULT_API_URL: &str = "http://localhost:8000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TOKEN_FILE: &str = ".stagebloom/tokens.json";
const DEFAULT_MAX_UPLOAD_MB: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub request_timeout: Duration,
    pub token_file: PathBuf,
    pub max_upload_bytes: u64,
}

impl Config {
    /// Reads the `STAGEBLOOM_*` variables; call `dotenv` first to pick up `.env`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("STAGEBLOOM_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let timeout_secs = lookup("STAGEBLOOM_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let token_file = lookup("STAGEBLOOM_TOKEN_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE));

        let max_upload_mb = lookup("STAGEBLOOM_MAX_UPLOAD_MB")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_MB);

        Self {
            api_url,
            request_timeout: Duration::from_secs(timeout_secs),
            token_file,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
