use axum::http::HeaderValue;
use clap::{ArgAction, Parser};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{PortfolioError, Result};
use crate::gate::{DownloadPolicy, ProtectedDocument};

/// Service configuration, read from flags or the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "portfolio-api", version, about = "Backend API for a portfolio site")]
pub struct Config {
    /// Server bind address
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
    pub bind_addr: SocketAddr,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "DEBUG", action = ArgAction::Set, default_value_t = false)]
    pub debug: bool,

    #[arg(long, env = "APP_NAME", default_value = "Portfolio API")]
    pub app_name: String,

    /// Origins allowed by CORS (comma separated)
    #[arg(
        long,
        env = "ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:3000,http://127.0.0.1:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// Take the client address from X-Forwarded-For / X-Real-IP
    #[arg(long, env = "TRUST_PROXY_HEADERS", action = ArgAction::Set, default_value_t = false)]
    pub trust_proxy_headers: bool,

    #[arg(long, env = "RESUME_PATH", default_value = "resumes/resume.pdf")]
    pub resume_path: PathBuf,

    /// File name offered to the browser
    #[arg(long, env = "RESUME_FILENAME", default_value = "resume.pdf")]
    pub resume_filename: String,

    #[arg(
        long,
        env = "RESUME_DESCRIPTION",
        default_value = "Resume covering education, experience and selected projects"
    )]
    pub resume_description: String,

    #[arg(long, env = "RESUME_UPDATED", default_value = "")]
    pub resume_updated: String,

    /// Downloads allowed per address per window
    #[arg(long, env = "DOWNLOAD_LIMIT", default_value_t = 3)]
    pub download_limit: u32,

    #[arg(long, env = "DOWNLOAD_WINDOW_SECS", default_value_t = 3600)]
    pub download_window_secs: u64,

    /// Maximum age of a download token in milliseconds
    #[arg(long, env = "TOKEN_MAX_AGE_MS", default_value_t = 3_600_000)]
    pub token_max_age_ms: u64,

    /// Rate limiter cleanup interval in seconds
    #[arg(long, env = "CLEANUP_INTERVAL", default_value_t = 300)]
    pub cleanup_interval_secs: u64,

    /// Visits kept in memory before the oldest are dropped
    #[arg(long, env = "MAX_VISITS", default_value_t = 100_000)]
    pub max_visits: usize,

    #[arg(long, env = "GEMINI_API_KEY", default_value = "", hide_env_values = true)]
    pub gemini_api_key: String,

    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-2.5-flash")]
    pub gemini_model: String,

    #[arg(
        long,
        env = "GEMINI_BASE_URL",
        default_value = "https://generativelanguage.googleapis.com"
    )]
    pub gemini_base_url: String,

    #[arg(long, env = "MAX_TOKENS", default_value_t = 2048)]
    pub max_tokens: u32,

    #[arg(long, env = "TEMPERATURE", default_value_t = 0.7)]
    pub temperature: f32,

    #[arg(long, env = "AI_TIMEOUT_SECS", default_value_t = 30)]
    pub ai_timeout_secs: u64,

    /// Previous chat messages forwarded to the model
    #[arg(long, env = "CHAT_HISTORY_LIMIT", default_value_t = 5)]
    pub history_limit: usize,

    #[arg(long, env = "AI_AGENT_NAME", default_value = "Portfolio Assistant")]
    pub ai_agent_name: String,

    #[arg(
        long,
        env = "AI_AGENT_ROLE",
        default_value = "AI assistant helping recruiters learn about the site owner"
    )]
    pub ai_agent_role: String,

    /// Directory of .md / .txt files the assistant answers from
    #[arg(long, env = "KNOWLEDGE_DIR", default_value = "knowledge")]
    pub knowledge_dir: PathBuf,
}

impl Config {
    /// Load configuration from flags and environment variables
    pub fn from_env() -> std::result::Result<Self, clap::Error> {
        Config::try_parse()
    }

    pub fn validate(&self) -> Result<()> {
        if self.download_limit == 0 {
            return Err(PortfolioError::Configuration(
                "Download limit must be greater than 0".to_string(),
            ));
        }
        if self.download_window_secs == 0 {
            return Err(PortfolioError::Configuration(
                "Download window must be greater than 0".to_string(),
            ));
        }
        if self.token_max_age_ms == 0 {
            return Err(PortfolioError::Configuration(
                "Token max age must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(PortfolioError::Configuration(
                "Temperature must be between 0.0 and 2.0".to_string(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(PortfolioError::Configuration(
                "Max tokens must be greater than 0".to_string(),
            ));
        }
        if self.resume_filename.trim().is_empty() {
            return Err(PortfolioError::Configuration(
                "Resume filename cannot be empty".to_string(),
            ));
        }
        self.cors_origins()?;
        Ok(())
    }

    pub fn download_policy(&self) -> DownloadPolicy {
        DownloadPolicy {
            max_downloads: self.download_limit,
            window: Duration::from_secs(self.download_window_secs),
            token_max_age: Duration::from_millis(self.token_max_age_ms),
        }
    }

    pub fn protected_document(&self) -> ProtectedDocument {
        ProtectedDocument {
            path: self.resume_path.clone(),
            filename: self.resume_filename.clone(),
        }
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }

    pub fn cors_origins(&self) -> Result<Vec<HeaderValue>> {
        self.allowed_origins
            .iter()
            .map(|origin| origin.trim())
            .filter(|origin| !origin.is_empty())
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|_| {
                    PortfolioError::Configuration(format!("Invalid CORS origin: {origin}"))
                })
            })
            .collect()
    }
}
