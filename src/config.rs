// Application configuration, loaded from environment variables and CLI flags.

use std::path::PathBuf;
use std::time::Duration;

use crate::services::gemini::{DEFAULT_GEMINI_API_BASE, DEFAULT_GEMINI_MODEL};
use crate::services::joke::DEFAULT_JOKE_API_URL;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GOOGLE_API_KEY is missing. Please ensure it is set in your environment variables.")]
    MissingApiKey,
}

/// Whether a `DEV_MODE` value turns development mode on.
pub fn dev_mode_enabled(value: Option<&str>) -> bool {
    value
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "t"))
        .unwrap_or(false)
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the HTTP server to.
    pub host: String,
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Tokio worker threads.
    pub workers: usize,
    /// Development mode: debug-level logging.
    pub dev_mode: bool,
    /// API key for the Gemini text-generation service.
    pub google_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub gemini_timeout: Duration,
    pub joke_api_url: String,
    /// Directory containing frontend files to serve.
    /// When set, the backend serves static files from this path.
    pub static_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `GOOGLE_API_KEY` - Gemini API key (required)
    /// - `GEMINI_MODEL` - Model name (default: `gemini-2.0-flash-lite-001`)
    /// - `GEMINI_API_BASE` - REST base URL
    /// - `GEMINI_TIMEOUT_SECS` - Generation request timeout (default: 30)
    /// - `JOKE_API_URL` - Joke endpoint (default: `https://icanhazdadjoke.com/`)
    /// - `HOST` - Bind address (default: `0.0.0.0`)
    /// - `PORT` - HTTP server port (default: 8000)
    /// - `WORKERS` - Runtime worker threads (default: 1)
    /// - `DEV_MODE` - `true`, `1` or `t` for debug logging
    /// - `STATIC_DIR` - Path to frontend files for static serving
    ///
    /// CLI flags:
    /// - `--port <PORT>` - Override the port
    pub fn load() -> Result<Self, ConfigError> {
        let args: Vec<String> = std::env::args().collect();
        Self::from_sources(&args, |key| std::env::var(key).ok())
    }

    /// Build a config from CLI args and an environment lookup.
    pub fn from_sources<F>(args: &[String], env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let google_api_key = env("GOOGLE_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let host = env("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        // Port: CLI flag --port takes precedence, then env var, then default
        let port = match Self::parse_cli_value(args, "--port").or_else(|| env("PORT")) {
            Some(v) => v.parse().unwrap_or_else(|_| {
                tracing::warn!("Invalid PORT value {v:?}. Using default 8000.");
                8000
            }),
            None => 8000,
        };

        let workers = match env("WORKERS") {
            Some(v) => match v.parse::<i64>() {
                Ok(n) => n.max(1) as usize,
                Err(_) => {
                    tracing::warn!("Invalid WORKERS value {v:?}. Using default 1.");
                    1
                }
            },
            None => 1,
        };

        let dev_mode = dev_mode_enabled(env("DEV_MODE").as_deref());

        let gemini_timeout = match env("GEMINI_TIMEOUT_SECS") {
            Some(v) => match v.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    tracing::warn!("Invalid GEMINI_TIMEOUT_SECS value {v:?}. Using default 30.");
                    Duration::from_secs(30)
                }
            },
            None => Duration::from_secs(30),
        };

        Ok(Config {
            host,
            port,
            workers,
            dev_mode,
            google_api_key,
            gemini_model: env("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_api_base: env("GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
            gemini_timeout,
            joke_api_url: env("JOKE_API_URL").unwrap_or_else(|| DEFAULT_JOKE_API_URL.to_string()),
            static_dir: env("STATIC_DIR").map(PathBuf::from),
        })
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
