use std::path::{Path, PathBuf};
use std::time::Duration;

use catpp_core::compile::DEFAULT_TIMEOUT;

use crate::error::AppError;

/// Site configuration, loaded explicitly from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `topics.json`.
    pub public_dir: PathBuf,
    /// Directory holding generated chapter documents (`{category}/{slug}.json`).
    pub content_dir: PathBuf,
    /// Full URL of the remote compile endpoint.
    pub compile_url: String,
    pub compile_timeout: Duration,
    pub bind_addr: String,
}

impl Config {
    /// Required:
    /// - `CATPP_PUBLIC_DIR`: directory containing `topics.json`
    /// - `CATPP_CONTENT_DIR`: directory of generated chapter pages
    /// - `CATPP_COMPILE_URL`: compile endpoint, e.g. "http://runner:8080/api/compile"
    ///
    /// Optional:
    /// - `CATPP_COMPILE_TIMEOUT_MS` (default: 10000)
    /// - `CATPP_BIND_ADDR` (default: "127.0.0.1:3000")
    pub fn from_env() -> Result<Self, AppError> {
        let public_dir = required("CATPP_PUBLIC_DIR")?;
        let content_dir = required("CATPP_CONTENT_DIR")?;
        let compile_url = required("CATPP_COMPILE_URL")?;

        for dir in [&public_dir, &content_dir] {
            if !Path::new(dir).is_dir() {
                return Err(AppError::Config(format!("directory not found: {dir}")));
            }
        }

        let compile_timeout = match std::env::var("CATPP_COMPILE_TIMEOUT_MS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| AppError::Config(format!("invalid CATPP_COMPILE_TIMEOUT_MS: {raw}")))?,
            Err(_) => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            public_dir: PathBuf::from(public_dir),
            content_dir: PathBuf::from(content_dir),
            compile_url,
            compile_timeout,
            bind_addr: std::env::var("CATPP_BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:3000".to_string()),
        })
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.public_dir.join("topics.json")
    }
}

fn required(name: &str) -> Result<String, AppError> {
    std::env::var(name)
        .map_err(|_| AppError::Config(format!("{name} environment variable is required")))
}
