use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_ASSET_URL: &str = "http://localhost:5000";
pub const DEFAULT_SESSION_FILE: &str = ".krishi-session.json";

/// Backend addresses and client settings
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base of the REST API, e.g. `http://localhost:5000/api`
    pub api_url: String,
    /// Base that server-relative image paths are resolved against
    pub asset_base_url: String,
    /// Where the login response is persisted
    pub session_file: PathBuf,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            asset_base_url: DEFAULT_ASSET_URL.to_string(),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Load from `KRISHI_*` environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout = match non_empty("KRISHI_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(
                raw.trim()
                    .parse()
                    .with_context(|| format!("Invalid KRISHI_TIMEOUT_SECS: {raw}"))?,
            ),
            None => defaults.timeout,
        };

        Ok(Self {
            api_url: non_empty("KRISHI_API_URL").unwrap_or(defaults.api_url),
            asset_base_url: non_empty("KRISHI_ASSET_URL").unwrap_or(defaults.asset_base_url),
            session_file: non_empty("KRISHI_SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.session_file),
            timeout,
        })
    }

    /// Displayable address for an image path returned by the backend
    pub fn asset_url(&self, path: &str) -> String {
        resolve_asset_url(&self.asset_base_url, path)
    }
}

pub fn resolve_asset_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") || path.starts_with("data:") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
