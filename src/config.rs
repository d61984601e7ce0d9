//! Runtime configuration, read from `IDSYNC_*` environment variables with defaults.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Url;

pub const ENV_BACKEND_URL: &str = "IDSYNC_BACKEND_URL";
pub const ENV_PROVIDER: &str = "IDSYNC_PROVIDER";
pub const ENV_STAGE_TIMEOUT_MS: &str = "IDSYNC_STAGE_TIMEOUT_MS";
pub const ENV_CONNECT_TIMEOUT_MS: &str = "IDSYNC_CONNECT_TIMEOUT_MS";

const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_PROVIDER: &str = "oauth";
const DEFAULT_STAGE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2_000;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub backend_url: Url,
    /// Path segment for `POST /api/auth/login/:provider`.
    pub provider: String,
    /// Upper bound on each pipeline stage, network round trip included.
    pub stage_timeout: Duration,
    pub connect_timeout: Duration,
}

impl SyncConfig {
    pub fn new(backend_url: Url) -> Self {
        Self {
            backend_url,
            provider: DEFAULT_PROVIDER.to_string(),
            stage_timeout: Duration::from_millis(DEFAULT_STAGE_TIMEOUT_MS),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
        }
    }

    pub fn with_provider<S: Into<String>>(mut self, provider: S) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary key lookup; unset keys fall back to defaults, bad values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = lookup(ENV_BACKEND_URL).unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        let backend_url = Url::parse(raw_url.trim())
            .with_context(|| format!("{} is not a valid URL: '{}'", ENV_BACKEND_URL, raw_url))?;
        if !matches!(backend_url.scheme(), "http" | "https") {
            return Err(anyhow!("{} must be http or https, got '{}'", ENV_BACKEND_URL, backend_url.scheme()));
        }

        let provider = lookup(ENV_PROVIDER).unwrap_or_else(|| DEFAULT_PROVIDER.to_string());
        let provider = provider.trim().to_string();
        if provider.is_empty() {
            return Err(anyhow!("{} must not be empty", ENV_PROVIDER));
        }

        let stage_timeout = millis(&lookup, ENV_STAGE_TIMEOUT_MS, DEFAULT_STAGE_TIMEOUT_MS)?;
        let connect_timeout = millis(&lookup, ENV_CONNECT_TIMEOUT_MS, DEFAULT_CONNECT_TIMEOUT_MS)?;

        Ok(Self { backend_url, provider, stage_timeout, connect_timeout })
    }
}

fn millis<F>(lookup: &F, key: &str, default: u64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else { return Ok(Duration::from_millis(default)); };
    let ms: u64 = raw.trim().parse().with_context(|| format!("{} must be an integer, got '{}'", key, raw))?;
    if ms == 0 {
        return Err(anyhow!("{} must be greater than zero", key));
    }
    Ok(Duration::from_millis(ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = SyncConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.backend_url.as_str(), "http://127.0.0.1:3000/");
        assert_eq!(cfg.provider, "oauth");
        assert_eq!(cfg.stage_timeout, Duration::from_secs(5));
        assert_eq!(cfg.connect_timeout, Duration::from_secs(2));
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = SyncConfig::from_lookup(lookup_from(&[
            (ENV_BACKEND_URL, "https://api.example.com"),
            (ENV_PROVIDER, " clerk "),
            (ENV_STAGE_TIMEOUT_MS, "2500"),
        ]))
        .unwrap();
        assert_eq!(cfg.backend_url.host_str(), Some("api.example.com"));
        assert_eq!(cfg.provider, "clerk");
        assert_eq!(cfg.stage_timeout, Duration::from_millis(2500));
    }

    #[test]
    fn bad_values_are_errors() {
        assert!(SyncConfig::from_lookup(lookup_from(&[(ENV_BACKEND_URL, "not a url")])).is_err());
        assert!(SyncConfig::from_lookup(lookup_from(&[(ENV_BACKEND_URL, "ftp://x")])).is_err());
        assert!(SyncConfig::from_lookup(lookup_from(&[(ENV_PROVIDER, "  ")])).is_err());
        assert!(SyncConfig::from_lookup(lookup_from(&[(ENV_STAGE_TIMEOUT_MS, "0")])).is_err());
        assert!(SyncConfig::from_lookup(lookup_from(&[(ENV_CONNECT_TIMEOUT_MS, "fast")])).is_err());
    }
}
