use anyhow::{Context, Result, anyhow};
use std::path::PathBuf;
use std::time::Duration;

use crate::ai::{DEFAULT_API_URL, DEFAULT_MODEL, ProviderConfig};

pub const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings read from the environment (and `.env` if present). Numeric
/// values are parsed when a command asks for them, so a bad `PORT` only
/// breaks the commands that talk to the proxy.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: Option<PathBuf>,
    pub tips_api_key: Option<String>,
    pub tips_api_url: String,
    pub tips_model: String,
    tips_url: Option<String>,
    port: Option<String>,
    timeout_secs: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        Config {
            db_path: get("JOBTRAIL_DB").map(PathBuf::from),
            tips_api_key: get("TIPS_API_KEY").filter(|k| !k.trim().is_empty()),
            tips_api_url: get("TIPS_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            tips_model: get("TIPS_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            tips_url: get("JOBTRAIL_TIPS_URL"),
            port: get("PORT"),
            timeout_secs: get("TIPS_TIMEOUT_SECS"),
        }
    }

    pub fn port(&self) -> Result<u16> {
        match &self.port {
            Some(p) => p.parse::<u16>().context("PORT must be a valid port number"),
            None => Ok(DEFAULT_PORT),
        }
    }

    pub fn tips_timeout(&self) -> Result<Duration> {
        let secs = match &self.timeout_secs {
            Some(s) => s
                .parse::<u64>()
                .context("TIPS_TIMEOUT_SECS must be a whole number of seconds")?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        Ok(Duration::from_secs(secs))
    }

    /// Where the terminal clients send tips requests. Falls back to the
    /// local proxy on `PORT`.
    pub fn proxy_url(&self) -> Result<String> {
        match &self.tips_url {
            Some(url) => Ok(url.clone()),
            None => Ok(format!("http://127.0.0.1:{}/api/tips", self.port()?)),
        }
    }

    /// Provider settings for the proxy. The key is only required here.
    pub fn provider(&self) -> Result<ProviderConfig> {
        let api_key = self.tips_api_key.clone().ok_or_else(|| {
            anyhow!("TIPS_API_KEY environment variable not set. Set it with: export TIPS_API_KEY=your-key-here")
        })?;
        Ok(ProviderConfig {
            api_url: self.tips_api_url.clone(),
            api_key,
            model: self.tips_model.clone(),
            timeout: self.tips_timeout()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config.port().unwrap(), DEFAULT_PORT);
        assert_eq!(config.tips_model, DEFAULT_MODEL);
        assert_eq!(config.tips_api_url, DEFAULT_API_URL);
        assert_eq!(config.tips_timeout().unwrap(), Duration::from_secs(30));
        assert_eq!(config.proxy_url().unwrap(), "http://127.0.0.1:3000/api/tips");
        assert!(config.db_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8081"),
            ("JOBTRAIL_DB", "/tmp/j.db"),
            ("TIPS_API_KEY", "k"),
            ("TIPS_TIMEOUT_SECS", "5"),
        ]));
        assert_eq!(config.port().unwrap(), 8081);
        assert_eq!(config.proxy_url().unwrap(), "http://127.0.0.1:8081/api/tips");
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/j.db")));
        assert_eq!(config.provider().unwrap().api_key, "k");
        assert_eq!(config.tips_timeout().unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn test_explicit_tips_url_ignores_port() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "http"),
            ("JOBTRAIL_TIPS_URL", "http://tips.local/api/tips"),
        ]));
        assert_eq!(config.proxy_url().unwrap(), "http://tips.local/api/tips");
    }

    #[test]
    fn test_provider_requires_key() {
        let config = Config::from_lookup(lookup(&[("TIPS_API_KEY", "   ")]));
        let err = config.provider().unwrap_err();
        assert!(err.to_string().contains("TIPS_API_KEY"));
    }

    #[test]
    fn test_invalid_numbers_only_fail_when_read() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "http"),
            ("TIPS_TIMEOUT_SECS", "soon"),
            ("JOBTRAIL_DB", "/tmp/j.db"),
        ]));
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/j.db")));
        assert!(config.port().is_err());
        assert!(config.proxy_url().is_err());
        assert!(config.tips_timeout().is_err());
    }
}
