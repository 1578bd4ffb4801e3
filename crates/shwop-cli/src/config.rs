//! CLI configuration: defaults, then an optional JSON file, then `SHWOP_*`
//! environment overrides, then command-line flags.

use anyhow::{Context, Result};
use serde::Deserialize;
use shwop_htlc::HtlcConfig;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default store directory, relative to the working directory.
pub const DEFAULT_STORE_DIR: &str = "shwop-data";

/// Resolved CLI configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Contract store directory.
    pub store_dir: PathBuf,

    /// Engine settings.
    pub htlc: HtlcConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            htlc: HtlcConfig::default(),
        }
    }
}

impl CliConfig {
    /// Load from `path` (if given) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config
            .htlc
            .validate()
            .context("invalid configuration")?;
        Ok(config)
    }

    /// Parse a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        info!("[htlc] Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply `SHWOP_*` overrides; unparsable values are ignored with a warning.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("SHWOP_STORE_DIR") {
            self.store_dir = PathBuf::from(dir);
        }
        if let Some(ms) = parse_env(&lookup, "SHWOP_POLL_INTERVAL_MS") {
            self.htlc.watcher.poll_interval_ms = ms;
        }
        if let Some(ms) = parse_env(&lookup, "SHWOP_LEDGER_TIMEOUT_MS") {
            self.htlc.watcher.ledger_timeout_ms = ms;
        }
        if let Some(len) = parse_env(&lookup, "SHWOP_SECRET_LEN") {
            self.htlc.default_secret_len = len;
        }
    }
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("{} has an invalid value: {:?}", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CliConfig::default();
        assert_eq!(config.store_dir, PathBuf::from(DEFAULT_STORE_DIR));
        assert_eq!(config.htlc, HtlcConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = CliConfig::default();
        config.apply_env(env(&[
            ("SHWOP_STORE_DIR", "/var/lib/shwop"),
            ("SHWOP_POLL_INTERVAL_MS", "250"),
            ("SHWOP_LEDGER_TIMEOUT_MS", "1500"),
            ("SHWOP_SECRET_LEN", "48"),
        ]));
        assert_eq!(config.store_dir, PathBuf::from("/var/lib/shwop"));
        assert_eq!(config.htlc.watcher.poll_interval_ms, 250);
        assert_eq!(config.htlc.watcher.ledger_timeout_ms, 1_500);
        assert_eq!(config.htlc.default_secret_len, 48);
    }

    #[test]
    fn test_invalid_env_value_ignored() {
        let mut config = CliConfig::default();
        config.apply_env(env(&[("SHWOP_POLL_INTERVAL_MS", "soon")]));
        assert_eq!(config.htlc.watcher.poll_interval_ms, 5_000);
    }

    #[test]
    fn test_from_file_partial() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shwop.json");
        std::fs::write(
            &path,
            r#"{"store_dir": "data", "htlc": {"default_secret_len": 16}}"#,
        )
        .unwrap();
        let config = CliConfig::from_file(&path).unwrap();
        assert_eq!(config.store_dir, PathBuf::from("data"));
        assert_eq!(config.htlc.default_secret_len, 16);
        assert_eq!(config.htlc.watcher.max_retries, 5);
    }

    #[test]
    fn test_from_file_rejects_bad_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shwop.json");
        std::fs::write(&path, "{").unwrap();
        assert!(CliConfig::from_file(&path).is_err());
    }
}
