use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::feed::FeedKind;

const CONFIG_FILENAME: &str = "config.toml";
const PROXY_ENV: &str = "TESOURO_PROXY";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub feed: FeedConfig,
    pub costs: CostsConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeedConfig {
    pub proxy: Option<String>,
    pub timeout_secs: u64,
    pub rate_url: Option<String>,
    pub sale_url: Option<String>,
    pub repurchase_url: Option<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout_secs: 120,
            rate_url: None,
            sale_url: None,
            repurchase_url: None,
        }
    }
}

impl FeedConfig {
    pub fn url_for(&self, kind: FeedKind) -> &str {
        let custom = match kind {
            FeedKind::Rate => self.rate_url.as_deref(),
            FeedKind::Sale => self.sale_url.as_deref(),
            FeedKind::Repurchase => self.repurchase_url.as_deref(),
        };
        custom.unwrap_or_else(|| kind.default_url())
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CostsConfig {
    /// Charge the custody fee unless told otherwise (titles bought via the
    /// Tesouro Direto platform rather than the secondary market)
    pub custody_fee: bool,
}

pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(dir_spec::config_home)
        .ok_or_else(|| anyhow!("Could not determine config directory"))?;
    Ok(config_dir.join("tesouro"))
}

/// Load the config from `path`, or from the default location when `None`.
/// A missing default file yields defaults; a missing explicit file is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(p) => read_config(p)?,
        None => {
            let default_path = get_config_dir()?.join(CONFIG_FILENAME);
            if default_path.exists() {
                read_config(&default_path)?
            } else {
                tracing::debug!("No config at {}, using defaults", default_path.display());
                Config::default()
            }
        }
    };

    if let Some(proxy) = std::env::var_os(PROXY_ENV) {
        config.feed.proxy = Some(proxy.to_string_lossy().into_owned());
    }
    Ok(config)
}

fn read_config(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = parse_config(&content)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.feed.timeout_secs, 120);
        assert!(!config.costs.custody_fee);
    }

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"
            [feed]
            proxy = "http://proxy.local:3128"
            timeout_secs = 30
            rate_url = "http://mirror.local/taxa.csv"

            [costs]
            custody_fee = true
            "#,
        )
        .unwrap();
        assert_eq!(config.feed.proxy.as_deref(), Some("http://proxy.local:3128"));
        assert_eq!(config.feed.timeout_secs, 30);
        assert_eq!(config.feed.url_for(FeedKind::Rate), "http://mirror.local/taxa.csv");
        assert_eq!(
            config.feed.url_for(FeedKind::Sale),
            FeedKind::Sale.default_url()
        );
        assert!(config.costs.custody_fee);
    }

    #[test]
    fn test_parse_rejects_wrong_types() {
        assert!(parse_config("[feed]\ntimeout_secs = \"soon\"").is_err());
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let result = load_config(Some(&dir.path().join("nope.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[costs]\ncustody_fee = true\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert!(config.costs.custody_fee);
    }
}
