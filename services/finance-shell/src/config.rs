//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! `FINANCE_API_URL` overrides `[api] base_url`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

/// Remote API settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Where the persistent credential store lives
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

/// Presentation settings
#[derive(Debug, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_title_suffix")]
    pub title_suffix: String,
    /// Origin the app is served from; links to other origins are not
    /// handled in-app.
    #[serde(default = "default_origin")]
    pub origin: String,
    /// Directory holding the HTML templates. Built-in fragments are used
    /// when unset.
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            title_suffix: default_title_suffix(),
            origin: default_origin(),
            templates_dir: None,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("finance-shell-state.json")
}

fn default_title_suffix() -> String {
    finance_router::DEFAULT_TITLE_SUFFIX.to_owned()
}

fn default_origin() -> String {
    "http://localhost:8080".to_owned()
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents, std::env::var("FINANCE_API_URL").ok())
    }

    fn from_toml(contents: &str, api_url_override: Option<String>) -> common::Result<Self> {
        let mut config: Config = toml::from_str(contents)?;

        if let Some(url) = api_url_override.filter(|u| !u.is_empty()) {
            config.api.base_url = url;
        }

        if !config.api.base_url.starts_with("http://")
            && !config.api.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                config.api.base_url
            )));
        }

        if config.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        config.origin()?;
        Ok(config)
    }

    /// The parsed `[ui] origin`.
    pub fn origin(&self) -> common::Result<Url> {
        Url::parse(&self.ui.origin).map_err(|e| {
            common::Error::Config(format!("invalid origin {}: {e}", self.ui.origin))
        })
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("finance-shell.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
[api]
base_url = "http://localhost:3000/api"
"#
    }

    #[test]
    fn defaults_fill_optional_sections() {
        let config = Config::from_toml(minimal_toml(), None).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:3000/api");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.storage.path, PathBuf::from("finance-shell-state.json"));
        assert_eq!(config.ui.title_suffix, "Lumincoin Finance");
        assert!(config.ui.templates_dir.is_none());
        assert_eq!(config.origin().unwrap().as_str(), "http://localhost:8080/");
    }

    #[test]
    fn full_config_round_trips() {
        let toml = r#"
[api]
base_url = "https://finance.example.com/api"
timeout_secs = 5

[storage]
path = "/var/lib/finance/state.json"

[ui]
title_suffix = "Budget"
origin = "https://finance.example.com"
templates_dir = "/srv/templates"
"#;
        let config = Config::from_toml(toml, None).unwrap();
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.storage.path, PathBuf::from("/var/lib/finance/state.json"));
        assert_eq!(config.ui.title_suffix, "Budget");
        assert_eq!(config.ui.templates_dir, Some(PathBuf::from("/srv/templates")));
    }

    #[test]
    fn env_override_replaces_base_url() {
        let config =
            Config::from_toml(minimal_toml(), Some("https://staging.example.com/api".into()))
                .unwrap();
        assert_eq!(config.api.base_url, "https://staging.example.com/api");

        let untouched = Config::from_toml(minimal_toml(), Some(String::new())).unwrap();
        assert_eq!(untouched.api.base_url, "http://localhost:3000/api");
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = Config::from_toml("[api]\nbase_url = \"ftp://example.com\"\n", None).unwrap_err();
        assert!(err.to_string().contains("base_url must start with http"));
    }

    #[test]
    fn rejects_zero_timeout() {
        let toml = "[api]\nbase_url = \"http://x\"\ntimeout_secs = 0\n";
        let err = Config::from_toml(toml, None).unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn rejects_bad_origin() {
        let toml = "[api]\nbase_url = \"http://x\"\n[ui]\norigin = \"not a url\"\n";
        let err = Config::from_toml(toml, None).unwrap_err();
        assert!(err.to_string().contains("invalid origin"));
    }

    #[test]
    fn missing_api_section_is_an_error() {
        assert!(Config::from_toml("[ui]\ntitle_suffix = \"x\"\n", None).is_err());
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("finance-shell.toml");
        std::fs::write(&path, minimal_toml()).unwrap();
        // FINANCE_API_URL may be set in the environment; only check parsing.
        assert!(Config::load(&path).is_ok());
        assert!(Config::load(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn resolve_path_prefers_cli() {
        assert_eq!(
            Config::resolve_path(Some("/etc/finance.toml")),
            PathBuf::from("/etc/finance.toml")
        );
    }
}
