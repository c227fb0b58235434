use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_yaml::Deserializer;

use crate::providers::NewsProvider;

const APP_NAME: &str = "newsdesk";

const CONFIG_TEMPLATE: &str = r#"# newsdesk config (YAML)
# Keys marked optional can be omitted.

# News provider: "currents" or "newsapi"
provider: "currents"

# API key for the chosen provider
currents_api_key: "<your Currents API key>"
# newsapi_api_key: "<your NewsAPI key>"

# Optional: key for the summarization API (omit to disable summaries)
summary_api_key: "<your Gemini API key>"
summary_model: "gemini-1.5-pro-latest"
summary_api_base: "https://generativelanguage.googleapis.com/v1beta/openai"

# Optional: Firebase web API key for sign-in (omit and use --no-auth)
# firebase_api_key: "<your Firebase web API key>"

# Category shown when no other filter is active
default_category: "general"
"#;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub provider: NewsProvider,
    pub currents_api_key: Option<String>,
    pub newsapi_api_key: Option<String>,
    pub summary_api_key: Option<String>,
    #[serde(default = "default_summary_model")]
    pub summary_model: String,
    #[serde(default = "default_summary_api_base")]
    pub summary_api_base: String,
    pub firebase_api_key: Option<String>,
    #[serde(default = "default_category")]
    pub default_category: String,
}

fn default_summary_model() -> String {
    "gemini-1.5-pro-latest".to_string()
}

fn default_summary_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
}

fn default_category() -> String {
    "general".to_string()
}

pub struct EnsureOutcome {
    pub path: PathBuf,
    pub created: bool,
}

impl Config {
    pub fn ensure_user_config() -> Result<EnsureOutcome> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_NAME);

        if let Some(path) = xdg_dirs.find_config_file("config.yaml") {
            return Ok(EnsureOutcome {
                path,
                created: false,
            });
        }

        let config_path = xdg_dirs
            .place_config_file("config.yaml")
            .context("Cannot create configuration directory")?;
        let mut config_file = File::create(&config_path)
            .with_context(|| format!("Failed to create {}", config_path.display()))?;
        config_file.write_all(CONFIG_TEMPLATE.as_bytes())?;

        Ok(EnsureOutcome {
            path: config_path,
            created: true,
        })
    }

    pub fn get_user_config() -> Result<Config> {
        let existing_config = xdg::BaseDirectories::with_prefix(APP_NAME)
            .find_config_file("config.yaml")
            .ok_or_else(|| anyhow!("Could not find configuration file in config::get_user_config"))?;

        let raw = fs::read_to_string(&existing_config)
            .with_context(|| format!("Failed to read {}", existing_config.display()))?;
        Config::from_yaml(&raw, &existing_config)
    }

    pub fn from_yaml(raw: &str, origin: &Path) -> Result<Config> {
        let deserialized = Deserializer::from_str(raw);
        serde_path_to_error::deserialize(deserialized).map_err(|e| {
            anyhow!(
                "Invalid YAML in {} at `{}`: {}",
                origin.display(),
                e.path(),
                e.inner()
            )
        })
    }

    /// Key for the given provider, ignoring unfilled template placeholders.
    pub fn news_api_key(&self, provider: NewsProvider) -> Option<&str> {
        let key = match provider {
            NewsProvider::Currents => &self.currents_api_key,
            NewsProvider::NewsApi => &self.newsapi_api_key,
        };
        filled(key)
    }

    pub fn summary_api_key(&self) -> Option<&str> {
        filled(&self.summary_api_key)
    }

    pub fn firebase_api_key(&self) -> Option<&str> {
        filled(&self.firebase_api_key)
    }
}

fn filled(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.starts_with('<'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses() {
        let cfg = Config::from_yaml(CONFIG_TEMPLATE, Path::new("template")).unwrap();
        assert_eq!(cfg.provider, NewsProvider::Currents);
        assert_eq!(cfg.default_category, "general");
        // placeholders count as missing
        assert_eq!(cfg.news_api_key(NewsProvider::Currents), None);
        assert_eq!(cfg.summary_api_key(), None);
        assert_eq!(cfg.firebase_api_key(), None);
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let cfg = Config::from_yaml(
            "provider: newsapi\nnewsapi_api_key: abc123\n",
            Path::new("inline"),
        )
        .unwrap();
        assert_eq!(cfg.news_api_key(NewsProvider::NewsApi), Some("abc123"));
        assert_eq!(cfg.news_api_key(NewsProvider::Currents), None);
        assert_eq!(cfg.summary_model, "gemini-1.5-pro-latest");
    }

    #[test]
    fn test_error_names_the_bad_key() {
        let err = Config::from_yaml("provider: bing\n", Path::new("cfg.yaml")).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("cfg.yaml"));
        assert!(message.contains("provider"));
    }
}
