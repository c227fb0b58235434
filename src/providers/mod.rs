pub mod currents;
pub mod newsapi;

use std::collections::BTreeMap;

use clap::ValueEnum;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::ProviderError;
use crate::filter::FilterSelection;
use crate::models::{Article, OptionCatalog, OptionFamily};

/// Which news API backs the feed. Each variant knows how to build its
/// requests and how to map its response shape onto [`Article`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
pub enum NewsProvider {
    #[serde(rename = "currents")]
    #[value(name = "currents")]
    Currents,
    #[serde(rename = "newsapi")]
    #[value(name = "newsapi")]
    NewsApi,
}

impl NewsProvider {
    pub fn name(&self) -> &'static str {
        match self {
            NewsProvider::Currents => "currents",
            NewsProvider::NewsApi => "newsapi",
        }
    }

    pub fn feed_url(&self, api_key: &str, selection: &FilterSelection) -> Result<Url, ProviderError> {
        match self {
            NewsProvider::Currents => currents::feed_url(api_key, selection),
            NewsProvider::NewsApi => newsapi::feed_url(api_key, selection),
        }
    }

    pub fn normalize_response(&self, raw: &str) -> Result<Vec<Article>, ProviderError> {
        match self {
            NewsProvider::Currents => currents::normalize(raw),
            NewsProvider::NewsApi => newsapi::normalize(raw),
        }
    }

    /// Endpoint serving one option family, or `None` when the provider has no
    /// catalog API and its options are fixed.
    pub fn catalog_url(&self, api_key: &str, family: OptionFamily) -> Result<Option<Url>, ProviderError> {
        match self {
            NewsProvider::Currents => currents::catalog_url(api_key, family).map(Some),
            NewsProvider::NewsApi => Ok(None),
        }
    }

    pub fn parse_categories(&self, raw: &str) -> Result<Vec<String>, ProviderError> {
        match self {
            NewsProvider::Currents => currents::parse_categories(raw),
            NewsProvider::NewsApi => Ok(newsapi::fixed_catalog().categories),
        }
    }

    pub fn parse_table(&self, family: OptionFamily, raw: &str) -> Result<BTreeMap<String, String>, ProviderError> {
        match self {
            NewsProvider::Currents => currents::parse_table(family, raw),
            NewsProvider::NewsApi => Ok(BTreeMap::new()),
        }
    }

    pub fn fixed_catalog(&self) -> Option<OptionCatalog> {
        match self {
            NewsProvider::Currents => None,
            NewsProvider::NewsApi => Some(newsapi::fixed_catalog()),
        }
    }
}

/// Error envelope both providers use alongside a non-"ok" status.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    status: Option<String>,
    message: Option<String>,
    msg: Option<String>,
}

/// Returns the provider's own error message if the body reports a failure.
pub(crate) fn reported_error(raw: &str) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_str(raw).ok()?;
    match envelope.status.as_deref() {
        Some("ok") | None => None,
        Some(status) => Some(
            envelope
                .message
                .or(envelope.msg)
                .unwrap_or_else(|| format!("status {status}")),
        ),
    }
}

/// HTTP access to the configured provider.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    http: Client,
    provider: NewsProvider,
    api_key: String,
}

impl ProviderClient {
    pub fn new(http: Client, provider: NewsProvider, api_key: String) -> Self {
        ProviderClient { http, provider, api_key }
    }

    pub fn provider(&self) -> NewsProvider {
        self.provider
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// GET the URL and return the body, turning HTTP and provider-reported
    /// failures into errors.
    pub async fn get(&self, url: Url) -> Result<String, ProviderError> {
        // the query string carries the API key
        debug!("GET {} {}", self.provider.name(), url.path());
        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if let Some(message) = reported_error(&body) {
            return Err(ProviderError::Provider(message));
        }
        if !status.is_success() {
            return Err(ProviderError::Provider(format!("HTTP {status}")));
        }
        Ok(body)
    }
}
