use thiserror::Error;

use crate::models::OptionFamily;

/// Failure talking to the news provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Provider error: {0}")]
    Provider(String),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Sign-in rejected: {0}")]
    Rejected(String),

    #[error("Sign-in is not configured")]
    Unavailable,

    #[error("Already signing in")]
    InProgress,
}

// Request URLs carry API keys in the query string, so they are stripped
// before the error can be displayed or logged.
impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Http(e.without_url())
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::Http(e.without_url())
    }
}

#[derive(Error, Debug)]
#[error("Failed to load {family} options: {source}")]
pub struct CatalogLoadError {
    pub family: OptionFamily,
    #[source]
    pub source: ProviderError,
}

#[derive(Error, Debug)]
#[error("Failed to fetch articles: {0}")]
pub struct FeedFetchError(#[from] pub ProviderError);

#[derive(Error, Debug)]
pub enum SummarizationError {
    #[error("Summarization API error: {0}")]
    Api(#[from] async_openai::error::OpenAIError),

    #[error("Summarization timed out after {0} seconds")]
    Timeout(u64),

    #[error("No summary text in response")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    // nothing listens on port 1, so the request fails fast without leaving the host
    async fn failed_request(url: &str) -> reqwest::Error {
        reqwest::Client::new()
            .get(url)
            .send()
            .await
            .expect_err("connection to port 1 should be refused")
    }

    #[tokio::test]
    async fn test_provider_error_hides_api_key() {
        let raw = failed_request("http://127.0.0.1:1/v1/search?apiKey=SECRET_KEY_123&category=general").await;
        assert!(raw.to_string().contains("SECRET_KEY_123"));

        let error = FeedFetchError(ProviderError::from(raw));
        let rendered = error.to_string();
        assert!(rendered.starts_with("Failed to fetch articles: HTTP error"));
        assert!(!rendered.contains("SECRET_KEY_123"));
        assert!(!format!("{error:?}").contains("SECRET_KEY_123"));
    }

    #[tokio::test]
    async fn test_auth_error_hides_api_key() {
        let raw = failed_request("http://127.0.0.1:1/v1/accounts:lookup?key=FIREBASE_KEY").await;
        let error = AuthError::from(raw);
        assert!(!error.to_string().contains("FIREBASE_KEY"));
        assert!(!format!("{error:?}").contains("FIREBASE_KEY"));
    }
}
