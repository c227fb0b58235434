use log::{debug, info, warn};

use crate::error::FeedFetchError;
use crate::filter::FilterSelection;
use crate::models::Article;
use crate::providers::ProviderClient;
use crate::sequence::{RequestSequence, Ticket};

/// Fetches articles for a filter selection from the configured provider.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: ProviderClient,
}

impl FeedFetcher {
    pub fn new(client: ProviderClient) -> Self {
        FeedFetcher { client }
    }

    /// Articles in provider order; no client-side sorting.
    pub async fn fetch(&self, selection: &FilterSelection) -> Result<Vec<Article>, FeedFetchError> {
        let provider = self.client.provider();
        let url = provider.feed_url(self.client.api_key(), selection)?;
        let body = self.client.get(url).await?;
        let articles = provider.normalize_response(&body)?;
        debug!("{} returned {} articles", provider.name(), articles.len());
        Ok(articles)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum FeedOutcome {
    Applied(usize),
    Failed,
    /// A newer fetch was started before this one resolved.
    Stale,
}

/// Visible feed: the current batch and the loading flag. Only the most
/// recently started fetch may replace the batch.
#[derive(Debug, Default)]
pub struct FeedState {
    sequence: RequestSequence,
    articles: Vec<Article>,
    loading: bool,
}

impl FeedState {
    pub fn begin(&mut self) -> Ticket {
        self.loading = true;
        self.sequence.issue()
    }

    pub fn complete(&mut self, ticket: Ticket, result: Result<Vec<Article>, FeedFetchError>) -> FeedOutcome {
        if !self.sequence.is_current(ticket) {
            debug!("Discarding superseded feed result");
            return FeedOutcome::Stale;
        }

        self.loading = false;
        match result {
            Ok(articles) => {
                info!("Feed updated with {} articles", articles.len());
                let count = articles.len();
                self.articles = articles;
                FeedOutcome::Applied(count)
            }
            Err(e) => {
                warn!("{}", e);
                self.articles.clear();
                FeedOutcome::Failed
            }
        }
    }

    /// Drops the batch and retires any in-flight fetch.
    pub fn reset(&mut self) {
        self.sequence.invalidate();
        self.articles.clear();
        self.loading = false;
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn article(&self, index: usize) -> Option<&Article> {
        self.articles.get(index)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// The recoverable "no articles" state.
    pub fn is_empty_result(&self) -> bool {
        !self.loading && self.articles.is_empty()
    }
}
