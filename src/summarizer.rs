use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs},
};
use log::{debug, warn};
use tokio::time::Duration;

use crate::error::SummarizationError;
use crate::models::{Article, Summary};
use crate::sequence::{RequestSequence, Ticket};

pub const FAILURE_MESSAGE: &str = "Failed to generate summary. Please try again.";
const TIMEOUT_SECS: u64 = 60;

/// Something that turns a prompt into generated prose.
pub trait SummaryBackend {
    async fn generate(&self, prompt: String) -> Result<String, SummarizationError>;
}

/// Chat-completions backend for any OpenAI-compatible generative API.
pub struct ChatBackend {
    client: Client<OpenAIConfig>,
    model: String,
}

impl ChatBackend {
    pub fn new(api_key: &str, api_base: &str, model: &str) -> Self {
        let config = OpenAIConfig::default()
            .with_api_key(api_key)
            .with_api_base(api_base);
        ChatBackend {
            client: Client::with_config(config),
            model: model.to_string(),
        }
    }
}

impl SummaryBackend for ChatBackend {
    async fn generate(&self, prompt: String) -> Result<String, SummarizationError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([ChatCompletionRequestUserMessage::from(prompt).into()])
            .max_tokens(400u32)
            .build()?;

        debug!("Requesting summary from {}", self.model);
        let start_time = std::time::Instant::now();
        let response = tokio::time::timeout(
            Duration::from_secs(TIMEOUT_SECS),
            self.client.chat().create(request),
        )
        .await
        .map_err(|_| SummarizationError::Timeout(TIMEOUT_SECS))??;
        debug!("Summary call completed in {:?}", start_time.elapsed());

        response
            .choices
            .into_iter()
            .filter_map(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .find(|text| !text.is_empty())
            .ok_or(SummarizationError::Empty)
    }
}

pub fn build_prompt(article: &Article) -> String {
    let mut prompt = String::from(
        "Please provide a concise summary of the following news article in 3-4 sentences:\n",
    );
    prompt.push_str(&format!("Title: {}\n", article.title));
    if let Some(content) = article.content.as_deref().filter(|c| !c.is_empty()) {
        prompt.push_str(&format!("Content: {content}\n"));
    }
    if !article.description.is_empty() {
        prompt.push_str(&format!("Description: {}\n", article.description));
    }
    prompt
}

pub struct Summarizer<B> {
    backend: B,
}

impl<B: SummaryBackend> Summarizer<B> {
    pub fn new(backend: B) -> Self {
        Summarizer { backend }
    }

    /// Never fails: errors are logged and replaced by [`FAILURE_MESSAGE`].
    pub async fn summarize(&self, article: &Article) -> String {
        match self.backend.generate(build_prompt(article)).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Summary for {} failed: {}", article.id, e);
                FAILURE_MESSAGE.to_string()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailView {
    Closed,
    Open {
        article: Article,
        summary: Option<Summary>,
    },
    Summarizing {
        article: Article,
        ticket: Ticket,
    },
}

/// Detail view for the selected article and its on-demand summary.
#[derive(Debug)]
pub struct DetailState {
    view: DetailView,
    sequence: RequestSequence,
}

impl Default for DetailState {
    fn default() -> Self {
        DetailState {
            view: DetailView::Closed,
            sequence: RequestSequence::default(),
        }
    }
}

impl DetailState {
    pub fn view(&self) -> &DetailView {
        &self.view
    }

    pub fn article(&self) -> Option<&Article> {
        match &self.view {
            DetailView::Closed => None,
            DetailView::Open { article, .. } | DetailView::Summarizing { article, .. } => Some(article),
        }
    }

    pub fn is_summarizing(&self) -> bool {
        matches!(self.view, DetailView::Summarizing { .. })
    }

    /// Opens `article` with no summary; any pending summary becomes stale.
    pub fn select(&mut self, article: Article) {
        self.sequence.invalidate();
        self.view = DetailView::Open {
            article,
            summary: None,
        };
    }

    pub fn close(&mut self) {
        self.sequence.invalidate();
        self.view = DetailView::Closed;
    }

    /// Starts a summary for the open article. Returns `None` while one is
    /// already pending or when nothing is open.
    pub fn begin_summary(&mut self) -> Option<(Ticket, Article)> {
        let article = match &self.view {
            DetailView::Open { article, .. } => article.clone(),
            DetailView::Summarizing { .. } => {
                debug!("Summary already in flight");
                return None;
            }
            DetailView::Closed => return None,
        };
        let ticket = self.sequence.issue();
        self.view = DetailView::Summarizing {
            article: article.clone(),
            ticket,
        };
        Some((ticket, article))
    }

    /// Applies the text only if `ticket` still belongs to the selected article.
    pub fn complete(&mut self, ticket: Ticket, text: String) -> bool {
        let article = match &self.view {
            DetailView::Summarizing { article, ticket: pending }
                if *pending == ticket && self.sequence.is_current(ticket) =>
            {
                article.clone()
            }
            _ => {
                debug!("Discarding summary for a deselected article");
                return false;
            }
        };
        self.view = DetailView::Open {
            summary: Some(Summary {
                article_id: article.id.clone(),
                text,
            }),
            article,
        };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::tests::article;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingBackend {
        calls: Rc<Cell<usize>>,
        reply: Option<String>,
    }

    impl SummaryBackend for CountingBackend {
        async fn generate(&self, prompt: String) -> Result<String, SummarizationError> {
            self.calls.set(self.calls.get() + 1);
            assert!(prompt.starts_with("Please provide a concise summary"));
            tokio::task::yield_now().await;
            self.reply.clone().ok_or(SummarizationError::Empty)
        }
    }

    #[test]
    fn test_prompt_omits_empty_fields() {
        let mut a = article("x");
        a.content = Some("Full body".to_string());
        let prompt = build_prompt(&a);
        assert!(prompt.contains("Title: Title x\n"));
        assert!(prompt.contains("Content: Full body\n"));
        assert!(prompt.contains("Description: Description x\n"));

        a.content = None;
        a.description = String::new();
        let prompt = build_prompt(&a);
        assert!(!prompt.contains("Content:"));
        assert!(!prompt.contains("Description:"));
    }

    #[tokio::test]
    async fn test_double_invoke_sends_one_request() {
        let calls = Rc::new(Cell::new(0));
        let summarizer = Summarizer::new(CountingBackend {
            calls: Rc::clone(&calls),
            reply: Some("Short summary.".to_string()),
        });
        let mut detail = DetailState::default();
        detail.select(article("x"));

        let first = detail.begin_summary();
        let second = detail.begin_summary();
        assert!(second.is_none());

        let (ticket, target) = first.unwrap();
        let text = summarizer.summarize(&target).await;
        assert!(detail.complete(ticket, text));
        assert_eq!(calls.get(), 1);

        match detail.view() {
            DetailView::Open { summary: Some(summary), .. } => {
                assert_eq!(summary.article_id, "x");
                assert_eq!(summary.text, "Short summary.");
            }
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failure_yields_fixed_message() {
        let summarizer = Summarizer::new(CountingBackend {
            calls: Rc::new(Cell::new(0)),
            reply: None,
        });
        assert_eq!(summarizer.summarize(&article("x")).await, FAILURE_MESSAGE);
    }

    #[test]
    fn test_summary_for_previous_article_is_not_shown() {
        let mut detail = DetailState::default();
        detail.select(article("x"));
        let (x_ticket, _) = detail.begin_summary().unwrap();

        detail.select(article("y"));
        assert!(!detail.complete(x_ticket, "about x".to_string()));
        assert_eq!(
            detail.view(),
            &DetailView::Open {
                article: article("y"),
                summary: None
            }
        );

        let (y_ticket, _) = detail.begin_summary().unwrap();
        assert!(!detail.complete(x_ticket, "about x".to_string()));
        assert!(detail.complete(y_ticket, "about y".to_string()));
    }

    #[test]
    fn test_reselecting_same_article_discards_pending() {
        let mut detail = DetailState::default();
        detail.select(article("x"));
        let (ticket, _) = detail.begin_summary().unwrap();
        detail.select(article("x"));
        assert!(!detail.complete(ticket, "late".to_string()));
    }

    #[test]
    fn test_closed_view_cannot_summarize() {
        let mut detail = DetailState::default();
        assert!(detail.begin_summary().is_none());

        detail.select(article("x"));
        let (ticket, _) = detail.begin_summary().unwrap();
        detail.close();
        assert!(!detail.complete(ticket, "late".to_string()));
        assert_eq!(detail.view(), &DetailView::Closed);
    }
}
