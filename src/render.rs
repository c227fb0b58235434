use chrono::{DateTime, Local, Utc};

use crate::models::{Article, OptionCatalog, OptionFamily};
use crate::summarizer::DetailView;
use crate::utils::truncate_chars;

const CARD_DESCRIPTION_CHARS: usize = 180;
pub const EMPTY_FEED_MESSAGE: &str = "No articles found. Try different filters or search terms.";

/// What one grid cell shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleCard {
    pub index: usize,
    pub title: String,
    pub description: String,
    pub published: String,
    pub byline: String,
    pub has_image: bool,
}

impl ArticleCard {
    pub fn from_article(index: usize, article: &Article) -> Self {
        ArticleCard {
            index,
            title: article.title.clone(),
            description: truncate_chars(&article.description, CARD_DESCRIPTION_CHARS),
            published: format_date(article.published),
            byline: article.author.clone(),
            has_image: article.image.is_some(),
        }
    }
}

pub fn format_date(published: Option<DateTime<Utc>>) -> String {
    published
        .map(|p| p.with_timezone(&Local).format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "Unknown date".to_string())
}

pub fn cards(articles: &[Article]) -> Vec<ArticleCard> {
    articles
        .iter()
        .enumerate()
        .map(|(i, a)| ArticleCard::from_article(i + 1, a))
        .collect()
}

pub fn format_grid(label: &str, articles: &[Article]) -> String {
    let mut output = format!("== {label} ==\n\n");
    if articles.is_empty() {
        output.push_str(EMPTY_FEED_MESSAGE);
        return output;
    }
    for card in cards(articles) {
        let marker = if card.has_image { " [img]" } else { "" };
        output.push_str(&format!("[{}] {}{marker}\n", card.index, card.title));
        if !card.description.is_empty() {
            output.push_str(&format!("    {}\n", card.description));
        }
        output.push_str(&format!("    {} · {}\n\n", card.published, card.byline));
    }
    output.trim_end().to_string()
}

pub fn format_detail(view: &DetailView) -> String {
    let (article, summary_block) = match view {
        DetailView::Closed => return String::new(),
        DetailView::Open { article, summary } => (
            article,
            summary
                .as_ref()
                .filter(|s| s.article_id == article.id)
                .map(|s| s.text.clone())
                .unwrap_or_else(|| "(type `summarize` to generate one)".to_string()),
        ),
        DetailView::Summarizing { article, .. } => (article, "Generating...".to_string()),
    };

    let mut meta = vec![format_date(article.published), article.author.clone()];
    if !article.categories.is_empty() {
        meta.push(article.categories.join(", "));
    }

    let mut output = format!("{}\n{}\n\n", article.title, meta.join(" · "));
    if let Some(image) = &article.image {
        output.push_str(&format!("Image: {image}\n\n"));
    }
    output.push_str(&format!("AI Summary:\n{summary_block}\n\n"));
    if !article.description.is_empty() {
        output.push_str(&format!("{}\n\n", article.description));
    }
    output.push_str(&format!("Read full article: {}", article.url));
    output
}

fn format_table(title: &str, table: &std::collections::BTreeMap<String, String>) -> String {
    if table.is_empty() {
        return format!("{title}: none available");
    }
    let entries: Vec<String> = table.iter().map(|(name, code)| format!("{name} ({code})")).collect();
    format!("{title}: {}", entries.join(", "))
}

pub fn format_options(catalog: &OptionCatalog, family: OptionFamily) -> String {
    match family {
        OptionFamily::Category if catalog.categories.is_empty() => {
            "Categories: none available".to_string()
        }
        OptionFamily::Category => format!("Categories: {}", catalog.categories.join(", ")),
        OptionFamily::Country => format_table("Countries", &catalog.countries),
        OptionFamily::Language => format_table("Languages", &catalog.languages),
    }
}
