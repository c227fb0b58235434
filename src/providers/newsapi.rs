//! NewsAPI: headline-shaped responses. Category and country browsing goes to
//! `top-headlines`, keyword search to `everything`.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use url::Url;

use crate::error::ProviderError;
use crate::filter::FilterSelection;
use crate::models::{Article, OptionCatalog};
use crate::utils::{clean_html_tags, strip_truncation_marker};

const BASE_URL: &str = "https://newsapi.org/v2/";
const DEFAULT_COUNTRY: &str = "us";
const CATEGORIES: [&str; 6] = [
    "general",
    "technology",
    "business",
    "sports",
    "entertainment",
    "health",
];
// placeholder entries left behind for deleted articles
const REMOVED: &str = "[Removed]";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeadlinesResponse {
    articles: Option<Vec<RawArticle>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    source: Option<RawSource>,
    author: Option<String>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    url_to_image: Option<String>,
    published_at: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    name: Option<String>,
}

/// NewsAPI exposes no catalog endpoints.
pub fn fixed_catalog() -> OptionCatalog {
    OptionCatalog {
        categories: CATEGORIES.iter().map(|c| c.to_string()).collect(),
        ..Default::default()
    }
}

pub fn feed_url(api_key: &str, selection: &FilterSelection) -> Result<Url, ProviderError> {
    let non_empty = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    if let Some(query) = non_empty(&selection.query) {
        let params = [
            ("q", query.as_str()),
            ("sortBy", "publishedAt"),
            ("apiKey", api_key),
        ];
        return Ok(Url::parse_with_params(&format!("{BASE_URL}everything"), &params)?);
    }

    if non_empty(&selection.language).is_some() {
        return Err(ProviderError::Provider(
            "NewsAPI headlines cannot be filtered by language".to_string(),
        ));
    }

    let country = non_empty(&selection.country).unwrap_or_else(|| DEFAULT_COUNTRY.to_string());
    let mut params = vec![("country", country.to_lowercase())];
    if let Some(category) = non_empty(&selection.category) {
        params.push(("category", category));
    }
    params.push(("apiKey", api_key.to_string()));
    Ok(Url::parse_with_params(&format!("{BASE_URL}top-headlines"), &params)?)
}

pub fn normalize(raw: &str) -> Result<Vec<Article>, ProviderError> {
    let parsed: HeadlinesResponse = serde_json::from_str(raw)?;
    Ok(parsed
        .articles
        .unwrap_or_default()
        .into_iter()
        .filter_map(into_article)
        .collect())
}

fn into_article(raw: RawArticle) -> Option<Article> {
    let title = raw
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty() && t != REMOVED)?;
    let url = Url::parse(raw.url.as_deref()?).ok()?;

    let source_name = raw.source.and_then(|s| s.name).filter(|n| !n.trim().is_empty());
    let author = raw
        .author
        .filter(|a| !a.trim().is_empty())
        .or(source_name)
        .unwrap_or_else(|| "Unknown".to_string());

    Some(Article {
        id: url.to_string(),
        title,
        description: raw.description.as_deref().map(clean_html_tags).unwrap_or_default(),
        content: raw
            .content
            .as_deref()
            .map(|c| strip_truncation_marker(&clean_html_tags(c)))
            .filter(|c| !c.is_empty()),
        url,
        image: raw.url_to_image.as_deref().and_then(|i| Url::parse(i).ok()),
        published: raw
            .published_at
            .as_deref()
            .and_then(|p| DateTime::parse_from_rfc3339(p).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        author,
        categories: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const HEADLINES_FIXTURE: &str = r#"{
        "status": "ok",
        "totalResults": 3,
        "articles": [
            {
                "source": { "id": "the-verge", "name": "The Verge" },
                "author": null,
                "title": "A new phone appears",
                "description": "It folds.",
                "url": "https://www.theverge.com/phone",
                "urlToImage": "https://cdn.theverge.com/phone.jpg",
                "publishedAt": "2025-03-01T09:30:00Z",
                "content": "The phone folds twice and… [+2381 chars]"
            },
            {
                "source": { "id": null, "name": "[Removed]" },
                "author": null,
                "title": "[Removed]",
                "description": "[Removed]",
                "url": "https://removed.com",
                "urlToImage": null,
                "publishedAt": "1970-01-01T00:00:00Z",
                "content": "[Removed]"
            },
            {
                "source": { "id": null, "name": "" },
                "author": "Jane Doe",
                "title": "Rain expected",
                "description": null,
                "url": "https://weather.example.com/rain",
                "urlToImage": null,
                "publishedAt": "2025-03-01T10:00:00Z",
                "content": null
            }
        ]
    }"#;

    fn params(url: &Url) -> Vec<(String, String)> {
        url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect()
    }

    #[test]
    fn test_normalize_headline_shape() {
        let articles = normalize(HEADLINES_FIXTURE).unwrap();
        assert_eq!(articles.len(), 2);

        let phone = &articles[0];
        assert_eq!(phone.id, "https://www.theverge.com/phone");
        assert_eq!(phone.author, "The Verge");
        assert_eq!(phone.content.as_deref(), Some("The phone folds twice and"));
        assert_eq!(phone.image.as_ref().map(Url::as_str), Some("https://cdn.theverge.com/phone.jpg"));
        assert_eq!(
            phone.published,
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap())
        );

        let rain = &articles[1];
        assert_eq!(rain.author, "Jane Doe");
        assert_eq!(rain.description, "");
        assert!(rain.content.is_none());
    }

    #[test]
    fn test_category_goes_to_top_headlines_with_default_country() {
        let selection = FilterSelection {
            category: Some("sports".to_string()),
            ..Default::default()
        };
        let url = feed_url("k", &selection).unwrap();
        assert_eq!(url.path(), "/v2/top-headlines");
        assert_eq!(
            params(&url),
            vec![
                ("country".to_string(), "us".to_string()),
                ("category".to_string(), "sports".to_string()),
                ("apiKey".to_string(), "k".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_goes_to_everything() {
        let selection = FilterSelection {
            query: Some("fusion".to_string()),
            ..Default::default()
        };
        let url = feed_url("k", &selection).unwrap();
        assert_eq!(url.path(), "/v2/everything");
        let params = params(&url);
        assert!(params.contains(&("q".to_string(), "fusion".to_string())));
        assert!(params.contains(&("sortBy".to_string(), "publishedAt".to_string())));
        assert!(!params.iter().any(|(k, _)| k == "category" || k == "country"));
    }

    #[test]
    fn test_language_filter_is_rejected() {
        let selection = FilterSelection {
            language: Some("de".to_string()),
            ..Default::default()
        };
        assert!(feed_url("k", &selection).is_err());
    }
}
