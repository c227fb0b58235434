//! Currents API: search-shaped responses with a catalog of available
//! categories, regions and languages.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use url::Url;

use crate::error::ProviderError;
use crate::filter::FilterSelection;
use crate::models::{Article, OptionFamily};
use crate::utils::clean_html_tags;

const BASE_URL: &str = "https://api.currentsapi.services/v1/";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    news: Option<Vec<RawArticle>>,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    author: Option<String>,
    image: Option<String>,
    published: Option<String>,
    category: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct CategoriesResponse {
    #[serde(default)]
    categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RegionsResponse {
    #[serde(default)]
    regions: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct LanguagesResponse {
    #[serde(default)]
    languages: BTreeMap<String, String>,
}

pub fn feed_url(api_key: &str, selection: &FilterSelection) -> Result<Url, ProviderError> {
    let mut params: Vec<(&str, &str)> = vec![("apiKey", api_key)];
    let optional = [
        ("country", &selection.country),
        ("language", &selection.language),
        ("category", &selection.category),
        ("keywords", &selection.query),
    ];
    for (name, value) in optional {
        if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            params.push((name, value));
        }
    }
    Ok(Url::parse_with_params(&format!("{BASE_URL}search"), &params)?)
}

pub fn catalog_url(api_key: &str, family: OptionFamily) -> Result<Url, ProviderError> {
    let path = match family {
        OptionFamily::Category => "available/categories",
        OptionFamily::Country => "available/regions",
        OptionFamily::Language => "available/languages",
    };
    Ok(Url::parse_with_params(&format!("{BASE_URL}{path}"), &[("apiKey", api_key)])?)
}

pub fn parse_categories(raw: &str) -> Result<Vec<String>, ProviderError> {
    let parsed: CategoriesResponse = serde_json::from_str(raw)?;
    Ok(parsed.categories)
}

pub fn parse_table(family: OptionFamily, raw: &str) -> Result<BTreeMap<String, String>, ProviderError> {
    match family {
        OptionFamily::Country => Ok(serde_json::from_str::<RegionsResponse>(raw)?.regions),
        OptionFamily::Language => Ok(serde_json::from_str::<LanguagesResponse>(raw)?.languages),
        OptionFamily::Category => Err(ProviderError::Provider(
            "categories are a list, not a table".to_string(),
        )),
    }
}

/// A body without a `news` array is an empty result, not an error.
pub fn normalize(raw: &str) -> Result<Vec<Article>, ProviderError> {
    let parsed: SearchResponse = serde_json::from_str(raw)?;
    Ok(parsed
        .news
        .unwrap_or_default()
        .into_iter()
        .filter_map(into_article)
        .collect())
}

fn into_article(raw: RawArticle) -> Option<Article> {
    let title = raw.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())?;
    let url = Url::parse(raw.url.as_deref()?).ok()?;
    let id = raw
        .id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| url.to_string());

    Some(Article {
        id,
        title,
        description: raw.description.as_deref().map(clean_html_tags).unwrap_or_default(),
        content: None,
        url,
        // "None" is sent as a literal string when there is no image
        image: raw.image.as_deref().and_then(|i| Url::parse(i).ok()),
        published: raw.published.as_deref().and_then(parse_published),
        author: raw
            .author
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| "Unknown".to_string()),
        categories: raw.category.unwrap_or_default(),
    })
}

fn parse_published(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S %z")
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
