use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use url::Url;

/// The signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub display_name: String,
    pub avatar_url: Option<Url>,
}

impl Identity {
    pub fn guest() -> Self {
        Identity {
            uid: "guest".to_string(),
            display_name: "Guest".to_string(),
            avatar_url: None,
        }
    }
}

/// A news item normalized from either provider shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    /// Provider id when one is given, otherwise the article URL.
    pub id: String,
    pub title: String,
    pub description: String,
    pub content: Option<String>,
    pub url: Url,
    pub image: Option<Url>,
    pub published: Option<DateTime<Utc>>,
    pub author: String,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub article_id: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionFamily {
    Category,
    Country,
    Language,
}

impl std::fmt::Display for OptionFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OptionFamily::Category => "category",
            OptionFamily::Country => "country",
            OptionFamily::Language => "language",
        };
        f.write_str(name)
    }
}

/// Valid filter values accepted by the news provider, keyed by display name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionCatalog {
    pub categories: Vec<String>,
    pub countries: BTreeMap<String, String>,
    pub languages: BTreeMap<String, String>,
}

impl OptionCatalog {
    pub fn country_name(&self, code: &str) -> Option<&str> {
        reverse_lookup(&self.countries, code)
    }

    pub fn language_name(&self, code: &str) -> Option<&str> {
        reverse_lookup(&self.languages, code)
    }

    /// Accepts either a code or a display name (case-insensitive) and returns the code.
    pub fn resolve_country(&self, input: &str) -> Option<String> {
        resolve(&self.countries, input)
    }

    pub fn resolve_language(&self, input: &str) -> Option<String> {
        resolve(&self.languages, input)
    }

    pub fn resolve_category(&self, input: &str) -> Option<String> {
        self.categories
            .iter()
            .find(|c| c.eq_ignore_ascii_case(input.trim()))
            .cloned()
    }
}

fn reverse_lookup<'a>(table: &'a BTreeMap<String, String>, code: &str) -> Option<&'a str> {
    table
        .iter()
        .find(|(_, c)| c.as_str() == code)
        .map(|(name, _)| name.as_str())
}

fn resolve(table: &BTreeMap<String, String>, input: &str) -> Option<String> {
    let input = input.trim();
    table
        .iter()
        .find(|(name, code)| code.eq_ignore_ascii_case(input) || name.eq_ignore_ascii_case(input))
        .map(|(_, code)| code.clone())
}
