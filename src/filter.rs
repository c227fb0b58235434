use crate::models::OptionCatalog;

/// Snapshot of the current filter, as handed to the feed fetcher.
/// At most one field is ever set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub category: Option<String>,
    pub country: Option<String>,
    pub language: Option<String>,
    pub query: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ActiveFilter {
    Category(String),
    Country(String),
    Language(String),
    Query(String),
}

/// Holds the filter driving the feed. Each selection family replaces the
/// others, so the mutual exclusivity holds by construction.
#[derive(Debug, Clone)]
pub struct FilterState {
    active: ActiveFilter,
    // last non-query filter, restored by `clear_query`
    restore: ActiveFilter,
    default_category: String,
}

impl FilterState {
    pub fn new(default_category: &str) -> Self {
        let initial = ActiveFilter::Category(default_category.to_string());
        FilterState {
            active: initial.clone(),
            restore: initial,
            default_category: default_category.to_string(),
        }
    }

    pub fn select_category(&mut self, category: &str) -> bool {
        let category = category.trim();
        let filter = if category.is_empty() {
            ActiveFilter::Category(self.default_category.clone())
        } else {
            ActiveFilter::Category(category.to_string())
        };
        self.apply(filter);
        true
    }

    /// An empty code means "all countries" and falls back to the default category.
    pub fn select_country(&mut self, code: &str) -> bool {
        let code = code.trim();
        let filter = if code.is_empty() {
            ActiveFilter::Category(self.default_category.clone())
        } else {
            ActiveFilter::Country(code.to_string())
        };
        self.apply(filter);
        true
    }

    pub fn select_language(&mut self, code: &str) -> bool {
        let code = code.trim();
        let filter = if code.is_empty() {
            ActiveFilter::Category(self.default_category.clone())
        } else {
            ActiveFilter::Language(code.to_string())
        };
        self.apply(filter);
        true
    }

    /// Returns false, leaving the state untouched, for blank input.
    pub fn submit_query(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        self.active = ActiveFilter::Query(text.to_string());
        true
    }

    /// Leaves search mode and restores the previous non-query filter.
    /// Returns false when no search was active.
    pub fn clear_query(&mut self) -> bool {
        if !self.is_searching() {
            return false;
        }
        self.active = self.restore.clone();
        true
    }

    pub fn is_searching(&self) -> bool {
        matches!(self.active, ActiveFilter::Query(_))
    }

    pub fn selection(&self) -> FilterSelection {
        let mut selection = FilterSelection::default();
        match &self.active {
            ActiveFilter::Category(c) => selection.category = Some(c.clone()),
            ActiveFilter::Country(c) => selection.country = Some(c.clone()),
            ActiveFilter::Language(l) => selection.language = Some(l.clone()),
            ActiveFilter::Query(q) => selection.query = Some(q.clone()),
        }
        selection
    }

    /// Heading describing the active filter, with codes mapped back to display names.
    pub fn label(&self, catalog: &OptionCatalog) -> String {
        match &self.active {
            ActiveFilter::Query(q) => format!("Search Results for \"{q}\""),
            ActiveFilter::Category(c) if c.is_empty() => "Latest News".to_string(),
            ActiveFilter::Category(c) => format!("{} News", capitalize(c)),
            ActiveFilter::Country(code) => {
                format!("News from {}", catalog.country_name(code).unwrap_or(code))
            }
            ActiveFilter::Language(code) => {
                format!("News in {}", catalog.language_name(code).unwrap_or(code))
            }
        }
    }

    fn apply(&mut self, filter: ActiveFilter) {
        self.restore = filter.clone();
        self.active = filter;
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
