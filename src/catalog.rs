use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::error::{CatalogLoadError, ProviderError};
use crate::models::{OptionCatalog, OptionFamily};
use crate::providers::ProviderClient;

/// Result of one catalog load: whatever populated, plus the families that failed.
#[derive(Debug, Default)]
pub struct CatalogLoad {
    pub catalog: OptionCatalog,
    pub failures: Vec<CatalogLoadError>,
}

/// Loads the three option families concurrently, one call each. A failed
/// family stays empty while the others still populate; nothing is retried.
pub async fn load(client: &ProviderClient) -> CatalogLoad {
    if let Some(catalog) = client.provider().fixed_catalog() {
        debug!("Provider {} has a fixed catalog", client.provider().name());
        return CatalogLoad {
            catalog,
            failures: Vec::new(),
        };
    }

    debug!("Loading option catalog from {}", client.provider().name());
    let (categories, countries, languages) = tokio::join!(
        load_categories(client),
        load_table(client, OptionFamily::Country),
        load_table(client, OptionFamily::Language)
    );

    let load = assemble(categories, countries, languages);
    info!(
        "Option catalog loaded: {} categories, {} countries, {} languages ({} failed)",
        load.catalog.categories.len(),
        load.catalog.countries.len(),
        load.catalog.languages.len(),
        load.failures.len()
    );
    load
}

async fn load_categories(client: &ProviderClient) -> Result<Vec<String>, ProviderError> {
    let provider = client.provider();
    match provider.catalog_url(client.api_key(), OptionFamily::Category)? {
        Some(url) => provider.parse_categories(&client.get(url).await?),
        None => Ok(Vec::new()),
    }
}

async fn load_table(
    client: &ProviderClient,
    family: OptionFamily,
) -> Result<BTreeMap<String, String>, ProviderError> {
    let provider = client.provider();
    match provider.catalog_url(client.api_key(), family)? {
        Some(url) => provider.parse_table(family, &client.get(url).await?),
        None => Ok(BTreeMap::new()),
    }
}

/// Combine per-family results; each family applies independently.
pub fn assemble(
    categories: Result<Vec<String>, ProviderError>,
    countries: Result<BTreeMap<String, String>, ProviderError>,
    languages: Result<BTreeMap<String, String>, ProviderError>,
) -> CatalogLoad {
    let mut load = CatalogLoad::default();

    match categories {
        Ok(categories) => load.catalog.categories = categories,
        Err(source) => load.failures.push(failed(OptionFamily::Category, source)),
    }
    match countries {
        Ok(countries) => load.catalog.countries = countries,
        Err(source) => load.failures.push(failed(OptionFamily::Country, source)),
    }
    match languages {
        Ok(languages) => load.catalog.languages = languages,
        Err(source) => load.failures.push(failed(OptionFamily::Language, source)),
    }

    load
}

fn failed(family: OptionFamily, source: ProviderError) -> CatalogLoadError {
    let error = CatalogLoadError { family, source };
    warn!("{}", error);
    error
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_failure_keeps_other_families() {
        let load = assemble(
            Ok(vec!["general".to_string(), "technology".to_string()]),
            Err(ProviderError::Provider("boom".to_string())),
            Ok(BTreeMap::from([("English".to_string(), "en".to_string())])),
        );

        assert_eq!(load.catalog.categories, vec!["general", "technology"]);
        assert!(load.catalog.countries.is_empty());
        assert_eq!(load.catalog.languages.len(), 1);
        assert_eq!(load.failures.len(), 1);
        assert_eq!(load.failures[0].family, OptionFamily::Country);
    }

    #[test]
    fn test_all_families_populate() {
        let load = assemble(
            Ok(vec!["general".to_string()]),
            Ok(BTreeMap::from([("United States".to_string(), "US".to_string())])),
            Ok(BTreeMap::new()),
        );
        assert!(load.failures.is_empty());
        assert_eq!(load.catalog.country_name("US"), Some("United States"));
    }

    #[tokio::test]
    async fn test_fixed_catalog_needs_no_network() {
        let client = ProviderClient::new(
            reqwest::Client::new(),
            crate::providers::NewsProvider::NewsApi,
            "unused".to_string(),
        );
        let load = load(&client).await;
        assert!(load.failures.is_empty());
        assert_eq!(load.catalog.categories.len(), 6);
    }
}
