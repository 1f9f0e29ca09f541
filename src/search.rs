//! Recipe search against the Edamam recipes API.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::SearchConfig;

/// A single recipe returned by the upstream API.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Recipe {
    pub label: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, rename = "ingredientLines")]
    pub ingredient_lines: Vec<String>,
    #[serde(default)]
    pub calories: Option<f64>,
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid search endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("Recipe search request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Recipe search failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to decode recipe search response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A source of recipes for a free-text query.
#[async_trait]
pub trait RecipeSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<Recipe>, SearchError>;
}

#[derive(Deserialize, Debug)]
struct Hit {
    recipe: Recipe,
}

#[derive(Deserialize, Debug)]
struct EdamamResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug)]
pub struct EdamamProvider {
    endpoint: Url,
    app_id: String,
    app_key: String,
    client: Client,
}

impl EdamamProvider {
    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        let endpoint = Url::parse(&config.base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            endpoint,
            app_id: config.app_id.clone(),
            app_key: config.app_key.clone(),
            client,
        })
    }
}

#[async_trait]
impl RecipeSearch for EdamamProvider {
    async fn search(&self, query: &str) -> Result<Vec<Recipe>, SearchError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("app_id", &self.app_id)
            .append_pair("app_key", &self.app_key)
            .append_pair("type", "public");

        debug!("Querying recipe API for '{}'", query);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let parsed: EdamamResponse = serde_json::from_slice(&bytes)?;
        let recipes: Vec<Recipe> = parsed.hits.into_iter().map(|hit| hit.recipe).collect();
        debug!("Recipe API returned {} hits for '{}'", recipes.len(), query);
        Ok(recipes)
    }
}

/// What a search page shows for the upstream part of a search.
#[derive(Serialize, Debug, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SearchOutcome {
    Found { recipes: Vec<Recipe> },
    Empty,
    Unavailable { reason: String },
}

impl From<Result<Vec<Recipe>, SearchError>> for SearchOutcome {
    fn from(result: Result<Vec<Recipe>, SearchError>) -> Self {
        match result {
            Ok(recipes) if recipes.is_empty() => SearchOutcome::Empty,
            Ok(recipes) => SearchOutcome::Found { recipes },
            Err(e) => SearchOutcome::Unavailable {
                reason: e.to_string(),
            },
        }
    }
}

pub async fn get_recipes(provider: &dyn RecipeSearch, query: &str) -> SearchOutcome {
    let result = provider.search(query).await;
    if let Err(e) = &result {
        warn!("Recipe search for '{}' failed: {}", query, e);
    }
    result.into()
}
