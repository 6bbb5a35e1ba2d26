//! Turning a bare package name into a repository to clone.

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

use crate::http::HttpClient;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Results requested per search.
const PER_PAGE: &str = "10";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub owner: String,
    pub name: String,
    pub clone_url: String,
    pub stars: u64,
    pub description: Option<String>,
}

impl SearchResult {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackageSearch: Send + Sync {
    /// Repositories matching `name`, most starred first.
    async fn search(&self, name: &str) -> Result<Vec<SearchResult>>;
}

#[derive(Deserialize)]
struct SearchResponse {
    items: Vec<RepositoryItem>,
}

#[derive(Deserialize)]
struct RepositoryItem {
    name: String,
    owner: Owner,
    clone_url: String,
    #[serde(default)]
    stargazers_count: u64,
    description: Option<String>,
}

#[derive(Deserialize)]
struct Owner {
    login: String,
}

impl From<RepositoryItem> for SearchResult {
    fn from(item: RepositoryItem) -> Self {
        Self {
            owner: item.owner.login,
            name: item.name,
            clone_url: item.clone_url,
            stars: item.stargazers_count,
            description: item.description,
        }
    }
}

pub struct GitHubSearch {
    http: HttpClient,
    api_url: String,
}

impl GitHubSearch {
    pub fn new(http: HttpClient, api_url: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PackageSearch for GitHubSearch {
    #[tracing::instrument(skip(self))]
    async fn search(&self, name: &str) -> Result<Vec<SearchResult>> {
        let url = format!("{}/search/repositories", self.api_url);
        let query = format!("{} in:name language:Swift", name);

        let response: SearchResponse = self
            .http
            .get_json_with_query(
                &url,
                &[
                    ("q", query.as_str()),
                    ("sort", "stars"),
                    ("order", "desc"),
                    ("per_page", PER_PAGE),
                ],
            )
            .await?;

        let mut results: Vec<SearchResult> =
            response.items.into_iter().map(SearchResult::from).collect();
        results.sort_by(|a, b| b.stars.cmp(&a.stars));
        debug!("Search for {} returned {} repositories", name, results.len());
        Ok(results)
    }
}
