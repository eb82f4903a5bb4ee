use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::SignalSource;
use crate::config::RepositoryConfig;
use crate::error::ProviderError;
use crate::security::lookup_env;

const USER_AGENT: &str = concat!("trendscout/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub full_name: String,
    pub stargazers_count: u64,
    pub language: Option<String>,
    pub description: Option<String>,
    pub html_url: String,
    pub source_query: String,
}

/// GitHub repository search restricted to young, already-starred projects.
pub struct RepositoryClient {
    client: Client,
    config: RepositoryConfig,
}

impl RepositoryClient {
    pub fn new(client: Client, config: RepositoryConfig) -> Self {
        Self { client, config }
    }

    /// `{query} created:>{date} stars:>{min}` with the date `lookback_days` before `today`.
    pub fn search_expression(
        &self,
        query: &str,
        today: NaiveDate,
    ) -> Result<String, ProviderError> {
        let lookback_days = self.config.lookback_days;
        let threshold = Duration::try_days(lookback_days)
            .and_then(|lookback| today.checked_sub_signed(lookback))
            .ok_or_else(|| {
                ProviderError::InvalidQuery(format!(
                    "lookback of {lookback_days} days is out of range"
                ))
            })?;
        Ok(format!(
            "{query} created:>{} stars:>{}",
            threshold.format("%Y-%m-%d"),
            self.config.min_stars
        ))
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    full_name: String,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    html_url: String,
}

fn parse_repositories(response: SearchResponse, query: &str) -> Vec<Repository> {
    response
        .items
        .into_iter()
        .map(|item| Repository {
            full_name: item.full_name,
            stargazers_count: item.stargazers_count,
            language: item.language,
            description: item.description,
            html_url: item.html_url,
            source_query: query.to_string(),
        })
        .collect()
}

#[async_trait]
impl SignalSource for RepositoryClient {
    type Record = Repository;

    fn name(&self) -> &'static str {
        "repository"
    }

    async fn search(&self, query: &str) -> Result<Vec<Repository>, ProviderError> {
        let token = lookup_env(&self.config.token_env)
            .ok_or_else(|| ProviderError::MissingCredential(self.config.token_env.clone()))?;

        let url = format!(
            "{}/search/repositories",
            self.config.base_url.trim_end_matches('/')
        );
        let expression = self.search_expression(query, Utc::now().date_naive())?;
        let per_page = self.config.per_page.to_string();

        let response = self
            .client
            .get(url)
            .header("Authorization", format!("token {}", token.expose()))
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", USER_AGENT)
            .query(&[
                ("q", expression.as_str()),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", per_page.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let payload: SearchResponse = response.json().await?;
        Ok(parse_repositories(payload, query))
    }

    fn record_key(record: &Repository) -> Option<String> {
        Some(record.full_name.clone())
    }
}
