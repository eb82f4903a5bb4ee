use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::SignalSource;
use crate::config::PreprintConfig;
use crate::error::ProviderError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,
    pub published_date: String,
    pub categories: Vec<String>,
    pub source_query: String,
}

/// arXiv query API, newest submissions first.
pub struct PreprintClient {
    client: Client,
    config: PreprintConfig,
}

impl PreprintClient {
    pub fn new(client: Client, config: PreprintConfig) -> Self {
        Self { client, config }
    }
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    #[serde(default)]
    title: String,
    #[serde(default)]
    published: String,
    #[serde(rename = "category", default)]
    categories: Vec<AtomCategory>,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term")]
    term: String,
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse an Atom feed into papers. Entries without a title are skipped.
pub(crate) fn parse_feed(xml: &str, query: &str) -> Result<Vec<Paper>, ProviderError> {
    let feed: AtomFeed =
        quick_xml::de::from_str(xml).map_err(|err| ProviderError::Decode(err.to_string()))?;

    Ok(feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let title = collapse_whitespace(&entry.title);
            if title.is_empty() {
                return None;
            }
            let published = entry.published.trim();
            Some(Paper {
                title,
                published_date: published.get(..10).unwrap_or(published).to_string(),
                categories: entry.categories.into_iter().map(|c| c.term).collect(),
                source_query: query.to_string(),
            })
        })
        .collect())
}

#[async_trait]
impl SignalSource for PreprintClient {
    type Record = Paper;

    fn name(&self) -> &'static str {
        "preprint"
    }

    async fn search(&self, query: &str) -> Result<Vec<Paper>, ProviderError> {
        let url = format!("{}/api/query", self.config.base_url.trim_end_matches('/'));
        let max_results = self.config.max_results.to_string();
        let response = self
            .client
            .get(url)
            .query(&[
                ("search_query", query),
                ("start", "0"),
                ("max_results", max_results.as_str()),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
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

        let body = response.text().await?;
        parse_feed(&body, query)
    }

    fn record_key(record: &Paper) -> Option<String> {
        Some(record.title.clone())
    }
}
