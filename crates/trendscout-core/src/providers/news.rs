use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::SignalSource;
use crate::config::NewsConfig;
use crate::error::ProviderError;
use crate::security::lookup_env;

const REMOVED_MARKER: &str = "[Removed]";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsHeadline {
    pub title: String,
    pub source_query: String,
}

/// NewsAPI `everything` search.
pub struct NewsClient {
    client: Client,
    config: NewsConfig,
}

impl NewsClient {
    pub fn new(client: Client, config: NewsConfig) -> Self {
        Self { client, config }
    }
}

#[derive(Deserialize)]
struct EverythingResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Deserialize)]
struct Article {
    #[serde(default)]
    title: Option<String>,
}

fn parse_headlines(response: EverythingResponse, query: &str) -> Vec<NewsHeadline> {
    response
        .articles
        .into_iter()
        .filter_map(|article| article.title)
        .filter(|title| !title.trim().is_empty() && !title.contains(REMOVED_MARKER))
        .map(|title| NewsHeadline {
            title,
            source_query: query.to_string(),
        })
        .collect()
}

#[async_trait]
impl SignalSource for NewsClient {
    type Record = NewsHeadline;

    fn name(&self) -> &'static str {
        "news"
    }

    async fn search(&self, query: &str) -> Result<Vec<NewsHeadline>, ProviderError> {
        let api_key = lookup_env(&self.config.api_key_env)
            .ok_or_else(|| ProviderError::MissingCredential(self.config.api_key_env.clone()))?;

        let url = format!(
            "{}/v2/everything",
            self.config.base_url.trim_end_matches('/')
        );
        let page_size = self.config.page_size.to_string();
        let response = self
            .client
            .get(url)
            .query(&[
                ("q", query),
                ("pageSize", page_size.as_str()),
                ("sortBy", "relevancy"),
                ("language", self.config.language.as_str()),
                ("apiKey", api_key.expose()),
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

        let payload: EverythingResponse = response.json().await?;
        Ok(parse_headlines(payload, query))
    }

    fn record_key(_record: &NewsHeadline) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn drops_removed_and_blank_titles() {
        let response: EverythingResponse = serde_json::from_value(json!({
            "articles": [
                {"title": "Fusion startup raises seed round"},
                {"title": "[Removed]"},
                {"title": ""},
                {"title": null},
                {"description": "no title at all"}
            ]
        }))
        .unwrap();

        let headlines = parse_headlines(response, "fusion");
        assert_eq!(
            headlines,
            vec![NewsHeadline {
                title: "Fusion startup raises seed round".into(),
                source_query: "fusion".into(),
            }]
        );
    }

    #[tokio::test]
    async fn missing_key_is_reported_without_a_request() {
        let server = MockServer::start().await;
        let client = NewsClient::new(
            Client::new(),
            NewsConfig {
                api_key_env: "TRENDSCOUT_TEST_NO_NEWS_KEY".into(),
                base_url: server.uri(),
                ..NewsConfig::default()
            },
        );

        let err = client.search("anything").await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingCredential(_)));
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn sends_query_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/everything"))
            .and(query_param("q", "synthetic biology AND funding"))
            .and(query_param("pageSize", "50"))
            .and(query_param("apiKey", "news-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "articles": [{"title": "Cell-free protein synthesis scales up"}]
            })))
            .mount(&server)
            .await;

        unsafe {
            std::env::set_var("TRENDSCOUT_TEST_NEWS_KEY", "news-key");
        }
        let client = NewsClient::new(
            Client::new(),
            NewsConfig {
                api_key_env: "TRENDSCOUT_TEST_NEWS_KEY".into(),
                base_url: server.uri(),
                ..NewsConfig::default()
            },
        );

        let headlines = client
            .search("synthetic biology AND funding")
            .await
            .unwrap();
        assert_eq!(headlines.len(), 1);
        assert_eq!(headlines[0].title, "Cell-free protein synthesis scales up");
    }
}
