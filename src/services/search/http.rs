use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use super::{SearchAnswer, SearchProvider};

pub struct HttpSearchProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpSearchProvider {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<QueryResult>,
}

#[derive(Deserialize)]
struct QueryResult {
    title: Option<String>,
    excerpt: Option<String>,
    url: Option<String>,
}

#[async_trait]
impl SearchProvider for HttpSearchProvider {
    async fn query(&self, question: &str) -> anyhow::Result<Option<SearchAnswer>> {
        let url = format!("{}/query", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "query": question }))
            .send()
            .await
            .context("failed to reach search backend")?
            .error_for_status()
            .context("search backend returned error")?;

        let parsed: QueryResponse = response
            .json()
            .await
            .context("failed to parse search response")?;

        let Some(top) = parsed.results.into_iter().next() else {
            return Ok(None);
        };

        let text = match (top.excerpt, top.url) {
            (Some(excerpt), Some(url)) => {
                let label = top.title.unwrap_or_else(|| url.clone());
                format!("{excerpt}\n\nMore: <{url}|{label}>")
            }
            (Some(excerpt), None) => excerpt,
            (None, Some(url)) => {
                let label = top.title.unwrap_or_else(|| url.clone());
                format!("Here is a document you could review: <{url}|{label}>")
            }
            (None, None) => return Ok(None),
        };

        Ok(Some(SearchAnswer { text }))
    }
}
