pub mod http;

use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct SearchAnswer {
    pub text: String,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// The best answer the FAQ backend has for a user question, if any.
    async fn query(&self, question: &str) -> anyhow::Result<Option<SearchAnswer>>;
}

/// Used when no search backend is configured; every question goes unanswered.
pub struct NoSearch;

#[async_trait]
impl SearchProvider for NoSearch {
    async fn query(&self, _question: &str) -> anyhow::Result<Option<SearchAnswer>> {
        Ok(None)
    }
}
