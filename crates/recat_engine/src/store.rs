use async_trait::async_trait;
use thiserror::Error;

/// Coded failure surface of a document store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("target does not exist: {0}")]
    MissingTarget(String),
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("edit conflict not resolved by store retries")]
    Conflict,
    #[error("rate limited by the document store")]
    RateLimited,
    #[error("{0}")]
    Unknown(String),
}

/// Result of an accepted write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The store applied the new body.
    Accepted,
    /// The proposed body equals the current content; nothing was stored.
    NoChange,
}

/// External store holding document bodies, with optimistic-concurrency
/// retry owned by the implementation.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn read_body(&self, title: &str) -> Result<String, StoreError>;

    async fn write(
        &self,
        title: &str,
        body: &str,
        summary: &str,
    ) -> Result<WriteOutcome, StoreError>;
}
