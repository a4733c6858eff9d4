// src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown entity `{0}`")]
    UnknownEntity(String),
    #[error("store i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("store encoding: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("store http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store backend: {0}")]
    Backend(String),
}

/// Errors that abort a whole cycle. Everything per-entity ends up in `CycleResult.errors` instead.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("loading entities failed: {0}")]
    LoadEntities(#[source] StoreError),
}
