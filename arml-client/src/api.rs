use std::sync::Arc;

use arml_core::{Entity, EntityId, sort::SortState};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("server responded with {status}: {message}")]
    Server { status: u16, message: String },

    #[error("HTTP request failed")]
    Request(#[from] reqwest::Error),

    #[error("Failed to serialize/deserialize entity")]
    Serde(#[from] serde_json::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

pub type ArcEntityApi<E> = Arc<dyn EntityApi<E> + Send + Sync + 'static>;

/// Per-entity REST endpoints of the backend.
#[async_trait::async_trait]
pub trait EntityApi<E: Entity> {
    async fn list(&self, sort: Option<&SortState>) -> ApiResult<Vec<E>>;
    async fn get(&self, id: EntityId) -> ApiResult<E>;
    /// `entity` must not carry an id yet.
    async fn create(&self, entity: &E) -> ApiResult<E>;
    async fn update(&self, entity: &E) -> ApiResult<E>;
    async fn delete(&self, id: EntityId) -> ApiResult<()>;
}
