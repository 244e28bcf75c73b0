use crate::error::AppError;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// One page of raw hits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    pub total: u64,
    pub sources: Vec<Value>,
}

/// Transport-level operations against a search cluster. Queries and
/// documents travel as backend-native JSON.
///
/// Once [`close`](SearchBackend::close) has been called every operation fails
/// with [`AppError::ConnectionClosed`].
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn ping(&self) -> Result<bool, AppError>;

    async fn create_index(&self, index: &str, mapping: Option<&Value>) -> Result<(), AppError>;
    async fn index_exists(&self, index: &str) -> Result<bool, AppError>;
    async fn delete_index(&self, index: &str) -> Result<(), AppError>;
    async fn refresh_index(&self, index: &str) -> Result<(), AppError>;

    /// Stores a document and returns its id. Without `allow_update`, an
    /// existing document with the same id is a conflict; without an id the
    /// backend assigns one.
    async fn put_document(
        &self,
        index: &str,
        id: Option<&str>,
        document: Value,
        allow_update: bool,
    ) -> Result<String, AppError>;
    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>, AppError>;
    async fn count(&self, index: &str) -> Result<u64, AppError>;
    async fn search(
        &self,
        index: &str,
        query: &str,
        from: usize,
        size: usize,
    ) -> Result<SearchHits, AppError>;

    /// Runs a stored search template and returns its `aggregations` object.
    async fn search_template(&self, index: &str, template_id: &str) -> Result<Value, AppError>;
    async fn put_search_template(&self, id: &str, source: &Value) -> Result<(), AppError>;
    async fn search_template_exists(&self, id: &str) -> Result<bool, AppError>;
    async fn delete_search_template(&self, id: &str) -> Result<(), AppError>;

    async fn close(&self);
    fn is_closed(&self) -> bool;
}

/// Opens connections to one cluster endpoint.
pub trait Connector: Send + Sync {
    fn endpoint(&self) -> String;
    fn connect(&self) -> Result<Arc<dyn SearchBackend>, AppError>;
}
