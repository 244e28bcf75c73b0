use crate::error::AppError;
use crate::search::SearchBackend;
use serde_json::Value;
use std::sync::Arc;

const PHOTO_MAPPING: &str = include_str!("../../resources/mapping/photo.json");

pub fn photo_mapping() -> Result<Value, AppError> {
    Ok(serde_json::from_str(PHOTO_MAPPING)?)
}

/// Administration of the photo index itself.
#[derive(Clone)]
pub struct MetadataIndex {
    backend: Arc<dyn SearchBackend>,
    index: String,
}

impl MetadataIndex {
    pub fn new(backend: Arc<dyn SearchBackend>, index: impl Into<String>) -> Self {
        Self {
            backend,
            index: index.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.index
    }

    /// Fails with the backend's error when the index already exists.
    pub async fn create(&self) -> Result<(), AppError> {
        let mapping = photo_mapping()?;
        self.backend.create_index(&self.index, Some(&mapping)).await
    }

    pub async fn exists(&self) -> Result<bool, AppError> {
        self.backend.index_exists(&self.index).await
    }

    pub async fn delete(&self) -> Result<(), AppError> {
        self.backend.delete_index(&self.index).await
    }

    /// Drops the index if it is there, then creates it empty.
    pub async fn clear(&self) -> Result<(), AppError> {
        if let Err(e) = self.delete().await {
            log::warn!("Could not delete index '{}' before re-creating it: {}", self.index, e);
        }
        self.create().await
    }
}
