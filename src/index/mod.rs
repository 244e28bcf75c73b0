pub mod aggregation;
pub mod document;
pub mod lifecycle;
pub mod page;
pub mod photos;
pub mod templates;

pub use aggregation::{Bucket, TermsAggregation};
pub use document::DocumentStore;
pub use lifecycle::MetadataIndex;
pub use page::IndexPage;
pub use photos::{document_id, PhotoIndex};

use crate::config::{ClusterConfig, IndexorConfig};
use crate::error::AppError;
use crate::search::{Connector, SearchBackend};
use crate::search_clients::elasticsearch::ElasticsearchConnector;
use std::sync::Arc;

/// Entry point to the photo index: owns the cluster connection and hands out
/// the document and administration accessors bound to it.
pub struct Indexor {
    connector: Box<dyn Connector>,
    cluster: ClusterConfig,
    backend: Arc<dyn SearchBackend>,
    photos: PhotoIndex,
    metadata_index: MetadataIndex,
}

impl Indexor {
    pub fn new(config: &IndexorConfig) -> Result<Self, AppError> {
        if config.cluster.embedded.enabled {
            return Err(AppError::EmbeddedClusterUnavailable);
        }
        if config.cluster.embedded.expose {
            log::warn!("indexor.cluster.embedded.expose is ignored without an embedded cluster");
        }
        Self::with_connector(
            Box::new(ElasticsearchConnector::from_config(&config.cluster)),
            config,
        )
    }

    pub fn with_connector(connector: Box<dyn Connector>, config: &IndexorConfig) -> Result<Self, AppError> {
        let backend = connector.connect()?;
        log::info!(
            "Indexor bound to {} (index '{}')",
            connector.endpoint(),
            config.cluster.index
        );
        let (photos, metadata_index) = accessors(&backend, &config.cluster);

        Ok(Self {
            connector,
            cluster: config.cluster.clone(),
            backend,
            photos,
            metadata_index,
        })
    }

    pub fn endpoint(&self) -> String {
        self.connector.endpoint()
    }

    pub async fn is_connected(&self) -> bool {
        if self.backend.is_closed() {
            return false;
        }
        match self.backend.ping().await {
            Ok(alive) => alive,
            Err(e) => {
                log::debug!("Ping to {} failed: {}", self.endpoint(), e);
                false
            }
        }
    }

    pub fn photos(&self) -> Result<&PhotoIndex, AppError> {
        self.ensure_open()?;
        Ok(&self.photos)
    }

    pub fn metadata_index(&self) -> Result<&MetadataIndex, AppError> {
        self.ensure_open()?;
        Ok(&self.metadata_index)
    }

    pub async fn load_search_templates(&self) -> Result<(), AppError> {
        self.ensure_open()?;
        templates::load_all(self.backend.as_ref()).await
    }

    pub async fn has_search_template(&self, id: &str) -> Result<bool, AppError> {
        self.ensure_open()?;
        self.backend.search_template_exists(id).await
    }

    pub async fn delete_search_template(&self, id: &str) -> Result<(), AppError> {
        self.ensure_open()?;
        self.backend.delete_search_template(id).await
    }

    /// Drops the current connection and opens a fresh one to the same
    /// endpoint. Accessors obtained before the reset stay closed.
    pub async fn reset(&mut self) -> Result<(), AppError> {
        log::info!("Resetting connection to {}", self.endpoint());
        self.backend.close().await;

        let backend = self.connector.connect()?;
        let (photos, metadata_index) = accessors(&backend, &self.cluster);
        self.backend = backend;
        self.photos = photos;
        self.metadata_index = metadata_index;
        Ok(())
    }

    pub async fn close(&self) {
        self.backend.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.backend.is_closed()
    }

    fn ensure_open(&self) -> Result<(), AppError> {
        if self.backend.is_closed() {
            return Err(AppError::ConnectionClosed);
        }
        Ok(())
    }
}

fn accessors(backend: &Arc<dyn SearchBackend>, cluster: &ClusterConfig) -> (PhotoIndex, MetadataIndex) {
    let documents = DocumentStore::new(Arc::clone(backend), &cluster.index, cluster.max_result_window);
    (
        PhotoIndex::new(documents),
        MetadataIndex::new(Arc::clone(backend), &cluster.index),
    )
}
