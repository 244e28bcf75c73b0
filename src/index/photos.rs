use crate::error::AppError;
use crate::index::aggregation::TermsAggregation;
use crate::index::document::DocumentStore;
use crate::index::page::IndexPage;
use crate::metadata::MetadataRecord;
use sha2::{Digest, Sha256};
use url::Url;

/// Photo documents, keyed by the SHA-256 of their path.
#[derive(Clone)]
pub struct PhotoIndex {
    documents: DocumentStore<MetadataRecord>,
}

pub fn document_id(path: &Url) -> String {
    format!("{:x}", Sha256::digest(path.as_str().as_bytes()))
}

impl PhotoIndex {
    pub fn new(documents: DocumentStore<MetadataRecord>) -> Self {
        Self { documents }
    }

    pub fn index(&self) -> &str {
        self.documents.index()
    }

    /// Indexes a record under the id derived from its path. Without
    /// `allow_update`, a photo already present fails with
    /// [`AppError::DocumentAlreadyExists`].
    pub async fn add(&self, record: &MetadataRecord, allow_update: bool) -> Result<String, AppError> {
        let id = document_id(&record.path);
        log::debug!("Indexing {} as {} (update allowed: {})", record.path, id, allow_update);
        self.documents.add(Some(&id), record, allow_update).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<MetadataRecord>, AppError> {
        self.documents.get(id).await
    }

    pub async fn count(&self) -> Result<u64, AppError> {
        self.documents.count().await
    }

    pub async fn search(
        &self,
        query: &str,
        from: usize,
        size: usize,
    ) -> Result<IndexPage<MetadataRecord>, AppError> {
        self.documents.search(query, from, size).await
    }

    pub async fn next(
        &self,
        page: &IndexPage<MetadataRecord>,
    ) -> Result<IndexPage<MetadataRecord>, AppError> {
        self.documents.next(page).await
    }

    pub async fn get_aggregations(&self, template_id: &str) -> Result<Vec<TermsAggregation>, AppError> {
        self.documents.aggregations(template_id).await
    }

    /// Makes recent writes visible to search.
    pub async fn refresh(&self) -> Result<(), AppError> {
        self.documents.refresh().await
    }
}
