use crate::error::AppError;
use crate::index::aggregation::TermsAggregation;
use crate::index::page::IndexPage;
use crate::search::SearchBackend;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;

/// Typed access to the documents of one index.
pub struct DocumentStore<T> {
    backend: Arc<dyn SearchBackend>,
    index: String,
    max_result_window: usize,
    _document: PhantomData<fn() -> T>,
}

impl<T> Clone for DocumentStore<T> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            index: self.index.clone(),
            max_result_window: self.max_result_window,
            _document: PhantomData,
        }
    }
}

impl<T> DocumentStore<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(backend: Arc<dyn SearchBackend>, index: impl Into<String>, max_result_window: usize) -> Self {
        Self {
            backend,
            index: index.into(),
            max_result_window,
            _document: PhantomData,
        }
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub async fn add(&self, id: Option<&str>, document: &T, allow_update: bool) -> Result<String, AppError> {
        let value = serde_json::to_value(document)?;
        self.backend
            .put_document(&self.index, id, value, allow_update)
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>, AppError> {
        match self.backend.get_document(&self.index, id).await? {
            Some(source) => Ok(Some(serde_json::from_value(source)?)),
            None => Ok(None),
        }
    }

    pub async fn count(&self) -> Result<u64, AppError> {
        self.backend.count(&self.index).await
    }

    /// Runs a backend-native query. A page reaching past the index result
    /// window is shortened to end at it; starting at or past the window is
    /// refused before any request is made.
    pub async fn search(&self, query: &str, from: usize, size: usize) -> Result<IndexPage<T>, AppError> {
        if from >= self.max_result_window {
            return Err(AppError::ResultWindowExceeded {
                from,
                size,
                max: self.max_result_window,
            });
        }
        let size = size.min(self.max_result_window - from);

        let hits = self.backend.search(&self.index, query, from, size).await?;
        let documents = hits
            .sources
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()?;
        log::debug!(
            "Search on '{}' returned {} of {} hit(s) [from={}]",
            self.index,
            documents.len(),
            hits.total,
            from
        );

        Ok(IndexPage::new(documents, query, hits.total, from, size))
    }

    pub async fn next(&self, page: &IndexPage<T>) -> Result<IndexPage<T>, AppError> {
        self.search(page.query(), page.next_from(), page.size()).await
    }

    pub async fn aggregations(&self, template_id: &str) -> Result<Vec<TermsAggregation>, AppError> {
        let response = self.backend.search_template(&self.index, template_id).await?;
        Ok(TermsAggregation::from_response(&response))
    }

    pub async fn refresh(&self) -> Result<(), AppError> {
        self.backend.refresh_index(&self.index).await
    }
}
