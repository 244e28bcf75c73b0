use crate::config::ClusterConfig;
use crate::error::AppError;
use crate::search::{Connector, SearchBackend, SearchHits};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};
use elasticsearch::{
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesRefreshParts},
    CountParts, CreateParts, DeleteScriptParts, Elasticsearch, GetParts, GetScriptParts,
    IndexParts, PutScriptParts, SearchParts, SearchTemplateParts,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use url::Url;

pub struct ElasticsearchBackend {
    client: Elasticsearch,
    closed: AtomicBool,
}

impl ElasticsearchBackend {
    pub fn new(url: &str) -> Result<Self, AppError> {
        log::debug!("Creating Elasticsearch client for URL: {}", url);
        let url = Url::parse(url)?;
        let conn_pool = SingleNodeConnectionPool::new(url);
        let transport = TransportBuilder::new(conn_pool).disable_proxy().build()?;
        let client = Elasticsearch::new(transport);
        log::trace!("Elasticsearch client created successfully.");
        Ok(Self {
            client,
            closed: AtomicBool::new(false),
        })
    }

    fn client(&self) -> Result<&Elasticsearch, AppError> {
        if self.is_closed() {
            return Err(AppError::ConnectionClosed);
        }
        Ok(&self.client)
    }
}

/// Turns a non-2xx response into [`AppError::Backend`], keeping the
/// cluster's own error reason when there is one.
async fn check(response: Response) -> Result<Response, AppError> {
    let status = response.status_code();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await?;
    let reason = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|body| body["error"]["reason"].as_str().map(str::to_string))
        .unwrap_or(text);
    Err(AppError::Backend {
        status: status.as_u16(),
        reason,
    })
}

#[async_trait]
impl SearchBackend for ElasticsearchBackend {
    async fn ping(&self) -> Result<bool, AppError> {
        let response = self.client()?.ping().send().await?;
        Ok(response.status_code().is_success())
    }

    async fn create_index(&self, index: &str, mapping: Option<&Value>) -> Result<(), AppError> {
        log::info!("Creating Elasticsearch index '{}'", index);
        let body = match mapping {
            Some(mapping) => json!({ "mappings": mapping }),
            None => json!({}),
        };
        let response = self
            .client()?
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(body)
            .send()
            .await?;
        check(response).await?;
        log::debug!("Elasticsearch index '{}' created successfully.", index);
        Ok(())
    }

    async fn index_exists(&self, index: &str) -> Result<bool, AppError> {
        log::debug!("Checking if Elasticsearch index '{}' exists.", index);
        let response = self
            .client()?
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await?;
        match response.status_code().as_u16() {
            404 => Ok(false),
            _ => Ok(check(response).await?.status_code().is_success()),
        }
    }

    async fn delete_index(&self, index: &str) -> Result<(), AppError> {
        log::info!("Deleting Elasticsearch index '{}'", index);
        let response = self
            .client()?
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn refresh_index(&self, index: &str) -> Result<(), AppError> {
        let response = self
            .client()?
            .indices()
            .refresh(IndicesRefreshParts::Index(&[index]))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn put_document(
        &self,
        index: &str,
        id: Option<&str>,
        document: Value,
        allow_update: bool,
    ) -> Result<String, AppError> {
        let client = self.client()?;
        let response = match id {
            Some(id) if !allow_update => {
                log::trace!("Creating document {} in '{}'", id, index);
                let response = client
                    .create(CreateParts::IndexId(index, id))
                    .body(document)
                    .send()
                    .await?;
                if response.status_code().as_u16() == 409 {
                    return Err(AppError::DocumentAlreadyExists {
                        id: id.to_string(),
                        index: index.to_string(),
                    });
                }
                response
            }
            Some(id) => {
                log::trace!("Upserting document {} in '{}'", id, index);
                client
                    .index(IndexParts::IndexId(index, id))
                    .body(document)
                    .send()
                    .await?
            }
            None => client.index(IndexParts::Index(index)).body(document).send().await?,
        };

        let body = check(response).await?.json::<Value>().await?;
        body["_id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::Backend {
                status: 200,
                reason: "index response carries no _id".to_string(),
            })
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>, AppError> {
        let response = self
            .client()?
            .get(GetParts::IndexId(index, id))
            .send()
            .await?;
        if response.status_code().as_u16() == 404 {
            return Ok(None);
        }
        let mut body = check(response).await?.json::<Value>().await?;
        Ok(body.get_mut("_source").map(Value::take))
    }

    async fn count(&self, index: &str) -> Result<u64, AppError> {
        let response = self
            .client()?
            .count(CountParts::Index(&[index]))
            .send()
            .await?;
        let body = check(response).await?.json::<Value>().await?;
        Ok(body["count"].as_u64().unwrap_or(0))
    }

    async fn search(
        &self,
        index: &str,
        query: &str,
        from: usize,
        size: usize,
    ) -> Result<SearchHits, AppError> {
        log::debug!("Searching '{}' [from={}, size={}]: {}", index, from, size, query);
        // The caller's query is passed through untouched as a wrapper query
        let body = json!({
            "query": { "wrapper": { "query": general_purpose::STANDARD.encode(query) } },
            "from": from,
            "size": size,
            "track_total_hits": true
        });
        let response = self
            .client()?
            .search(SearchParts::Index(&[index]))
            .body(body)
            .send()
            .await?;
        let mut body = check(response).await?.json::<Value>().await?;
        log::trace!("Elasticsearch search response: {:?}", body);

        let total = body["hits"]["total"]["value"].as_u64().unwrap_or(0);
        let sources = match body.pointer_mut("/hits/hits").map(Value::take) {
            Some(Value::Array(hits)) => hits
                .into_iter()
                .filter_map(|mut hit| hit.get_mut("_source").map(Value::take))
                .collect(),
            _ => Vec::new(),
        };
        Ok(SearchHits { total, sources })
    }

    async fn search_template(&self, index: &str, template_id: &str) -> Result<Value, AppError> {
        let response = self
            .client()?
            .search_template(SearchTemplateParts::Index(&[index]))
            .body(json!({ "id": template_id }))
            .send()
            .await?;
        let mut body = check(response).await?.json::<Value>().await?;
        Ok(body
            .get_mut("aggregations")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    async fn put_search_template(&self, id: &str, source: &Value) -> Result<(), AppError> {
        log::debug!("Loading search template '{}'", id);
        let response = self
            .client()?
            .put_script(PutScriptParts::Id(id))
            .body(json!({ "script": { "lang": "mustache", "source": source } }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn search_template_exists(&self, id: &str) -> Result<bool, AppError> {
        let response = self
            .client()?
            .get_script(GetScriptParts::Id(id))
            .send()
            .await?;
        match response.status_code().as_u16() {
            404 => Ok(false),
            _ => {
                let body = check(response).await?.json::<Value>().await?;
                Ok(body["found"].as_bool().unwrap_or(true))
            }
        }
    }

    async fn delete_search_template(&self, id: &str) -> Result<(), AppError> {
        let response = self
            .client()?
            .delete_script(DeleteScriptParts::Id(id))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            log::debug!("Elasticsearch client closed");
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct ElasticsearchConnector {
    url: String,
}

impl ElasticsearchConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn from_config(config: &ClusterConfig) -> Self {
        Self::new(config.url())
    }
}

impl Connector for ElasticsearchConnector {
    fn endpoint(&self) -> String {
        self.url.clone()
    }

    fn connect(&self) -> Result<Arc<dyn SearchBackend>, AppError> {
        Ok(Arc::new(ElasticsearchBackend::new(&self.url)?))
    }
}
