use super::{join_segment, AliasAction, DocumentRef, IndexTarget, SearchEngine, SearchRequest};
use crate::bulk::BulkResponse;
use crate::config::EngineConfig;
use crate::error::{EsgenError, Result};
use crate::model::SearchResultPage;
use crate::scroll::ScrollDuration;
use crate::settings::CreateIndexRequest;
use crate::version::EngineVersion;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};

/// [`SearchEngine`] over the engine's REST API.
#[derive(Debug, Clone)]
pub struct HttpEngine {
    base_url: String,
    version: EngineVersion,
    http_client: reqwest::Client,
}

impl HttpEngine {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(HttpEngine {
            base_url: config.url.trim_end_matches('/').to_string(),
            version: config.version(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn version(&self) -> EngineVersion {
        self.version
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn doc_path(doc: &DocumentRef) -> String {
        format!(
            "/{}/{}/{}",
            urlencoding::encode(&doc.index),
            urlencoding::encode(&doc.doc_type),
            urlencoding::encode(&doc.id)
        )
    }

    fn with_parent(req: RequestBuilder, doc: &DocumentRef) -> RequestBuilder {
        match &doc.parent {
            Some(parent) => req.query(&[("parent", parent.as_str())]),
            None => req,
        }
    }

    /// Send and turn any non-2xx status into [`EsgenError::Transport`].
    async fn send(&self, req: RequestBuilder) -> Result<Response> {
        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("Engine returned {}: {}", status, body);
            return Err(EsgenError::Transport { status, body });
        }
        Ok(response)
    }

    async fn send_json(&self, req: RequestBuilder) -> Result<Value> {
        let response = self.send(req).await?;
        Ok(response.json().await?)
    }
}

impl SearchEngine for HttpEngine {
    async fn ping(&self) -> Result<bool> {
        let response = self.http_client.head(self.url("/")).send().await?;
        Ok(response.status().is_success())
    }

    async fn cluster_health(&self) -> Result<Value> {
        self.send_json(self.http_client.get(self.url("/_cluster/health")))
            .await
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        let url = self.url(&format!("/{}", urlencoding::encode(index)));
        let response = self.http_client.head(&url).send().await?;
        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(EsgenError::Transport {
                status,
                body: String::new(),
            }),
        }
    }

    async fn create_index(&self, request: &CreateIndexRequest) -> Result<Value> {
        let url = self.url(&format!("/{}", urlencoding::encode(&request.index)));
        self.send_json(self.http_client.put(&url).json(&request.body))
            .await
    }

    async fn delete_index(&self, target: &IndexTarget) -> Result<Value> {
        target.validate()?;
        let url = self.url(&format!("/{}", target.path()));
        self.send_json(self.http_client.delete(&url)).await
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<Value> {
        let body = json!({ "actions": actions });
        self.send_json(self.http_client.post(self.url("/_aliases")).json(&body))
            .await
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResultPage> {
        let url = self.url(&format!("{}/_search", request.path_prefix()));
        let mut req = self.http_client.post(&url).json(&request.body);
        if let Some(scroll) = &request.scroll {
            req = req.query(&[("scroll", scroll.as_str())]);
        }
        let raw = self.send_json(req).await?;
        Ok(SearchResultPage::from_wire(&raw))
    }

    async fn scroll(&self, scroll_id: &str, keep_alive: &ScrollDuration) -> Result<SearchResultPage> {
        let body = json!({ "scroll": keep_alive.as_str(), "scroll_id": scroll_id });
        let raw = self
            .send_json(self.http_client.post(self.url("/_search/scroll")).json(&body))
            .await?;
        Ok(SearchResultPage::from_wire(&raw))
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<()> {
        let body = json!({ "scroll_id": [scroll_id] });
        self.send(
            self.http_client
                .delete(self.url("/_search/scroll"))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn bulk(&self, body: String) -> Result<BulkResponse> {
        let req = self
            .http_client
            .post(self.url("/_bulk"))
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body);
        let response = self.send(req).await?;
        Ok(response.json().await?)
    }

    async fn get_mapping(&self, indices: Option<&[String]>) -> Result<Value> {
        let path = match indices {
            Some(names) if !names.is_empty() => format!("/{}/_mapping", join_segment(names)),
            _ => "/_mapping".to_string(),
        };
        self.send_json(self.http_client.get(self.url(&path))).await
    }

    async fn cat_aliases(&self) -> Result<String> {
        let req = self
            .http_client
            .get(self.url("/_cat/aliases"))
            .query(&[("h", "index,alias")]);
        let response = self.send(req).await?;
        Ok(response.text().await?)
    }

    async fn index_document(&self, doc: &DocumentRef, body: &Value) -> Result<Value> {
        let req = self.http_client.put(self.url(&Self::doc_path(doc))).json(body);
        self.send_json(Self::with_parent(req, doc)).await
    }

    async fn get_document(&self, doc: &DocumentRef) -> Result<Option<Value>> {
        let req = self.http_client.get(self.url(&Self::doc_path(doc)));
        match self.send_json(Self::with_parent(req, doc)).await {
            Ok(raw) if raw.get("found").and_then(Value::as_bool) == Some(false) => Ok(None),
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn update_document(
        &self,
        doc: &DocumentRef,
        body: &Value,
        retry_on_conflict: u32,
    ) -> Result<Value> {
        let url = self.url(&format!("{}/_update", Self::doc_path(doc)));
        let mut req = self.http_client.post(&url).json(body);
        if retry_on_conflict > 0 {
            req = req.query(&[("retry_on_conflict", retry_on_conflict)]);
        }
        self.send_json(Self::with_parent(req, doc)).await
    }

    async fn delete_document(&self, doc: &DocumentRef) -> Result<Value> {
        let req = self.http_client.delete(self.url(&Self::doc_path(doc)));
        self.send_json(Self::with_parent(req, doc)).await
    }

    async fn delete_by_query(
        &self,
        indices: &[String],
        types: &[String],
        query: &Value,
    ) -> Result<Value> {
        let request = SearchRequest {
            indices: indices.to_vec(),
            types: types.to_vec(),
            ..Default::default()
        };
        let url = self.url(&format!("{}/_delete_by_query", request.path_prefix()));
        self.send_json(self.http_client.post(&url).json(query)).await
    }
}
