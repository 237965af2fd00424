//! The engine seam. Every orchestration component is generic over
//! [`SearchEngine`] and receives its handle explicitly.

pub mod http;

use crate::bulk::BulkResponse;
use crate::error::{EsgenError, Result};
use crate::model::SearchResultPage;
use crate::scroll::ScrollDuration;
use crate::settings::CreateIndexRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;

pub use self::http::HttpEngine;

/// Which indices a delete applies to. Deleting everything has to be asked
/// for by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexTarget {
    All,
    Named(Vec<String>),
}

impl IndexTarget {
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        IndexTarget::Named(names.into_iter().map(Into::into).collect())
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            IndexTarget::All => Ok(()),
            IndexTarget::Named(names) if names.is_empty() => Err(EsgenError::MissingIndexList(
                "no indices named for deletion".into(),
            )),
            IndexTarget::Named(names) if names.iter().any(String::is_empty) => Err(
                EsgenError::MissingIndexList("empty index name in deletion list".into()),
            ),
            IndexTarget::Named(_) => Ok(()),
        }
    }

    /// Path segment: `_all` or a comma separated list.
    pub fn path(&self) -> String {
        match self {
            IndexTarget::All => "_all".to_string(),
            IndexTarget::Named(names) => join_segment(names),
        }
    }
}

/// One entry of an `_aliases` update.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasAction {
    Add { index: String, alias: String },
    Remove { index: String, alias: String },
}

impl AliasAction {
    pub fn index(&self) -> &str {
        match self {
            AliasAction::Add { index, .. } | AliasAction::Remove { index, .. } => index,
        }
    }

    pub fn alias(&self) -> &str {
        match self {
            AliasAction::Add { alias, .. } | AliasAction::Remove { alias, .. } => alias,
        }
    }
}

/// Address of a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    pub index: String,
    pub doc_type: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl DocumentRef {
    pub fn new(
        index: impl Into<String>,
        doc_type: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        DocumentRef {
            index: index.into(),
            doc_type: doc_type.into(),
            id: id.into(),
            parent: None,
        }
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        let missing = if self.index.is_empty() {
            "index"
        } else if self.doc_type.is_empty() {
            "type"
        } else if self.id.is_empty() {
            "id"
        } else {
            return Ok(());
        };
        Err(EsgenError::incomplete(format!("document reference: missing {}", missing)))
    }
}

/// A query against zero or more indices and types. Empty lists search
/// everything.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub indices: Vec<String>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub body: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll: Option<ScrollDuration>,
}

impl SearchRequest {
    pub fn new(body: Value) -> Self {
        SearchRequest {
            body,
            ..Default::default()
        }
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.indices.push(index.into());
        self
    }

    pub fn doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.types.push(doc_type.into());
        self
    }

    pub fn scroll(mut self, duration: ScrollDuration) -> Self {
        self.scroll = Some(duration);
        self
    }

    /// `/{indices}/{types}` prefix, or empty when searching everything.
    pub fn path_prefix(&self) -> String {
        let mut path = String::new();
        if !self.indices.is_empty() {
            path.push('/');
            path.push_str(&join_segment(&self.indices));
        } else if !self.types.is_empty() {
            path.push_str("/_all");
        }
        if !self.types.is_empty() {
            path.push('/');
            path.push_str(&join_segment(&self.types));
        }
        path
    }
}

pub(crate) fn join_segment(names: &[String]) -> String {
    names
        .iter()
        .map(|n| urlencoding::encode(n).into_owned())
        .collect::<Vec<_>>()
        .join(",")
}

/// Remote operations the orchestration layer needs from a search engine.
pub trait SearchEngine: Send + Sync {
    fn ping(&self) -> impl Future<Output = Result<bool>> + Send;

    fn cluster_health(&self) -> impl Future<Output = Result<Value>> + Send;

    fn index_exists(&self, index: &str) -> impl Future<Output = Result<bool>> + Send;

    fn create_index(
        &self,
        request: &CreateIndexRequest,
    ) -> impl Future<Output = Result<Value>> + Send;

    fn delete_index(&self, target: &IndexTarget) -> impl Future<Output = Result<Value>> + Send;

    /// Applies all actions as one unit.
    fn update_aliases(
        &self,
        actions: &[AliasAction],
    ) -> impl Future<Output = Result<Value>> + Send;

    fn search(
        &self,
        request: &SearchRequest,
    ) -> impl Future<Output = Result<SearchResultPage>> + Send;

    fn scroll(
        &self,
        scroll_id: &str,
        keep_alive: &ScrollDuration,
    ) -> impl Future<Output = Result<SearchResultPage>> + Send;

    fn clear_scroll(&self, scroll_id: &str) -> impl Future<Output = Result<()>> + Send;

    /// Submit a newline-delimited bulk body.
    fn bulk(&self, body: String) -> impl Future<Output = Result<BulkResponse>> + Send;

    /// Raw `{index: {mappings: {...}}}` for the given indices, or all.
    fn get_mapping(
        &self,
        indices: Option<&[String]>,
    ) -> impl Future<Output = Result<Value>> + Send;

    /// `index alias` rows, one per line.
    fn cat_aliases(&self) -> impl Future<Output = Result<String>> + Send;

    fn index_document(
        &self,
        doc: &DocumentRef,
        body: &Value,
    ) -> impl Future<Output = Result<Value>> + Send;

    /// `Ok(None)` when the document does not exist.
    fn get_document(
        &self,
        doc: &DocumentRef,
    ) -> impl Future<Output = Result<Option<Value>>> + Send;

    fn update_document(
        &self,
        doc: &DocumentRef,
        body: &Value,
        retry_on_conflict: u32,
    ) -> impl Future<Output = Result<Value>> + Send;

    fn delete_document(&self, doc: &DocumentRef) -> impl Future<Output = Result<Value>> + Send;

    fn delete_by_query(
        &self,
        indices: &[String],
        types: &[String],
        query: &Value,
    ) -> impl Future<Output = Result<Value>> + Send;
}
