//! Single-document operations and search.
//!
//! Lookups that omit the index or type are expanded through the
//! [`Inventory`] and tried against every combination.

use crate::bulk::UpdateOp;
use crate::client::{DocumentRef, SearchEngine, SearchRequest};
use crate::error::{EsgenError, Result};
use crate::inventory::{Inventory, Selector};
use crate::model::{SearchItem, SearchResultPage, Sort};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// A document id with an optional index and type.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentLookup {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<Selector>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<Selector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl DocumentLookup {
    pub fn new(id: impl Into<String>) -> Self {
        DocumentLookup {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn index(mut self, index: impl Into<Selector>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn doc_type(mut self, doc_type: impl Into<Selector>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

pub struct Documents<E: SearchEngine> {
    engine: Arc<E>,
    inventory: Inventory<E>,
}

impl<E: SearchEngine> Documents<E> {
    pub fn new(engine: Arc<E>, max_fan_out: usize) -> Self {
        Documents {
            inventory: Inventory::new(Arc::clone(&engine), max_fan_out),
            engine,
        }
    }

    pub async fn index_document(&self, doc: &DocumentRef, body: &Value) -> Result<Value> {
        doc.validate()?;
        self.engine.index_document(doc, body).await
    }

    /// The first match across the expanded index/type combinations, scored 1.
    pub async fn get_document(&self, lookup: &DocumentLookup) -> Result<Option<SearchItem>> {
        for doc in self.expand(lookup).await? {
            let Some(raw) = self.engine.get_document(&doc).await? else {
                continue;
            };
            if let Some(mut item) = SearchItem::from_wire(&raw, false) {
                item.score = 1.0;
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    /// True when any index/type combination holds the document. Lookup
    /// failures on individual combinations count as "not there".
    pub async fn document_exists(&self, lookup: &DocumentLookup) -> Result<bool> {
        for doc in self.expand(lookup).await? {
            match self.engine.get_document(&doc).await {
                Ok(Some(_)) => return Ok(true),
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(
                        "[documents] lookup of {}/{}/{} failed: {}",
                        doc.index,
                        doc.doc_type,
                        doc.id,
                        e
                    );
                }
            }
        }
        Ok(false)
    }

    pub async fn update_document(&self, op: &UpdateOp) -> Result<Value> {
        op.target.validate()?;
        self.engine
            .update_document(&op.target, &op.body.to_json(), op.retry_on_conflict)
            .await
    }

    /// Delete the document from every combination the lookup expands to.
    /// Combinations that do not hold it are skipped; the responses of the
    /// deletes that hit are returned.
    pub async fn delete_document(&self, lookup: &DocumentLookup) -> Result<Vec<Value>> {
        let mut responses = Vec::new();
        for doc in self.expand(lookup).await? {
            match self.engine.delete_document(&doc).await {
                Ok(response) => responses.push(response),
                Err(e) if e.is_not_found() => {
                    tracing::debug!(
                        "[documents] {}/{}/{} not there, skipping",
                        doc.index,
                        doc.doc_type,
                        doc.id
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(responses)
    }

    pub async fn delete_by_query(
        &self,
        indices: &[String],
        types: &[String],
        query: &Value,
    ) -> Result<Value> {
        self.engine.delete_by_query(indices, types, query).await
    }

    /// Run a search. Sorts are checked before the request and replace any
    /// `sort` already in the body.
    pub async fn search(&self, mut request: SearchRequest, sorts: &[Sort]) -> Result<SearchResultPage> {
        sorts.iter().try_for_each(Sort::validate)?;
        if !sorts.is_empty() {
            let projected: Vec<Value> = sorts.iter().map(Sort::to_json).collect();
            match &mut request.body {
                Value::Object(body) => {
                    body.insert("sort".into(), Value::Array(projected));
                }
                other => *other = serde_json::json!({ "sort": projected }),
            }
        }
        let page = self.engine.search(&request).await?;
        tracing::debug!(
            "[documents] search returned {} of {} hits",
            page.items.len(),
            page.total
        );
        Ok(page)
    }

    async fn expand(&self, lookup: &DocumentLookup) -> Result<Vec<DocumentRef>> {
        if lookup.id.is_empty() {
            return Err(EsgenError::incomplete("document lookup: missing id"));
        }
        let combinations = self
            .inventory
            .supply_index_and_type(lookup.index.clone(), lookup.doc_type.clone())
            .await?;
        Ok(combinations
            .into_iter()
            .map(|(index, doc_type)| {
                let doc = DocumentRef::new(index, doc_type, lookup.id.clone());
                match &lookup.parent {
                    Some(parent) => doc.parent(parent.clone()),
                    None => doc,
                }
            })
            .collect())
    }
}
