//! Batched document writes through the engine's `_bulk` endpoint.
//!
//! Operations are validated when they are built, so serialization cannot
//! fail on a half-specified operation. One [`BulkWriter::write`] call is one
//! request; chunking is up to the caller.

use crate::client::{DocumentRef, SearchEngine};
use crate::error::{EsgenError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub type BulkTarget = DocumentRef;

#[derive(Debug, Clone, PartialEq)]
pub struct IndexOp {
    pub target: BulkTarget,
    pub doc: Value,
}

/// Exactly one of a partial document or a script.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateBody {
    Doc { doc: Value, doc_as_upsert: bool },
    Script { script: Value, upsert: Option<Value> },
}

impl UpdateBody {
    pub fn to_json(&self) -> Value {
        match self {
            UpdateBody::Doc { doc, doc_as_upsert } => {
                let mut body = Map::new();
                body.insert("doc".into(), doc.clone());
                if *doc_as_upsert {
                    body.insert("doc_as_upsert".into(), Value::Bool(true));
                }
                Value::Object(body)
            }
            UpdateBody::Script { script, upsert } => {
                let mut body = Map::new();
                body.insert("script".into(), script.clone());
                if let Some(upsert) = upsert {
                    body.insert("upsert".into(), upsert.clone());
                }
                Value::Object(body)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOp {
    pub target: BulkTarget,
    pub body: UpdateBody,
    pub retry_on_conflict: u32,
}

impl UpdateOp {
    pub fn builder(target: BulkTarget) -> UpdateOpBuilder {
        UpdateOpBuilder {
            target,
            doc: None,
            doc_as_upsert: false,
            script: None,
            upsert: None,
            retry_on_conflict: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpdateOpBuilder {
    target: BulkTarget,
    doc: Option<Value>,
    doc_as_upsert: bool,
    script: Option<Value>,
    upsert: Option<Value>,
    retry_on_conflict: u32,
}

impl UpdateOpBuilder {
    pub fn doc(mut self, doc: Value) -> Self {
        self.doc = Some(doc);
        self
    }

    pub fn doc_as_upsert(mut self, enabled: bool) -> Self {
        self.doc_as_upsert = enabled;
        self
    }

    pub fn script(mut self, script: Value) -> Self {
        self.script = Some(script);
        self
    }

    pub fn upsert(mut self, upsert: Value) -> Self {
        self.upsert = Some(upsert);
        self
    }

    pub fn retry_on_conflict(mut self, retries: u32) -> Self {
        self.retry_on_conflict = retries;
        self
    }

    pub fn build(self) -> Result<UpdateOp> {
        self.target.validate()?;
        let body = match (self.doc, self.script) {
            (Some(doc), None) => UpdateBody::Doc {
                doc,
                doc_as_upsert: self.doc_as_upsert,
            },
            (None, Some(script)) => UpdateBody::Script {
                script,
                upsert: self.upsert,
            },
            (Some(_), Some(_)) => {
                return Err(EsgenError::MutuallyExclusive(format!(
                    "{}/{}/{} has both",
                    self.target.index, self.target.doc_type, self.target.id
                )))
            }
            (None, None) => {
                return Err(EsgenError::MutuallyExclusive(format!(
                    "{}/{}/{} has neither",
                    self.target.index, self.target.doc_type, self.target.id
                )))
            }
        };
        Ok(UpdateOp {
            target: self.target,
            body,
            retry_on_conflict: self.retry_on_conflict,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOp {
    pub target: BulkTarget,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BulkOperation {
    Index(IndexOp),
    Update(UpdateOp),
    Delete(DeleteOp),
}

impl BulkOperation {
    pub fn index(target: BulkTarget, doc: Value) -> Result<Self> {
        target.validate()?;
        Ok(BulkOperation::Index(IndexOp { target, doc }))
    }

    pub fn update(op: UpdateOp) -> Self {
        BulkOperation::Update(op)
    }

    pub fn delete(target: BulkTarget) -> Result<Self> {
        target.validate()?;
        Ok(BulkOperation::Delete(DeleteOp { target }))
    }

    pub fn target(&self) -> &BulkTarget {
        match self {
            BulkOperation::Index(op) => &op.target,
            BulkOperation::Update(op) => &op.target,
            BulkOperation::Delete(op) => &op.target,
        }
    }

    /// Action line plus payload line, or just the action line for deletes.
    ///
    /// With `legacy_delete` a delete is written as a bare `index` action, the
    /// form older deployments expect.
    pub fn lines(&self, legacy_delete: bool) -> Vec<Value> {
        match self {
            BulkOperation::Index(op) => {
                vec![action_line("index", &op.target, None), op.doc.clone()]
            }
            BulkOperation::Update(op) => vec![
                action_line("update", &op.target, Some(op.retry_on_conflict)),
                op.body.to_json(),
            ],
            BulkOperation::Delete(op) => {
                let action = if legacy_delete { "index" } else { "delete" };
                vec![action_line(action, &op.target, None)]
            }
        }
    }
}

fn action_line(action: &str, target: &BulkTarget, retry_on_conflict: Option<u32>) -> Value {
    let mut meta = Map::new();
    meta.insert("_index".into(), Value::String(target.index.clone()));
    meta.insert("_type".into(), Value::String(target.doc_type.clone()));
    meta.insert("_id".into(), Value::String(target.id.clone()));
    if let Some(parent) = &target.parent {
        meta.insert("parent".into(), Value::String(parent.clone()));
    }
    if let Some(retries) = retry_on_conflict {
        meta.insert("_retry_on_conflict".into(), json!(retries));
    }
    let mut line = Map::new();
    line.insert(action.to_string(), Value::Object(meta));
    Value::Object(line)
}

/// Either pre-built NDJSON lines or typed operations, fixed when the body is
/// made.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkBody {
    Raw(Vec<Value>),
    Operations(Vec<BulkOperation>),
}

impl BulkBody {
    pub fn is_empty(&self) -> bool {
        match self {
            BulkBody::Raw(lines) => lines.is_empty(),
            BulkBody::Operations(ops) => ops.is_empty(),
        }
    }

    pub fn to_ndjson(&self, legacy_delete: bool) -> Result<String> {
        let mut out = String::new();
        let mut push = |line: &Value| -> Result<()> {
            out.push_str(&serde_json::to_string(line)?);
            out.push('\n');
            Ok(())
        };
        match self {
            BulkBody::Raw(lines) => lines.iter().try_for_each(&mut push)?,
            BulkBody::Operations(ops) => {
                for op in ops {
                    op.lines(legacy_delete).iter().try_for_each(&mut push)?;
                }
            }
        }
        Ok(out)
    }
}

/// The engine's reply, per-item results untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<Value>,
}

impl BulkResponse {
    /// Items whose result carries an error or a non-2xx status.
    pub fn failed_items(&self) -> Vec<&Value> {
        self.items
            .iter()
            .filter(|item| {
                item.as_object()
                    .and_then(|o| o.values().next())
                    .map(|result| {
                        result.get("error").is_some()
                            || result
                                .get("status")
                                .and_then(Value::as_u64)
                                .is_some_and(|s| !(200..300).contains(&s))
                    })
                    .unwrap_or(false)
            })
            .collect()
    }
}

pub struct BulkWriter<E: SearchEngine> {
    engine: Arc<E>,
    legacy_delete_action: bool,
}

impl<E: SearchEngine> BulkWriter<E> {
    pub fn new(engine: Arc<E>) -> Self {
        BulkWriter {
            engine,
            legacy_delete_action: false,
        }
    }

    pub fn legacy_delete_action(mut self, enabled: bool) -> Self {
        self.legacy_delete_action = enabled;
        self
    }

    pub async fn write(&self, operations: Vec<BulkOperation>) -> Result<BulkResponse> {
        self.submit(BulkBody::Operations(operations)).await
    }

    /// Issue one `_bulk` request. An empty body makes no request.
    pub async fn submit(&self, body: BulkBody) -> Result<BulkResponse> {
        if body.is_empty() {
            tracing::debug!("[bulk] nothing to write");
            return Ok(BulkResponse::default());
        }

        let ndjson = body.to_ndjson(self.legacy_delete_action)?;
        let response = self.engine.bulk(ndjson).await?;

        let failed = response.failed_items().len();
        if failed > 0 {
            tracing::warn!(
                "[bulk] {} of {} items failed",
                failed,
                response.items.len()
            );
        } else {
            tracing::debug!(
                "[bulk] wrote {} items in {}ms",
                response.items.len(),
                response.took
            );
        }
        Ok(response)
    }
}
