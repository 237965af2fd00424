#![allow(dead_code)]

use dashmap::DashMap;
use esgen::bulk::BulkResponse;
use esgen::client::{AliasAction, DocumentRef, IndexTarget, SearchEngine, SearchRequest};
use esgen::model::SearchResultPage;
use esgen::scroll::ScrollDuration;
use esgen::settings::CreateIndexRequest;
use esgen::{EsgenError, Result};
use http::StatusCode;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDoc {
    pub source: Value,
    pub parent: Option<String>,
}

#[derive(Debug, Default)]
struct FakeIndex {
    aliases: BTreeSet<String>,
    mappings: Value,
    /// Keyed by (type, id).
    docs: BTreeMap<(String, String), StoredDoc>,
}

struct OpenScroll {
    hits: Vec<Value>,
    offset: usize,
}

#[derive(Default)]
struct State {
    indices: BTreeMap<String, FakeIndex>,
    scrolls: HashMap<String, OpenScroll>,
    scroll_counter: usize,
    cleared: Vec<String>,
}

/// In-memory engine. Pages are `page_size` hits; with `rotate_tokens` every
/// scroll response carries a fresh continuation token.
pub struct FakeEngine {
    pub page_size: usize,
    pub rotate_tokens: bool,
    state: Mutex<State>,
    calls: DashMap<&'static str, usize>,
    fail_on: Mutex<Option<&'static str>>,
}

impl FakeEngine {
    pub fn new(page_size: usize) -> Self {
        FakeEngine {
            page_size,
            rotate_tokens: true,
            state: Mutex::new(State::default()),
            calls: DashMap::new(),
            fail_on: Mutex::new(None),
        }
    }

    pub fn fixed_token(mut self) -> Self {
        self.rotate_tokens = false;
        self
    }

    /// Make every call of `operation` fail with a 503.
    pub fn fail_on(&self, operation: &'static str) {
        *self.fail_on.lock().unwrap() = Some(operation);
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls.get(operation).map(|c| *c).unwrap_or(0)
    }

    pub fn cleared_tokens(&self) -> Vec<String> {
        self.state.lock().unwrap().cleared.clone()
    }

    pub fn open_scrolls(&self) -> usize {
        self.state.lock().unwrap().scrolls.len()
    }

    pub fn has_index(&self, index: &str) -> bool {
        self.state.lock().unwrap().indices.contains_key(index)
    }

    pub fn aliases_of(&self, index: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .indices
            .get(index)
            .map(|i| i.aliases.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn indices_with_alias(&self, alias: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .indices
            .iter()
            .filter(|(_, i)| i.aliases.contains(alias))
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn docs(&self, index: &str) -> BTreeMap<(String, String), StoredDoc> {
        self.state
            .lock()
            .unwrap()
            .indices
            .get(index)
            .map(|i| i.docs.clone())
            .unwrap_or_default()
    }

    /// Create an index directly, bypassing the call journal.
    pub fn seed_index(&self, index: &str, aliases: &[&str], mappings: Value) {
        let mut state = self.state.lock().unwrap();
        let entry = state.indices.entry(index.to_string()).or_default();
        entry.aliases = aliases.iter().map(|a| a.to_string()).collect();
        entry.mappings = mappings;
    }

    pub fn seed_doc(&self, index: &str, doc_type: &str, id: &str, source: Value, parent: Option<&str>) {
        let mut state = self.state.lock().unwrap();
        state
            .indices
            .entry(index.to_string())
            .or_default()
            .docs
            .insert(
                (doc_type.to_string(), id.to_string()),
                StoredDoc {
                    source,
                    parent: parent.map(str::to_string),
                },
            );
    }

    fn record(&self, operation: &'static str) -> Result<()> {
        *self.calls.entry(operation).or_insert(0) += 1;
        if *self.fail_on.lock().unwrap() == Some(operation) {
            return Err(EsgenError::Transport {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: format!("{} unavailable", operation),
            });
        }
        Ok(())
    }

    fn next_page(&self, state: &mut State, scroll_no: usize, mut open: OpenScroll) -> Value {
        let end = (open.offset + self.page_size).min(open.hits.len());
        let page: Vec<Value> = open.hits[open.offset..end].to_vec();
        let total = open.hits.len();
        open.offset = end;

        let token = if self.rotate_tokens {
            format!("scroll-{}-{}", scroll_no, end)
        } else {
            format!("scroll-{}", scroll_no)
        };
        state.scrolls.insert(token.clone(), open);
        json!({
            "_scroll_id": token,
            "took": 1,
            "hits": {"total": total, "max_score": 1.0, "hits": page}
        })
    }
}

fn not_found(what: &str) -> EsgenError {
    EsgenError::Transport {
        status: StatusCode::NOT_FOUND,
        body: format!("{{\"error\":\"{} not found\"}}", what),
    }
}

/// Concrete indices behind a list of index or alias names; empty means all.
fn resolve(state: &State, names: &[String]) -> Vec<String> {
    if names.is_empty() || names.iter().any(|n| n == "_all") {
        return state.indices.keys().cloned().collect();
    }
    let mut resolved = Vec::new();
    for name in names {
        if state.indices.contains_key(name) {
            resolved.push(name.clone());
        } else {
            for (index, entry) in &state.indices {
                if entry.aliases.contains(name) && !resolved.contains(index) {
                    resolved.push(index.clone());
                }
            }
        }
    }
    resolved
}

fn hits(state: &State, indices: &[String], types: &[String]) -> Vec<Value> {
    let mut hits = Vec::new();
    for index in resolve(state, indices) {
        let Some(entry) = state.indices.get(&index) else {
            continue;
        };
        for ((doc_type, id), doc) in &entry.docs {
            if !types.is_empty() && !types.contains(doc_type) {
                continue;
            }
            let mut hit = json!({
                "_index": index,
                "_type": doc_type,
                "_id": id,
                "_score": 1.0,
                "_source": doc.source,
            });
            if let Some(parent) = &doc.parent {
                hit["_parent"] = json!(parent);
            }
            hits.push(hit);
        }
    }
    hits
}

fn merge(target: &mut Value, patch: &Value) {
    if let (Value::Object(target), Value::Object(patch)) = (target, patch) {
        for (k, v) in patch {
            target.insert(k.clone(), v.clone());
        }
    }
}

impl SearchEngine for FakeEngine {
    async fn ping(&self) -> Result<bool> {
        self.record("ping")?;
        Ok(true)
    }

    async fn cluster_health(&self) -> Result<Value> {
        self.record("cluster_health")?;
        Ok(json!({"status": "green"}))
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        self.record("index_exists")?;
        Ok(self.state.lock().unwrap().indices.contains_key(index))
    }

    async fn create_index(&self, request: &CreateIndexRequest) -> Result<Value> {
        self.record("create_index")?;
        let mut state = self.state.lock().unwrap();
        if state.indices.contains_key(&request.index) {
            return Err(EsgenError::Transport {
                status: StatusCode::BAD_REQUEST,
                body: "resource_already_exists_exception".into(),
            });
        }
        let aliases = request
            .body
            .get("aliases")
            .and_then(Value::as_object)
            .map(|a| a.keys().cloned().collect())
            .unwrap_or_default();
        state.indices.insert(
            request.index.clone(),
            FakeIndex {
                aliases,
                mappings: request.body.get("mappings").cloned().unwrap_or(json!({})),
                docs: BTreeMap::new(),
            },
        );
        Ok(json!({"acknowledged": true}))
    }

    async fn delete_index(&self, target: &IndexTarget) -> Result<Value> {
        self.record("delete_index")?;
        target.validate()?;
        let mut state = self.state.lock().unwrap();
        match target {
            IndexTarget::All => state.indices.clear(),
            IndexTarget::Named(names) => {
                if let Some(missing) = names.iter().find(|n| !state.indices.contains_key(*n)) {
                    return Err(not_found(missing));
                }
                for name in names {
                    state.indices.remove(name);
                }
            }
        }
        Ok(json!({"acknowledged": true}))
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<Value> {
        self.record("update_aliases")?;
        let mut state = self.state.lock().unwrap();
        if let Some(missing) = actions.iter().find(|a| !state.indices.contains_key(a.index())) {
            return Err(not_found(missing.index()));
        }
        for action in actions {
            let Some(entry) = state.indices.get_mut(action.index()) else {
                continue;
            };
            match action {
                AliasAction::Add { alias, .. } => {
                    entry.aliases.insert(alias.clone());
                }
                AliasAction::Remove { alias, .. } => {
                    entry.aliases.remove(alias);
                }
            }
        }
        Ok(json!({"acknowledged": true}))
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResultPage> {
        self.record("search")?;
        let mut state = self.state.lock().unwrap();
        let all = hits(&state, &request.indices, &request.types);
        if request.scroll.is_none() {
            return Ok(SearchResultPage::from_wire(&json!({
                "took": 1,
                "hits": {"total": all.len(), "max_score": 1.0, "hits": all}
            })));
        }
        state.scroll_counter += 1;
        let scroll_no = state.scroll_counter;
        let raw = self.next_page(&mut state, scroll_no, OpenScroll { hits: all, offset: 0 });
        Ok(SearchResultPage::from_wire(&raw))
    }

    async fn scroll(&self, scroll_id: &str, _keep_alive: &ScrollDuration) -> Result<SearchResultPage> {
        self.record("scroll")?;
        let mut state = self.state.lock().unwrap();
        let Some(open) = state.scrolls.remove(scroll_id) else {
            return Err(not_found(scroll_id));
        };
        let scroll_no = scroll_id
            .split('-')
            .nth(1)
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);
        let raw = self.next_page(&mut state, scroll_no, open);
        Ok(SearchResultPage::from_wire(&raw))
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<()> {
        self.record("clear_scroll")?;
        let mut state = self.state.lock().unwrap();
        state.scrolls.remove(scroll_id);
        state.cleared.push(scroll_id.to_string());
        Ok(())
    }

    async fn bulk(&self, body: String) -> Result<BulkResponse> {
        self.record("bulk")?;
        let mut state = self.state.lock().unwrap();
        let mut lines = body.lines().map(serde_json::from_str::<Value>);
        let mut items = Vec::new();

        while let Some(action) = lines.next() {
            let action = action?;
            let Some((kind, meta)) = action.as_object().and_then(|o| o.iter().next()) else {
                continue;
            };
            let index = meta["_index"].as_str().unwrap_or_default().to_string();
            let doc_type = meta["_type"].as_str().unwrap_or_default().to_string();
            let id = meta["_id"].as_str().unwrap_or_default().to_string();
            let parent = meta.get("parent").and_then(Value::as_str).map(str::to_string);
            let key = (doc_type, id.clone());

            let status = match kind.as_str() {
                "index" => {
                    let source = lines.next().transpose()?.unwrap_or(Value::Null);
                    let entry = state.indices.entry(index).or_default();
                    entry.docs.insert(key, StoredDoc { source, parent });
                    201
                }
                "update" => {
                    let body = lines.next().transpose()?.unwrap_or(Value::Null);
                    match state.indices.get_mut(&index).and_then(|i| i.docs.get_mut(&key)) {
                        Some(doc) => {
                            merge(&mut doc.source, &body["doc"]);
                            200
                        }
                        None => 404,
                    }
                }
                "delete" => match state.indices.get_mut(&index).and_then(|i| i.docs.remove(&key)) {
                    Some(_) => 200,
                    None => 404,
                },
                _ => 400,
            };

            let mut result = json!({"_index": meta["_index"], "_id": id, "status": status});
            if status >= 400 {
                result["error"] = json!({"type": "document_missing_exception"});
            }
            let mut item = Map::new();
            item.insert(kind.clone(), result);
            items.push(Value::Object(item));
        }

        let errors = items
            .iter()
            .any(|i| i.as_object().and_then(|o| o.values().next()).and_then(|r| r.get("error")).is_some());
        Ok(BulkResponse {
            took: 1,
            errors,
            items,
        })
    }

    async fn get_mapping(&self, indices: Option<&[String]>) -> Result<Value> {
        self.record("get_mapping")?;
        let state = self.state.lock().unwrap();
        let mut out = Map::new();
        for index in resolve(&state, indices.unwrap_or(&[])) {
            if let Some(entry) = state.indices.get(&index) {
                out.insert(index.clone(), json!({"mappings": entry.mappings}));
            }
        }
        Ok(Value::Object(out))
    }

    async fn cat_aliases(&self) -> Result<String> {
        self.record("cat_aliases")?;
        let state = self.state.lock().unwrap();
        let mut rows = String::new();
        // indices without an alias are not listed, as on a real engine
        for (index, entry) in &state.indices {
            for alias in &entry.aliases {
                rows.push_str(&format!("{} {}\n", index, alias));
            }
        }
        Ok(rows)
    }

    async fn index_document(&self, doc: &DocumentRef, body: &Value) -> Result<Value> {
        self.record("index_document")?;
        let mut state = self.state.lock().unwrap();
        state.indices.entry(doc.index.clone()).or_default().docs.insert(
            (doc.doc_type.clone(), doc.id.clone()),
            StoredDoc {
                source: body.clone(),
                parent: doc.parent.clone(),
            },
        );
        Ok(json!({"_id": doc.id, "result": "created"}))
    }

    async fn get_document(&self, doc: &DocumentRef) -> Result<Option<Value>> {
        self.record("get_document")?;
        let state = self.state.lock().unwrap();
        let Some(entry) = state.indices.get(&doc.index) else {
            return Ok(None);
        };
        Ok(entry
            .docs
            .get(&(doc.doc_type.clone(), doc.id.clone()))
            .map(|stored| {
                json!({
                    "_index": doc.index,
                    "_type": doc.doc_type,
                    "_id": doc.id,
                    "found": true,
                    "_source": stored.source,
                })
            }))
    }

    async fn update_document(&self, doc: &DocumentRef, body: &Value, _retry_on_conflict: u32) -> Result<Value> {
        self.record("update_document")?;
        let mut state = self.state.lock().unwrap();
        let key = (doc.doc_type.clone(), doc.id.clone());
        let entry = state.indices.entry(doc.index.clone()).or_default();
        if let Some(stored) = entry.docs.get_mut(&key) {
            merge(&mut stored.source, &body["doc"]);
        } else if body["doc_as_upsert"] == json!(true) {
            entry.docs.insert(
                key,
                StoredDoc {
                    source: body["doc"].clone(),
                    parent: doc.parent.clone(),
                },
            );
        } else {
            return Err(not_found(&doc.id));
        }
        Ok(json!({"_id": doc.id, "result": "updated"}))
    }

    async fn delete_document(&self, doc: &DocumentRef) -> Result<Value> {
        self.record("delete_document")?;
        let mut state = self.state.lock().unwrap();
        let removed = state
            .indices
            .get_mut(&doc.index)
            .and_then(|i| i.docs.remove(&(doc.doc_type.clone(), doc.id.clone())));
        match removed {
            Some(_) => Ok(json!({"_id": doc.id, "found": true, "result": "deleted"})),
            None => Err(not_found(&doc.id)),
        }
    }

    async fn delete_by_query(&self, indices: &[String], types: &[String], _query: &Value) -> Result<Value> {
        self.record("delete_by_query")?;
        let mut state = self.state.lock().unwrap();
        let mut deleted = 0;
        for index in resolve(&state, indices) {
            if let Some(entry) = state.indices.get_mut(&index) {
                let before = entry.docs.len();
                entry.docs.retain(|(doc_type, _), _| !types.is_empty() && !types.contains(doc_type));
                deleted += before - entry.docs.len();
            }
        }
        Ok(json!({"deleted": deleted}))
    }
}
