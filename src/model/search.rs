use crate::error::{EsgenError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One hit of a search, scroll or get.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchItem {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_type")]
    pub doc_type: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_score")]
    pub score: f64,
    #[serde(rename = "_source")]
    pub source: Value,
    #[serde(rename = "_parent", skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub inner_hits: BTreeMap<String, SearchResultPage>,
}

impl SearchItem {
    /// Parse a raw hit. Hits without a type or id are dropped, as are
    /// top-level hits without an index; inner hits may omit the index.
    pub fn from_wire(hit: &Value, inner: bool) -> Option<SearchItem> {
        let doc_type = hit.get("_type").and_then(Value::as_str)?;
        let id = wire_id(hit.get("_id")?)?;
        let index = match hit.get("_index").and_then(Value::as_str) {
            Some(index) => index.to_string(),
            None if inner => String::new(),
            None => return None,
        };

        let inner_hits = hit
            .get("inner_hits")
            .and_then(Value::as_object)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(_, v)| v.get("hits").is_some())
                    .map(|(k, v)| (k.clone(), SearchResultPage::parse(v, true)))
                    .collect()
            })
            .unwrap_or_default();

        Some(SearchItem {
            index,
            doc_type: doc_type.to_string(),
            id,
            score: hit.get("_score").and_then(Value::as_f64).unwrap_or(0.0),
            source: hit
                .get("_source")
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new())),
            parent: hit.get("_parent").and_then(wire_id),
            inner_hits,
        })
    }

    /// The document body with hit metadata merged in.
    pub fn flattened(&self) -> Value {
        let mut json = Map::new();
        json.insert("_index".into(), Value::String(self.index.clone()));
        json.insert("_type".into(), Value::String(self.doc_type.clone()));
        json.insert("_id".into(), Value::String(self.id.clone()));
        json.insert("_score".into(), serde_json::json!(self.score));
        if let Some(parent) = &self.parent {
            json.insert("_parent".into(), Value::String(parent.clone()));
        }
        if let Value::Object(source) = &self.source {
            for (k, v) in source {
                json.insert(k.clone(), v.clone());
            }
        }
        Value::Object(json)
    }
}

/// Ids and parent ids may come back as numbers.
fn wire_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResultPage {
    pub took: u64,
    pub total: u64,
    pub max_score: f64,
    #[serde(rename = "hits")]
    pub items: Vec<SearchItem>,
    #[serde(default)]
    pub aggregations: Map<String, Value>,
    /// Only present on pages produced through the scroll API.
    #[serde(rename = "_scroll_id", skip_serializing_if = "Option::is_none")]
    pub scroll_id: Option<String>,
}

impl SearchResultPage {
    pub fn from_wire(data: &Value) -> SearchResultPage {
        SearchResultPage::parse(data, false)
    }

    fn parse(data: &Value, inner: bool) -> SearchResultPage {
        let Some(hits) = data.get("hits") else {
            return SearchResultPage::default();
        };

        // `total` is a bare count on older engines and `{value, relation}`
        // on newer ones.
        let total = match hits.get("total") {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
            Some(Value::Object(o)) => o.get("value").and_then(Value::as_u64).unwrap_or(0),
            _ => 0,
        };

        let items = hits
            .get("hits")
            .and_then(Value::as_array)
            .map(|raw| {
                raw.iter()
                    .filter_map(|hit| SearchItem::from_wire(hit, inner))
                    .collect()
            })
            .unwrap_or_default();

        SearchResultPage {
            took: data.get("took").and_then(Value::as_u64).unwrap_or(0),
            total,
            max_score: hits.get("max_score").and_then(Value::as_f64).unwrap_or(0.0),
            items,
            aggregations: data
                .get("aggregations")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
            scroll_id: data
                .get("_scroll_id")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// How multi-valued fields are reduced for sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    Avg,
    Min,
    Max,
    Sum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    #[serde(default)]
    pub order: SortOrder,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<SortMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested_path: Option<String>,
}

impl Sort {
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Sort {
            field: field.into(),
            order,
            mode: None,
            nested_path: None,
        }
    }

    pub fn mode(mut self, mode: SortMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn nested_path(mut self, path: impl Into<String>) -> Self {
        self.nested_path = Some(path.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.field.is_empty() {
            return Err(EsgenError::incomplete("sort: missing field"));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Value {
        let mut inner = Map::new();
        inner.insert("order".into(), serde_json::json!(self.order));
        if let Some(mode) = self.mode {
            inner.insert("mode".into(), serde_json::json!(mode));
        }
        if let Some(path) = &self.nested_path {
            inner.insert("nested_path".into(), Value::String(path.clone()));
        }
        let mut json = Map::new();
        json.insert(self.field.clone(), Value::Object(inner));
        Value::Object(json)
    }
}
