use super::analysis::Analyzer;
use super::mapping::Mapping;
use crate::error::{EsgenError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const DEFAULT_SHARDS: u32 = 5;
pub const DEFAULT_REPLICAS: u32 = 1;

fn default_shards() -> u32 {
    DEFAULT_SHARDS
}

fn default_replicas() -> u32 {
    DEFAULT_REPLICAS
}

pub fn default_scroll_query() -> Value {
    json!({ "query": { "match_all": {} } })
}

/// One index generation: shape, aliases and the query used to read it back
/// out when reindexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub name: String,
    /// Fixed at creation.
    #[serde(default = "default_shards")]
    pub shards: u32,
    #[serde(default = "default_replicas")]
    pub replicas: u32,
    /// Alias writers target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_alias: Option<String>,
    /// Alias readers target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_alias: Option<String>,
    #[serde(default)]
    pub mapping: Mapping,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub analyzers: Vec<Analyzer>,
    #[serde(default = "default_scroll_query")]
    pub reindex_scroll_query: Value,
}

impl IndexDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        IndexDescriptor {
            name: name.into(),
            shards: DEFAULT_SHARDS,
            replicas: DEFAULT_REPLICAS,
            index_alias: None,
            search_alias: None,
            mapping: Mapping::default(),
            analyzers: Vec::new(),
            reindex_scroll_query: default_scroll_query(),
        }
    }

    pub fn shards(mut self, shards: u32) -> Self {
        self.shards = shards;
        self
    }

    pub fn replicas(mut self, replicas: u32) -> Self {
        self.replicas = replicas;
        self
    }

    pub fn index_alias(mut self, alias: impl Into<String>) -> Self {
        self.index_alias = Some(alias.into());
        self
    }

    pub fn search_alias(mut self, alias: impl Into<String>) -> Self {
        self.search_alias = Some(alias.into());
        self
    }

    pub fn mapping(mut self, mapping: Mapping) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn analyzers(mut self, analyzers: Vec<Analyzer>) -> Self {
        self.analyzers = analyzers;
        self
    }

    pub fn add_analyzers(mut self, analyzers: impl IntoIterator<Item = Analyzer>) -> Self {
        self.analyzers.extend(analyzers);
        self
    }

    pub fn reindex_scroll_query(mut self, query: Value) -> Self {
        self.reindex_scroll_query = query;
        self
    }

    /// Both aliases, skipping unset or empty ones.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.index_alias
            .iter()
            .chain(self.search_alias.iter())
            .map(String::as_str)
            .filter(|a| !a.is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(EsgenError::incomplete("index descriptor: missing name"));
        }
        self.mapping
            .validate()
            .map_err(|e| EsgenError::incomplete(format!("index '{}': {}", self.name, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::doc_type::DocumentType;
    use crate::model::field::{Field, FieldType};

    #[test]
    fn test_defaults() {
        let index = IndexDescriptor::new("blog_v1");
        assert_eq!(index.shards, 5);
        assert_eq!(index.replicas, 1);
        assert_eq!(
            index.reindex_scroll_query,
            json!({"query": {"match_all": {}}})
        );
    }

    #[test]
    fn test_validate_requires_mapping() {
        let index = IndexDescriptor::new("blog_v1");
        assert!(matches!(index.validate(), Err(EsgenError::Incomplete(_))));

        let index = index.mapping(Mapping::new(vec![
            DocumentType::new("post").field(Field::new("title", FieldType::Text))
        ]));
        assert!(index.validate().is_ok());
    }

    #[test]
    fn test_aliases_skip_empty() {
        let index = IndexDescriptor::new("blog_v1")
            .index_alias("")
            .search_alias("blog");
        assert_eq!(index.aliases().collect::<Vec<_>>(), vec!["blog"]);
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let index: IndexDescriptor = serde_json::from_value(json!({
            "name": "blog_v2",
            "search_alias": "blog",
            "mapping": {"types": [{"name": "post", "fields": [{"name": "title", "type": "text"}]}]}
        }))
        .unwrap();
        assert_eq!(index.shards, 5);
        assert_eq!(index.mapping.types[0].fields[0].field_type, Some(FieldType::Text));
        assert!(index.mapping.types[0].source_enabled);
        assert!(index.validate().is_ok());
    }
}
