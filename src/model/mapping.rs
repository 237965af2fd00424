use super::doc_type::DocumentType;
use crate::error::{EsgenError, Result};
use crate::version::EngineVersion;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The document types registered on one index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Mapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(default)]
    pub types: Vec<DocumentType>,
}

impl Mapping {
    pub fn new(types: Vec<DocumentType>) -> Self {
        Mapping { index: None, types }
    }

    pub fn validate(&self) -> Result<()> {
        if self.types.is_empty() {
            return Err(EsgenError::incomplete("mapping: no document types"));
        }
        self.types.iter().try_for_each(DocumentType::validate)
    }

    pub fn type_names(&self) -> Vec<&str> {
        self.types.iter().map(|t| t.name.as_str()).collect()
    }

    /// `{type_name: {...}, ...}` for every valid type.
    pub fn to_json(&self, version: EngineVersion) -> Value {
        let mut merged = Map::new();
        for doc_type in self.types.iter().filter(|t| t.validate().is_ok()) {
            merged.insert(doc_type.name.clone(), doc_type.definition(version));
        }
        Value::Object(merged)
    }

    /// Parse the `mappings` object of one index. Types that do not validate
    /// are dropped.
    pub fn from_wire(index: &str, mappings: &Value) -> Mapping {
        let types = mappings
            .as_object()
            .map(|types| {
                types
                    .iter()
                    .map(|(name, data)| DocumentType::from_wire(name, data))
                    .filter(|t| t.validate().is_ok())
                    .collect()
            })
            .unwrap_or_default();

        Mapping {
            index: Some(index.to_string()),
            types,
        }
    }
}
