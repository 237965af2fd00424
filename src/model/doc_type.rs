use super::field::{fields_from_wire, fields_to_json, Field};
use crate::error::{EsgenError, Result};
use crate::version::EngineVersion;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How the engine treats fields that are not declared in the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DynamicMode {
    /// Unknown fields are added to the mapping.
    Full,
    /// Unknown fields are stored but not indexed.
    #[default]
    None,
    /// Unknown fields are rejected.
    Strict,
}

impl DynamicMode {
    pub fn to_wire(self) -> Value {
        match self {
            DynamicMode::Full => Value::Bool(true),
            DynamicMode::None => Value::Bool(false),
            DynamicMode::Strict => Value::String("strict".into()),
        }
    }

    pub fn from_wire(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(true) => Some(DynamicMode::Full),
            Value::Bool(false) => Some(DynamicMode::None),
            Value::String(s) => match s.as_str() {
                "strict" => Some(DynamicMode::Strict),
                "true" => Some(DynamicMode::Full),
                "false" => Some(DynamicMode::None),
                _ => None,
            },
            _ => None,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentType {
    pub name: String,
    pub fields: Vec<Field>,
    #[serde(default)]
    pub dynamic: DynamicMode,
    /// Enables the `_all` catch-all field.
    #[serde(default)]
    pub all_enabled: bool,
    /// Default `include_in_all` for the type's fields.
    #[serde(default)]
    pub include_in_all: bool,
    #[serde(default = "default_true")]
    pub source_enabled: bool,
    /// Parent type, for parent/child documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl DocumentType {
    pub fn new(name: impl Into<String>) -> Self {
        DocumentType {
            name: name.into(),
            fields: Vec::new(),
            dynamic: DynamicMode::default(),
            all_enabled: false,
            include_in_all: false,
            source_enabled: true,
            parent: None,
        }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn dynamic(mut self, mode: DynamicMode) -> Self {
        self.dynamic = mode;
        self
    }

    pub fn all_enabled(mut self, enabled: bool) -> Self {
        self.all_enabled = enabled;
        self
    }

    pub fn include_in_all(mut self, enabled: bool) -> Self {
        self.include_in_all = enabled;
        self
    }

    pub fn source_enabled(mut self, enabled: bool) -> Self {
        self.source_enabled = enabled;
        self
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(EsgenError::incomplete("document type: missing name"));
        }
        if self.fields.is_empty() {
            return Err(EsgenError::incomplete(format!(
                "document type '{}': no fields",
                self.name
            )));
        }
        for field in &self.fields {
            field.validate().map_err(|e| {
                EsgenError::incomplete(format!("document type '{}': {}", self.name, e))
            })?;
        }
        Ok(())
    }

    pub fn definition(&self, version: EngineVersion) -> Value {
        let mut inner = Map::new();
        inner.insert("dynamic".into(), self.dynamic.to_wire());
        inner.insert("properties".into(), fields_to_json(&self.fields, version));
        inner.insert("include_in_all".into(), Value::Bool(self.include_in_all));
        inner.insert(
            "_all".into(),
            serde_json::json!({ "enabled": self.all_enabled }),
        );
        inner.insert(
            "_source".into(),
            serde_json::json!({ "enabled": self.source_enabled }),
        );
        if let Some(parent) = &self.parent {
            inner.insert("_parent".into(), serde_json::json!({ "type": parent }));
        }
        Value::Object(inner)
    }

    pub fn to_json(&self, version: EngineVersion) -> Value {
        let mut json = Map::new();
        json.insert(self.name.clone(), self.definition(version));
        Value::Object(json)
    }

    pub fn from_wire(name: &str, data: &Value) -> DocumentType {
        let mut doc_type = DocumentType::new(name);
        if let Some(props) = data.get("properties").and_then(Value::as_object) {
            doc_type.fields = fields_from_wire(props, false);
        }
        if let Some(mode) = data.get("dynamic").and_then(DynamicMode::from_wire) {
            doc_type.dynamic = mode;
        }
        if let Some(enabled) = data.pointer("/_all/enabled").and_then(Value::as_bool) {
            doc_type.all_enabled = enabled;
        }
        if let Some(enabled) = data.pointer("/_source/enabled").and_then(Value::as_bool) {
            doc_type.source_enabled = enabled;
        }
        if let Some(include) = data.get("include_in_all").and_then(Value::as_bool) {
            doc_type.include_in_all = include;
        }
        if let Some(parent) = data.pointer("/_parent/type").and_then(Value::as_str) {
            doc_type.parent = Some(parent.to_string());
        }
        doc_type
    }
}
