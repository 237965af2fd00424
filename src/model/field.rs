use crate::error::{EsgenError, Result};
use crate::version::EngineVersion;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Boolean,
    Date,
    Double,
    Integer,
    Long,
    Text,
    Keyword,
    Object,
    Nested,
    Completion,
}

impl FieldType {
    /// Parse a wire type name. The legacy `string` type reads back as text.
    pub fn from_wire(name: &str) -> Option<Self> {
        let field_type = match name {
            "boolean" => FieldType::Boolean,
            "date" => FieldType::Date,
            "double" => FieldType::Double,
            "integer" => FieldType::Integer,
            "long" => FieldType::Long,
            "text" | "string" => FieldType::Text,
            "keyword" => FieldType::Keyword,
            "object" => FieldType::Object,
            "nested" => FieldType::Nested,
            "completion" => FieldType::Completion,
            _ => return None,
        };
        Some(field_type)
    }

    pub fn is_analyzable(self) -> bool {
        self == FieldType::Text
    }

    pub fn is_completion(self) -> bool {
        self == FieldType::Completion
    }

    /// Object and nested fields hold their children under `properties`.
    pub fn has_properties(self) -> bool {
        matches!(self, FieldType::Object | FieldType::Nested)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexMode {
    Analyzed,
    #[default]
    NotAnalyzed,
    /// Not indexed at all. Only meaningful on the legacy protocol.
    No,
}

impl IndexMode {
    fn from_wire(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(true) => Some(IndexMode::Analyzed),
            Value::Bool(false) => Some(IndexMode::NotAnalyzed),
            Value::String(s) => match s.as_str() {
                "analyzed" | "true" => Some(IndexMode::Analyzed),
                "not_analyzed" | "false" => Some(IndexMode::NotAnalyzed),
                "no" => Some(IndexMode::No),
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
pub struct Field {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: Option<FieldType>,
    #[serde(default)]
    pub index_mode: IndexMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_analyzer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_analyzer: Option<String>,
    #[serde(default = "default_true")]
    pub include_in_all: bool,
    /// A multi-field lives inside another field and does not carry
    /// `include_in_all`.
    #[serde(default)]
    pub multifield: bool,
    #[serde(default = "default_true")]
    pub preserve_separators: bool,
    #[serde(default = "default_true")]
    pub preserve_position_increments: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
}

impl Default for Field {
    fn default() -> Self {
        Field {
            name: String::new(),
            field_type: None,
            index_mode: IndexMode::default(),
            index_analyzer: None,
            search_analyzer: None,
            include_in_all: true,
            multifield: false,
            preserve_separators: true,
            preserve_position_increments: true,
            fields: Vec::new(),
        }
    }
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Field {
            name: name.into(),
            field_type: Some(field_type),
            ..Default::default()
        }
    }

    pub fn index_mode(mut self, mode: IndexMode) -> Self {
        self.index_mode = mode;
        self
    }

    pub fn analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.index_analyzer = Some(analyzer.into());
        self
    }

    pub fn search_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.search_analyzer = Some(analyzer.into());
        self
    }

    pub fn include_in_all(mut self, enabled: bool) -> Self {
        self.include_in_all = enabled;
        self
    }

    pub fn multifield(mut self, multifield: bool) -> Self {
        self.multifield = multifield;
        self
    }

    pub fn preserve_separators(mut self, enabled: bool) -> Self {
        self.preserve_separators = enabled;
        self
    }

    pub fn preserve_position_increments(mut self, enabled: bool) -> Self {
        self.preserve_position_increments = enabled;
        self
    }

    /// Add a sub-field. Invalid sub-fields are ignored.
    pub fn sub_field(mut self, field: Field) -> Self {
        if field.validate().is_ok() {
            self.fields.push(field);
        }
        self
    }

    pub fn sub_fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(EsgenError::incomplete("field: missing name"));
        }
        if self.field_type.is_none() {
            return Err(EsgenError::incomplete(format!(
                "field '{}': missing type",
                self.name
            )));
        }
        Ok(())
    }

    pub fn definition(&self, version: EngineVersion) -> Value {
        let mut inner = Map::new();

        if !self.multifield {
            inner.insert("include_in_all".into(), Value::Bool(self.include_in_all));
        }

        let Some(field_type) = self.field_type else {
            return Value::Object(inner);
        };

        inner.insert(
            "type".into(),
            Value::String(version.field_type_name(field_type).into()),
        );

        if field_type.is_analyzable() {
            inner.insert("index".into(), version.index_mode_value(self.index_mode));
            if let Some(analyzer) = &self.index_analyzer {
                inner.insert("analyzer".into(), Value::String(analyzer.clone()));
            }
            if let Some(analyzer) = &self.search_analyzer {
                inner.insert("search_analyzer".into(), Value::String(analyzer.clone()));
            }
        } else if field_type == FieldType::Keyword && version.is_legacy() {
            // keyword collapses to string on 2.x and must stay unanalyzed
            inner.insert(
                "index".into(),
                version.index_mode_value(IndexMode::NotAnalyzed),
            );
        } else if field_type.is_completion() {
            inner.insert(
                "preserve_separators".into(),
                Value::Bool(self.preserve_separators),
            );
            inner.insert(
                "preserve_position_increments".into(),
                Value::Bool(self.preserve_position_increments),
            );
        }

        if !self.fields.is_empty() {
            let children = fields_to_json(&self.fields, version);
            let key = if field_type.has_properties() {
                "properties"
            } else {
                "fields"
            };
            inner.insert(key.into(), children);
        }

        Value::Object(inner)
    }

    pub fn to_json(&self, version: EngineVersion) -> Value {
        let mut json = Map::new();
        json.insert(self.name.clone(), self.definition(version));
        Value::Object(json)
    }

    /// Rebuild a field from the engine's mapping output.
    ///
    /// Object fields are often returned without a `type`; a `properties`
    /// block implies one.
    pub fn from_wire(name: &str, data: &Value) -> Field {
        let mut field = Field {
            name: name.to_string(),
            ..Default::default()
        };

        field.field_type = data
            .get("type")
            .and_then(Value::as_str)
            .and_then(FieldType::from_wire)
            .or_else(|| data.get("properties").map(|_| FieldType::Object));

        if let Some(mode) = data.get("index").and_then(IndexMode::from_wire) {
            field.index_mode = mode;
        }
        if let Some(analyzer) = data.get("analyzer").and_then(Value::as_str) {
            field.index_analyzer = Some(analyzer.to_string());
        }
        if let Some(analyzer) = data.get("search_analyzer").and_then(Value::as_str) {
            field.search_analyzer = Some(analyzer.to_string());
        }
        if let Some(include) = data.get("include_in_all").and_then(Value::as_bool) {
            field.include_in_all = include;
        }
        if let Some(v) = data.get("preserve_separators").and_then(Value::as_bool) {
            field.preserve_separators = v;
        }
        if let Some(v) = data
            .get("preserve_position_increments")
            .and_then(Value::as_bool)
        {
            field.preserve_position_increments = v;
        }

        if let Some(props) = data.get("properties").and_then(Value::as_object) {
            field.fields = fields_from_wire(props, false);
        } else if let Some(multi) = data.get("fields").and_then(Value::as_object) {
            field.fields = fields_from_wire(multi, true);
        }

        field
    }
}

/// Merge the definitions of all valid fields into one object keyed by name.
pub fn fields_to_json(fields: &[Field], version: EngineVersion) -> Value {
    let mut merged = Map::new();
    for field in fields.iter().filter(|f| f.validate().is_ok()) {
        merged.insert(field.name.clone(), field.definition(version));
    }
    Value::Object(merged)
}

pub(crate) fn fields_from_wire(props: &Map<String, Value>, multifield: bool) -> Vec<Field> {
    props
        .iter()
        .map(|(name, data)| Field::from_wire(name, data).multifield(multifield))
        .filter(|f| f.validate().is_ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_field_v5() {
        let field = Field::new("title", FieldType::Text)
            .index_mode(IndexMode::Analyzed)
            .analyzer("en_us-index-standard")
            .search_analyzer("en_us-search-standard");

        assert_eq!(
            field.to_json(EngineVersion::V5),
            json!({"title": {
                "include_in_all": true,
                "type": "text",
                "index": true,
                "analyzer": "en_us-index-standard",
                "search_analyzer": "en_us-search-standard"
            }})
        );
    }

    #[test]
    fn test_text_field_v2_uses_legacy_values() {
        let json = Field::new("title", FieldType::Text)
            .index_mode(IndexMode::Analyzed)
            .definition(EngineVersion::V2);
        assert_eq!(json["type"], "string");
        assert_eq!(json["index"], "analyzed");

        let json = Field::new("tag", FieldType::Keyword).definition(EngineVersion::V2);
        assert_eq!(json["type"], "string");
        assert_eq!(json["index"], "not_analyzed");
    }

    #[test]
    fn test_non_analyzable_field_has_no_index_mode() {
        let json = Field::new("count", FieldType::Long).definition(EngineVersion::V5);
        assert_eq!(json, json!({"include_in_all": true, "type": "long"}));

        let json = Field::new("tag", FieldType::Keyword).definition(EngineVersion::V5);
        assert!(json.get("index").is_none());
    }

    #[test]
    fn test_completion_field() {
        let json = Field::new("suggest", FieldType::Completion)
            .preserve_separators(false)
            .definition(EngineVersion::V5);
        assert_eq!(json["preserve_separators"], false);
        assert_eq!(json["preserve_position_increments"], true);
        assert!(json.get("index").is_none());
    }

    #[test]
    fn test_multifield_omits_include_in_all() {
        let field = Field::new("name", FieldType::Text)
            .sub_field(Field::new("keyword", FieldType::Keyword).multifield(true));
        let json = field.definition(EngineVersion::V5);
        assert_eq!(json["fields"], json!({"keyword": {"type": "keyword"}}));
    }

    #[test]
    fn test_nested_children_under_properties() {
        let field = Field::new("author", FieldType::Nested)
            .sub_field(Field::new("first", FieldType::Text))
            .sub_field(Field::new("last", FieldType::Text));
        let json = field.definition(EngineVersion::V5);
        assert!(json.get("fields").is_none());
        assert_eq!(json["properties"].as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_sub_fields_dropped() {
        let invalid = Field {
            name: "broken".into(),
            ..Default::default()
        };
        let field = Field::new("name", FieldType::Text).sub_fields(vec![
            invalid.clone(),
            Field::new("raw", FieldType::Keyword).multifield(true),
        ]);
        let json = field.definition(EngineVersion::V5);
        assert!(json["fields"].get("broken").is_none());
        assert!(json["fields"].get("raw").is_some());

        let field = Field::new("name", FieldType::Text).sub_field(invalid);
        assert!(field.fields.is_empty());
    }

    #[test]
    fn test_validate() {
        assert!(Field::new("a", FieldType::Date).validate().is_ok());
        let missing_type = Field {
            name: "a".into(),
            ..Default::default()
        };
        assert!(matches!(
            missing_type.validate(),
            Err(EsgenError::Incomplete(_))
        ));
        assert!(Field::new("", FieldType::Date).validate().is_err());
    }

    #[test]
    fn test_from_wire() {
        let data = json!({
            "type": "string",
            "index": "analyzed",
            "analyzer": "icu-analyzer",
            "include_in_all": false,
            "fields": {"keyword": {"type": "keyword"}}
        });
        let field = Field::from_wire("title", &data);
        assert_eq!(field.field_type, Some(FieldType::Text));
        assert_eq!(field.index_mode, IndexMode::Analyzed);
        assert_eq!(field.index_analyzer.as_deref(), Some("icu-analyzer"));
        assert!(!field.include_in_all);
        assert_eq!(field.fields.len(), 1);
        assert!(field.fields[0].multifield);
    }

    #[test]
    fn test_from_wire_object_without_type() {
        let data = json!({"properties": {"city": {"type": "keyword"}}});
        let field = Field::from_wire("address", &data);
        assert_eq!(field.field_type, Some(FieldType::Object));
        assert_eq!(field.fields[0].name, "city");
    }
}
