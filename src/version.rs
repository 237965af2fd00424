//! Engine protocol generations.
//!
//! Two protocol generations are supported. They disagree on a handful of
//! mapping values (string vs. text/keyword field types, and the index mode
//! of analyzable fields), so every place that emits one of those values goes
//! through [`EngineVersion`].

use crate::model::field::{FieldType, IndexMode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineVersion {
    /// 2.x: `string` fields, `analyzed` / `not_analyzed` index modes.
    V2,
    /// 5.x and later: `text` / `keyword` fields, boolean index modes.
    #[default]
    V5,
}

impl EngineVersion {
    /// Detect the protocol generation from a version string such as `"2.4.6"`.
    ///
    /// Anything that is not recognisably 2.x is treated as the current
    /// generation.
    pub fn detect(version: &str) -> Self {
        let mut chars = version.trim().chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some('2'), Some(_), Some(c)) if c.is_alphanumeric() || c == '_' => EngineVersion::V2,
            _ => EngineVersion::V5,
        }
    }

    pub fn is_legacy(self) -> bool {
        self == EngineVersion::V2
    }

    /// Wire name of a field type.
    pub fn field_type_name(self, field_type: FieldType) -> &'static str {
        match field_type {
            FieldType::Text if self.is_legacy() => "string",
            FieldType::Keyword if self.is_legacy() => "string",
            FieldType::Text => "text",
            FieldType::Keyword => "keyword",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Double => "double",
            FieldType::Integer => "integer",
            FieldType::Long => "long",
            FieldType::Object => "object",
            FieldType::Nested => "nested",
            FieldType::Completion => "completion",
        }
    }

    /// Wire value of the `index` property of an analyzable field.
    pub fn index_mode_value(self, mode: IndexMode) -> Value {
        match (mode, self.is_legacy()) {
            (IndexMode::Analyzed, true) => Value::String("analyzed".into()),
            (IndexMode::NotAnalyzed, true) => Value::String("not_analyzed".into()),
            (IndexMode::Analyzed, false) => Value::Bool(true),
            (IndexMode::NotAnalyzed, false) => Value::Bool(false),
            (IndexMode::No, _) => Value::String("no".into()),
        }
    }
}
