//! Text analysis components: analyzers and the tokenizers, token filters
//! and char filters they are assembled from.

use crate::error::{EsgenError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Category of an analysis component, with the key it is registered under
/// in `settings.analysis`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Analyzer,
    Tokenizer,
    TokenFilter,
    CharFilter,
}

impl ComponentKind {
    pub fn registry_key(self) -> &'static str {
        match self {
            ComponentKind::Analyzer => "analyzer",
            ComponentKind::Tokenizer => "tokenizer",
            ComponentKind::TokenFilter => "filter",
            ComponentKind::CharFilter => "char_filter",
        }
    }
}

/// A named tokenizer, token filter or char filter.
///
/// A component whose name equals its type is one of the engine's built-ins
/// and is referenced by name only.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    #[serde(rename = "type")]
    pub kind_type: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub settings: Map<String, Value>,
}

pub type Tokenizer = Component;
pub type TokenFilter = Component;
pub type CharFilter = Component;

impl Component {
    pub fn new(name: impl Into<String>, kind_type: impl Into<String>) -> Self {
        Component {
            name: name.into(),
            kind_type: kind_type.into(),
            settings: Map::new(),
        }
    }

    /// A built-in component: name and type are the same.
    pub fn builtin(name: &str) -> Self {
        Component::new(name, name)
    }

    pub fn setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn requires_separate_registry(&self) -> bool {
        self.name != self.kind_type
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(EsgenError::incomplete("analysis component: missing name"));
        }
        if self.kind_type.is_empty() {
            return Err(EsgenError::incomplete(format!(
                "analysis component '{}': missing type",
                self.name
            )));
        }
        Ok(())
    }

    /// Body registered under the component's name: `{type, ...settings}`.
    pub fn definition(&self) -> Value {
        let mut inner = Map::new();
        inner.insert("type".into(), Value::String(self.kind_type.clone()));
        for (k, v) in &self.settings {
            inner.insert(k.clone(), v.clone());
        }
        Value::Object(inner)
    }

    pub fn to_json(&self) -> Value {
        let mut json = Map::new();
        json.insert(self.name.clone(), self.definition());
        Value::Object(json)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Analyzer {
    pub name: String,
    /// May be empty when the engine infers the type from the tokenizer.
    #[serde(rename = "type", default)]
    pub analyzer_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer: Option<Tokenizer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<TokenFilter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub char_filters: Vec<CharFilter>,
}

impl Analyzer {
    pub const CUSTOM: &'static str = "custom";
    pub const ICU_ANALYZER: &'static str = "icu-analyzer";

    pub fn new(name: impl Into<String>) -> Self {
        Analyzer {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn builtin(name: &str) -> Self {
        Analyzer::new(name).analyzer_type(name)
    }

    pub fn standard() -> Self {
        Analyzer::builtin("standard")
    }

    pub fn simple() -> Self {
        Analyzer::builtin("simple")
    }

    /// `icu-analyzer`: ICU tokenization followed by ICU case folding.
    pub fn icu() -> Self {
        Analyzer::new(Self::ICU_ANALYZER)
            .tokenizer(crate::model::presets::tokenizers::icu())
            .filters(vec![crate::model::presets::token_filters::icu_folding()])
    }

    /// Copy the pipeline of `other` under a new name.
    pub fn renamed(name: impl Into<String>, other: &Analyzer) -> Self {
        Analyzer {
            name: name.into(),
            ..other.clone()
        }
    }

    pub fn analyzer_type(mut self, analyzer_type: impl Into<String>) -> Self {
        self.analyzer_type = analyzer_type.into();
        self
    }

    pub fn tokenizer(mut self, tokenizer: Tokenizer) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    pub fn filters(mut self, filters: Vec<TokenFilter>) -> Self {
        self.filters = filters;
        self
    }

    pub fn char_filters(mut self, char_filters: Vec<CharFilter>) -> Self {
        self.char_filters = char_filters;
        self
    }

    pub fn requires_separate_registry(&self) -> bool {
        self.name != self.analyzer_type
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(EsgenError::incomplete("analyzer: missing name"));
        }
        Ok(())
    }

    /// Body registered under the analyzer's name. Components are referenced
    /// by name; their own definitions live in their categories.
    pub fn definition(&self) -> Value {
        let mut inner = Map::new();
        if !self.analyzer_type.is_empty() {
            inner.insert("type".into(), Value::String(self.analyzer_type.clone()));
        }
        if let Some(tokenizer) = &self.tokenizer {
            inner.insert("tokenizer".into(), Value::String(tokenizer.name.clone()));
        }
        if !self.filters.is_empty() {
            inner.insert("filter".into(), names(&self.filters));
        }
        if !self.char_filters.is_empty() {
            inner.insert("char_filter".into(), names(&self.char_filters));
        }
        Value::Object(inner)
    }

    pub fn to_json(&self) -> Value {
        let mut json = Map::new();
        json.insert(self.name.clone(), self.definition());
        Value::Object(json)
    }

    /// Components this analyzer references, tagged with their category.
    pub fn components(&self) -> impl Iterator<Item = (ComponentKind, &Component)> {
        self.tokenizer
            .iter()
            .map(|t| (ComponentKind::Tokenizer, t))
            .chain(self.filters.iter().map(|f| (ComponentKind::TokenFilter, f)))
            .chain(
                self.char_filters
                    .iter()
                    .map(|c| (ComponentKind::CharFilter, c)),
            )
    }
}

fn names(components: &[Component]) -> Value {
    Value::Array(
        components
            .iter()
            .map(|c| Value::String(c.name.clone()))
            .collect(),
    )
}
