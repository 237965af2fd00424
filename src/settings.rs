//! Compile an [`IndexDescriptor`] into the engine's index creation document.
//!
//! Built-in analysis components (name == type) are referenced by name only;
//! redeclaring one collides with the engine's reserved name, and omitting a
//! custom one makes creation fail. The analysis block is therefore filtered
//! twice: once over analyzers, once over the components those analyzers
//! reference.

use crate::error::Result;
use crate::model::analysis::{Analyzer, Component, ComponentKind};
use crate::model::IndexDescriptor;
use crate::version::EngineVersion;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Body for `PUT /{index}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateIndexRequest {
    pub index: String,
    pub body: Value,
}

pub fn compile(descriptor: &IndexDescriptor, version: EngineVersion) -> Result<CreateIndexRequest> {
    descriptor.validate()?;

    let mut settings = Map::new();
    settings.insert("number_of_shards".into(), json!(descriptor.shards));
    settings.insert("number_of_replicas".into(), json!(descriptor.replicas));
    if let Some(analysis) = compile_analysis(&descriptor.analyzers) {
        settings.insert("analysis".into(), analysis);
    }

    let mut body = Map::new();
    body.insert("settings".into(), Value::Object(settings));
    body.insert("mappings".into(), descriptor.mapping.to_json(version));

    if let (Some(index_alias), Some(search_alias)) =
        (&descriptor.index_alias, &descriptor.search_alias)
    {
        let mut aliases = Map::new();
        for alias in [index_alias, search_alias] {
            if !alias.is_empty() {
                aliases.insert(alias.clone(), json!({}));
            }
        }
        if !aliases.is_empty() {
            body.insert("aliases".into(), Value::Object(aliases));
        }
    }

    tracing::debug!(
        "[indices] compiled creation document for {} ({} analyzers)",
        descriptor.name,
        descriptor.analyzers.len()
    );

    Ok(CreateIndexRequest {
        index: descriptor.name.clone(),
        body: Value::Object(body),
    })
}

/// The `settings.analysis` block, or `None` when every analyzer is a
/// built-in.
pub fn compile_analysis(analyzers: &[Analyzer]) -> Option<Value> {
    let custom: Vec<&Analyzer> = analyzers
        .iter()
        .filter(|a| a.requires_separate_registry() && a.validate().is_ok())
        .collect();

    if custom.is_empty() {
        return None;
    }

    let mut registry: IndexMap<&'static str, Map<String, Value>> = IndexMap::new();
    for analyzer in &custom {
        registry
            .entry(ComponentKind::Analyzer.registry_key())
            .or_default()
            .insert(analyzer.name.clone(), analyzer.definition());
    }

    for (kind, component) in custom.iter().flat_map(|a| a.components()) {
        if !registers(component) {
            continue;
        }
        registry
            .entry(kind.registry_key())
            .or_default()
            .entry(component.name.clone())
            .or_insert_with(|| component.definition());
    }

    let mut analysis = Map::new();
    for (key, components) in registry {
        analysis.insert(key.to_string(), Value::Object(components));
    }
    Some(Value::Object(analysis))
}

fn registers(component: &Component) -> bool {
    component.requires_separate_registry() && component.validate().is_ok()
}
