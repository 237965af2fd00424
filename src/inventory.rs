//! Read-only listings of indices, aliases and document types, used to fill in
//! an omitted index or type with "all of them".

use crate::client::SearchEngine;
use crate::error::{EsgenError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One or several names given by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selector {
    One(String),
    Many(Vec<String>),
}

impl Selector {
    pub fn into_names(self) -> Vec<String> {
        match self {
            Selector::One(name) => vec![name],
            Selector::Many(names) => names,
        }
    }

    /// An empty name or empty list means "not given".
    fn specified(selector: Option<Selector>) -> Option<Vec<String>> {
        let names: Vec<String> = selector?
            .into_names()
            .into_iter()
            .filter(|n| !n.is_empty())
            .collect();
        if names.is_empty() {
            None
        } else {
            Some(names)
        }
    }
}

impl From<&str> for Selector {
    fn from(name: &str) -> Self {
        Selector::One(name.to_string())
    }
}

impl From<String> for Selector {
    fn from(name: String) -> Self {
        Selector::One(name)
    }
}

impl From<Vec<String>> for Selector {
    fn from(names: Vec<String>) -> Self {
        Selector::Many(names)
    }
}

pub struct Inventory<E: SearchEngine> {
    engine: Arc<E>,
    max_fan_out: usize,
}

impl<E: SearchEngine> Inventory<E> {
    pub fn new(engine: Arc<E>, max_fan_out: usize) -> Self {
        Inventory {
            engine,
            max_fan_out: max_fan_out.max(1),
        }
    }

    pub fn max_fan_out(&self) -> usize {
        self.max_fan_out
    }

    /// Every aliased index with its aliases, from `_cat/aliases`. The engine
    /// only reports indices that carry at least one alias, so unaliased
    /// indices are absent from the listing.
    pub async fn indices_and_aliases(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let rows = self.engine.cat_aliases().await?;
        let listing = parse_cat_rows(&rows);
        tracing::debug!("[inventory] {} indices listed", listing.len());
        Ok(listing)
    }

    /// Document types registered under `index`.
    pub async fn types(&self, index: &str) -> Result<Vec<String>> {
        let indices = [index.to_string()];
        let raw = self.engine.get_mapping(Some(&indices)).await?;
        Ok(type_names(&raw))
    }

    /// Cross product of the selected indices and types. An omitted index
    /// means every listed index; an omitted type means every type of that
    /// index.
    pub async fn supply_index_and_type(
        &self,
        index: Option<Selector>,
        doc_type: Option<Selector>,
    ) -> Result<Vec<(String, String)>> {
        let indices = match Selector::specified(index) {
            Some(indices) => indices,
            None => self.indices_and_aliases().await?.into_keys().collect(),
        };
        let types = Selector::specified(doc_type);

        if let Some(types) = &types {
            self.check_fan_out(indices.len().saturating_mul(types.len()))?;
        }

        let mut combinations = Vec::new();
        for index in indices {
            let index_types = match &types {
                Some(types) => types.clone(),
                None => self.types(&index).await?,
            };
            for doc_type in index_types {
                combinations.push((index.clone(), doc_type));
            }
            self.check_fan_out(combinations.len())?;
        }

        tracing::debug!(
            "[inventory] expanded to {} index/type combinations",
            combinations.len()
        );
        Ok(combinations)
    }

    fn check_fan_out(&self, requested: usize) -> Result<()> {
        if requested > self.max_fan_out {
            return Err(EsgenError::FanOutTooLarge {
                requested,
                max: self.max_fan_out,
            });
        }
        Ok(())
    }
}

/// `index alias` rows into a map. A row with only an index yields an empty
/// alias list.
pub(crate) fn parse_cat_rows(rows: &str) -> BTreeMap<String, Vec<String>> {
    let mut listing: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for row in rows.lines() {
        let mut columns = row.split_whitespace();
        let Some(index) = columns.next() else {
            continue;
        };
        let aliases = listing.entry(index.to_string()).or_default();
        if let Some(alias) = columns.next() {
            if !aliases.iter().any(|a| a == alias) {
                aliases.push(alias.to_string());
            }
        }
    }
    listing
}

/// Type names across every index of a `_mapping` response.
fn type_names(raw: &Value) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let Some(indices) = raw.as_object() else {
        return names;
    };
    for entry in indices.values() {
        if let Some(mappings) = entry.get("mappings").and_then(Value::as_object) {
            for name in mappings.keys() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
    }
    names
}
