use super::index::IndexDescriptor;
use crate::error::{EsgenError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A source generation paired with the destination its documents move to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReindexPair {
    pub source: String,
    pub destination: String,
    /// Always the source's reindex query; the destination's is irrelevant
    /// because nothing is read from it.
    pub scroll_query: Value,
}

impl ReindexPair {
    pub fn new(source: &IndexDescriptor, destination: &IndexDescriptor) -> Self {
        ReindexPair {
            source: source.name.clone(),
            destination: destination.name.clone(),
            scroll_query: source.reindex_scroll_query.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.is_empty() {
            return Err(EsgenError::incomplete("reindex pair: missing source index"));
        }
        if self.destination.is_empty() {
            return Err(EsgenError::incomplete(
                "reindex pair: missing destination index",
            ));
        }
        Ok(())
    }

    /// Pair sources with destinations by position.
    pub fn from_descriptors(
        sources: &[IndexDescriptor],
        destinations: &[IndexDescriptor],
    ) -> Result<Vec<ReindexPair>> {
        if sources.len() != destinations.len() {
            return Err(EsgenError::MissingIndexList(format!(
                "{} source indices but {} destination indices",
                sources.len(),
                destinations.len()
            )));
        }

        sources
            .iter()
            .zip(destinations)
            .map(|(source, destination)| {
                let pair = ReindexPair::new(source, destination);
                pair.validate()?;
                Ok(pair)
            })
            .collect()
    }
}
