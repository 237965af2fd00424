use crate::client::{IndexTarget, SearchEngine};
use crate::error::{EsgenError, Result};
use crate::model::{IndexDescriptor, Mapping};
use crate::settings;
use crate::version::EngineVersion;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "index", rename_all = "snake_case")]
pub enum CreateOutcome {
    Created(String),
    AlreadyExists(String),
}

impl CreateOutcome {
    pub fn index(&self) -> &str {
        match self {
            CreateOutcome::Created(index) | CreateOutcome::AlreadyExists(index) => index,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, CreateOutcome::Created(_))
    }
}

/// Index creation, deletion and mapping retrieval.
pub struct IndexLifecycle<E: SearchEngine> {
    engine: Arc<E>,
    version: EngineVersion,
}

impl<E: SearchEngine> IndexLifecycle<E> {
    pub fn new(engine: Arc<E>, version: EngineVersion) -> Self {
        IndexLifecycle { engine, version }
    }

    /// Create every descriptor the engine does not have yet.
    ///
    /// All descriptors are compiled before the first request; one invalid
    /// descriptor fails the whole call without touching the engine.
    pub async fn create_indices(&self, descriptors: &[IndexDescriptor]) -> Result<Vec<CreateOutcome>> {
        if descriptors.is_empty() {
            return Err(EsgenError::MissingIndexList("no indices to create".into()));
        }
        let requests = descriptors
            .iter()
            .map(|d| settings::compile(d, self.version))
            .collect::<Result<Vec<_>>>()?;

        let mut outcomes = Vec::with_capacity(requests.len());
        for request in &requests {
            if self.engine.index_exists(&request.index).await? {
                tracing::info!("[indices] {} already exists, leaving it untouched", request.index);
                outcomes.push(CreateOutcome::AlreadyExists(request.index.clone()));
                continue;
            }
            self.engine.create_index(request).await?;
            tracing::info!("[indices] created {}", request.index);
            outcomes.push(CreateOutcome::Created(request.index.clone()));
        }
        Ok(outcomes)
    }

    pub async fn delete_indices(&self, target: &IndexTarget) -> Result<Value> {
        target.validate()?;
        if *target == IndexTarget::All {
            tracing::warn!("[indices] deleting every index");
        }
        let response = self.engine.delete_index(target).await?;
        tracing::info!("[indices] deleted {}", target.path());
        Ok(response)
    }

    /// Mappings of the given indices, or of every index, parsed back into the
    /// model. Types that fail validation are dropped.
    pub async fn get_mappings(&self, indices: Option<&[String]>) -> Result<Vec<Mapping>> {
        let raw = self.engine.get_mapping(indices).await?;
        let mappings = raw
            .as_object()
            .map(|entries| {
                entries
                    .iter()
                    .map(|(index, entry)| {
                        Mapping::from_wire(index, entry.get("mappings").unwrap_or(&Value::Null))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(mappings)
    }
}
