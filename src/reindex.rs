//! Moving documents from one index generation to the next.
//!
//! A [`ReindexJob`] names source and destination descriptors and the stages
//! to run. [`Reindexer::run`] executes the enabled stages in [`Stage::ORDER`]
//! and stops at the first failure. Nothing already done is undone; re-running
//! the job with the remaining stages enabled picks up where it stopped.

use crate::aliases::{AliasSwap, AliasSwitchboard};
use crate::bulk::{BulkOperation, BulkWriter};
use crate::client::{DocumentRef, IndexTarget, SearchEngine, SearchRequest};
use crate::error::{EsgenError, Result};
use crate::indices::{CreateOutcome, IndexLifecycle};
use crate::model::{IndexDescriptor, ReindexPair, SearchResultPage};
use crate::scroll::{ScrollCursor, ScrollDuration};
use crate::version::EngineVersion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    CreateNewIndexes,
    TransferData,
    UpdateAliases,
    RemoveOldIndexes,
}

impl Stage {
    pub const ORDER: [Stage; 4] = [
        Stage::CreateNewIndexes,
        Stage::TransferData,
        Stage::UpdateAliases,
        Stage::RemoveOldIndexes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::CreateNewIndexes => "create_new_indexes",
            Stage::TransferData => "transfer_data",
            Stage::UpdateAliases => "update_aliases",
            Stage::RemoveOldIndexes => "remove_old_indexes",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which stages a job runs. Everything is off unless switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StageFlags {
    pub create_new_indexes: bool,
    pub transfer_data: bool,
    pub update_aliases: bool,
    pub remove_old_indexes: bool,
}

impl StageFlags {
    pub fn all() -> Self {
        StageFlags {
            create_new_indexes: true,
            transfer_data: true,
            update_aliases: true,
            remove_old_indexes: true,
        }
    }

    pub fn only(stages: &[Stage]) -> Self {
        let mut flags = StageFlags::default();
        for stage in stages {
            flags.set(*stage, true);
        }
        flags
    }

    pub fn set(&mut self, stage: Stage, enabled: bool) {
        match stage {
            Stage::CreateNewIndexes => self.create_new_indexes = enabled,
            Stage::TransferData => self.transfer_data = enabled,
            Stage::UpdateAliases => self.update_aliases = enabled,
            Stage::RemoveOldIndexes => self.remove_old_indexes = enabled,
        }
    }

    pub fn enabled(&self, stage: Stage) -> bool {
        match stage {
            Stage::CreateNewIndexes => self.create_new_indexes,
            Stage::TransferData => self.transfer_data,
            Stage::UpdateAliases => self.update_aliases,
            Stage::RemoveOldIndexes => self.remove_old_indexes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReindexJob {
    pub sources: Vec<IndexDescriptor>,
    pub destinations: Vec<IndexDescriptor>,
    #[serde(default)]
    pub stages: StageFlags,
    #[serde(default)]
    pub scroll: ScrollDuration,
    /// Indices to delete in place of the sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove: Option<Vec<String>>,
}

impl ReindexJob {
    pub fn new(sources: Vec<IndexDescriptor>, destinations: Vec<IndexDescriptor>) -> Self {
        ReindexJob {
            sources,
            destinations,
            stages: StageFlags::default(),
            scroll: ScrollDuration::default(),
            remove: None,
        }
    }

    pub fn stages(mut self, stages: StageFlags) -> Self {
        self.stages = stages;
        self
    }

    pub fn scroll(mut self, keep_alive: ScrollDuration) -> Self {
        self.scroll = keep_alive;
        self
    }

    pub fn remove(mut self, indices: Vec<String>) -> Self {
        self.remove = Some(indices);
        self
    }

    /// Check everything that can be checked without the engine and pair
    /// sources with destinations.
    ///
    /// Sources only need a name; they are read, never compiled.
    /// Destinations must be complete.
    pub fn validate(&self) -> Result<Vec<ReindexPair>> {
        if self.sources.is_empty() {
            return Err(EsgenError::MissingIndexList("job has no source indices".into()));
        }
        if self.destinations.is_empty() {
            return Err(EsgenError::MissingIndexList(
                "job has no destination indices".into(),
            ));
        }
        for destination in &self.destinations {
            destination.validate()?;
        }
        if self.stages.remove_old_indexes {
            self.removal_target().validate()?;
        }
        ReindexPair::from_descriptors(&self.sources, &self.destinations)
    }

    /// Exactly the sources, or the explicit `remove` list. Never `_all`.
    pub fn removal_names(&self) -> Vec<String> {
        match &self.remove {
            Some(indices) => indices.clone(),
            None => self.sources.iter().map(|s| s.name.clone()).collect(),
        }
    }

    pub fn removal_target(&self) -> IndexTarget {
        IndexTarget::Named(self.removal_names())
    }
}

/// Counts from moving one or more source indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransferTotals {
    pub pages: usize,
    pub documents: usize,
    pub failed_items: usize,
}

impl TransferTotals {
    fn absorb(&mut self, other: TransferTotals) {
        self.pages += other.pages;
        self.documents += other.documents;
        self.failed_items += other.failed_items;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StageOutcome {
    Created {
        indices: Vec<CreateOutcome>,
    },
    Transferred {
        pages: usize,
        documents: usize,
        failed_items: usize,
    },
    AliasesUpdated {
        swap: AliasSwap,
    },
    Removed {
        indices: Vec<String>,
    },
}

impl StageOutcome {
    pub fn stage(&self) -> Stage {
        match self {
            StageOutcome::Created { .. } => Stage::CreateNewIndexes,
            StageOutcome::Transferred { .. } => Stage::TransferData,
            StageOutcome::AliasesUpdated { .. } => Stage::UpdateAliases,
            StageOutcome::Removed { .. } => Stage::RemoveOldIndexes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReindexReport {
    pub job_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub completed: Vec<StageOutcome>,
    pub skipped: Vec<Stage>,
}

impl ReindexReport {
    fn start() -> Self {
        ReindexReport {
            job_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            finished_at: None,
            completed: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.completed.iter().find(|o| o.stage() == stage)
    }

    pub fn completed_stages(&self) -> Vec<Stage> {
        self.completed.iter().map(StageOutcome::stage).collect()
    }
}

pub struct Reindexer<E: SearchEngine + 'static> {
    engine: Arc<E>,
    version: EngineVersion,
}

impl<E: SearchEngine + 'static> Reindexer<E> {
    pub fn new(engine: Arc<E>, version: EngineVersion) -> Self {
        Reindexer { engine, version }
    }

    /// Run the job's enabled stages in order.
    ///
    /// The job is validated before any request. The first failing stage ends
    /// the run with [`EsgenError::StageFailed`].
    pub async fn run(&self, job: &ReindexJob) -> Result<ReindexReport> {
        let pairs = job.validate()?;
        let mut report = ReindexReport::start();
        tracing::info!(
            "[reindex] job {} started: {} pairs",
            report.job_id,
            pairs.len()
        );

        for stage in Stage::ORDER {
            if !job.stages.enabled(stage) {
                tracing::debug!("[reindex] job {} skipping {}", report.job_id, stage);
                report.skipped.push(stage);
                continue;
            }

            tracing::info!("[reindex] job {} running {}", report.job_id, stage);
            match self.run_stage(stage, job, &pairs).await {
                Ok(outcome) => report.completed.push(outcome),
                Err(e) => {
                    tracing::error!(
                        "[reindex] job {} failed at {} after {:?}: {}",
                        report.job_id,
                        stage,
                        report.completed_stages(),
                        e
                    );
                    return Err(EsgenError::StageFailed {
                        stage,
                        source: Box::new(e),
                    });
                }
            }
        }

        report.finished_at = Some(Utc::now());
        tracing::info!(
            "[reindex] job {} finished: {:?} done, {:?} skipped",
            report.job_id,
            report.completed_stages(),
            report.skipped
        );
        Ok(report)
    }

    async fn run_stage(
        &self,
        stage: Stage,
        job: &ReindexJob,
        pairs: &[ReindexPair],
    ) -> Result<StageOutcome> {
        match stage {
            Stage::CreateNewIndexes => {
                let lifecycle = IndexLifecycle::new(Arc::clone(&self.engine), self.version);
                let indices = lifecycle.create_indices(&job.destinations).await?;
                Ok(StageOutcome::Created { indices })
            }
            Stage::TransferData => {
                let totals = self.transfer(pairs, &job.scroll).await?;
                Ok(StageOutcome::Transferred {
                    pages: totals.pages,
                    documents: totals.documents,
                    failed_items: totals.failed_items,
                })
            }
            Stage::UpdateAliases => {
                let switchboard = AliasSwitchboard::new(Arc::clone(&self.engine));
                let swap = switchboard.swap(&job.sources, &job.destinations).await?;
                Ok(StageOutcome::AliasesUpdated { swap })
            }
            Stage::RemoveOldIndexes => {
                let indices = job.removal_names();
                let lifecycle = IndexLifecycle::new(Arc::clone(&self.engine), self.version);
                lifecycle
                    .delete_indices(&IndexTarget::Named(indices.clone()))
                    .await?;
                Ok(StageOutcome::Removed { indices })
            }
        }
    }

    /// Copy every pair concurrently. The first failing pair aborts the rest;
    /// their cursors are released when the aborted tasks drop them.
    async fn transfer(&self, pairs: &[ReindexPair], keep_alive: &ScrollDuration) -> Result<TransferTotals> {
        let mut tasks = JoinSet::new();
        for pair in pairs {
            let engine = Arc::clone(&self.engine);
            let pair = pair.clone();
            let keep_alive = keep_alive.clone();
            tasks.spawn(transfer_pair(engine, pair, keep_alive));
        }

        let mut totals = TransferTotals::default();
        while let Some(joined) = tasks.join_next().await {
            match joined.map_err(EsgenError::from).and_then(|r| r) {
                Ok(pair_totals) => totals.absorb(pair_totals),
                Err(e) => {
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }
        Ok(totals)
    }
}

async fn transfer_pair<E: SearchEngine + 'static>(
    engine: Arc<E>,
    pair: ReindexPair,
    keep_alive: ScrollDuration,
) -> Result<TransferTotals> {
    let request = SearchRequest::new(pair.scroll_query.clone()).index(pair.source.clone());
    let mut cursor = ScrollCursor::open(Arc::clone(&engine), request, keep_alive);
    let writer = BulkWriter::new(engine);

    let mut totals = TransferTotals::default();
    let copied = copy_pages(&mut cursor, &writer, &pair, &mut totals).await;
    cursor.close().await;
    copied?;

    if totals.failed_items > 0 {
        tracing::warn!(
            "[reindex] {} -> {}: {} of {} documents rejected",
            pair.source,
            pair.destination,
            totals.failed_items,
            totals.documents
        );
    } else {
        tracing::info!(
            "[reindex] {} -> {}: {} documents in {} pages",
            pair.source,
            pair.destination,
            totals.documents,
            totals.pages
        );
    }
    Ok(totals)
}

async fn copy_pages<E: SearchEngine + 'static>(
    cursor: &mut ScrollCursor<E>,
    writer: &BulkWriter<E>,
    pair: &ReindexPair,
    totals: &mut TransferTotals,
) -> Result<()> {
    while let Some(page) = cursor.next_page().await? {
        let operations = page_operations(&page, &pair.destination)?;
        let response = writer.write(operations).await?;
        totals.pages += 1;
        totals.documents += page.items.len();
        totals.failed_items += response.failed_items().len();
    }
    Ok(())
}

/// One index operation per hit, same type, id, parent and body, aimed at
/// `destination`.
fn page_operations(page: &SearchResultPage, destination: &str) -> Result<Vec<BulkOperation>> {
    page.items
        .iter()
        .map(|item| {
            let mut target = DocumentRef::new(destination, item.doc_type.clone(), item.id.clone());
            target.parent = item.parent.clone();
            BulkOperation::index(target, item.source.clone())
        })
        .collect()
}
