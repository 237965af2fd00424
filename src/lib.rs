//! # esgen
//!
//! Client-side lifecycle management for index generations on an HTTP search
//! engine: compile index settings, create indices, page documents out of an
//! old generation into a new one, cut aliases over and drop the old indices.
//!
//! Every component takes an explicit engine handle. [`HttpEngine`] talks to
//! a real deployment; anything implementing [`SearchEngine`] can stand in for
//! it.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use esgen::model::{DocumentType, Field, FieldType, IndexDescriptor, Mapping};
//! use esgen::reindex::{ReindexJob, Reindexer, StageFlags};
//! use esgen::{EngineConfig, HttpEngine};
//! use std::sync::Arc;
//!
//! # async fn run() -> esgen::Result<()> {
//! let config = EngineConfig::from_env()?;
//! let engine = Arc::new(HttpEngine::new(&config)?);
//!
//! let mapping = Mapping::new(vec![
//!     DocumentType::new("post").field(Field::new("text", FieldType::Text)),
//! ]);
//! let v1 = IndexDescriptor::new("blog_v1").search_alias("blog").mapping(mapping.clone());
//! let v2 = IndexDescriptor::new("blog_v2").search_alias("blog").mapping(mapping);
//!
//! let job = ReindexJob::new(vec![v1], vec![v2]).stages(StageFlags::all());
//! let report = Reindexer::new(engine, config.version()).run(&job).await?;
//! println!("finished {:?}", report.completed_stages());
//! # Ok(())
//! # }
//! ```
//!
//! ## Layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`model`] | Descriptors and result types, no I/O |
//! | [`settings`] | Descriptor to index creation document |
//! | [`client`] | The [`SearchEngine`] seam and its HTTP implementation |
//! | [`scroll`] | Paging with cursor release |
//! | [`bulk`] | Bulk operations and NDJSON encoding |
//! | [`aliases`] | Alias cutover |
//! | [`indices`] | Create, delete, read mappings |
//! | [`documents`] | Single-document operations and search |
//! | [`inventory`] | Index, alias and type listings |
//! | [`reindex`] | Staged reindex jobs |

pub mod aliases;
pub mod bulk;
pub mod client;
pub mod config;
pub mod documents;
pub mod error;
pub mod indices;
pub mod inventory;
pub mod model;
pub mod reindex;
pub mod scroll;
pub mod settings;
pub mod version;

pub use aliases::{AliasSwap, AliasSwitchboard};
pub use bulk::{BulkBody, BulkOperation, BulkResponse, BulkWriter, UpdateOp};
pub use client::{AliasAction, DocumentRef, HttpEngine, IndexTarget, SearchEngine, SearchRequest};
pub use config::EngineConfig;
pub use documents::{DocumentLookup, Documents};
pub use error::{EsgenError, Result};
pub use indices::{CreateOutcome, IndexLifecycle};
pub use inventory::{Inventory, Selector};
pub use reindex::{ReindexJob, ReindexReport, Reindexer, Stage, StageFlags, StageOutcome};
pub use scroll::{CancelHandle, CancelSignal, ScrollCursor, ScrollDuration};
pub use settings::{compile, CreateIndexRequest};
pub use version::EngineVersion;
