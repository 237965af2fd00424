//! Value objects describing index generations and what comes back out of
//! them. Everything here is plain data; nothing performs I/O.

pub mod analysis;
pub mod doc_type;
pub mod field;
pub mod index;
pub mod mapping;
pub mod presets;
pub mod reindex;
pub mod search;

pub use analysis::{Analyzer, CharFilter, Component, ComponentKind, TokenFilter, Tokenizer};
pub use doc_type::{DocumentType, DynamicMode};
pub use field::{Field, FieldType, IndexMode};
pub use index::IndexDescriptor;
pub use mapping::Mapping;
pub use presets::{AnalyzerMode, AnalyzerSet, FieldSet};
pub use reindex::ReindexPair;
pub use search::{SearchItem, SearchResultPage, Sort, SortMode, SortOrder};
