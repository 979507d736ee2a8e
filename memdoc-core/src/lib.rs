// memdoc-core/src/lib.rs
// In-memory Mongo-style document query engine - pure Rust, no bindings

#[macro_use]
pub mod logging;

pub mod error;
pub mod config;
pub mod value;
pub mod path;
pub mod document;
pub mod timestamp;
pub mod query;
pub mod update;
pub mod projection;
pub mod find_options;
pub mod query_planner;
pub mod collection_core;
pub mod database;

// Public exports
pub use error::{MemDocError, Result};
pub use config::{EngineConfig, IdStrategy, ProjectionPolicy};
pub use document::{Document, DocumentId};
pub use value::values_equal;
pub use query::{matches, Query};
pub use update::{apply_update, apply_update_with, Update};
pub use projection::{ProjectedDocument, Projection};
pub use find_options::{FindOptions, Page};
pub use query_planner::{IndexRecommendation, QueryPlanner, QueryShape};
pub use collection_core::{Collection, DeleteResult, FindResult, UpdateResult};
pub use database::{DatabaseCore, SharedCollection};
pub use logging::{get_log_level, set_log_level, LogLevel};
