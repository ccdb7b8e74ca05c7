//! Storage layer.
//!
//! - [`records`]: the back-referenced, position-ordered record model
//! - [`convert`]: entity ↔ record conversion with skipped-record diagnostics
//! - [`sqlite`]: the `SQLite` engine that persists and relinks record graphs

pub mod convert;
pub mod records;
pub mod sqlite;

pub use convert::{Converted, SkippedRecord};
pub use sqlite::{CascadeReport, SqliteRecipeStore, StoreStatus};
