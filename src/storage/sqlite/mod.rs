//! `SQLite` engine for the record graph.
//!
//! ## Module Structure
//!
//! - [`connection`]: lock acquisition, pragma configuration, transactions
//! - [`schema`]: `user_version` migrations
//! - [`read`]: record graph queries
//! - [`write`]: identity index, upserts, relink pass, delete cascade
//! - [`metrics`]: per-operation counters and latency histograms
//! - [`engine`]: [`SqliteRecipeStore`], the operations built on the above

mod connection;
mod engine;
mod metrics;
mod read;
mod schema;
mod write;

pub use connection::{acquire_lock, configure_connection, with_savepoint, with_transaction};
pub use engine::{SqliteRecipeStore, StoreStatus};
pub use metrics::record_operation_metrics;
pub use schema::{MIGRATIONS, Migration};
pub use write::CascadeReport;
