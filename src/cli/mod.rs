//! CLI command implementations.
//!
//! Each submodule implements one group of commands on top of
//! [`RecipeStore`]. Rendering is kept in plain functions returning strings
//! so output can be checked without a terminal.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `init` | Open the store and seed it from fixtures if empty |
//! | `status` | Show record counts and schema version |
//! | `folders` | List root folders |
//! | `show-folder` | Print a folder tree |
//! | `show-recipe` | Print a recipe |
//! | `search` | Ranked substring search with excerpts |
//! | `delete-folder` | Cascade-delete a folder |
//! | `delete-recipe` | Cascade-delete a recipe |
//! | `export-recipe` | Write a recipe as fixture JSON |
//!
//! # Example Usage
//!
//! ```bash
//! cookbook init --seed-dir fixtures/seed
//! cookbook search "seashore" --limit 5
//! cookbook export-recipe 6f1c2b2e-8d4a-4c1e-9b7a-2f1d3c4b5a69 > chowder.json
//! ```

mod browse;
mod delete;
mod export;
mod init;
mod search;
mod status;

pub use browse::{cmd_folders, cmd_show_folder, cmd_show_recipe, render_folder_tree, render_recipe};
pub use delete::{cmd_delete_folder, cmd_delete_recipe, render_cascade};
pub use export::{cmd_export_recipe, export_json};
pub use init::{cmd_init, render_seed_outcome};
pub use search::{cmd_search, render_results};
pub use status::{cmd_status, render_status};

use crate::Result;
use crate::config::CookbookConfig;
use crate::services::RecipeStore;

/// Opens the store named by `config`.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or migrated.
pub fn open_store(config: &CookbookConfig) -> Result<RecipeStore> {
    let path = config.resolved_store_path();
    tracing::debug!(path = %path.display(), "Opening recipe store");
    RecipeStore::open(path)
}
