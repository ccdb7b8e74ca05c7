//! Cascading delete commands.
//!
//! # Usage
//!
//! ```bash
//! cookbook delete-folder <ID>
//! cookbook delete-recipe --dry-run <ID>
//! ```

#![allow(clippy::print_stdout)]

use crate::Result;
use crate::models::{FolderId, RecipeId};
use crate::services::RecipeStore;
use crate::storage::CascadeReport;

/// Summarizes what a cascade removed.
#[must_use]
pub fn render_cascade(report: &CascadeReport) -> String {
    format!(
        "Deleted {} folder(s), {} recipe(s), {} child record(s)",
        report.folders, report.recipes, report.records
    )
}

/// Deletes a folder and everything below it.
///
/// With `dry_run` the folder is loaded and its size reported instead.
///
/// # Errors
///
/// `InvalidInput` for a malformed id, `NotFound`, or a storage failure.
pub async fn cmd_delete_folder(store: &RecipeStore, id: &str, dry_run: bool) -> Result<()> {
    let id: FolderId = id.parse()?;
    if dry_run {
        return match store.retrieve_folder(id).await? {
            Some(folder) => {
                println!(
                    "Would delete '{}': {} folder(s), {} recipe(s)",
                    folder.name,
                    folder.folder_count(),
                    folder.recipe_count()
                );
                Ok(())
            },
            None => Err(crate::Error::NotFound {
                kind: FolderId::KIND,
                id: id.to_string(),
            }),
        };
    }

    let report = store.delete_folder(id).await?;
    println!("{}", render_cascade(&report));
    Ok(())
}

/// Deletes a recipe and everything it owns.
///
/// # Errors
///
/// `InvalidInput` for a malformed id, `NotFound`, or a storage failure.
pub async fn cmd_delete_recipe(store: &RecipeStore, id: &str, dry_run: bool) -> Result<()> {
    let id: RecipeId = id.parse()?;
    if dry_run {
        return match store.retrieve_recipe(id).await? {
            Some(recipe) => {
                println!("Would delete recipe '{}'", recipe.name);
                Ok(())
            },
            None => Err(crate::Error::NotFound {
                kind: RecipeId::KIND,
                id: id.to_string(),
            }),
        };
    }

    let report = store.delete_recipe(id).await?;
    println!("{}", render_cascade(&report));
    Ok(())
}
