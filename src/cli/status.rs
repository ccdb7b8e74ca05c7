//! Status CLI command.

#![allow(clippy::print_stdout)]

use crate::Result;
use crate::services::RecipeStore;
use crate::storage::StoreStatus;
use std::fmt::Write;

/// Formats store counts as an aligned table.
#[must_use]
pub fn render_status(status: &StoreStatus) -> String {
    let rows = [
        ("Schema version", u64::try_from(status.schema_version).unwrap_or_default()),
        ("Folders", status.folders),
        ("Recipes", status.recipes),
        ("About sections", status.about_sections),
        ("Ingredient sections", status.ingredient_sections),
        ("Ingredients", status.ingredients),
        ("Step sections", status.step_sections),
        ("Steps", status.steps),
        ("Images", status.images),
    ];

    let mut out = String::new();
    for (label, value) in rows {
        let _ = writeln!(out, "{label:<20} {value}");
    }
    out
}

/// Prints what the store holds.
///
/// # Errors
///
/// Returns an error on storage failure.
pub async fn cmd_status(store: &RecipeStore) -> Result<()> {
    let status = store.status().await?;
    print!("{}", render_status(&status));
    if status.is_empty() {
        println!("\nStore is empty. Run `cookbook init --seed-dir <DIR>` to load fixtures.");
    }
    Ok(())
}
