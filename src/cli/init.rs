//! Init CLI command: open the store and seed it on first run.

#![allow(clippy::print_stdout)]

use crate::Result;
use crate::services::{RecipeStore, SeedOutcome, Seeder};
use std::fmt::Write;
use std::path::Path;

/// Describes the result of a seeding attempt.
#[must_use]
pub fn render_seed_outcome(outcome: &SeedOutcome) -> String {
    let mut out = String::new();
    match outcome {
        SeedOutcome::AlreadyInitialized => {
            let _ = writeln!(out, "Already initialized.");
        },
        SeedOutcome::NotEmpty(status) => {
            let _ = writeln!(
                out,
                "Store already holds {} folder(s) and {} recipe(s); nothing seeded.",
                status.folders, status.recipes
            );
        },
        SeedOutcome::Seeded(report) => {
            let _ = writeln!(
                out,
                "Seeded {} folder(s) and {} recipe(s).",
                report.folders, report.recipes
            );
            if !report.skipped.is_empty() {
                let _ = writeln!(out, "Skipped {} fixture(s):", report.skipped.len());
                for skipped in &report.skipped {
                    let _ = writeln!(out, "  - {skipped}");
                }
            }
        },
    }
    out
}

/// Prepares the store, loading fixtures from `seed_dir` if it is empty.
///
/// # Errors
///
/// Returns an error on storage failure or an unreadable fixture tree.
pub async fn cmd_init(store: &RecipeStore, seed_dir: Option<&Path>) -> Result<()> {
    let Some(dir) = seed_dir else {
        let status = store.initialize().await?;
        println!(
            "Store ready: {} folder(s), {} recipe(s).",
            status.folders, status.recipes
        );
        return Ok(());
    };

    let outcome = Seeder::new(dir).seed_if_empty(store).await?;
    print!("{}", render_seed_outcome(&outcome));
    Ok(())
}
