//! First-run population from bundled fixtures.
//!
//! A fixture tree maps onto the store directly: each directory becomes a
//! user folder named after the directory (capitalized), and each `*.json`
//! file inside it becomes a recipe. Only directories at the top of the tree
//! are handed to the store; their contents travel as one subtree each.

use crate::models::{Folder, FolderKind, RecipeFixture};
use crate::services::store::RecipeStore;
use crate::storage::StoreStatus;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::instrument;

/// A fixture file or directory that was not loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFixture {
    /// Path of the fixture.
    pub path: PathBuf,
    /// Why it was skipped.
    pub reason: String,
}

impl fmt::Display for SkippedFixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}

/// What a seeding run stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Folders created, nested ones included.
    pub folders: usize,
    /// Recipes created.
    pub recipes: usize,
    /// Fixtures that could not be loaded or stored.
    pub skipped: Vec<SkippedFixture>,
}

/// Result of [`Seeder::seed_if_empty`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    /// This seeder already ran; nothing was checked.
    AlreadyInitialized,
    /// The store held data, so nothing was loaded.
    NotEmpty(StoreStatus),
    /// Fixtures were loaded into an empty store.
    Seeded(SeedReport),
}

/// Loads a fixture tree into an empty store, once.
///
/// Concurrent calls are serialized; only the first one seeds.
#[derive(Debug)]
pub struct Seeder {
    fixture_dir: PathBuf,
    initialized: AtomicBool,
    seeding: Mutex<()>,
}

impl Seeder {
    /// Creates a seeder for the fixture tree rooted at `fixture_dir`.
    #[must_use]
    pub fn new(fixture_dir: impl Into<PathBuf>) -> Self {
        Self {
            fixture_dir: fixture_dir.into(),
            initialized: AtomicBool::new(false),
            seeding: Mutex::new(()),
        }
    }

    /// Root of the fixture tree.
    #[must_use]
    pub fn fixture_dir(&self) -> &Path {
        &self.fixture_dir
    }

    /// Returns `true` once [`Self::seed_if_empty`] has completed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Seeds `store` from the fixture tree if it holds no folders and no
    /// recipes.
    ///
    /// Later calls on the same seeder return
    /// [`SeedOutcome::AlreadyInitialized`] without touching the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be probed, the fixture tree
    /// cannot be read, or a create fails for a reason other than an
    /// identity collision.
    #[instrument(skip(self, store), fields(fixture_dir = %self.fixture_dir.display()))]
    pub async fn seed_if_empty(&self, store: &RecipeStore) -> Result<SeedOutcome> {
        if self.is_initialized() {
            return Ok(SeedOutcome::AlreadyInitialized);
        }
        let _guard = self.seeding.lock().await;
        if self.is_initialized() {
            return Ok(SeedOutcome::AlreadyInitialized);
        }

        let status = store.initialize().await?;
        if !status.is_empty() {
            self.initialized.store(true, Ordering::SeqCst);
            tracing::debug!("Store already populated, skipping seed");
            return Ok(SeedOutcome::NotEmpty(status));
        }

        let dir = self.fixture_dir.clone();
        let (folders, mut skipped) =
            tokio::task::spawn_blocking(move || load_fixture_tree(&dir, Utc::now()))
                .await
                .map_err(|e| {
                    Error::operation("load_fixtures", format!("fixture task failed: {e}"))
                })??;

        let mut report = SeedReport::default();
        for (path, folder) in folders {
            let (folder_count, recipe_count) = (folder.folder_count(), folder.recipe_count());
            match store.create_folder(folder).await {
                Ok(_) => {
                    report.folders += folder_count;
                    report.recipes += recipe_count;
                },
                Err(e @ Error::Duplicate { .. }) => skipped.push(SkippedFixture {
                    path,
                    reason: e.to_string(),
                }),
                Err(e) => return Err(e),
            }
        }
        report.skipped = skipped;

        for skipped in &report.skipped {
            tracing::warn!(fixture = %skipped, "Skipped fixture");
        }
        tracing::info!(
            folders = report.folders,
            recipes = report.recipes,
            skipped = report.skipped.len(),
            "Seeded recipe store"
        );
        metrics::counter!("cookbook_seeded_recipes_total")
            .increment(u64::try_from(report.recipes).unwrap_or(u64::MAX));

        self.initialized.store(true, Ordering::SeqCst);
        Ok(SeedOutcome::Seeded(report))
    }
}

/// Capitalizes the first letter of each word and lower-cases the rest.
#[must_use]
pub fn capitalize(name: &str) -> String {
    name.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| Error::operation("read_fixture_dir", format!("{}: {e}", dir.display())))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| Error::operation("read_fixture_entry", e))?;
    entries.sort();
    Ok(entries)
}

fn is_fixture_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Reads every top-level fixture folder under `root`.
///
/// Recipe files that fail to parse are returned as skipped rather than
/// failing the load.
///
/// # Errors
///
/// Returns an error if a directory cannot be listed.
pub fn load_fixture_tree(
    root: &Path,
    now: DateTime<Utc>,
) -> Result<(Vec<(PathBuf, Folder)>, Vec<SkippedFixture>)> {
    let mut folders = Vec::new();
    let mut skipped = Vec::new();

    for path in sorted_entries(root)? {
        if path.is_dir() {
            let folder = load_folder(&path, now, &mut skipped)?;
            folders.push((path, folder));
        } else if is_fixture_file(&path) {
            skipped.push(SkippedFixture {
                path,
                reason: "recipe outside any folder".to_string(),
            });
        }
    }
    Ok((folders, skipped))
}

fn load_folder(dir: &Path, now: DateTime<Utc>, skipped: &mut Vec<SkippedFixture>) -> Result<Folder> {
    let mut folder = Folder::new(capitalize(&dir_name(dir)), FolderKind::User);
    folder.created_at = now;
    folder.edited_at = now;

    for path in sorted_entries(dir)? {
        if path.is_dir() {
            let child = load_folder(&path, now, skipped)?;
            if let Err(e) = folder.push_folder(child) {
                skipped.push(SkippedFixture {
                    path,
                    reason: e.to_string(),
                });
            }
        } else if is_fixture_file(&path) {
            let recipe = fs::read_to_string(&path)
                .map_err(|e| Error::operation("read_fixture", e))
                .and_then(|json| RecipeFixture::parse(&json))
                .and_then(|fixture| fixture.into_recipe(now))
                .and_then(|recipe| folder.push_recipe(recipe));
            if let Err(e) = recipe {
                skipped.push(SkippedFixture {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(folder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("desserts", "Desserts")]
    #[test_case("main dishes", "Main Dishes")]
    #[test_case("BBQ", "Bbq")]
    #[test_case("", "")]
    fn test_capitalize(input: &str, expected: &str) {
        assert_eq!(capitalize(input), expected);
    }

    fn write_recipe(dir: &Path, file: &str, name: &str) {
        let json = format!(r#"{{"version": 1, "name": "{name}"}}"#);
        fs::write(dir.join(file), json).unwrap();
    }

    #[test]
    fn test_load_fixture_tree() {
        let root = tempfile::tempdir().unwrap();
        let soups = root.path().join("soups");
        fs::create_dir_all(soups.join("cold soups")).unwrap();
        write_recipe(&soups, "a.json", "Chowder");
        write_recipe(&soups.join("cold soups"), "b.json", "Gazpacho");
        fs::write(soups.join("broken.json"), "{ not json").unwrap();
        fs::write(soups.join("notes.txt"), "ignored").unwrap();
        write_recipe(root.path(), "stray.json", "Stray");

        let (folders, skipped) = load_fixture_tree(root.path(), Utc::now()).unwrap();

        assert_eq!(folders.len(), 1);
        let (_, folder) = &folders[0];
        assert_eq!(folder.name, "Soups");
        assert_eq!(folder.folder_count(), 2);
        assert_eq!(folder.recipe_count(), 2);
        assert_eq!(folder.folders[0].name, "Cold Soups");
        assert_eq!(skipped.len(), 2);
    }

    #[tokio::test]
    async fn test_seed_only_once() {
        let root = tempfile::tempdir().unwrap();
        let mains = root.path().join("mains");
        fs::create_dir_all(&mains).unwrap();
        write_recipe(&mains, "pie.json", "Fish pie");

        let store = RecipeStore::in_memory().unwrap();
        let seeder = Seeder::new(root.path());

        let SeedOutcome::Seeded(report) = seeder.seed_if_empty(&store).await.unwrap() else {
            panic!("expected a seeded store");
        };
        assert_eq!((report.folders, report.recipes), (1, 1));
        assert!(seeder.is_initialized());

        assert_eq!(
            seeder.seed_if_empty(&store).await.unwrap(),
            SeedOutcome::AlreadyInitialized
        );

        let fresh = Seeder::new(root.path());
        assert!(matches!(
            fresh.seed_if_empty(&store).await.unwrap(),
            SeedOutcome::NotEmpty(status) if status.recipes == 1
        ));
    }

    #[tokio::test]
    async fn test_concurrent_seeds_load_fixtures_once() {
        let root = tempfile::tempdir().unwrap();
        let mains = root.path().join("mains");
        fs::create_dir_all(&mains).unwrap();
        write_recipe(&mains, "pie.json", "Fish pie");

        let store = RecipeStore::in_memory().unwrap();
        let seeder = Seeder::new(root.path());

        let (first, second) =
            tokio::join!(seeder.seed_if_empty(&store), seeder.seed_if_empty(&store));
        let outcomes = [first.unwrap(), second.unwrap()];

        let seeded = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, SeedOutcome::Seeded(_)))
            .count();
        assert_eq!(seeded, 1);
        assert!(outcomes.contains(&SeedOutcome::AlreadyInitialized));

        let status = store.status().await.unwrap();
        assert_eq!((status.folders, status.recipes), (1, 1));
    }

    #[tokio::test]
    async fn test_missing_fixture_dir_is_an_error() {
        let store = RecipeStore::in_memory().unwrap();
        let seeder = Seeder::new("/nonexistent/cookbook/fixtures");
        assert!(seeder.seed_if_empty(&store).await.is_err());
        assert!(!seeder.is_initialized());
    }
}
