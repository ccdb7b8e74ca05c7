//! `SQLite`-backed record store.
//!
//! Persists the folder/recipe graph as one row per node with nullable
//! back-references. Every mutation is a single transaction: a create
//! inserts its subtree detached, relinks it, and links the root to its
//! parent before committing, so a half-linked subtree is never visible.

use crate::models::{Folder, FolderId, ImageId, NodeKind, Recipe, RecipeId};
use crate::storage::convert::{
    Converted, folder_from_record, folder_to_record, recipe_from_record, recipe_to_record,
    to_db_timestamp,
};
use crate::storage::records::{FolderRecord, ImageOwner, RecipeRecord};
use crate::{Error, Result};
use rusqlite::Connection;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::instrument;

use super::connection::{acquire_lock, configure_connection, with_savepoint, with_transaction};
use super::metrics::timed;
use super::read::{self, Blobs, Depth};
use super::schema;
use super::write::{self, CascadeReport, Link};

/// Row counts for every stored record kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStatus {
    /// Schema version applied at open.
    pub schema_version: i32,
    /// Stored folders.
    pub folders: u64,
    /// Stored recipes.
    pub recipes: u64,
    /// Stored about sections.
    pub about_sections: u64,
    /// Stored ingredient sections.
    pub ingredient_sections: u64,
    /// Stored ingredients.
    pub ingredients: u64,
    /// Stored step sections.
    pub step_sections: u64,
    /// Stored steps.
    pub steps: u64,
    /// Stored images.
    pub images: u64,
}

impl StoreStatus {
    /// Returns `true` when neither folders nor recipes are stored.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.folders == 0 && self.recipes == 0
    }

    /// Section, item, and image rows.
    #[must_use]
    pub const fn child_records(&self) -> u64 {
        self.about_sections
            + self.ingredient_sections
            + self.ingredients
            + self.step_sections
            + self.steps
            + self.images
    }
}

/// `SQLite` record store for the folder/recipe graph.
///
/// # Concurrency Model
///
/// The connection sits behind a `Mutex` that each operation holds from
/// start to finish, so operations never interleave. Poisoned locks are
/// recovered; the transaction that panicked has already been rolled back
/// by `SQLite` when the connection next begins one.
pub struct SqliteRecipeStore {
    /// Connection to the `SQLite` database.
    conn: Mutex<Connection>,
    /// Path to the `SQLite` database (None for in-memory).
    db_path: Option<PathBuf>,
}

impl SqliteRecipeStore {
    /// Opens (or creates) a store file and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::operation("create_store_dir", e))?;
        }
        let conn = Connection::open(&db_path).map_err(|e| Error::operation("open_sqlite", e))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Creates an in-memory store (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::operation("open_sqlite_in_memory", e))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub const fn db_path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    fn initialize(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        configure_connection(&conn)?;
        let version = schema::migrate(&conn)?;
        tracing::debug!(schema_version = version, path = ?self.db_path, "Opened recipe store");
        Ok(())
    }

    /// Counts every stored record kind.
    ///
    /// # Errors
    ///
    /// Returns an error if a count query fails.
    #[instrument(skip(self))]
    pub fn status(&self) -> Result<StoreStatus> {
        let conn = acquire_lock(&self.conn);
        timed("status", || {
            Ok(StoreStatus {
                schema_version: schema::current_version(&conn)?,
                folders: read::count_rows(&conn, "folders")?,
                recipes: read::count_rows(&conn, "recipes")?,
                about_sections: read::count_rows(&conn, "about_sections")?,
                ingredient_sections: read::count_rows(&conn, "ingredient_sections")?,
                ingredients: read::count_rows(&conn, "ingredients")?,
                step_sections: read::count_rows(&conn, "step_sections")?,
                steps: read::count_rows(&conn, "steps")?,
                images: read::count_rows(&conn, "images")?,
            })
        })
    }

    /// Returns `true` if no folder and no recipe is stored.
    ///
    /// An existence probe; nothing is materialized.
    ///
    /// # Errors
    ///
    /// Returns an error if the probe fails.
    pub fn is_empty(&self) -> Result<bool> {
        let conn = acquire_lock(&self.conn);
        conn.query_row(
            "SELECT NOT (EXISTS(SELECT 1 FROM folders) OR EXISTS(SELECT 1 FROM recipes))",
            [],
            |row| row.get(0),
        )
        .map_err(|e| Error::operation("probe_empty", e))
    }

    // ------------------------------------------------------------------------
    // Folders
    // ------------------------------------------------------------------------

    /// Stores a folder subtree.
    ///
    /// Every identity in the subtree is checked before anything is written.
    /// The folder is appended to its declared parent's children, or to the
    /// top-level list when it has none.
    ///
    /// # Errors
    ///
    /// - [`Error::Duplicate`] if any identity in the subtree is already
    ///   stored or repeats within the subtree
    /// - [`Error::NotFound`] if the declared parent folder does not exist
    /// - [`Error::OperationFailed`] on storage failure
    #[instrument(skip(self, folder), fields(folder_id = %folder.id, name = %folder.name))]
    pub fn create_folder(&self, folder: &Folder) -> Result<FolderId> {
        let record = folder_to_record(folder);
        let conn = acquire_lock(&self.conn);

        timed("create_folder", || {
            with_transaction(&conn, |conn| {
                write::ensure_unclaimed(conn, &write::folder_claims(&record))?;
                let parent = existing_parent(conn, folder.parent_id)?;

                with_savepoint(conn, "insert_subtree", |conn| {
                    write::write_folder(conn, &record, Link::Detached)
                })?;
                with_savepoint(conn, "relink_subtree", |conn| {
                    let linked = write::relink_folder(conn, &record)?;
                    write::link_folder(conn, &folder.id.to_string(), parent.as_deref())?;
                    tracing::debug!(linked, "Relinked folder subtree");
                    Ok(())
                })
            })
        })?;

        metrics::counter!("cookbook_folders_created_total").increment(1);
        Ok(folder.id)
    }

    /// Reads a folder subtree.
    ///
    /// Records that cannot be converted are logged and left out; use
    /// [`Self::retrieve_folder_with_diagnostics`] to inspect them.
    ///
    /// # Errors
    ///
    /// Returns an error only on storage failure; an absent folder is `Ok(None)`.
    pub fn retrieve_folder(&self, id: FolderId) -> Result<Option<Folder>> {
        Ok(report_skipped(self.retrieve_folder_with_diagnostics(id)?))
    }

    /// Reads a folder subtree together with any records that were skipped.
    ///
    /// # Errors
    ///
    /// Returns an error only on storage failure.
    #[instrument(skip(self), fields(folder_id = %id))]
    pub fn retrieve_folder_with_diagnostics(&self, id: FolderId) -> Result<Converted<Option<Folder>>> {
        let conn = acquire_lock(&self.conn);
        let record = timed("retrieve_folder", || {
            read::fetch_folder(&conn, &id.to_string(), Depth::Full)
        })?;
        Ok(convert_folder(record))
    }

    /// Replaces a folder's name, cover image, and edit timestamp.
    ///
    /// Child folders and recipes in `folder` are ignored; they change
    /// through their own operations.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the folder is not stored
    /// - [`Error::Duplicate`] if a new cover image reuses a stored identity
    /// - [`Error::OperationFailed`] on storage failure
    #[instrument(skip(self, folder), fields(folder_id = %folder.id))]
    pub fn update_folder(&self, folder: &Folder) -> Result<()> {
        let id = folder.id.to_string();
        let conn = acquire_lock(&self.conn);

        timed("update_folder", || {
            with_transaction(&conn, |conn| {
                let updated = conn
                    .execute(
                        "UPDATE folders SET name = ?1, edited_at = ?2 WHERE id = ?3",
                        rusqlite::params![folder.name, to_db_timestamp(folder.edited_at), id],
                    )
                    .map_err(|e| Error::operation("update_folder", e))?;
                if updated == 0 {
                    return Err(Error::NotFound {
                        kind: NodeKind::Folder,
                        id: id.clone(),
                    });
                }

                let owner = ImageOwner::Folder(folder.id);
                let incoming = folder_to_record(folder).image;
                let keep = incoming.as_ref().and_then(|image| image.id).map(|i| i.to_string());
                let mut report = CascadeReport::default();
                let mut kept = false;
                for stored in read::fetch_images(conn, &owner, Blobs::Defer)? {
                    let Some(stored_id) = stored.id.map(|i| i.to_string()) else {
                        continue;
                    };
                    if keep.as_deref() == Some(stored_id.as_str()) {
                        kept = true;
                    } else if write::delete_image(conn, &stored_id)? {
                        report.records += 1;
                    }
                }

                if let (Some(image), Some(image_id)) = (incoming, keep) {
                    if !kept && write::identity_kind(conn, &image_id)?.is_some() {
                        return Err(Error::Duplicate {
                            kind: NodeKind::Image,
                            id: image_id,
                        });
                    }
                    write::write_image(conn, &image, Some(owner))?;
                }
                tracing::debug!(removed_images = report.records, "Updated folder");
                Ok(())
            })
        })
    }

    /// Deletes a folder with every descendant folder, recipe, section,
    /// item, and image.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the folder is not stored
    /// - [`Error::OperationFailed`] on storage failure; nothing is deleted
    #[instrument(skip(self), fields(folder_id = %id))]
    pub fn delete_folder(&self, id: FolderId) -> Result<CascadeReport> {
        let conn = acquire_lock(&self.conn);
        let report = timed("delete_folder", || {
            with_transaction(&conn, |conn| {
                let mut report = CascadeReport::default();
                if write::delete_folder_tree(conn, &id.to_string(), &mut report)? {
                    Ok(report)
                } else {
                    Err(Error::NotFound {
                        kind: NodeKind::Folder,
                        id: id.to_string(),
                    })
                }
            })
        })?;

        tracing::info!(
            folders = report.folders,
            recipes = report.recipes,
            records = report.records,
            "Deleted folder"
        );
        Ok(report)
    }

    /// Lists top-level folders without their children.
    ///
    /// Cover images come back without their bytes; see
    /// [`Self::fetch_image_data`].
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    #[instrument(skip(self))]
    pub fn list_root_folders(&self) -> Result<Vec<Folder>> {
        let conn = acquire_lock(&self.conn);
        let records = timed("list_root_folders", || {
            read::root_folder_ids(&conn)?
                .iter()
                .filter_map(|id| read::fetch_folder(&conn, id, Depth::Shallow).transpose())
                .collect::<Result<Vec<_>>>()
        })?;
        Ok(records
            .into_iter()
            .filter_map(|record| report_skipped(convert_folder(Some(record))))
            .collect())
    }

    // ------------------------------------------------------------------------
    // Recipes
    // ------------------------------------------------------------------------

    /// Stores a recipe subtree.
    ///
    /// Every identity in the recipe, its sections, items, and images is
    /// checked before anything is written.
    ///
    /// # Errors
    ///
    /// - [`Error::Duplicate`] if any identity in the subtree is already
    ///   stored or repeats within the subtree
    /// - [`Error::NotFound`] if the declared parent folder does not exist
    /// - [`Error::OperationFailed`] on storage failure
    #[instrument(skip(self, recipe), fields(recipe_id = %recipe.id, name = %recipe.name))]
    pub fn create_recipe(&self, recipe: &Recipe) -> Result<RecipeId> {
        let record = recipe_to_record(recipe);
        let conn = acquire_lock(&self.conn);

        timed("create_recipe", || {
            with_transaction(&conn, |conn| {
                write::ensure_unclaimed(conn, &write::recipe_claims(&record))?;
                let parent = existing_parent(conn, recipe.parent_id)?;

                with_savepoint(conn, "insert_subtree", |conn| {
                    write::write_recipe(conn, &record, Link::Detached)
                })?;
                with_savepoint(conn, "relink_subtree", |conn| {
                    let linked = write::relink_recipe(conn, &record)?;
                    write::link_recipe(conn, &recipe.id.to_string(), parent.as_deref())?;
                    tracing::debug!(linked, "Relinked recipe subtree");
                    Ok(())
                })
            })
        })?;

        metrics::counter!("cookbook_recipes_created_total").increment(1);
        Ok(recipe.id)
    }

    /// Reads a recipe subtree.
    ///
    /// # Errors
    ///
    /// Returns an error only on storage failure; an absent recipe is `Ok(None)`.
    pub fn retrieve_recipe(&self, id: RecipeId) -> Result<Option<Recipe>> {
        Ok(report_skipped(self.retrieve_recipe_with_diagnostics(id)?))
    }

    /// Reads a recipe subtree together with any records that were skipped.
    ///
    /// # Errors
    ///
    /// Returns an error only on storage failure.
    #[instrument(skip(self), fields(recipe_id = %id))]
    pub fn retrieve_recipe_with_diagnostics(&self, id: RecipeId) -> Result<Converted<Option<Recipe>>> {
        let conn = acquire_lock(&self.conn);
        let record = timed("retrieve_recipe", || {
            read::fetch_recipe(&conn, &id.to_string(), Blobs::Load)
        })?;
        Ok(convert_recipe(record))
    }

    /// Replaces a stored recipe with `recipe`.
    ///
    /// The name and edit timestamp are overwritten and the search string
    /// rebuilt. Sections, items, and images whose identity is still present
    /// are rewritten in place, new ones are inserted, and the rest are
    /// deleted. The recipe keeps its folder, position, and creation time.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the recipe is not stored
    /// - [`Error::Duplicate`] if an incoming child identity belongs to a
    ///   node outside this recipe
    /// - [`Error::OperationFailed`] on storage failure
    #[instrument(skip(self, recipe), fields(recipe_id = %recipe.id))]
    pub fn update_recipe(&self, recipe: &Recipe) -> Result<()> {
        let id = recipe.id.to_string();
        let conn = acquire_lock(&self.conn);

        timed("update_recipe", || {
            with_transaction(&conn, |conn| {
                let Some(stored) = read::fetch_recipe(conn, &id, Blobs::Defer)? else {
                    return Err(Error::NotFound {
                        kind: NodeKind::Recipe,
                        id: id.clone(),
                    });
                };

                let incoming = RecipeRecord {
                    folder_id: stored.folder_id,
                    position: stored.position,
                    created_at: stored.created_at,
                    ..recipe_to_record(recipe)
                };
                let claims = write::recipe_child_claims(&incoming);
                write::ensure_owned_by(conn, &recipe.id, &claims)?;

                write::write_recipe(conn, &incoming, Link::Attached)?;
                let removed = remove_stale_children(conn, &stored, &claims)?;
                tracing::debug!(removed, "Replaced recipe subtree");
                Ok(())
            })
        })
    }

    /// Deletes a recipe with its sections, items, and images.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the recipe is not stored
    /// - [`Error::OperationFailed`] on storage failure; nothing is deleted
    #[instrument(skip(self), fields(recipe_id = %id))]
    pub fn delete_recipe(&self, id: RecipeId) -> Result<CascadeReport> {
        let conn = acquire_lock(&self.conn);
        timed("delete_recipe", || {
            with_transaction(&conn, |conn| {
                let mut report = CascadeReport::default();
                if write::delete_recipe_tree(conn, &id.to_string(), &mut report)? {
                    Ok(report)
                } else {
                    Err(Error::NotFound {
                        kind: NodeKind::Recipe,
                        id: id.to_string(),
                    })
                }
            })
        })
    }

    /// Returns every recipe whose search string contains `query`,
    /// ignoring case.
    ///
    /// The query is not trimmed, so `"sea "` does not match "seashore". An
    /// empty or whitespace-only query returns every recipe. Images come back
    /// without their bytes; see [`Self::fetch_image_data`].
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    #[instrument(skip(self))]
    pub fn search_recipes(&self, query: &str) -> Result<Vec<Recipe>> {
        let needle = if query.trim().is_empty() {
            String::new()
        } else {
            query.to_lowercase()
        };
        let conn = acquire_lock(&self.conn);
        let records = timed("search_recipes", || {
            read::matching_recipe_ids(&conn, &needle)?
                .iter()
                .filter_map(|id| read::fetch_recipe(&conn, id, Blobs::Defer).transpose())
                .collect::<Result<Vec<_>>>()
        })?;

        let recipes: Vec<Recipe> = records
            .into_iter()
            .filter_map(|record| report_skipped(convert_recipe(Some(record))))
            .collect();
        tracing::debug!(results = recipes.len(), "Searched recipes");
        Ok(recipes)
    }

    /// Lists every stored recipe, in name order.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub fn list_recipes(&self) -> Result<Vec<Recipe>> {
        self.search_recipes("")
    }

    /// Reads the bytes of an image returned without them.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if no bytes are stored for `id`
    /// - [`Error::OperationFailed`] on storage failure
    #[instrument(skip(self), fields(image_id = %id))]
    pub fn fetch_image_data(&self, id: ImageId) -> Result<Vec<u8>> {
        let raw = id.to_string();
        let conn = acquire_lock(&self.conn);
        timed("fetch_image_data", || read::fetch_image_data(&conn, &raw))?.ok_or(
            Error::NotFound {
                kind: NodeKind::Image,
                id: raw,
            },
        )
    }
}

/// Resolves a declared parent folder, failing if it is not stored.
fn existing_parent(conn: &Connection, parent: Option<FolderId>) -> Result<Option<String>> {
    let Some(parent) = parent else {
        return Ok(None);
    };
    let parent = parent.to_string();
    if read::row_exists(conn, "folders", &parent)? {
        Ok(Some(parent))
    } else {
        Err(Error::NotFound {
            kind: NodeKind::Folder,
            id: parent,
        })
    }
}

/// Deletes stored children of a recipe that `keep` no longer claims.
///
/// Items go before sections so a section is only removed once nothing
/// still points at it.
fn remove_stale_children(
    conn: &Connection,
    stored: &RecipeRecord,
    keep: &[write::Claim],
) -> Result<usize> {
    let keep: HashSet<&str> = keep.iter().map(|(_, id)| id.as_str()).collect();
    let stale = |id: Option<String>| id.filter(|id| !keep.contains(id.as_str()));
    let mut report = CascadeReport::default();

    for section in &stored.ingredient_sections {
        for ingredient in &section.ingredients {
            if let Some(id) = stale(ingredient.id.map(|i| i.to_string()))
                && write::delete_row(conn, "ingredients", &id)?
            {
                report.records += 1;
            }
        }
    }
    for section in &stored.step_sections {
        for step in &section.steps {
            if let Some(id) = stale(step.id.map(|i| i.to_string())) {
                write::delete_step(conn, &id, &mut report)?;
            } else {
                for image in &step.images {
                    if let Some(id) = stale(image.id.map(|i| i.to_string()))
                        && write::delete_image(conn, &id)?
                    {
                        report.records += 1;
                    }
                }
            }
        }
    }
    for section in &stored.ingredient_sections {
        if let Some(id) = stale(section.id.map(|i| i.to_string())) {
            write::delete_ingredient_section(conn, &id, &mut report)?;
        }
    }
    for section in &stored.step_sections {
        if let Some(id) = stale(section.id.map(|i| i.to_string())) {
            write::delete_step_section(conn, &id, &mut report)?;
        }
    }
    for about in &stored.about_sections {
        if let Some(id) = stale(about.id.map(|i| i.to_string()))
            && write::delete_row(conn, "about_sections", &id)?
        {
            report.records += 1;
        }
    }
    for image in &stored.images {
        if let Some(id) = stale(image.id.map(|i| i.to_string()))
            && write::delete_image(conn, &id)?
        {
            report.records += 1;
        }
    }
    Ok(report.records)
}

fn convert_folder(record: Option<FolderRecord>) -> Converted<Option<Folder>> {
    record.map_or_else(
        || Converted {
            value: None,
            skipped: Vec::new(),
        },
        folder_from_record,
    )
}

fn convert_recipe(record: Option<RecipeRecord>) -> Converted<Option<Recipe>> {
    record.map_or_else(
        || Converted {
            value: None,
            skipped: Vec::new(),
        },
        recipe_from_record,
    )
}

/// Logs and counts skipped records, returning the converted value.
fn report_skipped<T>(converted: Converted<T>) -> T {
    for skipped in &converted.skipped {
        tracing::warn!(
            kind = %skipped.kind,
            id = skipped.id.as_deref().unwrap_or("-"),
            reason = %skipped.reason,
            "Skipped unreadable record"
        );
        metrics::counter!(
            "cookbook_conversion_skipped_total",
            "kind" => skipped.kind.as_str()
        )
        .increment(1);
    }
    converted.value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AboutSection, FolderKind, Image, Ingredient, IngredientSection, Step, StepSection,
    };

    fn store() -> SqliteRecipeStore {
        SqliteRecipeStore::in_memory().unwrap()
    }

    fn soup() -> Recipe {
        Recipe::new("Seashore Soup")
            .with_about_sections(vec![AboutSection::new("Notes", "Best with bread")])
            .unwrap()
            .with_ingredient_sections(vec![
                IngredientSection::new(
                    "Broth",
                    vec![
                        Ingredient::new("Water", 1.5, "l"),
                        Ingredient::new("Salt", 5.0, "g"),
                    ],
                )
                .unwrap(),
            ])
            .unwrap()
            .with_step_sections(vec![
                StepSection::new(
                    "Method",
                    vec![
                        Step::new("Boil the water")
                            .with_images(vec![Image::new(vec![1, 2, 3])])
                            .unwrap(),
                        Step::new("Season"),
                    ],
                )
                .unwrap(),
            ])
            .unwrap()
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = store();
        assert!(store.is_empty().unwrap());
        let status = store.status().unwrap();
        assert!(status.is_empty());
        assert_eq!(status.schema_version, schema::MIGRATIONS.len() as i32);
        assert!(store.db_path().is_none());
    }

    #[test]
    fn test_recipe_round_trip() {
        let store = store();
        let recipe = soup();
        let id = store.create_recipe(&recipe).unwrap();
        assert_eq!(store.retrieve_recipe(id).unwrap(), Some(recipe));
        assert!(!store.is_empty().unwrap());
    }

    #[test]
    fn test_recipe_with_missing_parent_is_rejected() {
        let store = store();
        let recipe = soup().with_parent(FolderId::generate());
        let err = store.create_recipe(&recipe).unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: NodeKind::Folder, .. }));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_recipe_child_collision_rejected() {
        let store = store();
        let first = soup();
        store.create_recipe(&first).unwrap();

        let mut second = Recipe::new("Other");
        second.about_sections = first.about_sections.clone();
        let err = store.create_recipe(&second).unwrap_err();
        assert!(matches!(err, Error::Duplicate { kind: NodeKind::AboutSection, .. }));
        assert_eq!(store.status().unwrap().recipes, 1);
    }

    #[test]
    fn test_update_recipe_replaces_subtree() {
        let store = store();
        let original = soup();
        store.create_recipe(&original).unwrap();

        let mut updated = original.clone();
        updated.name = "Harbour Soup".to_string();
        updated.step_sections = Vec::new().try_into().unwrap();
        let mut broth = updated.ingredient_sections.as_slice()[0].clone();
        broth.ingredients = vec![broth.ingredients[1].clone()].try_into().unwrap();
        updated.ingredient_sections = vec![broth].try_into().unwrap();

        store.update_recipe(&updated).unwrap();

        assert_eq!(store.retrieve_recipe(original.id).unwrap(), Some(updated));
        let status = store.status().unwrap();
        assert_eq!(status.ingredients, 1);
        assert_eq!(status.steps, 0);
        assert_eq!(status.step_sections, 0);
        assert_eq!(status.images, 0);
        assert!(store.search_recipes("seashore").unwrap().is_empty());
        assert_eq!(store.search_recipes("harbour").unwrap().len(), 1);
    }

    #[test]
    fn test_update_missing_recipe_is_not_found() {
        let store = store();
        let err = store.update_recipe(&soup()).unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: NodeKind::Recipe, .. }));
    }

    #[test]
    fn test_update_missing_folder_is_not_found() {
        let store = store();
        let folder = Folder::new("Ghost", FolderKind::User);
        let err = store.update_folder(&folder).unwrap_err();
        assert!(matches!(
            &err,
            Error::NotFound { kind: NodeKind::Folder, id } if *id == folder.id.to_string()
        ));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_update_recipe_moves_items_between_sections() {
        let store = store();
        let original = soup();
        store.create_recipe(&original).unwrap();

        let broth = &original.ingredient_sections[0];
        let salt = broth.ingredients[1].clone();
        let method = &original.step_sections[0];
        let boil = method.steps[0].clone();
        let season = method.steps[1].clone();
        let photo = boil.images[0].clone();

        // Salt moves to a new section; Season moves to a new step section
        // and takes the photo from Boil.
        let mut updated = original.clone();
        let mut kept_broth = broth.clone();
        kept_broth.ingredients = vec![broth.ingredients[0].clone()].try_into().unwrap();
        updated.ingredient_sections = vec![
            kept_broth,
            IngredientSection::new("Seasoning", vec![salt.clone()]).unwrap(),
        ]
        .try_into()
        .unwrap();
        let mut kept_method = method.clone();
        let mut bare_boil = boil.clone();
        bare_boil.images = Vec::new().try_into().unwrap();
        kept_method.steps = vec![bare_boil].try_into().unwrap();
        let mut finish = season.clone();
        finish.images = vec![photo.clone()].try_into().unwrap();
        updated.step_sections = vec![
            kept_method,
            StepSection::new("Finish", vec![finish]).unwrap(),
        ]
        .try_into()
        .unwrap();

        store.update_recipe(&updated).unwrap();

        let stored = store.retrieve_recipe(original.id).unwrap().unwrap();
        assert_eq!(stored, updated);
        assert_eq!(stored.ingredient_sections[1].ingredients[0].id, salt.id);
        assert!(stored.step_sections[0].steps[0].images.is_empty());
        assert_eq!(stored.step_sections[1].steps[0].id, season.id);
        assert_eq!(stored.step_sections[1].steps[0].images[0], photo);

        let status = store.status().unwrap();
        assert_eq!(status.ingredient_sections, 2);
        assert_eq!(status.ingredients, 2);
        assert_eq!(status.step_sections, 2);
        assert_eq!(status.steps, 2);
        assert_eq!(status.images, 1);
    }

    #[test]
    fn test_search_results_defer_image_bytes() {
        let store = store();
        let recipe = soup().with_images(vec![Image::new(vec![4, 5, 6])]).unwrap();
        store.create_recipe(&recipe).unwrap();

        let hit = store.search_recipes("seashore").unwrap().remove(0);
        assert!(!hit.images[0].is_loaded());
        assert!(!hit.step_sections[0].steps[0].images[0].is_loaded());
        assert_eq!(store.fetch_image_data(hit.images[0].id).unwrap(), vec![4, 5, 6]);

        // Writing back a recipe with deferred images keeps the stored bytes.
        let mut renamed = hit.clone();
        renamed.name = "Harbour Soup".to_string();
        store.update_recipe(&renamed).unwrap();
        let stored = store.retrieve_recipe(recipe.id).unwrap().unwrap();
        assert_eq!(stored.images, recipe.images);
        assert_eq!(stored.step_sections, recipe.step_sections);

        let err = store.fetch_image_data(crate::models::ImageId::generate()).unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: NodeKind::Image, .. }));
    }

    #[test]
    fn test_root_listing_defers_cover_bytes() {
        let store = store();
        let folder = Folder::new("Desserts", FolderKind::User).with_image(Image::new(vec![1, 1]));
        store.create_folder(&folder).unwrap();

        let mut listed = store.list_root_folders().unwrap().remove(0);
        let cover = listed.image.clone().unwrap();
        assert_eq!(cover.id, folder.image.as_ref().unwrap().id);
        assert!(!cover.is_loaded());

        listed.name = "Puddings".to_string();
        store.update_folder(&listed).unwrap();
        let stored = store.retrieve_folder(folder.id).unwrap().unwrap();
        assert_eq!(stored.name, "Puddings");
        assert_eq!(stored.image, folder.image);
    }

    #[test]
    fn test_image_without_bytes_must_already_be_stored() {
        let store = store();
        let recipe = Recipe::new("Blank")
            .with_images(vec![Image::deferred(crate::models::ImageId::generate())])
            .unwrap();
        let err = store.create_recipe(&recipe).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_search_query_is_not_trimmed() {
        let store = store();
        store.create_recipe(&soup()).unwrap();

        assert!(store.search_recipes("sea ").unwrap().is_empty());
        assert_eq!(store.search_recipes("seashore ").unwrap().len(), 1);
        assert_eq!(store.search_recipes("  ").unwrap().len(), 1);
    }

    #[test]
    fn test_update_folder_swaps_cover_image() {
        let store = store();
        let folder = Folder::new("Desserts", FolderKind::User).with_image(Image::new(vec![1]));
        store.create_folder(&folder).unwrap();

        let replaced = folder.clone().with_image(Image::new(vec![2, 2]));
        store.update_folder(&replaced).unwrap();
        assert_eq!(store.retrieve_folder(folder.id).unwrap(), Some(replaced));
        assert_eq!(store.status().unwrap().images, 1);

        let mut cleared = folder.clone();
        cleared.image = None;
        store.update_folder(&cleared).unwrap();
        assert_eq!(store.status().unwrap().images, 0);
    }

    #[test]
    fn test_delete_recipe_cascades() {
        let store = store();
        let recipe = soup();
        store.create_recipe(&recipe).unwrap();

        let report = store.delete_recipe(recipe.id).unwrap();
        assert_eq!(report.recipes, 1);
        // about, section, 2 ingredients, step section, 2 steps, 1 image
        assert_eq!(report.records, 8);
        assert_eq!(store.status().unwrap(), StoreStatus {
            schema_version: schema::MIGRATIONS.len() as i32,
            ..StoreStatus::default()
        });

        let err = store.delete_recipe(recipe.id).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_root_folders_listed_in_creation_order() {
        let store = store();
        let names = ["Breakfast", "Lunch", "Dinner"];
        for name in names {
            let folder = Folder::new(name, FolderKind::User)
                .with_folders(vec![Folder::new("Inner", FolderKind::User)])
                .unwrap();
            store.create_folder(&folder).unwrap();
        }

        let roots = store.list_root_folders().unwrap();
        let listed: Vec<&str> = roots.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(listed, names);
        assert!(roots.iter().all(|f| f.folders.is_empty()));
    }
}
