//! Serialized async access to the record store.
//!
//! [`RecipeStore`] is the boundary UI collaborators talk to. Each call is
//! moved onto tokio's blocking pool, where it takes the engine's connection
//! lock for its whole duration; calls therefore never interleave, and no
//! caller thread blocks on `SQLite`.

use crate::models::{Folder, FolderId, ImageId, Recipe, RecipeId};
use crate::storage::{CascadeReport, SqliteRecipeStore, StoreStatus};
use crate::{Error, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// Cloneable async handle to a [`SqliteRecipeStore`].
#[derive(Clone)]
pub struct RecipeStore {
    inner: Arc<SqliteRecipeStore>,
}

impl RecipeStore {
    /// Wraps an opened engine.
    #[must_use]
    pub fn new(engine: SqliteRecipeStore) -> Self {
        Self {
            inner: Arc::new(engine),
        }
    }

    /// Opens (or creates) a store file.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        SqliteRecipeStore::new(path).map(Self::new)
    }

    /// Creates an in-memory store that disappears with the process.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        SqliteRecipeStore::in_memory().map(Self::new)
    }

    /// The underlying engine, for synchronous callers.
    #[must_use]
    pub fn engine(&self) -> &SqliteRecipeStore {
        &self.inner
    }

    async fn run<T, F>(&self, operation: &'static str, body: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&SqliteRecipeStore) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || body(&inner))
            .await
            .map_err(|e| Error::operation(operation, format!("store task failed: {e}")))?
    }

    /// Reports what the store holds.
    ///
    /// The returned status tells the caller whether the store still needs
    /// seeding.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub async fn initialize(&self) -> Result<StoreStatus> {
        let status = self.run("initialize", SqliteRecipeStore::status).await?;
        tracing::info!(
            folders = status.folders,
            recipes = status.recipes,
            schema_version = status.schema_version,
            "Recipe store ready"
        );
        Ok(status)
    }

    /// See [`SqliteRecipeStore::status`].
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub async fn status(&self) -> Result<StoreStatus> {
        self.run("status", SqliteRecipeStore::status).await
    }

    /// See [`SqliteRecipeStore::is_empty`].
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub async fn is_empty(&self) -> Result<bool> {
        self.run("is_empty", SqliteRecipeStore::is_empty).await
    }

    /// See [`SqliteRecipeStore::create_folder`].
    ///
    /// # Errors
    ///
    /// `Duplicate`, `NotFound` for a missing parent, or a storage failure.
    pub async fn create_folder(&self, folder: Folder) -> Result<FolderId> {
        self.run("create_folder", move |store| store.create_folder(&folder))
            .await
    }

    /// See [`SqliteRecipeStore::retrieve_folder`].
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure only.
    pub async fn retrieve_folder(&self, id: FolderId) -> Result<Option<Folder>> {
        self.run("retrieve_folder", move |store| store.retrieve_folder(id))
            .await
    }

    /// See [`SqliteRecipeStore::update_folder`].
    ///
    /// # Errors
    ///
    /// `NotFound`, `Duplicate` for a reused image identity, or a storage failure.
    pub async fn update_folder(&self, folder: Folder) -> Result<()> {
        self.run("update_folder", move |store| store.update_folder(&folder))
            .await
    }

    /// See [`SqliteRecipeStore::delete_folder`].
    ///
    /// # Errors
    ///
    /// `NotFound` or a storage failure.
    pub async fn delete_folder(&self, id: FolderId) -> Result<CascadeReport> {
        self.run("delete_folder", move |store| store.delete_folder(id))
            .await
    }

    /// See [`SqliteRecipeStore::list_root_folders`].
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub async fn list_root_folders(&self) -> Result<Vec<Folder>> {
        self.run("list_root_folders", SqliteRecipeStore::list_root_folders)
            .await
    }

    /// See [`SqliteRecipeStore::create_recipe`].
    ///
    /// # Errors
    ///
    /// `Duplicate`, `NotFound` for a missing parent, or a storage failure.
    pub async fn create_recipe(&self, recipe: Recipe) -> Result<RecipeId> {
        self.run("create_recipe", move |store| store.create_recipe(&recipe))
            .await
    }

    /// See [`SqliteRecipeStore::retrieve_recipe`].
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure only.
    pub async fn retrieve_recipe(&self, id: RecipeId) -> Result<Option<Recipe>> {
        self.run("retrieve_recipe", move |store| store.retrieve_recipe(id))
            .await
    }

    /// See [`SqliteRecipeStore::update_recipe`].
    ///
    /// # Errors
    ///
    /// `NotFound`, `Duplicate`, or a storage failure.
    pub async fn update_recipe(&self, recipe: Recipe) -> Result<()> {
        self.run("update_recipe", move |store| store.update_recipe(&recipe))
            .await
    }

    /// See [`SqliteRecipeStore::delete_recipe`].
    ///
    /// # Errors
    ///
    /// `NotFound` or a storage failure.
    pub async fn delete_recipe(&self, id: RecipeId) -> Result<CascadeReport> {
        self.run("delete_recipe", move |store| store.delete_recipe(id))
            .await
    }

    /// See [`SqliteRecipeStore::search_recipes`].
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub async fn search_recipes(&self, query: impl Into<String>) -> Result<Vec<Recipe>> {
        let query = query.into();
        self.run("search_recipes", move |store| store.search_recipes(&query))
            .await
    }

    /// See [`SqliteRecipeStore::list_recipes`].
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub async fn list_recipes(&self) -> Result<Vec<Recipe>> {
        self.run("list_recipes", SqliteRecipeStore::list_recipes)
            .await
    }

    /// See [`SqliteRecipeStore::fetch_image_data`].
    ///
    /// # Errors
    ///
    /// `NotFound` if no bytes are stored for `id`, or a storage failure.
    pub async fn fetch_image_data(&self, id: ImageId) -> Result<Vec<u8>> {
        self.run("fetch_image_data", move |store| store.fetch_image_data(id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FolderKind, Image};

    #[tokio::test]
    async fn test_clones_share_one_store() {
        let store = RecipeStore::in_memory().unwrap();
        let other = store.clone();

        let folder = Folder::new("Shared", FolderKind::User);
        let id = store.create_folder(folder.clone()).await.unwrap();
        assert_eq!(other.retrieve_folder(id).await.unwrap(), Some(folder));
    }

    #[tokio::test]
    async fn test_listed_cover_loads_on_demand() {
        let store = RecipeStore::in_memory().unwrap();
        let folder = Folder::new("Covers", FolderKind::User).with_image(Image::new(vec![3, 1, 4]));
        store.create_folder(folder).await.unwrap();

        let listed = store.list_root_folders().await.unwrap();
        let cover = listed[0].image.clone().unwrap();
        assert!(cover.data.is_none());
        assert_eq!(store.fetch_image_data(cover.id).await.unwrap(), vec![3, 1, 4]);
    }

    #[tokio::test]
    async fn test_concurrent_creates_are_serialized() {
        let store = RecipeStore::in_memory().unwrap();
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .create_recipe(Recipe::new(format!("Recipe {i}")))
                        .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.status().await.unwrap().recipes, 16);
    }

    #[tokio::test]
    async fn test_initialize_reports_empty() {
        let store = RecipeStore::in_memory().unwrap();
        assert!(store.initialize().await.unwrap().is_empty());
        assert!(store.is_empty().await.unwrap());
    }
}
