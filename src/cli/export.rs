//! Export a stored recipe as fixture JSON.

#![allow(clippy::print_stdout)]

use crate::models::{NodeKind, Recipe, RecipeFixture, RecipeId};
use crate::services::RecipeStore;
use crate::{Error, Result};
use std::path::Path;

/// Serializes `recipe` in the format the seeder reads.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn export_json(recipe: &Recipe) -> Result<String> {
    serde_json::to_string_pretty(&RecipeFixture::from(recipe))
        .map_err(|e| Error::operation("export_recipe", e))
}

/// Writes a recipe as fixture JSON to `output`, or stdout when unset.
///
/// # Errors
///
/// `InvalidInput` for a malformed id, `NotFound`, or an I/O failure.
pub async fn cmd_export_recipe(store: &RecipeStore, id: &str, output: Option<&Path>) -> Result<()> {
    let id: RecipeId = id.parse()?;
    let recipe = store
        .retrieve_recipe(id)
        .await?
        .ok_or_else(|| Error::NotFound {
            kind: NodeKind::Recipe,
            id: id.to_string(),
        })?;
    let json = export_json(&recipe)?;

    match output {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .map_err(|e| Error::operation("write_export", format!("{}: {e}", path.display())))?;
            tracing::info!(recipe = %id, path = %path.display(), "Exported recipe");
        },
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AboutSection, FIXTURE_SCHEMA_VERSION};

    #[tokio::test]
    async fn test_export_to_file_parses_back() {
        let store = RecipeStore::in_memory().unwrap();
        let recipe = Recipe::new("Seashore chowder")
            .with_about_sections(vec![AboutSection::new("Story", "Made by the sea.")])
            .unwrap();
        let id = store.create_recipe(recipe.clone()).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chowder.json");
        cmd_export_recipe(&store, &id.to_string(), Some(&path)).await.unwrap();

        let fixture = RecipeFixture::parse(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(fixture.version, FIXTURE_SCHEMA_VERSION);
        assert_eq!(fixture.id, Some(id));
        assert_eq!(fixture.about[0].description, "Made by the sea.");
    }
}
