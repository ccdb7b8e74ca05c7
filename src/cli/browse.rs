//! Read-only browsing commands: `folders`, `show-folder`, `show-recipe`.

#![allow(clippy::print_stdout)]

use crate::models::{Folder, FolderId, NodeKind, Recipe, RecipeId};
use crate::services::RecipeStore;
use crate::{Error, Result};
use std::fmt::Write;

const INDENT: &str = "  ";

/// Renders a folder and everything below it, one node per line.
#[must_use]
pub fn render_folder_tree(folder: &Folder) -> String {
    let mut out = String::new();
    write_folder(&mut out, folder, 0);
    out
}

fn write_folder(out: &mut String, folder: &Folder, depth: usize) {
    let pad = INDENT.repeat(depth);
    let cover = if folder.image.is_some() { " [cover]" } else { "" };
    let _ = writeln!(out, "{pad}{}/ ({}){cover}  {}", folder.name, folder.kind, folder.id);
    for child in &folder.folders {
        write_folder(out, child, depth + 1);
    }
    for recipe in &folder.recipes {
        let _ = writeln!(out, "{pad}{INDENT}{}  {}", recipe.name, recipe.id);
    }
}

fn format_amount(amount: f64, unit: &str) -> String {
    match (amount.abs() < f64::EPSILON, unit.is_empty()) {
        (true, true) => String::new(),
        (true, false) => format!("{unit} "),
        (false, true) => format!("{amount} "),
        (false, false) => format!("{amount} {unit} "),
    }
}

/// Renders a recipe in reading order.
#[must_use]
pub fn render_recipe(recipe: &Recipe) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", recipe.name);
    let _ = writeln!(out, "{}", "=".repeat(recipe.name.chars().count()));
    let _ = writeln!(
        out,
        "id: {}  images: {}  edited: {}",
        recipe.id,
        recipe.images.len(),
        recipe.edited_at.format("%Y-%m-%d %H:%M")
    );

    for about in &recipe.about_sections {
        let _ = writeln!(out, "\n## {}\n{}", about.name, about.description);
    }
    for section in &recipe.ingredient_sections {
        let _ = writeln!(out, "\n## {}", section.name);
        for ingredient in &section.ingredients {
            let _ = writeln!(
                out,
                "- {}{}",
                format_amount(ingredient.amount, &ingredient.unit),
                ingredient.name
            );
        }
    }
    for section in &recipe.step_sections {
        let _ = writeln!(out, "\n## {}", section.name);
        for (n, step) in section.steps.iter().enumerate() {
            let images = match step.images.len() {
                0 => String::new(),
                count => format!(" ({count} images)"),
            };
            let _ = writeln!(out, "{}. {}{images}", n + 1, step.description);
        }
    }
    out
}

/// Lists root folders.
///
/// # Errors
///
/// Returns an error on storage failure.
pub async fn cmd_folders(store: &RecipeStore) -> Result<()> {
    let folders = store.list_root_folders().await?;
    if folders.is_empty() {
        println!("No folders.");
        return Ok(());
    }
    for folder in folders {
        println!("{}  {} ({})", folder.id, folder.name, folder.kind);
    }
    Ok(())
}

/// Prints a folder tree.
///
/// # Errors
///
/// `InvalidInput` for a malformed id, `NotFound`, or a storage failure.
pub async fn cmd_show_folder(store: &RecipeStore, id: &str) -> Result<()> {
    let id: FolderId = id.parse()?;
    let folder = store
        .retrieve_folder(id)
        .await?
        .ok_or_else(|| Error::NotFound {
            kind: NodeKind::Folder,
            id: id.to_string(),
        })?;
    print!("{}", render_folder_tree(&folder));
    Ok(())
}

/// Prints a recipe.
///
/// # Errors
///
/// `InvalidInput` for a malformed id, `NotFound`, or a storage failure.
pub async fn cmd_show_recipe(store: &RecipeStore, id: &str) -> Result<()> {
    let id: RecipeId = id.parse()?;
    let recipe = store
        .retrieve_recipe(id)
        .await?
        .ok_or_else(|| Error::NotFound {
            kind: NodeKind::Recipe,
            id: id.to_string(),
        })?;
    print!("{}", render_recipe(&recipe));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FolderKind, Image, Ingredient, IngredientSection, Step, StepSection};

    #[test]
    fn test_render_folder_tree_nests() {
        let child = Folder::new("Burger Recipes", FolderKind::User)
            .with_recipes(vec![Recipe::new("Smash burger")])
            .unwrap();
        let root = Folder::new("Butter", FolderKind::User)
            .with_image(Image::new(vec![1, 2]))
            .with_folders(vec![child])
            .unwrap();

        let out = render_folder_tree(&root);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Butter/ (user) [cover]"));
        assert!(lines[1].starts_with("  Burger Recipes/ (user)"));
        assert!(lines[2].starts_with("    Smash burger"));
    }

    #[test]
    fn test_render_recipe_sections() {
        let recipe = Recipe::new("Chowder")
            .with_ingredient_sections(vec![
                IngredientSection::new(
                    "Base",
                    vec![Ingredient::new("Clams", 2.0, "lb"), Ingredient::new("Salt", 0.0, "")],
                )
                .unwrap(),
            ])
            .unwrap()
            .with_step_sections(vec![
                StepSection::new("Method", vec![Step::new("Simmer.")]).unwrap(),
            ])
            .unwrap();

        let out = render_recipe(&recipe);
        assert!(out.starts_with("Chowder\n=======\n"));
        assert!(out.contains("- 2 lb Clams\n"));
        assert!(out.contains("- Salt\n"));
        assert!(out.contains("## Method\n1. Simmer.\n"));
    }

    #[tokio::test]
    async fn test_show_missing_folder_is_not_found() {
        let store = RecipeStore::in_memory().unwrap();
        let err = cmd_show_folder(&store, &FolderId::generate().to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: NodeKind::Folder, .. }));
    }

    #[tokio::test]
    async fn test_show_recipe_rejects_bad_id() {
        let store = RecipeStore::in_memory().unwrap();
        let err = cmd_show_recipe(&store, "not-a-uuid").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
