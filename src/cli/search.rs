//! Search CLI command.

#![allow(clippy::print_stdout)]

use crate::Result;
use crate::services::{RankedRecipe, RecipeStore, rank};
use std::fmt::Write;

/// Formats ranked results, best first, at most `limit` of them.
#[must_use]
pub fn render_results(query: &str, results: &[RankedRecipe], limit: usize) -> String {
    let mut out = String::new();
    if results.is_empty() {
        let _ = writeln!(out, "No recipes match '{query}'.");
        return out;
    }

    let shown = results.len().min(limit);
    let _ = writeln!(out, "{} match(es) for '{query}', showing {shown}:", results.len());
    for (n, result) in results.iter().take(limit).enumerate() {
        let score = result
            .score
            .map_or_else(|| "-".to_string(), |score| score.to_string());
        let _ = writeln!(
            out,
            "\n{}. {} [{score}]  {}\n   {}",
            n + 1,
            result.recipe.name,
            result.recipe.id,
            result.excerpt
        );
    }
    out
}

/// Searches recipes and prints ranked excerpts.
///
/// # Errors
///
/// Returns an error on storage failure.
pub async fn cmd_search(
    store: &RecipeStore,
    query: &str,
    limit: usize,
    excerpt_len: usize,
) -> Result<()> {
    let recipes = store.search_recipes(query).await?;
    let ranked = rank(query, recipes, excerpt_len);
    print!("{}", render_results(query, &ranked, limit));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AboutSection, Recipe};

    #[test]
    fn test_render_results_limits_and_numbers() {
        let recipes = vec![
            Recipe::new("Seashore chowder")
                .with_about_sections(vec![AboutSection::new("Story", "Seashore classic")])
                .unwrap(),
            Recipe::new("Seashore salad"),
            Recipe::new("Seashore pie"),
        ];
        let ranked = rank("seashore", recipes, 80);

        let out = render_results("seashore", &ranked, 2);
        assert!(out.starts_with("3 match(es) for 'seashore', showing 2:\n"));
        assert!(out.contains("\n1. Seashore chowder [16]"));
        assert!(out.contains("\n2. Seashore salad [8]"));
        assert!(!out.contains("Seashore pie"));
    }

    #[test]
    fn test_render_no_results() {
        assert_eq!(render_results("kale", &[], 10), "No recipes match 'kale'.\n");
    }
}
