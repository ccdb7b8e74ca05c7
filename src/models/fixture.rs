//! Versioned JSON schema for bundled recipe fixtures.
//!
//! Fixture files describe recipe content only. Timestamps are assigned when
//! the fixture is loaded; identities are taken from the file when present
//! and generated otherwise.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{
    AboutSectionId, IngredientId, IngredientSectionId, RecipeId, StepId, StepSectionId,
};
use super::image::{Image, base64_bytes};
use super::recipe::{AboutSection, Ingredient, IngredientSection, Recipe, Step, StepSection};
use super::siblings::Siblings;
use crate::{Error, Result};

/// Schema version understood by [`RecipeFixture::parse`].
pub const FIXTURE_SCHEMA_VERSION: u32 = 1;

/// A recipe as stored in a fixture file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeFixture {
    /// Schema version of the file.
    pub version: u32,
    /// Recipe identity.
    #[serde(default)]
    pub id: Option<RecipeId>,
    /// Recipe name.
    pub name: String,
    /// Base64-encoded images.
    #[serde(default)]
    pub images: Vec<FixtureBlob>,
    /// About sections.
    #[serde(default)]
    pub about: Vec<AboutFixture>,
    /// Ingredient sections.
    #[serde(default)]
    pub ingredients: Vec<IngredientSectionFixture>,
    /// Step sections.
    #[serde(default)]
    pub steps: Vec<StepSectionFixture>,
}

/// Raw image bytes encoded as base64 in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixtureBlob(#[serde(with = "base64_bytes")] pub Vec<u8>);

/// About section in a fixture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AboutFixture {
    /// Section identity.
    #[serde(default)]
    pub id: Option<AboutSectionId>,
    /// Heading.
    #[serde(default)]
    pub name: String,
    /// Body text.
    #[serde(default)]
    pub description: String,
}

/// Ingredient section in a fixture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientSectionFixture {
    /// Section identity.
    #[serde(default)]
    pub id: Option<IngredientSectionId>,
    /// Heading.
    #[serde(default)]
    pub name: String,
    /// Ingredients.
    #[serde(default)]
    pub ingredients: Vec<IngredientFixture>,
}

/// Ingredient in a fixture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientFixture {
    /// Ingredient identity.
    #[serde(default)]
    pub id: Option<IngredientId>,
    /// Name.
    pub name: String,
    /// Quantity.
    #[serde(default)]
    pub amount: f64,
    /// Unit of measure.
    #[serde(default)]
    pub unit: String,
}

/// Step section in a fixture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSectionFixture {
    /// Section identity.
    #[serde(default)]
    pub id: Option<StepSectionId>,
    /// Heading.
    #[serde(default)]
    pub name: String,
    /// Steps.
    #[serde(default)]
    pub steps: Vec<StepFixture>,
}

/// Step in a fixture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepFixture {
    /// Step identity.
    #[serde(default)]
    pub id: Option<StepId>,
    /// Instruction text.
    pub description: String,
    /// Base64-encoded images.
    #[serde(default)]
    pub images: Vec<FixtureBlob>,
}

impl RecipeFixture {
    /// Parses a fixture file, rejecting unknown schema versions.
    pub fn parse(json: &str) -> Result<Self> {
        let fixture: Self = serde_json::from_str(json)
            .map_err(|e| Error::InvalidInput(format!("malformed recipe fixture: {e}")))?;
        if fixture.version != FIXTURE_SCHEMA_VERSION {
            return Err(Error::InvalidInput(format!(
                "unsupported fixture version {} (expected {FIXTURE_SCHEMA_VERSION})",
                fixture.version
            )));
        }
        Ok(fixture)
    }

    /// Converts the fixture into a recipe stamped with `now`.
    pub fn into_recipe(self, now: DateTime<Utc>) -> Result<Recipe> {
        let mut recipe = Recipe::new(self.name);
        if let Some(id) = self.id {
            recipe.id = id;
        }
        recipe.created_at = now;
        recipe.edited_at = now;
        recipe.images = images_from(self.images)?;
        recipe.about_sections = Siblings::try_from_vec(
            self.about
                .into_iter()
                .map(|about| AboutSection {
                    id: about.id.unwrap_or_else(AboutSectionId::generate),
                    name: about.name,
                    description: about.description,
                })
                .collect(),
        )?;

        let mut ingredient_sections = Vec::with_capacity(self.ingredients.len());
        for section in self.ingredients {
            ingredient_sections.push(IngredientSection {
                id: section.id.unwrap_or_else(IngredientSectionId::generate),
                name: section.name,
                ingredients: Siblings::try_from_vec(
                    section
                        .ingredients
                        .into_iter()
                        .map(|i| Ingredient {
                            id: i.id.unwrap_or_else(IngredientId::generate),
                            name: i.name,
                            amount: i.amount,
                            unit: i.unit,
                        })
                        .collect(),
                )?,
            });
        }
        recipe.ingredient_sections = Siblings::try_from_vec(ingredient_sections)?;

        let mut step_sections = Vec::with_capacity(self.steps.len());
        for section in self.steps {
            let mut steps = Vec::with_capacity(section.steps.len());
            for step in section.steps {
                steps.push(Step {
                    id: step.id.unwrap_or_else(StepId::generate),
                    description: step.description,
                    images: images_from(step.images)?,
                });
            }
            step_sections.push(StepSection {
                id: section.id.unwrap_or_else(StepSectionId::generate),
                name: section.name,
                steps: Siblings::try_from_vec(steps)?,
            });
        }
        recipe.step_sections = Siblings::try_from_vec(step_sections)?;

        Ok(recipe)
    }
}

fn images_from(blobs: Vec<FixtureBlob>) -> Result<Siblings<Image>> {
    Siblings::try_from_vec(blobs.into_iter().map(|blob| Image::new(blob.0)).collect())
}

/// Images whose bytes were not loaded have nothing to export.
fn blobs_from(images: &[Image]) -> Vec<FixtureBlob> {
    images
        .iter()
        .filter_map(|image| image.data.clone().map(FixtureBlob))
        .collect()
}

/// Exports a stored recipe in fixture form.
///
/// Image identities are not part of the fixture schema and are dropped;
/// every other identity is kept.
impl From<&Recipe> for RecipeFixture {
    fn from(recipe: &Recipe) -> Self {
        Self {
            version: FIXTURE_SCHEMA_VERSION,
            id: Some(recipe.id),
            name: recipe.name.clone(),
            images: blobs_from(&recipe.images),
            about: recipe
                .about_sections
                .iter()
                .map(|about| AboutFixture {
                    id: Some(about.id),
                    name: about.name.clone(),
                    description: about.description.clone(),
                })
                .collect(),
            ingredients: recipe
                .ingredient_sections
                .iter()
                .map(|section| IngredientSectionFixture {
                    id: Some(section.id),
                    name: section.name.clone(),
                    ingredients: section
                        .ingredients
                        .iter()
                        .map(|i| IngredientFixture {
                            id: Some(i.id),
                            name: i.name.clone(),
                            amount: i.amount,
                            unit: i.unit.clone(),
                        })
                        .collect(),
                })
                .collect(),
            steps: recipe
                .step_sections
                .iter()
                .map(|section| StepSectionFixture {
                    id: Some(section.id),
                    name: section.name.clone(),
                    steps: section
                        .steps
                        .iter()
                        .map(|step| StepFixture {
                            id: Some(step.id),
                            description: step.description.clone(),
                            images: blobs_from(&step.images),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "version": 1,
        "id": "6f1c2b2e-8d4a-4c1e-9b7a-2f1d3c4b5a69",
        "name": "Seashore Chowder",
        "images": ["aGVsbG8="],
        "about": [{"name": "Story", "description": "Made by the sea."}],
        "ingredients": [
            {"name": "Base", "ingredients": [
                {"name": "Clams", "amount": 2, "unit": "lb"},
                {"name": "Salt"}
            ]}
        ],
        "steps": [
            {"name": "Method", "steps": [{"description": "Simmer."}]}
        ]
    }"#;

    #[test]
    fn test_parse_and_convert() {
        let now = Utc::now();
        let recipe = RecipeFixture::parse(FIXTURE)
            .unwrap()
            .into_recipe(now)
            .unwrap();

        assert_eq!(
            recipe.id.to_string(),
            "6f1c2b2e-8d4a-4c1e-9b7a-2f1d3c4b5a69"
        );
        assert_eq!(recipe.created_at, now);
        assert_eq!(recipe.edited_at, now);
        assert_eq!(recipe.images[0].data.as_deref(), Some(&b"hello"[..]));
        assert_eq!(recipe.about_sections[0].description, "Made by the sea.");

        let ingredients = &recipe.ingredient_sections[0].ingredients;
        assert_eq!(ingredients.len(), 2);
        assert!((ingredients[0].amount - 2.0).abs() < f64::EPSILON);
        assert_eq!(ingredients[1].unit, "");
        assert_eq!(recipe.step_sections[0].steps[0].description, "Simmer.");
    }

    #[test]
    fn test_rejects_unknown_version() {
        let json = FIXTURE.replace("\"version\": 1", "\"version\": 7");
        let err = RecipeFixture::parse(&json).unwrap_err();
        assert!(err.to_string().contains("unsupported fixture version 7"));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(RecipeFixture::parse("{\"version\": 1").is_err());
    }

    #[test]
    fn test_export_keeps_content_and_order() {
        let now = Utc::now();
        let recipe = RecipeFixture::parse(FIXTURE)
            .unwrap()
            .into_recipe(now)
            .unwrap();

        let exported = RecipeFixture::from(&recipe);
        assert_eq!(exported.version, FIXTURE_SCHEMA_VERSION);
        assert_eq!(exported.id, Some(recipe.id));
        assert_eq!(exported.ingredients[0].ingredients[0].name, "Clams");
        assert_eq!(exported.ingredients[0].ingredients[1].name, "Salt");

        let json = serde_json::to_string(&exported).unwrap();
        let again = RecipeFixture::parse(&json).unwrap().into_recipe(now).unwrap();
        assert_eq!(again.about_sections, recipe.about_sections);
        assert_eq!(again.step_sections, recipe.step_sections);
        assert_eq!(again.images[0].data, recipe.images[0].data);
    }

    #[test]
    fn test_missing_ids_are_generated() {
        let json = r#"{"version": 1, "name": "Toast"}"#;
        let a = RecipeFixture::parse(json).unwrap().into_recipe(Utc::now()).unwrap();
        let b = RecipeFixture::parse(json).unwrap().into_recipe(Utc::now()).unwrap();
        assert_ne!(a.id, b.id);
    }
}
