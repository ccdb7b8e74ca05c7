//! Recipe entities and their nested sections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{
    AboutSectionId, FolderId, IngredientId, IngredientSectionId, RecipeId, StepId, StepSectionId,
};
use super::image::Image;
use super::siblings::{Identified, Siblings};
use crate::Result;

/// A recipe with ordered images and sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Identity of the recipe.
    pub id: RecipeId,
    /// Folder that owns this recipe, if any.
    pub parent_id: Option<FolderId>,
    /// Display name.
    pub name: String,
    /// Ordered images.
    #[serde(default)]
    pub images: Siblings<Image>,
    /// Ordered free-text sections.
    #[serde(default)]
    pub about_sections: Siblings<AboutSection>,
    /// Ordered ingredient lists.
    #[serde(default)]
    pub ingredient_sections: Siblings<IngredientSection>,
    /// Ordered method sections.
    #[serde(default)]
    pub step_sections: Siblings<StepSection>,
    /// When the recipe was created.
    pub created_at: DateTime<Utc>,
    /// When the recipe was last edited.
    pub edited_at: DateTime<Utc>,
}

impl Recipe {
    /// Creates an empty recipe with a fresh identity.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: RecipeId::generate(),
            parent_id: None,
            name: name.into(),
            images: Siblings::new(),
            about_sections: Siblings::new(),
            ingredient_sections: Siblings::new(),
            step_sections: Siblings::new(),
            created_at: now,
            edited_at: now,
        }
    }

    /// Sets the owning folder.
    #[must_use]
    pub const fn with_parent(mut self, parent: FolderId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    /// Replaces the images.
    pub fn with_images(mut self, images: Vec<Image>) -> Result<Self> {
        self.images = Siblings::try_from_vec(images)?;
        Ok(self)
    }

    /// Replaces the about sections.
    pub fn with_about_sections(mut self, sections: Vec<AboutSection>) -> Result<Self> {
        self.about_sections = Siblings::try_from_vec(sections)?;
        Ok(self)
    }

    /// Replaces the ingredient sections.
    pub fn with_ingredient_sections(mut self, sections: Vec<IngredientSection>) -> Result<Self> {
        self.ingredient_sections = Siblings::try_from_vec(sections)?;
        Ok(self)
    }

    /// Replaces the step sections.
    pub fn with_step_sections(mut self, sections: Vec<StepSection>) -> Result<Self> {
        self.step_sections = Siblings::try_from_vec(sections)?;
        Ok(self)
    }

    /// Builds the derived search string.
    ///
    /// Name plus every section's name, description, and item text,
    /// lower-cased and joined with single spaces. Recomputed wholesale on
    /// every write; never patched incrementally.
    #[must_use]
    pub fn search_string(&self) -> String {
        let mut parts: Vec<&str> = vec![self.name.as_str()];
        for about in &self.about_sections {
            parts.push(&about.name);
            parts.push(&about.description);
        }
        for section in &self.ingredient_sections {
            parts.push(&section.name);
            for ingredient in &section.ingredients {
                parts.push(&ingredient.name);
                parts.push(&ingredient.unit);
            }
        }
        for section in &self.step_sections {
            parts.push(&section.name);
            for step in &section.steps {
                parts.push(&step.description);
            }
        }
        join_words(parts).to_lowercase()
    }

    /// Flattened descriptive text used for excerpts and ranking.
    ///
    /// Name, about descriptions, ingredient names, and step text, in that
    /// order. Case is preserved.
    #[must_use]
    pub fn description_text(&self) -> String {
        let mut parts: Vec<&str> = vec![self.name.as_str()];
        parts.extend(self.about_sections.iter().map(|a| a.description.as_str()));
        parts.extend(
            self.ingredient_sections
                .iter()
                .flat_map(|s| s.ingredients.iter().map(|i| i.name.as_str())),
        );
        parts.extend(
            self.step_sections
                .iter()
                .flat_map(|s| s.steps.iter().map(|step| step.description.as_str())),
        );
        join_words(parts)
    }
}

fn join_words<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

impl Identified for Recipe {
    type Id = RecipeId;

    fn id(&self) -> RecipeId {
        self.id
    }
}

/// Free-text section of a recipe (story, notes, serving suggestions).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AboutSection {
    /// Identity of the section.
    pub id: AboutSectionId,
    /// Heading.
    pub name: String,
    /// Body text.
    pub description: String,
}

impl AboutSection {
    /// Creates a section with a fresh identity.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: AboutSectionId::generate(),
            name: name.into(),
            description: description.into(),
        }
    }
}

impl Identified for AboutSection {
    type Id = AboutSectionId;

    fn id(&self) -> AboutSectionId {
        self.id
    }
}

/// A named list of ingredients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientSection {
    /// Identity of the section.
    pub id: IngredientSectionId,
    /// Heading.
    pub name: String,
    /// Ordered ingredients.
    #[serde(default)]
    pub ingredients: Siblings<Ingredient>,
}

impl IngredientSection {
    /// Creates a section with a fresh identity.
    pub fn new(name: impl Into<String>, ingredients: Vec<Ingredient>) -> Result<Self> {
        Ok(Self {
            id: IngredientSectionId::generate(),
            name: name.into(),
            ingredients: Siblings::try_from_vec(ingredients)?,
        })
    }
}

impl Identified for IngredientSection {
    type Id = IngredientSectionId;

    fn id(&self) -> IngredientSectionId {
        self.id
    }
}

/// A single ingredient line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    /// Identity of the ingredient.
    pub id: IngredientId,
    /// What the ingredient is.
    pub name: String,
    /// Quantity; never negative once read back from the store.
    pub amount: f64,
    /// Unit of measure, free text.
    pub unit: String,
}

impl Ingredient {
    /// Creates an ingredient with a fresh identity.
    #[must_use]
    pub fn new(name: impl Into<String>, amount: f64, unit: impl Into<String>) -> Self {
        Self {
            id: IngredientId::generate(),
            name: name.into(),
            amount,
            unit: unit.into(),
        }
    }
}

impl Identified for Ingredient {
    type Id = IngredientId;

    fn id(&self) -> IngredientId {
        self.id
    }
}

/// A named list of method steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSection {
    /// Identity of the section.
    pub id: StepSectionId,
    /// Heading.
    pub name: String,
    /// Ordered steps.
    #[serde(default)]
    pub steps: Siblings<Step>,
}

impl StepSection {
    /// Creates a section with a fresh identity.
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Result<Self> {
        Ok(Self {
            id: StepSectionId::generate(),
            name: name.into(),
            steps: Siblings::try_from_vec(steps)?,
        })
    }
}

impl Identified for StepSection {
    type Id = StepSectionId;

    fn id(&self) -> StepSectionId {
        self.id
    }
}

/// One instruction, optionally illustrated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Identity of the step.
    pub id: StepId,
    /// Instruction text.
    pub description: String,
    /// Ordered images.
    #[serde(default)]
    pub images: Siblings<Image>,
}

impl Step {
    /// Creates a step with a fresh identity and no images.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: StepId::generate(),
            description: description.into(),
            images: Siblings::new(),
        }
    }

    /// Replaces the images.
    pub fn with_images(mut self, images: Vec<Image>) -> Result<Self> {
        self.images = Siblings::try_from_vec(images)?;
        Ok(self)
    }
}

impl Identified for Step {
    type Id = StepId;

    fn id(&self) -> StepId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Recipe {
        Recipe::new("Seashore  Chowder")
            .with_about_sections(vec![AboutSection::new("Story", "From the\tCOAST")])
            .unwrap()
            .with_ingredient_sections(vec![
                IngredientSection::new(
                    "Base",
                    vec![
                        Ingredient::new("Clams", 2.0, "lb"),
                        Ingredient::new("Cream", 1.5, "Cups"),
                    ],
                )
                .unwrap(),
            ])
            .unwrap()
            .with_step_sections(vec![
                StepSection::new("Method", vec![Step::new("Simmer gently.")]).unwrap(),
            ])
            .unwrap()
    }

    #[test]
    fn test_search_string_is_lowercase_and_space_joined() {
        assert_eq!(
            sample().search_string(),
            "seashore chowder story from the coast base clams lb cream cups method simmer gently."
        );
    }

    #[test]
    fn test_description_text_keeps_case() {
        assert_eq!(
            sample().description_text(),
            "Seashore Chowder From the COAST Clams Cream Simmer gently."
        );
    }

    #[test]
    fn test_duplicate_sections_rejected() {
        let about = AboutSection::new("a", "b");
        let result = Recipe::new("x").with_about_sections(vec![about.clone(), about]);
        assert!(result.is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let recipe = sample();
        let json = serde_json::to_string(&recipe).unwrap();
        let back: Recipe = serde_json::from_str(&json).unwrap();
        assert_eq!(back, recipe);
    }
}
