//! Persistent record model.
//!
//! Records mirror the entity model with two additions: every child carries a
//! nullable back-reference to its structural parent, and every member of an
//! ordered collection carries an explicit `position`. Storage returns
//! children in no particular order, so `position` is the only source of
//! ordering on read.
//!
//! Parent links are identity values, never live references; resolving a
//! parent is a lookup. Fields the storage layer may fail to populate are
//! `Option`s so a damaged row can be skipped instead of aborting a read.

use crate::models::{
    AboutSectionId, FolderId, ImageId, IngredientId, IngredientSectionId, NodeKind, RecipeId,
    StepId, StepSectionId,
};

/// Persisted folder.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FolderRecord {
    /// Identity.
    pub id: Option<FolderId>,
    /// Back-reference to the enclosing folder.
    pub parent_id: Option<FolderId>,
    /// Index among sibling folders.
    pub position: i64,
    /// Display name.
    pub name: Option<String>,
    /// Stored folder kind.
    pub kind: Option<String>,
    /// Creation time, nanoseconds since the epoch.
    pub created_at: Option<i64>,
    /// Last edit time, nanoseconds since the epoch.
    pub edited_at: Option<i64>,
    /// Cover image.
    pub image: Option<ImageRecord>,
    /// Child folders, unordered.
    pub folders: Vec<Self>,
    /// Child recipes, unordered.
    pub recipes: Vec<RecipeRecord>,
}

/// Persisted recipe.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecipeRecord {
    /// Identity.
    pub id: Option<RecipeId>,
    /// Back-reference to the owning folder.
    pub folder_id: Option<FolderId>,
    /// Index among sibling recipes.
    pub position: i64,
    /// Display name.
    pub name: Option<String>,
    /// Derived, lower-cased search string.
    pub search_text: String,
    /// Creation time, nanoseconds since the epoch.
    pub created_at: Option<i64>,
    /// Last edit time, nanoseconds since the epoch.
    pub edited_at: Option<i64>,
    /// Images, unordered.
    pub images: Vec<ImageRecord>,
    /// About sections, unordered.
    pub about_sections: Vec<AboutSectionRecord>,
    /// Ingredient sections, unordered.
    pub ingredient_sections: Vec<IngredientSectionRecord>,
    /// Step sections, unordered.
    pub step_sections: Vec<StepSectionRecord>,
}

/// Persisted about section.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AboutSectionRecord {
    /// Identity.
    pub id: Option<AboutSectionId>,
    /// Back-reference to the recipe.
    pub recipe_id: Option<RecipeId>,
    /// Index among sibling about sections.
    pub position: i64,
    /// Heading.
    pub name: Option<String>,
    /// Body text.
    pub description: Option<String>,
}

/// Persisted ingredient section.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IngredientSectionRecord {
    /// Identity.
    pub id: Option<IngredientSectionId>,
    /// Back-reference to the recipe.
    pub recipe_id: Option<RecipeId>,
    /// Index among sibling ingredient sections.
    pub position: i64,
    /// Heading.
    pub name: Option<String>,
    /// Ingredients, unordered.
    pub ingredients: Vec<IngredientRecord>,
}

/// Persisted ingredient.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IngredientRecord {
    /// Identity.
    pub id: Option<IngredientId>,
    /// Back-reference to the ingredient section.
    pub section_id: Option<IngredientSectionId>,
    /// Index within the section.
    pub position: i64,
    /// Name.
    pub name: Option<String>,
    /// Stored quantity; may be negative in damaged data.
    pub amount: Option<f64>,
    /// Unit of measure.
    pub unit: Option<String>,
}

/// Persisted step section.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StepSectionRecord {
    /// Identity.
    pub id: Option<StepSectionId>,
    /// Back-reference to the recipe.
    pub recipe_id: Option<RecipeId>,
    /// Index among sibling step sections.
    pub position: i64,
    /// Heading.
    pub name: Option<String>,
    /// Steps, unordered.
    pub steps: Vec<StepRecord>,
}

/// Persisted step.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StepRecord {
    /// Identity.
    pub id: Option<StepId>,
    /// Back-reference to the step section.
    pub section_id: Option<StepSectionId>,
    /// Index within the section.
    pub position: i64,
    /// Instruction text.
    pub description: Option<String>,
    /// Images, unordered.
    pub images: Vec<ImageRecord>,
}

/// The node an image belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageOwner {
    /// Folder cover image.
    Folder(FolderId),
    /// Recipe image.
    Recipe(RecipeId),
    /// Step illustration.
    Step(StepId),
}

impl ImageOwner {
    /// Kind of the owning node.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Folder(_) => NodeKind::Folder,
            Self::Recipe(_) => NodeKind::Recipe,
            Self::Step(_) => NodeKind::Step,
        }
    }

    /// Identity of the owning node as stored.
    #[must_use]
    pub fn id_string(&self) -> String {
        match self {
            Self::Folder(id) => id.to_string(),
            Self::Recipe(id) => id.to_string(),
            Self::Step(id) => id.to_string(),
        }
    }
}

/// State of an image's bytes, which live in a separate blob table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BlobRecord {
    /// Bytes read from, or to be written to, the blob table.
    Loaded(Vec<u8>),
    /// Bytes exist but were not read; writing leaves them untouched.
    Deferred,
    /// No blob row exists.
    #[default]
    Missing,
}

/// Persisted image.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageRecord {
    /// Identity.
    pub id: Option<ImageId>,
    /// Back-reference to the owner.
    pub owner: Option<ImageOwner>,
    /// Index among the owner's images.
    pub position: i64,
    /// Raw bytes.
    pub data: BlobRecord,
}

/// Anything with a `position` field.
pub trait Positioned {
    /// Index among siblings.
    fn position(&self) -> i64;
}

macro_rules! positioned {
    ($($record:ty),* $(,)?) => {
        $(
            impl Positioned for $record {
                fn position(&self) -> i64 {
                    self.position
                }
            }
        )*
    };
}

positioned!(
    FolderRecord,
    RecipeRecord,
    AboutSectionRecord,
    IngredientSectionRecord,
    IngredientRecord,
    StepSectionRecord,
    StepRecord,
    ImageRecord,
);

/// Sorts a child group into its persisted order.
///
/// The sort is stable, so records sharing a position keep storage order.
pub fn sort_by_position<T: Positioned>(records: &mut [T]) {
    records.sort_by_key(Positioned::position);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_by_position() {
        let mut steps: Vec<StepRecord> = [2, 0, 1]
            .into_iter()
            .map(|position| StepRecord {
                position,
                description: Some(format!("step {position}")),
                ..StepRecord::default()
            })
            .collect();

        sort_by_position(&mut steps);

        let order: Vec<i64> = steps.iter().map(|s| s.position).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_image_owner_kind() {
        let step = StepId::generate();
        let owner = ImageOwner::Step(step);
        assert_eq!(owner.kind(), NodeKind::Step);
        assert_eq!(owner.id_string(), step.to_string());
    }
}
