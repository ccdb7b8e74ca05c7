//! Entity model for the folder/recipe tree.
//!
//! Pure value types. Ordered collections keep the caller's order and refuse
//! repeated sibling identities; everything else about persistence lives in
//! [`crate::storage`].

mod fixture;
mod folder;
mod ids;
mod image;
mod recipe;
mod siblings;

pub use fixture::{
    AboutFixture, FIXTURE_SCHEMA_VERSION, FixtureBlob, IngredientFixture,
    IngredientSectionFixture, RecipeFixture, StepFixture, StepSectionFixture,
};
pub use folder::{Folder, FolderKind};
pub use ids::{
    AboutSectionId, FolderId, ImageId, IngredientId, IngredientSectionId, NodeKind, RecipeId,
    StepId, StepSectionId,
};
pub use image::{Image, base64_bytes};
pub use recipe::{AboutSection, Ingredient, IngredientSection, Recipe, Step, StepSection};
pub use siblings::{Identified, Siblings};
