//! Identity types for every node in the folder/recipe graph.
//!
//! Each node kind has its own newtype so a step identity cannot be passed
//! where a folder identity is expected. All of them wrap a UUID and share a
//! single identity space inside the store: a folder and an ingredient may
//! never carry the same value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The kind of node an identity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A folder.
    Folder,
    /// A recipe.
    Recipe,
    /// An about section of a recipe.
    AboutSection,
    /// An ingredient section of a recipe.
    IngredientSection,
    /// An ingredient inside an ingredient section.
    Ingredient,
    /// A step section of a recipe.
    StepSection,
    /// A step inside a step section.
    Step,
    /// An image owned by a folder, recipe, or step.
    Image,
}

impl NodeKind {
    /// Returns the kind as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::Recipe => "recipe",
            Self::AboutSection => "about_section",
            Self::IngredientSection => "ingredient_section",
            Self::Ingredient => "ingredient",
            Self::StepSection => "step_section",
            Self::Step => "step",
            Self::Image => "image",
        }
    }

    /// Parses a kind from its stored string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "folder" => Some(Self::Folder),
            "recipe" => Some(Self::Recipe),
            "about_section" => Some(Self::AboutSection),
            "ingredient_section" => Some(Self::IngredientSection),
            "ingredient" => Some(Self::Ingredient),
            "step_section" => Some(Self::StepSection),
            "step" => Some(Self::Step),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().replace('_', " "))
    }
}

macro_rules! node_id {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// The node kind this identity belongs to.
            pub const KIND: NodeKind = $kind;

            /// Generates a new random identity.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the wrapped UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = crate::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self).map_err(|e| {
                    crate::Error::InvalidInput(format!("invalid {} id '{s}': {e}", $kind))
                })
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

node_id!(
    /// Identity of a folder.
    FolderId,
    NodeKind::Folder
);
node_id!(
    /// Identity of a recipe.
    RecipeId,
    NodeKind::Recipe
);
node_id!(
    /// Identity of an about section.
    AboutSectionId,
    NodeKind::AboutSection
);
node_id!(
    /// Identity of an ingredient section.
    IngredientSectionId,
    NodeKind::IngredientSection
);
node_id!(
    /// Identity of an ingredient.
    IngredientId,
    NodeKind::Ingredient
);
node_id!(
    /// Identity of a step section.
    StepSectionId,
    NodeKind::StepSection
);
node_id!(
    /// Identity of a step.
    StepId,
    NodeKind::Step
);
node_id!(
    /// Identity of an image.
    ImageId,
    NodeKind::Image
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_kind_round_trip() {
        for kind in [
            NodeKind::Folder,
            NodeKind::Recipe,
            NodeKind::AboutSection,
            NodeKind::IngredientSection,
            NodeKind::Ingredient,
            NodeKind::StepSection,
            NodeKind::Step,
            NodeKind::Image,
        ] {
            assert_eq!(NodeKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(NodeKind::parse("shelf"), None);
    }

    #[test]
    fn test_node_kind_display() {
        assert_eq!(NodeKind::IngredientSection.to_string(), "ingredient section");
        assert_eq!(NodeKind::Folder.to_string(), "folder");
    }

    #[test]
    fn test_id_parse() {
        let id = FolderId::generate();
        let parsed: FolderId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);

        let err = "not-a-uuid".parse::<RecipeId>().unwrap_err();
        assert!(err.to_string().contains("invalid recipe id"));
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        assert_ne!(StepId::generate(), StepId::generate());
    }
}
