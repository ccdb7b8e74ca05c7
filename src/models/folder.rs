//! Folder entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::FolderId;
use super::image::Image;
use super::recipe::Recipe;
use super::siblings::{Identified, Siblings};
use crate::Result;

/// What role a folder plays in the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderKind {
    /// Virtual folder listing every recipe.
    All,
    /// Built-in folder.
    Standard,
    /// Holding area for deleted recipes.
    RecentlyDeleted,
    /// Folder created by the user (or seeded from fixtures).
    User,
}

impl FolderKind {
    /// Returns the kind as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Standard => "standard",
            Self::RecentlyDeleted => "recently_deleted",
            Self::User => "user",
        }
    }

    /// Parses a kind from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "all" => Some(Self::All),
            "standard" => Some(Self::Standard),
            "recently_deleted" | "recently-deleted" | "recentlydeleted" => {
                Some(Self::RecentlyDeleted)
            },
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

impl fmt::Display for FolderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A folder holding sub-folders and recipes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    /// Identity of the folder.
    pub id: FolderId,
    /// Enclosing folder, if any.
    pub parent_id: Option<FolderId>,
    /// Display name.
    pub name: String,
    /// Optional cover image.
    pub image: Option<Image>,
    /// Ordered child folders.
    #[serde(default)]
    pub folders: Siblings<Self>,
    /// Ordered child recipes.
    #[serde(default)]
    pub recipes: Siblings<Recipe>,
    /// Role of the folder.
    pub kind: FolderKind,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
    /// When the folder was last edited.
    pub edited_at: DateTime<Utc>,
}

impl Folder {
    /// Creates an empty top-level folder with a fresh identity.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FolderKind) -> Self {
        let now = Utc::now();
        Self {
            id: FolderId::generate(),
            parent_id: None,
            name: name.into(),
            image: None,
            folders: Siblings::new(),
            recipes: Siblings::new(),
            kind,
            created_at: now,
            edited_at: now,
        }
    }

    /// Sets the enclosing folder.
    #[must_use]
    pub const fn with_parent(mut self, parent: FolderId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    /// Sets the cover image.
    #[must_use]
    pub fn with_image(mut self, image: Image) -> Self {
        self.image = Some(image);
        self
    }

    /// Replaces the child folders, pointing each at this folder.
    pub fn with_folders(mut self, folders: Vec<Self>) -> Result<Self> {
        self.folders = Siblings::new();
        for folder in folders {
            self.push_folder(folder)?;
        }
        Ok(self)
    }

    /// Replaces the child recipes, pointing each at this folder.
    pub fn with_recipes(mut self, recipes: Vec<Recipe>) -> Result<Self> {
        self.recipes = Siblings::new();
        for recipe in recipes {
            self.push_recipe(recipe)?;
        }
        Ok(self)
    }

    /// Appends a child folder, pointing it at this folder.
    pub fn push_folder(&mut self, mut folder: Self) -> Result<()> {
        folder.parent_id = Some(self.id);
        self.folders.push(folder)
    }

    /// Appends a child recipe, pointing it at this folder.
    pub fn push_recipe(&mut self, mut recipe: Recipe) -> Result<()> {
        recipe.parent_id = Some(self.id);
        self.recipes.push(recipe)
    }

    /// Number of folders in this subtree, including this one.
    #[must_use]
    pub fn folder_count(&self) -> usize {
        1 + self.folders.iter().map(Self::folder_count).sum::<usize>()
    }

    /// Number of recipes anywhere in this subtree.
    #[must_use]
    pub fn recipe_count(&self) -> usize {
        self.recipes.len() + self.folders.iter().map(Self::recipe_count).sum::<usize>()
    }
}

impl Identified for Folder {
    type Id = FolderId;

    fn id(&self) -> FolderId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_kind_parse() {
        assert_eq!(FolderKind::parse("USER"), Some(FolderKind::User));
        assert_eq!(
            FolderKind::parse("recently-deleted"),
            Some(FolderKind::RecentlyDeleted)
        );
        assert_eq!(FolderKind::parse("pantry"), None);
        for kind in [
            FolderKind::All,
            FolderKind::Standard,
            FolderKind::RecentlyDeleted,
            FolderKind::User,
        ] {
            assert_eq!(FolderKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_children_point_at_parent() {
        let folder = Folder::new("Burgers", FolderKind::User)
            .with_folders(vec![Folder::new("Smash", FolderKind::User)])
            .unwrap()
            .with_recipes(vec![Recipe::new("Classic")])
            .unwrap();

        assert_eq!(folder.folders[0].parent_id, Some(folder.id));
        assert_eq!(folder.recipes[0].parent_id, Some(folder.id));
    }

    #[test]
    fn test_subtree_counts() {
        let inner = Folder::new("Inner", FolderKind::User)
            .with_recipes(vec![Recipe::new("a"), Recipe::new("b")])
            .unwrap();
        let outer = Folder::new("Outer", FolderKind::User)
            .with_folders(vec![inner])
            .unwrap()
            .with_recipes(vec![Recipe::new("c")])
            .unwrap();

        assert_eq!(outer.folder_count(), 2);
        assert_eq!(outer.recipe_count(), 3);
    }

    #[test]
    fn test_duplicate_child_rejected() {
        let child = Folder::new("Twin", FolderKind::User);
        let result = Folder::new("Parent", FolderKind::User).with_folders(vec![child.clone(), child]);
        assert!(result.is_err());
    }
}
