//! # Cookbook
//!
//! A persistent store for a recursive tree of recipe folders.
//!
//! Folders contain sub-folders and recipes; recipes contain ordered about,
//! ingredient, and step sections with nested items. The store keeps every
//! parent back-reference consistent, rejects identity collisions before they
//! reach the database, and cascades deletes through every owned descendant.
//!
//! ## Layers
//!
//! - [`models`]: value-semantic entities handed to and returned from the store
//! - [`storage`]: the position-ordered, back-referenced record graph and the
//!   `SQLite` engine that persists it
//! - [`services`]: the serialized async store façade, fixture seeding, and
//!   search ranking helpers
//!
//! ## Example
//!
//! ```rust,ignore
//! use cookbook::models::{Folder, FolderKind};
//! use cookbook::services::RecipeStore;
//!
//! let store = RecipeStore::in_memory()?;
//! let folder = Folder::new("Butter", FolderKind::User);
//! let id = store.create_folder(folder.clone()).await?;
//! assert_eq!(store.retrieve_folder(id).await?, Some(folder));
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use std::fmt;

use thiserror::Error as ThisError;

pub mod cli;
pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

pub use config::CookbookConfig;
pub use models::{
    AboutSection, Folder, FolderId, FolderKind, Image, Ingredient, IngredientSection, NodeKind,
    Recipe, RecipeId, Siblings, Step, StepSection,
};
pub use services::{LiveSearch, RecipeStore, Seeder};
pub use storage::{SqliteRecipeStore, StoreStatus};

/// Error type for cookbook operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Duplicate` | An identity in an incoming subtree already exists in the store |
/// | `NotFound` | An update or delete targets an identity that is not stored |
/// | `InvalidInput` | Sibling identity clash, malformed fixture, bad configuration |
/// | `OperationFailed` | `SQLite`, filesystem, or serialization failures |
#[derive(Debug, ThisError)]
pub enum Error {
    /// An identity collision was detected before insert.
    #[error("{kind} '{id}' already exists")]
    Duplicate {
        /// Kind of the incoming node that collided.
        kind: NodeKind,
        /// The colliding identity.
        id: String,
    },

    /// A mutation targeted a node that does not exist.
    #[error("{kind} '{id}' not found")]
    NotFound {
        /// Kind of the node that was targeted.
        kind: NodeKind,
        /// The missing identity.
        id: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds an [`Error::OperationFailed`] from an operation label and a cause.
    pub fn operation(operation: &str, cause: impl fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Collapses the error onto the three outcomes the UI layer distinguishes.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Duplicate { .. } => ErrorKind::Duplicate,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidInput(_) | Self::OperationFailed { .. } => ErrorKind::Failure,
        }
    }
}

/// Coarse error classification exposed to collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Identity collision on create.
    Duplicate,
    /// Mutation of a missing node.
    NotFound,
    /// Anything else; not retried automatically.
    Failure,
}

/// Result type alias for cookbook operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::operation("test", "failed");
        assert_eq!(err.to_string(), "operation 'test' failed: failed");

        let err = Error::Duplicate {
            kind: NodeKind::Recipe,
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "recipe 'abc' already exists");

        let err = Error::NotFound {
            kind: NodeKind::Folder,
            id: "xyz".to_string(),
        };
        assert_eq!(err.to_string(), "folder 'xyz' not found");
    }

    #[test]
    fn test_error_kind_mapping() {
        let dup = Error::Duplicate {
            kind: NodeKind::Step,
            id: "s".to_string(),
        };
        assert_eq!(dup.kind(), ErrorKind::Duplicate);
        assert_eq!(Error::InvalidInput(String::new()).kind(), ErrorKind::Failure);
        assert_eq!(Error::operation("x", "y").kind(), ErrorKind::Failure);
    }
}
