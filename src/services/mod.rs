//! Services built on the record store.
//!
//! - [`RecipeStore`]: the serialized async façade UI collaborators call
//! - [`Seeder`]: first-run population from a fixture tree
//! - [`ranking`]: match scores and excerpts for search results
//! - [`LiveSearch`]: debounced, last-query-wins search

mod live_search;
pub mod ranking;
mod seed;
mod store;

pub use live_search::{DEFAULT_DEBOUNCE, LiveSearch};
pub use ranking::{DEFAULT_EXCERPT_LEN, RankedRecipe, excerpt, match_score, rank};
pub use seed::{SeedOutcome, SeedReport, Seeder, SkippedFixture, capitalize, load_fixture_tree};
pub use store::RecipeStore;
