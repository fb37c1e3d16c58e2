//! Pure derivations over catalog and progress snapshots.
//!
//! Nothing in here performs I/O or keeps state between calls, so every
//! function can be re-run on each snapshot event. Dangling references
//! (a progress record or step whose resource was deleted) are skipped.

mod dashboard;
mod filter;
mod path_detail;
mod stats;

pub use dashboard::{SearchResults, StartedPath, favorite_resources, search, user_learning_paths};
pub use filter::{CatalogFilter, Choice, filter_resources, resources_in_category};
pub use path_detail::{PathDetail, PathDetailStep, path_detail};
pub use stats::{FavoriteCounts, favorite_counts, path_completion_counts};
