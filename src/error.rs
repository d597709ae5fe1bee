//! Error types for the query engine

use thiserror::Error;

/// Errors produced while answering a crafting query.
#[derive(Debug, Error)]
pub enum CraftError {
    /// The requested target recipe has no catalog entry.
    #[error("recipe not found: {0}")]
    RecipeNotFound(String),

    /// A producible item transitively requires its own output.
    #[error("cycle detected: item {0} has a circular dependency")]
    CycleDetected(String),

    /// The dependency graph could not be ordered even though the closure
    /// traversal accepted it. Indicates a bug, not bad catalog data.
    #[error("inconsistent dependency graph: {0}")]
    Inconsistent(&'static str),

    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

impl CraftError {
    /// The item at which a cycle was detected, if this is a cycle error.
    pub fn cycle_item(&self) -> Option<&str> {
        match self {
            CraftError::CycleDetected(item) => Some(item),
            _ => None,
        }
    }
}
