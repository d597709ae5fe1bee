//! Immutable per-computation snapshot of the recipe catalog

use std::collections::HashMap;

use rusqlite::Connection;

use crate::db;
use crate::error::CraftError;
use crate::models::Recipe;

/// A consistent, read-only view of the full recipe set.
///
/// Every computation takes its own snapshot up front, so concurrent queries
/// never observe a catalog that changes mid-traversal. For tests the snapshot
/// can be built directly from a recipe list without a database.
#[derive(Debug, Clone)]
pub struct Catalog {
    recipes: Vec<Recipe>,
    by_id: HashMap<String, usize>,
}

impl Catalog {
    pub fn from_recipes(recipes: Vec<Recipe>) -> Self {
        let by_id = recipes
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
        Catalog { recipes, by_id }
    }

    /// Loads a snapshot of every recipe in the database.
    pub fn load(conn: &Connection) -> Result<Self, CraftError> {
        let recipes = db::get_all_recipes(conn)?;
        tracing::debug!(recipes = recipes.len(), "loaded catalog snapshot");
        Ok(Self::from_recipes(recipes))
    }

    /// Looks up a recipe by its identifier.
    pub fn recipe(&self, id: &str) -> Option<&Recipe> {
        self.by_id.get(id).map(|&i| &self.recipes[i])
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}
