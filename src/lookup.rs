//! recipe_lookup: fetch or search a single recipe with annotations

use rusqlite::Connection;

use crate::db;
use crate::engine;
use crate::error::CraftError;
use crate::models::{RecipeLookupRequest, RecipeLookupResponse};

const SEARCH_LIMIT: usize = 10;

/// Looks up a recipe by id or name search. A search that matches exactly one
/// recipe resolves to it; otherwise the hits are returned for the caller to
/// pick from. The resolved recipe is annotated with skill readiness, profit
/// (when a station is given) and the recipes consuming its output.
pub fn recipe_lookup(
    conn: &Connection,
    req: &RecipeLookupRequest,
) -> Result<RecipeLookupResponse, CraftError> {
    let mut resp = RecipeLookupResponse::default();

    let mut recipe_id = req.recipe_id.clone();
    if let Some(term) = &req.search {
        let hits = db::search_recipes(conn, term, SEARCH_LIMIT)?;
        if hits.len() == 1 && recipe_id.is_none() {
            recipe_id = Some(hits[0].recipe_id.clone());
        }
        resp.search_results = hits;
    }

    let Some(recipe_id) = recipe_id else {
        return Ok(resp);
    };
    let Some(recipe) = db::get_recipe(conn, &recipe_id)? else {
        return Ok(resp);
    };

    if !req.skills.is_empty() {
        let (ready, gaps) = engine::check_skill_requirements(conn, &recipe, &req.skills)?;
        resp.skill_ready = ready;
        resp.skill_gaps = gaps;
    }

    if let Some(station) = &req.station_id {
        resp.profit_analysis = engine::profit_analysis(conn, &recipe, station, 1)?;
    }

    resp.used_in_recipes =
        db::find_recipes_by_components(conn, std::slice::from_ref(&recipe.output.item_id))?;
    resp.recipe = Some(recipe);

    Ok(resp)
}
