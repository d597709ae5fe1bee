//! craft_path_to: single-level material gap analysis for one recipe

use rusqlite::Connection;

use crate::db;
use crate::engine;
use crate::error::CraftError;
use crate::models::{
    CraftPathRequest, CraftPathResponse, CraftPathSummary, CraftPathTarget, MaterialRequirement,
};

/// Expands one recipe a single level deep against the current inventory:
/// what is needed, what is on hand, and how the rest could be acquired.
pub fn craft_path_to(
    conn: &Connection,
    req: &CraftPathRequest,
) -> Result<CraftPathResponse, CraftError> {
    let quantity = req.target_quantity.max(1);

    let Some(recipe) = db::get_recipe(conn, &req.target_recipe_id)? else {
        return Ok(CraftPathResponse {
            target: CraftPathTarget {
                recipe_id: req.target_recipe_id.clone(),
                recipe_name: String::new(),
                quantity,
            },
            feasible: false,
            skill_ready: false,
            skills_missing: Vec::new(),
            materials_needed: Vec::new(),
            craft_time_sec: 0,
            summary: CraftPathSummary::default(),
        });
    };

    let inventory = engine::build_inventory_map(&req.current_inventory);
    let (skill_ready, skills_missing) =
        engine::check_skill_requirements(conn, &recipe, &req.skills)?;

    let mut materials_needed = Vec::with_capacity(recipe.components.len());
    for comp in &recipe.components {
        let quantity_needed = comp.quantity * quantity;
        let quantity_have = inventory.get(&comp.component_id).copied().unwrap_or(0);
        let quantity_to_acquire = (quantity_needed - quantity_have).max(0);

        let producing = db::find_recipes_by_output(conn, &comp.component_id)?;
        let is_craftable = !producing.is_empty();
        let craft_recipe_id = producing.into_iter().next();

        let mut acquisition_methods = Vec::new();
        if quantity_to_acquire > 0 {
            if let Some(station) = &req.station_id {
                if db::get_buy_price(conn, &comp.component_id, station)? > 0 {
                    acquisition_methods.push(format!("buy:{station}"));
                }
            }
            if let Some(recipe_id) = &craft_recipe_id {
                acquisition_methods.push(format!("craft:{recipe_id}"));
            }
        }

        materials_needed.push(MaterialRequirement {
            component_id: comp.component_id.clone(),
            quantity_needed,
            quantity_have,
            quantity_to_acquire,
            acquisition_methods,
            is_craftable,
            craft_recipe_id,
        });
    }

    let summary = summarize(&materials_needed);

    // Feasible unless some shortfall can be neither bought nor crafted.
    let feasible = materials_needed
        .iter()
        .all(|m| m.quantity_to_acquire == 0 || !m.acquisition_methods.is_empty() || m.is_craftable);

    Ok(CraftPathResponse {
        target: CraftPathTarget {
            recipe_id: recipe.id.clone(),
            recipe_name: recipe.name.clone(),
            quantity,
        },
        feasible,
        skill_ready,
        skills_missing,
        materials_needed,
        craft_time_sec: recipe.craft_time_sec * quantity,
        summary,
    })
}

fn summarize(materials: &[MaterialRequirement]) -> CraftPathSummary {
    let mut summary = CraftPathSummary {
        total_components: materials.len(),
        ..CraftPathSummary::default()
    };

    for mat in materials {
        if mat.quantity_have >= mat.quantity_needed {
            summary.components_have += 1;
        }
        if mat.quantity_to_acquire > 0 {
            summary.components_to_acquire += 1;
            if mat.is_craftable {
                summary.components_craftable += 1;
            }
        }
    }

    summary
}
