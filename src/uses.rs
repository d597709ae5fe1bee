//! component_uses: reverse lookup of the recipes consuming an item

use rusqlite::Connection;

use crate::db;
use crate::engine;
use crate::error::CraftError;
use crate::models::{
    ComponentUseInfo, ComponentUsesRequest, ComponentUsesResponse, OptimizationStrategy,
};

/// Finds every recipe that consumes the given item, how much each craft
/// needs, and (optionally) whether the caller's skills allow crafting it.
pub fn component_uses(
    conn: &Connection,
    req: &ComponentUsesRequest,
) -> Result<ComponentUsesResponse, CraftError> {
    let strategy = req.strategy.unwrap_or_default();

    let recipe_ids =
        db::find_recipes_by_components(conn, std::slice::from_ref(&req.component_id))?;

    let mut used_in = Vec::new();
    for recipe_id in &recipe_ids {
        let Some(recipe) = db::get_recipe(conn, recipe_id)? else {
            continue;
        };

        let quantity_per_craft = recipe
            .components
            .iter()
            .find(|c| c.component_id == req.component_id)
            .map_or(0, |c| c.quantity);

        let (skill_ready, skill_gaps) = if req.skills.is_empty() {
            // No skill state given: assume ready
            (true, Vec::new())
        } else {
            let (ready, gaps) = engine::check_skill_requirements(conn, &recipe, &req.skills)?;
            if !req.include_skill_locked && !ready {
                continue;
            }
            (ready, gaps)
        };

        let profit_analysis = match &req.station_id {
            Some(station) => engine::profit_analysis(conn, &recipe, station, 1)?,
            None => None,
        };

        used_in.push(ComponentUseInfo {
            recipe,
            quantity_per_craft,
            skill_ready,
            skill_gaps,
            profit_analysis,
        });
    }

    sort_uses(&mut used_in, strategy);

    let market_sell_price = match &req.station_id {
        Some(station) => db::get_sell_price(conn, &req.component_id, station)?,
        None => 0,
    };

    Ok(ComponentUsesResponse {
        component_id: req.component_id.clone(),
        total_uses: used_in.len(),
        used_in,
        market_sell_price,
    })
}

fn sort_uses(uses: &mut [ComponentUseInfo], strategy: OptimizationStrategy) {
    uses.sort_by(|a, b| {
        let by_strategy = match strategy {
            OptimizationStrategy::MaximizeProfit => {
                let pa = a.profit_analysis.as_ref().map_or(0, |p| p.profit_per_unit);
                let pb = b.profit_analysis.as_ref().map_or(0, |p| p.profit_per_unit);
                pb.cmp(&pa)
            }
            // Recipes that use less of the component stretch a stock further
            OptimizationStrategy::MaximizeVolume => {
                a.quantity_per_craft.cmp(&b.quantity_per_craft)
            }
            OptimizationStrategy::UseInventoryFirst => {
                a.recipe.components.len().cmp(&b.recipe.components.len())
            }
            _ => b
                .skill_ready
                .cmp(&a.skill_ready)
                .then_with(|| a.recipe.components.len().cmp(&b.recipe.components.len())),
        };
        by_strategy.then_with(|| a.recipe.id.cmp(&b.recipe.id))
    });
}
