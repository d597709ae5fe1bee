//! Shared helpers for the single-level query tools

use std::collections::HashMap;

use rusqlite::Connection;

use crate::db;
use crate::error::CraftError;
use crate::models::{Component, ProfitAnalysis, Recipe, RecipeComponent, SkillGap};

/// Converts a component list to a quantity map for O(1) lookups.
pub fn build_inventory_map(components: &[Component]) -> HashMap<String, i64> {
    let mut map = HashMap::with_capacity(components.len());
    for c in components {
        *map.entry(c.id.clone()).or_insert(0) += c.quantity;
    }
    map
}

/// Checks the given skill levels against a recipe's requirements.
///
/// Returns whether all requirements are met and the gaps for those that are
/// not, each annotated with the XP needed for the next level.
pub fn check_skill_requirements(
    conn: &Connection,
    recipe: &Recipe,
    agent_skills: &HashMap<String, i64>,
) -> Result<(bool, Vec<SkillGap>), CraftError> {
    let mut ready = true;
    let mut gaps = Vec::new();

    for req in &recipe.skills_required {
        let current_level = agent_skills.get(&req.skill_id).copied().unwrap_or(0);
        if current_level >= req.level_required {
            continue;
        }
        ready = false;

        let skill_name = db::get_skill_name(conn, &req.skill_id)?
            .unwrap_or_else(|| req.skill_id.clone());
        let xp_to_next = db::get_xp_for_level(conn, &req.skill_id, current_level + 1)?;

        gaps.push(SkillGap {
            skill_id: req.skill_id.clone(),
            skill_name,
            current_level,
            required_level: req.level_required,
            xp_to_next,
        });
    }

    Ok((ready, gaps))
}

/// Result of matching an inventory against one recipe's component list.
#[derive(Debug, Default)]
pub struct ComponentMatch {
    pub have: Vec<RecipeComponent>,
    pub missing: Vec<RecipeComponent>,
    /// How many complete crafts the inventory supports.
    pub can_craft: i64,
}

/// Compares the inventory against a recipe's components, single level.
pub fn match_components(recipe: &Recipe, inventory: &HashMap<String, i64>) -> ComponentMatch {
    if recipe.components.is_empty() {
        return ComponentMatch::default();
    }

    let mut matched = ComponentMatch::default();
    let mut can_craft: i64 = -1;

    for req in &recipe.components {
        let available = inventory.get(&req.component_id).copied().unwrap_or(0);

        if available >= req.quantity {
            matched.have.push(req.clone());
            let crafts_with_this = available / req.quantity;
            if can_craft < 0 || crafts_with_this < can_craft {
                can_craft = crafts_with_this;
            }
        } else if available > 0 {
            // Some but not enough
            matched.have.push(RecipeComponent {
                component_id: req.component_id.clone(),
                quantity: available,
            });
            matched.missing.push(RecipeComponent {
                component_id: req.component_id.clone(),
                quantity: req.quantity - available,
            });
            can_craft = 0;
        } else {
            matched.missing.push(req.clone());
            can_craft = 0;
        }
    }

    matched.can_craft = can_craft.max(0);
    matched
}

/// Ratio of matched components to total components.
pub fn match_ratio(have: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    have as f64 / total as f64
}

/// Market profit metrics for a recipe at a station.
///
/// Returns `None` when the station has no sell price for the output item.
pub fn profit_analysis(
    conn: &Connection,
    recipe: &Recipe,
    station_id: &str,
    can_craft_quantity: i64,
) -> Result<Option<ProfitAnalysis>, CraftError> {
    let output_sell_price = db::get_sell_price(conn, &recipe.output.item_id, station_id)?;
    if output_sell_price == 0 {
        return Ok(None);
    }

    let mut input_cost = 0;
    for comp in &recipe.components {
        let buy_price = db::get_buy_price(conn, &comp.component_id, station_id)?;
        input_cost += buy_price * comp.quantity;
    }

    let profit_per_unit = output_sell_price * recipe.output.quantity - input_cost;
    let profit_margin_pct = if input_cost > 0 {
        profit_per_unit as f64 / input_cost as f64 * 100.0
    } else {
        0.0
    };

    let market_volume_24h = db::get_volume_24h(conn, &recipe.output.item_id, station_id)?;
    let price_trend = db::get_price_trend(conn, &recipe.output.item_id, station_id)?;

    let total_potential_profit = if can_craft_quantity > 0 {
        profit_per_unit * can_craft_quantity
    } else {
        0
    };

    Ok(Some(ProfitAnalysis {
        output_sell_price,
        input_cost,
        profit_per_unit,
        profit_margin_pct,
        total_potential_profit,
        market_volume_24h,
        price_trend,
    }))
}
