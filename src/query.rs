//! craft_query: what can be crafted from given components and skills

use std::time::Instant;

use rusqlite::Connection;

use crate::engine;
use crate::error::CraftError;
use crate::models::{
    CraftQueryRequest, CraftQueryResponse, CraftableMatch, OptimizationStrategy,
    PartialComponentMatch, QueryStats,
};
use crate::db;

const DEFAULT_LIMIT: usize = 20;
const DEFAULT_MIN_MATCH_RATIO: f64 = 0.25;

/// Matches the caller's inventory and skills against every recipe touching
/// those components, split into craftable / partial / skill-blocked sections.
pub fn craft_query(
    conn: &Connection,
    req: &CraftQueryRequest,
) -> Result<CraftQueryResponse, CraftError> {
    let started = Instant::now();

    let limit = if req.limit == 0 { DEFAULT_LIMIT } else { req.limit };
    let min_match_ratio = if req.min_match_ratio <= 0.0 {
        DEFAULT_MIN_MATCH_RATIO
    } else {
        req.min_match_ratio
    };
    let strategy = req.strategy.unwrap_or_default();

    let inventory = engine::build_inventory_map(&req.components);
    let component_ids: Vec<String> = req.components.iter().map(|c| c.id.clone()).collect();

    // Candidates come from the inverted component index; a category filter
    // additionally pulls in that whole category.
    let mut candidate_ids = db::find_recipes_by_components(conn, &component_ids)?;
    if let Some(category) = &req.category_filter {
        candidate_ids.extend(db::list_recipes_by_category(conn, category)?);
        candidate_ids.sort();
        candidate_ids.dedup();
    }

    let mut craftable = Vec::new();
    let mut partial_components = Vec::new();
    let mut blocked_by_skills = Vec::new();

    for recipe_id in &candidate_ids {
        let Some(recipe) = db::get_recipe(conn, recipe_id)? else {
            continue;
        };
        if let Some(category) = &req.category_filter {
            if recipe.category != *category {
                continue;
            }
        }

        let matched = engine::match_components(&recipe, &inventory);
        let ratio = engine::match_ratio(matched.have.len(), recipe.components.len());
        let (skills_ready, skill_gaps) =
            engine::check_skill_requirements(conn, &recipe, &req.skills)?;

        let profit_analysis = match &req.station_id {
            Some(station) => engine::profit_analysis(conn, &recipe, station, matched.can_craft)?,
            None => None,
        };

        if ratio == 1.0 && skills_ready {
            craftable.push(CraftableMatch {
                recipe,
                can_craft_quantity: matched.can_craft,
                profit_analysis,
            });
        } else if ratio == 1.0 {
            // All components on hand, blocked by skills only
            blocked_by_skills.push(PartialComponentMatch {
                recipe,
                components_have: matched.have,
                components_missing: matched.missing,
                match_ratio: ratio,
                skills_ready: false,
                skills_missing: skill_gaps,
                profit_analysis,
            });
        } else if req.include_partial && ratio >= min_match_ratio {
            partial_components.push(PartialComponentMatch {
                recipe,
                components_have: matched.have,
                components_missing: matched.missing,
                match_ratio: ratio,
                skills_ready,
                skills_missing: skill_gaps,
                profit_analysis,
            });
        }
    }

    sort_craftable(&mut craftable, strategy);
    sort_partial(&mut partial_components, strategy);
    sort_partial(&mut blocked_by_skills, strategy);

    craftable.truncate(limit);
    partial_components.truncate(limit);
    blocked_by_skills.truncate(limit);

    Ok(CraftQueryResponse {
        craftable,
        partial_components,
        blocked_by_skills,
        query_stats: QueryStats {
            total_recipes_checked: candidate_ids.len(),
            components_provided: req.components.len(),
            strategy_used: strategy.as_str().to_string(),
            processing_time_ms: started.elapsed().as_millis() as i64,
        },
    })
}

/// Sorts craftable matches by strategy, tie-broken by recipe id so the order
/// never depends on how candidates were enumerated.
fn sort_craftable(matches: &mut [CraftableMatch], strategy: OptimizationStrategy) {
    matches.sort_by(|a, b| {
        let by_strategy = match strategy {
            OptimizationStrategy::MaximizeProfit => {
                profit_per_unit(b).cmp(&profit_per_unit(a))
            }
            OptimizationStrategy::OptimizeCraftPath => {
                a.recipe.components.len().cmp(&b.recipe.components.len())
            }
            // The remaining strategies all rank by how many crafts the
            // inventory supports.
            _ => b.can_craft_quantity.cmp(&a.can_craft_quantity),
        };
        by_strategy.then_with(|| a.recipe.id.cmp(&b.recipe.id))
    });
}

fn profit_per_unit(m: &CraftableMatch) -> i64 {
    m.profit_analysis.as_ref().map_or(0, |p| p.profit_per_unit)
}

fn sort_partial(matches: &mut [PartialComponentMatch], strategy: OptimizationStrategy) {
    matches.sort_by(|a, b| {
        let by_strategy = match strategy {
            OptimizationStrategy::MaximizeProfit => {
                let pa = a.profit_analysis.as_ref().map_or(0, |p| p.profit_per_unit);
                let pb = b.profit_analysis.as_ref().map_or(0, |p| p.profit_per_unit);
                pb.cmp(&pa)
            }
            OptimizationStrategy::MinimizeAcquisition => a
                .components_missing
                .len()
                .cmp(&b.components_missing.len()),
            OptimizationStrategy::OptimizeCraftPath => {
                a.recipe.components.len().cmp(&b.recipe.components.len())
            }
            // Closer to fully craftable first
            _ => b.match_ratio.total_cmp(&a.match_ratio),
        };
        by_strategy.then_with(|| a.recipe.id.cmp(&b.recipe.id))
    });
}
