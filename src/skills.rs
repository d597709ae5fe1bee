//! skill_craft_paths: which skills unlock recipes at their next level

use rusqlite::Connection;

use crate::db;
use crate::error::CraftError;
use crate::models::{
    SkillCraftPathsRequest, SkillCraftPathsResponse, SkillCraftPathsSummary, SkillUnlockPath,
};

const DEFAULT_LIMIT: usize = 10;

/// For each known skill below its max level, reports the recipes that unlock
/// exactly at the next level and the XP needed to get there. Paths are sorted
/// by how many recipes they unlock.
pub fn skill_craft_paths(
    conn: &Connection,
    req: &SkillCraftPathsRequest,
) -> Result<SkillCraftPathsResponse, CraftError> {
    let limit = if req.limit == 0 { DEFAULT_LIMIT } else { req.limit };

    let skill_ids = db::list_skill_ids(conn, req.category_filter.as_deref())?;
    let total_recipes = db::count_recipes(conn)?;

    let mut paths = Vec::new();
    let mut total_locked = 0;
    let mut closest_skill = String::new();
    let mut closest_xp = -1;

    for skill_id in &skill_ids {
        let Some(skill) = db::get_skill(conn, skill_id)? else {
            continue;
        };

        let progress = req.skills.get(skill_id).copied().unwrap_or_default();
        let current_level = progress.level;

        total_locked += db::count_recipes_locked_by_skill(conn, skill_id, current_level)?;

        let next_level = current_level + 1;
        if next_level > skill.max_level {
            continue;
        }

        let recipes_unlocked_at_next =
            db::find_recipes_unlocked_at_level(conn, skill_id, next_level)?;
        if recipes_unlocked_at_next.is_empty() {
            continue;
        }

        let xp_for_next = db::get_xp_for_level(conn, skill_id, next_level)?;
        let xp_to_next_level = (xp_for_next - progress.current_xp).max(0);

        if closest_xp < 0 || xp_to_next_level < closest_xp {
            closest_xp = xp_to_next_level;
            closest_skill = skill_id.clone();
        }

        paths.push(SkillUnlockPath {
            skill,
            current_level,
            xp_to_next_level,
            recipes_unlocked_at_next,
        });
    }

    // Most recipes unlocked first; skill id breaks ties
    paths.sort_by(|a, b| {
        b.recipes_unlocked_at_next
            .len()
            .cmp(&a.recipes_unlocked_at_next.len())
            .then_with(|| a.skill.id.cmp(&b.skill.id))
    });
    paths.truncate(limit);

    Ok(SkillCraftPathsResponse {
        skill_paths: paths,
        summary: SkillCraftPathsSummary {
            total_recipes,
            recipes_unlocked: total_recipes - total_locked,
            recipes_locked: total_locked,
            closest_unlock_skill: closest_skill,
            closest_unlock_xp: closest_xp.max(0),
        },
    })
}
