//! Database schema and operations

use rusqlite::{Connection, OptionalExtension, Result};

use crate::models::{Recipe, RecipeComponent, RecipeOutput, RecipeSearchHit, Skill, SkillRequirement};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Recipe definitions
        CREATE TABLE IF NOT EXISTS recipes (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL DEFAULT '',
            craft_time_sec INTEGER NOT NULL DEFAULT 0,
            output_item_id TEXT NOT NULL,
            output_quantity INTEGER NOT NULL DEFAULT 1
        );

        -- Input components per recipe
        CREATE TABLE IF NOT EXISTS recipe_components (
            recipe_id TEXT NOT NULL,
            component_id TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            PRIMARY KEY (recipe_id, component_id)
        );

        -- Skill levels required per recipe
        CREATE TABLE IF NOT EXISTS recipe_skills (
            recipe_id TEXT NOT NULL,
            skill_id TEXT NOT NULL,
            level_required INTEGER NOT NULL,
            PRIMARY KEY (recipe_id, skill_id)
        );

        -- Skill definitions
        CREATE TABLE IF NOT EXISTS skills (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            max_level INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS skill_prerequisites (
            skill_id TEXT NOT NULL,
            prereq_skill_id TEXT NOT NULL,
            level_required INTEGER NOT NULL,
            PRIMARY KEY (skill_id, prereq_skill_id)
        );

        -- XP needed per skill level
        CREATE TABLE IF NOT EXISTS skill_levels (
            skill_id TEXT NOT NULL,
            level INTEGER NOT NULL,
            xp_required INTEGER NOT NULL,
            PRIMARY KEY (skill_id, level)
        );

        -- Raw market price observations
        CREATE TABLE IF NOT EXISTS market_prices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            component_id TEXT NOT NULL,
            station_id TEXT NOT NULL,
            price_type TEXT NOT NULL,
            price INTEGER NOT NULL,
            volume_24h INTEGER,
            recorded_at TEXT NOT NULL
        );

        -- Aggregated prices used for profit analysis
        CREATE TABLE IF NOT EXISTS market_price_summary (
            component_id TEXT NOT NULL,
            station_id TEXT NOT NULL,
            price_type TEXT NOT NULL,
            avg_price_7d REAL NOT NULL,
            min_price_7d INTEGER NOT NULL,
            max_price_7d INTEGER NOT NULL,
            price_trend TEXT NOT NULL DEFAULT 'stable',
            last_updated TEXT,
            PRIMARY KEY (component_id, station_id, price_type)
        );

        CREATE TABLE IF NOT EXISTS sync_metadata (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Indexes for common lookups
        CREATE INDEX IF NOT EXISTS idx_recipes_output ON recipes(output_item_id);
        CREATE INDEX IF NOT EXISTS idx_recipes_category ON recipes(category);
        CREATE INDEX IF NOT EXISTS idx_recipe_components_component ON recipe_components(component_id);
        CREATE INDEX IF NOT EXISTS idx_recipe_skills_skill ON recipe_skills(skill_id);
        CREATE INDEX IF NOT EXISTS idx_market_prices_lookup ON market_prices(component_id, station_id, price_type);
        "#,
    )?;
    Ok(())
}

// ============================================================================
// Recipes
// ============================================================================

/// Get a single recipe with its components and skill requirements
pub fn get_recipe(conn: &Connection, id: &str) -> Result<Option<Recipe>> {
    let base = conn
        .query_row(
            "SELECT id, name, description, category, craft_time_sec, output_item_id, output_quantity
             FROM recipes WHERE id = ?1",
            [id],
            scan_recipe_row,
        )
        .optional()?;

    let Some(mut recipe) = base else {
        return Ok(None);
    };
    recipe.components = get_recipe_components(conn, id)?;
    recipe.skills_required = get_recipe_skills(conn, id)?;
    Ok(Some(recipe))
}

fn scan_recipe_row(row: &rusqlite::Row<'_>) -> Result<Recipe> {
    Ok(Recipe {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        craft_time_sec: row.get(4)?,
        components: Vec::new(),
        skills_required: Vec::new(),
        output: RecipeOutput {
            item_id: row.get(5)?,
            quantity: row.get(6)?,
        },
    })
}

fn get_recipe_components(conn: &Connection, recipe_id: &str) -> Result<Vec<RecipeComponent>> {
    let mut stmt = conn.prepare(
        "SELECT component_id, quantity FROM recipe_components
         WHERE recipe_id = ?1 ORDER BY component_id",
    )?;
    let rows = stmt.query_map([recipe_id], |row| {
        Ok(RecipeComponent {
            component_id: row.get(0)?,
            quantity: row.get(1)?,
        })
    })?;
    rows.collect()
}

fn get_recipe_skills(conn: &Connection, recipe_id: &str) -> Result<Vec<SkillRequirement>> {
    let mut stmt = conn.prepare(
        "SELECT skill_id, level_required FROM recipe_skills
         WHERE recipe_id = ?1 ORDER BY skill_id",
    )?;
    let rows = stmt.query_map([recipe_id], |row| {
        Ok(SkillRequirement {
            skill_id: row.get(0)?,
            level_required: row.get(1)?,
        })
    })?;
    rows.collect()
}

/// Get all recipes with their components and skill requirements
pub fn get_all_recipes(conn: &Connection) -> Result<Vec<Recipe>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, category, craft_time_sec, output_item_id, output_quantity
         FROM recipes ORDER BY id",
    )?;
    let rows = stmt.query_map([], scan_recipe_row)?;

    let mut recipes: Vec<Recipe> = rows.collect::<Result<_>>()?;
    for recipe in &mut recipes {
        recipe.components = get_recipe_components(conn, &recipe.id)?;
        recipe.skills_required = get_recipe_skills(conn, &recipe.id)?;
    }
    Ok(recipes)
}

/// Find recipes that use any of the given components as an input
pub fn find_recipes_by_components(conn: &Connection, component_ids: &[String]) -> Result<Vec<String>> {
    if component_ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; component_ids.len()].join(",");
    let sql = format!(
        "SELECT DISTINCT recipe_id FROM recipe_components
         WHERE component_id IN ({placeholders}) ORDER BY recipe_id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(component_ids), |row| row.get(0))?;
    rows.collect()
}

/// Find recipes that produce a given item
pub fn find_recipes_by_output(conn: &Connection, item_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT id FROM recipes WHERE output_item_id = ?1 ORDER BY id")?;
    let rows = stmt.query_map([item_id], |row| row.get(0))?;
    rows.collect()
}

/// Search recipes by name (case-insensitive partial match)
pub fn search_recipes(conn: &Connection, term: &str, limit: usize) -> Result<Vec<RecipeSearchHit>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, category FROM recipes
         WHERE name LIKE ?1 ORDER BY id LIMIT ?2",
    )?;
    let pattern = format!("%{term}%");
    let rows = stmt.query_map(rusqlite::params![pattern, limit as i64], |row| {
        Ok(RecipeSearchHit {
            recipe_id: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
        })
    })?;
    rows.collect()
}

/// List recipe ids in a category
pub fn list_recipes_by_category(conn: &Connection, category: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT id FROM recipes WHERE category = ?1 ORDER BY id")?;
    let rows = stmt.query_map([category], |row| row.get(0))?;
    rows.collect()
}

/// List every recipe as a lightweight hit, optionally filtered by category
pub fn list_recipes(conn: &Connection, category: Option<&str>) -> Result<Vec<RecipeSearchHit>> {
    let scan = |row: &rusqlite::Row<'_>| {
        Ok(RecipeSearchHit {
            recipe_id: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
        })
    };
    match category {
        Some(cat) => {
            let mut stmt = conn
                .prepare("SELECT id, name, category FROM recipes WHERE category = ?1 ORDER BY id")?;
            let rows = stmt.query_map([cat], scan)?;
            rows.collect()
        }
        None => {
            let mut stmt = conn.prepare("SELECT id, name, category FROM recipes ORDER BY id")?;
            let rows = stmt.query_map([], scan)?;
            rows.collect()
        }
    }
}

pub fn count_recipes(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM recipes", [], |row| row.get(0))
}

/// Insert or replace recipes in a single transaction
pub fn bulk_insert_recipes(conn: &mut Connection, recipes: &[Recipe]) -> Result<()> {
    let tx = conn.transaction()?;
    {
        let mut recipe_stmt = tx.prepare(
            "INSERT OR REPLACE INTO recipes
             (id, name, description, category, craft_time_sec, output_item_id, output_quantity)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        let mut comp_stmt = tx.prepare(
            "INSERT OR REPLACE INTO recipe_components (recipe_id, component_id, quantity)
             VALUES (?1, ?2, ?3)",
        )?;
        let mut skill_stmt = tx.prepare(
            "INSERT OR REPLACE INTO recipe_skills (recipe_id, skill_id, level_required)
             VALUES (?1, ?2, ?3)",
        )?;
        // Replacing a recipe must not leave stale child rows behind
        let mut clear_comps = tx.prepare("DELETE FROM recipe_components WHERE recipe_id = ?1")?;
        let mut clear_skills = tx.prepare("DELETE FROM recipe_skills WHERE recipe_id = ?1")?;

        for recipe in recipes {
            clear_comps.execute([&recipe.id])?;
            clear_skills.execute([&recipe.id])?;
            recipe_stmt.execute(rusqlite::params![
                recipe.id,
                recipe.name,
                recipe.description,
                recipe.category,
                recipe.craft_time_sec,
                recipe.output.item_id,
                recipe.output.quantity,
            ])?;
            for comp in &recipe.components {
                comp_stmt.execute(rusqlite::params![
                    recipe.id,
                    comp.component_id,
                    comp.quantity
                ])?;
            }
            for req in &recipe.skills_required {
                skill_stmt.execute(rusqlite::params![
                    recipe.id,
                    req.skill_id,
                    req.level_required
                ])?;
            }
        }
    }
    tx.commit()
}

/// Clear all recipe data (for re-import)
pub fn clear_recipes(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM recipe_skills;
        DELETE FROM recipe_components;
        DELETE FROM recipes;
        "#,
    )
}

// ============================================================================
// Skills
// ============================================================================

/// Get a single skill with prerequisites and XP thresholds
pub fn get_skill(conn: &Connection, id: &str) -> Result<Option<Skill>> {
    let base = conn
        .query_row(
            "SELECT id, name, category, description, max_level FROM skills WHERE id = ?1",
            [id],
            |row| {
                Ok(Skill {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    category: row.get(2)?,
                    description: row.get(3)?,
                    max_level: row.get(4)?,
                    prerequisites: Vec::new(),
                    xp_thresholds: Vec::new(),
                })
            },
        )
        .optional()?;

    let Some(mut skill) = base else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT prereq_skill_id, level_required FROM skill_prerequisites
         WHERE skill_id = ?1 ORDER BY prereq_skill_id",
    )?;
    let prereqs = stmt.query_map([id], |row| {
        Ok(SkillRequirement {
            skill_id: row.get(0)?,
            level_required: row.get(1)?,
        })
    })?;
    skill.prerequisites = prereqs.collect::<Result<_>>()?;

    let mut stmt = conn.prepare(
        "SELECT xp_required FROM skill_levels WHERE skill_id = ?1 ORDER BY level ASC",
    )?;
    let thresholds = stmt.query_map([id], |row| row.get(0))?;
    skill.xp_thresholds = thresholds.collect::<Result<_>>()?;

    Ok(Some(skill))
}

/// Get just the display name of a skill
pub fn get_skill_name(conn: &Connection, id: &str) -> Result<Option<String>> {
    conn.query_row("SELECT name FROM skills WHERE id = ?1", [id], |row| row.get(0))
        .optional()
}

/// XP required to reach a specific level of a skill (0 if unknown)
pub fn get_xp_for_level(conn: &Connection, skill_id: &str, level: i64) -> Result<i64> {
    let xp = conn
        .query_row(
            "SELECT xp_required FROM skill_levels WHERE skill_id = ?1 AND level = ?2",
            rusqlite::params![skill_id, level],
            |row| row.get(0),
        )
        .optional()?;
    Ok(xp.unwrap_or(0))
}

/// List skill ids, optionally restricted to a category
pub fn list_skill_ids(conn: &Connection, category: Option<&str>) -> Result<Vec<String>> {
    match category {
        Some(cat) => {
            let mut stmt = conn.prepare("SELECT id FROM skills WHERE category = ?1 ORDER BY id")?;
            let rows = stmt.query_map([cat], |row| row.get(0))?;
            rows.collect()
        }
        None => {
            let mut stmt = conn.prepare("SELECT id FROM skills ORDER BY id")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect()
        }
    }
}

/// Recipes whose requirement on this skill is exactly the given level
pub fn find_recipes_unlocked_at_level(
    conn: &Connection,
    skill_id: &str,
    level: i64,
) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT recipe_id FROM recipe_skills
         WHERE skill_id = ?1 AND level_required = ?2 ORDER BY recipe_id",
    )?;
    let rows = stmt.query_map(rusqlite::params![skill_id, level], |row| row.get(0))?;
    rows.collect()
}

/// How many recipes stay locked while the skill is at the given level
pub fn count_recipes_locked_by_skill(
    conn: &Connection,
    skill_id: &str,
    current_level: i64,
) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(DISTINCT recipe_id) FROM recipe_skills
         WHERE skill_id = ?1 AND level_required > ?2",
        rusqlite::params![skill_id, current_level],
        |row| row.get(0),
    )
}

/// Insert or replace skills in a single transaction
pub fn bulk_insert_skills(conn: &mut Connection, skills: &[Skill]) -> Result<()> {
    let tx = conn.transaction()?;
    {
        let mut skill_stmt = tx.prepare(
            "INSERT OR REPLACE INTO skills (id, name, category, description, max_level)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        let mut prereq_stmt = tx.prepare(
            "INSERT OR REPLACE INTO skill_prerequisites (skill_id, prereq_skill_id, level_required)
             VALUES (?1, ?2, ?3)",
        )?;
        let mut level_stmt = tx.prepare(
            "INSERT OR REPLACE INTO skill_levels (skill_id, level, xp_required)
             VALUES (?1, ?2, ?3)",
        )?;
        let mut clear_prereqs = tx.prepare("DELETE FROM skill_prerequisites WHERE skill_id = ?1")?;
        let mut clear_levels = tx.prepare("DELETE FROM skill_levels WHERE skill_id = ?1")?;

        for skill in skills {
            clear_prereqs.execute([&skill.id])?;
            clear_levels.execute([&skill.id])?;
            skill_stmt.execute(rusqlite::params![
                skill.id,
                skill.name,
                skill.category,
                skill.description,
                skill.max_level,
            ])?;
            for prereq in &skill.prerequisites {
                prereq_stmt.execute(rusqlite::params![
                    skill.id,
                    prereq.skill_id,
                    prereq.level_required
                ])?;
            }
            // Levels are 1-indexed; thresholds[0] is the XP for level 1.
            for (i, xp) in skill.xp_thresholds.iter().enumerate() {
                level_stmt.execute(rusqlite::params![skill.id, (i + 1) as i64, xp])?;
            }
        }
    }
    tx.commit()
}

/// Clear all skill data
pub fn clear_skills(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM skill_levels;
        DELETE FROM skill_prerequisites;
        DELETE FROM skills;
        "#,
    )
}

// ============================================================================
// Market
// ============================================================================

/// A single price observation for import.
#[derive(Debug, Clone)]
pub struct MarketPriceRecord {
    pub component_id: String,
    pub station_id: String,
    pub buy_price: i64,
    pub sell_price: i64,
    pub volume_24h: i64,
    pub recorded_at: String,
}

/// Current sell price for a component at a station (0 if unpriced)
pub fn get_sell_price(conn: &Connection, component_id: &str, station_id: &str) -> Result<i64> {
    summary_price(conn, component_id, station_id, "sell")
}

/// Current buy price for a component at a station (0 if unpriced)
pub fn get_buy_price(conn: &Connection, component_id: &str, station_id: &str) -> Result<i64> {
    summary_price(conn, component_id, station_id, "buy")
}

fn summary_price(
    conn: &Connection,
    component_id: &str,
    station_id: &str,
    price_type: &str,
) -> Result<i64> {
    let price = conn
        .query_row(
            "SELECT CAST(avg_price_7d AS INTEGER) FROM market_price_summary
             WHERE component_id = ?1 AND station_id = ?2 AND price_type = ?3",
            rusqlite::params![component_id, station_id, price_type],
            |row| row.get(0),
        )
        .optional()?;
    Ok(price.unwrap_or(0))
}

/// Price trend for a component at a station ("unknown" without data)
pub fn get_price_trend(conn: &Connection, component_id: &str, station_id: &str) -> Result<String> {
    let trend = conn
        .query_row(
            "SELECT price_trend FROM market_price_summary
             WHERE component_id = ?1 AND station_id = ?2 AND price_type = 'sell'",
            rusqlite::params![component_id, station_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(trend.unwrap_or_else(|| "unknown".to_string()))
}

/// Most recent 24h trading volume for a component (0 without data)
pub fn get_volume_24h(conn: &Connection, component_id: &str, station_id: &str) -> Result<i64> {
    let volume = conn
        .query_row(
            "SELECT COALESCE(volume_24h, 0) FROM market_prices
             WHERE component_id = ?1 AND station_id = ?2 AND price_type = 'sell'
             ORDER BY recorded_at DESC LIMIT 1",
            rusqlite::params![component_id, station_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(volume.unwrap_or(0))
}

/// Insert raw market price observations in a single transaction
pub fn insert_market_prices(conn: &mut Connection, records: &[MarketPriceRecord]) -> Result<()> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO market_prices
             (component_id, station_id, price_type, price, volume_24h, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for rec in records {
            if rec.buy_price > 0 {
                stmt.execute(rusqlite::params![
                    rec.component_id,
                    rec.station_id,
                    "buy",
                    rec.buy_price,
                    rec.volume_24h,
                    rec.recorded_at,
                ])?;
            }
            if rec.sell_price > 0 {
                stmt.execute(rusqlite::params![
                    rec.component_id,
                    rec.station_id,
                    "sell",
                    rec.sell_price,
                    rec.volume_24h,
                    rec.recorded_at,
                ])?;
            }
        }
    }
    tx.commit()
}

/// Recalculate the price summary table from raw observations
pub fn refresh_price_summaries(conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO market_price_summary
         (component_id, station_id, price_type, avg_price_7d, min_price_7d, max_price_7d, price_trend, last_updated)
         SELECT
             component_id,
             station_id,
             price_type,
             AVG(price) AS avg_price_7d,
             MIN(price) AS min_price_7d,
             MAX(price) AS max_price_7d,
             CASE
                 WHEN AVG(CASE WHEN recorded_at > datetime('now', '-1 day') THEN price END) >
                      AVG(CASE WHEN recorded_at <= datetime('now', '-1 day') THEN price END) * 1.05
                 THEN 'rising'
                 WHEN AVG(CASE WHEN recorded_at > datetime('now', '-1 day') THEN price END) <
                      AVG(CASE WHEN recorded_at <= datetime('now', '-1 day') THEN price END) * 0.95
                 THEN 'falling'
                 ELSE 'stable'
             END AS price_trend,
             datetime('now') AS last_updated
         FROM market_prices
         WHERE recorded_at > datetime('now', '-7 days')
         GROUP BY component_id, station_id, price_type",
        [],
    )?;
    Ok(())
}

/// Clear all market data
pub fn clear_market_data(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM market_price_summary;
        DELETE FROM market_prices;
        "#,
    )
}

// ============================================================================
// Sync metadata
// ============================================================================

pub fn set_sync_metadata(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO sync_metadata (key, value) VALUES (?1, ?2)",
        rusqlite::params![key, value],
    )?;
    Ok(())
}

pub fn get_sync_metadata(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM sync_metadata WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .optional()
}
