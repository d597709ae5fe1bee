//! JSON data import for recipes, skills and market prices
//!
//! Accepts the upstream export format, which is loose about field names
//! (`id` vs `item_id`, `level` vs `level_required`, nested vs flat output),
//! normalises it into the catalog schema and bulk-inserts transactionally.

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Deserialize;
use walkdir::WalkDir;

use crate::db::{self, MarketPriceRecord};
use crate::models::{Recipe, RecipeComponent, RecipeOutput, Skill, SkillRequirement};

/// Counts of what an import run actually loaded.
#[derive(Debug, Default)]
pub struct ImportStats {
    pub recipes: usize,
    pub skills: usize,
    pub market_points: usize,
    pub files_skipped: usize,
}

impl fmt::Display for ImportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Imported {} recipes, {} skills, {} market price points. Skipped files: {}",
            self.recipes, self.skills, self.market_points, self.files_skipped
        )
    }
}

// ============================================================================
// Upstream export formats
// ============================================================================

#[derive(Debug, Deserialize)]
struct ComponentImport {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    item_id: Option<String>,
    #[serde(default)]
    component_id: Option<String>,
    quantity: i64,
}

impl ComponentImport {
    fn component_id(self) -> Option<String> {
        self.component_id.or(self.item_id).or(self.id)
    }
}

#[derive(Debug, Deserialize)]
struct SkillRefImport {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    skill_id: Option<String>,
    #[serde(default)]
    level: i64,
    #[serde(default)]
    level_required: i64,
}

impl SkillRefImport {
    fn into_requirement(self) -> Option<SkillRequirement> {
        let skill_id = self.skill_id.or(self.id)?;
        let level_required = if self.level_required > 0 {
            self.level_required
        } else {
            self.level
        };
        Some(SkillRequirement {
            skill_id,
            level_required,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OutputImport {
    #[serde(default)]
    item_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    quantity: i64,
}

#[derive(Debug, Deserialize)]
struct RecipeImport {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    craft_time_sec: i64,
    #[serde(default)]
    components: Vec<ComponentImport>,
    #[serde(default)]
    skills: Vec<SkillRefImport>,
    #[serde(default)]
    output: Option<OutputImport>,
    #[serde(default)]
    output_item_id: Option<String>,
    #[serde(default)]
    output_quantity: i64,
}

impl RecipeImport {
    fn into_recipe(self) -> Option<Recipe> {
        let (item_id, quantity) = match self.output {
            Some(out) => (out.item_id.or(out.id)?, out.quantity),
            None => (self.output_item_id?, self.output_quantity),
        };

        let components = self
            .components
            .into_iter()
            .filter_map(|c| {
                let quantity = c.quantity;
                c.component_id().map(|component_id| RecipeComponent {
                    component_id,
                    quantity,
                })
            })
            .collect();

        let skills_required = self
            .skills
            .into_iter()
            .filter_map(SkillRefImport::into_requirement)
            .collect();

        Some(Recipe {
            id: self.id,
            name: self.name,
            description: self.description,
            category: self.category,
            craft_time_sec: self.craft_time_sec,
            components,
            skills_required,
            output: RecipeOutput {
                item_id,
                quantity: quantity.max(1),
            },
        })
    }
}

#[derive(Debug, Deserialize)]
struct SkillLevelImport {
    level: i64,
    #[serde(default)]
    xp_required: i64,
    #[serde(default)]
    xp: i64,
}

#[derive(Debug, Deserialize)]
struct SkillImport {
    id: String,
    name: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    max_level: i64,
    #[serde(default)]
    prerequisites: Vec<SkillRefImport>,
    #[serde(default)]
    levels: Vec<SkillLevelImport>,
    #[serde(default)]
    xp_thresholds: Vec<i64>,
}

impl SkillImport {
    fn into_skill(self) -> Skill {
        let xp_thresholds = if !self.xp_thresholds.is_empty() {
            self.xp_thresholds
        } else {
            let mut levels = self.levels;
            levels.sort_by_key(|l| l.level);
            levels
                .into_iter()
                .map(|l| if l.xp_required > 0 { l.xp_required } else { l.xp })
                .collect()
        };

        let max_level = if self.max_level > 0 {
            self.max_level
        } else {
            xp_thresholds.len() as i64
        };

        Skill {
            id: self.id,
            name: self.name,
            category: self.category,
            description: self.description,
            max_level,
            prerequisites: self
                .prerequisites
                .into_iter()
                .filter_map(SkillRefImport::into_requirement)
                .collect(),
            xp_thresholds,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MarketImport {
    component_id: String,
    station_id: String,
    #[serde(default)]
    buy_price: i64,
    #[serde(default)]
    sell_price: i64,
    #[serde(default)]
    volume_24h: i64,
    #[serde(default)]
    recorded_at: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

// ============================================================================
// Import entry points
// ============================================================================

/// Import recipes from a JSON file, replacing same-id entries.
pub fn import_recipes_from_file(conn: &mut Connection, path: &Path) -> Result<usize> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let imports: Vec<RecipeImport> = serde_json::from_str(&data)
        .with_context(|| format!("parsing {}", path.display()))?;

    let recipes: Vec<Recipe> = imports
        .into_iter()
        .filter_map(RecipeImport::into_recipe)
        .collect();

    db::bulk_insert_recipes(conn, &recipes).context("inserting recipes")?;
    record_sync(conn, "recipes", recipes.len())?;

    tracing::info!(count = recipes.len(), file = %path.display(), "imported recipes");
    Ok(recipes.len())
}

/// Import skills from a JSON file, replacing same-id entries.
pub fn import_skills_from_file(conn: &mut Connection, path: &Path) -> Result<usize> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let imports: Vec<SkillImport> = serde_json::from_str(&data)
        .with_context(|| format!("parsing {}", path.display()))?;

    let skills: Vec<Skill> = imports.into_iter().map(SkillImport::into_skill).collect();

    db::bulk_insert_skills(conn, &skills).context("inserting skills")?;
    record_sync(conn, "skills", skills.len())?;

    tracing::info!(count = skills.len(), file = %path.display(), "imported skills");
    Ok(skills.len())
}

/// Import market price observations from a JSON file and refresh the
/// aggregated summaries used by profit analysis.
pub fn import_market_from_file(conn: &mut Connection, path: &Path) -> Result<usize> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let imports: Vec<MarketImport> = serde_json::from_str(&data)
        .with_context(|| format!("parsing {}", path.display()))?;

    let now: String = conn
        .query_row("SELECT datetime('now')", [], |row| row.get(0))
        .context("reading current time")?;

    let records: Vec<MarketPriceRecord> = imports
        .into_iter()
        .map(|m| {
            let recorded_at = m.recorded_at.or(m.timestamp).unwrap_or_else(|| now.clone());
            MarketPriceRecord {
                component_id: m.component_id,
                station_id: m.station_id,
                buy_price: m.buy_price,
                sell_price: m.sell_price,
                volume_24h: m.volume_24h,
                recorded_at,
            }
        })
        .collect();

    db::insert_market_prices(conn, &records).context("inserting market prices")?;
    db::refresh_price_summaries(conn).context("refreshing price summaries")?;
    record_sync(conn, "market", records.len())?;

    tracing::info!(count = records.len(), file = %path.display(), "imported market prices");
    Ok(records.len())
}

/// Import every JSON file under a directory, classified by file name:
/// `recipe*`, `skill*` and `market*`/`price*` files are recognised.
pub fn import_dir(conn: &mut Connection, dir: &Path) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.extension().is_some_and(|ext| ext == "json") {
            continue;
        }
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if file_name.starts_with("recipe") {
            stats.recipes += import_recipes_from_file(conn, path)?;
        } else if file_name.starts_with("skill") {
            stats.skills += import_skills_from_file(conn, path)?;
        } else if file_name.starts_with("market") || file_name.starts_with("price") {
            stats.market_points += import_market_from_file(conn, path)?;
        } else {
            tracing::debug!(file = %path.display(), "skipping unrecognised file");
            stats.files_skipped += 1;
        }
    }

    Ok(stats)
}

fn record_sync(conn: &Connection, kind: &str, count: usize) -> Result<()> {
    let now: String = conn
        .query_row("SELECT datetime('now')", [], |row| row.get(0))
        .context("reading current time")?;
    db::set_sync_metadata(conn, &format!("{kind}_last_sync"), &now)?;
    db::set_sync_metadata(conn, &format!("{kind}_count"), &count.to_string())?;
    Ok(())
}
