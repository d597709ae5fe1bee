//! craftplan CLI
//!
//! Command-line front end for the crafting query calculator: catalog import
//! and every query tool as a subcommand, with pretty or JSON output.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use rusqlite::Connection;

use craftplan::models::{
    Component, CraftPathRequest, CraftQueryRequest, ComponentUsesRequest, OptimizationStrategy,
    Recipe, RecipeComponent, RecipeLookupRequest, RecipeOutput, Skill, SkillCraftPathsRequest,
    SkillProgress, SkillRequirement,
};
use craftplan::{bom, catalog, db, import, lookup, path, query, skills, uses};

#[derive(Parser)]
#[command(name = "craftplan")]
#[command(about = "Crafting query calculator with a multi-level bill-of-materials planner")]
struct Cli {
    /// Path to the SQLite catalog database
    #[arg(short, long, default_value = "craftplan.db")]
    database: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize an empty catalog database with the schema
    Init,

    /// Import recipes, skills or market data from JSON exports
    Import {
        /// Recipes JSON file
        #[arg(long)]
        recipes: Option<PathBuf>,

        /// Skills JSON file
        #[arg(long)]
        skills: Option<PathBuf>,

        /// Market prices JSON file
        #[arg(long)]
        market: Option<PathBuf>,

        /// Directory to scan for recipe*/skill*/market* JSON files
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Clear existing catalog data before importing
        #[arg(long)]
        clear: bool,
    },

    /// Load the built-in sample catalog (no import files needed)
    LoadSample,

    /// Compute the full bill of materials for a recipe
    Bom {
        /// Target recipe ID
        recipe_id: String,

        /// Output quantity to plan for
        #[arg(short, long, default_value = "1")]
        quantity: i64,

        /// Emit the response payload as JSON
        #[arg(long)]
        json: bool,
    },

    /// Find what can be crafted with given components and skills
    Query {
        /// Components on hand, as id:quantity (repeatable)
        #[arg(long = "have", value_name = "ID:QTY")]
        have: Vec<String>,

        /// Skill levels, as skill:level (repeatable)
        #[arg(long = "skill", value_name = "ID:LEVEL")]
        skill: Vec<String>,

        /// Only report fully craftable recipes
        #[arg(long)]
        exact: bool,

        /// Minimum component match ratio for partial results
        #[arg(long, default_value = "0.25")]
        min_match_ratio: f64,

        /// Result sorting strategy
        #[arg(long)]
        strategy: Option<String>,

        /// Station ID for market price annotations
        #[arg(long)]
        station: Option<String>,

        /// Restrict to one recipe category
        #[arg(long)]
        category: Option<String>,

        /// Max results per section
        #[arg(long, default_value = "20")]
        limit: usize,

        #[arg(long)]
        json: bool,
    },

    /// Single-level material gap analysis for one recipe
    Path {
        /// Target recipe ID
        recipe_id: String,

        #[arg(short, long, default_value = "1")]
        quantity: i64,

        /// Components on hand, as id:quantity (repeatable)
        #[arg(long = "have", value_name = "ID:QTY")]
        have: Vec<String>,

        /// Skill levels, as skill:level (repeatable)
        #[arg(long = "skill", value_name = "ID:LEVEL")]
        skill: Vec<String>,

        #[arg(long)]
        station: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Look up one recipe by ID or name search
    Lookup {
        /// Recipe ID
        recipe_id: Option<String>,

        /// Name search term
        #[arg(long)]
        search: Option<String>,

        #[arg(long = "skill", value_name = "ID:LEVEL")]
        skill: Vec<String>,

        #[arg(long)]
        station: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// List the recipes that consume a component
    Uses {
        /// Component item ID
        component_id: String,

        #[arg(long = "skill", value_name = "ID:LEVEL")]
        skill: Vec<String>,

        /// Include recipes blocked by missing skills
        #[arg(long)]
        include_locked: bool,

        #[arg(long)]
        station: Option<String>,

        #[arg(long)]
        strategy: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Show which skills unlock recipes at their next level
    Skills {
        /// Skill progress, as skill:level or skill:level:xp (repeatable)
        #[arg(long = "skill", value_name = "ID:LEVEL[:XP]")]
        skill: Vec<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long, default_value = "10")]
        limit: usize,

        #[arg(long)]
        json: bool,
    },

    /// List all recipes in the catalog
    ListRecipes {
        #[arg(long)]
        category: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut conn = Connection::open(&cli.database)
        .with_context(|| format!("opening database {}", cli.database.display()))?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::Import {
            recipes,
            skills,
            market,
            dir,
            clear,
        } => {
            if clear {
                println!("Clearing existing catalog data...");
                db::clear_recipes(&conn)?;
                db::clear_skills(&conn)?;
                db::clear_market_data(&conn)?;
            }

            let mut stats = import::ImportStats::default();
            if let Some(file) = recipes {
                stats.recipes += import::import_recipes_from_file(&mut conn, &file)?;
            }
            if let Some(file) = skills {
                stats.skills += import::import_skills_from_file(&mut conn, &file)?;
            }
            if let Some(file) = market {
                stats.market_points += import::import_market_from_file(&mut conn, &file)?;
            }
            if let Some(dir) = dir {
                let dir_stats = import::import_dir(&mut conn, &dir)?;
                stats.recipes += dir_stats.recipes;
                stats.skills += dir_stats.skills;
                stats.market_points += dir_stats.market_points;
                stats.files_skipped += dir_stats.files_skipped;
            }
            println!("{stats}");
        }

        Commands::LoadSample => {
            load_sample_data(&mut conn)?;
            println!("Sample catalog loaded successfully!");
        }

        Commands::Bom {
            recipe_id,
            quantity,
            json,
        } => {
            let snapshot = catalog::Catalog::load(&conn)?;
            let plan = bom::compute_bill_of_materials(&snapshot, &recipe_id, quantity)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                print!("{plan}");
            }
        }

        Commands::Query {
            have,
            skill,
            exact,
            min_match_ratio,
            strategy,
            station,
            category,
            limit,
            json,
        } => {
            let req = CraftQueryRequest {
                components: parse_components(&have)?,
                skills: parse_skill_levels(&skill)?,
                include_partial: !exact,
                min_match_ratio,
                strategy: parse_strategy(strategy.as_deref()),
                station_id: station,
                category_filter: category,
                limit,
            };
            let resp = query::craft_query(&conn, &req)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&resp)?);
            } else {
                print_query(&resp);
            }
        }

        Commands::Path {
            recipe_id,
            quantity,
            have,
            skill,
            station,
            json,
        } => {
            let req = CraftPathRequest {
                target_recipe_id: recipe_id,
                target_quantity: quantity,
                current_inventory: parse_components(&have)?,
                skills: parse_skill_levels(&skill)?,
                station_id: station,
            };
            let resp = path::craft_path_to(&conn, &req)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&resp)?);
            } else {
                print_path(&resp);
            }
        }

        Commands::Lookup {
            recipe_id,
            search,
            skill,
            station,
            json,
        } => {
            let req = RecipeLookupRequest {
                recipe_id,
                search,
                skills: parse_skill_levels(&skill)?,
                station_id: station,
            };
            let resp = lookup::recipe_lookup(&conn, &req)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&resp)?);
            } else {
                print_lookup(&resp);
            }
        }

        Commands::Uses {
            component_id,
            skill,
            include_locked,
            station,
            strategy,
            json,
        } => {
            let req = ComponentUsesRequest {
                component_id,
                skills: parse_skill_levels(&skill)?,
                include_skill_locked: include_locked,
                station_id: station,
                strategy: parse_strategy(strategy.as_deref()),
            };
            let resp = uses::component_uses(&conn, &req)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&resp)?);
            } else {
                print_uses(&resp);
            }
        }

        Commands::Skills {
            skill,
            category,
            limit,
            json,
        } => {
            let req = SkillCraftPathsRequest {
                skills: parse_skill_progress(&skill)?,
                category_filter: category,
                limit,
            };
            let resp = skills::skill_craft_paths(&conn, &req)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&resp)?);
            } else {
                print_skills(&resp);
            }
        }

        Commands::ListRecipes { category } => {
            let recipes = db::list_recipes(&conn, category.as_deref())?;
            if recipes.is_empty() {
                println!("No recipes in catalog. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:<28} {:<28} {}", "Recipe ID", "Name", "Category");
                println!("{}", "-".repeat(64));
                for r in recipes {
                    println!("{:<28} {:<28} {}", r.recipe_id, r.name, r.category);
                }
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

// ============================================================================
// Argument parsing helpers
// ============================================================================

/// Parses repeated `id:quantity` arguments.
fn parse_components(args: &[String]) -> Result<Vec<Component>> {
    args.iter()
        .map(|arg| {
            let (id, qty) = arg
                .rsplit_once(':')
                .ok_or_else(|| anyhow!("expected id:quantity, got '{arg}'"))?;
            Ok(Component {
                id: id.to_string(),
                quantity: qty
                    .parse()
                    .with_context(|| format!("bad quantity in '{arg}'"))?,
            })
        })
        .collect()
}

/// Parses repeated `skill:level` arguments.
fn parse_skill_levels(args: &[String]) -> Result<HashMap<String, i64>> {
    args.iter()
        .map(|arg| {
            let (id, level) = arg
                .rsplit_once(':')
                .ok_or_else(|| anyhow!("expected skill:level, got '{arg}'"))?;
            Ok((
                id.to_string(),
                level
                    .parse()
                    .with_context(|| format!("bad level in '{arg}'"))?,
            ))
        })
        .collect()
}

/// Parses repeated `skill:level` or `skill:level:xp` arguments.
fn parse_skill_progress(args: &[String]) -> Result<HashMap<String, SkillProgress>> {
    args.iter()
        .map(|arg| {
            let parts: Vec<&str> = arg.split(':').collect();
            if parts.len() < 2 || parts.len() > 3 {
                return Err(anyhow!("expected skill:level[:xp], got '{arg}'"));
            }
            let level = parts[1]
                .parse()
                .with_context(|| format!("bad level in '{arg}'"))?;
            let current_xp = match parts.get(2) {
                Some(xp) => xp.parse().with_context(|| format!("bad xp in '{arg}'"))?,
                None => 0,
            };
            Ok((parts[0].to_string(), SkillProgress { level, current_xp }))
        })
        .collect()
}

/// Unrecognised strategies fall back to the engine default.
fn parse_strategy(arg: Option<&str>) -> Option<OptimizationStrategy> {
    arg.and_then(|s| s.parse().ok())
}

// ============================================================================
// Pretty printers
// ============================================================================

fn print_query(resp: &craftplan::models::CraftQueryResponse) {
    println!("=== Craft Query ===");
    println!(
        "Checked {} recipes against {} components ({})",
        resp.query_stats.total_recipes_checked,
        resp.query_stats.components_provided,
        resp.query_stats.strategy_used
    );
    println!();

    println!("Craftable now:");
    if resp.craftable.is_empty() {
        println!("  (none)");
    }
    for m in &resp.craftable {
        println!(
            "  {:<28} x{} ({})",
            m.recipe.name, m.can_craft_quantity, m.recipe.id
        );
        if let Some(p) = &m.profit_analysis {
            println!(
                "    profit/unit: {} (margin {:.1}%)",
                p.profit_per_unit, p.profit_margin_pct
            );
        }
    }
    println!();

    if !resp.partial_components.is_empty() {
        println!("Partial matches:");
        for m in &resp.partial_components {
            println!(
                "  {:<28} {:.0}% of components ({})",
                m.recipe.name,
                m.match_ratio * 100.0,
                m.recipe.id
            );
            for missing in &m.components_missing {
                println!("    missing {} x{}", missing.component_id, missing.quantity);
            }
        }
        println!();
    }

    if !resp.blocked_by_skills.is_empty() {
        println!("Blocked by skills:");
        for m in &resp.blocked_by_skills {
            println!("  {:<28} ({})", m.recipe.name, m.recipe.id);
            for gap in &m.skills_missing {
                println!(
                    "    {} level {} (have {})",
                    gap.skill_name, gap.required_level, gap.current_level
                );
            }
        }
    }
}

fn print_path(resp: &craftplan::models::CraftPathResponse) {
    println!("=== Craft Path ===");
    if resp.target.recipe_name.is_empty() {
        println!("Recipe '{}' not found", resp.target.recipe_id);
        return;
    }
    println!(
        "Target: {} x{} ({})",
        resp.target.recipe_name, resp.target.quantity, resp.target.recipe_id
    );
    println!(
        "Feasible: {}  Skill ready: {}  Craft time: {}s",
        resp.feasible, resp.skill_ready, resp.craft_time_sec
    );
    println!();

    println!(
        "{:<24} {:>8} {:>8} {:>8}  {}",
        "Component", "Needed", "Have", "Acquire", "How"
    );
    println!("{}", "-".repeat(68));
    for mat in &resp.materials_needed {
        println!(
            "{:<24} {:>8} {:>8} {:>8}  {}",
            mat.component_id,
            mat.quantity_needed,
            mat.quantity_have,
            mat.quantity_to_acquire,
            mat.acquisition_methods.join(", ")
        );
    }
    println!();
    println!(
        "{} components: {} on hand, {} to acquire ({} craftable)",
        resp.summary.total_components,
        resp.summary.components_have,
        resp.summary.components_to_acquire,
        resp.summary.components_craftable
    );
    for gap in &resp.skills_missing {
        println!(
            "Skill gap: {} level {} (have {}, {} XP to next)",
            gap.skill_name, gap.required_level, gap.current_level, gap.xp_to_next
        );
    }
}

fn print_lookup(resp: &craftplan::models::RecipeLookupResponse) {
    if let Some(recipe) = &resp.recipe {
        println!("Recipe: {} ({})", recipe.name, recipe.id);
        if !recipe.category.is_empty() {
            println!("  Category: {}", recipe.category);
        }
        if !recipe.description.is_empty() {
            println!("  {}", recipe.description);
        }
        println!(
            "  Output: {} x{}  Craft time: {}s",
            recipe.output.item_id, recipe.output.quantity, recipe.craft_time_sec
        );
        if !recipe.components.is_empty() {
            println!("  Components:");
            for c in &recipe.components {
                println!("    {} x{}", c.component_id, c.quantity);
            }
        }
        if !recipe.skills_required.is_empty() {
            println!("  Skills required:");
            for s in &recipe.skills_required {
                println!("    {} level {}", s.skill_id, s.level_required);
            }
        }
        if let Some(p) = &resp.profit_analysis {
            println!(
                "  Profit/unit: {} (sell {}, inputs {}, margin {:.1}%)",
                p.profit_per_unit, p.output_sell_price, p.input_cost, p.profit_margin_pct
            );
        }
        if !resp.used_in_recipes.is_empty() {
            println!("  Output used in: {}", resp.used_in_recipes.join(", "));
        }
        for gap in &resp.skill_gaps {
            println!(
                "  Skill gap: {} level {} (have {})",
                gap.skill_name, gap.required_level, gap.current_level
            );
        }
    } else if !resp.search_results.is_empty() {
        println!("Search results:");
        for hit in &resp.search_results {
            println!("  {:<28} {}", hit.recipe_id, hit.name);
        }
    } else {
        println!("No matching recipe");
    }
}

fn print_uses(resp: &craftplan::models::ComponentUsesResponse) {
    println!(
        "{} is used in {} recipes",
        resp.component_id, resp.total_uses
    );
    if resp.market_sell_price > 0 {
        println!("Market sell price: {}", resp.market_sell_price);
    }
    println!();
    for info in &resp.used_in {
        let lock = if info.skill_ready { "" } else { " [skill-locked]" };
        println!(
            "  {:<28} x{} per craft ({}){}",
            info.recipe.name, info.quantity_per_craft, info.recipe.id, lock
        );
    }
}

fn print_skills(resp: &craftplan::models::SkillCraftPathsResponse) {
    println!("=== Skill Unlock Paths ===");
    println!(
        "{} recipes total: {} unlocked, {} locked",
        resp.summary.total_recipes, resp.summary.recipes_unlocked, resp.summary.recipes_locked
    );
    if !resp.summary.closest_unlock_skill.is_empty() {
        println!(
            "Closest unlock: {} ({} XP)",
            resp.summary.closest_unlock_skill, resp.summary.closest_unlock_xp
        );
    }
    println!();
    for path in &resp.skill_paths {
        println!(
            "{} (level {} -> {}, {} XP needed):",
            path.skill.name,
            path.current_level,
            path.current_level + 1,
            path.xp_to_next_level
        );
        for recipe in &path.recipes_unlocked_at_next {
            println!("  unlocks {recipe}");
        }
    }
}

// ============================================================================
// Sample data
// ============================================================================

/// Load a small sample catalog for trying the tools without import files.
fn load_sample_data(conn: &mut Connection) -> Result<()> {
    db::clear_recipes(conn)?;
    db::clear_skills(conn)?;
    db::clear_market_data(conn)?;

    let recipes = vec![
        Recipe {
            id: "craft_scanner_1".to_string(),
            name: "Scanner I".to_string(),
            description: "Basic handheld scanner".to_string(),
            category: "equipment".to_string(),
            craft_time_sec: 12,
            components: vec![
                RecipeComponent {
                    component_id: "sensor_unit".to_string(),
                    quantity: 1,
                },
                RecipeComponent {
                    component_id: "refined_circuits".to_string(),
                    quantity: 2,
                },
                RecipeComponent {
                    component_id: "ore_crystal".to_string(),
                    quantity: 3,
                },
            ],
            skills_required: vec![SkillRequirement {
                skill_id: "engineering".to_string(),
                level_required: 2,
            }],
            output: RecipeOutput {
                item_id: "scanner_1".to_string(),
                quantity: 1,
            },
        },
        Recipe {
            id: "craft_sensor_unit".to_string(),
            name: "Sensor Unit".to_string(),
            description: String::new(),
            category: "components".to_string(),
            craft_time_sec: 10,
            components: vec![
                RecipeComponent {
                    component_id: "refined_circuits".to_string(),
                    quantity: 1,
                },
                RecipeComponent {
                    component_id: "crystal_lens".to_string(),
                    quantity: 1,
                },
                RecipeComponent {
                    component_id: "ore_copper".to_string(),
                    quantity: 3,
                },
            ],
            skills_required: vec![SkillRequirement {
                skill_id: "engineering".to_string(),
                level_required: 1,
            }],
            output: RecipeOutput {
                item_id: "sensor_unit".to_string(),
                quantity: 1,
            },
        },
        Recipe {
            id: "craft_refined_circuits".to_string(),
            name: "Refined Circuits".to_string(),
            description: String::new(),
            category: "components".to_string(),
            craft_time_sec: 5,
            components: vec![
                RecipeComponent {
                    component_id: "ore_copper".to_string(),
                    quantity: 6,
                },
                RecipeComponent {
                    component_id: "ore_silicon".to_string(),
                    quantity: 3,
                },
            ],
            skills_required: Vec::new(),
            output: RecipeOutput {
                item_id: "refined_circuits".to_string(),
                quantity: 2,
            },
        },
        Recipe {
            id: "craft_crystal_lens".to_string(),
            name: "Crystal Lens".to_string(),
            description: String::new(),
            category: "components".to_string(),
            craft_time_sec: 8,
            components: vec![
                RecipeComponent {
                    component_id: "ore_crystal".to_string(),
                    quantity: 8,
                },
                RecipeComponent {
                    component_id: "ore_palladium".to_string(),
                    quantity: 2,
                },
            ],
            skills_required: Vec::new(),
            output: RecipeOutput {
                item_id: "crystal_lens".to_string(),
                quantity: 1,
            },
        },
        Recipe {
            id: "craft_mining_drill".to_string(),
            name: "Mining Drill".to_string(),
            description: "Portable ore extraction drill".to_string(),
            category: "equipment".to_string(),
            craft_time_sec: 20,
            components: vec![
                RecipeComponent {
                    component_id: "refined_circuits".to_string(),
                    quantity: 4,
                },
                RecipeComponent {
                    component_id: "plasteel_plate".to_string(),
                    quantity: 2,
                },
            ],
            skills_required: vec![SkillRequirement {
                skill_id: "fabrication".to_string(),
                level_required: 1,
            }],
            output: RecipeOutput {
                item_id: "mining_drill".to_string(),
                quantity: 1,
            },
        },
        Recipe {
            id: "craft_plasteel_plate".to_string(),
            name: "Plasteel Plate".to_string(),
            description: String::new(),
            category: "components".to_string(),
            craft_time_sec: 6,
            components: vec![
                RecipeComponent {
                    component_id: "ore_iron".to_string(),
                    quantity: 4,
                },
                RecipeComponent {
                    component_id: "ore_titanium".to_string(),
                    quantity: 2,
                },
            ],
            skills_required: Vec::new(),
            output: RecipeOutput {
                item_id: "plasteel_plate".to_string(),
                quantity: 2,
            },
        },
    ];
    db::bulk_insert_recipes(conn, &recipes)?;

    let skills = vec![
        Skill {
            id: "engineering".to_string(),
            name: "Engineering".to_string(),
            category: "technical".to_string(),
            description: String::new(),
            max_level: 5,
            prerequisites: Vec::new(),
            xp_thresholds: vec![100, 250, 500, 1000, 2000],
        },
        Skill {
            id: "fabrication".to_string(),
            name: "Fabrication".to_string(),
            category: "technical".to_string(),
            description: String::new(),
            max_level: 3,
            prerequisites: vec![SkillRequirement {
                skill_id: "engineering".to_string(),
                level_required: 1,
            }],
            xp_thresholds: vec![150, 400, 900],
        },
    ];
    db::bulk_insert_skills(conn, &skills)?;

    let now: String = conn.query_row("SELECT datetime('now')", [], |row| row.get(0))?;
    let prices = vec![
        db::MarketPriceRecord {
            component_id: "scanner_1".to_string(),
            station_id: "station_alpha".to_string(),
            buy_price: 0,
            sell_price: 420,
            volume_24h: 35,
            recorded_at: now.clone(),
        },
        db::MarketPriceRecord {
            component_id: "refined_circuits".to_string(),
            station_id: "station_alpha".to_string(),
            buy_price: 30,
            sell_price: 26,
            volume_24h: 210,
            recorded_at: now.clone(),
        },
        db::MarketPriceRecord {
            component_id: "ore_copper".to_string(),
            station_id: "station_alpha".to_string(),
            buy_price: 4,
            sell_price: 3,
            volume_24h: 1800,
            recorded_at: now.clone(),
        },
        db::MarketPriceRecord {
            component_id: "ore_crystal".to_string(),
            station_id: "station_alpha".to_string(),
            buy_price: 9,
            sell_price: 7,
            volume_24h: 640,
            recorded_at: now,
        },
    ];
    db::insert_market_prices(conn, &prices)?;
    db::refresh_price_summaries(conn)?;

    println!(
        "Loaded {} sample recipes and {} skills",
        recipes.len(),
        skills.len()
    );
    Ok(())
}
