//! Data models for recipes, skills, market prices and tool payloads

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Catalog types
// ============================================================================

/// A required input component for a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeComponent {
    pub component_id: String,
    pub quantity: i64,
}

/// A skill level needed before a recipe can be crafted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRequirement {
    pub skill_id: String,
    pub level_required: i64,
}

/// What a recipe produces per craft run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeOutput {
    pub item_id: String,
    pub quantity: i64,
}

/// A craftable item with its requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
    #[serde(default)]
    pub craft_time_sec: i64,
    #[serde(default)]
    pub components: Vec<RecipeComponent>,
    #[serde(default)]
    pub skills_required: Vec<SkillRequirement>,
    pub output: RecipeOutput,
}

/// A skill in the progression tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub max_level: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<SkillRequirement>,
    /// XP needed to reach each level, index 0 = level 1.
    #[serde(default)]
    pub xp_thresholds: Vec<i64>,
}

// ============================================================================
// Query input types
// ============================================================================

/// An item with quantity, as supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub quantity: i64,
}

/// An agent's progress in a single skill.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SkillProgress {
    pub level: i64,
    #[serde(default)]
    pub current_xp: i64,
}

/// Controls result sorting for the matching tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptimizationStrategy {
    MaximizeProfit,
    MaximizeVolume,
    OptimizeCraftPath,
    #[default]
    UseInventoryFirst,
    MinimizeAcquisition,
}

impl OptimizationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizationStrategy::MaximizeProfit => "MAXIMIZE_PROFIT",
            OptimizationStrategy::MaximizeVolume => "MAXIMIZE_VOLUME",
            OptimizationStrategy::OptimizeCraftPath => "OPTIMIZE_CRAFT_PATH",
            OptimizationStrategy::UseInventoryFirst => "USE_INVENTORY_FIRST",
            OptimizationStrategy::MinimizeAcquisition => "MINIMIZE_ACQUISITION",
        }
    }
}

impl FromStr for OptimizationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MAXIMIZE_PROFIT" => Ok(OptimizationStrategy::MaximizeProfit),
            "MAXIMIZE_VOLUME" => Ok(OptimizationStrategy::MaximizeVolume),
            "OPTIMIZE_CRAFT_PATH" => Ok(OptimizationStrategy::OptimizeCraftPath),
            "USE_INVENTORY_FIRST" => Ok(OptimizationStrategy::UseInventoryFirst),
            "MINIMIZE_ACQUISITION" => Ok(OptimizationStrategy::MinimizeAcquisition),
            other => Err(format!("unknown optimization strategy: {other}")),
        }
    }
}

// ============================================================================
// Market types
// ============================================================================

/// Market-based profit metrics for a recipe at a station.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfitAnalysis {
    pub output_sell_price: i64,
    pub input_cost: i64,
    pub profit_per_unit: i64,
    pub profit_margin_pct: f64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub total_potential_profit: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub market_volume_24h: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub price_trend: String,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

// ============================================================================
// Skill gap types
// ============================================================================

/// The difference between a current and a required skill level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillGap {
    pub skill_id: String,
    pub skill_name: String,
    pub current_level: i64,
    pub required_level: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub xp_to_next: i64,
}

// ============================================================================
// craft_query payloads
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct CraftQueryRequest {
    pub components: Vec<Component>,
    pub skills: HashMap<String, i64>,
    pub include_partial: bool,
    pub min_match_ratio: f64,
    pub strategy: Option<OptimizationStrategy>,
    pub station_id: Option<String>,
    pub category_filter: Option<String>,
    pub limit: usize,
}

/// A recipe the agent can craft right now.
#[derive(Debug, Clone, Serialize)]
pub struct CraftableMatch {
    pub recipe: Recipe,
    pub can_craft_quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_analysis: Option<ProfitAnalysis>,
}

/// A recipe where the agent has some but not all components.
#[derive(Debug, Clone, Serialize)]
pub struct PartialComponentMatch {
    pub recipe: Recipe,
    pub components_have: Vec<RecipeComponent>,
    pub components_missing: Vec<RecipeComponent>,
    /// Fraction of distinct components the agent holds at least partially.
    pub match_ratio: f64,
    pub skills_ready: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skills_missing: Vec<SkillGap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_analysis: Option<ProfitAnalysis>,
}

/// Metadata about a query execution.
#[derive(Debug, Clone, Serialize)]
pub struct QueryStats {
    pub total_recipes_checked: usize,
    pub components_provided: usize,
    pub strategy_used: String,
    pub processing_time_ms: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CraftQueryResponse {
    pub craftable: Vec<CraftableMatch>,
    pub partial_components: Vec<PartialComponentMatch>,
    pub blocked_by_skills: Vec<PartialComponentMatch>,
    pub query_stats: QueryStats,
}

// ============================================================================
// craft_path_to payloads
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct CraftPathRequest {
    pub target_recipe_id: String,
    pub target_quantity: i64,
    pub current_inventory: Vec<Component>,
    pub skills: HashMap<String, i64>,
    pub station_id: Option<String>,
}

/// A component needed for a craft, compared against current inventory.
#[derive(Debug, Clone, Serialize)]
pub struct MaterialRequirement {
    pub component_id: String,
    pub quantity_needed: i64,
    pub quantity_have: i64,
    pub quantity_to_acquire: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub acquisition_methods: Vec<String>,
    pub is_craftable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub craft_recipe_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CraftPathTarget {
    pub recipe_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub recipe_name: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CraftPathSummary {
    pub total_components: usize,
    pub components_have: usize,
    pub components_to_acquire: usize,
    pub components_craftable: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CraftPathResponse {
    pub target: CraftPathTarget,
    pub feasible: bool,
    pub skill_ready: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skills_missing: Vec<SkillGap>,
    pub materials_needed: Vec<MaterialRequirement>,
    pub craft_time_sec: i64,
    pub summary: CraftPathSummary,
}

// ============================================================================
// recipe_lookup payloads
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct RecipeLookupRequest {
    pub recipe_id: Option<String>,
    pub search: Option<String>,
    pub skills: HashMap<String, i64>,
    pub station_id: Option<String>,
}

/// A lightweight recipe match for search results.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeSearchHit {
    pub recipe_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub category: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RecipeLookupResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe: Option<Recipe>,
    pub skill_ready: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skill_gaps: Vec<SkillGap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_analysis: Option<ProfitAnalysis>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub used_in_recipes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_results: Vec<RecipeSearchHit>,
}

// ============================================================================
// component_uses payloads
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ComponentUsesRequest {
    pub component_id: String,
    pub skills: HashMap<String, i64>,
    pub include_skill_locked: bool,
    pub station_id: Option<String>,
    pub strategy: Option<OptimizationStrategy>,
}

/// How a component is used in one recipe.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentUseInfo {
    pub recipe: Recipe,
    pub quantity_per_craft: i64,
    pub skill_ready: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skill_gaps: Vec<SkillGap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_analysis: Option<ProfitAnalysis>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentUsesResponse {
    pub component_id: String,
    pub used_in: Vec<ComponentUseInfo>,
    pub total_uses: usize,
    #[serde(skip_serializing_if = "is_zero")]
    pub market_sell_price: i64,
}

// ============================================================================
// skill_craft_paths payloads
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct SkillCraftPathsRequest {
    pub skills: HashMap<String, SkillProgress>,
    pub category_filter: Option<String>,
    pub limit: usize,
}

/// A skill that would unlock recipes if leveled once more.
#[derive(Debug, Clone, Serialize)]
pub struct SkillUnlockPath {
    pub skill: Skill,
    pub current_level: i64,
    pub xp_to_next_level: i64,
    pub recipes_unlocked_at_next: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SkillCraftPathsSummary {
    pub total_recipes: i64,
    pub recipes_unlocked: i64,
    pub recipes_locked: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub closest_unlock_skill: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub closest_unlock_xp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkillCraftPathsResponse {
    pub skill_paths: Vec<SkillUnlockPath>,
    pub summary: SkillCraftPathsSummary,
}

// ============================================================================
// bill_of_materials payloads
// ============================================================================

/// A raw material requirement in a bill of materials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomItem {
    pub item_id: String,
    pub quantity: i64,
}

/// An intermediate crafted item in the dependency tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomIntermediate {
    pub item_id: String,
    pub recipe_id: String,
    pub recipe_name: String,
    pub craft_runs: i64,
    pub total_produced: i64,
    pub total_needed: i64,
}

/// One crafting operation in the bottom-up build order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomCraftStep {
    pub step_number: i64,
    pub recipe_id: String,
    pub recipe_name: String,
    pub craft_runs: i64,
    pub output_item_id: String,
    pub output_per_run: i64,
}

/// Complete multi-level production plan for one target recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillOfMaterials {
    pub recipe_id: String,
    pub recipe_name: String,
    pub output_item_id: String,
    pub quantity: i64,
    pub raw_materials: Vec<BomItem>,
    pub intermediates: Vec<BomIntermediate>,
    pub craft_steps: Vec<BomCraftStep>,
    pub total_craft_time_sec: i64,
}
