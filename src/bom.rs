//! Multi-level bill-of-materials planning
//!
//! Resolves a target recipe into the complete set of raw materials,
//! intermediate crafts and an ordered bottom-up build plan. The whole
//! computation is a pure function of one catalog snapshot: the same catalog,
//! target and quantity always produce an identical plan, down to list order
//! and step numbering.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use crate::catalog::Catalog;
use crate::error::CraftError;
use crate::models::{BillOfMaterials, BomCraftStep, BomIntermediate, BomItem, Recipe};

/// Computes the full production plan for `quantity` outputs of the recipe.
///
/// Non-positive quantities are normalised to 1. Fails if the recipe id is
/// unknown or if any producible item in the dependency tree transitively
/// requires its own output.
pub fn compute_bill_of_materials(
    catalog: &Catalog,
    recipe_id: &str,
    quantity: i64,
) -> Result<BillOfMaterials, CraftError> {
    let quantity = quantity.max(1);

    let target = catalog
        .recipe(recipe_id)
        .ok_or_else(|| CraftError::RecipeNotFound(recipe_id.to_string()))?;

    let producers = canonical_producers(catalog);
    let closure = build_closure(target, &producers)?;
    let bottom_up = sequence(&closure)?;
    let (demand, craft_runs) = propagate_demand(&closure, &bottom_up, target, quantity);

    tracing::debug!(
        target = recipe_id,
        quantity,
        producible = closure.len(),
        "assembled bill of materials"
    );

    Ok(assemble_plan(
        target, quantity, &closure, &bottom_up, &demand, &craft_runs,
    ))
}

/// Picks exactly one producing recipe per output item.
///
/// The winner is a pure function of the recipe set: the comparator below is a
/// strict total order (recipe ids are unique), so the result cannot depend on
/// the order recipes are iterated in.
fn canonical_producers(catalog: &Catalog) -> HashMap<&str, &Recipe> {
    let mut producers: HashMap<&str, &Recipe> = HashMap::new();
    for recipe in catalog.recipes() {
        producers
            .entry(recipe.output.item_id.as_str())
            .and_modify(|incumbent| {
                if prefer(recipe, incumbent) {
                    *incumbent = recipe;
                }
            })
            .or_insert(recipe);
    }
    producers
}

/// Total order over competing producers of the same item: shorter craft time
/// wins, then higher output per run, then lexicographically smaller id.
fn prefer(candidate: &Recipe, incumbent: &Recipe) -> bool {
    if candidate.craft_time_sec != incumbent.craft_time_sec {
        return candidate.craft_time_sec < incumbent.craft_time_sec;
    }
    if candidate.output.quantity != incumbent.output.quantity {
        return candidate.output.quantity > incumbent.output.quantity;
    }
    candidate.id < incumbent.id
}

/// Discovers every producible item the target transitively depends on,
/// paired with its canonical recipe.
///
/// The requested recipe is the root of the computation: it represents its
/// output item even when the canonical map would pick a different producer
/// for that item. Items without a producer are raw materials and end the
/// traversal. Revisiting an already resolved item is a diamond dependency
/// and a no-op; revisiting an item still on the active path is a cycle.
fn build_closure<'a>(
    target: &'a Recipe,
    producers: &HashMap<&'a str, &'a Recipe>,
) -> Result<BTreeMap<&'a str, &'a Recipe>, CraftError> {
    let mut closure = BTreeMap::new();
    let mut resolved = HashSet::new();
    let mut path = HashSet::new();

    let root = target.output.item_id.as_str();
    closure.insert(root, target);
    path.insert(root);
    for comp in &target.components {
        visit(
            comp.component_id.as_str(),
            producers,
            &mut closure,
            &mut resolved,
            &mut path,
        )?;
    }
    path.remove(root);

    Ok(closure)
}

fn visit<'a>(
    item_id: &'a str,
    producers: &HashMap<&'a str, &'a Recipe>,
    closure: &mut BTreeMap<&'a str, &'a Recipe>,
    resolved: &mut HashSet<&'a str>,
    path: &mut HashSet<&'a str>,
) -> Result<(), CraftError> {
    if path.contains(item_id) {
        return Err(CraftError::CycleDetected(item_id.to_string()));
    }
    if resolved.contains(item_id) {
        return Ok(());
    }

    let Some(recipe) = producers.get(item_id).copied() else {
        // Raw material: nothing produces it, traversal stops here.
        resolved.insert(item_id);
        return Ok(());
    };

    closure.insert(item_id, recipe);
    path.insert(item_id);
    for comp in &recipe.components {
        visit(comp.component_id.as_str(), producers, closure, resolved, path)?;
    }
    path.remove(item_id);
    resolved.insert(item_id);

    Ok(())
}

/// Orders the closure bottom-up: every item strictly after the producible
/// components it consumes (Kahn's algorithm over producible-to-producible
/// edges; edges to raw materials are not sequenced).
///
/// Nodes that become ready together are consumed in ascending item-id order,
/// so step numbering never depends on container iteration order.
fn sequence<'a>(closure: &BTreeMap<&'a str, &'a Recipe>) -> Result<Vec<&'a str>, CraftError> {
    let mut in_degree: BTreeMap<&str, usize> = closure.keys().map(|&item| (item, 0)).collect();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for (&item_id, recipe) in closure {
        for comp in &recipe.components {
            let comp_id = comp.component_id.as_str();
            if closure.contains_key(comp_id) {
                dependents.entry(comp_id).or_default().push(item_id);
                if let Some(degree) = in_degree.get_mut(item_id) {
                    *degree += 1;
                }
            }
        }
    }

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|&(_, &degree)| degree == 0)
        .map(|(&item, _)| item)
        .collect();

    let mut order = Vec::with_capacity(closure.len());
    while let Some(item) = ready.pop_first() {
        order.push(item);
        if let Some(deps) = dependents.get(item) {
            for &dependent in deps {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }
    }

    if order.len() != closure.len() {
        // The closure traversal already rejected cycles, so an incomplete
        // order means the graph construction itself is wrong.
        return Err(CraftError::Inconsistent(
            "bottom-up order does not cover every producible item",
        ));
    }

    Ok(order)
}

/// Walks the closure top-down, fixing the number of craft runs per item and
/// accumulating the demand each run places on its components.
///
/// Processing in reverse bottom-up order guarantees that every consumer of an
/// item has contributed its demand before the item's own runs are fixed, so
/// diamond dependencies accumulate additively.
fn propagate_demand<'a>(
    closure: &BTreeMap<&'a str, &'a Recipe>,
    bottom_up: &[&'a str],
    target: &'a Recipe,
    quantity: i64,
) -> (BTreeMap<&'a str, i64>, BTreeMap<&'a str, i64>) {
    let mut demand: BTreeMap<&str, i64> = BTreeMap::new();
    demand.insert(target.output.item_id.as_str(), quantity);
    let mut craft_runs: BTreeMap<&str, i64> = BTreeMap::new();

    for &item_id in bottom_up.iter().rev() {
        let item_demand = demand.get(item_id).copied().unwrap_or(0);
        if item_demand == 0 {
            continue;
        }
        let Some(recipe) = closure.get(item_id) else {
            continue;
        };

        let runs = div_ceil(item_demand, recipe.output.quantity.max(1));
        craft_runs.insert(item_id, runs);

        for comp in &recipe.components {
            *demand.entry(comp.component_id.as_str()).or_insert(0) += runs * comp.quantity;
        }
    }

    (demand, craft_runs)
}

/// Smallest number of runs whose combined output covers the demand.
fn div_ceil(demand: i64, output_per_run: i64) -> i64 {
    (demand + output_per_run - 1) / output_per_run
}

fn assemble_plan(
    target: &Recipe,
    quantity: i64,
    closure: &BTreeMap<&str, &Recipe>,
    bottom_up: &[&str],
    demand: &BTreeMap<&str, i64>,
    craft_runs: &BTreeMap<&str, i64>,
) -> BillOfMaterials {
    let target_item = target.output.item_id.as_str();

    // BTreeMap iteration gives the ascending item-id order the payload
    // promises for raw materials and intermediates.
    let raw_materials = demand
        .iter()
        .filter(|&(item_id, &qty)| qty > 0 && !closure.contains_key(item_id))
        .map(|(&item_id, &qty)| BomItem {
            item_id: item_id.to_string(),
            quantity: qty,
        })
        .collect();

    let mut intermediates = Vec::new();
    for (&item_id, &recipe) in closure {
        if item_id == target_item {
            continue;
        }
        let runs = craft_runs.get(item_id).copied().unwrap_or(0);
        if runs == 0 {
            continue;
        }
        intermediates.push(BomIntermediate {
            item_id: item_id.to_string(),
            recipe_id: recipe.id.clone(),
            recipe_name: recipe.name.clone(),
            craft_runs: runs,
            total_produced: runs * recipe.output.quantity,
            total_needed: demand.get(item_id).copied().unwrap_or(0),
        });
    }

    let mut craft_steps = Vec::new();
    let mut step_number = 1;
    for &item_id in bottom_up {
        let Some(&recipe) = closure.get(item_id) else {
            continue;
        };
        let runs = craft_runs.get(item_id).copied().unwrap_or(0);
        if runs == 0 {
            continue;
        }
        craft_steps.push(BomCraftStep {
            step_number,
            recipe_id: recipe.id.clone(),
            recipe_name: recipe.name.clone(),
            craft_runs: runs,
            output_item_id: recipe.output.item_id.clone(),
            output_per_run: recipe.output.quantity,
        });
        step_number += 1;
    }

    let total_craft_time_sec = craft_runs
        .iter()
        .filter_map(|(item_id, &runs)| {
            closure
                .get(item_id)
                .map(|recipe| recipe.craft_time_sec * runs)
        })
        .sum();

    BillOfMaterials {
        recipe_id: target.id.clone(),
        recipe_name: target.name.clone(),
        output_item_id: target.output.item_id.clone(),
        quantity,
        raw_materials,
        intermediates,
        craft_steps,
        total_craft_time_sec,
    }
}

impl fmt::Display for BillOfMaterials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Bill of Materials ===")?;
        writeln!(
            f,
            "Target: {} x{} ({})",
            self.recipe_name, self.quantity, self.recipe_id
        )?;
        writeln!(f)?;

        writeln!(f, "Raw materials:")?;
        for raw in &self.raw_materials {
            writeln!(f, "  {:<24} x{}", raw.item_id, raw.quantity)?;
        }
        writeln!(f)?;

        if !self.intermediates.is_empty() {
            writeln!(f, "Intermediates:")?;
            for im in &self.intermediates {
                writeln!(
                    f,
                    "  {:<24} {} runs -> {} produced / {} needed",
                    im.item_id, im.craft_runs, im.total_produced, im.total_needed
                )?;
            }
            writeln!(f)?;
        }

        writeln!(f, "Craft steps:")?;
        for step in &self.craft_steps {
            writeln!(
                f,
                "  {}. {} x{} (-> {} x{} per run)",
                step.step_number,
                step.recipe_name,
                step.craft_runs,
                step.output_item_id,
                step.output_per_run
            )?;
        }
        writeln!(f)?;

        writeln!(f, "Total craft time: {}s", self.total_craft_time_sec)?;
        Ok(())
    }
}
