//! Tests for the craft_path_to tool.

use rusqlite::Connection;

use craftplan::db;
use craftplan::models::{
    Component, CraftPathRequest, Recipe, RecipeComponent, RecipeOutput, Skill, SkillRequirement,
};
use craftplan::path::craft_path_to;

fn test_conn() -> Connection {
    let mut conn = Connection::open_in_memory().expect("open in-memory db");
    db::init_schema(&conn).expect("init schema");

    let recipes = vec![
        Recipe {
            id: "craft_scanner_1".to_string(),
            name: "Scanner I".to_string(),
            description: String::new(),
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
            components: vec![RecipeComponent {
                component_id: "ore_copper".to_string(),
                quantity: 3,
            }],
            skills_required: Vec::new(),
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
            components: vec![RecipeComponent {
                component_id: "ore_copper".to_string(),
                quantity: 6,
            }],
            skills_required: Vec::new(),
            output: RecipeOutput {
                item_id: "refined_circuits".to_string(),
                quantity: 2,
            },
        },
    ];
    db::bulk_insert_recipes(&mut conn, &recipes).expect("insert recipes");

    let skills = vec![Skill {
        id: "engineering".to_string(),
        name: "Engineering".to_string(),
        category: "technical".to_string(),
        description: String::new(),
        max_level: 5,
        prerequisites: Vec::new(),
        xp_thresholds: vec![100, 250, 500, 1000, 2000],
    }];
    db::bulk_insert_skills(&mut conn, &skills).expect("insert skills");

    conn
}

fn add_crystal_price(conn: &mut Connection) {
    let now: String = conn
        .query_row("SELECT datetime('now')", [], |row| row.get(0))
        .unwrap();
    db::insert_market_prices(
        conn,
        &[db::MarketPriceRecord {
            component_id: "ore_crystal".to_string(),
            station_id: "station_alpha".to_string(),
            buy_price: 9,
            sell_price: 7,
            volume_24h: 100,
            recorded_at: now,
        }],
    )
    .unwrap();
    db::refresh_price_summaries(conn).unwrap();
}

#[test]
fn test_single_level_gap_arithmetic() {
    let conn = test_conn();
    let req = CraftPathRequest {
        target_recipe_id: "craft_scanner_1".to_string(),
        target_quantity: 2,
        current_inventory: vec![Component {
            id: "refined_circuits".to_string(),
            quantity: 1,
        }],
        ..CraftPathRequest::default()
    };
    let resp = craft_path_to(&conn, &req).unwrap();

    assert_eq!(resp.target.recipe_name, "Scanner I");
    assert_eq!(resp.target.quantity, 2);
    assert_eq!(resp.craft_time_sec, 24);

    // Components come back in the recipe's stored order (sorted by id)
    let circuits = resp
        .materials_needed
        .iter()
        .find(|m| m.component_id == "refined_circuits")
        .unwrap();
    assert_eq!(circuits.quantity_needed, 4);
    assert_eq!(circuits.quantity_have, 1);
    assert_eq!(circuits.quantity_to_acquire, 3);
    assert!(circuits.is_craftable);
    assert_eq!(
        circuits.craft_recipe_id.as_deref(),
        Some("craft_refined_circuits")
    );
    assert_eq!(
        circuits.acquisition_methods,
        vec!["craft:craft_refined_circuits"]
    );

    let crystal = resp
        .materials_needed
        .iter()
        .find(|m| m.component_id == "ore_crystal")
        .unwrap();
    assert_eq!(crystal.quantity_needed, 6);
    assert_eq!(crystal.quantity_to_acquire, 6);
    assert!(!crystal.is_craftable);
    assert!(crystal.acquisition_methods.is_empty());

    // Raw crystal can be neither bought nor crafted here
    assert!(!resp.feasible);

    assert_eq!(resp.summary.total_components, 3);
    assert_eq!(resp.summary.components_have, 0);
    assert_eq!(resp.summary.components_to_acquire, 3);
    assert_eq!(resp.summary.components_craftable, 2);
}

#[test]
fn test_market_price_makes_raw_material_acquirable() {
    let mut conn = test_conn();
    add_crystal_price(&mut conn);

    let req = CraftPathRequest {
        target_recipe_id: "craft_scanner_1".to_string(),
        target_quantity: 1,
        station_id: Some("station_alpha".to_string()),
        ..CraftPathRequest::default()
    };
    let resp = craft_path_to(&conn, &req).unwrap();

    let crystal = resp
        .materials_needed
        .iter()
        .find(|m| m.component_id == "ore_crystal")
        .unwrap();
    assert_eq!(crystal.acquisition_methods, vec!["buy:station_alpha"]);
    assert!(resp.feasible);
}

#[test]
fn test_covered_inventory_needs_no_acquisition() {
    let conn = test_conn();
    let req = CraftPathRequest {
        target_recipe_id: "craft_refined_circuits".to_string(),
        target_quantity: 1,
        current_inventory: vec![Component {
            id: "ore_copper".to_string(),
            quantity: 10,
        }],
        ..CraftPathRequest::default()
    };
    let resp = craft_path_to(&conn, &req).unwrap();

    let copper = &resp.materials_needed[0];
    assert_eq!(copper.quantity_needed, 6);
    assert_eq!(copper.quantity_have, 10);
    assert_eq!(copper.quantity_to_acquire, 0);
    assert!(copper.acquisition_methods.is_empty());
    assert!(resp.feasible);
    assert_eq!(resp.summary.components_have, 1);
    assert_eq!(resp.summary.components_to_acquire, 0);
}

#[test]
fn test_skill_gap_reported_with_xp() {
    let conn = test_conn();
    let req = CraftPathRequest {
        target_recipe_id: "craft_scanner_1".to_string(),
        target_quantity: 1,
        skills: [("engineering".to_string(), 1)].into_iter().collect(),
        ..CraftPathRequest::default()
    };
    let resp = craft_path_to(&conn, &req).unwrap();

    assert!(!resp.skill_ready);
    assert_eq!(resp.skills_missing.len(), 1);
    let gap = &resp.skills_missing[0];
    assert_eq!(gap.skill_name, "Engineering");
    assert_eq!(gap.current_level, 1);
    assert_eq!(gap.required_level, 2);
    // XP threshold for level 2
    assert_eq!(gap.xp_to_next, 250);
}

#[test]
fn test_unknown_recipe_is_infeasible() {
    let conn = test_conn();
    let req = CraftPathRequest {
        target_recipe_id: "craft_missing".to_string(),
        target_quantity: 1,
        ..CraftPathRequest::default()
    };
    let resp = craft_path_to(&conn, &req).unwrap();

    assert!(!resp.feasible);
    assert_eq!(resp.target.recipe_id, "craft_missing");
    assert!(resp.target.recipe_name.is_empty());
    assert!(resp.materials_needed.is_empty());
}

#[test]
fn test_non_positive_quantity_normalises_to_one() {
    let conn = test_conn();
    let req = CraftPathRequest {
        target_recipe_id: "craft_refined_circuits".to_string(),
        target_quantity: 0,
        ..CraftPathRequest::default()
    };
    let resp = craft_path_to(&conn, &req).unwrap();
    assert_eq!(resp.target.quantity, 1);
    assert_eq!(resp.craft_time_sec, 5);
    assert_eq!(resp.materials_needed[0].quantity_needed, 6);
}
