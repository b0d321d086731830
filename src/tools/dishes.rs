//! Dish MCP Tools
//!
//! Tools for composing dishes from ingredients and inspecting their
//! nutrition.

use std::collections::HashMap;

use serde::Serialize;

use crate::db::Database;
use crate::models::{Dish, DishCreate, DishIngredient, DishIngredientCreate, Ingredient, NutritionProfile};
use crate::nutrition::{dish_profile, entry_calories, resolve_unit};

/// Response for create_dish
#[derive(Debug, Serialize)]
pub struct CreateDishResponse {
    pub id: i64,
    pub name: String,
    pub servings: u32,
    pub calories: i64,
    pub created_at: String,
}

/// One dish entry with the ingredient it resolves to
#[derive(Debug, Serialize)]
pub struct DishIngredientDetail {
    #[serde(flatten)]
    pub entry: DishIngredient,
    pub ingredient_name: Option<String>,
    pub calories: f64,
}

/// Full dish detail
#[derive(Debug, Serialize)]
pub struct DishDetail {
    pub id: i64,
    pub name: String,
    pub image: Option<String>,
    pub servings: u32,
    pub calories: i64,
    pub ingredients: Vec<DishIngredientDetail>,
    /// Summed ingredient nutrition at the dish's native servings
    pub nutrition: NutritionProfile,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub times_scheduled: i64,
}

/// Dish summary for listing
#[derive(Debug, Serialize)]
pub struct DishSummary {
    pub id: i64,
    pub name: String,
    pub image: Option<String>,
    pub servings: u32,
    pub calories: i64,
    pub ingredient_count: usize,
}

/// Response for list_dishes
#[derive(Debug, Serialize)]
pub struct ListDishesResponse {
    pub dishes: Vec<DishSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Response for recalculate_dish
#[derive(Debug, Serialize)]
pub struct RecalculateDishResponse {
    pub dish_id: i64,
    pub previous_calories: i64,
    pub calories: i64,
}

/// Response for delete_dish
#[derive(Debug, Serialize)]
pub struct DeleteDishResponse {
    pub success: bool,
    pub deleted_id: i64,
    /// Schedule occurrences that keep rendering from their copied fields
    pub times_scheduled: i64,
}

/// Response for dish_unit_ratio
#[derive(Debug, Serialize)]
pub struct UnitRatioResponse {
    pub dish_id: i64,
    pub ingredient_id: i64,
    pub unit: String,
    pub quantity: f64,
    pub base_amount: f64,
    pub base_unit: String,
    /// Multiples of the ingredient's base unit
    pub ratio: f64,
    pub calories: Option<f64>,
}

fn validate_entry(index: usize, entry: &DishIngredientCreate) -> Result<(), String> {
    if entry.units.is_empty() {
        return Err(format!("Ingredient entry {} needs at least one unit", index + 1));
    }

    let defaults = entry.units.iter().filter(|u| u.is_default).count();
    if defaults != 1 {
        return Err(format!(
            "Ingredient entry {} must mark exactly one default unit (found {})",
            index + 1,
            defaults
        ));
    }

    for unit in &entry.units {
        if unit.unit.trim().is_empty() {
            return Err(format!("Ingredient entry {} has a unit without a name", index + 1));
        }
        for (field, value) in [("value", unit.value), ("quantity", unit.quantity)] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(format!(
                        "Ingredient entry {}: unit '{}' has invalid {} {}",
                        index + 1,
                        unit.unit,
                        field,
                        v
                    ));
                }
            }
        }
    }

    Ok(())
}

fn ingredient_map(ingredients: Vec<Ingredient>) -> HashMap<i64, Ingredient> {
    ingredients.into_iter().map(|i| (i.id, i)).collect()
}

// ============================================================================
// Dish Tools
// ============================================================================

/// Create a new dish
///
/// Calories are derived from the referenced ingredients at creation time.
pub fn create_dish(db: &Database, mut data: DishCreate) -> Result<CreateDishResponse, String> {
    let name = data.name.trim().to_string();
    if name.is_empty() {
        return Err("Dish name cannot be empty".to_string());
    }
    if data.servings == 0 {
        return Err("servings must be greater than 0".to_string());
    }
    for (index, entry) in data.ingredients.iter().enumerate() {
        validate_entry(index, entry)?;
    }
    data.name = name;

    let dish = db
        .with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let ids: Vec<i64> = data.ingredients.iter().map(|e| e.ingredient_id).collect();
            let found = Ingredient::find_by_ids(&tx, &ids)?;
            let missing: Vec<i64> = ids
                .iter()
                .copied()
                .filter(|id| !found.iter().any(|i| i.id == *id))
                .collect();
            if !missing.is_empty() {
                return Ok(Err(missing));
            }

            let dish = Dish::create(&tx, &data)?;
            tx.commit()?;
            Ok(Ok(dish))
        })
        .map_err(|e| format!("Failed to create dish: {}", e))?
        .map_err(|missing| format!("Ingredients not found: {:?}", missing))?;

    tracing::info!(dish_id = dish.id, calories = dish.calories, "dish created");

    Ok(CreateDishResponse {
        id: dish.id,
        name: dish.name,
        servings: dish.servings,
        calories: dish.calories,
        created_at: dish.created_at,
    })
}

/// Get a dish with its entries and summed nutrition
pub fn get_dish(db: &Database, id: i64) -> Result<Option<DishDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let dish = match Dish::get_by_id(&conn, id).map_err(|e| format!("Failed to get dish: {}", e))? {
        Some(dish) => dish,
        None => return Ok(None),
    };

    let ids: Vec<i64> = dish.ingredients.iter().map(|e| e.ingredient_id).collect();
    let ingredients = ingredient_map(
        Ingredient::find_by_ids(&conn, &ids).map_err(|e| format!("Failed to get ingredients: {}", e))?,
    );

    let nutrition = dish_profile(&dish, &ingredients)
        .map_err(|e| format!("Dish {} has inconsistent nutrition: {}", id, e))?;

    let times_scheduled = Dish::get_times_scheduled(&conn, id)
        .map_err(|e| format!("Failed to get times scheduled: {}", e))?;

    let entries = dish
        .ingredients
        .into_iter()
        .map(|entry| DishIngredientDetail {
            ingredient_name: ingredients.get(&entry.ingredient_id).map(|i| i.name.clone()),
            calories: entry_calories(&entry, &ingredients),
            entry,
        })
        .collect();

    Ok(Some(DishDetail {
        id: dish.id,
        name: dish.name,
        image: dish.image,
        servings: dish.servings,
        calories: dish.calories,
        ingredients: entries,
        nutrition,
        notes: dish.notes,
        created_at: dish.created_at,
        updated_at: dish.updated_at,
        times_scheduled,
    }))
}

/// List dishes with optional name search
pub fn list_dishes(
    db: &Database,
    query: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<ListDishesResponse, String> {
    let limit = limit.min(200).max(1);
    let offset = offset.max(0);

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let dishes = Dish::list(&conn, query, limit, offset)
        .map_err(|e| format!("Failed to list dishes: {}", e))?;

    let total = Dish::count(&conn).map_err(|e| format!("Failed to count dishes: {}", e))?;

    let summaries = dishes
        .into_iter()
        .map(|d| DishSummary {
            id: d.id,
            ingredient_count: d.ingredients.len(),
            name: d.name,
            image: d.image,
            servings: d.servings,
            calories: d.calories,
        })
        .collect();

    Ok(ListDishesResponse {
        dishes: summaries,
        total,
        limit,
        offset,
    })
}

/// Re-derive a dish's calories from current ingredient data
pub fn recalculate_dish(db: &Database, id: i64) -> Result<RecalculateDishResponse, String> {
    let result = db
        .with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let previous = match Dish::get_by_id(&tx, id)? {
                Some(dish) => dish.calories,
                None => return Ok(None),
            };
            let dish = Dish::recalculate(&tx, id)?;
            tx.commit()?;
            Ok(dish.map(|d| (previous, d.calories)))
        })
        .map_err(|e| format!("Failed to recalculate dish: {}", e))?;

    let (previous_calories, calories) = result.ok_or_else(|| format!("Dish not found with id: {}", id))?;

    if previous_calories != calories {
        tracing::info!(dish_id = id, previous_calories, calories, "dish calories changed");
    }

    Ok(RecalculateDishResponse {
        dish_id: id,
        previous_calories,
        calories,
    })
}

/// Delete a dish
///
/// Scheduled occurrences are kept and project zero nutrition afterwards.
pub fn delete_dish(db: &Database, id: i64) -> Result<DeleteDishResponse, String> {
    let result = db
        .with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let times_scheduled = Dish::get_times_scheduled(&tx, id)?;
            let deleted = Dish::delete(&tx, id)?;
            tx.commit()?;
            Ok(deleted.then_some(times_scheduled))
        })
        .map_err(|e| format!("Failed to delete dish: {}", e))?;

    let times_scheduled = result.ok_or_else(|| format!("Dish not found with id: {}", id))?;

    Ok(DeleteDishResponse {
        success: true,
        deleted_id: id,
        times_scheduled,
    })
}

/// Convert a quantity of a named unit of one dish ingredient into base-unit
/// multiples
pub fn dish_unit_ratio(
    db: &Database,
    dish_id: i64,
    ingredient_id: i64,
    unit: &str,
    quantity: f64,
) -> Result<UnitRatioResponse, String> {
    if !quantity.is_finite() || quantity < 0.0 {
        return Err("quantity must be a non-negative number".to_string());
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let dish = Dish::get_by_id(&conn, dish_id)
        .map_err(|e| format!("Failed to get dish: {}", e))?
        .ok_or_else(|| format!("Dish not found with id: {}", dish_id))?;

    let entry = dish
        .ingredients
        .iter()
        .find(|e| e.ingredient_id == ingredient_id)
        .ok_or_else(|| format!("Dish {} has no ingredient {}", dish_id, ingredient_id))?;

    let ingredient = Ingredient::get_by_id(&conn, ingredient_id)
        .map_err(|e| format!("Failed to get ingredient: {}", e))?
        .ok_or_else(|| format!("Ingredient not found with id: {}", ingredient_id))?;

    let ratio = resolve_unit(&ingredient.base_unit, &entry.units, unit, quantity);
    let calories = ingredient.nutrition.as_ref().map(|n| n.calories() * ratio);

    Ok(UnitRatioResponse {
        dish_id,
        ingredient_id,
        unit: unit.to_string(),
        quantity,
        base_amount: ingredient.base_unit.amount,
        base_unit: ingredient.base_unit.unit,
        ratio,
        calories,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BaseUnit, DishIngredientUnit, IngredientCreate, Measure};
    use crate::tools::ingredients::add_ingredient;

    fn add(db: &Database, name: &str, calories: f64) -> i64 {
        let mut nutrition = NutritionProfile::zero();
        nutrition.nutrients.calories = Measure::new(calories, "kcal");
        nutrition.nutrients.carbs = Measure::new(10.0, "g");
        add_ingredient(
            db,
            IngredientCreate {
                name: name.to_string(),
                base_unit: BaseUnit { amount: 100.0, unit: "g".to_string() },
                nutrition: Some(nutrition),
                notes: None,
            },
        )
        .unwrap()
        .id
    }

    fn unit(name: &str, value: f64, quantity: f64, is_default: bool) -> DishIngredientUnit {
        DishIngredientUnit {
            value: Some(value),
            quantity: Some(quantity),
            unit: name.to_string(),
            is_default,
        }
    }

    fn dish(name: &str, ingredients: Vec<DishIngredientCreate>) -> DishCreate {
        DishCreate {
            name: name.to_string(),
            image: None,
            servings: 2,
            ingredients,
            notes: None,
        }
    }

    #[test]
    fn test_create_weights_calories() {
        let db = Database::in_memory().unwrap();
        let carrot = add(&db, "Carrot", 41.0);
        let rice = add(&db, "Rice", 130.0);

        let created = create_dish(
            &db,
            dish(
                "Carrot rice",
                vec![
                    DishIngredientCreate { ingredient_id: carrot, units: vec![unit("g", 100.0, 1.0, true)] },
                    DishIngredientCreate {
                        ingredient_id: rice,
                        units: vec![unit("g", 1.0, 1.0, false), unit("cup", 200.0, 1.0, true)],
                    },
                ],
            ),
        )
        .unwrap();

        // 41 + 130 * 2
        assert_eq!(created.calories, 301);

        let detail = get_dish(&db, created.id).unwrap().unwrap();
        assert_eq!(detail.ingredients.len(), 2);
        assert_eq!(detail.ingredients[1].ingredient_name.as_deref(), Some("Rice"));
        assert_eq!(detail.ingredients[1].calories, 260.0);
        // Summed nutrition is not weighted by units
        assert_eq!(detail.nutrition.calories(), 171.0);
        assert_eq!(detail.nutrition.nutrients.carbs, Measure::new(20.0, "g"));
    }

    #[test]
    fn test_create_rejects_malformed_units() {
        let db = Database::in_memory().unwrap();
        let carrot = add(&db, "Carrot", 41.0);

        let no_units = dish("A", vec![DishIngredientCreate { ingredient_id: carrot, units: Vec::new() }]);
        assert!(create_dish(&db, no_units).is_err());

        let two_defaults = dish(
            "B",
            vec![DishIngredientCreate {
                ingredient_id: carrot,
                units: vec![unit("g", 1.0, 1.0, true), unit("cup", 120.0, 1.0, true)],
            }],
        );
        assert!(create_dish(&db, two_defaults).is_err());

        let no_default = dish(
            "C",
            vec![DishIngredientCreate { ingredient_id: carrot, units: vec![unit("g", 1.0, 1.0, false)] }],
        );
        assert!(create_dish(&db, no_default).is_err());

        let mut zero_servings = dish("D", Vec::new());
        zero_servings.servings = 0;
        assert!(create_dish(&db, zero_servings).is_err());

        assert_eq!(list_dishes(&db, None, 50, 0).unwrap().total, 0);
    }

    #[test]
    fn test_create_rejects_unknown_ingredient() {
        let db = Database::in_memory().unwrap();

        let err = create_dish(
            &db,
            dish("Ghost", vec![DishIngredientCreate { ingredient_id: 42, units: vec![unit("g", 1.0, 1.0, true)] }]),
        )
        .unwrap_err();

        assert!(err.contains("42"));
        assert_eq!(list_dishes(&db, None, 50, 0).unwrap().total, 0);
    }

    #[test]
    fn test_unit_ratio() {
        let db = Database::in_memory().unwrap();
        let rice = add(&db, "Rice", 130.0);
        let created = create_dish(
            &db,
            dish(
                "Rice",
                vec![DishIngredientCreate { ingredient_id: rice, units: vec![unit("cup", 200.0, 1.0, true)] }],
            ),
        )
        .unwrap();

        let half_cup = dish_unit_ratio(&db, created.id, rice, "cup", 0.5).unwrap();
        assert_eq!(half_cup.ratio, 1.0);
        assert_eq!(half_cup.calories, Some(130.0));

        let grams = dish_unit_ratio(&db, created.id, rice, "g", 50.0).unwrap();
        assert_eq!(grams.ratio, 0.5);

        assert_eq!(dish_unit_ratio(&db, created.id, rice, "scoop", 1.0).unwrap().ratio, 0.0);
        assert!(dish_unit_ratio(&db, created.id, rice + 1, "g", 1.0).is_err());
    }

    #[test]
    fn test_recalculate_and_delete() {
        let db = Database::in_memory().unwrap();
        let carrot = add(&db, "Carrot", 41.0);
        let created = create_dish(
            &db,
            dish(
                "Carrots",
                vec![DishIngredientCreate { ingredient_id: carrot, units: vec![unit("g", 100.0, 1.0, true)] }],
            ),
        )
        .unwrap();

        crate::tools::ingredients::delete_ingredient(&db, carrot).unwrap();

        let recalculated = recalculate_dish(&db, created.id).unwrap();
        assert_eq!(recalculated.previous_calories, 41);
        assert_eq!(recalculated.calories, 0);

        let deleted = delete_dish(&db, created.id).unwrap();
        assert_eq!(deleted.times_scheduled, 0);
        assert!(get_dish(&db, created.id).unwrap().is_none());
        assert!(recalculate_dish(&db, created.id).is_err());
    }
}
