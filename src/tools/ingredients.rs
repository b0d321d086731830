//! Ingredient MCP Tools
//!
//! Tools for managing ingredients and their per-base-unit nutrition.

use serde::Serialize;

use crate::db::Database;
use crate::models::{
    BaseUnit, Ingredient, IngredientCreate, IngredientUpdate, ItemGroup, NutrientKey, NutritionProfile,
};

/// Response for add_ingredient
#[derive(Debug, Serialize)]
pub struct CreateIngredientResponse {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

/// Ingredient with usage information
#[derive(Debug, Serialize)]
pub struct IngredientDetail {
    #[serde(flatten)]
    pub ingredient: Ingredient,
    pub dish_usage_count: i64,
}

/// Ingredient summary for listing
#[derive(Debug, Serialize)]
pub struct IngredientSummary {
    pub id: i64,
    pub name: String,
    pub base_unit: BaseUnit,
    pub calories: Option<f64>,
    pub has_nutrition: bool,
}

/// Response for list_ingredients
#[derive(Debug, Serialize)]
pub struct ListIngredientsResponse {
    pub ingredients: Vec<IngredientSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Response for update_ingredient
#[derive(Debug, Serialize)]
pub struct UpdateIngredientResponse {
    pub success: bool,
    pub updated_at: String,
    /// Dishes still carrying calories derived from the old data
    pub dishes_to_recalculate: i64,
}

/// Response for delete_ingredient
#[derive(Debug, Serialize)]
pub struct DeleteIngredientResponse {
    pub success: bool,
    pub deleted_id: i64,
    /// Dish entries now pointing at a missing ingredient
    pub orphaned_dish_entries: i64,
}

fn validate_base_unit(base_unit: &BaseUnit) -> Result<(), String> {
    if !base_unit.amount.is_finite() || base_unit.amount <= 0.0 {
        return Err("base_unit.amount must be greater than 0".to_string());
    }
    if base_unit.unit.trim().is_empty() {
        return Err("base_unit.unit cannot be empty".to_string());
    }
    Ok(())
}

/// Reject negative or non-finite amounts and give unitless nutrients their
/// default unit
fn normalize_nutrition(nutrition: &mut NutritionProfile) -> Result<(), String> {
    for key in NutrientKey::ALL {
        let measure = nutrition.nutrients.get_mut(key);
        if !measure.value.is_finite() || measure.value < 0.0 {
            return Err(format!("{} must be a non-negative number", key));
        }
        if measure.value != 0.0 && measure.unit.trim().is_empty() {
            measure.unit = key.default_unit().to_string();
        }
    }
    for group in ItemGroup::ALL {
        if let Some(item) = nutrition
            .items(group)
            .iter()
            .find(|item| !item.value.is_finite() || item.value < 0.0)
        {
            return Err(format!(
                "{} '{}' must be a non-negative number",
                group.as_str(),
                item.label
            ));
        }
    }
    Ok(())
}

// ============================================================================
// Ingredient Tools
// ============================================================================

/// Add a new ingredient
pub fn add_ingredient(db: &Database, mut data: IngredientCreate) -> Result<CreateIngredientResponse, String> {
    let name = data.name.trim().to_string();
    if name.is_empty() {
        return Err("Ingredient name cannot be empty".to_string());
    }
    validate_base_unit(&data.base_unit)?;
    if let Some(ref mut nutrition) = data.nutrition {
        normalize_nutrition(nutrition)?;
    }
    data.name = name;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let ingredient = Ingredient::create(&conn, &data)
        .map_err(|e| format!("Failed to create ingredient: {}", e))?;

    tracing::info!(ingredient_id = ingredient.id, name = %ingredient.name, "ingredient added");

    Ok(CreateIngredientResponse {
        id: ingredient.id,
        name: ingredient.name,
        created_at: ingredient.created_at,
    })
}

/// Get an ingredient by ID
pub fn get_ingredient(db: &Database, id: i64) -> Result<Option<IngredientDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let ingredient = Ingredient::get_by_id(&conn, id)
        .map_err(|e| format!("Failed to get ingredient: {}", e))?;

    match ingredient {
        Some(ingredient) => {
            let dish_usage_count = Ingredient::get_usage_count(&conn, id)
                .map_err(|e| format!("Failed to get usage count: {}", e))?;
            Ok(Some(IngredientDetail { ingredient, dish_usage_count }))
        }
        None => Ok(None),
    }
}

/// List ingredients with optional name search
pub fn list_ingredients(
    db: &Database,
    query: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<ListIngredientsResponse, String> {
    let limit = limit.min(200).max(1);
    let offset = offset.max(0);

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let ingredients = Ingredient::list(&conn, query, limit, offset)
        .map_err(|e| format!("Failed to list ingredients: {}", e))?;

    let total = Ingredient::count(&conn)
        .map_err(|e| format!("Failed to count ingredients: {}", e))?;

    let summaries = ingredients
        .into_iter()
        .map(|i| IngredientSummary {
            id: i.id,
            calories: i.nutrition.as_ref().map(NutritionProfile::calories),
            has_nutrition: i.nutrition.is_some(),
            name: i.name,
            base_unit: i.base_unit,
        })
        .collect();

    Ok(ListIngredientsResponse {
        ingredients: summaries,
        total,
        limit,
        offset,
    })
}

/// Update an ingredient
///
/// Dishes keep their stored calories until recalculated; the response says
/// how many are affected.
pub fn update_ingredient(
    db: &Database,
    id: i64,
    mut data: IngredientUpdate,
) -> Result<UpdateIngredientResponse, String> {
    if let Some(ref name) = data.name {
        let trimmed = name.trim().to_string();
        if trimmed.is_empty() {
            return Err("Ingredient name cannot be empty".to_string());
        }
        data.name = Some(trimmed);
    }
    if let Some(ref base_unit) = data.base_unit {
        validate_base_unit(base_unit)?;
    }
    if let Some(ref mut nutrition) = data.nutrition {
        normalize_nutrition(nutrition)?;
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let updated = Ingredient::update(&conn, id, &data)
        .map_err(|e| format!("Failed to update ingredient: {}", e))?
        .ok_or_else(|| format!("Ingredient not found with id: {}", id))?;

    let dishes_to_recalculate = Ingredient::get_usage_count(&conn, id)
        .map_err(|e| format!("Failed to get usage count: {}", e))?;

    Ok(UpdateIngredientResponse {
        success: true,
        updated_at: updated.updated_at,
        dishes_to_recalculate,
    })
}

/// Delete an ingredient
///
/// Dishes referencing it keep their entries, which then contribute nothing.
pub fn delete_ingredient(db: &Database, id: i64) -> Result<DeleteIngredientResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let orphaned_dish_entries = Ingredient::get_usage_count(&conn, id)
        .map_err(|e| format!("Failed to check dish usage: {}", e))?;

    let deleted = Ingredient::delete(&conn, id)
        .map_err(|e| format!("Failed to delete ingredient: {}", e))?;
    if !deleted {
        return Err(format!("Ingredient not found with id: {}", id));
    }

    if orphaned_dish_entries > 0 {
        tracing::warn!(ingredient_id = id, orphaned_dish_entries, "deleted ingredient still used by dishes");
    }

    Ok(DeleteIngredientResponse {
        success: true,
        deleted_id: id,
        orphaned_dish_entries,
    })
}
