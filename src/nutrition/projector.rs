//! Schedule nutrition projection
//!
//! Attaches a serving-scaled nutrition profile to every dish occurrence of a
//! schedule. Everything is recomputed from the current dishes and
//! ingredients on each call; nothing is cached or written back.

use std::collections::{HashMap, HashSet};

use rusqlite::Connection;
use serde::Serialize;

use crate::db::DbResult;
use crate::models::{Dish, Ingredient, Meal, MealType, NutritionProfile, Schedule, ScheduledDish};
use super::aggregate::NutritionAggregator;
use super::error::{NutritionError, ProjectionError};
use super::scale::scale_to_servings;

/// Bulk read access to dishes and ingredients
///
/// Both lookups return only the records that exist; absent ids are simply
/// missing from the result.
pub trait NutritionSource {
    fn find_dishes_by_ids(&self, ids: &[i64]) -> DbResult<Vec<Dish>>;
    fn find_ingredients_by_ids(&self, ids: &[i64]) -> DbResult<Vec<Ingredient>>;
}

impl NutritionSource for Connection {
    fn find_dishes_by_ids(&self, ids: &[i64]) -> DbResult<Vec<Dish>> {
        Dish::find_by_ids(self, ids)
    }

    fn find_ingredients_by_ids(&self, ids: &[i64]) -> DbResult<Vec<Ingredient>> {
        Ingredient::find_by_ids(self, ids)
    }
}

/// A scheduled dish with its projected nutrition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedDish {
    #[serde(flatten)]
    pub scheduled: ScheduledDish,
    pub nutrition: NutritionProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedMeal {
    pub meal_type: MealType,
    pub dishes: Vec<ProjectedDish>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedSchedule {
    pub id: i64,
    pub date: String,
    pub calorie_target: Option<f64>,
    pub notes: Option<String>,
    pub meals: Vec<ProjectedMeal>,
}

/// Per-dish nutrition at the dish's native serving count
#[derive(Debug, Clone)]
struct DishBase {
    profile: NutritionProfile,
    native_servings: f64,
}

/// Distinct values in first-seen order
fn distinct(ids: impl IntoIterator<Item = i64>) -> Vec<i64> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Aggregate a dish's ingredient nutrition, unweighted by unit amounts
///
/// Ingredients that no longer exist, or have no nutrition, contribute an
/// empty profile.
pub fn dish_profile(
    dish: &Dish,
    ingredients: &HashMap<i64, Ingredient>,
) -> Result<NutritionProfile, NutritionError> {
    let mut aggregator = NutritionAggregator::new();

    for entry in &dish.ingredients {
        let nutrition = ingredients
            .get(&entry.ingredient_id)
            .and_then(|ingredient| ingredient.nutrition.as_ref());
        if nutrition.is_none() {
            tracing::debug!(
                dish_id = dish.id,
                ingredient_id = entry.ingredient_id,
                "no nutrition for ingredient; contributing nothing"
            );
        }
        aggregator.add_optional(nutrition)?;
    }

    Ok(aggregator.finish())
}

/// Project nutrition onto a list of meals
pub fn project_meals<S>(source: &S, meals: &[Meal]) -> Result<Vec<ProjectedMeal>, ProjectionError>
where
    S: NutritionSource + ?Sized,
{
    let dish_ids = distinct(
        meals
            .iter()
            .flat_map(|meal| meal.dishes.iter().map(|d| d.dish_id)),
    );

    let dishes = if dish_ids.is_empty() {
        Vec::new()
    } else {
        source.find_dishes_by_ids(&dish_ids)?
    };

    let ingredient_ids = distinct(
        dishes
            .iter()
            .flat_map(|dish| dish.ingredients.iter().map(|e| e.ingredient_id)),
    );

    let ingredients: HashMap<i64, Ingredient> = if ingredient_ids.is_empty() {
        HashMap::new()
    } else {
        source
            .find_ingredients_by_ids(&ingredient_ids)?
            .into_iter()
            .map(|ingredient| (ingredient.id, ingredient))
            .collect()
    };

    tracing::debug!(
        dishes = dish_ids.len(),
        found = dishes.len(),
        ingredients = ingredients.len(),
        "projecting schedule nutrition"
    );

    let mut bases: HashMap<i64, DishBase> = HashMap::with_capacity(dishes.len());
    for dish in &dishes {
        let profile = dish_profile(dish, &ingredients).map_err(|source| ProjectionError::Dish {
            dish_id: dish.id,
            source,
        })?;
        let native_servings = if dish.servings == 0 { 1.0 } else { f64::from(dish.servings) };
        bases.insert(dish.id, DishBase { profile, native_servings });
    }

    let projected = meals
        .iter()
        .map(|meal| ProjectedMeal {
            meal_type: meal.meal_type,
            dishes: meal
                .dishes
                .iter()
                .map(|scheduled| {
                    let nutrition = match bases.get(&scheduled.dish_id) {
                        Some(base) => scale_to_servings(
                            &base.profile,
                            Some(base.native_servings),
                            scheduled.servings,
                        ),
                        None => {
                            tracing::warn!(
                                dish_id = scheduled.dish_id,
                                scheduled_dish_id = scheduled.id,
                                "scheduled dish no longer exists; using zero nutrition"
                            );
                            NutritionProfile::zero()
                        }
                    };
                    ProjectedDish {
                        scheduled: scheduled.clone(),
                        nutrition,
                    }
                })
                .collect(),
        })
        .collect();

    Ok(projected)
}

/// Project nutrition onto every dish occurrence of a schedule
pub fn project_schedule<S>(source: &S, schedule: &Schedule) -> Result<ProjectedSchedule, ProjectionError>
where
    S: NutritionSource + ?Sized,
{
    let meals = project_meals(source, &schedule.meals)?;

    Ok(ProjectedSchedule {
        id: schedule.id,
        date: schedule.date.clone(),
        calorie_target: schedule.calorie_target,
        notes: schedule.notes.clone(),
        meals,
    })
}
