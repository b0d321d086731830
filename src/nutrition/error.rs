//! Nutrition error types

use thiserror::Error;

use crate::db::DbError;
use crate::models::NutrientKey;

/// Inconsistent source data found while combining profiles
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NutritionError {
    #[error("Unit mismatch for {nutrient}: expected '{expected}', got '{found}'")]
    UnitMismatch {
        nutrient: NutrientKey,
        expected: String,
        found: String,
    },
}

/// Failure projecting nutrition onto a schedule
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Failed to load dishes or ingredients: {0}")]
    Repository(#[from] DbError),

    #[error("Dish {dish_id} has inconsistent nutrition data: {source}")]
    Dish {
        dish_id: i64,
        #[source]
        source: NutritionError,
    },
}
