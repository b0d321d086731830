//! Nutrition calculation module
//!
//! Unit ratios, dish calories, profile aggregation, serving scaling and the
//! schedule projection built on top of them.

pub mod aggregate;
pub mod calories;
pub mod converter;
pub mod error;
pub mod projector;
pub mod scale;
pub mod totals;

pub use aggregate::{aggregate, NutritionAggregator};
pub use calories::{dish_calories, entry_calories};
pub use converter::{base_unit_ratio, default_unit, resolve_unit};
pub use error::{NutritionError, ProjectionError};
pub use projector::{
    dish_profile, project_meals, project_schedule, NutritionSource, ProjectedDish, ProjectedMeal,
    ProjectedSchedule,
};
pub use scale::{scale_profile, scale_to_servings, serving_factor};
pub use totals::{schedule_totals, OtherUnitTotal, ScheduleTotals};
