//! Data models
//!
//! Rust structs representing database entities.

mod dish;
mod ingredient;
mod nutrition;
mod schedule;

pub use dish::{Dish, DishCreate, DishIngredient, DishIngredientCreate, DishIngredientUnit};
pub use ingredient::{BaseUnit, Ingredient, IngredientCreate, IngredientUpdate};
pub use nutrition::{ItemGroup, Measure, NutrientItem, NutrientKey, Nutrients, NutritionProfile};
pub use schedule::{
    Meal, MealType, Schedule, ScheduleCreate, ScheduleUpdate, ScheduledDish,
    ScheduledDishCreate, ScheduledDishUpdate,
};
