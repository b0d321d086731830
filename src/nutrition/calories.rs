//! Dish calorie calculation
//!
//! Calories are the one value weighted by each entry's chosen unit.

use std::collections::HashMap;

use crate::models::{DishIngredient, Ingredient};
use super::converter::{base_unit_ratio, default_unit};

/// Calories contributed by a single dish ingredient entry
///
/// Unresolvable entries (unknown ingredient, no nutrition, no units)
/// contribute 0.
pub fn entry_calories(entry: &DishIngredient, ingredients: &HashMap<i64, Ingredient>) -> f64 {
    let ingredient = match ingredients.get(&entry.ingredient_id) {
        Some(ingredient) => ingredient,
        None => {
            tracing::debug!(ingredient_id = entry.ingredient_id, "ingredient not found; 0 kcal");
            return 0.0;
        }
    };

    let nutrition = match ingredient.nutrition.as_ref() {
        Some(nutrition) => nutrition,
        None => return 0.0,
    };

    let unit = match default_unit(&entry.units) {
        Some(unit) => unit,
        None => {
            tracing::warn!(ingredient_id = entry.ingredient_id, "dish ingredient has no units");
            return 0.0;
        }
    };
    if !unit.is_default {
        tracing::warn!(
            ingredient_id = entry.ingredient_id,
            unit = %unit.unit,
            "no default unit marked; using first unit"
        );
    }

    let calories = nutrition.nutrients.calories.value;
    if !calories.is_finite() {
        return 0.0;
    }

    base_unit_ratio(ingredient.base_unit.amount, unit) * calories
}

/// Total calories of a dish, rounded to whole kcal
pub fn dish_calories(entries: &[DishIngredient], ingredients: &HashMap<i64, Ingredient>) -> i64 {
    let total: f64 = entries
        .iter()
        .map(|entry| entry_calories(entry, ingredients))
        .sum();

    total.round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BaseUnit, DishIngredientUnit, Measure, NutritionProfile};

    fn ingredient(id: i64, calories: Option<f64>) -> Ingredient {
        let nutrition = calories.map(|kcal| {
            let mut profile = NutritionProfile::zero();
            profile.nutrients.calories = Measure::new(kcal, "kcal");
            profile
        });
        Ingredient {
            id,
            name: format!("ingredient {}", id),
            base_unit: BaseUnit { amount: 100.0, unit: "g".to_string() },
            nutrition,
            notes: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn entry(ingredient_id: i64, units: Vec<DishIngredientUnit>) -> DishIngredient {
        DishIngredient { ingredient_id, units, nutrients: None }
    }

    fn grams(value: f64, quantity: f64, is_default: bool) -> DishIngredientUnit {
        DishIngredientUnit {
            value: Some(value),
            quantity: Some(quantity),
            unit: "g".to_string(),
            is_default,
        }
    }

    fn lookup(items: Vec<Ingredient>) -> HashMap<i64, Ingredient> {
        items.into_iter().map(|i| (i.id, i)).collect()
    }

    #[test]
    fn test_single_ingredient_at_base() {
        let ingredients = lookup(vec![ingredient(1, Some(41.0))]);
        let entries = vec![entry(1, vec![grams(100.0, 1.0, true)])];
        assert_eq!(dish_calories(&entries, &ingredients), 41);
    }

    #[test]
    fn test_sum_rounds_to_nearest() {
        let ingredients = lookup(vec![ingredient(1, Some(41.0)), ingredient(2, Some(33.0))]);
        let entries = vec![
            entry(1, vec![grams(100.0, 1.0, true)]),
            // 15 g of a 33 kcal/100 g ingredient = 4.95 kcal
            entry(2, vec![grams(15.0, 1.0, true)]),
        ];
        assert_eq!(dish_calories(&entries, &ingredients), 46);
    }

    #[test]
    fn test_uses_default_unit_only() {
        let ingredients = lookup(vec![ingredient(1, Some(100.0))]);
        let entries = vec![entry(
            1,
            vec![grams(100.0, 5.0, false), grams(100.0, 2.0, true)],
        )];
        assert_eq!(dish_calories(&entries, &ingredients), 200);
    }

    #[test]
    fn test_falls_back_to_first_unit() {
        let ingredients = lookup(vec![ingredient(1, Some(100.0))]);
        let entries = vec![entry(
            1,
            vec![grams(100.0, 3.0, false), grams(100.0, 1.0, false)],
        )];
        assert_eq!(dish_calories(&entries, &ingredients), 300);
    }

    #[test]
    fn test_unresolvable_entries_contribute_zero() {
        let ingredients = lookup(vec![ingredient(1, Some(41.0)), ingredient(2, None)]);
        let entries = vec![
            entry(1, vec![grams(100.0, 1.0, true)]),
            entry(2, vec![grams(100.0, 1.0, true)]),
            entry(3, vec![grams(100.0, 1.0, true)]),
            entry(1, Vec::new()),
        ];
        assert_eq!(dish_calories(&entries, &ingredients), 41);
    }

    #[test]
    fn test_zero_base_amount_contributes_zero() {
        let mut broken = ingredient(1, Some(500.0));
        broken.base_unit.amount = 0.0;
        let ingredients = lookup(vec![broken, ingredient(2, Some(41.0))]);
        let entries = vec![
            entry(1, vec![grams(100.0, 1.0, true)]),
            entry(2, vec![grams(100.0, 1.0, true)]),
        ];
        assert_eq!(dish_calories(&entries, &ingredients), 41);
    }
}
