//! Unit conversion functions
//!
//! Resolves the unit entries of a dish ingredient into multiples of the
//! ingredient's base unit.

use crate::models::{BaseUnit, DishIngredientUnit};

/// How many base units `value * quantity` represents
///
/// Malformed input never errors: a non-positive or non-finite base amount, or
/// a missing/non-finite value or quantity, yields 0.
fn ratio(base_amount: f64, value: Option<f64>, quantity: Option<f64>) -> f64 {
    if !base_amount.is_finite() || base_amount <= 0.0 {
        return 0.0;
    }

    match (value, quantity) {
        (Some(value), Some(quantity)) if value.is_finite() && quantity.is_finite() => {
            let ratio = value * quantity / base_amount;
            if ratio.is_finite() {
                ratio
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Calculate the base-unit ratio for a unit entry
///
/// Example: base 100 g, entry `{ value: 50, quantity: 2 }` -> 1.0
pub fn base_unit_ratio(base_amount: f64, unit: &DishIngredientUnit) -> f64 {
    ratio(base_amount, unit.value, unit.quantity)
}

/// The entry marked default, else the first one
pub fn default_unit(units: &[DishIngredientUnit]) -> Option<&DishIngredientUnit> {
    units.iter().find(|u| u.is_default).or_else(|| units.first())
}

/// Resolve an arbitrary quantity of a named unit into base-unit multiples
///
/// The base unit itself always resolves; other names must be declared among
/// `units`. Unknown units resolve to 0.
pub fn resolve_unit(
    base_unit: &BaseUnit,
    units: &[DishIngredientUnit],
    unit_name: &str,
    quantity: f64,
) -> f64 {
    let wanted = unit_name.trim();

    if let Some(entry) = units.iter().find(|u| u.unit.trim().eq_ignore_ascii_case(wanted)) {
        return ratio(base_unit.amount, entry.value, Some(quantity));
    }

    if base_unit.unit.trim().eq_ignore_ascii_case(wanted) {
        return ratio(base_unit.amount, Some(1.0), Some(quantity));
    }

    tracing::debug!(unit = wanted, "unit not declared for ingredient; resolving to 0");
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(value: Option<f64>, quantity: Option<f64>, name: &str, is_default: bool) -> DishIngredientUnit {
        DishIngredientUnit {
            value,
            quantity,
            unit: name.to_string(),
            is_default,
        }
    }

    fn per_100g() -> BaseUnit {
        BaseUnit { amount: 100.0, unit: "g".to_string() }
    }

    #[test]
    fn test_ratio_of_base_multiples() {
        let entry = unit(Some(50.0), Some(2.0), "g", true);
        assert!((base_unit_ratio(100.0, &entry) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_base_amount_yields_zero() {
        let entry = unit(Some(50.0), Some(2.0), "g", true);
        assert_eq!(base_unit_ratio(0.0, &entry), 0.0);
        assert_eq!(base_unit_ratio(-5.0, &entry), 0.0);
        assert_eq!(base_unit_ratio(f64::NAN, &entry), 0.0);
        assert_eq!(base_unit_ratio(f64::INFINITY, &entry), 0.0);
    }

    #[test]
    fn test_missing_or_non_finite_entry_yields_zero() {
        assert_eq!(base_unit_ratio(100.0, &unit(None, Some(1.0), "g", true)), 0.0);
        assert_eq!(base_unit_ratio(100.0, &unit(Some(1.0), None, "g", true)), 0.0);
        assert_eq!(base_unit_ratio(100.0, &unit(Some(f64::NAN), Some(1.0), "g", true)), 0.0);
        assert_eq!(base_unit_ratio(100.0, &unit(Some(1.0), Some(f64::INFINITY), "g", true)), 0.0);
    }

    #[test]
    fn test_default_unit_prefers_flagged_entry() {
        let units = vec![
            unit(Some(1.0), Some(1.0), "g", false),
            unit(Some(240.0), Some(1.0), "cup", true),
        ];
        assert_eq!(default_unit(&units).unwrap().unit, "cup");
    }

    #[test]
    fn test_default_unit_falls_back_to_first() {
        let units = vec![
            unit(Some(15.0), Some(2.0), "tbsp", false),
            unit(Some(240.0), Some(1.0), "cup", false),
        ];
        assert_eq!(default_unit(&units).unwrap().unit, "tbsp");
        assert!(default_unit(&[]).is_none());
    }

    #[test]
    fn test_resolve_declared_unit() {
        let units = vec![unit(Some(240.0), Some(1.0), "cup", true)];
        // Half a cup of a 240 g cup over a 100 g base
        let ratio = resolve_unit(&per_100g(), &units, "Cup", 0.5);
        assert!((ratio - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_resolve_base_unit_without_declaration() {
        let ratio = resolve_unit(&per_100g(), &[], "g", 250.0);
        assert!((ratio - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_resolve_unknown_unit() {
        let units = vec![unit(Some(240.0), Some(1.0), "cup", true)];
        assert_eq!(resolve_unit(&per_100g(), &units, "scoop", 3.0), 0.0);
    }
}
