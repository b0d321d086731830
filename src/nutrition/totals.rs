//! Day totals for a projected schedule

use serde::Serialize;

use crate::models::{Measure, NutrientKey, NutritionProfile};
use super::aggregate::NutritionAggregator;
use super::projector::ProjectedSchedule;

/// Amount of a fixed nutrient reported in a unit other than the day total's
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OtherUnitTotal {
    pub nutrient: NutrientKey,
    pub value: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTotals {
    /// Every dish occurrence of the day
    pub planned: NutritionProfile,
    /// Occurrences marked eaten
    pub eaten: NutritionProfile,
    /// Planned amounts that could not join `planned`, summed per unit
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub planned_other_units: Vec<OtherUnitTotal>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub eaten_other_units: Vec<OtherUnitTotal>,
    pub calorie_target: Option<f64>,
    /// Target minus planned calories
    pub remaining_calories: Option<f64>,
}

/// Day total that tolerates dishes reporting a nutrient in different units
struct DayTotal {
    aggregator: NutritionAggregator,
    other_units: Vec<OtherUnitTotal>,
}

impl DayTotal {
    fn new() -> Self {
        Self {
            aggregator: NutritionAggregator::new(),
            other_units: Vec::new(),
        }
    }

    fn add(&mut self, dish_id: i64, nutrition: &NutritionProfile) {
        for (nutrient, Measure { value, unit }) in self.aggregator.add_compatible(nutrition) {
            tracing::warn!(dish_id, %nutrient, %unit, "nutrient unit differs from the day total");
            match self
                .other_units
                .iter_mut()
                .find(|other| other.nutrient == nutrient && other.unit == unit)
            {
                Some(other) => other.value += value,
                None => self.other_units.push(OtherUnitTotal { nutrient, value, unit }),
            }
        }
    }

    fn finish(self) -> (NutritionProfile, Vec<OtherUnitTotal>) {
        (self.aggregator.finish(), self.other_units)
    }
}

/// Sum the projected nutrition of a schedule, planned and eaten
///
/// Dishes are validated one at a time during projection, so two dishes may
/// still disagree on a nutrient's unit. Such amounts are kept apart in the
/// `*_other_units` lists instead of failing the day.
pub fn schedule_totals(schedule: &ProjectedSchedule) -> ScheduleTotals {
    let mut planned = DayTotal::new();
    let mut eaten = DayTotal::new();

    for dish in schedule.meals.iter().flat_map(|meal| meal.dishes.iter()) {
        planned.add(dish.scheduled.dish_id, &dish.nutrition);
        if dish.scheduled.is_eaten {
            eaten.add(dish.scheduled.dish_id, &dish.nutrition);
        }
    }

    let (planned, planned_other_units) = planned.finish();
    let (eaten, eaten_other_units) = eaten.finish();
    let remaining_calories = schedule
        .calorie_target
        .map(|target| target - planned.calories());

    ScheduleTotals {
        planned,
        eaten,
        planned_other_units,
        eaten_other_units,
        calorie_target: schedule.calorie_target,
        remaining_calories,
    }
}
