//! Nutrition profile aggregation
//!
//! Sums fixed nutrients key by key and merges labeled items by
//! `(label, unit)`. A fixed nutrient's unit is settled by the first
//! contribution that makes its total non-zero; later contributions in another
//! unit are rejected rather than silently added.

use std::collections::HashMap;

use crate::models::{ItemGroup, Measure, NutrientItem, NutrientKey, NutritionProfile};
use super::error::NutritionError;

static EMPTY_PROFILE: NutritionProfile = NutritionProfile::EMPTY;

#[derive(Debug, Clone, PartialEq)]
enum UnitState {
    /// Total still zero; holds the latest unit seen, if any
    Unset(Option<String>),
    /// Canonical unit for the rest of the aggregation
    Set(String),
}

#[derive(Debug, Clone)]
struct FixedTotal {
    value: f64,
    unit: UnitState,
}

impl FixedTotal {
    fn new() -> Self {
        Self {
            value: 0.0,
            unit: UnitState::Unset(None),
        }
    }

    fn add(&mut self, key: NutrientKey, measure: &Measure) -> Result<(), NutritionError> {
        if !measure.value.is_finite() {
            tracing::warn!(nutrient = %key, value = measure.value, "ignoring non-finite nutrient value");
            return Ok(());
        }

        let unit = measure.unit.trim();

        if let UnitState::Set(canonical) = &self.unit {
            // A unitless zero is an absent nutrient
            if unit.is_empty() && measure.value == 0.0 {
                return Ok(());
            }
            if unit != canonical.as_str() {
                return Err(NutritionError::UnitMismatch {
                    nutrient: key,
                    expected: canonical.clone(),
                    found: unit.to_string(),
                });
            }
            self.value += measure.value;
            return Ok(());
        }

        if !unit.is_empty() {
            self.unit = UnitState::Unset(Some(unit.to_string()));
        }
        self.value += measure.value;

        if self.value != 0.0 {
            let settled = match &self.unit {
                UnitState::Unset(Some(unit)) => unit.clone(),
                _ => key.default_unit().to_string(),
            };
            self.unit = UnitState::Set(settled);
        }

        Ok(())
    }

    fn finish(self, key: NutrientKey) -> Measure {
        let unit = match self.unit {
            UnitState::Set(unit) | UnitState::Unset(Some(unit)) => unit,
            UnitState::Unset(None) => key.default_unit().to_string(),
        };
        Measure::new(self.value, unit)
    }
}

/// Labeled items in first-seen order, merged by `(label, unit)`
#[derive(Debug, Clone, Default)]
struct ItemTotals {
    items: Vec<NutrientItem>,
    index: HashMap<(String, String), usize>,
}

impl ItemTotals {
    fn add(&mut self, group: ItemGroup, item: &NutrientItem) {
        if !item.is_complete() {
            tracing::debug!(group = group.as_str(), label = %item.label, "skipping item without label or unit");
            return;
        }
        if !item.value.is_finite() {
            tracing::warn!(group = group.as_str(), label = %item.label, "ignoring non-finite item value");
            return;
        }

        let key = (item.label.clone(), item.unit.clone());
        match self.index.get(&key) {
            Some(&position) => self.items[position].value += item.value,
            None => {
                self.index.insert(key, self.items.len());
                self.items.push(item.clone());
            }
        }
    }
}

/// Accumulates nutrition profiles into a single total
#[derive(Debug, Clone)]
pub struct NutritionAggregator {
    nutrients: [FixedTotal; 7],
    groups: [ItemTotals; 6],
    count: usize,
}

impl Default for NutritionAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl NutritionAggregator {
    pub fn new() -> Self {
        Self {
            nutrients: std::array::from_fn(|_| FixedTotal::new()),
            groups: std::array::from_fn(|_| ItemTotals::default()),
            count: 0,
        }
    }

    /// Add one profile to the running total
    pub fn add(&mut self, profile: &NutritionProfile) -> Result<(), NutritionError> {
        for (key, measure) in profile.nutrients.iter() {
            self.nutrients[key as usize].add(key, measure)?;
        }
        self.add_items(profile);
        Ok(())
    }

    /// Add one profile, setting aside fixed nutrients whose unit disagrees
    /// with the running total
    ///
    /// The rejected measures are returned untouched; everything else is
    /// added as in [`add`](Self::add).
    pub fn add_compatible(&mut self, profile: &NutritionProfile) -> Vec<(NutrientKey, Measure)> {
        let mut rejected = Vec::new();
        for (key, measure) in profile.nutrients.iter() {
            if let Err(e) = self.nutrients[key as usize].add(key, measure) {
                tracing::debug!(error = %e, "setting aside nutrient");
                rejected.push((key, measure.clone()));
            }
        }
        self.add_items(profile);
        rejected
    }

    fn add_items(&mut self, profile: &NutritionProfile) {
        for group in ItemGroup::ALL {
            let totals = &mut self.groups[group as usize];
            for item in profile.items(group) {
                totals.add(group, item);
            }
        }
        self.count += 1;
    }

    /// Add a profile that may be absent; absence contributes nothing
    pub fn add_optional(&mut self, profile: Option<&NutritionProfile>) -> Result<(), NutritionError> {
        self.add(profile.unwrap_or(&EMPTY_PROFILE))
    }

    /// Number of profiles added so far
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn finish(self) -> NutritionProfile {
        let mut profile = NutritionProfile::default();

        for (key, total) in NutrientKey::ALL.into_iter().zip(self.nutrients) {
            *profile.nutrients.get_mut(key) = total.finish(key);
        }
        for (group, totals) in ItemGroup::ALL.into_iter().zip(self.groups) {
            *profile.items_mut(group) = totals.items;
        }

        profile
    }
}

/// Aggregate a sequence of profiles
///
/// An empty sequence yields [`NutritionProfile::zero`].
pub fn aggregate<'a, I>(profiles: I) -> Result<NutritionProfile, NutritionError>
where
    I: IntoIterator<Item = &'a NutritionProfile>,
{
    let mut aggregator = NutritionAggregator::new();
    for profile in profiles {
        aggregator.add(profile)?;
    }
    Ok(aggregator.finish())
}
