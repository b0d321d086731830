//! Nutrition profile data structures
//!
//! Used by ingredients, dish snapshots, and projected schedules.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The seven fixed nutrient keys every profile carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NutrientKey {
    Calories,
    Carbs,
    Fat,
    Protein,
    Fiber,
    Sodium,
    Cholesterol,
}

impl NutrientKey {
    pub const ALL: [NutrientKey; 7] = [
        NutrientKey::Calories,
        NutrientKey::Carbs,
        NutrientKey::Fat,
        NutrientKey::Protein,
        NutrientKey::Fiber,
        NutrientKey::Sodium,
        NutrientKey::Cholesterol,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NutrientKey::Calories => "calories",
            NutrientKey::Carbs => "carbs",
            NutrientKey::Fat => "fat",
            NutrientKey::Protein => "protein",
            NutrientKey::Fiber => "fiber",
            NutrientKey::Sodium => "sodium",
            NutrientKey::Cholesterol => "cholesterol",
        }
    }

    /// Unit shown for a key nobody has contributed a unit to
    pub fn default_unit(&self) -> &'static str {
        match self {
            NutrientKey::Calories => "kcal",
            NutrientKey::Sodium | NutrientKey::Cholesterol => "mg",
            _ => "g",
        }
    }
}

impl fmt::Display for NutrientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A numeric value in a declared unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Measure {
    pub value: f64,
    pub unit: String,
}

impl Measure {
    pub const ZERO: Measure = Measure {
        value: 0.0,
        unit: String::new(),
    };

    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }
}

/// Fixed macro/micro nutrient block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Nutrients {
    pub calories: Measure,
    pub carbs: Measure,
    pub fat: Measure,
    pub protein: Measure,
    pub fiber: Measure,
    pub sodium: Measure,
    pub cholesterol: Measure,
}

impl Nutrients {
    pub const EMPTY: Nutrients = Nutrients {
        calories: Measure::ZERO,
        carbs: Measure::ZERO,
        fat: Measure::ZERO,
        protein: Measure::ZERO,
        fiber: Measure::ZERO,
        sodium: Measure::ZERO,
        cholesterol: Measure::ZERO,
    };

    pub fn get(&self, key: NutrientKey) -> &Measure {
        match key {
            NutrientKey::Calories => &self.calories,
            NutrientKey::Carbs => &self.carbs,
            NutrientKey::Fat => &self.fat,
            NutrientKey::Protein => &self.protein,
            NutrientKey::Fiber => &self.fiber,
            NutrientKey::Sodium => &self.sodium,
            NutrientKey::Cholesterol => &self.cholesterol,
        }
    }

    pub fn get_mut(&mut self, key: NutrientKey) -> &mut Measure {
        match key {
            NutrientKey::Calories => &mut self.calories,
            NutrientKey::Carbs => &mut self.carbs,
            NutrientKey::Fat => &mut self.fat,
            NutrientKey::Protein => &mut self.protein,
            NutrientKey::Fiber => &mut self.fiber,
            NutrientKey::Sodium => &mut self.sodium,
            NutrientKey::Cholesterol => &mut self.cholesterol,
        }
    }

    /// Iterate keys in their canonical order
    pub fn iter(&self) -> impl Iterator<Item = (NutrientKey, &Measure)> + '_ {
        NutrientKey::ALL.into_iter().map(move |key| (key, self.get(key)))
    }
}

/// The variable-length labeled lists of a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemGroup {
    Minerals,
    Vitamins,
    Sugars,
    Fats,
    FattyAcids,
    AminoAcids,
}

impl ItemGroup {
    pub const ALL: [ItemGroup; 6] = [
        ItemGroup::Minerals,
        ItemGroup::Vitamins,
        ItemGroup::Sugars,
        ItemGroup::Fats,
        ItemGroup::FattyAcids,
        ItemGroup::AminoAcids,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemGroup::Minerals => "minerals",
            ItemGroup::Vitamins => "vitamins",
            ItemGroup::Sugars => "sugars",
            ItemGroup::Fats => "fats",
            ItemGroup::FattyAcids => "fattyAcids",
            ItemGroup::AminoAcids => "aminoAcids",
        }
    }
}

/// A labeled entry such as `Iron 2 mg`
///
/// Missing labels or units deserialize to empty strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutrientItem {
    pub label: String,
    pub value: f64,
    pub unit: String,
}

impl NutrientItem {
    pub fn new(label: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value,
            unit: unit.into(),
        }
    }

    /// Both label and unit present
    pub fn is_complete(&self) -> bool {
        !self.label.trim().is_empty() && !self.unit.trim().is_empty()
    }
}

/// Full nutrition profile: fixed nutrients plus labeled lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NutritionProfile {
    pub nutrients: Nutrients,
    pub minerals: Vec<NutrientItem>,
    pub vitamins: Vec<NutrientItem>,
    pub sugars: Vec<NutrientItem>,
    pub fats: Vec<NutrientItem>,
    pub fatty_acids: Vec<NutrientItem>,
    pub amino_acids: Vec<NutrientItem>,
}

impl NutritionProfile {
    /// Stand-in for an ingredient without nutrition data
    pub const EMPTY: NutritionProfile = NutritionProfile {
        nutrients: Nutrients::EMPTY,
        minerals: Vec::new(),
        vitamins: Vec::new(),
        sugars: Vec::new(),
        fats: Vec::new(),
        fatty_acids: Vec::new(),
        amino_acids: Vec::new(),
    };

    /// All-zero profile with each key's default unit
    pub fn zero() -> Self {
        let mut profile = Self::default();
        for key in NutrientKey::ALL {
            profile.nutrients.get_mut(key).unit = key.default_unit().to_string();
        }
        profile
    }

    pub fn items(&self, group: ItemGroup) -> &[NutrientItem] {
        match group {
            ItemGroup::Minerals => &self.minerals,
            ItemGroup::Vitamins => &self.vitamins,
            ItemGroup::Sugars => &self.sugars,
            ItemGroup::Fats => &self.fats,
            ItemGroup::FattyAcids => &self.fatty_acids,
            ItemGroup::AminoAcids => &self.amino_acids,
        }
    }

    pub fn items_mut(&mut self, group: ItemGroup) -> &mut Vec<NutrientItem> {
        match group {
            ItemGroup::Minerals => &mut self.minerals,
            ItemGroup::Vitamins => &mut self.vitamins,
            ItemGroup::Sugars => &mut self.sugars,
            ItemGroup::Fats => &mut self.fats,
            ItemGroup::FattyAcids => &mut self.fatty_acids,
            ItemGroup::AminoAcids => &mut self.amino_acids,
        }
    }

    /// Scale every value by a multiplier, units unchanged
    pub fn scale(&self, multiplier: f64) -> Self {
        let mut scaled = self.clone();
        for key in NutrientKey::ALL {
            scaled.nutrients.get_mut(key).value *= multiplier;
        }
        for group in ItemGroup::ALL {
            for item in scaled.items_mut(group) {
                item.value *= multiplier;
            }
        }
        scaled
    }

    pub fn calories(&self) -> f64 {
        self.nutrients.calories.value
    }
}
