//! Nutriplan Status Tool
//!
//! Provides runtime status information about the Nutriplan service.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::db::{Database, DbResult};
use crate::models::{Dish, Ingredient, Schedule};

/// Meal planning instructions for AI assistants
pub const PLANNING_INSTRUCTIONS: &str = r#"
# Nutriplan Meal Planning Instructions

Nutriplan plans days of meals from reusable dishes and reports the nutrition
of each planned serving.

## Building Blocks

1. **Ingredients** - nutrition stored per base unit (e.g. per 100 g)
2. **Dishes** - ingredients with the units used, made for N servings
3. **Schedules** - one per date, with breakfast, lunch, dinner and snack

---

## Adding Ingredients

Use `add_ingredient` with a `base_unit` such as `{"amount": 100, "unit": "g"}`
and a nutrition profile describing that amount:

```json
{
  "nutrients": {
    "calories": {"value": 41, "unit": "kcal"},
    "carbs": {"value": 9.6, "unit": "g"},
    "sodium": {"value": 69, "unit": "mg"}
  },
  "minerals": [{"label": "Potassium", "value": 320, "unit": "mg"}]
}
```

Keep units consistent for each nutrient across ingredients. A dish whose
ingredients report the same nutrient in different units cannot be totaled.

---

## Creating Dishes

Each dish ingredient lists one or more units. Every unit states how many base
units one of it represents (`value`) and how many are used (`quantity`).
Exactly one unit must be marked `isDefault`; it decides the dish calories.

Example: rice stored per 100 g, used as 1 cup of 200 g:

```json
{"ingredient_id": 3, "units": [{"value": 200, "quantity": 1, "unit": "cup", "isDefault": true}]}
```

Use `dish_unit_ratio` to check how much of the base unit a quantity represents.

---

## Planning Days

- `add_scheduled_dish` places a dish into a meal for a date (YYYY-MM-DD) and
  creates the schedule if needed.
- `servings` is the number of servings planned; omit it to plan the dish's own
  serving count.
- `get_schedule` returns each planned dish with nutrition scaled to the
  planned servings, plus planned and eaten totals for the day.
- Mark dishes eaten with `update_scheduled_dish` (`is_eaten: true`).

## Notes

- Nutrition is recomputed on every read; editing an ingredient is reflected
  immediately in schedules. Run `recalculate_dish` to refresh stored calories.
- Deleted dishes stay visible in schedules under their old name, with zero
  nutrition.
"#;

/// Number of stored records per table
#[derive(Debug, Clone, Serialize)]
pub struct RecordCounts {
    pub ingredients: i64,
    pub dishes: i64,
    pub schedules: i64,
}

impl RecordCounts {
    pub fn load(db: &Database) -> DbResult<Self> {
        db.with_conn(|conn| {
            Ok(Self {
                ingredients: Ingredient::count(conn)?,
                dishes: Dish::count(conn)?,
                schedules: Schedule::count(conn)?,
            })
        })
    }
}

/// Runtime status of the Nutriplan service
#[derive(Debug, Clone, Serialize)]
pub struct NutriplanStatus {
    /// Build information
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    /// Database information
    pub database_path: String,
    pub database_size_bytes: Option<u64>,
    pub records: Option<RecordCounts>,

    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
        }
    }

    /// Get the current status
    pub fn get_status(&self, db: &Database) -> NutriplanStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        let records = match RecordCounts::load(db) {
            Ok(counts) => Some(counts),
            Err(e) => {
                tracing::warn!(error = %e, "failed to count records for status");
                None
            }
        };

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        NutriplanStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            records,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reports_counts() {
        let db = Database::in_memory().unwrap();
        let tracker = StatusTracker::new(PathBuf::from("does-not-exist.db"));

        let status = tracker.get_status(&db);

        assert_eq!(status.process_id, std::process::id());
        assert!(status.database_size_bytes.is_none());
        let records = status.records.unwrap();
        assert_eq!(records.ingredients, 0);
        assert_eq!(records.schedules, 0);
    }

    #[test]
    fn test_instructions_name_real_tools() {
        for tool in ["add_ingredient", "dish_unit_ratio", "add_scheduled_dish", "get_schedule"] {
            assert!(PLANNING_INSTRUCTIONS.contains(tool), "missing {}", tool);
        }
    }
}
