//! Schedule MCP Tools
//!
//! Tools for planning days of meals. Reading a schedule projects fresh
//! nutrition for every scheduled dish.

use chrono::NaiveDate;
use serde::Serialize;

use crate::db::Database;
use crate::models::{
    MealType, Schedule, ScheduleCreate, ScheduleUpdate, ScheduledDish, ScheduledDishCreate,
    ScheduledDishUpdate, Dish,
};
use crate::nutrition::{project_schedule, schedule_totals, ProjectedSchedule, ScheduleTotals};

/// Response for create_schedule
#[derive(Debug, Serialize)]
pub struct CreateScheduleResponse {
    pub id: i64,
    pub date: String,
    pub created_at: String,
}

/// A schedule with projected nutrition and day totals
#[derive(Debug, Serialize)]
pub struct ScheduleDetail {
    #[serde(flatten)]
    pub schedule: ProjectedSchedule,
    pub totals: ScheduleTotals,
}

/// Schedule summary for listing
#[derive(Debug, Serialize)]
pub struct ScheduleSummary {
    pub id: i64,
    pub date: String,
    pub calorie_target: Option<f64>,
    pub notes: Option<String>,
}

/// Response for list_schedules
#[derive(Debug, Serialize)]
pub struct ListSchedulesResponse {
    pub schedules: Vec<ScheduleSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Response for update_schedule
#[derive(Debug, Serialize)]
pub struct UpdateScheduleResponse {
    pub success: bool,
    pub updated_at: String,
}

/// Response for delete_schedule
#[derive(Debug, Serialize)]
pub struct DeleteScheduleResponse {
    pub success: bool,
    pub deleted_id: i64,
    pub date: String,
}

/// Response for add_scheduled_dish
#[derive(Debug, Serialize)]
pub struct AddScheduledDishResponse {
    pub id: i64,
    pub schedule_id: i64,
    pub date: String,
    pub schedule_created: bool,
    pub meal_type: String,
    pub dish_id: i64,
    pub name: String,
    pub servings: Option<f64>,
    pub calories: i64,
}

/// Response for remove_scheduled_dish
#[derive(Debug, Serialize)]
pub struct RemoveScheduledDishResponse {
    pub success: bool,
    pub deleted_id: i64,
    pub schedule_id: i64,
}

fn validate_date(date: &str) -> Result<String, String> {
    let trimmed = date.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| format!("Invalid date '{}': expected YYYY-MM-DD", date))
}

fn validate_target(target: Option<f64>) -> Result<(), String> {
    match target {
        Some(t) if !t.is_finite() || t <= 0.0 => {
            Err("calorie_target must be greater than 0".to_string())
        }
        _ => Ok(()),
    }
}

fn validate_servings(servings: Option<f64>) -> Result<(), String> {
    match servings {
        Some(s) if !s.is_finite() || s <= 0.0 => Err("Servings must be greater than 0".to_string()),
        _ => Ok(()),
    }
}

fn parse_meal_type(meal_type: &str) -> Result<MealType, String> {
    MealType::from_str(meal_type).ok_or_else(|| {
        format!(
            "Invalid meal type '{}': expected breakfast, lunch, dinner or snack",
            meal_type
        )
    })
}

// ============================================================================
// Schedule Tools
// ============================================================================

/// Create an empty schedule for a date
pub fn create_schedule(
    db: &Database,
    date: &str,
    calorie_target: Option<f64>,
    notes: Option<String>,
) -> Result<CreateScheduleResponse, String> {
    let date = validate_date(date)?;
    validate_target(calorie_target)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let existing = Schedule::get_by_date(&conn, &date)
        .map_err(|e| format!("Failed to check schedule: {}", e))?;
    if existing.is_some() {
        return Err(format!("Schedule already exists for {}", date));
    }

    let schedule = Schedule::create(
        &conn,
        &ScheduleCreate {
            date,
            calorie_target,
            notes,
        },
    )
    .map_err(|e| format!("Failed to create schedule: {}", e))?;

    Ok(CreateScheduleResponse {
        id: schedule.id,
        date: schedule.date,
        created_at: schedule.created_at,
    })
}

/// Get a schedule by date with projected nutrition
pub fn get_schedule(db: &Database, date: &str) -> Result<Option<ScheduleDetail>, String> {
    let date = validate_date(date)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let schedule = match Schedule::get_by_date(&conn, &date)
        .map_err(|e| format!("Failed to get schedule: {}", e))?
    {
        Some(schedule) => schedule,
        None => return Ok(None),
    };

    let projected = project_schedule(&*conn, &schedule)
        .map_err(|e| format!("Failed to project nutrition: {}", e))?;

    let totals = schedule_totals(&projected);

    Ok(Some(ScheduleDetail {
        schedule: projected,
        totals,
    }))
}

/// List schedules in an optional date range, newest first
pub fn list_schedules(
    db: &Database,
    start_date: Option<&str>,
    end_date: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<ListSchedulesResponse, String> {
    let limit = limit.min(200).max(1);
    let offset = offset.max(0);
    let start_date = start_date.map(validate_date).transpose()?;
    let end_date = end_date.map(validate_date).transpose()?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let schedules = Schedule::list(&conn, start_date.as_deref(), end_date.as_deref(), limit, offset)
        .map_err(|e| format!("Failed to list schedules: {}", e))?;

    let total = Schedule::count(&conn)
        .map_err(|e| format!("Failed to count schedules: {}", e))?;

    let summaries = schedules
        .into_iter()
        .map(|s| ScheduleSummary {
            id: s.id,
            date: s.date,
            calorie_target: s.calorie_target,
            notes: s.notes,
        })
        .collect();

    Ok(ListSchedulesResponse {
        schedules: summaries,
        total,
        limit,
        offset,
    })
}

/// Update a schedule's calorie target or notes
pub fn update_schedule(
    db: &Database,
    date: &str,
    data: ScheduleUpdate,
) -> Result<UpdateScheduleResponse, String> {
    let date = validate_date(date)?;
    validate_target(data.calorie_target)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let schedule = Schedule::get_by_date(&conn, &date)
        .map_err(|e| format!("Failed to get schedule: {}", e))?
        .ok_or_else(|| format!("No schedule for {}", date))?;

    let updated = Schedule::update(&conn, schedule.id, &data)
        .map_err(|e| format!("Failed to update schedule: {}", e))?
        .ok_or_else(|| format!("No schedule for {}", date))?;

    Ok(UpdateScheduleResponse {
        success: true,
        updated_at: updated.updated_at,
    })
}

/// Delete a schedule and everything planned in it
pub fn delete_schedule(db: &Database, date: &str) -> Result<DeleteScheduleResponse, String> {
    let date = validate_date(date)?;

    let deleted = db
        .with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let schedule = match Schedule::get_by_date(&tx, &date)? {
                Some(schedule) => schedule,
                None => return Ok(None),
            };
            Schedule::delete(&tx, schedule.id)?;
            tx.commit()?;
            Ok(Some(schedule.id))
        })
        .map_err(|e| format!("Failed to delete schedule: {}", e))?
        .ok_or_else(|| format!("No schedule for {}", date))?;

    Ok(DeleteScheduleResponse {
        success: true,
        deleted_id: deleted,
        date,
    })
}

// ============================================================================
// Scheduled Dish Tools
// ============================================================================

/// Place a dish into a meal, creating the day's schedule if needed
pub fn add_scheduled_dish(
    db: &Database,
    date: &str,
    meal_type: &str,
    dish_id: i64,
    servings: Option<f64>,
) -> Result<AddScheduledDishResponse, String> {
    let date = validate_date(date)?;
    let meal_type = parse_meal_type(meal_type)?;
    validate_servings(servings)?;

    let result = db
        .with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if Dish::get_by_id(&tx, dish_id)?.is_none() {
                return Ok(None);
            }

            let (schedule, schedule_created) = match Schedule::get_by_date(&tx, &date)? {
                Some(schedule) => (schedule, false),
                None => {
                    let schedule = Schedule::create(
                        &tx,
                        &ScheduleCreate {
                            date: date.clone(),
                            calorie_target: None,
                            notes: None,
                        },
                    )?;
                    (schedule, true)
                }
            };

            let scheduled = ScheduledDish::create(
                &tx,
                &ScheduledDishCreate {
                    schedule_id: schedule.id,
                    meal_type,
                    dish_id,
                    servings,
                },
            )?;
            tx.commit()?;
            Ok(Some((schedule, schedule_created, scheduled)))
        })
        .map_err(|e| format!("Failed to schedule dish: {}", e))?;

    let (schedule, schedule_created, scheduled) =
        result.ok_or_else(|| format!("Dish not found with id: {}", dish_id))?;

    tracing::info!(
        date = %schedule.date,
        meal = meal_type.as_str(),
        dish_id,
        "dish scheduled"
    );

    Ok(AddScheduledDishResponse {
        id: scheduled.id,
        schedule_id: schedule.id,
        date: schedule.date,
        schedule_created,
        meal_type: meal_type.as_str().to_string(),
        dish_id: scheduled.dish_id,
        name: scheduled.name,
        servings: scheduled.servings,
        calories: scheduled.calories,
    })
}

/// Move, resize or mark a scheduled dish as eaten
pub fn update_scheduled_dish(
    db: &Database,
    id: i64,
    meal_type: Option<&str>,
    servings: Option<f64>,
    is_eaten: Option<bool>,
) -> Result<ScheduledDish, String> {
    let meal_type = meal_type.map(parse_meal_type).transpose()?;
    validate_servings(servings)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let data = ScheduledDishUpdate {
        meal_type,
        servings,
        is_eaten,
    };

    ScheduledDish::update(&conn, id, &data)
        .map_err(|e| format!("Failed to update scheduled dish: {}", e))?
        .ok_or_else(|| format!("Scheduled dish not found with id: {}", id))
}

/// Remove a dish from its schedule
pub fn remove_scheduled_dish(db: &Database, id: i64) -> Result<RemoveScheduledDishResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let schedule_id = ScheduledDish::get_schedule_id(&conn, id)
        .map_err(|e| format!("Failed to get scheduled dish: {}", e))?
        .ok_or_else(|| format!("Scheduled dish not found with id: {}", id))?;

    ScheduledDish::delete(&conn, id)
        .map_err(|e| format!("Failed to remove scheduled dish: {}", e))?;

    Ok(RemoveScheduledDishResponse {
        success: true,
        deleted_id: id,
        schedule_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BaseUnit, DishCreate, DishIngredientCreate, DishIngredientUnit, IngredientCreate, Measure,
        NutritionProfile,
    };
    use crate::tools::dishes::{create_dish, delete_dish};
    use crate::tools::ingredients::add_ingredient;

    /// Dish of 2 servings made from 100 kcal of a single ingredient
    fn porridge(db: &Database) -> i64 {
        let mut nutrition = NutritionProfile::zero();
        nutrition.nutrients.calories = Measure::new(100.0, "kcal");
        let oats = add_ingredient(
            db,
            IngredientCreate {
                name: "Oats".to_string(),
                base_unit: BaseUnit { amount: 100.0, unit: "g".to_string() },
                nutrition: Some(nutrition),
                notes: None,
            },
        )
        .unwrap();

        create_dish(
            db,
            DishCreate {
                name: "Porridge".to_string(),
                image: None,
                servings: 2,
                ingredients: vec![DishIngredientCreate {
                    ingredient_id: oats.id,
                    units: vec![DishIngredientUnit {
                        value: Some(100.0),
                        quantity: Some(1.0),
                        unit: "g".to_string(),
                        is_default: true,
                    }],
                }],
                notes: None,
            },
        )
        .unwrap()
        .id
    }

    /// One-serving dish of 100 g of a single ingredient with the given sodium
    fn salted_dish(db: &Database, name: &str, sodium: Measure) -> i64 {
        let mut nutrition = NutritionProfile::zero();
        nutrition.nutrients.calories = Measure::new(150.0, "kcal");
        nutrition.nutrients.sodium = sodium;
        let ingredient = add_ingredient(
            db,
            IngredientCreate {
                name: name.to_string(),
                base_unit: BaseUnit { amount: 100.0, unit: "g".to_string() },
                nutrition: Some(nutrition),
                notes: None,
            },
        )
        .unwrap();

        create_dish(
            db,
            DishCreate {
                name: name.to_string(),
                image: None,
                servings: 1,
                ingredients: vec![DishIngredientCreate {
                    ingredient_id: ingredient.id,
                    units: vec![DishIngredientUnit {
                        value: Some(100.0),
                        quantity: Some(1.0),
                        unit: "g".to_string(),
                        is_default: true,
                    }],
                }],
                notes: None,
            },
        )
        .unwrap()
        .id
    }

    #[test]
    fn test_create_validates_and_rejects_duplicates() {
        let db = Database::in_memory().unwrap();

        assert!(create_schedule(&db, "2025-13-01", None, None).is_err());
        assert!(create_schedule(&db, "2025-01-09", Some(0.0), None).is_err());

        let created = create_schedule(&db, "2025-01-09", Some(2000.0), None).unwrap();
        assert_eq!(created.date, "2025-01-09");
        assert!(create_schedule(&db, "2025-01-09", None, None).is_err());
    }

    #[test]
    fn test_add_creates_schedule_and_projects() {
        let db = Database::in_memory().unwrap();
        let dish_id = porridge(&db);

        let added = add_scheduled_dish(&db, "2025-01-09", "breakfast", dish_id, Some(4.0)).unwrap();
        assert!(added.schedule_created);
        assert_eq!(added.name, "Porridge");
        assert_eq!(added.calories, 100);

        let again = add_scheduled_dish(&db, "2025-01-09", "snack", dish_id, None).unwrap();
        assert!(!again.schedule_created);

        let detail = get_schedule(&db, "2025-01-09").unwrap().unwrap();
        let breakfast = &detail.schedule.meals[0];
        assert_eq!(breakfast.meal_type, MealType::Breakfast);
        assert_eq!(breakfast.dishes[0].nutrition.calories(), 200.0);
        assert_eq!(detail.schedule.meals[3].dishes[0].nutrition.calories(), 100.0);
        assert_eq!(detail.totals.planned.calories(), 300.0);
        assert_eq!(detail.totals.eaten.calories(), 0.0);
    }

    #[test]
    fn test_eaten_totals_and_remaining() {
        let db = Database::in_memory().unwrap();
        let dish_id = porridge(&db);
        create_schedule(&db, "2025-01-10", Some(1000.0), None).unwrap();
        let added = add_scheduled_dish(&db, "2025-01-10", "lunch", dish_id, Some(2.0)).unwrap();

        let updated = update_scheduled_dish(&db, added.id, Some("dinner"), None, Some(true)).unwrap();
        assert!(updated.is_eaten);

        let detail = get_schedule(&db, "2025-01-10").unwrap().unwrap();
        assert!(detail.schedule.meals[1].dishes.is_empty());
        assert_eq!(detail.schedule.meals[2].dishes.len(), 1);
        assert_eq!(detail.totals.eaten.calories(), 100.0);
        assert_eq!(detail.totals.remaining_calories, Some(900.0));
    }

    #[test]
    fn test_dishes_with_different_sodium_units_still_render() {
        let db = Database::in_memory().unwrap();
        let crackers = salted_dish(&db, "Crackers", Measure::new(0.5, "g"));
        let soup = salted_dish(&db, "Soup", Measure::new(300.0, "mg"));
        add_scheduled_dish(&db, "2025-01-12", "lunch", crackers, None).unwrap();
        add_scheduled_dish(&db, "2025-01-12", "lunch", soup, None).unwrap();

        let detail = get_schedule(&db, "2025-01-12").unwrap().unwrap();

        let lunch = &detail.schedule.meals[1];
        assert_eq!(lunch.dishes.len(), 2);
        assert_eq!(lunch.dishes[1].nutrition.nutrients.sodium, Measure::new(300.0, "mg"));
        assert_eq!(detail.totals.planned.calories(), 300.0);
        assert_eq!(detail.totals.planned.nutrients.sodium, Measure::new(0.5, "g"));
        assert_eq!(detail.totals.planned_other_units.len(), 1);
        assert_eq!(detail.totals.planned_other_units[0].value, 300.0);
        assert_eq!(detail.totals.planned_other_units[0].unit, "mg");
    }

    #[test]
    fn test_deleted_dish_projects_zero() {
        let db = Database::in_memory().unwrap();
        let dish_id = porridge(&db);
        add_scheduled_dish(&db, "2025-01-11", "dinner", dish_id, Some(1.0)).unwrap();

        let deleted = delete_dish(&db, dish_id).unwrap();
        assert_eq!(deleted.times_scheduled, 1);

        let detail = get_schedule(&db, "2025-01-11").unwrap().unwrap();
        let occurrence = &detail.schedule.meals[2].dishes[0];
        assert_eq!(occurrence.scheduled.name, "Porridge");
        assert_eq!(occurrence.nutrition, NutritionProfile::zero());
    }

    #[test]
    fn test_add_rejects_bad_input() {
        let db = Database::in_memory().unwrap();
        let dish_id = porridge(&db);

        assert!(add_scheduled_dish(&db, "2025-01-09", "brunch", dish_id, None).is_err());
        assert!(add_scheduled_dish(&db, "2025-01-09", "lunch", dish_id, Some(0.0)).is_err());
        assert!(add_scheduled_dish(&db, "2025-01-09", "lunch", dish_id + 1, None).is_err());
        assert!(get_schedule(&db, "2025-01-09").unwrap().is_none());
    }

    #[test]
    fn test_list_update_remove_delete() {
        let db = Database::in_memory().unwrap();
        let dish_id = porridge(&db);
        create_schedule(&db, "2025-01-01", None, None).unwrap();
        let added = add_scheduled_dish(&db, "2025-01-02", "lunch", dish_id, None).unwrap();

        let listed = list_schedules(&db, Some("2025-01-02"), None, 10, 0).unwrap();
        assert_eq!(listed.schedules.len(), 1);
        assert_eq!(listed.total, 2);

        let update = ScheduleUpdate {
            calorie_target: Some(1800.0),
            notes: None,
        };
        assert!(update_schedule(&db, "2025-01-02", update).unwrap().success);

        let removed = remove_scheduled_dish(&db, added.id).unwrap();
        assert_eq!(removed.schedule_id, added.schedule_id);
        assert!(remove_scheduled_dish(&db, added.id).is_err());

        let deleted = delete_schedule(&db, "2025-01-02").unwrap();
        assert_eq!(deleted.deleted_id, added.schedule_id);
        assert!(delete_schedule(&db, "2025-01-02").is_err());
    }
}
