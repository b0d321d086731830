//! Schedule model
//!
//! A schedule is one day of planned meals. Each meal holds scheduled dishes
//! at a requested serving count.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use super::Dish;

/// Meal slot within a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    /// Display order of meals in a schedule
    pub const ALL: [MealType; 4] = [
        MealType::Breakfast,
        MealType::Lunch,
        MealType::Dinner,
        MealType::Snack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Some(MealType::Breakfast),
            "lunch" => Some(MealType::Lunch),
            "dinner" => Some(MealType::Dinner),
            "snack" => Some(MealType::Snack),
            _ => None,
        }
    }
}

/// A dish placed into a meal
///
/// `name`, `image` and `calories` are copied from the dish when scheduled so
/// the occurrence still renders after the dish is gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledDish {
    pub id: i64,
    pub dish_id: i64,
    pub name: String,
    pub image: Option<String>,
    /// Requested servings; `None` means the dish's native servings
    pub servings: Option<f64>,
    pub calories: i64,
    pub is_eaten: bool,
}

/// One meal of a schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub meal_type: MealType,
    pub dishes: Vec<ScheduledDish>,
}

/// A planned day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: i64,
    pub date: String,  // ISO date: "2025-01-09"
    pub calorie_target: Option<f64>,
    pub notes: Option<String>,
    pub meals: Vec<Meal>,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleCreate {
    pub date: String,
    pub calorie_target: Option<f64>,
    pub notes: Option<String>,
}

/// Data for updating a schedule
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleUpdate {
    pub calorie_target: Option<f64>,
    pub notes: Option<String>,
}

/// Data for placing a dish into a meal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledDishCreate {
    pub schedule_id: i64,
    pub meal_type: MealType,
    pub dish_id: i64,
    pub servings: Option<f64>,
}

/// Data for updating a scheduled dish
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduledDishUpdate {
    pub meal_type: Option<MealType>,
    pub servings: Option<f64>,
    pub is_eaten: Option<bool>,
}

impl Schedule {
    /// Create from a database row, without meals
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            date: row.get("date")?,
            calorie_target: row.get("calorie_target")?,
            notes: row.get("notes")?,
            meals: Vec::new(),
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Load the four meals of a schedule, in display order
    fn load_meals(conn: &Connection, schedule_id: i64) -> DbResult<Vec<Meal>> {
        let mut meals: Vec<Meal> = MealType::ALL
            .into_iter()
            .map(|meal_type| Meal { meal_type, dishes: Vec::new() })
            .collect();

        let mut stmt = conn.prepare(
            "SELECT * FROM scheduled_dishes WHERE schedule_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([schedule_id], ScheduledDish::from_row)?;

        for row in rows {
            let (meal_type, dish) = row?;
            if let Some(meal) = meals.iter_mut().find(|m| m.meal_type == meal_type) {
                meal.dishes.push(dish);
            }
        }

        Ok(meals)
    }

    fn with_meals(conn: &Connection, mut schedule: Self) -> DbResult<Self> {
        schedule.meals = Self::load_meals(conn, schedule.id)?;
        Ok(schedule)
    }

    /// Create a new schedule
    pub fn create(conn: &Connection, data: &ScheduleCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO schedules (date, calorie_target, notes)
            VALUES (?1, ?2, ?3)
            "#,
            params![data.date, data.calorie_target, data.notes],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or_else(|| {
            DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows)
        })
    }

    /// Get a schedule by ID, with meals
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM schedules WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(schedule) => Ok(Some(Self::with_meals(conn, schedule)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get a schedule by date, with meals
    pub fn get_by_date(conn: &Connection, date: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM schedules WHERE date = ?1")?;

        let result = stmt.query_row([date], Self::from_row);
        match result {
            Ok(schedule) => Ok(Some(Self::with_meals(conn, schedule)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List schedules in a date range, newest first, without meals
    pub fn list(
        conn: &Connection,
        start_date: Option<&str>,
        end_date: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Self>> {
        let mut sql = String::from("SELECT * FROM schedules WHERE 1=1");
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(start) = start_date {
            sql.push_str(&format!(" AND date >= ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(start.to_string()));
        }
        if let Some(end) = end_date {
            sql.push_str(&format!(" AND date <= ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(end.to_string()));
        }

        sql.push_str(&format!(
            " ORDER BY date DESC LIMIT ?{} OFFSET ?{}",
            params_vec.len() + 1,
            params_vec.len() + 2
        ));
        params_vec.push(Box::new(limit));
        params_vec.push(Box::new(offset));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let schedules = stmt
            .query_map(params_refs.as_slice(), Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(schedules)
    }

    /// Count schedules
    pub fn count(conn: &Connection) -> DbResult<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM schedules", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Update a schedule
    pub fn update(conn: &Connection, id: i64, data: &ScheduleUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(target) = data.calorie_target {
            updates.push(format!("calorie_target = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(target));
        }
        if let Some(ref notes) = data.notes {
            updates.push(format!("notes = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(notes.clone()));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE schedules SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );

        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Delete a schedule and its scheduled dishes
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        conn.execute("DELETE FROM scheduled_dishes WHERE schedule_id = ?1", [id])?;
        let rows = conn.execute("DELETE FROM schedules WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}

impl ScheduledDish {
    /// Create from a database row, paired with its meal slot
    fn from_row(row: &Row) -> rusqlite::Result<(MealType, Self)> {
        let meal_type_str: String = row.get("meal_type")?;
        // The CHECK constraint keeps unknown meal types out of the table
        let meal_type = MealType::from_str(&meal_type_str).unwrap_or(MealType::Snack);

        Ok((
            meal_type,
            Self {
                id: row.get("id")?,
                dish_id: row.get("dish_id")?,
                name: row.get("name")?,
                image: row.get("image")?,
                servings: row.get("servings")?,
                calories: row.get("calories")?,
                is_eaten: row.get::<_, i32>("is_eaten")? != 0,
            },
        ))
    }

    /// Place a dish into a meal, copying its display fields
    pub fn create(conn: &Connection, data: &ScheduledDishCreate) -> DbResult<Self> {
        let dish = Dish::get_by_id(conn, data.dish_id)?
            .ok_or_else(|| DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))?;

        conn.execute(
            r#"
            INSERT INTO scheduled_dishes (
                schedule_id, meal_type, dish_id, name, image, servings, calories
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                data.schedule_id,
                data.meal_type.as_str(),
                dish.id,
                dish.name,
                dish.image,
                data.servings,
                dish.calories,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or_else(|| {
            DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows)
        })
    }

    /// Get a scheduled dish by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM scheduled_dishes WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok((_, dish)) => Ok(Some(dish)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get the schedule_id for a scheduled dish
    pub fn get_schedule_id(conn: &Connection, id: i64) -> DbResult<Option<i64>> {
        let result: Result<i64, _> = conn.query_row(
            "SELECT schedule_id FROM scheduled_dishes WHERE id = ?1",
            [id],
            |row| row.get(0),
        );
        match result {
            Ok(schedule_id) => Ok(Some(schedule_id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Update a scheduled dish
    pub fn update(conn: &Connection, id: i64, data: &ScheduledDishUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(meal_type) = data.meal_type {
            updates.push(format!("meal_type = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(meal_type.as_str().to_string()));
        }
        if let Some(servings) = data.servings {
            updates.push(format!("servings = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(servings));
        }
        if let Some(is_eaten) = data.is_eaten {
            updates.push(format!("is_eaten = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(is_eaten as i32));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        let sql = format!(
            "UPDATE scheduled_dishes SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );

        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Remove a dish from its schedule
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM scheduled_dishes WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::DishCreate;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn dish(conn: &Connection, name: &str) -> Dish {
        Dish::create(
            conn,
            &DishCreate {
                name: name.to_string(),
                image: Some(format!("https://img.example/{}.png", name)),
                servings: 2,
                ingredients: Vec::new(),
                notes: None,
            },
        )
        .unwrap()
    }

    fn schedule(conn: &Connection) -> Schedule {
        Schedule::create(
            conn,
            &ScheduleCreate {
                date: "2025-03-14".to_string(),
                calorie_target: Some(2000.0),
                notes: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_meal_type_from_str() {
        assert_eq!(MealType::from_str("Lunch"), Some(MealType::Lunch));
        assert_eq!(MealType::from_str(" snack "), Some(MealType::Snack));
        assert_eq!(MealType::from_str("brunch"), None);
    }

    #[test]
    fn test_new_schedule_has_four_empty_meals() {
        let conn = setup();
        let created = schedule(&conn);

        let types: Vec<MealType> = created.meals.iter().map(|m| m.meal_type).collect();
        assert_eq!(types, MealType::ALL.to_vec());
        assert!(created.meals.iter().all(|m| m.dishes.is_empty()));
    }

    #[test]
    fn test_scheduled_dish_copies_display_fields() {
        let conn = setup();
        let plan = schedule(&conn);
        let soup = dish(&conn, "soup");

        let scheduled = ScheduledDish::create(
            &conn,
            &ScheduledDishCreate {
                schedule_id: plan.id,
                meal_type: MealType::Dinner,
                dish_id: soup.id,
                servings: Some(3.0),
            },
        )
        .unwrap();

        assert_eq!(scheduled.name, "soup");
        assert_eq!(scheduled.image, soup.image);
        assert_eq!(scheduled.servings, Some(3.0));
        assert!(!scheduled.is_eaten);

        let loaded = Schedule::get_by_date(&conn, "2025-03-14").unwrap().unwrap();
        let dinner = loaded.meals.iter().find(|m| m.meal_type == MealType::Dinner).unwrap();
        assert_eq!(dinner.dishes, vec![scheduled]);
    }

    #[test]
    fn test_scheduling_unknown_dish_fails() {
        let conn = setup();
        let plan = schedule(&conn);

        let result = ScheduledDish::create(
            &conn,
            &ScheduledDishCreate {
                schedule_id: plan.id,
                meal_type: MealType::Lunch,
                dish_id: 42,
                servings: None,
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_update_moves_and_marks_eaten() {
        let conn = setup();
        let plan = schedule(&conn);
        let soup = dish(&conn, "soup");
        let scheduled = ScheduledDish::create(
            &conn,
            &ScheduledDishCreate {
                schedule_id: plan.id,
                meal_type: MealType::Lunch,
                dish_id: soup.id,
                servings: None,
            },
        )
        .unwrap();

        let update = ScheduledDishUpdate {
            meal_type: Some(MealType::Snack),
            is_eaten: Some(true),
            ..Default::default()
        };
        let updated = ScheduledDish::update(&conn, scheduled.id, &update).unwrap().unwrap();
        assert!(updated.is_eaten);

        let loaded = Schedule::get_by_id(&conn, plan.id).unwrap().unwrap();
        assert_eq!(loaded.meals[3].dishes.len(), 1);
        assert!(loaded.meals[1].dishes.is_empty());
        assert_eq!(ScheduledDish::get_schedule_id(&conn, scheduled.id).unwrap(), Some(plan.id));
    }

    #[test]
    fn test_occurrence_survives_dish_deletion() {
        let conn = setup();
        let plan = schedule(&conn);
        let soup = dish(&conn, "soup");
        ScheduledDish::create(
            &conn,
            &ScheduledDishCreate {
                schedule_id: plan.id,
                meal_type: MealType::Breakfast,
                dish_id: soup.id,
                servings: None,
            },
        )
        .unwrap();

        Dish::delete(&conn, soup.id).unwrap();

        let loaded = Schedule::get_by_id(&conn, plan.id).unwrap().unwrap();
        assert_eq!(loaded.meals[0].dishes[0].dish_id, soup.id);
    }

    #[test]
    fn test_list_filters_by_date_range() {
        let conn = setup();
        for date in ["2025-03-01", "2025-03-10", "2025-03-20"] {
            Schedule::create(
                &conn,
                &ScheduleCreate { date: date.to_string(), calorie_target: None, notes: None },
            )
            .unwrap();
        }

        let listed = Schedule::list(&conn, Some("2025-03-05"), Some("2025-03-31"), 10, 0).unwrap();
        let dates: Vec<&str> = listed.iter().map(|s| s.date.as_str()).collect();
        assert_eq!(dates, vec!["2025-03-20", "2025-03-10"]);
        assert_eq!(Schedule::count(&conn).unwrap(), 3);
    }
}
