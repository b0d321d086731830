//! Dish model
//!
//! A dish is an ordered list of ingredient entries with a native serving
//! count. Calories and per-entry nutrient snapshots are derived whenever the
//! entries are written.

use std::collections::HashMap;

use rusqlite::{params, params_from_iter, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;
use crate::nutrition::dish_calories;
use super::ingredient::{json_column, placeholders};
use super::{Ingredient, Nutrients};

/// One way of measuring an ingredient inside a dish
///
/// `value` is how many base units one of `unit` represents, `quantity` how
/// many of `unit` the dish uses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DishIngredientUnit {
    pub value: Option<f64>,
    pub quantity: Option<f64>,
    pub unit: String,
    pub is_default: bool,
}

/// An ingredient entry embedded in a dish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DishIngredient {
    pub ingredient_id: i64,
    pub units: Vec<DishIngredientUnit>,
    /// The ingredient's per-base-unit nutrients as of the last write
    pub nutrients: Option<Nutrients>,
}

/// A dish with its ingredient entries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dish {
    pub id: i64,
    pub name: String,
    pub image: Option<String>,
    pub servings: u32,
    pub calories: i64,
    pub ingredients: Vec<DishIngredient>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Ingredient entry supplied when creating a dish
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DishIngredientCreate {
    pub ingredient_id: i64,
    pub units: Vec<DishIngredientUnit>,
}

/// Data for creating a dish
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DishCreate {
    pub name: String,
    pub image: Option<String>,
    #[serde(default = "default_servings")]
    pub servings: u32,
    pub ingredients: Vec<DishIngredientCreate>,
    pub notes: Option<String>,
}

fn default_servings() -> u32 {
    1
}

/// Fetch the referenced ingredients keyed by id
fn load_ingredient_map<I>(conn: &Connection, ids: I) -> DbResult<HashMap<i64, Ingredient>>
where
    I: IntoIterator<Item = i64>,
{
    let mut ids: Vec<i64> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();

    Ok(Ingredient::find_by_ids(conn, &ids)?
        .into_iter()
        .map(|ingredient| (ingredient.id, ingredient))
        .collect())
}

/// Attach nutrient snapshots and compute total calories
fn derive_entries(
    entries: &[DishIngredientCreate],
    ingredients: &HashMap<i64, Ingredient>,
) -> (Vec<DishIngredient>, i64) {
    let derived: Vec<DishIngredient> = entries
        .iter()
        .map(|entry| DishIngredient {
            ingredient_id: entry.ingredient_id,
            units: entry.units.clone(),
            nutrients: ingredients
                .get(&entry.ingredient_id)
                .and_then(|ingredient| ingredient.nutrition.as_ref())
                .map(|nutrition| nutrition.nutrients.clone()),
        })
        .collect();

    let calories = dish_calories(&derived, ingredients);
    (derived, calories)
}

impl Dish {
    /// Create from a database row, without entries
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            image: row.get("image")?,
            servings: row.get("servings")?,
            calories: row.get("calories")?,
            ingredients: Vec::new(),
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Load ingredient entries for a set of dishes, grouped by dish id
    fn load_entries(conn: &Connection, dish_ids: &[i64]) -> DbResult<HashMap<i64, Vec<DishIngredient>>> {
        let mut grouped: HashMap<i64, Vec<DishIngredient>> = HashMap::new();
        if dish_ids.is_empty() {
            return Ok(grouped);
        }

        let sql = format!(
            "SELECT dish_id, ingredient_id, units, nutrients FROM dish_ingredients
             WHERE dish_id IN ({}) ORDER BY dish_id, position",
            placeholders(dish_ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(dish_ids.iter()), |row| {
            let dish_id: i64 = row.get("dish_id")?;
            let entry = DishIngredient {
                ingredient_id: row.get("ingredient_id")?,
                units: json_column(row, "units")?.unwrap_or_default(),
                nutrients: json_column(row, "nutrients")?,
            };
            Ok((dish_id, entry))
        })?;

        for row in rows {
            let (dish_id, entry) = row?;
            grouped.entry(dish_id).or_default().push(entry);
        }

        Ok(grouped)
    }

    fn attach_entries(conn: &Connection, mut dishes: Vec<Self>) -> DbResult<Vec<Self>> {
        let ids: Vec<i64> = dishes.iter().map(|d| d.id).collect();
        let mut entries = Self::load_entries(conn, &ids)?;
        for dish in &mut dishes {
            dish.ingredients = entries.remove(&dish.id).unwrap_or_default();
        }
        Ok(dishes)
    }

    fn write_entries(conn: &Connection, dish_id: i64, entries: &[DishIngredient]) -> DbResult<()> {
        conn.execute("DELETE FROM dish_ingredients WHERE dish_id = ?1", [dish_id])?;

        let mut stmt = conn.prepare(
            r#"
            INSERT INTO dish_ingredients (dish_id, ingredient_id, position, units, nutrients)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )?;
        for (position, entry) in entries.iter().enumerate() {
            let units = serde_json::to_string(&entry.units)?;
            let nutrients = entry.nutrients.as_ref().map(serde_json::to_string).transpose()?;
            stmt.execute(params![
                dish_id,
                entry.ingredient_id,
                position as i64,
                units,
                nutrients,
            ])?;
        }
        Ok(())
    }

    /// Insert a new dish, deriving calories from the referenced ingredients
    pub fn create(conn: &Connection, data: &DishCreate) -> DbResult<Self> {
        let ingredients = load_ingredient_map(conn, data.ingredients.iter().map(|e| e.ingredient_id))?;
        let (entries, calories) = derive_entries(&data.ingredients, &ingredients);

        conn.execute(
            r#"
            INSERT INTO dishes (name, image, servings, calories, notes)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![data.name, data.image, data.servings, calories, data.notes],
        )?;

        let id = conn.last_insert_rowid();
        Self::write_entries(conn, id, &entries)?;

        tracing::debug!(dish_id = id, calories, entries = entries.len(), "dish created");

        Self::get_by_id(conn, id)?.ok_or_else(|| {
            crate::db::DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows)
        })
    }

    /// Get a dish by ID, with entries
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM dishes WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(dish) => Ok(Self::attach_entries(conn, vec![dish])?.pop()),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Bulk load by IDs, with entries; missing IDs are silently absent
    pub fn find_by_ids(conn: &Connection, ids: &[i64]) -> DbResult<Vec<Self>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT * FROM dishes WHERE id IN ({}) ORDER BY id",
            placeholders(ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let dishes = stmt
            .query_map(params_from_iter(ids.iter()), Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Self::attach_entries(conn, dishes)
    }

    /// List dishes, optionally filtered by name
    pub fn list(conn: &Connection, query: Option<&str>, limit: i64, offset: i64) -> DbResult<Vec<Self>> {
        let dishes = match query {
            Some(q) => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM dishes WHERE name LIKE ?1 ORDER BY name ASC LIMIT ?2 OFFSET ?3",
                )?;
                let pattern = format!("%{}%", q);
                let rows = stmt.query_map(params![pattern, limit, offset], Self::from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM dishes ORDER BY name ASC LIMIT ?1 OFFSET ?2",
                )?;
                let rows = stmt.query_map(params![limit, offset], Self::from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Self::attach_entries(conn, dishes)
    }

    /// Count dishes
    pub fn count(conn: &Connection) -> DbResult<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM dishes", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Re-derive calories and nutrient snapshots from current ingredient data
    pub fn recalculate(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let dish = match Self::get_by_id(conn, id)? {
            Some(dish) => dish,
            None => return Ok(None),
        };

        let requested: Vec<DishIngredientCreate> = dish
            .ingredients
            .into_iter()
            .map(|entry| DishIngredientCreate {
                ingredient_id: entry.ingredient_id,
                units: entry.units,
            })
            .collect();
        let ingredients = load_ingredient_map(conn, requested.iter().map(|e| e.ingredient_id))?;
        let (entries, calories) = derive_entries(&requested, &ingredients);

        Self::write_entries(conn, id, &entries)?;
        conn.execute(
            "UPDATE dishes SET calories = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![calories, id],
        )?;

        Self::get_by_id(conn, id)
    }

    /// Number of schedule occurrences referencing this dish
    pub fn get_times_scheduled(conn: &Connection, id: i64) -> DbResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM scheduled_dishes WHERE dish_id = ?1",
            [id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete a dish and its entries; schedule occurrences stay
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        conn.execute("DELETE FROM dish_ingredients WHERE dish_id = ?1", [id])?;
        let rows = conn.execute("DELETE FROM dishes WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::{BaseUnit, IngredientCreate, IngredientUpdate, Measure, NutritionProfile};

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn ingredient(conn: &Connection, name: &str, calories: f64) -> Ingredient {
        let mut nutrition = NutritionProfile::zero();
        nutrition.nutrients.calories = Measure::new(calories, "kcal");
        nutrition.nutrients.protein = Measure::new(1.0, "g");
        Ingredient::create(
            conn,
            &IngredientCreate {
                name: name.to_string(),
                base_unit: BaseUnit { amount: 100.0, unit: "g".to_string() },
                nutrition: Some(nutrition),
                notes: None,
            },
        )
        .unwrap()
    }

    fn grams(value: f64, quantity: f64) -> DishIngredientUnit {
        DishIngredientUnit {
            value: Some(value),
            quantity: Some(quantity),
            unit: "g".to_string(),
            is_default: true,
        }
    }

    fn dish_with(ingredients: Vec<DishIngredientCreate>) -> DishCreate {
        DishCreate {
            name: "Soup".to_string(),
            image: None,
            servings: 2,
            ingredients,
            notes: None,
        }
    }

    #[test]
    fn test_create_derives_weighted_calories() {
        let conn = setup();
        let carrot = ingredient(&conn, "Carrot", 41.0);
        let onion = ingredient(&conn, "Onion", 40.0);

        let dish = Dish::create(
            &conn,
            &dish_with(vec![
                DishIngredientCreate { ingredient_id: carrot.id, units: vec![grams(100.0, 2.0)] },
                DishIngredientCreate { ingredient_id: onion.id, units: vec![grams(50.0, 1.0)] },
            ]),
        )
        .unwrap();

        // 41 * 2 + 40 * 0.5
        assert_eq!(dish.calories, 102);
        assert_eq!(dish.servings, 2);
        assert_eq!(dish.ingredients.len(), 2);
        assert_eq!(dish.ingredients[0].ingredient_id, carrot.id);
    }

    #[test]
    fn test_snapshot_is_unweighted() {
        let conn = setup();
        let carrot = ingredient(&conn, "Carrot", 41.0);

        let dish = Dish::create(
            &conn,
            &dish_with(vec![DishIngredientCreate {
                ingredient_id: carrot.id,
                units: vec![grams(100.0, 3.0)],
            }]),
        )
        .unwrap();

        let snapshot = dish.ingredients[0].nutrients.as_ref().unwrap();
        assert_eq!(snapshot.calories.value, 41.0);
        assert_eq!(dish.calories, 123);
    }

    #[test]
    fn test_missing_ingredient_contributes_nothing() {
        let conn = setup();
        let dish = Dish::create(
            &conn,
            &dish_with(vec![DishIngredientCreate { ingredient_id: 404, units: vec![grams(100.0, 1.0)] }]),
        )
        .unwrap();

        assert_eq!(dish.calories, 0);
        assert!(dish.ingredients[0].nutrients.is_none());
    }

    #[test]
    fn test_find_by_ids_attaches_entries() {
        let conn = setup();
        let carrot = ingredient(&conn, "Carrot", 41.0);
        let entry = || DishIngredientCreate { ingredient_id: carrot.id, units: vec![grams(100.0, 1.0)] };

        let a = Dish::create(&conn, &dish_with(vec![entry()])).unwrap();
        let b = Dish::create(&conn, &dish_with(vec![entry(), entry()])).unwrap();

        let found = Dish::find_by_ids(&conn, &[b.id, a.id, 77]).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].ingredients.len(), 1);
        assert_eq!(found[1].ingredients.len(), 2);
    }

    #[test]
    fn test_recalculate_picks_up_ingredient_changes() {
        let conn = setup();
        let carrot = ingredient(&conn, "Carrot", 41.0);
        let dish = Dish::create(
            &conn,
            &dish_with(vec![DishIngredientCreate { ingredient_id: carrot.id, units: vec![grams(100.0, 1.0)] }]),
        )
        .unwrap();

        let mut nutrition = carrot.nutrition.clone().unwrap();
        nutrition.nutrients.calories.value = 50.0;
        Ingredient::update(
            &conn,
            carrot.id,
            &IngredientUpdate { nutrition: Some(nutrition), ..Default::default() },
        )
        .unwrap();

        let recalculated = Dish::recalculate(&conn, dish.id).unwrap().unwrap();
        assert_eq!(recalculated.calories, 50);
        assert_eq!(recalculated.ingredients[0].nutrients.as_ref().unwrap().calories.value, 50.0);

        assert!(Dish::recalculate(&conn, 999).unwrap().is_none());
    }

    #[test]
    fn test_delete_removes_entries() {
        let conn = setup();
        let carrot = ingredient(&conn, "Carrot", 41.0);
        let dish = Dish::create(
            &conn,
            &dish_with(vec![DishIngredientCreate { ingredient_id: carrot.id, units: vec![grams(100.0, 1.0)] }]),
        )
        .unwrap();

        assert!(Dish::delete(&conn, dish.id).unwrap());
        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM dish_ingredients", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
