//! Nutriplan MCP Server Implementation
//!
//! Implements the MCP server with all Nutriplan tools.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::db::Database;
use crate::models::{
    BaseUnit, DishCreate, DishIngredientCreate, DishIngredientUnit, IngredientCreate,
    IngredientUpdate, NutritionProfile, ScheduleUpdate,
};
use crate::tools::dishes;
use crate::tools::ingredients;
use crate::tools::schedules;
use crate::tools::status::StatusTracker;

/// Nutriplan MCP Service
#[derive(Clone)]
pub struct NutriplanService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    tool_router: ToolRouter<NutriplanService>,
}

impl NutriplanService {
    pub fn new(database_path: PathBuf, database: Database) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(database_path))),
            database,
            tool_router: Self::tool_router(),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn parse_nutrition(value: Option<serde_json::Value>) -> Result<Option<NutritionProfile>, McpError> {
    value
        .map(serde_json::from_value::<NutritionProfile>)
        .transpose()
        .map_err(|e| McpError::invalid_params(format!("Invalid nutrition profile: {}", e), None))
}

fn not_found(kind: &str, key: impl Serialize) -> Result<CallToolResult, McpError> {
    to_json(&serde_json::json!({ "error": format!("{} not found", kind), "key": key }))
}

// ============================================================================
// Ingredient Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddIngredientParams {
    pub name: String,
    /// Amount the nutrition values describe, e.g. 100
    pub base_amount: f64,
    /// Unit of base_amount, e.g. "g"
    pub base_unit: String,
    /// Nutrition profile: {"nutrients": {"calories": {"value", "unit"}, ...}, "minerals": [{"label", "value", "unit"}], ...}
    pub nutrition: Option<serde_json::Value>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IdParams {
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListParams {
    /// Name search
    pub query: Option<String>,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_list_limit() -> i64 { 50 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateIngredientParams {
    pub id: i64,
    pub name: Option<String>,
    /// Must be given together with base_unit
    pub base_amount: Option<f64>,
    pub base_unit: Option<String>,
    pub nutrition: Option<serde_json::Value>,
    pub notes: Option<String>,
}

// ============================================================================
// Dish Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UnitParams {
    /// Base-unit amount per one of this unit
    pub value: Option<f64>,
    /// How many of this unit the dish uses
    pub quantity: Option<f64>,
    pub unit: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DishIngredientParams {
    pub ingredient_id: i64,
    pub units: Vec<UnitParams>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateDishParams {
    pub name: String,
    pub image: Option<String>,
    /// Servings the dish makes
    #[serde(default = "default_servings")]
    pub servings: u32,
    pub ingredients: Vec<DishIngredientParams>,
    pub notes: Option<String>,
}

fn default_servings() -> u32 { 1 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DishUnitRatioParams {
    pub dish_id: i64,
    pub ingredient_id: i64,
    pub unit: String,
    pub quantity: f64,
}

// ============================================================================
// Schedule Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateScheduleParams {
    /// Date (YYYY-MM-DD)
    pub date: String,
    pub calorie_target: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DateParams {
    /// Date (YYYY-MM-DD)
    pub date: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListSchedulesParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateScheduleParams {
    pub date: String,
    pub calorie_target: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddScheduledDishParams {
    /// Date (YYYY-MM-DD); the schedule is created if missing
    pub date: String,
    /// breakfast, lunch, dinner or snack
    pub meal_type: String,
    pub dish_id: i64,
    /// Planned servings; defaults to the dish's own servings
    pub servings: Option<f64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateScheduledDishParams {
    pub id: i64,
    pub meal_type: Option<String>,
    pub servings: Option<f64>,
    pub is_eaten: Option<bool>,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl NutriplanService {
    // --- Status ---

    #[tool(description = "Get the current status of the Nutriplan service including build info, database status, record counts, and process information")]
    async fn nutriplan_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status(&self.database);
        to_json(&status)
    }

    #[tool(description = "Get step-by-step instructions for planning meals. Call this when starting a planning session or when unsure how ingredients, dishes and schedules fit together.")]
    fn planning_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::PLANNING_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(PLANNING_INSTRUCTIONS)]))
    }

    // --- Ingredients ---

    #[tool(description = "Add an ingredient with nutrition per base unit (e.g. per 100 g)")]
    fn add_ingredient(&self, Parameters(p): Parameters<AddIngredientParams>) -> Result<CallToolResult, McpError> {
        let data = IngredientCreate {
            name: p.name,
            base_unit: BaseUnit { amount: p.base_amount, unit: p.base_unit },
            nutrition: parse_nutrition(p.nutrition)?,
            notes: p.notes,
        };
        let result = ingredients::add_ingredient(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get an ingredient with its nutrition and the number of dishes using it")]
    fn get_ingredient(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = ingredients::get_ingredient(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(ingredient) => to_json(&ingredient),
            None => not_found("Ingredient", p.id),
        }
    }

    #[tool(description = "List ingredients with optional name search and pagination")]
    fn list_ingredients(&self, Parameters(p): Parameters<ListParams>) -> Result<CallToolResult, McpError> {
        let result = ingredients::list_ingredients(&self.database, p.query.as_deref(), p.limit, p.offset)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Update an ingredient. Schedules reflect the change immediately; run recalculate_dish to refresh stored dish calories.")]
    fn update_ingredient(&self, Parameters(p): Parameters<UpdateIngredientParams>) -> Result<CallToolResult, McpError> {
        let base_unit = match (p.base_amount, p.base_unit) {
            (Some(amount), Some(unit)) => Some(BaseUnit { amount, unit }),
            (None, None) => None,
            _ => {
                return Err(McpError::invalid_params(
                    "base_amount and base_unit must be given together",
                    None,
                ))
            }
        };
        let data = IngredientUpdate {
            name: p.name,
            base_unit,
            nutrition: parse_nutrition(p.nutrition)?,
            notes: p.notes,
        };
        let result = ingredients::update_ingredient(&self.database, p.id, data).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Delete an ingredient. Dishes using it keep their entries, which then contribute no nutrition.")]
    fn delete_ingredient(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = ingredients::delete_ingredient(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    // --- Dishes ---

    #[tool(description = "Create a dish from ingredients. Each ingredient lists its units; exactly one unit must be is_default and decides the dish calories.")]
    fn create_dish(&self, Parameters(p): Parameters<CreateDishParams>) -> Result<CallToolResult, McpError> {
        let data = DishCreate {
            name: p.name,
            image: p.image,
            servings: p.servings,
            ingredients: p
                .ingredients
                .into_iter()
                .map(|i| DishIngredientCreate {
                    ingredient_id: i.ingredient_id,
                    units: i
                        .units
                        .into_iter()
                        .map(|u| DishIngredientUnit {
                            value: u.value,
                            quantity: u.quantity,
                            unit: u.unit,
                            is_default: u.is_default,
                        })
                        .collect(),
                })
                .collect(),
            notes: p.notes,
        };
        let result = dishes::create_dish(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get a dish with its ingredient entries, per-entry calories and summed nutrition")]
    fn get_dish(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = dishes::get_dish(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(dish) => to_json(&dish),
            None => not_found("Dish", p.id),
        }
    }

    #[tool(description = "List dishes with optional name search and pagination")]
    fn list_dishes(&self, Parameters(p): Parameters<ListParams>) -> Result<CallToolResult, McpError> {
        let result = dishes::list_dishes(&self.database, p.query.as_deref(), p.limit, p.offset)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Delete a dish. Scheduled occurrences stay under their old name with zero nutrition.")]
    fn delete_dish(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = dishes::delete_dish(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Recalculate a dish's stored calories from current ingredient data")]
    fn recalculate_dish(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = dishes::recalculate_dish(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Convert a quantity of a unit of a dish ingredient into multiples of the ingredient's base unit")]
    fn dish_unit_ratio(&self, Parameters(p): Parameters<DishUnitRatioParams>) -> Result<CallToolResult, McpError> {
        let result = dishes::dish_unit_ratio(&self.database, p.dish_id, p.ingredient_id, &p.unit, p.quantity)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    // --- Schedules ---

    #[tool(description = "Create an empty schedule for a date (YYYY-MM-DD) with an optional calorie target")]
    fn create_schedule(&self, Parameters(p): Parameters<CreateScheduleParams>) -> Result<CallToolResult, McpError> {
        let result = schedules::create_schedule(&self.database, &p.date, p.calorie_target, p.notes)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get a day's schedule. Every planned dish carries nutrition scaled to its planned servings; totals split planned vs eaten.")]
    fn get_schedule(&self, Parameters(p): Parameters<DateParams>) -> Result<CallToolResult, McpError> {
        let result = schedules::get_schedule(&self.database, &p.date).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(schedule) => to_json(&schedule),
            None => not_found("Schedule", &p.date),
        }
    }

    #[tool(description = "List schedules in an optional date range, newest first")]
    fn list_schedules(&self, Parameters(p): Parameters<ListSchedulesParams>) -> Result<CallToolResult, McpError> {
        let result = schedules::list_schedules(
            &self.database,
            p.start_date.as_deref(),
            p.end_date.as_deref(),
            p.limit,
            p.offset,
        )
        .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Update a schedule's calorie target or notes")]
    fn update_schedule(&self, Parameters(p): Parameters<UpdateScheduleParams>) -> Result<CallToolResult, McpError> {
        let data = ScheduleUpdate {
            calorie_target: p.calorie_target,
            notes: p.notes,
        };
        let result = schedules::update_schedule(&self.database, &p.date, data).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Delete a day's schedule and everything planned in it")]
    fn delete_schedule(&self, Parameters(p): Parameters<DateParams>) -> Result<CallToolResult, McpError> {
        let result = schedules::delete_schedule(&self.database, &p.date).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Plan a dish into a meal (breakfast, lunch, dinner, snack) on a date. Creates the schedule if needed.")]
    fn add_scheduled_dish(&self, Parameters(p): Parameters<AddScheduledDishParams>) -> Result<CallToolResult, McpError> {
        let result = schedules::add_scheduled_dish(&self.database, &p.date, &p.meal_type, p.dish_id, p.servings)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Move a planned dish to another meal, change its servings, or mark it eaten")]
    fn update_scheduled_dish(&self, Parameters(p): Parameters<UpdateScheduledDishParams>) -> Result<CallToolResult, McpError> {
        let result = schedules::update_scheduled_dish(&self.database, p.id, p.meal_type.as_deref(), p.servings, p.is_eaten)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Remove a planned dish from its schedule")]
    fn remove_scheduled_dish(&self, Parameters(p): Parameters<IdParams>) -> Result<CallToolResult, McpError> {
        let result = schedules::remove_scheduled_dish(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }
}

#[tool_handler]
impl ServerHandler for NutriplanService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "nutriplan".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Nutriplan".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Nutriplan - meal planning with per-serving nutrition. \
                 IMPORTANT: Call planning_instructions before planning. \
                 Ingredients: add/get/list/update/delete_ingredient. \
                 Dishes: create/get/list/delete_dish, recalculate_dish, dish_unit_ratio. \
                 Schedules: create/get/list/update/delete_schedule (by date). \
                 Planned dishes: add/update/remove_scheduled_dish."
                    .into(),
            ),
        }
    }
}
