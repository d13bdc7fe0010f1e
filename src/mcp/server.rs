//! HealthEnforcer MCP Server Implementation
//!
//! Exposes the assistant tools over MCP. Every tool takes the chat user's
//! phone number; users are created on first contact.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;

use crate::engine::{EngineError, EngineResult, LimitPolicy};
use crate::models::UserProfileUpdate;
use crate::store::SqliteStore;
use crate::tools::status::StatusTracker;
use crate::tools::{self, MealInput, WeightGoalInput};

/// HealthEnforcer MCP Service
#[derive(Clone)]
pub struct HealthEnforcerService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    store: SqliteStore,
    policy: LimitPolicy,
    tool_router: ToolRouter<HealthEnforcerService>,
}

impl HealthEnforcerService {
    pub fn new(database_path: PathBuf, store: SqliteStore, policy: LimitPolicy) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(database_path))),
            store,
            policy,
            tool_router: Self::tool_router(),
        }
    }
}

#[derive(Debug, Serialize)]
struct MessageOnly<'a> {
    message: &'a str,
}

/// Turn a tool outcome into an MCP result.
///
/// Not-found outcomes are ordinary replies; validation and storage failures
/// are tool errors carrying a chat-ready message.
fn reply<T: Serialize>(tool: &str, result: EngineResult<T>) -> Result<CallToolResult, McpError> {
    let json = match result {
        Ok(response) => serde_json::to_string_pretty(&response),
        Err(EngineError::NotFound(message)) => {
            serde_json::to_string_pretty(&MessageOnly { message: &message })
        }
        Err(e) => {
            warn!(tool, error = %e, "tool call failed");
            return Ok(CallToolResult::error(vec![Content::text(e.user_message())]));
        }
    }
    .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

// ============================================================================
// Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PhoneParams {
    /// The chat user's phone number
    pub phone_number: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetDailyGoalParams {
    pub phone_number: String,
    /// Daily calorie goal (1-10000)
    pub calories: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateLastMealParams {
    pub phone_number: String,
    /// Portion actually eaten (0.5 = half, 0.75 = three quarters, 2 = double)
    pub fraction: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SaveTextMealParams {
    pub phone_number: String,
    /// JSON array of items: name, quantity, calories, protein_g, carbs_g, sugar_g
    pub food_items_json: String,
    pub total_calories: f64,
    #[serde(default)]
    pub total_protein: f64,
    #[serde(default)]
    pub total_carbs: f64,
    #[serde(default)]
    pub total_sugar: f64,
    /// 1 (unhealthy) to 10 (very healthy)
    pub health_rating: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SaveMealParams {
    pub phone_number: String,
    /// JSON array of items: name, quantity, calories, protein_g, carbs_g, sugar_g
    pub food_items_json: String,
    pub total_calories: f64,
    #[serde(default)]
    pub total_protein: f64,
    #[serde(default)]
    pub total_carbs: f64,
    #[serde(default)]
    pub total_sugar: f64,
    /// Media id of the analyzed food photo
    pub media_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RecordWeightParams {
    pub phone_number: String,
    pub weight_kg: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetWeightGoalParams {
    pub phone_number: String,
    pub target_weight: f64,
    /// YYYY-MM-DD, today or later
    pub target_date: String,
    /// Recorded as a weigh-in when given
    pub current_weight: Option<f64>,
    /// Total daily energy expenditure; defaults to 2000
    pub tdee: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateProfileParams {
    pub phone_number: String,
    pub first_name: Option<String>,
    /// Free text, e.g. "vegetarian, allergic to nuts"
    pub dietary_preferences: Option<String>,
    /// IANA timezone, e.g. "Europe/London"
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MonthlyReportParams {
    pub phone_number: String,
    /// 1-12, defaults to the current month
    pub month: Option<u32>,
    /// Defaults to the current year
    pub year: Option<i32>,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl HealthEnforcerService {
    // --- Status ---

    #[tool(description = "Get the current status of the HealthEnforcer service including build info, database status, and process information")]
    async fn status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status(self.store.database());
        let json = serde_json::to_string_pretty(&status)
            .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Get instructions for logging meals, corrections, goals and reports. Call this when unsure how to use the tools.")]
    fn meal_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::MEAL_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(MEAL_INSTRUCTIONS)]))
    }

    // --- Today ---

    #[tool(description = "Calories and macros consumed today against the daily limit, including weight goal progress")]
    fn get_calorie_status(&self, Parameters(p): Parameters<PhoneParams>) -> Result<CallToolResult, McpError> {
        reply(
            "get_calorie_status",
            tools::get_calorie_status(&self.store, &self.policy, &p.phone_number, Utc::now()),
        )
    }

    #[tool(description = "List the meals logged today with the running total")]
    fn get_meals_today(&self, Parameters(p): Parameters<PhoneParams>) -> Result<CallToolResult, McpError> {
        reply(
            "get_meals_today",
            tools::get_meals_today(&self.store, &self.policy, &p.phone_number, Utc::now()),
        )
    }

    #[tool(description = "Data for the end-of-day summary: today's meals with local times, totals and the daily limit")]
    fn get_daily_summary(&self, Parameters(p): Parameters<PhoneParams>) -> Result<CallToolResult, McpError> {
        reply(
            "get_daily_summary",
            tools::get_daily_summary(&self.store, &self.policy, &p.phone_number, Utc::now()),
        )
    }

    // --- Meals ---

    #[tool(description = "Log a meal the user described in text. Totals are recomputed from the items.")]
    fn save_text_meal(&self, Parameters(p): Parameters<SaveTextMealParams>) -> Result<CallToolResult, McpError> {
        let input = MealInput {
            food_items_json: p.food_items_json,
            total_calories: p.total_calories,
            total_protein: p.total_protein,
            total_carbs: p.total_carbs,
            total_sugar: p.total_sugar,
            health_rating: p.health_rating,
            image_id: None,
            notes: p.notes,
        };
        reply(
            "save_text_meal",
            tools::save_text_meal(&self.store, &self.policy, &p.phone_number, input, Utc::now()),
        )
    }

    #[tool(description = "Log a meal analyzed from a food photo. Totals are recomputed from the items.")]
    fn save_meal(&self, Parameters(p): Parameters<SaveMealParams>) -> Result<CallToolResult, McpError> {
        let input = MealInput {
            food_items_json: p.food_items_json,
            total_calories: p.total_calories,
            total_protein: p.total_protein,
            total_carbs: p.total_carbs,
            total_sugar: p.total_sugar,
            health_rating: None,
            image_id: p.media_id,
            notes: p.notes,
        };
        reply(
            "save_meal",
            tools::save_meal(&self.store, &self.policy, &p.phone_number, input, Utc::now()),
        )
    }

    #[tool(description = "Scale today's most recent meal when the user ate only part of it (or more)")]
    fn update_last_meal(&self, Parameters(p): Parameters<UpdateLastMealParams>) -> Result<CallToolResult, McpError> {
        reply(
            "update_last_meal",
            tools::update_last_meal(&self.store, &self.policy, &p.phone_number, p.fraction, Utc::now()),
        )
    }

    #[tool(description = "Remove today's most recent meal")]
    fn delete_last_meal(&self, Parameters(p): Parameters<PhoneParams>) -> Result<CallToolResult, McpError> {
        reply(
            "delete_last_meal",
            tools::delete_last_meal(&self.store, &p.phone_number, Utc::now()),
        )
    }

    // --- Goals & Profile ---

    #[tool(description = "Set a fixed daily calorie goal")]
    fn set_daily_goal(&self, Parameters(p): Parameters<SetDailyGoalParams>) -> Result<CallToolResult, McpError> {
        reply(
            "set_daily_goal",
            tools::set_daily_goal(&self.store, &self.policy, &p.phone_number, p.calories, Utc::now()),
        )
    }

    #[tool(description = "Record the user's current weight in kg")]
    fn record_weight(&self, Parameters(p): Parameters<RecordWeightParams>) -> Result<CallToolResult, McpError> {
        reply(
            "record_weight",
            tools::record_weight(&self.store, &self.policy, &p.phone_number, p.weight_kg, Utc::now()),
        )
    }

    #[tool(description = "Set a weight loss or gain goal; the daily limit is then projected from it")]
    fn set_weight_goal(&self, Parameters(p): Parameters<SetWeightGoalParams>) -> Result<CallToolResult, McpError> {
        let input = WeightGoalInput {
            target_weight: p.target_weight,
            target_date: p.target_date,
            current_weight: p.current_weight,
            tdee: p.tdee,
        };
        reply(
            "set_weight_goal",
            tools::set_weight_goal(&self.store, &self.policy, &p.phone_number, input, Utc::now()),
        )
    }

    #[tool(description = "Update the user's first name, dietary preferences or timezone")]
    fn update_profile(&self, Parameters(p): Parameters<UpdateProfileParams>) -> Result<CallToolResult, McpError> {
        let update = UserProfileUpdate {
            first_name: p.first_name,
            dietary_preferences: p.dietary_preferences,
            timezone: p.timezone,
        };
        reply(
            "update_profile",
            tools::update_profile(&self.store, &p.phone_number, update),
        )
    }

    // --- Reports ---

    #[tool(description = "Weekly report (Monday to Sunday): totals, budget and deviation so far")]
    fn get_weekly_report(&self, Parameters(p): Parameters<PhoneParams>) -> Result<CallToolResult, McpError> {
        reply(
            "get_weekly_report",
            tools::get_weekly_report(&self.store, &self.policy, &p.phone_number, Utc::now()),
        )
    }

    #[tool(description = "Monthly report: totals, budget and deviation so far. Defaults to the current month.")]
    fn get_monthly_report(&self, Parameters(p): Parameters<MonthlyReportParams>) -> Result<CallToolResult, McpError> {
        reply(
            "get_monthly_report",
            tools::get_monthly_report(&self.store, &self.policy, &p.phone_number, p.month, p.year, Utc::now()),
        )
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for HealthEnforcerService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "healthenforcer".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("HealthEnforcer".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "HealthEnforcer - calorie and macro tracking for a chat assistant. \
                 IMPORTANT: Call meal_instructions before the first meal of a session. \
                 Every tool takes phone_number. \
                 Meals: save_meal (photo), save_text_meal (text), update_last_meal, delete_last_meal. \
                 Today: get_calorie_status, get_meals_today, get_daily_summary. \
                 Goals: set_daily_goal, record_weight, set_weight_goal, update_profile. \
                 Reports: get_weekly_report, get_monthly_report."
                    .into(),
            ),
        }
    }
}
