//! Assistant tools
//!
//! One function per tool the chat assistant can call. Each resolves the
//! user by phone number, runs the engine and returns a serializable
//! response with a chat-ready `message`.

pub mod goals;
pub mod meals;
pub mod reports;
pub mod status;

pub use goals::{record_weight, set_daily_goal, set_weight_goal, update_profile, WeightGoalInput};
pub use meals::{
    delete_last_meal, get_calorie_status, get_meals_today, save_meal, save_text_meal,
    update_last_meal, MealInput,
};
pub use reports::{get_daily_summary, get_monthly_report, get_weekly_report};

use tracing::warn;

use crate::engine::EngineResult;

/// Appended when a write committed but the follow-up read failed
pub const TOTALS_UNAVAILABLE: &str =
    "Saved. I couldn't load your updated totals right now; ask for your status in a moment.";

/// A read that follows a committed write. Failure is logged and becomes
/// `None` so the reply still confirms the write.
fn after_write<T>(what: &str, result: EngineResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, what, "read after committed write failed");
            None
        }
    }
}
