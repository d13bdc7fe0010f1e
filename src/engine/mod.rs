//! Nutrition accounting engine
//!
//! Stateless computations over the records a [`NutritionStore`] returns:
//! window totals, the daily calorie limit, meal scaling and reports.
//!
//! [`NutritionStore`]: crate::store::NutritionStore

pub mod aggregator;
pub mod calorie_limit;
pub mod meal_mutator;
pub mod report;
pub mod window;

use thiserror::Error;

use crate::db::DbError;

pub use aggregator::{
    aggregate, get_monthly_consumption, get_user_meals_today, get_user_today_macros,
    get_weekly_consumption, WindowTotals,
};
pub use calorie_limit::{calculate_limit, compute_daily_calorie_limit, CalorieLimit, LimitPolicy};
pub use meal_mutator::{delete_last_meal, scale_last_meal, scale_meal, ScaledMeal};
pub use report::{build_day_report, build_period_report, DayReport, GoalTracking, PeriodReport};
pub use window::{Window, WindowKind};

/// Failures surfaced by engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// Nothing to show or update for the requested scope
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage failure: {0}")]
    Persistence(#[from] DbError),

    /// Input rejected before anything was written
    #[error("Invalid input: {0}")]
    Validation(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        EngineError::NotFound(msg.into())
    }

    /// Chat-ready text for this failure
    pub fn user_message(&self) -> String {
        match self {
            EngineError::NotFound(msg) => msg.clone(),
            EngineError::Validation(msg) => format!("Sorry, I can't do that: {}", msg),
            EngineError::Persistence(_) => {
                "Sorry, I couldn't save that right now. Nothing was changed - please try again in a moment."
                    .to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        let e = EngineError::not_found("No meals logged today to delete.");
        assert_eq!(e.user_message(), "No meals logged today to delete.");

        let e = EngineError::validation("fraction must be greater than 0");
        assert!(e.user_message().contains("fraction must be greater than 0"));

        let e = EngineError::from(DbError::Missing("meal 7".to_string()));
        assert!(e.user_message().contains("couldn't save"));
        assert!(!e.user_message().contains("meal 7"));
    }
}
