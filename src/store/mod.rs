//! Storage collaborator
//!
//! The accounting engine reads and writes users, weigh-ins and meals only
//! through [`NutritionStore`]. [`SqliteStore`] is the production adapter.

mod sqlite;

use chrono::{DateTime, Utc};

use crate::db::DbResult;
use crate::models::{Meal, MealCreate, User, UserProfileUpdate, WeightEntry, WeightGoal};

pub use sqlite::SqliteStore;

/// Capabilities the engine needs from persistence
pub trait NutritionStore {
    fn get_or_create_user(&self, phone: &str) -> DbResult<User>;

    /// Set the static daily goal for the user identified by `phone`
    fn update_user_goal(&self, phone: &str, calories: i64) -> DbResult<User>;

    fn update_user_profile(&self, user_id: i64, update: &UserProfileUpdate) -> DbResult<User>;

    /// Store the goal and, if given, a `(kg, recorded_at)` weigh-in in one
    /// transaction; either both are written or neither is
    fn set_weight_goal(
        &self,
        user_id: i64,
        goal: &WeightGoal,
        weigh_in: Option<(f64, DateTime<Utc>)>,
    ) -> DbResult<User>;

    fn log_weight(
        &self,
        user_id: i64,
        weight_kg: f64,
        recorded_at: DateTime<Utc>,
    ) -> DbResult<WeightEntry>;

    fn latest_weight(&self, user_id: i64) -> DbResult<Option<WeightEntry>>;

    fn log_meal(&self, data: &MealCreate) -> DbResult<Meal>;

    /// Meals in `[start, end)`, ordered by log time
    fn meals_between(
        &self,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Meal>>;

    /// Most recent meal logged at or after `since`
    fn get_last_meal(&self, user_id: i64, since: DateTime<Utc>) -> DbResult<Option<Meal>>;

    /// Replace items, totals and rating of an existing meal atomically
    fn update_meal(&self, meal: &Meal) -> DbResult<Meal>;

    /// Returns `false` if no such meal existed
    fn delete_meal(&self, meal_id: i64) -> DbResult<bool>;
}
