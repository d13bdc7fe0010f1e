//! Shared fixtures for unit tests

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use crate::db::{migrations, Database, DbError, DbResult};
use crate::models::{Meal, MealCreate, User, UserProfileUpdate, WeightEntry, WeightGoal};
use crate::store::{NutritionStore, SqliteStore};

/// A migrated store in a fresh temp directory. Keep the `TempDir` alive
/// for the duration of the test.
pub(crate) fn test_store() -> (TempDir, SqliteStore) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let database = Database::new(dir.path().join("healthenforcer-test.db")).expect("open db");
    database
        .with_conn(migrations::run_migrations)
        .expect("run migrations");
    (dir, SqliteStore::new(database))
}

/// Delegates to a real store, except that weigh-in lookups fail. Writes
/// still commit, so a tool sees its write succeed and the follow-up
/// limit read fail.
pub(crate) struct WeightLookupFails(pub SqliteStore);

impl NutritionStore for WeightLookupFails {
    fn get_or_create_user(&self, phone: &str) -> DbResult<User> {
        self.0.get_or_create_user(phone)
    }

    fn update_user_goal(&self, phone: &str, calories: i64) -> DbResult<User> {
        self.0.update_user_goal(phone, calories)
    }

    fn update_user_profile(&self, user_id: i64, update: &UserProfileUpdate) -> DbResult<User> {
        self.0.update_user_profile(user_id, update)
    }

    fn set_weight_goal(
        &self,
        user_id: i64,
        goal: &WeightGoal,
        weigh_in: Option<(f64, DateTime<Utc>)>,
    ) -> DbResult<User> {
        self.0.set_weight_goal(user_id, goal, weigh_in)
    }

    fn log_weight(
        &self,
        user_id: i64,
        weight_kg: f64,
        recorded_at: DateTime<Utc>,
    ) -> DbResult<WeightEntry> {
        self.0.log_weight(user_id, weight_kg, recorded_at)
    }

    fn latest_weight(&self, _user_id: i64) -> DbResult<Option<WeightEntry>> {
        Err(DbError::Missing("weight_entries unavailable".to_string()))
    }

    fn log_meal(&self, data: &MealCreate) -> DbResult<Meal> {
        self.0.log_meal(data)
    }

    fn meals_between(
        &self,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Meal>> {
        self.0.meals_between(user_id, start, end)
    }

    fn get_last_meal(&self, user_id: i64, since: DateTime<Utc>) -> DbResult<Option<Meal>> {
        self.0.get_last_meal(user_id, since)
    }

    fn update_meal(&self, meal: &Meal) -> DbResult<Meal> {
        self.0.update_meal(meal)
    }

    fn delete_meal(&self, meal_id: i64) -> DbResult<bool> {
        self.0.delete_meal(meal_id)
    }
}
