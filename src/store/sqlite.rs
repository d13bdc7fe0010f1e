//! SQLite-backed [`NutritionStore`]

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::NutritionStore;
use crate::db::{Database, DbResult};
use crate::models::{Meal, MealCreate, User, UserProfileUpdate, WeightEntry, WeightGoal};

#[derive(Clone)]
pub struct SqliteStore {
    database: Database,
}

impl SqliteStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }
}

impl NutritionStore for SqliteStore {
    fn get_or_create_user(&self, phone: &str) -> DbResult<User> {
        self.database
            .with_transaction(|tx| User::get_or_create(tx, phone))
    }

    fn update_user_goal(&self, phone: &str, calories: i64) -> DbResult<User> {
        self.database
            .with_transaction(|tx| User::update_goal(tx, phone, calories))
    }

    fn update_user_profile(&self, user_id: i64, update: &UserProfileUpdate) -> DbResult<User> {
        self.database
            .with_transaction(|tx| User::update_profile(tx, user_id, update))
    }

    fn set_weight_goal(
        &self,
        user_id: i64,
        goal: &WeightGoal,
        weigh_in: Option<(f64, DateTime<Utc>)>,
    ) -> DbResult<User> {
        let user = self.database.with_transaction(|tx| {
            if let Some((weight_kg, recorded_at)) = weigh_in {
                WeightEntry::create(tx, user_id, weight_kg, recorded_at)?;
            }
            User::set_weight_goal(tx, user_id, goal)
        })?;
        info!(
            user_id,
            target_weight = goal.target_weight,
            target_date = %goal.target_date,
            weighed_in = weigh_in.is_some(),
            "weight goal set"
        );
        Ok(user)
    }

    fn log_weight(
        &self,
        user_id: i64,
        weight_kg: f64,
        recorded_at: DateTime<Utc>,
    ) -> DbResult<WeightEntry> {
        let entry = self
            .database
            .with_transaction(|tx| WeightEntry::create(tx, user_id, weight_kg, recorded_at))?;
        info!(user_id, weight_kg, "weight logged");
        Ok(entry)
    }

    fn latest_weight(&self, user_id: i64) -> DbResult<Option<WeightEntry>> {
        self.database
            .with_conn(|conn| WeightEntry::latest(conn, user_id))
    }

    fn log_meal(&self, data: &MealCreate) -> DbResult<Meal> {
        let meal = self.database.with_transaction(|tx| Meal::create(tx, data))?;
        info!(
            meal_id = meal.id,
            user_id = meal.user_id,
            calories = meal.totals.calories,
            "meal logged"
        );
        Ok(meal)
    }

    fn meals_between(
        &self,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Meal>> {
        let meals = self
            .database
            .with_conn(|conn| Meal::list_between(conn, user_id, &start, &end))?;
        debug!(user_id, %start, %end, count = meals.len(), "loaded meals for window");
        Ok(meals)
    }

    fn get_last_meal(&self, user_id: i64, since: DateTime<Utc>) -> DbResult<Option<Meal>> {
        self.database
            .with_conn(|conn| Meal::last_since(conn, user_id, &since))
    }

    fn update_meal(&self, meal: &Meal) -> DbResult<Meal> {
        let updated = self
            .database
            .with_transaction(|tx| Meal::update(tx, meal, Utc::now()))?;
        info!(
            meal_id = updated.id,
            calories = updated.totals.calories,
            "meal updated"
        );
        Ok(updated)
    }

    fn delete_meal(&self, meal_id: i64) -> DbResult<bool> {
        let deleted = self.database.with_conn(|conn| Meal::delete(conn, meal_id))?;
        info!(meal_id, deleted, "meal delete requested");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FoodItem, Macros};
    use crate::test_support::test_store;
    use chrono::{NaiveDate, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, h, m, 0).unwrap()
    }

    fn meal_at(user_id: i64, calories: i64, logged_at: DateTime<Utc>) -> MealCreate {
        let items = vec![FoodItem {
            name: "toast".to_string(),
            quantity: Some("2 slices".to_string()),
            macros: Macros::new(calories, 5.0, 30.0, 3.0),
        }];
        MealCreate::new(user_id, items, Macros::zero(), logged_at)
    }

    #[test]
    fn test_get_or_create_user_is_stable() {
        let (_dir, store) = test_store();
        let first = store.get_or_create_user("+15550001").unwrap();
        let again = store.get_or_create_user("+15550001").unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(first.timezone, "UTC");
        assert_eq!(first.daily_goal, None);
    }

    #[test]
    fn test_update_goal_and_profile() {
        let (_dir, store) = test_store();
        let user = store.update_user_goal("+15550002", 1800).unwrap();
        assert_eq!(user.daily_goal, Some(1800));

        let update = UserProfileUpdate {
            dietary_preferences: Some("vegetarian".to_string()),
            ..Default::default()
        };
        let user = store.update_user_profile(user.id, &update).unwrap();
        assert_eq!(user.dietary_preferences.as_deref(), Some("vegetarian"));
        assert_eq!(user.daily_goal, Some(1800));
        assert_eq!(user.timezone, "UTC");
    }

    #[test]
    fn test_weight_goal_roundtrips_date() {
        let (_dir, store) = test_store();
        let user = store.get_or_create_user("+15550003").unwrap();
        let goal = WeightGoal {
            target_weight: 72.5,
            target_date: NaiveDate::from_ymd_opt(2027, 3, 1).unwrap(),
            tdee: Some(2400),
        };
        let user = store.set_weight_goal(user.id, &goal, None).unwrap();
        assert_eq!(user.weight_goal(), Some(goal));
        assert!(store.latest_weight(user.id).unwrap().is_none());
    }

    #[test]
    fn test_weight_goal_and_weigh_in_commit_together() {
        let (_dir, store) = test_store();
        let user = store.get_or_create_user("+15550008").unwrap();
        let goal = WeightGoal {
            target_weight: 70.0,
            target_date: NaiveDate::from_ymd_opt(2027, 3, 1).unwrap(),
            tdee: None,
        };
        store
            .database()
            .with_conn(|conn| {
                conn.execute_batch(
                    "CREATE TRIGGER refuse_goal BEFORE UPDATE OF target_weight ON users
                     BEGIN SELECT RAISE(ABORT, 'goal refused'); END;",
                )?;
                Ok(())
            })
            .unwrap();

        assert!(store
            .set_weight_goal(user.id, &goal, Some((80.0, at(9, 0))))
            .is_err());
        assert!(store.latest_weight(user.id).unwrap().is_none());

        store
            .database()
            .with_conn(|conn| {
                conn.execute_batch("DROP TRIGGER refuse_goal;")?;
                Ok(())
            })
            .unwrap();
        let user = store
            .set_weight_goal(user.id, &goal, Some((80.0, at(9, 0))))
            .unwrap();
        assert_eq!(user.weight_goal(), Some(goal));
        assert_eq!(store.latest_weight(user.id).unwrap().unwrap().weight_kg, 80.0);
    }

    #[test]
    fn test_latest_weight_is_most_recent() {
        let (_dir, store) = test_store();
        let user = store.get_or_create_user("+15550004").unwrap();
        store.log_weight(user.id, 81.0, at(7, 0)).unwrap();
        store.log_weight(user.id, 80.4, at(8, 0)).unwrap();
        let latest = store.latest_weight(user.id).unwrap().unwrap();
        assert_eq!(latest.weight_kg, 80.4);
    }

    #[test]
    fn test_meals_between_is_half_open_and_ordered() {
        let (_dir, store) = test_store();
        let user = store.get_or_create_user("+15550005").unwrap();
        store.log_meal(&meal_at(user.id, 300, at(12, 0))).unwrap();
        store.log_meal(&meal_at(user.id, 100, at(8, 0))).unwrap();
        store.log_meal(&meal_at(user.id, 900, at(18, 0))).unwrap();

        let meals = store.meals_between(user.id, at(8, 0), at(18, 0)).unwrap();
        let calories: Vec<i64> = meals.iter().map(|m| m.totals.calories).collect();
        assert_eq!(calories, vec![100, 300]);
    }

    #[test]
    fn test_last_meal_update_and_delete() {
        let (_dir, store) = test_store();
        let user = store.get_or_create_user("+15550006").unwrap();
        store.log_meal(&meal_at(user.id, 300, at(9, 0))).unwrap();
        store.log_meal(&meal_at(user.id, 500, at(13, 0))).unwrap();

        let mut last = store.get_last_meal(user.id, at(0, 0)).unwrap().unwrap();
        assert_eq!(last.totals.calories, 500);

        last.items[0].macros.calories = 250;
        last.totals.calories = 250;
        let updated = store.update_meal(&last).unwrap();
        assert_eq!(updated.totals.calories, 250);
        assert_eq!(updated.items[0].macros.calories, 250);

        assert!(store.delete_meal(updated.id).unwrap());
        assert!(!store.delete_meal(updated.id).unwrap());
        let remaining = store.get_last_meal(user.id, at(0, 0)).unwrap().unwrap();
        assert_eq!(remaining.totals.calories, 300);
    }

    #[test]
    fn test_last_meal_respects_since() {
        let (_dir, store) = test_store();
        let user = store.get_or_create_user("+15550007").unwrap();
        store.log_meal(&meal_at(user.id, 300, at(9, 0))).unwrap();
        assert!(store.get_last_meal(user.id, at(10, 0)).unwrap().is_none());
    }
}
