//! Daily calorie limit
//!
//! Either the user's static goal, or a projection from their weight goal:
//! spread the energy needed to reach the target weight evenly over the days
//! left and subtract it from TDEE. Projected limits never go below the
//! configured safe floor; when the floor is hit it is reported.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::window::local_today;
use super::EngineResult;
use crate::models::User;
use crate::store::NutritionStore;

pub const DEFAULT_DAILY_GOAL: i64 = 2000;
pub const DEFAULT_TDEE: i64 = 2000;
pub const KCAL_PER_KG: f64 = 7700.0;
pub const MIN_DAILY_LIMIT: i64 = 1200;

/// Constants the limit calculation depends on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitPolicy {
    /// Used when the user has no static goal
    pub default_daily_goal: i64,
    /// Used when a weight goal has no TDEE
    pub default_tdee: i64,
    pub kcal_per_kg: f64,
    /// Safe floor for projected limits
    pub min_daily_limit: i64,
}

impl Default for LimitPolicy {
    fn default() -> Self {
        Self {
            default_daily_goal: DEFAULT_DAILY_GOAL,
            default_tdee: DEFAULT_TDEE,
            kcal_per_kg: KCAL_PER_KG,
            min_daily_limit: MIN_DAILY_LIMIT,
        }
    }
}

/// Result of the limit calculation.
///
/// `daily_deficit > 0` is a deficit (losing weight), `< 0` a surplus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalorieLimit {
    pub daily_limit: i64,
    pub has_weight_goal: bool,
    pub current_weight: Option<f64>,
    pub target_weight: Option<f64>,
    pub target_date: Option<NaiveDate>,
    pub days_remaining: Option<i64>,
    pub tdee: Option<i64>,
    pub daily_deficit: Option<i64>,
    /// The projection was raised to the safe floor
    pub floor_applied: bool,
    /// Projection before the floor was applied
    pub unclamped_limit: i64,
}

impl CalorieLimit {
    /// Kilograms still to lose (positive) or gain (negative)
    pub fn kg_to_go(&self) -> Option<f64> {
        match (self.current_weight, self.target_weight) {
            (Some(current), Some(target)) => Some(current - target),
            _ => None,
        }
    }
}

/// Pure limit calculation for `user` on local date `today`
pub fn calculate_limit(
    user: &User,
    current_weight: Option<f64>,
    today: NaiveDate,
    policy: &LimitPolicy,
) -> CalorieLimit {
    let static_limit = user.daily_goal.unwrap_or(policy.default_daily_goal);

    let (goal, current) = match (user.weight_goal(), current_weight) {
        (Some(goal), Some(current)) => (goal, current),
        (goal, _) => {
            return CalorieLimit {
                daily_limit: static_limit,
                has_weight_goal: false,
                current_weight,
                target_weight: goal.as_ref().map(|g| g.target_weight),
                target_date: goal.as_ref().map(|g| g.target_date),
                days_remaining: None,
                tdee: None,
                daily_deficit: None,
                floor_applied: false,
                unclamped_limit: static_limit,
            };
        }
    };

    let days_remaining = (goal.target_date - today).num_days().max(1);
    let tdee = goal.tdee.unwrap_or(policy.default_tdee);
    let total_kcal = (current - goal.target_weight) * policy.kcal_per_kg;
    let daily_deficit = (total_kcal / days_remaining as f64).round() as i64;

    let unclamped_limit = tdee.saturating_sub(daily_deficit);
    let floor_applied = unclamped_limit < policy.min_daily_limit;
    let daily_limit = unclamped_limit.max(policy.min_daily_limit);

    if floor_applied {
        warn!(
            user_id = user.id,
            unclamped_limit,
            floor = policy.min_daily_limit,
            days_remaining,
            "projected daily limit below safe floor; clamped"
        );
    }

    CalorieLimit {
        daily_limit,
        has_weight_goal: true,
        current_weight: Some(current),
        target_weight: Some(goal.target_weight),
        target_date: Some(goal.target_date),
        days_remaining: Some(days_remaining),
        tdee: Some(tdee),
        daily_deficit: Some(daily_deficit),
        floor_applied,
        unclamped_limit,
    }
}

/// Look up the current weight and compute the limit for "today" in the
/// user's timezone
pub fn compute_daily_calorie_limit<S: NutritionStore + ?Sized>(
    store: &S,
    user: &User,
    policy: &LimitPolicy,
    now: DateTime<Utc>,
) -> EngineResult<CalorieLimit> {
    let current_weight = store.latest_weight(user.id)?.map(|w| w.weight_kg);
    let today = local_today(user.tz(), now);
    Ok(calculate_limit(user, current_weight, today, policy))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(daily_goal: Option<i64>) -> User {
        User {
            id: 1,
            phone: "+15550000".to_string(),
            first_name: None,
            daily_goal,
            timezone: "UTC".to_string(),
            dietary_preferences: None,
            target_weight: None,
            target_date: None,
            tdee: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn with_goal(mut u: User, target: f64, date: NaiveDate, tdee: Option<i64>) -> User {
        u.target_weight = Some(target);
        u.target_date = Some(date);
        u.tdee = tdee;
        u
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_static_goal_is_returned_exactly() {
        let limit = calculate_limit(&user(Some(1850)), Some(80.0), day(2026, 10, 19), &LimitPolicy::default());
        assert_eq!(limit.daily_limit, 1850);
        assert!(!limit.has_weight_goal);
        assert!(!limit.floor_applied);
    }

    #[test]
    fn test_static_goal_below_floor_is_not_clamped() {
        let limit = calculate_limit(&user(Some(1000)), None, day(2026, 10, 19), &LimitPolicy::default());
        assert_eq!(limit.daily_limit, 1000);
        assert!(!limit.floor_applied);
    }

    #[test]
    fn test_default_goal_when_unset() {
        let limit = calculate_limit(&user(None), None, day(2026, 10, 19), &LimitPolicy::default());
        assert_eq!(limit.daily_limit, DEFAULT_DAILY_GOAL);
    }

    #[test]
    fn test_goal_without_weighin_falls_back_to_static() {
        let u = with_goal(user(Some(1900)), 70.0, day(2027, 1, 1), None);
        let limit = calculate_limit(&u, None, day(2026, 10, 19), &LimitPolicy::default());
        assert!(!limit.has_weight_goal);
        assert_eq!(limit.daily_limit, 1900);
        assert_eq!(limit.target_weight, Some(70.0));
    }

    #[test]
    fn test_weight_loss_projection() {
        // 5 kg over 77 days: 38500 / 77 = 500 kcal/day
        let today = day(2026, 10, 19);
        let u = with_goal(user(None), 75.0, today + chrono::Duration::days(77), Some(2500));
        let limit = calculate_limit(&u, Some(80.0), today, &LimitPolicy::default());
        assert!(limit.has_weight_goal);
        assert_eq!(limit.days_remaining, Some(77));
        assert_eq!(limit.daily_deficit, Some(500));
        assert_eq!(limit.daily_limit, 2000);
        assert_eq!(limit.kg_to_go(), Some(5.0));
        assert!(!limit.floor_applied);
    }

    #[test]
    fn test_weight_gain_is_a_surplus() {
        let today = day(2026, 10, 19);
        let u = with_goal(user(None), 62.0, today + chrono::Duration::days(154), None);
        let limit = calculate_limit(&u, Some(60.0), today, &LimitPolicy::default());
        assert_eq!(limit.daily_deficit, Some(-100));
        assert_eq!(limit.tdee, Some(DEFAULT_TDEE));
        assert_eq!(limit.daily_limit, 2100);
    }

    #[test]
    fn test_past_target_date_clamps_days_to_one() {
        let u = with_goal(user(None), 79.9, day(2026, 9, 1), Some(2500));
        let limit = calculate_limit(&u, Some(80.0), day(2026, 10, 19), &LimitPolicy::default());
        assert_eq!(limit.days_remaining, Some(1));
        assert_eq!(limit.daily_deficit, Some(770));
        assert_eq!(limit.daily_limit, 1730);
    }

    #[test]
    fn test_target_today_counts_as_one_day() {
        let today = day(2026, 10, 19);
        let u = with_goal(user(None), 80.0, today, None);
        let limit = calculate_limit(&u, Some(80.0), today, &LimitPolicy::default());
        assert_eq!(limit.days_remaining, Some(1));
        assert_eq!(limit.daily_deficit, Some(0));
        assert_eq!(limit.daily_limit, DEFAULT_TDEE);
    }

    #[test]
    fn test_aggressive_goal_hits_floor() {
        // 80 -> 70 kg in 10 days: 77000 / 10 = 7700 kcal/day deficit
        let today = day(2026, 10, 19);
        let u = with_goal(user(None), 70.0, today + chrono::Duration::days(10), Some(2000));
        let limit = calculate_limit(&u, Some(80.0), today, &LimitPolicy::default());
        assert_eq!(limit.days_remaining, Some(10));
        assert_eq!(limit.daily_deficit, Some(7700));
        assert_eq!(limit.unclamped_limit, -5700);
        assert_eq!(limit.daily_limit, MIN_DAILY_LIMIT);
        assert!(limit.floor_applied);
    }

    #[test]
    fn test_custom_policy_floor() {
        let policy = LimitPolicy {
            min_daily_limit: 1500,
            ..LimitPolicy::default()
        };
        let today = day(2026, 10, 19);
        let u = with_goal(user(None), 78.0, today + chrono::Duration::days(20), Some(2200));
        let limit = calculate_limit(&u, Some(80.0), today, &policy);
        // 15400 / 20 = 770 -> 1430, raised to 1500
        assert_eq!(limit.unclamped_limit, 1430);
        assert_eq!(limit.daily_limit, 1500);
        assert!(limit.floor_applied);
    }
}
