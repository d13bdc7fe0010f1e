//! Goal and profile tools
//!
//! Static calorie goal, weigh-ins, weight goals and profile preferences.
//! Every input is validated before anything is written.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use super::{after_write, TOTALS_UNAVAILABLE};
use crate::engine::window::local_today;
use crate::engine::{compute_daily_calorie_limit, CalorieLimit, EngineError, EngineResult, LimitPolicy};
use crate::models::{User, UserProfileUpdate, WeightEntry, WeightGoal, DATE_FORMAT};
use crate::store::NutritionStore;

pub const MAX_DAILY_GOAL: i64 = 10_000;
pub const MAX_WEIGHT_KG: f64 = 500.0;
pub const MIN_TDEE: i64 = 800;
pub const MAX_TDEE: i64 = 10_000;

/// Response for set_daily_goal
#[derive(Debug, Serialize)]
pub struct DailyGoalResponse {
    pub daily_goal: i64,
    /// The limit actually in effect (a weight goal takes precedence);
    /// `None` if it could not be read after the goal was saved
    pub limit: Option<CalorieLimit>,
    pub message: String,
}

/// Response for record_weight
#[derive(Debug, Serialize)]
pub struct RecordWeightResponse {
    pub entry: WeightEntry,
    pub limit: Option<CalorieLimit>,
    pub message: String,
}

/// Response for set_weight_goal
#[derive(Debug, Serialize)]
pub struct WeightGoalResponse {
    pub goal: WeightGoal,
    pub limit: Option<CalorieLimit>,
    pub message: String,
}

/// Response for update_profile
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
    pub message: String,
}

/// Arguments for set_weight_goal, as received from the assistant
#[derive(Debug, Clone)]
pub struct WeightGoalInput {
    pub target_weight: f64,
    /// `YYYY-MM-DD`
    pub target_date: String,
    pub current_weight: Option<f64>,
    pub tdee: Option<i64>,
}

pub fn validate_weight(weight_kg: f64, what: &str) -> EngineResult<f64> {
    if !weight_kg.is_finite() || weight_kg <= 0.0 || weight_kg > MAX_WEIGHT_KG {
        return Err(EngineError::validation(format!(
            "{} must be between 0 and {} kg, got {}",
            what, MAX_WEIGHT_KG, weight_kg
        )));
    }
    Ok(weight_kg)
}

fn validate_target_date(raw: &str, today: NaiveDate) -> EngineResult<NaiveDate> {
    let date = NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
        EngineError::validation(format!("target date must be YYYY-MM-DD, got '{}'", raw))
    })?;
    if date < today {
        return Err(EngineError::validation(format!(
            "target date {} is in the past",
            date
        )));
    }
    Ok(date)
}

fn validate_timezone(raw: &str) -> EngineResult<String> {
    let name = raw.trim();
    name.parse::<Tz>()
        .map_err(|_| EngineError::validation(format!("unknown timezone '{}'", raw)))?;
    Ok(name.to_string())
}

fn deficit_word(deficit: i64) -> &'static str {
    if deficit > 0 {
        "deficit"
    } else {
        "surplus"
    }
}

/// Set the static daily calorie goal
pub fn set_daily_goal<S: NutritionStore + ?Sized>(
    store: &S,
    policy: &LimitPolicy,
    phone: &str,
    calories: i64,
    now: DateTime<Utc>,
) -> EngineResult<DailyGoalResponse> {
    if !(1..=MAX_DAILY_GOAL).contains(&calories) {
        return Err(EngineError::validation(format!(
            "daily goal must be between 1 and {} calories, got {}",
            MAX_DAILY_GOAL, calories
        )));
    }

    let user = store.update_user_goal(phone, calories)?;
    let limit = after_write(
        "calorie limit",
        compute_daily_calorie_limit(store, &user, policy, now),
    );

    let mut message = format!("Daily calorie goal updated to {} calories.", calories);
    match &limit {
        Some(limit) if limit.has_weight_goal => message.push_str(&format!(
            "\nNote: your weight goal currently sets the daily limit ({} cal).",
            limit.daily_limit
        )),
        Some(_) => {}
        None => {
            message.push('\n');
            message.push_str(TOTALS_UNAVAILABLE);
        }
    }

    Ok(DailyGoalResponse {
        daily_goal: calories,
        limit,
        message,
    })
}

/// Log a weigh-in and report goal progress
pub fn record_weight<S: NutritionStore + ?Sized>(
    store: &S,
    policy: &LimitPolicy,
    phone: &str,
    weight_kg: f64,
    now: DateTime<Utc>,
) -> EngineResult<RecordWeightResponse> {
    let weight_kg = validate_weight(weight_kg, "weight")?;

    let user = store.get_or_create_user(phone)?;
    let entry = store.log_weight(user.id, weight_kg, now)?;
    let limit = after_write(
        "calorie limit",
        compute_daily_calorie_limit(store, &user, policy, now),
    );

    let Some(computed) = &limit else {
        return Ok(RecordWeightResponse {
            entry,
            limit: None,
            message: format!("Weight recorded: {} kg.\n{}", weight_kg, TOTALS_UNAVAILABLE),
        });
    };
    let message = match (computed.has_weight_goal, computed.target_weight, computed.days_remaining) {
        (true, Some(target), Some(days)) => {
            let diff = weight_kg - target;
            let direction = if diff > 0.0 { "to lose" } else { "to gain" };
            format!(
                "Weight recorded: {} kg.\nTarget: {} kg ({:.1} kg {})\nDays remaining: {}\nComputed daily limit: {} cal",
                weight_kg,
                target,
                diff.abs(),
                direction,
                days,
                computed.daily_limit
            )
        }
        _ => format!("Weight recorded: {} kg.", weight_kg),
    };

    Ok(RecordWeightResponse {
        entry,
        limit,
        message,
    })
}

/// Set a weight goal, optionally logging the current weight with it
pub fn set_weight_goal<S: NutritionStore + ?Sized>(
    store: &S,
    policy: &LimitPolicy,
    phone: &str,
    input: WeightGoalInput,
    now: DateTime<Utc>,
) -> EngineResult<WeightGoalResponse> {
    let target_weight = validate_weight(input.target_weight, "target weight")?;
    let current_weight = input
        .current_weight
        .map(|w| validate_weight(w, "current weight"))
        .transpose()?;
    if let Some(tdee) = input.tdee {
        if !(MIN_TDEE..=MAX_TDEE).contains(&tdee) {
            return Err(EngineError::validation(format!(
                "TDEE must be between {} and {} calories, got {}",
                MIN_TDEE, MAX_TDEE, tdee
            )));
        }
    }

    let user = store.get_or_create_user(phone)?;
    let target_date = validate_target_date(&input.target_date, local_today(user.tz(), now))?;

    let goal = WeightGoal {
        target_weight,
        target_date,
        tdee: input.tdee,
    };
    let weigh_in = current_weight.map(|kg| (kg, now));
    let user = store.set_weight_goal(user.id, &goal, weigh_in)?;
    let limit = after_write(
        "calorie limit",
        compute_daily_calorie_limit(store, &user, policy, now),
    );

    let Some(computed) = &limit else {
        return Ok(WeightGoalResponse {
            message: format!(
                "Weight goal set: {} kg by {}.\n{}",
                target_weight, target_date, TOTALS_UNAVAILABLE
            ),
            goal,
            limit: None,
        });
    };
    let message = match (
        computed.current_weight,
        computed.tdee,
        computed.daily_deficit,
        computed.days_remaining,
    ) {
        (Some(current), Some(tdee), Some(deficit), Some(days)) => {
            let mut lines = vec![
                "Weight goal set!".to_string(),
                format!(
                    "Current: {} kg -> Target: {} kg by {}",
                    current, target_weight, target_date
                ),
                format!("TDEE: {} cal", tdee),
                format!("Computed daily calorie limit: {} cal", computed.daily_limit),
                format!("Daily {}: {} cal", deficit_word(deficit), deficit.abs()),
                format!("Days remaining: {}", days),
            ];
            if computed.floor_applied {
                lines.push(format!(
                    "Note: this pace would need {} cal/day, so the limit is held at the safe minimum of {} cal. Consider a later target date.",
                    computed.unclamped_limit, computed.daily_limit
                ));
            }
            lines.join("\n")
        }
        _ => format!(
            "Weight goal set: {} kg by {}.\nRecord your current weight so I can compute your daily limit. Until then it stays at {} cal.",
            target_weight, target_date, computed.daily_limit
        ),
    };

    Ok(WeightGoalResponse {
        goal,
        limit,
        message,
    })
}

/// Update name, dietary preferences or timezone
pub fn update_profile<S: NutritionStore + ?Sized>(
    store: &S,
    phone: &str,
    mut update: UserProfileUpdate,
) -> EngineResult<ProfileResponse> {
    if update.is_empty() {
        return Err(EngineError::validation("nothing to update"));
    }
    if let Some(tz) = &update.timezone {
        update.timezone = Some(validate_timezone(tz)?);
    }

    let user = store.get_or_create_user(phone)?;
    let user = store.update_user_profile(user.id, &update)?;

    let mut parts = Vec::new();
    if let Some(name) = &update.first_name {
        parts.push(format!("Name: {}", name));
    }
    if let Some(prefs) = &update.dietary_preferences {
        parts.push(format!("Dietary preferences: {}", prefs));
    }
    if let Some(tz) = &update.timezone {
        parts.push(format!("Timezone: {}", tz));
    }

    Ok(ProfileResponse {
        user,
        message: format!("Profile updated! {}", parts.join(" | ")),
    })
}
