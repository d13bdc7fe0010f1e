//! Meal tools
//!
//! Logging (text and photo), listing, scaling and undoing meals.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::{
    self, build_day_report, compute_daily_calorie_limit, get_user_meals_today,
    get_user_today_macros, DayReport, EngineError, EngineResult, LimitPolicy, ScaledMeal,
};
use super::{after_write, TOTALS_UNAVAILABLE};
use crate::engine::meal_mutator::format_fraction;
use crate::models::{FoodItem, Macros, Meal, MealCreate, User, MAX_ITEM_CALORIES, MAX_MEAL_CALORIES};
use crate::store::NutritionStore;

/// Response for get_calorie_status
#[derive(Debug, Serialize)]
pub struct CalorieStatusResponse {
    pub report: DayReport,
    pub message: String,
}

/// Response for get_meals_today
#[derive(Debug, Serialize)]
pub struct MealsTodayResponse {
    pub meals: Vec<Meal>,
    pub report: DayReport,
    pub message: String,
}

/// Response for save_text_meal / save_meal
#[derive(Debug, Serialize)]
pub struct LogMealResponse {
    pub meal: Meal,
    /// `None` if the meal was saved but today's totals could not be read
    pub today: Option<DayReport>,
    pub message: String,
}

/// Response for update_last_meal
#[derive(Debug, Serialize)]
pub struct UpdateLastMealResponse {
    pub updated: bool,
    pub scaled: Option<ScaledMeal>,
    pub today: Option<DayReport>,
    pub message: String,
}

/// Response for delete_last_meal
#[derive(Debug, Serialize)]
pub struct DeleteLastMealResponse {
    pub deleted: bool,
    pub meal: Option<Meal>,
    pub message: String,
}

/// A meal as described by the assistant
#[derive(Debug, Clone)]
pub struct MealInput {
    /// JSON array of `{name, quantity, calories, protein_g, carbs_g, sugar_g}`
    pub food_items_json: String,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_sugar: f64,
    pub health_rating: Option<i64>,
    pub image_id: Option<String>,
    pub notes: Option<String>,
}

// ============================================================================
// Validation
// ============================================================================

/// Parse and sanity-check the assistant's food item list
pub fn parse_food_items(json: &str) -> EngineResult<Vec<FoodItem>> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }

    let items: Vec<FoodItem> = serde_json::from_str(json).map_err(|e| {
        EngineError::validation(format!("food items must be a JSON array of items: {}", e))
    })?;

    for item in &items {
        if item.name.trim().is_empty() {
            return Err(EngineError::validation("every food item needs a name"));
        }
        validate_macros(&item.macros, &item.name, MAX_ITEM_CALORIES)?;
    }

    match Macros::checked_sum(items.iter().map(|i| &i.macros)) {
        Some(total) if total.calories <= MAX_MEAL_CALORIES => Ok(items),
        _ => Err(EngineError::validation(format!(
            "a meal can have at most {} calories",
            MAX_MEAL_CALORIES
        ))),
    }
}

fn validate_macros(macros: &Macros, what: &str, max_calories: i64) -> EngineResult<()> {
    let grams = [macros.protein_g, macros.carbs_g, macros.sugar_g];
    if macros.calories < 0 || grams.iter().any(|g| !g.is_finite() || *g < 0.0) {
        return Err(EngineError::validation(format!(
            "calories and macros for {} must not be negative",
            what
        )));
    }
    if macros.calories > max_calories {
        return Err(EngineError::validation(format!(
            "{} calories for {} is more than the {} allowed",
            macros.calories, what, max_calories
        )));
    }
    Ok(())
}

pub fn validate_health_rating(rating: Option<i64>) -> EngineResult<Option<u8>> {
    match rating {
        None => Ok(None),
        Some(r) if (1..=10).contains(&r) => Ok(Some(r as u8)),
        Some(r) => Err(EngineError::validation(format!(
            "health rating must be between 1 and 10, got {}",
            r
        ))),
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// "grilled chicken (150g), rice (1 cup)"
pub fn describe_items(meal: &Meal) -> String {
    if meal.items.is_empty() {
        return meal.item_names();
    }
    meal.items
        .iter()
        .map(|item| match &item.quantity {
            Some(q) => format!("{} ({})", item.name, q),
            None => item.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn rating_label(meal: &Meal) -> String {
    match meal.health_rating {
        Some(r) => format!("{}/10", r),
        None => "n/a".to_string(),
    }
}

fn running_total_line(today: Option<&DayReport>) -> String {
    match today {
        Some(report) => report.running_total(),
        None => TOTALS_UNAVAILABLE.to_string(),
    }
}

fn today_report<S: NutritionStore + ?Sized>(
    store: &S,
    user: &User,
    policy: &LimitPolicy,
    now: DateTime<Utc>,
) -> EngineResult<DayReport> {
    let limit = compute_daily_calorie_limit(store, user, policy, now)?;
    let totals = get_user_today_macros(store, user, now)?;
    Ok(build_day_report(&totals, &limit))
}

// ============================================================================
// Tools
// ============================================================================

/// Calorie and macro intake so far today
pub fn get_calorie_status<S: NutritionStore + ?Sized>(
    store: &S,
    policy: &LimitPolicy,
    phone: &str,
    now: DateTime<Utc>,
) -> EngineResult<CalorieStatusResponse> {
    let user = store.get_or_create_user(phone)?;
    let report = today_report(store, &user, policy, now)?;
    let message = report.render();
    Ok(CalorieStatusResponse { report, message })
}

/// Numbered list of today's meals with the running total
pub fn get_meals_today<S: NutritionStore + ?Sized>(
    store: &S,
    policy: &LimitPolicy,
    phone: &str,
    now: DateTime<Utc>,
) -> EngineResult<MealsTodayResponse> {
    let user = store.get_or_create_user(phone)?;
    let meals = get_user_meals_today(store, &user, now)?;
    let report = today_report(store, &user, policy, now)?;

    if meals.is_empty() {
        return Ok(MealsTodayResponse {
            meals,
            report,
            message: "No meals logged today yet.".to_string(),
        });
    }

    let mut lines = vec![format!("Today's meals ({}):", meals.len())];
    for (i, meal) in meals.iter().enumerate() {
        lines.push(format!(
            "{}. {} - {} cal ({}) [Health: {}]",
            i + 1,
            describe_items(meal),
            meal.totals.calories,
            meal.totals.short_label(),
            rating_label(meal)
        ));
    }
    lines.push(String::new());
    lines.push(format!(
        "Daily total: {}/{} cal (Remaining: {})",
        report.consumed, report.daily_limit, report.remaining
    ));
    lines.push(report.macro_line());

    Ok(MealsTodayResponse {
        meals,
        message: lines.join("\n"),
        report,
    })
}

fn log_meal_for<S: NutritionStore + ?Sized>(
    store: &S,
    policy: &LimitPolicy,
    phone: &str,
    input: MealInput,
    now: DateTime<Utc>,
) -> EngineResult<(Meal, Option<DayReport>)> {
    let items = parse_food_items(&input.food_items_json)?;
    let health_rating = validate_health_rating(input.health_rating)?;
    if !input.total_calories.is_finite() || input.total_calories.abs() > MAX_MEAL_CALORIES as f64 {
        return Err(EngineError::validation(format!(
            "total calories must be a number up to {}",
            MAX_MEAL_CALORIES
        )));
    }
    let supplied = Macros::new(
        input.total_calories.round() as i64,
        input.total_protein,
        input.total_carbs,
        input.total_sugar,
    );
    validate_macros(&supplied, "the meal", MAX_MEAL_CALORIES)?;
    if items.is_empty() && supplied.calories == 0 {
        return Err(EngineError::validation("a meal needs food items or a calorie total"));
    }

    let user = store.get_or_create_user(phone)?;
    let data = MealCreate::new(user.id, items, supplied, now)
        .with_health_rating(health_rating)
        .with_image(input.image_id)
        .with_notes(input.notes);

    let meal = store.log_meal(&data)?;
    let report = after_write("today's totals", today_report(store, &user, policy, now));
    Ok((meal, report))
}

/// Log a meal the user described in text
pub fn save_text_meal<S: NutritionStore + ?Sized>(
    store: &S,
    policy: &LimitPolicy,
    phone: &str,
    input: MealInput,
    now: DateTime<Utc>,
) -> EngineResult<LogMealResponse> {
    let (meal, today) = log_meal_for(store, policy, phone, input, now)?;

    let mut message = format!(
        "Meal logged: {} cal | {}",
        meal.totals.calories,
        meal.totals.short_label()
    );
    if let Some(rating) = meal.health_rating {
        message.push_str(&format!(" | Health: {}/10", rating));
    }
    message.push('\n');
    message.push_str(&running_total_line(today.as_ref()));

    Ok(LogMealResponse {
        meal,
        today,
        message,
    })
}

/// Log a meal analyzed from a food photo
pub fn save_meal<S: NutritionStore + ?Sized>(
    store: &S,
    policy: &LimitPolicy,
    phone: &str,
    input: MealInput,
    now: DateTime<Utc>,
) -> EngineResult<LogMealResponse> {
    let (meal, today) = log_meal_for(store, policy, phone, input, now)?;

    let progress = match &today {
        Some(report) => format!("{} | {}", report.running_total(), report.macro_line()),
        None => TOTALS_UNAVAILABLE.to_string(),
    };
    let message = format!(
        "Meal logged: {} cal | Protein: {}g | Carbs: {}g | Sugar: {}g\n{}",
        meal.totals.calories,
        meal.totals.protein_g,
        meal.totals.carbs_g,
        meal.totals.sugar_g,
        progress
    );

    Ok(LogMealResponse {
        meal,
        today,
        message,
    })
}

/// Scale today's most recent meal (the user only ate part of it)
pub fn update_last_meal<S: NutritionStore + ?Sized>(
    store: &S,
    policy: &LimitPolicy,
    phone: &str,
    fraction: f64,
    now: DateTime<Utc>,
) -> EngineResult<UpdateLastMealResponse> {
    let user = store.get_or_create_user(phone)?;

    let scaled = match engine::scale_last_meal(store, &user, fraction, now) {
        Ok(scaled) => scaled,
        Err(EngineError::NotFound(message)) => {
            return Ok(UpdateLastMealResponse {
                updated: false,
                scaled: None,
                today: None,
                message,
            })
        }
        Err(e) => return Err(e),
    };

    let today = after_write("today's totals", today_report(store, &user, policy, now));
    let message = format!(
        "Updated last meal from {} to {} calories (x{}).\n{}",
        scaled.before.totals.calories,
        scaled.after.totals.calories,
        format_fraction(scaled.fraction),
        running_total_line(today.as_ref())
    );

    Ok(UpdateLastMealResponse {
        updated: true,
        scaled: Some(scaled),
        today,
        message,
    })
}

/// Undo today's most recent meal
pub fn delete_last_meal<S: NutritionStore + ?Sized>(
    store: &S,
    phone: &str,
    now: DateTime<Utc>,
) -> EngineResult<DeleteLastMealResponse> {
    let user = store.get_or_create_user(phone)?;

    match engine::delete_last_meal(store, &user, now) {
        Ok(meal) => Ok(DeleteLastMealResponse {
            deleted: true,
            message: format!("Deleted last meal ({} calories).", meal.totals.calories),
            meal: Some(meal),
        }),
        Err(EngineError::NotFound(message)) => Ok(DeleteLastMealResponse {
            deleted: false,
            meal: None,
            message,
        }),
        Err(e) => Err(e),
    }
}
