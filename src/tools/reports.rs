//! Report tools
//!
//! Weekly and monthly consumption against the budget, and the end-of-day
//! summary data. The limit is computed once per call and shared by every
//! number in the reply.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::meals::describe_items;
use crate::engine::{
    aggregate, build_day_report, build_period_report, compute_daily_calorie_limit,
    get_monthly_consumption, get_user_meals_today, get_weekly_consumption, DayReport,
    EngineResult, LimitPolicy, PeriodReport, Window,
};
use crate::models::Meal;
use crate::store::NutritionStore;

/// Response for get_weekly_report / get_monthly_report
#[derive(Debug, Serialize)]
pub struct PeriodReportResponse {
    pub report: PeriodReport,
    pub message: String,
}

/// Response for get_daily_summary
#[derive(Debug, Serialize)]
pub struct DailySummaryResponse {
    pub first_name: Option<String>,
    pub report: DayReport,
    pub meals: Vec<Meal>,
    pub message: String,
}

pub fn get_weekly_report<S: NutritionStore + ?Sized>(
    store: &S,
    policy: &LimitPolicy,
    phone: &str,
    now: DateTime<Utc>,
) -> EngineResult<PeriodReportResponse> {
    let user = store.get_or_create_user(phone)?;
    let totals = get_weekly_consumption(store, &user, now)?;
    let limit = compute_daily_calorie_limit(store, &user, policy, now)?;

    let report = build_period_report(&totals, &limit);
    let message = report.render();
    Ok(PeriodReportResponse { report, message })
}

/// Month defaults to the current one in the user's timezone
pub fn get_monthly_report<S: NutritionStore + ?Sized>(
    store: &S,
    policy: &LimitPolicy,
    phone: &str,
    month: Option<u32>,
    year: Option<i32>,
    now: DateTime<Utc>,
) -> EngineResult<PeriodReportResponse> {
    let user = store.get_or_create_user(phone)?;
    let totals = get_monthly_consumption(store, &user, month, year, now)?;
    let limit = compute_daily_calorie_limit(store, &user, policy, now)?;

    let report = build_period_report(&totals, &limit);
    let message = report.render();
    Ok(PeriodReportResponse { report, message })
}

/// Today's meals with times in the user's timezone, for the end-of-day summary
pub fn get_daily_summary<S: NutritionStore + ?Sized>(
    store: &S,
    policy: &LimitPolicy,
    phone: &str,
    now: DateTime<Utc>,
) -> EngineResult<DailySummaryResponse> {
    let user = store.get_or_create_user(phone)?;
    let tz = user.tz();
    let meals = get_user_meals_today(store, &user, now)?;
    let limit = compute_daily_calorie_limit(store, &user, policy, now)?;
    let totals = aggregate(&meals, &Window::day(tz, now));
    let report = build_day_report(&totals, &limit);

    let message = if meals.is_empty() {
        format!("No meals logged today. Daily goal: {} cal.", report.daily_limit)
    } else {
        let mut lines = vec![
            format!("Daily goal: {} cal", report.daily_limit),
            format!("Total consumed: {} cal", report.consumed),
            format!(
                "Total protein: {}g | Total carbs: {}g | Total sugar: {}g",
                report.total_protein, report.total_carbs, report.total_sugar
            ),
            format!("Meals ({}):", meals.len()),
        ];
        for meal in &meals {
            lines.push(format!(
                "- Meal at {}: {} cal ({}) ({})",
                meal.logged_at.with_timezone(&tz).format("%H:%M"),
                meal.totals.calories,
                meal.totals.short_label(),
                describe_items(meal)
            ));
        }
        lines.join("\n")
    };

    Ok(DailySummaryResponse {
        first_name: user.first_name.clone(),
        report,
        meals,
        message,
    })
}
