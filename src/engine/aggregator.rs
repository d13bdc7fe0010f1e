//! Macro aggregation over day / week / month windows

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::window::Window;
use super::EngineResult;
use crate::models::{round_tenth, Macros, Meal, User};
use crate::store::NutritionStore;

/// Totals for one window. Empty windows are all zeros.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowTotals {
    pub window: Window,
    pub total_calories: i64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_sugar: f64,
    /// Mean of rated meals, 0 when none are rated
    pub avg_health_rating: f64,
    pub meal_count: usize,
    pub days_elapsed: u32,
    pub days_in_window: u32,
}

/// Sum `meals` that fall inside `window`
pub fn aggregate(meals: &[Meal], window: &Window) -> WindowTotals {
    let in_window: Vec<&Meal> = meals
        .iter()
        .filter(|m| m.logged_at >= window.start && m.logged_at < window.end)
        .collect();

    let totals: Macros = in_window.iter().map(|m| m.totals).sum();

    let ratings: Vec<f64> = in_window
        .iter()
        .filter_map(|m| m.health_rating)
        .map(f64::from)
        .collect();
    let avg_health_rating = if ratings.is_empty() {
        0.0
    } else {
        round_tenth(ratings.iter().sum::<f64>() / ratings.len() as f64)
    };

    WindowTotals {
        window: window.clone(),
        total_calories: totals.calories,
        total_protein: totals.protein_g,
        total_carbs: totals.carbs_g,
        total_sugar: totals.sugar_g,
        avg_health_rating,
        meal_count: in_window.len(),
        days_elapsed: window.days_elapsed,
        days_in_window: window.days_in_window,
    }
}

fn totals_for<S: NutritionStore + ?Sized>(
    store: &S,
    user: &User,
    window: Window,
) -> EngineResult<WindowTotals> {
    let meals = store.meals_between(user.id, window.start, window.end)?;
    Ok(aggregate(&meals, &window))
}

pub fn get_user_today_macros<S: NutritionStore + ?Sized>(
    store: &S,
    user: &User,
    now: DateTime<Utc>,
) -> EngineResult<WindowTotals> {
    totals_for(store, user, Window::day(user.tz(), now))
}

pub fn get_weekly_consumption<S: NutritionStore + ?Sized>(
    store: &S,
    user: &User,
    now: DateTime<Utc>,
) -> EngineResult<WindowTotals> {
    totals_for(store, user, Window::week(user.tz(), now))
}

pub fn get_monthly_consumption<S: NutritionStore + ?Sized>(
    store: &S,
    user: &User,
    month: Option<u32>,
    year: Option<i32>,
    now: DateTime<Utc>,
) -> EngineResult<WindowTotals> {
    let window = Window::month(user.tz(), now, month, year)?;
    totals_for(store, user, window)
}

/// Today's meals in log order
pub fn get_user_meals_today<S: NutritionStore + ?Sized>(
    store: &S,
    user: &User,
    now: DateTime<Utc>,
) -> EngineResult<Vec<Meal>> {
    let window = Window::day(user.tz(), now);
    Ok(store.meals_between(user.id, window.start, window.end)?)
}
