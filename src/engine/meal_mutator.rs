//! Meal scaling and undo
//!
//! Scaling rewrites every food item and then recomputes the meal totals
//! from the rescaled items, so the totals and the items can never drift
//! apart through independent rounding.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::window::Window;
use super::{EngineError, EngineResult};
use crate::models::{FoodItem, Macros, Meal, User, MAX_MEAL_CALORIES};
use crate::store::NutritionStore;

/// A meal before and after scaling
#[derive(Debug, Clone, Serialize)]
pub struct ScaledMeal {
    pub fraction: f64,
    pub before: Meal,
    pub after: Meal,
}

/// Smallest and largest accepted scale factor
pub const MIN_FRACTION: f64 = 0.01;
pub const MAX_FRACTION: f64 = 100.0;

fn validate_fraction(fraction: f64) -> EngineResult<()> {
    if !fraction.is_finite() || !(MIN_FRACTION..=MAX_FRACTION).contains(&fraction) {
        return Err(EngineError::validation(format!(
            "fraction must be between {} and {}, got {}",
            MIN_FRACTION, MAX_FRACTION, fraction
        )));
    }
    Ok(())
}

/// `0.5` -> "0.5", `2.0` -> "2", `0.3333333` -> "0.333", `0.0001` -> "0.0001"
///
/// At least three decimals, more for small factors so that three
/// significant digits survive.
pub fn format_fraction(fraction: f64) -> String {
    let decimals = if fraction > 0.0 && fraction < 1.0 {
        let magnitude = (-fraction.log10().floor()) as usize;
        (magnitude + 2).clamp(3, 12)
    } else {
        3
    };

    let s = format!("{:.*}", decimals, fraction);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "0" && fraction > 0.0 {
        return format!("{:e}", fraction);
    }
    s.to_string()
}

/// Split "~0.5x of 1 cup" into (0.5, "1 cup")
fn parse_annotation(quantity: &str) -> Option<(f64, &str)> {
    let rest = quantity.strip_prefix('~')?;
    let (factor, original) = rest.split_once("x of ")?;
    let factor: f64 = factor.parse().ok()?;
    Some((factor, original))
}

/// Mark a quantity label as approximate after scaling. Repeated scaling
/// folds into a single factor; a factor of 1 restores the original label.
fn annotate_quantity(quantity: &str, fraction: f64) -> String {
    let (factor, original) = match parse_annotation(quantity) {
        Some((previous, original)) => (previous * fraction, original),
        None => (fraction, quantity),
    };

    if format_fraction(factor) == "1" {
        original.to_string()
    } else {
        format!("~{}x of {}", format_fraction(factor), original)
    }
}

fn scale_item(item: &FoodItem, fraction: f64) -> FoodItem {
    FoodItem {
        name: item.name.clone(),
        quantity: item
            .quantity
            .as_deref()
            .map(|q| annotate_quantity(q, fraction)),
        macros: item.macros.scale(fraction),
    }
}

/// Scale a meal by `fraction`.
///
/// Item calories round to whole kcal and macros to 0.1 g (half away from
/// zero); meal totals are the sums of the rescaled items. A fraction of 1
/// leaves every field as it was.
pub fn scale_meal(meal: &Meal, fraction: f64) -> EngineResult<Meal> {
    validate_fraction(fraction)?;

    let mut scaled = meal.clone();
    if fraction == 1.0 {
        return Ok(scaled);
    }

    if meal.items.is_empty() {
        scaled.totals = meal.totals.scale(fraction);
    } else {
        scaled.items = meal
            .items
            .iter()
            .map(|item| scale_item(item, fraction))
            .collect();
        scaled.totals = Macros::checked_sum(scaled.items.iter().map(|i| &i.macros))
            .ok_or_else(too_large)?;
    }

    if scaled.totals.calories > MAX_MEAL_CALORIES {
        return Err(too_large());
    }
    Ok(scaled)
}

fn too_large() -> EngineError {
    EngineError::validation(format!(
        "scaled meal would exceed {} calories",
        MAX_MEAL_CALORIES
    ))
}

/// Scale the user's most recent meal logged today and persist it
pub fn scale_last_meal<S: NutritionStore + ?Sized>(
    store: &S,
    user: &User,
    fraction: f64,
    now: DateTime<Utc>,
) -> EngineResult<ScaledMeal> {
    validate_fraction(fraction)?;

    let today = Window::day(user.tz(), now);
    let before = store
        .get_last_meal(user.id, today.start)?
        .ok_or_else(|| EngineError::not_found("No meals logged today to update."))?;

    let scaled = scale_meal(&before, fraction)?;
    let after = store.update_meal(&scaled)?;

    info!(
        user_id = user.id,
        meal_id = after.id,
        fraction,
        from = before.totals.calories,
        to = after.totals.calories,
        "scaled last meal"
    );

    Ok(ScaledMeal {
        fraction,
        before,
        after,
    })
}

/// Delete the user's most recent meal logged today
pub fn delete_last_meal<S: NutritionStore + ?Sized>(
    store: &S,
    user: &User,
    now: DateTime<Utc>,
) -> EngineResult<Meal> {
    let today = Window::day(user.tz(), now);
    let meal = store
        .get_last_meal(user.id, today.start)?
        .ok_or_else(|| EngineError::not_found("No meals logged today to delete."))?;

    if !store.delete_meal(meal.id)? {
        // Removed between lookup and delete (double-submitted message)
        return Err(EngineError::not_found("No meals logged today to delete."));
    }

    info!(user_id = user.id, meal_id = meal.id, "deleted last meal");
    Ok(meal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{sum_items, MealCreate};
    use crate::test_support::test_store;
    use chrono::TimeZone;

    fn item(name: &str, quantity: &str, macros: Macros) -> FoodItem {
        FoodItem {
            name: name.to_string(),
            quantity: Some(quantity.to_string()),
            macros,
        }
    }

    fn sample_meal() -> Meal {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let items = vec![
            item("grilled chicken", "150g", Macros::new(250, 40.0, 0.0, 0.0)),
            item("rice", "1 cup", Macros::new(205, 4.3, 44.5, 0.1)),
            item("ketchup", "1 tbsp", Macros::new(5, 0.1, 1.3, 1.1)),
        ];
        let totals = sum_items(&items);
        Meal {
            id: 1,
            user_id: 1,
            items,
            totals,
            health_rating: Some(7),
            image_id: Some("media-1".to_string()),
            notes: None,
            logged_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_totals_equal_item_sums_after_scale() {
        let meal = sample_meal();
        for fraction in [0.33, 0.5, 0.75, 1.5, 2.0, 0.1] {
            let scaled = scale_meal(&meal, fraction).unwrap();
            let item_calories: i64 = scaled.items.iter().map(|i| i.macros.calories).sum();
            assert_eq!(item_calories, scaled.totals.calories, "fraction {}", fraction);
            assert_eq!(sum_items(&scaled.items), scaled.totals);
        }
    }

    #[test]
    fn test_scale_by_one_is_noop() {
        let meal = sample_meal();
        assert_eq!(scale_meal(&meal, 1.0).unwrap(), meal);
    }

    #[test]
    fn test_half_scale_values() {
        let scaled = scale_meal(&sample_meal(), 0.5).unwrap();
        // 250 -> 125, 205 -> 102.5 -> 103, 5 -> 2.5 -> 3
        let calories: Vec<i64> = scaled.items.iter().map(|i| i.macros.calories).collect();
        assert_eq!(calories, vec![125, 103, 3]);
        assert_eq!(scaled.totals.calories, 231);
        assert_eq!(scaled.items[1].macros.carbs_g, 22.3);
        assert_eq!(scaled.items[0].quantity.as_deref(), Some("~0.5x of 150g"));
        assert_eq!(scaled.health_rating, Some(7));
        assert_eq!(scaled.image_id.as_deref(), Some("media-1"));
    }

    #[test]
    fn test_repeated_scale_rounds_each_step() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let items = vec![item("mint", "1", Macros::new(5, 0.0, 0.0, 0.0))];
        let meal = Meal {
            id: 1,
            user_id: 1,
            totals: sum_items(&items),
            items,
            health_rating: None,
            image_id: None,
            notes: None,
            logged_at: at,
            updated_at: at,
        };

        // 5 * 0.5 = 2.5 -> 3, then 3 * 0.5 = 1.5 -> 2
        let twice = scale_meal(&scale_meal(&meal, 0.5).unwrap(), 0.5).unwrap();
        assert_eq!(twice.totals.calories, 2);
        // 5 * 0.25 = 1.25 -> 1
        let once = scale_meal(&meal, 0.25).unwrap();
        assert_eq!(once.totals.calories, 1);
        // Labels fold to the combined factor either way
        assert_eq!(twice.items[0].quantity.as_deref(), Some("~0.25x of 1"));
        assert_eq!(once.items[0].quantity.as_deref(), Some("~0.25x of 1"));
    }

    #[test]
    fn test_annotation_restores_original_at_unit_factor() {
        assert_eq!(annotate_quantity("1 cup", 0.5), "~0.5x of 1 cup");
        assert_eq!(annotate_quantity("~0.5x of 1 cup", 2.0), "1 cup");
        assert_eq!(annotate_quantity("~0.5x of 1 cup", 0.5), "~0.25x of 1 cup");
    }

    #[test]
    fn test_itemless_meal_scales_totals() {
        let mut meal = sample_meal();
        meal.items.clear();
        meal.totals = Macros::new(500, 20.0, 60.0, 5.0);
        let scaled = scale_meal(&meal, 0.5).unwrap();
        assert_eq!(scaled.totals, Macros::new(250, 10.0, 30.0, 2.5));
    }

    #[test]
    fn test_invalid_fractions_rejected() {
        let meal = sample_meal();
        for bad in [0.0, -0.5, 0.001, 100.5, 1e17, f64::NAN, f64::INFINITY] {
            let err = scale_meal(&meal, bad).unwrap_err();
            assert!(matches!(err, EngineError::Validation(_)));
        }
    }

    #[test]
    fn test_format_fraction() {
        assert_eq!(format_fraction(0.5), "0.5");
        assert_eq!(format_fraction(2.0), "2");
        assert_eq!(format_fraction(1.0 / 3.0), "0.333");
        assert_eq!(format_fraction(0.75), "0.75");
        assert_eq!(format_fraction(0.0001), "0.0001");
        assert_eq!(format_fraction(0.00012345), "0.000123");
        assert_eq!(format_fraction(1e-15), "1e-15");
    }

    #[test]
    fn test_small_factors_keep_their_label() {
        let once = annotate_quantity("1 cup", 0.01);
        assert_eq!(once, "~0.01x of 1 cup");
        let twice = annotate_quantity(&once, 0.01);
        assert_eq!(twice, "~0.0001x of 1 cup");
        assert_eq!(parse_annotation(&twice), Some((0.0001, "1 cup")));
    }

    #[test]
    fn test_repeated_upscaling_stops_at_meal_cap() {
        let mut meal = sample_meal();
        let mut steps = 0;
        loop {
            match scale_meal(&meal, MAX_FRACTION) {
                Ok(next) => {
                    assert!(next.totals.calories <= MAX_MEAL_CALORIES);
                    meal = next;
                    steps += 1;
                }
                Err(err) => {
                    assert!(matches!(err, EngineError::Validation(_)));
                    break;
                }
            }
            assert!(steps < 10);
        }
        // 460 -> 46000, then 4.6M is refused
        assert_eq!(steps, 1);
        assert_eq!(meal.totals.calories, 46_000);
    }

    #[test]
    fn test_scale_last_meal_persists_and_targets_latest() {
        let (_dir, store) = test_store();
        let user = store.get_or_create_user("+15550200").unwrap();
        let morning = Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap();
        let noon = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let first = vec![item("oats", "1 bowl", Macros::new(300, 10.0, 50.0, 5.0))];
        let second = vec![item("burger", "1", Macros::new(800, 40.0, 60.0, 10.0))];
        store.log_meal(&MealCreate::new(user.id, first, Macros::zero(), morning)).unwrap();
        store.log_meal(&MealCreate::new(user.id, second, Macros::zero(), noon)).unwrap();

        let now = Utc.with_ymd_and_hms(2026, 10, 19, 13, 0, 0).unwrap();
        let scaled = scale_last_meal(&store, &user, 0.5, now).unwrap();
        assert_eq!(scaled.before.totals.calories, 800);
        assert_eq!(scaled.after.totals.calories, 400);

        let stored = store.get_last_meal(user.id, morning).unwrap().unwrap();
        assert_eq!(stored.totals.calories, 400);
        assert_eq!(stored.items[0].quantity.as_deref(), Some("~0.5x of 1"));
    }

    #[test]
    fn test_scale_and_delete_without_meals_today() {
        let (_dir, store) = test_store();
        let user = store.get_or_create_user("+15550201").unwrap();
        let yesterday = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        store
            .log_meal(&MealCreate::new(user.id, vec![], Macros::new(500, 0.0, 0.0, 0.0), yesterday))
            .unwrap();

        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        assert!(matches!(
            scale_last_meal(&store, &user, 0.5, now).unwrap_err(),
            EngineError::NotFound(_)
        ));
        assert!(matches!(
            delete_last_meal(&store, &user, now).unwrap_err(),
            EngineError::NotFound(_)
        ));
    }

    #[test]
    fn test_invalid_fraction_leaves_meal_untouched() {
        let (_dir, store) = test_store();
        let user = store.get_or_create_user("+15550202").unwrap();
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap();
        store
            .log_meal(&MealCreate::new(user.id, vec![], Macros::new(500, 0.0, 0.0, 0.0), at))
            .unwrap();

        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        assert!(scale_last_meal(&store, &user, -1.0, now).is_err());
        let stored = store.get_last_meal(user.id, at).unwrap().unwrap();
        assert_eq!(stored.totals.calories, 500);
    }
}
