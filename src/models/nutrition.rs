//! Shared macro-nutrient structure
//!
//! Used by food items, meals, and window totals.

use serde::{Deserialize, Deserializer, Serialize};

/// Round to one decimal place (grams are tracked to 0.1 g)
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Largest calorie value accepted for a single food item
pub const MAX_ITEM_CALORIES: i64 = 20_000;

/// Largest calorie total accepted for a single meal, logged or scaled
pub const MAX_MEAL_CALORIES: i64 = 100_000;

/// Calories and tracked macros
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Macros {
    #[serde(deserialize_with = "deserialize_kcal")]
    pub calories: i64,
    #[serde(default)]
    pub protein_g: f64,
    #[serde(default)]
    pub carbs_g: f64,
    #[serde(default)]
    pub sugar_g: f64,
}

impl Macros {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn new(calories: i64, protein_g: f64, carbs_g: f64, sugar_g: f64) -> Self {
        Self {
            calories,
            protein_g,
            carbs_g,
            sugar_g,
        }
    }

    /// Multiply by `fraction`; calories round to whole kcal, macros to 0.1 g.
    /// Rounding is half away from zero.
    pub fn scale(&self, fraction: f64) -> Self {
        Self {
            calories: (self.calories as f64 * fraction).round() as i64,
            protein_g: round_tenth(self.protein_g * fraction),
            carbs_g: round_tenth(self.carbs_g * fraction),
            sugar_g: round_tenth(self.sugar_g * fraction),
        }
    }

    /// Clamp float noise from repeated addition back to 0.1 g
    pub fn rounded(&self) -> Self {
        Self {
            calories: self.calories,
            protein_g: round_tenth(self.protein_g),
            carbs_g: round_tenth(self.carbs_g),
            sugar_g: round_tenth(self.sugar_g),
        }
    }

    /// `None` if the calorie sum overflows
    pub fn checked_add(&self, other: &Macros) -> Option<Self> {
        Some(Self {
            calories: self.calories.checked_add(other.calories)?,
            protein_g: self.protein_g + other.protein_g,
            carbs_g: self.carbs_g + other.carbs_g,
            sugar_g: self.sugar_g + other.sugar_g,
        })
    }

    /// Rounded sum of `parts`, or `None` if the calories overflow
    pub fn checked_sum<'a, I>(parts: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Macros>,
    {
        parts
            .into_iter()
            .try_fold(Macros::zero(), |acc, m| acc.checked_add(m))
            .map(|total| total.rounded())
    }

    /// Calories saturate instead of overflowing
    pub fn add(&self, other: &Macros) -> Self {
        Self {
            calories: self.calories.saturating_add(other.calories),
            protein_g: self.protein_g + other.protein_g,
            carbs_g: self.carbs_g + other.carbs_g,
            sugar_g: self.sugar_g + other.sugar_g,
        }
    }

    /// `P:12g C:30g S:4.5g`
    pub fn short_label(&self) -> String {
        format!(
            "P:{}g C:{}g S:{}g",
            self.protein_g, self.carbs_g, self.sugar_g
        )
    }
}

impl std::ops::Add for Macros {
    type Output = Macros;

    fn add(self, other: Macros) -> Macros {
        Macros::add(&self, &other)
    }
}

impl std::iter::Sum for Macros {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Macros::zero(), |acc, m| acc + m).rounded()
    }
}

/// Accept `140`, `140.0` or `139.6` for a kcal field; stored as whole kcal
pub(crate) fn deserialize_kcal<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() {
        return Err(serde::de::Error::custom("calories must be a finite number"));
    }
    Ok(value.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_tenth() {
        assert_eq!(round_tenth(12.34), 12.3);
        assert_eq!(round_tenth(12.35), 12.4);
        assert_eq!(round_tenth(0.0), 0.0);
    }

    #[test]
    fn test_scale_rounds_calories_and_macros() {
        let m = Macros::new(250, 40.0, 3.3, 0.5);
        let half = m.scale(0.5);
        assert_eq!(half.calories, 125);
        assert_eq!(half.protein_g, 20.0);
        assert_eq!(half.carbs_g, 1.7);
        assert_eq!(half.sugar_g, 0.3);
    }

    #[test]
    fn test_sum_is_rounded() {
        let parts = vec![
            Macros::new(100, 0.1, 0.2, 0.0),
            Macros::new(50, 0.2, 0.1, 0.0),
        ];
        let total: Macros = parts.into_iter().sum();
        assert_eq!(total.calories, 150);
        assert_eq!(total.protein_g, 0.3);
        assert_eq!(total.carbs_g, 0.3);
    }

    #[test]
    fn test_checked_sum_reports_overflow() {
        let huge = Macros::new(i64::MAX, 0.0, 0.0, 0.0);
        assert!(Macros::checked_sum(&[huge, huge]).is_none());

        let parts = [Macros::new(100, 0.1, 0.0, 0.0), Macros::new(50, 0.2, 0.0, 0.0)];
        let total = Macros::checked_sum(&parts).unwrap();
        assert_eq!(total.calories, 150);
        assert_eq!(total.protein_g, 0.3);

        // the operator form never panics
        assert_eq!((huge + huge).calories, i64::MAX);
    }

    #[test]
    fn test_deserialize_fractional_calories() {
        let m: Macros = serde_json::from_str(r#"{"calories": 139.6, "protein_g": 12}"#).unwrap();
        assert_eq!(m.calories, 140);
        assert_eq!(m.protein_g, 12.0);
        assert_eq!(m.sugar_g, 0.0);
    }
}
