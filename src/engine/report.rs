//! Day / week / month reports
//!
//! Reports take an already computed [`CalorieLimit`] so every number shown
//! in one reply comes from a single limit calculation.

use chrono::NaiveDate;
use serde::Serialize;

use super::aggregator::WindowTotals;
use super::calorie_limit::CalorieLimit;
use super::window::WindowKind;

/// Weight-goal progress shown under a report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalTracking {
    pub current_weight: f64,
    pub target_weight: f64,
    pub target_date: NaiveDate,
    pub days_remaining: i64,
    /// Required daily deficit (negative = surplus)
    pub daily_deficit: i64,
    /// Positive = to lose, negative = to gain
    pub kg_to_go: f64,
}

impl GoalTracking {
    fn from_limit(limit: &CalorieLimit) -> Option<Self> {
        if !limit.has_weight_goal {
            return None;
        }
        Some(Self {
            current_weight: limit.current_weight?,
            target_weight: limit.target_weight?,
            target_date: limit.target_date?,
            days_remaining: limit.days_remaining?,
            daily_deficit: limit.daily_deficit?,
            kg_to_go: limit.kg_to_go()?,
        })
    }

    fn render(&self) -> String {
        format!(
            "(Computed from weight goal: {}kg -> {}kg, {} days left)",
            self.current_weight, self.target_weight, self.days_remaining
        )
    }
}

fn floor_notice(limit: &CalorieLimit) -> Option<String> {
    limit.floor_applied.then(|| {
        format!(
            "Note: your goal pace would need {} cal/day; the limit is held at the safe minimum of {} cal. Consider a later target date.",
            limit.unclamped_limit, limit.daily_limit
        )
    })
}

fn signed(value: i64) -> String {
    if value > 0 {
        format!("+{}", value)
    } else {
        value.to_string()
    }
}

/// Today's consumption against the daily limit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayReport {
    pub date: NaiveDate,
    pub daily_limit: i64,
    pub consumed: i64,
    /// `daily_limit - consumed`; negative when over
    pub remaining: i64,
    /// `consumed - daily_limit`; positive when over
    pub deviation: i64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_sugar: f64,
    pub avg_health_rating: f64,
    pub meal_count: usize,
    pub floor_applied: bool,
    pub goal: Option<GoalTracking>,
    #[serde(skip)]
    floor_notice: Option<String>,
}

pub fn build_day_report(totals: &WindowTotals, limit: &CalorieLimit) -> DayReport {
    DayReport {
        date: totals.window.first_day,
        daily_limit: limit.daily_limit,
        consumed: totals.total_calories,
        remaining: limit.daily_limit.saturating_sub(totals.total_calories),
        deviation: totals.total_calories.saturating_sub(limit.daily_limit),
        total_protein: totals.total_protein,
        total_carbs: totals.total_carbs,
        total_sugar: totals.total_sugar,
        avg_health_rating: totals.avg_health_rating,
        meal_count: totals.meal_count,
        floor_applied: limit.floor_applied,
        goal: GoalTracking::from_limit(limit),
        floor_notice: floor_notice(limit),
    }
}

impl DayReport {
    /// One-line "x/goal (Remaining: y)" summary used after logging
    pub fn running_total(&self) -> String {
        format!(
            "Daily totals: {}/{} cal (Remaining: {})",
            self.consumed, self.daily_limit, self.remaining
        )
    }

    pub fn macro_line(&self) -> String {
        format!(
            "Protein: {}g | Carbs: {}g | Sugar: {}g",
            self.total_protein, self.total_carbs, self.total_sugar
        )
    }

    pub fn render(&self) -> String {
        let mut lines = vec![
            format!(
                "Today so far: {} calories consumed out of {} goal.",
                self.consumed, self.daily_limit
            ),
            format!("Remaining: {} calories.", self.remaining),
            self.macro_line(),
        ];
        if self.avg_health_rating > 0.0 {
            lines.push(format!("Avg health rating today: {}/10", self.avg_health_rating));
        }
        if let Some(goal) = &self.goal {
            lines.push(goal.render());
        }
        if let Some(notice) = &self.floor_notice {
            lines.push(notice.clone());
        }
        lines.join("\n")
    }
}

/// Week or month consumption against the budget
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodReport {
    pub kind: WindowKind,
    pub label: String,
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    pub days_elapsed: u32,
    pub days_in_window: u32,
    pub daily_limit: i64,
    pub consumed: i64,
    /// `daily_limit * days_in_window`
    pub budget: i64,
    /// `daily_limit * days_elapsed`
    pub budget_to_date: i64,
    /// `consumed - budget_to_date`; positive when over
    pub deviation: i64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_sugar: f64,
    pub avg_health_rating: f64,
    pub meal_count: usize,
    pub floor_applied: bool,
    pub goal: Option<GoalTracking>,
    #[serde(skip)]
    floor_notice: Option<String>,
}

pub fn build_period_report(totals: &WindowTotals, limit: &CalorieLimit) -> PeriodReport {
    let budget_to_date = limit.daily_limit.saturating_mul(totals.days_elapsed as i64);
    PeriodReport {
        kind: totals.window.kind,
        label: totals.window.label(),
        first_day: totals.window.first_day,
        last_day: totals.window.last_day,
        days_elapsed: totals.days_elapsed,
        days_in_window: totals.days_in_window,
        daily_limit: limit.daily_limit,
        consumed: totals.total_calories,
        budget: limit.daily_limit.saturating_mul(totals.days_in_window as i64),
        budget_to_date,
        deviation: totals.total_calories.saturating_sub(budget_to_date),
        total_protein: totals.total_protein,
        total_carbs: totals.total_carbs,
        total_sugar: totals.total_sugar,
        avg_health_rating: totals.avg_health_rating,
        meal_count: totals.meal_count,
        floor_applied: limit.floor_applied,
        goal: GoalTracking::from_limit(limit),
        floor_notice: floor_notice(limit),
    }
}

impl PeriodReport {
    pub fn render(&self) -> String {
        let title = match self.kind {
            WindowKind::Month => format!("Monthly Report ({}):", self.label),
            WindowKind::Week => format!("Weekly Report ({}):", self.label),
            WindowKind::Day => format!("Daily Report ({}):", self.label),
        };

        let mut lines = vec![
            title,
            format!("Days tracked: {}/{}", self.days_elapsed, self.days_in_window),
            format!("Total calories: {}", self.consumed),
            format!(
                "Budget: {} cal ({}/day x {} days)",
                self.budget, self.daily_limit, self.days_in_window
            ),
            format!("Deviation so far: {} cal", signed(self.deviation)),
        ];

        if self.meal_count == 0 {
            lines.push("No meals logged in this period yet.".to_string());
        } else {
            lines.push(format!("Avg health rating: {}/10", self.avg_health_rating));
            lines.push(format!(
                "Protein: {}g | Carbs: {}g | Sugar: {}g",
                self.total_protein, self.total_carbs, self.total_sugar
            ));
            lines.push(format!("Meals logged: {}", self.meal_count));
        }

        if let Some(goal) = &self.goal {
            lines.push(format!(
                "Weight goal: {}kg -> {}kg by {} ({} days left, {} cal/day {})",
                goal.current_weight,
                goal.target_weight,
                goal.target_date,
                goal.days_remaining,
                goal.daily_deficit.abs(),
                if goal.daily_deficit >= 0 { "deficit" } else { "surplus" }
            ));
        }
        if let Some(notice) = &self.floor_notice {
            lines.push(notice.clone());
        }
        lines.join("\n")
    }
}
