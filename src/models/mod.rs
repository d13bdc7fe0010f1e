//! Data models
//!
//! Rust structs representing database entities.

mod meal;
mod nutrition;
mod user;
mod weight;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;

pub use meal::{sum_items, FoodItem, Meal, MealCreate};
pub use nutrition::{round_tenth, Macros, MAX_ITEM_CALORIES, MAX_MEAL_CALORIES};
pub use user::{User, UserProfileUpdate, WeightGoal};
pub use weight::WeightEntry;

/// Storage format for calendar dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Fixed-width RFC 3339 UTC text, so SQL string comparison orders by time
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(row: &Row, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| column_error(row, column, e))
}

/// Wrap a parse failure of a text column as a rusqlite conversion error
pub(crate) fn column_error<E>(row: &Row, column: &str, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    let index = row.as_ref().column_index(column).unwrap_or(0);
    rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_format_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let b = a + chrono::Duration::microseconds(1);
        let (fa, fb) = (format_timestamp(&a), format_timestamp(&b));
        assert_eq!(fa, "2026-01-02T03:04:05.000000Z");
        assert_eq!(fa.len(), fb.len());
        assert!(fa < fb);
    }
}
