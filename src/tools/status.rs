//! Service status and assistant instructions

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::db::migrations::get_schema_version;
use crate::db::Database;

/// Meal logging instructions for the assistant
pub const MEAL_INSTRUCTIONS: &str = r#"
# HealthEnforcer Meal Logging

Every tool takes the user's `phone_number`. Users are created on first contact.

## Logging food

- Food photo: analyze it, then call `save_meal` with the message's `media_id`.
- Food described in text ("2 eggs and toast"): estimate the items, then call
  `save_text_meal` with a health rating from 1 to 10.

`food_items_json` is a JSON array, one object per item:

```json
[{"name": "egg", "quantity": "2 large", "calories": 140, "protein_g": 12, "carbs_g": 1, "sugar_g": 0.4}]
```

Meal totals are always recomputed from the items. Send totals only for a meal
without an item breakdown.

## Corrections

- "I only had half" -> `update_last_meal` with `fraction` 0.5 (0.75 for three
  quarters, 0.33 for a third). Fractions above 1 are allowed ("I had seconds"),
  from 0.01 up to 100.
- "Remove that" -> `delete_last_meal`.

Both act on the most recent meal logged today in the user's timezone.

## Goals

- `set_daily_goal` sets a fixed calorie target.
- `set_weight_goal` (target kg, target date YYYY-MM-DD, optional current weight
  and TDEE) replaces the fixed target with a projected limit. Projected limits
  never drop below the safe minimum; when they would, the reply says so. Pass
  that note on to the user.
- `record_weight` logs a weigh-in and updates the projection.

## Reports

- `get_calorie_status`: today against the limit.
- `get_meals_today`: numbered list of today's meals.
- `get_weekly_report` / `get_monthly_report`: totals and deviation from budget.
- `get_daily_summary`: data for the end-of-day summary message.

Keep replies short. This is a chat, not an essay.
"#;

/// Runtime status of the service
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    pub database_path: String,
    pub database_size_bytes: Option<u64>,
    pub schema_version: Option<i32>,

    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Collects runtime information for the status tool
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
        }
    }

    pub fn get_status(&self, db: &Database) -> ServiceStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());
        let schema_version = db.with_conn(get_schema_version).ok();

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        ServiceStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            schema_version,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::SCHEMA_VERSION;
    use crate::test_support::test_store;

    #[test]
    fn test_status_reports_schema_and_file() {
        let (dir, store) = test_store();
        let tracker = StatusTracker::new(dir.path().join("healthenforcer-test.db"));
        let status = tracker.get_status(store.database());
        assert_eq!(status.schema_version, Some(SCHEMA_VERSION));
        assert!(status.database_size_bytes.is_some());
        assert_eq!(status.process_id, std::process::id());
    }

    #[test]
    fn test_instructions_name_the_tools() {
        for tool in ["save_meal", "save_text_meal", "update_last_meal", "set_weight_goal"] {
            assert!(MEAL_INSTRUCTIONS.contains(tool));
        }
    }
}
