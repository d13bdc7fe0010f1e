//! User model
//!
//! One row per chat contact. Holds the static calorie goal, timezone,
//! dietary preferences and the optional weight goal.

use chrono::NaiveDate;
use chrono_tz::Tz;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{column_error, DATE_FORMAT};
use crate::db::{DbError, DbResult};

/// A chat user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub phone: String,
    pub first_name: Option<String>,
    /// Static daily goal in kcal; `None` means the configured default
    pub daily_goal: Option<i64>,
    /// IANA timezone name
    pub timezone: String,
    pub dietary_preferences: Option<String>,
    pub target_weight: Option<f64>,
    pub target_date: Option<NaiveDate>,
    pub tdee: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Partial profile update; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfileUpdate {
    pub first_name: Option<String>,
    pub dietary_preferences: Option<String>,
    pub timezone: Option<String>,
}

impl UserProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.dietary_preferences.is_none() && self.timezone.is_none()
    }
}

/// Weight goal as stored on the user row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightGoal {
    pub target_weight: f64,
    pub target_date: NaiveDate,
    pub tdee: Option<i64>,
}

impl User {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let target_date: Option<String> = row.get("target_date")?;
        let target_date = match target_date {
            Some(s) => Some(
                NaiveDate::parse_from_str(&s, DATE_FORMAT)
                    .map_err(|e| column_error(row, "target_date", e))?,
            ),
            None => None,
        };

        Ok(Self {
            id: row.get("id")?,
            phone: row.get("phone")?,
            first_name: row.get("first_name")?,
            daily_goal: row.get("daily_goal")?,
            timezone: row.get("timezone")?,
            dietary_preferences: row.get("dietary_preferences")?,
            target_weight: row.get("target_weight")?,
            target_date,
            tdee: row.get("tdee")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Parsed timezone. Values are validated on write, so an unknown name
    /// only appears in hand-edited rows and falls back to UTC.
    pub fn tz(&self) -> Tz {
        self.timezone.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                user_id = self.id,
                timezone = %self.timezone,
                "unknown stored timezone; using UTC"
            );
            Tz::UTC
        })
    }

    /// The weight goal, if both target weight and date are set
    pub fn weight_goal(&self) -> Option<WeightGoal> {
        match (self.target_weight, self.target_date) {
            (Some(target_weight), Some(target_date)) => Some(WeightGoal {
                target_weight,
                target_date,
                tdee: self.tdee,
            }),
            _ => None,
        }
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM users WHERE id = ?1")?;

        match stmt.query_row([id], Self::from_row) {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_by_phone(conn: &Connection, phone: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM users WHERE phone = ?1")?;

        match stmt.query_row([phone], Self::from_row) {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch the user for `phone`, creating it on first contact
    pub fn get_or_create(conn: &Connection, phone: &str) -> DbResult<Self> {
        if let Some(user) = Self::get_by_phone(conn, phone)? {
            return Ok(user);
        }

        conn.execute(
            "INSERT INTO users (phone) VALUES (?1) ON CONFLICT(phone) DO NOTHING",
            [phone],
        )?;
        info!(phone, "created user on first contact");

        Self::get_by_phone(conn, phone)?
            .ok_or_else(|| DbError::Missing(format!("user with phone {}", phone)))
    }

    /// Set the static daily calorie goal
    pub fn update_goal(conn: &Connection, phone: &str, calories: i64) -> DbResult<Self> {
        let user = Self::get_or_create(conn, phone)?;
        conn.execute(
            "UPDATE users SET daily_goal = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![calories, user.id],
        )?;
        debug!(user_id = user.id, calories, "updated daily goal");

        Self::get_by_id(conn, user.id)?
            .ok_or_else(|| DbError::Missing(format!("user {}", user.id)))
    }

    pub fn update_profile(conn: &Connection, id: i64, data: &UserProfileUpdate) -> DbResult<Self> {
        let existing = Self::get_by_id(conn, id)?
            .ok_or_else(|| DbError::Missing(format!("user {}", id)))?;

        let first_name = data.first_name.clone().or(existing.first_name);
        let dietary_preferences = data
            .dietary_preferences
            .clone()
            .or(existing.dietary_preferences);
        let timezone = data.timezone.clone().unwrap_or(existing.timezone);

        conn.execute(
            r#"
            UPDATE users SET
                first_name = ?1,
                dietary_preferences = ?2,
                timezone = ?3,
                updated_at = datetime('now')
            WHERE id = ?4
            "#,
            params![first_name, dietary_preferences, timezone, id],
        )?;

        Self::get_by_id(conn, id)?.ok_or_else(|| DbError::Missing(format!("user {}", id)))
    }

    pub fn set_weight_goal(conn: &Connection, id: i64, goal: &WeightGoal) -> DbResult<Self> {
        let changed = conn.execute(
            r#"
            UPDATE users SET
                target_weight = ?1,
                target_date = ?2,
                tdee = ?3,
                updated_at = datetime('now')
            WHERE id = ?4
            "#,
            params![
                goal.target_weight,
                goal.target_date.format(DATE_FORMAT).to_string(),
                goal.tdee,
                id,
            ],
        )?;

        if changed == 0 {
            return Err(DbError::Missing(format!("user {}", id)));
        }

        Self::get_by_id(conn, id)?.ok_or_else(|| DbError::Missing(format!("user {}", id)))
    }
}
