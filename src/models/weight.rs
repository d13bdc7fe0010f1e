//! Weight log model

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use super::{format_timestamp, parse_timestamp};
use crate::db::{DbError, DbResult};

/// A single weigh-in
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightEntry {
    pub id: i64,
    pub user_id: i64,
    pub weight_kg: f64,
    pub recorded_at: DateTime<Utc>,
}

impl WeightEntry {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            weight_kg: row.get("weight_kg")?,
            recorded_at: parse_timestamp(row, "recorded_at")?,
        })
    }

    pub fn create(
        conn: &Connection,
        user_id: i64,
        weight_kg: f64,
        recorded_at: DateTime<Utc>,
    ) -> DbResult<Self> {
        conn.execute(
            "INSERT INTO weight_entries (user_id, weight_kg, recorded_at) VALUES (?1, ?2, ?3)",
            params![user_id, weight_kg, format_timestamp(&recorded_at)],
        )?;

        let id = conn.last_insert_rowid();
        let mut stmt = conn.prepare("SELECT * FROM weight_entries WHERE id = ?1")?;
        match stmt.query_row([id], Self::from_row) {
            Ok(entry) => Ok(entry),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(DbError::Missing(format!("weight entry {}", id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Most recent weigh-in ("current weight")
    pub fn latest(conn: &Connection, user_id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM weight_entries WHERE user_id = ?1
             ORDER BY recorded_at DESC, id DESC LIMIT 1",
        )?;

        match stmt.query_row([user_id], Self::from_row) {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
