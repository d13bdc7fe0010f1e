//! Database migrations
//!
//! Schema creation and versioning.

use rusqlite::Connection;
use tracing::info;

use super::connection::DbResult;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Bring the database up to `SCHEMA_VERSION`
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        info!("applied schema migration v1");
    }

    Ok(())
}

/// Migration v1: users, weight log, meals
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- USERS
        -- One row per chat contact, keyed by phone
        -- ============================================
        CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            phone TEXT NOT NULL UNIQUE,
            first_name TEXT,
            daily_goal INTEGER,                  -- static kcal goal, NULL = default
            timezone TEXT NOT NULL DEFAULT 'UTC', -- IANA name
            dietary_preferences TEXT,

            -- Weight goal (all NULL when no goal is set)
            target_weight REAL,                  -- kg
            target_date TEXT,                    -- ISO date: "2026-12-31"
            tdee INTEGER,                        -- kcal/day

            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- ============================================
        -- WEIGHT ENTRIES
        -- Append-only; latest row is the current weight
        -- ============================================
        CREATE TABLE weight_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            weight_kg REAL NOT NULL CHECK(weight_kg > 0),
            recorded_at TEXT NOT NULL            -- RFC 3339 UTC
        );

        CREATE INDEX idx_weight_entries_user ON weight_entries(user_id, recorded_at);

        -- ============================================
        -- MEALS
        -- Logged meals; totals always equal the sum of food_items
        -- ============================================
        CREATE TABLE meals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            food_items TEXT NOT NULL DEFAULT '[]', -- JSON array

            total_calories INTEGER NOT NULL DEFAULT 0,
            protein_g REAL NOT NULL DEFAULT 0,
            carbs_g REAL NOT NULL DEFAULT 0,
            sugar_g REAL NOT NULL DEFAULT 0,

            health_rating INTEGER CHECK(health_rating IS NULL OR health_rating BETWEEN 1 AND 10),
            image_id TEXT,                       -- chat platform media id
            notes TEXT,
            logged_at TEXT NOT NULL,             -- RFC 3339 UTC
            updated_at TEXT NOT NULL
        );

        CREATE INDEX idx_meals_user_logged ON meals(user_id, logged_at);
        "#,
    )?;

    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('users', 'weight_entries', 'meals')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }
}
