//! Meal model
//!
//! A logged meal: an ordered list of food items plus cached totals.
//! The totals are kept equal to the sum of the items on every write.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{column_error, format_timestamp, parse_timestamp, Macros};
use crate::db::{DbError, DbResult};

/// One line of a meal, as estimated by the assistant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodItem {
    pub name: String,
    /// Free-text portion label ("150g", "2 large", "~0.5x of 1 cup")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(flatten)]
    pub macros: Macros,
}

/// A logged meal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Meal {
    pub id: i64,
    pub user_id: i64,
    pub items: Vec<FoodItem>,
    pub totals: Macros,
    pub health_rating: Option<u8>,
    pub image_id: Option<String>,
    pub notes: Option<String>,
    pub logged_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data for logging a meal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealCreate {
    pub user_id: i64,
    pub items: Vec<FoodItem>,
    pub totals: Macros,
    pub health_rating: Option<u8>,
    pub image_id: Option<String>,
    pub notes: Option<String>,
    pub logged_at: DateTime<Utc>,
}

impl MealCreate {
    /// Build a meal, deriving totals from the items when there are any.
    /// Supplied totals that disagree with the items are replaced.
    pub fn new(
        user_id: i64,
        items: Vec<FoodItem>,
        supplied_totals: Macros,
        logged_at: DateTime<Utc>,
    ) -> Self {
        let totals = if items.is_empty() {
            supplied_totals.rounded()
        } else {
            let summed = sum_items(&items);
            if summed != supplied_totals.rounded() {
                warn!(
                    user_id,
                    supplied = supplied_totals.calories,
                    summed = summed.calories,
                    "meal totals disagree with food items; using item sums"
                );
            }
            summed
        };

        Self {
            user_id,
            items,
            totals,
            health_rating: None,
            image_id: None,
            notes: None,
            logged_at,
        }
    }

    pub fn with_health_rating(mut self, rating: Option<u8>) -> Self {
        self.health_rating = rating;
        self
    }

    pub fn with_image(mut self, image_id: Option<String>) -> Self {
        self.image_id = image_id;
        self
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes.filter(|n| !n.trim().is_empty());
        self
    }
}

/// Sum of item macros
pub fn sum_items(items: &[FoodItem]) -> Macros {
    items.iter().map(|item| item.macros).sum()
}

impl Meal {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let items_json: String = row.get("food_items")?;
        let items: Vec<FoodItem> =
            serde_json::from_str(&items_json).map_err(|e| column_error(row, "food_items", e))?;

        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            items,
            totals: Macros {
                calories: row.get("total_calories")?,
                protein_g: row.get("protein_g")?,
                carbs_g: row.get("carbs_g")?,
                sugar_g: row.get("sugar_g")?,
            },
            health_rating: row.get("health_rating")?,
            image_id: row.get("image_id")?,
            notes: row.get("notes")?,
            logged_at: parse_timestamp(row, "logged_at")?,
            updated_at: parse_timestamp(row, "updated_at")?,
        })
    }

    /// Comma-separated item names, e.g. "grilled chicken, rice"
    pub fn item_names(&self) -> String {
        if self.items.is_empty() {
            return self.notes.clone().unwrap_or_else(|| "meal".to_string());
        }
        self.items
            .iter()
            .map(|item| item.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn create(conn: &Connection, data: &MealCreate) -> DbResult<Self> {
        let items_json = serde_json::to_string(&data.items)?;
        let logged_at = format_timestamp(&data.logged_at);

        conn.execute(
            r#"
            INSERT INTO meals (
                user_id, food_items, total_calories, protein_g, carbs_g, sugar_g,
                health_rating, image_id, notes, logged_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            "#,
            params![
                data.user_id,
                items_json,
                data.totals.calories,
                data.totals.protein_g,
                data.totals.carbs_g,
                data.totals.sugar_g,
                data.health_rating,
                data.image_id,
                data.notes,
                logged_at,
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!(meal_id = id, user_id = data.user_id, "inserted meal");

        Self::get_by_id(conn, id)?.ok_or_else(|| DbError::Missing(format!("meal {}", id)))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM meals WHERE id = ?1")?;

        match stmt.query_row([id], Self::from_row) {
            Ok(meal) => Ok(Some(meal)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Meals with `start <= logged_at < end`, oldest first
    pub fn list_between(
        conn: &Connection,
        user_id: i64,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
    ) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM meals
            WHERE user_id = ?1 AND logged_at >= ?2 AND logged_at < ?3
            ORDER BY logged_at ASC, id ASC
            "#,
        )?;

        let meals = stmt
            .query_map(
                params![user_id, format_timestamp(start), format_timestamp(end)],
                Self::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(meals)
    }

    /// Most recent meal logged at or after `since`
    pub fn last_since(
        conn: &Connection,
        user_id: i64,
        since: &DateTime<Utc>,
    ) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM meals
            WHERE user_id = ?1 AND logged_at >= ?2
            ORDER BY logged_at DESC, id DESC
            LIMIT 1
            "#,
        )?;

        match stmt.query_row(params![user_id, format_timestamp(since)], Self::from_row) {
            Ok(meal) => Ok(Some(meal)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist items, totals and rating of an existing meal
    pub fn update(conn: &Connection, meal: &Meal, updated_at: DateTime<Utc>) -> DbResult<Self> {
        let items_json = serde_json::to_string(&meal.items)?;

        let changed = conn.execute(
            r#"
            UPDATE meals SET
                food_items = ?1,
                total_calories = ?2,
                protein_g = ?3,
                carbs_g = ?4,
                sugar_g = ?5,
                health_rating = ?6,
                updated_at = ?7
            WHERE id = ?8
            "#,
            params![
                items_json,
                meal.totals.calories,
                meal.totals.protein_g,
                meal.totals.carbs_g,
                meal.totals.sugar_g,
                meal.health_rating,
                format_timestamp(&updated_at),
                meal.id,
            ],
        )?;

        if changed == 0 {
            return Err(DbError::Missing(format!("meal {}", meal.id)));
        }

        Self::get_by_id(conn, meal.id)?
            .ok_or_else(|| DbError::Missing(format!("meal {}", meal.id)))
    }

    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let deleted = conn.execute("DELETE FROM meals WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }
}
