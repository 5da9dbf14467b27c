//! SQLite row conversion functions.
//!
//! Pure functions for converting between SQLite values and domain types.
//! These are testable in isolation without database access.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::de::DeserializeOwned;
use serde::Serialize;

use folio_core::content::EntityId;
use folio_core::storage::{RepositoryError, Result};

/// Convert a `SELECT body` row to an entity.
pub fn row_to_entity<E: DeserializeOwned>(row: &Row) -> rusqlite::Result<E> {
    let body: String = row.get(0)?;
    parse_body(&body)
}

/// Parse a JSON document column.
fn parse_body<E: DeserializeOwned>(body: &str) -> rusqlite::Result<E> {
    serde_json::from_str(body).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Serialize an entity for the `body` column.
pub fn entity_to_body<E: Serialize>(entity: &E) -> Result<String> {
    serde_json::to_string(entity).map_err(|e| RepositoryError::InvalidData(e.to_string()))
}

/// Convert an entity ID to an SQLite integer.
pub fn sql_id(id: EntityId) -> Result<i64> {
    i64::try_from(id).map_err(|_| RepositoryError::InvalidData(format!("ID out of range: {id}")))
}

/// Convert an SQLite integer back to an entity ID.
pub fn entity_id(value: i64) -> rusqlite::Result<EntityId> {
    EntityId::try_from(value).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, value))
}

/// Convert a page request to `(LIMIT, OFFSET)`.
pub fn limit_offset(per_page: u64, page: u64) -> (i64, i64) {
    let per_page = per_page.max(1);
    let offset = (page.max(1) - 1).saturating_mul(per_page);
    (
        i64::try_from(per_page).unwrap_or(i64::MAX),
        i64::try_from(offset).unwrap_or(i64::MAX),
    )
}

/// Format a DateTime for SQLite storage (RFC 3339).
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}
