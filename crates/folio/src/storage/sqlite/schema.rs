//! SQLite schema definitions and SQL query constants.
//!
//! This module contains all SQL statements used by the SQLite repository,
//! following the Functional Core pattern - pure data, no I/O.

/// SQL statement to create all tables.
pub const CREATE_TABLES: &str = r#"
-- One JSON document per entity row
CREATE TABLE IF NOT EXISTS records (
    entity TEXT NOT NULL,
    id INTEGER NOT NULL,
    body TEXT NOT NULL,
    deleted_at TEXT,
    PRIMARY KEY (entity, id)
);

-- Last assigned id per entity type
CREATE TABLE IF NOT EXISTS sequences (
    entity TEXT PRIMARY KEY,
    last_id INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_live ON records(entity, deleted_at);
"#;

pub const NEXT_ID: &str = r#"
INSERT INTO sequences (entity, last_id)
VALUES (?1, 1)
ON CONFLICT (entity) DO UPDATE SET last_id = last_id + 1
RETURNING last_id
"#;

pub const INSERT_RECORD: &str = r#"
INSERT INTO records (entity, id, body)
VALUES (?1, ?2, ?3)
"#;

pub const SELECT_LIVE_BY_ID: &str = r#"
SELECT body
FROM records
WHERE entity = ?1 AND id = ?2 AND deleted_at IS NULL
"#;

pub const SELECT_LIVE_PAGE: &str = r#"
SELECT body
FROM records
WHERE entity = ?1 AND deleted_at IS NULL
ORDER BY id ASC
LIMIT ?2 OFFSET ?3
"#;

pub const COUNT_LIVE: &str = r#"
SELECT COUNT(*)
FROM records
WHERE entity = ?1 AND deleted_at IS NULL
"#;

pub const UPDATE_BODY: &str = r#"
UPDATE records
SET body = ?3
WHERE entity = ?1 AND id = ?2 AND deleted_at IS NULL
"#;

pub const SOFT_DELETE: &str = r#"
UPDATE records
SET deleted_at = ?3
WHERE entity = ?1 AND id = ?2 AND deleted_at IS NULL
"#;

pub const DELETE_LIVE: &str = r#"
DELETE FROM records
WHERE entity = ?1 AND id = ?2 AND deleted_at IS NULL
"#;

pub const RESTORE: &str = r#"
UPDATE records
SET deleted_at = NULL
WHERE entity = ?1 AND id = ?2 AND deleted_at IS NOT NULL
"#;

pub const FORCE_DELETE: &str = r#"
DELETE FROM records
WHERE entity = ?1 AND id = ?2
"#;

// Post queries
pub const SELECT_PUBLISHED_PAGE: &str = r#"
SELECT body
FROM records
WHERE entity = ?1 AND deleted_at IS NULL AND json_extract(body, '$.status') = 'published'
ORDER BY json_extract(body, '$.published_at') DESC, id DESC
LIMIT ?2 OFFSET ?3
"#;

pub const COUNT_PUBLISHED: &str = r#"
SELECT COUNT(*)
FROM records
WHERE entity = ?1 AND deleted_at IS NULL AND json_extract(body, '$.status') = 'published'
"#;
