//! Embedded schema migrations for the record store.
//!
//! Migrations are forward-only and tracked with `PRAGMA user_version`.
//! Each one runs in its own transaction together with the version bump.
//!
//! # Tables
//!
//! | Table | Back-reference | Notes |
//! |-------|----------------|-------|
//! | `identities` | – | every node identity, for O(1) collision checks |
//! | `folders` | `parent_id` → `folders` | |
//! | `recipes` | `folder_id` → `folders` | holds the derived `search_text` |
//! | `about_sections` | `recipe_id` → `recipes` | |
//! | `ingredient_sections` | `recipe_id` → `recipes` | |
//! | `ingredients` | `section_id` → `ingredient_sections` | |
//! | `step_sections` | `recipe_id` → `recipes` | |
//! | `steps` | `section_id` → `step_sections` | |
//! | `images` | `owner_kind` + `owner_id` | polymorphic owner, no FK |
//! | `image_blobs` | `image_id` → `images` | bytes, skipped by listing and search reads |
//!
//! Back-reference columns are nullable: a freshly inserted subtree is
//! detached until the relink pass fills them in.

use crate::{Error, Result};
use rusqlite::Connection;

use super::connection::with_transaction;

/// A single migration with version and SQL.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Migration version (sequential, starting at 1).
    pub version: i32,
    /// Human-readable description.
    pub description: &'static str,
    /// SQL to apply (may contain multiple statements).
    pub sql: &'static str,
}

/// All migrations, in order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Folder/recipe graph with identity index",
        sql: r"
            CREATE TABLE identities (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL
            );

            CREATE TABLE folders (
                id TEXT PRIMARY KEY,
                parent_id TEXT REFERENCES folders(id),
                position INTEGER NOT NULL DEFAULT 0,
                name TEXT,
                kind TEXT,
                created_at INTEGER,
                edited_at INTEGER
            );
            CREATE INDEX idx_folders_parent ON folders(parent_id);

            CREATE TABLE recipes (
                id TEXT PRIMARY KEY,
                folder_id TEXT REFERENCES folders(id),
                position INTEGER NOT NULL DEFAULT 0,
                name TEXT,
                search_text TEXT NOT NULL DEFAULT '',
                created_at INTEGER,
                edited_at INTEGER
            );
            CREATE INDEX idx_recipes_folder ON recipes(folder_id);

            CREATE TABLE about_sections (
                id TEXT PRIMARY KEY,
                recipe_id TEXT REFERENCES recipes(id),
                position INTEGER NOT NULL DEFAULT 0,
                name TEXT,
                description TEXT
            );
            CREATE INDEX idx_about_sections_recipe ON about_sections(recipe_id);

            CREATE TABLE ingredient_sections (
                id TEXT PRIMARY KEY,
                recipe_id TEXT REFERENCES recipes(id),
                position INTEGER NOT NULL DEFAULT 0,
                name TEXT
            );
            CREATE INDEX idx_ingredient_sections_recipe ON ingredient_sections(recipe_id);

            CREATE TABLE ingredients (
                id TEXT PRIMARY KEY,
                section_id TEXT REFERENCES ingredient_sections(id),
                position INTEGER NOT NULL DEFAULT 0,
                name TEXT,
                amount REAL,
                unit TEXT
            );
            CREATE INDEX idx_ingredients_section ON ingredients(section_id);

            CREATE TABLE step_sections (
                id TEXT PRIMARY KEY,
                recipe_id TEXT REFERENCES recipes(id),
                position INTEGER NOT NULL DEFAULT 0,
                name TEXT
            );
            CREATE INDEX idx_step_sections_recipe ON step_sections(recipe_id);

            CREATE TABLE steps (
                id TEXT PRIMARY KEY,
                section_id TEXT REFERENCES step_sections(id),
                position INTEGER NOT NULL DEFAULT 0,
                description TEXT
            );
            CREATE INDEX idx_steps_section ON steps(section_id);

            CREATE TABLE images (
                id TEXT PRIMARY KEY,
                owner_kind TEXT,
                owner_id TEXT,
                position INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX idx_images_owner ON images(owner_kind, owner_id);

            CREATE TABLE image_blobs (
                image_id TEXT PRIMARY KEY REFERENCES images(id),
                data BLOB NOT NULL
            );
        ",
    },
    Migration {
        version: 2,
        description: "Order lookups for top-level listings",
        sql: r"
            CREATE INDEX idx_folders_parent_position ON folders(parent_id, position);
            CREATE INDEX idx_recipes_folder_position ON recipes(folder_id, position);
        ",
    },
];

/// Returns the schema version recorded in the database.
pub fn current_version(conn: &Connection) -> Result<i32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| Error::operation("read_schema_version", e))
}

/// Applies every migration newer than the database's current version.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if a migration fails; that migration
/// is rolled back and later ones are not attempted.
pub fn migrate(conn: &Connection) -> Result<i32> {
    let start = current_version(conn)?;
    let mut version = start;

    for migration in MIGRATIONS.iter().filter(|m| m.version > start) {
        with_transaction(conn, |conn| {
            conn.execute_batch(migration.sql)
                .map_err(|e| Error::operation("apply_migration", e))?;
            conn.pragma_update(None, "user_version", migration.version)
                .map_err(|e| Error::operation("update_schema_version", e))
        })?;

        tracing::info!(
            version = migration.version,
            description = migration.description,
            "Applied schema migration"
        );
        version = migration.version;
    }

    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_fresh_database() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(current_version(&conn).unwrap(), 0);

        let version = migrate(&conn).unwrap();
        assert_eq!(version, MIGRATIONS.len() as i32);

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 10);
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        let first = migrate(&conn).unwrap();
        let second = migrate(&conn).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_migrate_resumes_from_recorded_version() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(MIGRATIONS[0].sql).unwrap();
        conn.pragma_update(None, "user_version", 1).unwrap();

        assert_eq!(migrate(&conn).unwrap(), 2);

        let indexes: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'index' AND name = 'idx_folders_parent_position'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(indexes, 1);
    }

    #[test]
    fn test_versions_are_sequential() {
        for (index, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version, index as i32 + 1);
        }
    }
}
