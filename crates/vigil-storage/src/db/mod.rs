//! Database operations split into domain-specific modules.
//!
//! This module re-exports the main Database struct and all its operations.

mod sessions;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, OptionalExtension};
use std::path::PathBuf;

use crate::migrations;
use crate::models::{IdentityMode, Settings};

/// Decode a TEXT uuid column, mapping parse failures to a rusqlite error
/// so they surface through `query_map` like any other row error.
pub(crate) fn parse_uuid(s: &str) -> rusqlite::Result<uuid::Uuid> {
    uuid::Uuid::parse_str(s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

/// Decode a TEXT rfc3339 column into a UTC instant.
pub(crate) fn parse_datetime(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

/// Database connection wrapper
pub struct Database {
    pub(crate) conn: rusqlite::Connection,
}

// Implement Send and Sync for Database to allow sharing across threads
unsafe impl Send for Database {}
unsafe impl Sync for Database {}

impl Database {
    /// Create a new database connection
    ///
    /// # Errors
    ///
    /// Returns an error if database directory creation, connection opening, or schema initialization fails
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = db_path.unwrap_or_else(Self::default_db_path);

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn =
            rusqlite::Connection::open(&path).context("Failed to open database connection")?;

        // WAL lets report queries read while the daemon holds the write lock
        if let Err(e) = conn.pragma_update(None, "journal_mode", "WAL") {
            log::error!("Failed to enable WAL mode: {e}");
        }
        if let Err(e) = conn.busy_timeout(std::time::Duration::from_secs(5)) {
            log::error!("Failed to set busy timeout: {e}");
        }

        // Initialize schema
        migrations::init_schema(&conn)?;

        log::info!("Database initialized at: {}", path.display());

        Ok(Self { conn })
    }

    /// Get default database path
    #[must_use]
    pub fn default_db_path() -> PathBuf {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("vigil");
        path.push("vigil.db");
        path
    }

    // ==================== Settings Methods ====================

    /// Get or create settings
    ///
    /// # Errors
    ///
    /// Returns an error if the database query or insert operation fails
    pub fn get_settings(&self) -> Result<Settings> {
        let result: Option<Settings> = self
            .conn
            .query_row(
                "SELECT id, paused, idle_threshold_seconds, sample_interval_seconds, identity_mode
                 FROM settings LIMIT 1",
                [],
                |row| {
                    Ok(Settings {
                        id: parse_uuid(&row.get::<_, String>(0)?)?,
                        paused: row.get::<_, i32>(1)? != 0,
                        idle_threshold_seconds: row.get(2)?,
                        sample_interval_seconds: row.get(3)?,
                        identity_mode: row
                            .get::<_, String>(4)?
                            .parse()
                            .unwrap_or(IdentityMode::Window),
                    })
                },
            )
            .optional()?;

        if let Some(settings) = result {
            Ok(settings)
        } else {
            // Create default settings
            let settings = Settings::default_settings();
            self.update_settings(&settings)?;
            Ok(settings)
        }
    }

    /// Update settings
    ///
    /// # Errors
    ///
    /// Returns an error if the database update operation fails
    pub fn update_settings(&self, settings: &Settings) -> Result<()> {
        self.conn.execute(
            "INSERT INTO settings (id, paused, idle_threshold_seconds, sample_interval_seconds, identity_mode)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                paused = ?2,
                idle_threshold_seconds = ?3,
                sample_interval_seconds = ?4,
                identity_mode = ?5",
            params![
                settings.id.to_string(),
                i32::from(settings.paused),
                settings.idle_threshold_seconds,
                settings.sample_interval_seconds,
                settings.identity_mode.to_string(),
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(Some(dir.path().join("test.db"))).unwrap();
        (dir, db)
    }

    #[test]
    fn test_get_settings_creates_defaults() {
        let (_dir, db) = test_db();
        let settings = db.get_settings().unwrap();

        assert!(!settings.paused);
        assert_eq!(settings.idle_threshold_seconds, 300);
        assert_eq!(settings.sample_interval_seconds, 2);
        assert_eq!(settings.identity_mode, IdentityMode::Window);
    }

    #[test]
    fn test_update_settings_roundtrip() {
        let (_dir, db) = test_db();
        let mut settings = db.get_settings().unwrap();

        settings.paused = true;
        settings.idle_threshold_seconds = 120;
        settings.identity_mode = IdentityMode::App;
        db.update_settings(&settings).unwrap();

        let reloaded = db.get_settings().unwrap();
        assert_eq!(reloaded.id, settings.id);
        assert!(reloaded.paused);
        assert_eq!(reloaded.idle_threshold_seconds, 120);
        assert_eq!(reloaded.identity_mode, IdentityMode::App);
    }

    #[test]
    fn test_settings_row_stays_single() {
        let (_dir, db) = test_db();
        let mut settings = db.get_settings().unwrap();

        settings.idle_threshold_seconds = 60;
        db.update_settings(&settings).unwrap();
        settings.idle_threshold_seconds = 90;
        db.update_settings(&settings).unwrap();

        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM settings", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(db.get_settings().unwrap().idle_threshold_seconds, 90);
    }
}
