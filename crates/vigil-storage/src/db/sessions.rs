use anyhow::Result;
use rusqlite::params;

use super::{parse_datetime, parse_uuid, Database};
use crate::error::StoreError;
use crate::models::Session;

impl Database {
    /// Append a closed session to the log
    ///
    /// The log is append-only: rows are never updated, so replaying the same
    /// closed span twice produces two rows with distinct ids.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ConstraintViolation`] if the record is invalid
    /// (it ends before it starts, or reuses an existing id), and
    /// [`StoreError::Unavailable`] for transient database failures.
    pub fn append_session(&self, session: &Session) -> Result<(), StoreError> {
        if session.end_time < session.start_time {
            return Err(StoreError::ConstraintViolation(format!(
                "session {} ends before it starts ({} < {})",
                session.id, session.end_time, session.start_time
            )));
        }

        self.conn.execute(
            "INSERT INTO sessions (id, app_name, window_title, start_time, end_time, duration_seconds, date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                session.id.to_string(),
                session.app_name,
                session.window_title,
                session.start_time.to_rfc3339(),
                session.end_time.to_rfc3339(),
                session.duration_seconds,
                session.date,
            ],
        )?;
        Ok(())
    }

    /// Get all sessions recorded on a local calendar day (`YYYY-MM-DD`)
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn get_sessions_by_date(&self, date: &str) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, app_name, window_title, start_time, end_time, duration_seconds, date
             FROM sessions
             WHERE date = ?1
             ORDER BY start_time ASC",
        )?;

        let sessions = stmt
            .query_map([date], Self::row_to_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    /// Get all sessions in an inclusive local-day range
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn get_sessions_by_date_range(&self, from: &str, to: &str) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, app_name, window_title, start_time, end_time, duration_seconds, date
             FROM sessions
             WHERE date >= ?1 AND date <= ?2
             ORDER BY start_time ASC",
        )?;

        let sessions = stmt
            .query_map(params![from, to], Self::row_to_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    /// Get every recorded session, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn get_all_sessions(&self) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, app_name, window_title, start_time, end_time, duration_seconds, date
             FROM sessions
             ORDER BY start_time ASC",
        )?;

        let sessions = stmt
            .query_map([], Self::row_to_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    /// Get sessions whose application name contains `app_query` (case-insensitive)
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn get_sessions_by_app(&self, app_query: &str) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, app_name, window_title, start_time, end_time, duration_seconds, date
             FROM sessions
             WHERE app_name LIKE '%' || ?1 || '%'
             ORDER BY start_time ASC",
        )?;

        let sessions = stmt
            .query_map([app_query], Self::row_to_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    /// Delete sessions recorded before a local calendar day (`YYYY-MM-DD`)
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete operation fails
    pub fn delete_sessions_before(&self, date: &str) -> Result<usize> {
        let deleted = self
            .conn
            .execute("DELETE FROM sessions WHERE date < ?1", [date])?;
        Ok(deleted)
    }

    /// Delete every recorded session
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete operation fails
    pub fn delete_all_sessions(&self) -> Result<usize> {
        let deleted = self.conn.execute("DELETE FROM sessions", [])?;
        Ok(deleted)
    }

    /// Helper function to parse `Session` from database row
    pub(crate) fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<Session> {
        Ok(Session {
            id: parse_uuid(&row.get::<_, String>(0)?)?,
            app_name: row.get(1)?,
            window_title: row.get(2)?,
            start_time: parse_datetime(&row.get::<_, String>(3)?)?,
            end_time: parse_datetime(&row.get::<_, String>(4)?)?,
            duration_seconds: row.get(5)?,
            date: row.get(6)?,
        })
    }
}
