use anyhow::Result;
use rusqlite::Connection;

/// Initialize database schema
///
/// # Errors
///
/// Returns an error if database table creation or index creation fails
pub fn init_schema(conn: &Connection) -> Result<()> {
    // Sessions table - append-only log of closed foreground spans
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            app_name TEXT NOT NULL,
            window_title TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            duration_seconds INTEGER NOT NULL,
            date TEXT NOT NULL
        )",
        [],
    )?;

    // Settings table - single row read by the daemon each tick
    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings (
            id TEXT PRIMARY KEY,
            paused INTEGER NOT NULL,
            idle_threshold_seconds INTEGER NOT NULL,
            sample_interval_seconds INTEGER NOT NULL DEFAULT 2,
            identity_mode TEXT NOT NULL DEFAULT 'window'
        )",
        [],
    )?;

    // Add columns introduced after the initial settings schema
    let columns_to_add = vec![
        ("sample_interval_seconds", "INTEGER NOT NULL DEFAULT 2"),
        ("identity_mode", "TEXT NOT NULL DEFAULT 'window'"),
    ];

    for (column_name, column_type) in columns_to_add {
        let column_exists: Result<i32, rusqlite::Error> = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM pragma_table_info('settings') WHERE name='{column_name}'"
            ),
            [],
            |row| row.get(0),
        );

        if column_exists.unwrap_or(0) == 0 {
            conn.execute(
                &format!("ALTER TABLE settings ADD COLUMN {column_name} {column_type}"),
                [],
            )?;
            log::info!("Added {column_name} column to settings table");
        }
    }

    // Indexes for the report and export query paths
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sessions_date ON sessions(date)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sessions_app_name ON sessions(app_name)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sessions_start_time ON sessions(start_time)",
        [],
    )?;

    log::info!("Database schema initialized");
    Ok(())
}
