/// Session deletion command handlers
use anyhow::Result;
use chrono::NaiveDate;
use vigil_storage::Database;

pub fn handle_purge_command(before: Option<&str>, all: bool) -> Result<()> {
    let db = Database::new(None)?;
    let deleted = purge_sessions(&db, before, all)?;
    println!("Deleted {deleted} session(s)");
    Ok(())
}

fn purge_sessions(db: &Database, before: Option<&str>, all: bool) -> Result<usize> {
    match (before, all) {
        (Some(_), true) => anyhow::bail!("Use either --before or --all, not both"),
        (Some(date), false) => {
            NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|_| anyhow::anyhow!("Invalid date: {date}. Use YYYY-MM-DD"))?;
            db.delete_sessions_before(date)
        }
        (None, true) => db.delete_all_sessions(),
        (None, false) => anyhow::bail!("Specify --before <date> or --all"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;
    use vigil_storage::Session;

    fn test_db() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let db = Database::new(Some(dir.path().join("test.db"))).unwrap();
        (dir, db)
    }

    fn record(db: &Database, day: u32) -> Session {
        let start = Utc.with_ymd_and_hms(2024, 6, day, 12, 0, 0).unwrap();
        let session = Session::new(
            "Editor".to_string(),
            "Title".to_string(),
            start,
            start + Duration::seconds(60),
        );
        db.append_session(&session).unwrap();
        session
    }

    #[test]
    fn test_purge_before_keeps_newer_sessions() {
        let (_dir, db) = test_db();
        let old = record(&db, 1);
        let new = record(&db, 20);

        let deleted = purge_sessions(&db, Some(new.date.as_str()), false).unwrap();

        assert_eq!(deleted, 1);
        let remaining = db.get_all_sessions().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_ne!(remaining[0].date, old.date);
    }

    #[test]
    fn test_purge_all() {
        let (_dir, db) = test_db();
        record(&db, 1);
        record(&db, 20);

        let deleted = purge_sessions(&db, None, true).unwrap();

        assert_eq!(deleted, 2);
        assert!(db.get_all_sessions().unwrap().is_empty());
    }

    #[test]
    fn test_purge_requires_exactly_one_flag() {
        let (_dir, db) = test_db();

        assert!(purge_sessions(&db, None, false).is_err());
        assert!(purge_sessions(&db, Some("2024-06-01"), true).is_err());
    }

    #[test]
    fn test_purge_rejects_malformed_dates() {
        let (_dir, db) = test_db();
        record(&db, 1);

        assert!(purge_sessions(&db, Some("June 1st"), false).is_err());
        assert_eq!(db.get_all_sessions().unwrap().len(), 1);
    }
}
