/// Tracking control and configuration commands
use anyhow::Result;
use vigil_storage::{Database, IdentityMode};

use crate::ConfigAction;

pub fn pause_command() -> Result<()> {
    let db = Database::new(None)?;
    let mut settings = db.get_settings()?;

    if settings.paused {
        println!("Tracking is already paused");
        return Ok(());
    }

    settings.paused = true;
    db.update_settings(&settings)?;
    println!("Tracking paused");
    Ok(())
}

pub fn resume_command() -> Result<()> {
    let db = Database::new(None)?;
    let mut settings = db.get_settings()?;

    if !settings.paused {
        println!("Tracking is not paused");
        return Ok(());
    }

    settings.paused = false;
    db.update_settings(&settings)?;
    println!("Tracking resumed");
    Ok(())
}

pub fn handle_config_command(action: ConfigAction) -> Result<()> {
    let db = Database::new(None)?;

    match action {
        ConfigAction::Get { key } => {
            let value = get_config_value(&db, &key)?;
            println!("{key} = {value}");
        }
        ConfigAction::Set { key, value } => {
            set_config_value(&db, &key, &value)?;
            println!("Set {key} = {value}");
        }
        ConfigAction::List => {
            let settings = db.get_settings()?;
            println!("Configuration:");
            println!("\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}");
            println!("  paused = {}", settings.paused);
            println!("  idle-threshold = {}", settings.idle_threshold_seconds);
            println!("  sample-interval = {}", settings.sample_interval_seconds);
            println!("  identity-mode = {}", settings.identity_mode);
        }
    }

    Ok(())
}

fn get_config_value(db: &Database, key: &str) -> Result<String> {
    let settings = db.get_settings()?;

    match key {
        "idle-threshold" | "idle_threshold_seconds" => {
            Ok(settings.idle_threshold_seconds.to_string())
        }
        "sample-interval" | "sample_interval_seconds" => {
            Ok(settings.sample_interval_seconds.to_string())
        }
        "identity-mode" | "identity_mode" => Ok(settings.identity_mode.to_string()),
        "paused" => Ok(settings.paused.to_string()),
        _ => anyhow::bail!(
            "Unknown key: {key}. Valid keys: idle-threshold, sample-interval, identity-mode, paused"
        ),
    }
}

fn set_config_value(db: &Database, key: &str, value: &str) -> Result<()> {
    let mut settings = db.get_settings()?;

    match key {
        "idle-threshold" | "idle_threshold_seconds" => {
            let threshold: i64 = value
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid number: {value}"))?;
            if threshold <= 0 {
                anyhow::bail!("Idle threshold must be greater than zero");
            }
            settings.idle_threshold_seconds = u32::try_from(threshold)?;
        }
        "sample-interval" | "sample_interval_seconds" => {
            let interval: i64 = value
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid number: {value}"))?;
            if interval <= 0 {
                anyhow::bail!("Sample interval must be greater than zero");
            }
            settings.sample_interval_seconds = u32::try_from(interval)?;
            println!("The sampling interval applies after a daemon restart");
        }
        "identity-mode" | "identity_mode" => {
            settings.identity_mode = value
                .parse::<IdentityMode>()
                .map_err(|e: String| anyhow::anyhow!(e))?;
        }
        _ => anyhow::bail!(
            "Unknown key: {key}. Valid keys: idle-threshold, sample-interval, identity-mode"
        ),
    }

    db.update_settings(&settings)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_db() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let db = Database::new(Some(dir.path().join("test.db"))).unwrap();
        (dir, db)
    }

    #[test]
    fn test_set_idle_threshold() {
        let (_dir, db) = test_db();

        set_config_value(&db, "idle-threshold", "600").unwrap();

        assert_eq!(db.get_settings().unwrap().idle_threshold_seconds, 600);
        assert_eq!(get_config_value(&db, "idle-threshold").unwrap(), "600");
    }

    #[test]
    fn test_zero_idle_threshold_is_rejected() {
        let (_dir, db) = test_db();
        let before = db.get_settings().unwrap().idle_threshold_seconds;

        assert!(set_config_value(&db, "idle-threshold", "0").is_err());

        // Prior value is retained
        assert_eq!(db.get_settings().unwrap().idle_threshold_seconds, before);
    }

    #[test]
    fn test_negative_idle_threshold_is_rejected() {
        let (_dir, db) = test_db();
        let before = db.get_settings().unwrap().idle_threshold_seconds;

        assert!(set_config_value(&db, "idle-threshold", "-5").is_err());

        assert_eq!(db.get_settings().unwrap().idle_threshold_seconds, before);
    }

    #[test]
    fn test_non_numeric_idle_threshold_is_rejected() {
        let (_dir, db) = test_db();
        let before = db.get_settings().unwrap().idle_threshold_seconds;

        assert!(set_config_value(&db, "idle-threshold", "soon").is_err());

        assert_eq!(db.get_settings().unwrap().idle_threshold_seconds, before);
    }

    #[test]
    fn test_set_identity_mode() {
        let (_dir, db) = test_db();

        set_config_value(&db, "identity-mode", "app").unwrap();
        assert_eq!(db.get_settings().unwrap().identity_mode, IdentityMode::App);

        assert!(set_config_value(&db, "identity-mode", "bogus").is_err());
        assert_eq!(db.get_settings().unwrap().identity_mode, IdentityMode::App);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let (_dir, db) = test_db();

        assert!(set_config_value(&db, "frobnicate", "1").is_err());
        assert!(get_config_value(&db, "frobnicate").is_err());
    }
}
