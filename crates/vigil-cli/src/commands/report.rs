/// Usage report command handlers
use anyhow::Result;
use chrono::{Duration, Local, NaiveDate, Timelike};
use std::collections::{BTreeMap, BTreeSet};
use tabled::{Table, Tabled};
use vigil_storage::{Database, Session};

use super::helpers::format_duration;

#[derive(Tabled)]
struct AppStats {
    #[tabled(rename = "Application")]
    app_name: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Sessions")]
    sessions: usize,
    #[tabled(rename = "Share")]
    share: String,
}

#[derive(Tabled)]
struct HourStats {
    #[tabled(rename = "Hour")]
    hour: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Share")]
    share: String,
}

#[derive(Tabled)]
struct AppSummary {
    #[tabled(rename = "Application")]
    app_name: String,
    #[tabled(rename = "Total Time")]
    total_time: String,
    #[tabled(rename = "Sessions")]
    sessions: usize,
    #[tabled(rename = "Days Seen")]
    days_seen: usize,
}

pub fn handle_report_command(period: &str, hourly: bool) -> Result<()> {
    let db = Database::new(None)?;
    let sessions = sessions_for_period(&db, period)?;

    if sessions.is_empty() {
        println!("No sessions recorded for period: {period}");
        return Ok(());
    }

    let total_seconds: u64 = sessions
        .iter()
        .map(|s| u64::from(s.duration_seconds))
        .sum();

    println!("\nUsage Report: {period}");
    println!("\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}");

    let table = if hourly {
        Table::new(hour_stats(&sessions, total_seconds)).to_string()
    } else {
        Table::new(app_stats(&sessions, total_seconds)).to_string()
    };
    println!("\n{table}");

    println!(
        "\nTotal tracked time: {} across {} session(s)",
        format_duration(total_seconds),
        sessions.len()
    );

    Ok(())
}

pub fn handle_apps_command(query: Option<&str>) -> Result<()> {
    let db = Database::new(None)?;
    let sessions = match query {
        Some(q) => db.get_sessions_by_app(q)?,
        None => db.get_all_sessions()?,
    };

    if sessions.is_empty() {
        match query {
            Some(q) => println!("No applications matching: {q}"),
            None => println!("No applications recorded yet"),
        }
        return Ok(());
    }

    let table = Table::new(app_summaries(&sessions)).to_string();
    println!("{table}");

    Ok(())
}

fn sessions_for_period(db: &Database, period: &str) -> Result<Vec<Session>> {
    let today = Local::now().date_naive();

    match period {
        "today" => db.get_sessions_by_date(&today.format("%Y-%m-%d").to_string()),
        "yesterday" => {
            let date = today - Duration::days(1);
            db.get_sessions_by_date(&date.format("%Y-%m-%d").to_string())
        }
        "week" => {
            let start = today - Duration::days(6);
            db.get_sessions_by_date_range(
                &start.format("%Y-%m-%d").to_string(),
                &today.format("%Y-%m-%d").to_string(),
            )
        }
        "month" => {
            let start = today - Duration::days(29);
            db.get_sessions_by_date_range(
                &start.format("%Y-%m-%d").to_string(),
                &today.format("%Y-%m-%d").to_string(),
            )
        }
        "all" => db.get_all_sessions(),
        custom => {
            let date = NaiveDate::parse_from_str(custom, "%Y-%m-%d").map_err(|_| {
                anyhow::anyhow!(
                    "Unknown period: {custom}. Use today, yesterday, week, month, all, or YYYY-MM-DD"
                )
            })?;
            db.get_sessions_by_date(&date.format("%Y-%m-%d").to_string())
        }
    }
}

fn app_stats(sessions: &[Session], total_seconds: u64) -> Vec<AppStats> {
    let mut per_app: BTreeMap<&str, (u64, usize)> = BTreeMap::new();
    for session in sessions {
        let entry = per_app.entry(session.app_name.as_str()).or_default();
        entry.0 += u64::from(session.duration_seconds);
        entry.1 += 1;
    }

    let mut rows: Vec<(&str, u64, usize)> = per_app
        .into_iter()
        .map(|(app, (seconds, count))| (app, seconds, count))
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1));

    rows.into_iter()
        .map(|(app, seconds, count)| AppStats {
            app_name: app.to_string(),
            time: format_duration(seconds),
            sessions: count,
            share: share_of(seconds, total_seconds),
        })
        .collect()
}

fn hour_stats(sessions: &[Session], total_seconds: u64) -> Vec<HourStats> {
    let mut per_hour: BTreeMap<u32, u64> = BTreeMap::new();
    for session in sessions {
        // A session is bucketed by the local hour it started in
        let hour = session.start_time.with_timezone(&Local).hour();
        *per_hour.entry(hour).or_default() += u64::from(session.duration_seconds);
    }

    per_hour
        .into_iter()
        .map(|(hour, seconds)| HourStats {
            hour: format!("{hour:02}:00"),
            time: format_duration(seconds),
            share: share_of(seconds, total_seconds),
        })
        .collect()
}

fn app_summaries(sessions: &[Session]) -> Vec<AppSummary> {
    let mut per_app: BTreeMap<&str, (u64, usize, BTreeSet<&str>)> = BTreeMap::new();
    for session in sessions {
        let entry = per_app.entry(session.app_name.as_str()).or_default();
        entry.0 += u64::from(session.duration_seconds);
        entry.1 += 1;
        entry.2.insert(session.date.as_str());
    }

    let mut rows: Vec<(&str, u64, usize, usize)> = per_app
        .into_iter()
        .map(|(app, (seconds, count, dates))| (app, seconds, count, dates.len()))
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1));

    rows.into_iter()
        .map(|(app, seconds, count, days)| AppSummary {
            app_name: app.to_string(),
            total_time: format_duration(seconds),
            sessions: count,
            days_seen: days,
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn share_of(seconds: u64, total_seconds: u64) -> String {
    if total_seconds > 0 {
        format!("{:.1}%", (seconds as f64 / total_seconds as f64) * 100.0)
    } else {
        String::from("0%")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn session(app: &str, hour: u32, secs: i64) -> Session {
        let start = Utc.with_ymd_and_hms(2024, 3, 5, hour, 0, 0).unwrap();
        Session::new(
            app.to_string(),
            "Title".to_string(),
            start,
            start + Duration::seconds(secs),
        )
    }

    #[test]
    fn test_app_stats_aggregates_and_sorts_by_time() {
        let sessions = vec![
            session("Editor", 9, 100),
            session("Browser", 10, 500),
            session("Editor", 11, 200),
        ];

        let stats = app_stats(&sessions, 800);

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].app_name, "Browser");
        assert_eq!(stats[0].time, "8m 20s");
        assert_eq!(stats[0].sessions, 1);
        assert_eq!(stats[1].app_name, "Editor");
        assert_eq!(stats[1].time, "5m 0s");
        assert_eq!(stats[1].sessions, 2);
        assert_eq!(stats[1].share, "37.5%");
    }

    #[test]
    fn test_app_summaries_count_distinct_days() {
        let day1 = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2024, 3, 8, 12, 0, 0).unwrap();
        let sessions = vec![
            Session::new(
                "Editor".to_string(),
                "a".to_string(),
                day1,
                day1 + Duration::seconds(60),
            ),
            Session::new(
                "Editor".to_string(),
                "b".to_string(),
                day1 + Duration::seconds(120),
                day1 + Duration::seconds(180),
            ),
            Session::new(
                "Editor".to_string(),
                "c".to_string(),
                day2,
                day2 + Duration::seconds(60),
            ),
        ];

        let summaries = app_summaries(&sessions);

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].sessions, 3);
        assert_eq!(summaries[0].days_seen, 2);
    }

    #[test]
    fn test_share_of_handles_zero_total() {
        assert_eq!(share_of(10, 0), "0%");
        assert_eq!(share_of(25, 100), "25.0%");
    }

    #[test]
    fn test_garbage_period_is_rejected() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(Some(dir.path().join("test.db"))).unwrap();

        assert!(sessions_for_period(&db, "fortnight").is_err());
        assert!(sessions_for_period(&db, "2024-13-99").is_err());
    }

    #[test]
    fn test_explicit_date_period_fetches_that_day() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(Some(dir.path().join("test.db"))).unwrap();

        let recorded = session("Editor", 9, 300);
        db.append_session(&recorded).unwrap();

        let fetched = sessions_for_period(&db, &recorded.date).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].app_name, "Editor");
    }
}
