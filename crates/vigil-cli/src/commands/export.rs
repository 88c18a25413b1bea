/// Session export command handlers
use anyhow::Result;
use vigil_storage::{Database, Session};

use super::helpers::escape_csv;

pub fn handle_export_command(format: &str, output: Option<String>) -> Result<()> {
    let db = Database::new(None)?;
    let sessions = db.get_all_sessions()?;
    let output_path = output.unwrap_or_else(|| format!("vigil_export.{format}"));

    match format {
        "json" => {
            let json = serde_json::to_string_pretty(&sessions)?;
            std::fs::write(&output_path, json)?;
            println!("Exported {} sessions to {output_path}", sessions.len());
        }
        "csv" => {
            std::fs::write(&output_path, sessions_to_csv(&sessions))?;
            println!("Exported {} sessions to {output_path}", sessions.len());
        }
        _ => {
            println!("Unknown format: {format}. Use 'json' or 'csv'");
        }
    }

    Ok(())
}

fn sessions_to_csv(sessions: &[Session]) -> String {
    let mut csv =
        String::from("Date,Application,Window Title,Start Time,End Time,Duration (seconds)\n");

    for session in sessions {
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            session.date,
            escape_csv(&session.app_name),
            escape_csv(&session.window_title),
            session.start_time.to_rfc3339(),
            session.end_time.to_rfc3339(),
            session.duration_seconds,
        ));
    }

    csv
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_csv_header_and_rows() {
        let start = Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap();
        let sessions = vec![Session::new(
            "Editor".to_string(),
            "main.rs".to_string(),
            start,
            start + Duration::seconds(90),
        )];

        let csv = sessions_to_csv(&sessions);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "Date,Application,Window Title,Start Time,End Time,Duration (seconds)"
        );
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("Editor"));
        assert!(lines[1].ends_with(",90"));
    }

    #[test]
    fn test_csv_escapes_titles_with_commas() {
        let start = Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap();
        let sessions = vec![Session::new(
            "Browser".to_string(),
            "News, weather and more".to_string(),
            start,
            start + Duration::seconds(10),
        )];

        let csv = sessions_to_csv(&sessions);

        assert!(csv.contains("\"News, weather and more\""));
    }

    #[test]
    fn test_csv_with_no_sessions_is_header_only() {
        let csv = sessions_to_csv(&[]);

        assert_eq!(
            csv,
            "Date,Application,Window Title,Start Time,End Time,Duration (seconds)\n"
        );
    }
}
