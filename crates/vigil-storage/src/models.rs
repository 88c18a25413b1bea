use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session record - one closed span of continuous foreground use of a window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub app_name: String,
    pub window_title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: u32,
    /// Local calendar day of `start_time`, fixed when the record is created
    pub date: String,
}

impl Session {
    #[must_use]
    pub fn new(
        app_name: String,
        window_title: String,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        let duration = end_time.signed_duration_since(start_time);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let duration_seconds = duration.num_seconds().max(0) as u32;
        let date = start_time
            .with_timezone(&Local)
            .format("%Y-%m-%d")
            .to_string();
        Self {
            id: Uuid::new_v4(),
            app_name,
            window_title,
            start_time,
            end_time,
            duration_seconds,
            date,
        }
    }

    /// Check whether the span covers less than one whole second
    #[must_use]
    pub fn is_zero_duration(&self) -> bool {
        self.duration_seconds == 0
    }
}

/// How a sample's window identity is derived for change detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityMode {
    /// Application name and window title together (default)
    Window,
    /// Application name only, ignoring title changes
    App,
}

impl std::fmt::Display for IdentityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Window => write!(f, "window"),
            Self::App => write!(f, "app"),
        }
    }
}

impl std::str::FromStr for IdentityMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "window" => Ok(Self::Window),
            "app" => Ok(Self::App),
            _ => Err(format!("Unknown identity mode: {s}. Use: window, app")),
        }
    }
}

/// Tracker settings, read by the daemon on every tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub id: Uuid,
    pub paused: bool,
    pub idle_threshold_seconds: u32,
    pub sample_interval_seconds: u32,
    pub identity_mode: IdentityMode,
}

impl Settings {
    #[must_use]
    pub fn default_settings() -> Self {
        Self {
            id: Uuid::new_v4(),
            paused: false,
            idle_threshold_seconds: 300, // 5 minutes
            sample_interval_seconds: 2,
            identity_mode: IdentityMode::Window,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::default_settings()
    }
}
