use chrono::{DateTime, Utc};

use crate::probe::{ForegroundProbe, ForegroundWindow};

/// One probe observation, handed to the state machine each tick
#[derive(Debug, Clone)]
pub struct Sample {
    pub app_name: String,
    pub window_title: String,
    pub observed_at: DateTime<Utc>,
    pub idle_seconds: f64,
}

/// Fail-open wrapper around the platform probe.
///
/// OS queries fail transiently (permission prompts, X server hiccups,
/// osascript timeouts). Those failures never reach the tracking loop: the
/// sampler repeats the last known window identity with zero idle time.
/// Before the first successful observation there is nothing to repeat, so
/// the tick is skipped.
pub struct Sampler {
    probe: Box<dyn ForegroundProbe>,
    last_window: Option<ForegroundWindow>,
}

impl Sampler {
    #[must_use]
    pub fn new(probe: Box<dyn ForegroundProbe>) -> Self {
        Self {
            probe,
            last_window: None,
        }
    }

    /// Observe the foreground window and idle time at `observed_at`.
    ///
    /// Returns `None` only when the probe fails before its first success.
    pub async fn sample(&mut self, observed_at: DateTime<Utc>) -> Option<Sample> {
        let window = match self.probe.foreground_window().await {
            Ok(Some(window)) => {
                self.last_window = Some(window.clone());
                Some(window)
            }
            Ok(None) => {
                log::debug!("Probe reported no foreground window");
                None
            }
            Err(e) => {
                log::warn!("Foreground probe failed: {e}");
                None
            }
        };

        if let Some(window) = window {
            let idle_seconds = match self.probe.idle_seconds().await {
                Ok(secs) => secs.max(0.0),
                Err(e) => {
                    log::warn!("Idle probe failed: {e}");
                    0.0
                }
            };
            return Some(Sample {
                app_name: window.app_name,
                window_title: window.window_title,
                observed_at,
                idle_seconds,
            });
        }

        // Fail open: previous identity, zero idle time
        let previous = self.last_window.clone()?;
        Some(Sample {
            app_name: previous.app_name,
            window_title: previous.window_title,
            observed_at,
            idle_seconds: 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedProbe {
        windows: Mutex<VecDeque<Result<Option<ForegroundWindow>>>>,
        idle: Mutex<VecDeque<Result<f64>>>,
    }

    impl ScriptedProbe {
        fn new(
            windows: Vec<Result<Option<ForegroundWindow>>>,
            idle: Vec<Result<f64>>,
        ) -> Self {
            Self {
                windows: Mutex::new(windows.into()),
                idle: Mutex::new(idle.into()),
            }
        }
    }

    #[async_trait]
    impl ForegroundProbe for ScriptedProbe {
        async fn foreground_window(&self) -> Result<Option<ForegroundWindow>> {
            self.windows
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(None))
        }

        async fn idle_seconds(&self) -> Result<f64> {
            self.idle.lock().unwrap().pop_front().unwrap_or(Ok(0.0))
        }
    }

    fn window(app: &str, title: &str) -> ForegroundWindow {
        ForegroundWindow {
            app_name: app.to_string(),
            window_title: title.to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_failure_before_first_success_skips_the_tick() {
        let probe = ScriptedProbe::new(vec![Err(anyhow::anyhow!("no display"))], vec![]);
        let mut sampler = Sampler::new(Box::new(probe));

        assert!(sampler.sample(now()).await.is_none());
    }

    #[tokio::test]
    async fn test_failure_repeats_previous_identity_with_zero_idle() {
        let probe = ScriptedProbe::new(
            vec![
                Ok(Some(window("Firefox", "Docs"))),
                Err(anyhow::anyhow!("osascript timed out")),
            ],
            vec![Ok(42.0)],
        );
        let mut sampler = Sampler::new(Box::new(probe));

        let first = sampler.sample(now()).await.unwrap();
        assert_eq!(first.app_name, "Firefox");
        assert!((first.idle_seconds - 42.0).abs() < f64::EPSILON);

        let second = sampler.sample(now()).await.unwrap();
        assert_eq!(second.app_name, "Firefox");
        assert_eq!(second.window_title, "Docs");
        assert!(second.idle_seconds.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_missing_window_is_treated_as_failure() {
        let probe = ScriptedProbe::new(
            vec![Ok(Some(window("Terminal", "zsh"))), Ok(None)],
            vec![Ok(1.0)],
        );
        let mut sampler = Sampler::new(Box::new(probe));

        sampler.sample(now()).await.unwrap();
        let sample = sampler.sample(now()).await.unwrap();
        assert_eq!(sample.app_name, "Terminal");
        assert!(sample.idle_seconds.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_idle_probe_failure_reports_zero_idle() {
        let probe = ScriptedProbe::new(
            vec![Ok(Some(window("Code", "main.rs")))],
            vec![Err(anyhow::anyhow!("screensaver extension missing"))],
        );
        let mut sampler = Sampler::new(Box::new(probe));

        let sample = sampler.sample(now()).await.unwrap();
        assert_eq!(sample.app_name, "Code");
        assert!(sample.idle_seconds.abs() < f64::EPSILON);
    }
}
