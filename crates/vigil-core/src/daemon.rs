use crate::{
    config::get_data_dir,
    ipc::{listen, DaemonIpcHandler, TrackerSnapshot},
    probe::{create_probe, ForegroundProbe},
    sampler::Sampler,
    tracker::Tracker,
    writer::SessionWriter,
};
use anyhow::Result;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::{interval, MissedTickBehavior};
use vigil_storage::{Database, Settings};

pub struct Daemon {
    database: Arc<Database>,
    sampler: Sampler,
    tracker: Tracker,
    writer: SessionWriter<Arc<Database>>,
    ipc_handler: Arc<DaemonIpcHandler>,
    shutdown_signal: Arc<std::sync::atomic::AtomicBool>,
    tick_interval_seconds: u64,
    sock_path: PathBuf,
}

impl Daemon {
    /// # Errors
    ///
    /// Returns an error if no foreground probe is available for this
    /// platform or the settings row cannot be read.
    pub fn new(db: Database) -> Result<Self> {
        Self::with_probe(db, create_probe()?)
    }

    /// Build a daemon around an explicit probe; `new` supplies the
    /// platform one.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings row cannot be read or the data
    /// directory cannot be resolved.
    pub fn with_probe(db: Database, probe: Box<dyn ForegroundProbe>) -> Result<Self> {
        let db = Arc::new(db);
        let shutdown_signal = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let settings = db.get_settings()?;

        Ok(Self {
            database: db.clone(),
            sampler: Sampler::new(probe),
            tracker: Tracker::new(),
            writer: SessionWriter::new(db),
            ipc_handler: Arc::new(DaemonIpcHandler::new(shutdown_signal.clone())),
            shutdown_signal,
            tick_interval_seconds: u64::from(settings.sample_interval_seconds.max(1)),
            sock_path: get_data_dir()?.join("vigil.sock"),
        })
    }

    /// Run the sampling loop until Ctrl-C, SIGTERM, or an IPC shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if signal handlers cannot be installed.
    pub async fn run_with_signals(&mut self) -> Result<()> {
        let sock_path = self.sock_path.clone();
        let ipc_handler = self.ipc_handler.clone();

        tokio::spawn(async move {
            if let Err(e) = listen(ipc_handler, &sock_path).await {
                log::error!("IPC listener failed: {e}");
            }
        });

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut interval = interval(Duration::from_secs(self.tick_interval_seconds));
        // Ticks lost to suspend or CPU pressure are skipped, not replayed;
        // the next tick stays aligned to the original cadence
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        log::info!(
            "Daemon started, sampling every {}s",
            self.tick_interval_seconds
        );

        let ipc_handler = self.ipc_handler.clone();
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        log::error!("Daemon tick failed: {e}");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Received Ctrl-C, shutting down...");
                    self.shutdown_signal.store(true, std::sync::atomic::Ordering::SeqCst);
                }
                _ = sigterm.recv() => {
                    log::info!("Received SIGTERM, shutting down...");
                    self.shutdown_signal.store(true, std::sync::atomic::Ordering::SeqCst);
                }
                // Wakes the loop at once instead of waiting out the rest
                // of the tick interval
                _ = ipc_handler.shutdown_requested() => {
                    log::info!("Received shutdown request over IPC, shutting down...");
                    self.shutdown_signal.store(true, std::sync::atomic::Ordering::SeqCst);
                }
            }

            if self
                .shutdown_signal
                .load(std::sync::atomic::Ordering::SeqCst)
            {
                break;
            }
        }

        // Close the in-flight session at the actual shutdown instant
        if let Some(session) = self.tracker.finalize(chrono::Utc::now()) {
            self.writer.submit(session);
        }
        if !self.writer.flush() {
            log::error!(
                "Dropping {} unpersisted session(s) at shutdown",
                self.writer.pending_count()
            );
        }
        log::info!("Daemon shut down gracefully.");
        Ok(())
    }

    async fn tick(&mut self) -> Result<()> {
        let settings = self.database.get_settings()?;
        let now = chrono::Utc::now();

        if let Some(sample) = self.sampler.sample(now).await {
            log::debug!(
                "Sampled: {} [{}] idle {:.1}s",
                sample.app_name,
                sample.window_title,
                sample.idle_seconds
            );
            for session in self.tracker.tick(&sample, &settings) {
                self.writer.submit(session);
            }
        }

        // Writes held through a store outage get another attempt each tick
        self.writer.flush();
        self.publish_status(&settings).await;
        Ok(())
    }

    async fn publish_status(&self, settings: &Settings) {
        let snapshot = match self.tracker.open_session() {
            Some(open) => TrackerSnapshot {
                paused: settings.paused,
                phase: self.tracker.phase().to_string(),
                current_app: Some(open.app_name.clone()),
                current_title: Some(open.window_title.clone()),
                session_start: Some(open.start_time),
                idle_threshold_seconds: settings.idle_threshold_seconds,
            },
            None => TrackerSnapshot {
                paused: settings.paused,
                phase: self.tracker.phase().to_string(),
                idle_threshold_seconds: settings.idle_threshold_seconds,
                ..TrackerSnapshot::default()
            },
        };
        self.ipc_handler.update_snapshot(snapshot).await;
    }
}
