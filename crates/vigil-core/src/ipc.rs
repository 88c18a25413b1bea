use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{atomic::Ordering, Arc},
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{UnixListener, UnixStream},
    sync::{Mutex, Notify},
};

/// IPC request from CLI to daemon
#[derive(Serialize, Deserialize, Debug)]
pub enum IpcRequest {
    Status,
    Shutdown,
}

/// IPC response from daemon to CLI
#[derive(Serialize, Deserialize, Debug)]
pub enum IpcResponse {
    Status {
        running: bool,
        paused: bool,
        phase: String,
        current_app: Option<String>,
        current_title: Option<String>,
        session_duration: u64,
        idle_threshold_seconds: u32,
    },
    Shutdown,
}

#[derive(Debug)]
pub struct IpcClient {
    sock_path: PathBuf,
}

impl IpcClient {
    #[must_use]
    pub fn new(sock_path: &Path) -> Self {
        Self {
            sock_path: sock_path.to_path_buf(),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the daemon socket cannot be reached or the
    /// response cannot be decoded.
    pub async fn send_command(&self, request: IpcRequest) -> Result<IpcResponse> {
        let mut stream = UnixStream::connect(&self.sock_path).await?;

        let encoded = bincode::serialize(&request)?;
        stream.write_all(&encoded).await?;
        stream.shutdown().await?;

        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer).await?;
        let response: IpcResponse = bincode::deserialize(&buffer)?;

        Ok(response)
    }
}

/// Point-in-time view of the tracker, refreshed by the daemon each tick
#[derive(Debug, Clone, Default)]
pub struct TrackerSnapshot {
    pub paused: bool,
    pub phase: String,
    pub current_app: Option<String>,
    pub current_title: Option<String>,
    pub session_start: Option<chrono::DateTime<chrono::Utc>>,
    pub idle_threshold_seconds: u32,
}

pub struct DaemonIpcHandler {
    snapshot: Arc<Mutex<TrackerSnapshot>>,
    shutdown_signal: Arc<std::sync::atomic::AtomicBool>,
    shutdown_notify: Notify,
}

impl DaemonIpcHandler {
    #[must_use]
    pub fn new(shutdown_signal: Arc<std::sync::atomic::AtomicBool>) -> Self {
        Self {
            snapshot: Arc::new(Mutex::new(TrackerSnapshot::default())),
            shutdown_signal,
            shutdown_notify: Notify::new(),
        }
    }

    pub async fn update_snapshot(&self, snapshot: TrackerSnapshot) {
        let mut lock = self.snapshot.lock().await;
        *lock = snapshot;
    }

    /// Completes once a shutdown request has arrived over the socket. A
    /// request received while the loop is mid-tick is held as a permit,
    /// not lost.
    pub async fn shutdown_requested(&self) {
        self.shutdown_notify.notified().await;
    }

    /// # Errors
    ///
    /// Returns an error if the response cannot be written to the stream.
    pub async fn handle(&self, stream: &mut UnixStream, request: IpcRequest) -> Result<()> {
        let response = match request {
            IpcRequest::Status => {
                let snapshot = self.snapshot.lock().await;
                let duration = snapshot.session_start.map_or(0, |start| {
                    chrono::Utc::now()
                        .signed_duration_since(start)
                        .num_seconds()
                        .max(0)
                });

                IpcResponse::Status {
                    running: true,
                    paused: snapshot.paused,
                    phase: snapshot.phase.clone(),
                    current_app: snapshot.current_app.clone(),
                    current_title: snapshot.current_title.clone(),
                    session_duration: duration as u64,
                    idle_threshold_seconds: snapshot.idle_threshold_seconds,
                }
            }
            IpcRequest::Shutdown => {
                self.shutdown_signal.store(true, Ordering::SeqCst);
                IpcResponse::Shutdown
            }
        };

        let encoded = bincode::serialize(&response)?;
        let sent = stream.write_all(&encoded).await;
        // Wake the run loop only after the ack is on the wire; the wake
        // must still follow the flag even when the write fails
        if matches!(response, IpcResponse::Shutdown) {
            self.shutdown_notify.notify_one();
        }
        sent?;
        Ok(())
    }
}

/// # Errors
///
/// Returns an error if the socket cannot be bound.
pub async fn listen(handler: Arc<DaemonIpcHandler>, sock_path: &Path) -> io::Result<()> {
    if sock_path.exists() {
        fs::remove_file(sock_path)?;
    }
    let listener = UnixListener::bind(sock_path)?;

    loop {
        match listener.accept().await {
            Ok((mut stream, _)) => {
                let handler = handler.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0; 1024];
                    match stream.read(&mut buf).await {
                        Ok(n) if n > 0 => match bincode::deserialize::<IpcRequest>(&buf[..n]) {
                            Ok(request) => {
                                if let Err(e) = handler.handle(&mut stream, request).await {
                                    log::error!("IPC handle error: {e}");
                                }
                            }
                            Err(e) => {
                                log::error!("IPC deserialize error: {e}");
                            }
                        },
                        Ok(_) => {} // Connection closed
                        Err(e) => {
                            log::error!("IPC read error: {e}");
                        }
                    }
                });
            }
            Err(e) => {
                log::error!("IPC accept error: {e}");
            }
        }
    }
}
