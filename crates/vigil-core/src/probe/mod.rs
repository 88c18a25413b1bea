use anyhow::Result;
use async_trait::async_trait;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "macos")]
pub mod macos;

/// Identity of the frontmost window as reported by the OS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundWindow {
    pub app_name: String,
    pub window_title: String,
}

/// Probe trait for platform-specific foreground and input queries
#[async_trait]
pub trait ForegroundProbe: Send + Sync {
    /// Identify the currently focused application window
    async fn foreground_window(&self) -> Result<Option<ForegroundWindow>>;

    /// Seconds since the last keyboard or pointer event
    async fn idle_seconds(&self) -> Result<f64>;
}

/// Create the probe for the current platform
///
/// # Errors
///
/// Returns an error if the current platform is not supported or if probe initialization fails
pub fn create_probe() -> Result<Box<dyn ForegroundProbe>> {
    #[cfg(target_os = "macos")]
    {
        Ok(Box::new(macos::MacOSProbe::new()?))
    }

    #[cfg(target_os = "linux")]
    {
        Ok(Box::new(linux::LinuxProbe::new()?))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        anyhow::bail!("Unsupported platform")
    }
}
