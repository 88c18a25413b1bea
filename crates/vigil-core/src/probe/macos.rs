use anyhow::Result;
use async_trait::async_trait;
use cocoa::base::{id, nil};
use cocoa::foundation::NSAutoreleasePool;
use objc::{class, msg_send, sel, sel_impl};
use tokio::process::Command;

use super::{ForegroundProbe, ForegroundWindow};

// CoreGraphics bindings for idle time detection
#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGEventSourceSecondsSinceLastEventType(source_state_id: u32, event_type: u32) -> f64;
}

// CGEventSourceStateID
const K_CG_EVENT_SOURCE_STATE_COMBINED_SESSION_STATE: u32 = 0;

// CGEventType - we check for any HID (Human Interface Device) event
const K_CG_ANY_INPUT_EVENT_TYPE: u32 = u32::MAX; // kCGAnyInputEventType

pub struct MacOSProbe;

impl MacOSProbe {
    /// Create a new macOS probe
    ///
    /// # Errors
    ///
    /// Currently always succeeds, but returns `Result` for consistency with other platforms
    pub fn new() -> Result<Self> {
        Ok(Self)
    }

    /// Time since the last keyboard/mouse/trackpad event, via CoreGraphics
    fn system_idle_seconds() -> f64 {
        unsafe {
            CGEventSourceSecondsSinceLastEventType(
                K_CG_EVENT_SOURCE_STATE_COMBINED_SESSION_STATE,
                K_CG_ANY_INPUT_EVENT_TYPE,
            )
        }
    }

    fn frontmost_app() -> Option<ForegroundWindow> {
        unsafe {
            let _pool = NSAutoreleasePool::new(nil);

            let workspace: id = msg_send![class!(NSWorkspace), sharedWorkspace];
            let frontmost_app: id = msg_send![workspace, frontmostApplication];

            if frontmost_app == nil {
                return None;
            }

            let app_name: id = msg_send![frontmost_app, localizedName];
            let app_name = if app_name.is_null() {
                String::from("Unknown")
            } else {
                let bytes: *const u8 = msg_send![app_name, UTF8String];
                let len: usize = msg_send![app_name, length];
                let slice = std::slice::from_raw_parts(bytes, len);
                String::from_utf8_lossy(slice).to_string()
            };

            Some(ForegroundWindow {
                app_name,
                window_title: String::new(),
            })
        }
    }
}

#[async_trait]
impl ForegroundProbe for MacOSProbe {
    async fn foreground_window(&self) -> Result<Option<ForegroundWindow>> {
        // AppleScript reads the name and window title from the same frontmost
        // process, so the pair cannot be torn across two separate queries
        let script = r#"
            tell application "System Events"
                set frontProc to first application process whose frontmost is true
                set appName to name of frontProc
                try
                    set winTitle to name of first window of frontProc
                on error
                    set winTitle to ""
                end try
                return appName & "|" & winTitle
            end tell
        "#;

        let output = Command::new("osascript")
            .arg("-e")
            .arg(script)
            .output()
            .await;

        if let Ok(output) = output {
            if output.status.success() {
                let result = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if let Some((app_name, window_title)) = result.split_once('|') {
                    if !app_name.is_empty() {
                        return Ok(Some(ForegroundWindow {
                            app_name: app_name.to_string(),
                            window_title: window_title.to_string(),
                        }));
                    }
                }
            }
        }

        // Fallback to NSWorkspace if AppleScript fails (no Automation
        // permission); the window title is lost but the app identity survives
        Ok(Self::frontmost_app())
    }

    async fn idle_seconds(&self) -> Result<f64> {
        Ok(Self::system_idle_seconds())
    }
}
