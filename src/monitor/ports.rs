//! Notification and shutdown ports
//!
//! The monitor never renders a warning itself and never inspects a
//! notification outcome; transports are injected behind these traits and
//! are fire-and-forget. The shutdown port wraps the one privileged action
//! the monitor may take.

use crate::error::{Error, Result};
use std::process::{Command, Stdio};

/// Urgency of an outgoing alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Warning,
    Critical,
}

/// Outbound user-notification transport
///
/// Implementations must not block the caller; a slow or failing transport
/// must never delay a countdown tick.
pub trait NotificationPort: Send {
    fn notify(&self, title: &str, message: &str, urgency: Urgency, timeout_secs: u64);
}

/// Notifier that only writes to the log; the failure-tolerant default
pub struct LogNotifier;

impl NotificationPort for LogNotifier {
    fn notify(&self, title: &str, message: &str, urgency: Urgency, _timeout_secs: u64) {
        match urgency {
            Urgency::Warning => log::warn!("{}: {}", title, message),
            Urgency::Critical => log::error!("{}: {}", title, message),
        }
    }
}

/// Broadcasts to all logged-in terminals via `wall`, spawned and forgotten
pub struct WallNotifier;

impl NotificationPort for WallNotifier {
    fn notify(&self, title: &str, message: &str, urgency: Urgency, _timeout_secs: u64) {
        match urgency {
            Urgency::Warning => log::warn!("{}: {}", title, message),
            Urgency::Critical => log::error!("{}: {}", title, message),
        }
        // Fire-and-forget for the caller; the child is reaped off-thread so
        // a slow broadcast never delays a countdown tick and the resident
        // monitor does not accumulate zombies.
        match Command::new("wall")
            .arg(message)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(mut child) => {
                std::thread::spawn(move || {
                    let _ = child.wait();
                });
            }
            Err(e) => log::debug!("wall broadcast unavailable: {}", e),
        }
    }
}

/// The privileged shutdown action, executed at most once per countdown
pub trait ShutdownPort: Send {
    fn shutdown(&self) -> Result<()>;
}

/// Issues the system halt command
pub struct SystemShutdown;

impl ShutdownPort for SystemShutdown {
    fn shutdown(&self) -> Result<()> {
        log::error!("Issuing system shutdown");
        let status = Command::new("shutdown").args(["-h", "now"]).status()?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::Other(format!("shutdown command exited with {}", status)))
        }
    }
}
