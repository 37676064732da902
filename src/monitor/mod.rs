//! Layered shutdown monitor
//!
//! Resident loop that polls the published status record, applies the
//! layered warning/critical thresholds, and owns the irreversible shutdown
//! countdown. Fails open on monitoring: an unreadable, stale or
//! error-flagged record evaluates as OK — the monitor must keep running
//! through fuel gauge glitches and only act on confirmed readings. Once a
//! countdown starts it is never aborted, by design: a flapping reading near
//! the threshold must not stop a shutdown already underway.

use crate::config::MonitorConfig;
use crate::status::{BatteryFields, StatusRecord};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub mod countdown;
pub mod ports;
pub mod thresholds;

pub use countdown::Countdown;
pub use ports::{LogNotifier, NotificationPort, ShutdownPort, SystemShutdown, Urgency, WallNotifier};
pub use thresholds::{evaluate_condition, Condition, Thresholds};

/// Monitor state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Quiet observation (includes the implicit OK sub-state)
    Monitoring,
    /// A warning condition is active and has been announced
    Warning,
    /// Critical countdown running; terminal-bound
    Countdown,
    /// Shutdown issued; terminal
    Shutdown,
}

/// Outcome of one poll iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Keep monitoring
    Continue,
    /// A critical condition fired for the first time; start the countdown
    StartCountdown(Condition),
}

/// The resident shutdown monitor
///
/// All mutable monitor state (latch, warning timestamp, state machine) lives
/// on this object and is threaded through each poll iteration.
pub struct MonitorLoop<N: NotificationPort, S: ShutdownPort> {
    config: MonitorConfig,
    thresholds: Thresholds,
    status_path: PathBuf,
    notifier: N,
    shutdown_port: S,
    state: MonitorState,
    /// Single-shot latch: at most one countdown per process lifetime
    shutdown_initiated: bool,
    last_warning_at: Option<u64>,
    tick_interval: Duration,
}

impl<N: NotificationPort, S: ShutdownPort> MonitorLoop<N, S> {
    pub fn new(
        config: MonitorConfig,
        thresholds: Thresholds,
        status_path: PathBuf,
        notifier: N,
        shutdown_port: S,
    ) -> Self {
        MonitorLoop {
            config,
            thresholds,
            status_path,
            notifier,
            shutdown_port,
            state: MonitorState::Monitoring,
            shutdown_initiated: false,
            last_warning_at: None,
            tick_interval: Duration::from_secs(1),
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Override the one-second tick for simulation and tests
    pub fn set_tick_interval(&mut self, interval: Duration) {
        self.tick_interval = interval;
    }

    /// Read the published record, failing open.
    ///
    /// Missing, unparsable, error-flagged, validation-flagged or stale
    /// records all evaluate as "nothing actionable" — never shut down on a
    /// reading that is absent or known-suspect.
    fn read_status(&self, now: u64) -> Option<BatteryFields> {
        let record = match StatusRecord::load(&self.status_path) {
            Ok(record) => record,
            Err(e) => {
                log::debug!("Status unreadable: {}", e);
                return None;
            }
        };
        if let Some(error) = &record.battery.error {
            log::debug!("Status carries acquisition error: {}", error);
            return None;
        }
        if let Some(validation) = &record.battery.validation {
            // A flagged sample must never start the irreversible countdown;
            // wait for a reading the validator accepted.
            if validation.bad {
                log::debug!(
                    "Status reading flagged bad ({}), not actionable",
                    validation.reasons.join("; ")
                );
                return None;
            }
        }
        if record.age(now) > self.config.status_max_age_secs {
            log::warn!(
                "Status record stale ({}s old), treating as OK",
                record.age(now)
            );
            return None;
        }
        Some(record.battery)
    }

    /// One poll iteration of the state machine
    pub fn poll_once(&mut self, now: u64) -> PollOutcome {
        if matches!(self.state, MonitorState::Countdown | MonitorState::Shutdown) {
            return PollOutcome::Continue;
        }

        let condition = match self.read_status(now) {
            Some(battery) => evaluate_condition(&battery, &self.thresholds),
            None => Condition::Ok,
        };

        if condition.is_critical() {
            if self.shutdown_initiated {
                // Latched: one countdown per process lifetime
                return PollOutcome::Continue;
            }
            self.shutdown_initiated = true;
            self.state = MonitorState::Countdown;
            log::error!("Critical battery condition: {:?}", condition);
            return PollOutcome::StartCountdown(condition);
        }

        if condition.is_warning() {
            let due = match self.last_warning_at {
                Some(at) => now.saturating_sub(at) >= self.config.renotify_interval_secs,
                None => true,
            };
            if due {
                self.last_warning_at = Some(now);
                self.notifier.notify(
                    "Battery Low",
                    &format!("Battery low ({:?}). Connect the charger soon.", condition),
                    Urgency::Warning,
                    10,
                );
            }
            self.state = MonitorState::Warning;
        } else {
            // Recovered: back to quiet monitoring. A later warning episode
            // starts a fresh rate-limit interval.
            if self.state == MonitorState::Warning {
                log::info!("Battery condition recovered");
                self.last_warning_at = None;
            }
            self.state = MonitorState::Monitoring;
        }

        PollOutcome::Continue
    }

    /// Run the countdown to completion and issue the shutdown.
    ///
    /// Irreversible once entered: status readings are not consulted,
    /// reminders are fire-and-forget, and any failure along the way still
    /// falls through to the shutdown command.
    pub fn run_countdown(&mut self, trigger: Condition) {
        let ticks = self.config.countdown_ticks;
        self.notifier.notify(
            "CRITICAL BATTERY ALERT",
            &format!(
                "Battery critically low! System will shutdown in {} seconds to protect battery. Save your work!",
                ticks
            ),
            Urgency::Critical,
            u64::from(ticks),
        );
        log::error!(
            "Battery critically low ({:?}), shutdown in {} seconds",
            trigger,
            ticks
        );

        let mut countdown = Countdown::new(trigger, ticks);
        while !countdown.is_complete() {
            if let Some(reminder) = countdown.tick() {
                let urgency = if reminder.urgent {
                    Urgency::Critical
                } else {
                    Urgency::Warning
                };
                self.notifier.notify("BATTERY ALERT", &reminder.message, urgency, 5);
            }
            std::thread::sleep(self.tick_interval);
        }

        self.notifier.notify(
            "SHUTTING DOWN NOW",
            "System is shutting down now to protect the battery. Please plug in your device.",
            Urgency::Critical,
            3,
        );
        std::thread::sleep(self.tick_interval * self.config.final_pause_ticks);

        self.state = MonitorState::Shutdown;
        if let Err(e) = self.shutdown_port.shutdown() {
            log::error!("Shutdown command failed: {}", e);
        }
    }

    /// Resident monitor loop: poll, sleep, repeat until `stop` is raised
    /// (typically by a signal handler).
    ///
    /// An active countdown runs to completion regardless of the stop flag;
    /// its timing depends on this process staying resident.
    pub fn run(&mut self, stop: Arc<AtomicBool>) {
        log::info!(
            "Monitor started: poll every {}s, thresholds {:.2}V/{:.2}V {:.0}%/{:.0}%",
            self.config.poll_interval_secs,
            self.thresholds.warning_voltage,
            self.thresholds.critical_voltage,
            self.thresholds.warning_percent,
            self.thresholds.critical_percent,
        );

        while !stop.load(Ordering::Relaxed) {
            let now = epoch_secs();
            if let PollOutcome::StartCountdown(trigger) = self.poll_once(now) {
                self.run_countdown(trigger);
                return;
            }
            if self.state == MonitorState::Shutdown {
                return;
            }
            std::thread::sleep(Duration::from_secs(self.config.poll_interval_secs));
        }
        log::info!("Monitor stopped");
    }
}

/// Current time as epoch seconds
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
