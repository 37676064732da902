//! Shutdown monitor integration tests
//!
//! Exercises the full warning -> countdown -> shutdown protocol against a
//! real status file, with recording notification/shutdown ports.
//!
//! Run with: `cargo test --test monitor_countdown`

use std::sync::{Arc, Mutex};
use std::time::Duration;

use urja_guard::config::MonitorConfig;
use urja_guard::monitor::{
    Condition, MonitorLoop, MonitorState, NotificationPort, PollOutcome, ShutdownPort, Thresholds,
    Urgency,
};
use urja_guard::status::{BatteryFields, StatusRecord};

#[derive(Clone, Default)]
struct RecordingNotifier {
    messages: Arc<Mutex<Vec<(String, String, Urgency)>>>,
}

impl NotificationPort for RecordingNotifier {
    fn notify(&self, title: &str, message: &str, urgency: Urgency, _timeout_secs: u64) {
        self.messages
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string(), urgency));
    }
}

#[derive(Clone, Default)]
struct RecordingShutdown {
    invocations: Arc<Mutex<u32>>,
}

impl ShutdownPort for RecordingShutdown {
    fn shutdown(&self) -> urja_guard::Result<()> {
        *self.invocations.lock().unwrap() += 1;
        Ok(())
    }
}

struct Harness {
    monitor: MonitorLoop<RecordingNotifier, RecordingShutdown>,
    notifier: RecordingNotifier,
    shutdown: RecordingShutdown,
    dir: tempfile::TempDir,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let notifier = RecordingNotifier::default();
    let shutdown = RecordingShutdown::default();
    let mut monitor = MonitorLoop::new(
        MonitorConfig::default(),
        Thresholds::default(),
        dir.path().join("battery_status.json"),
        notifier.clone(),
        shutdown.clone(),
    );
    monitor.set_tick_interval(Duration::from_millis(0));
    Harness {
        monitor,
        notifier,
        shutdown,
        dir,
    }
}

fn publish(harness: &Harness, voltage: f64, percent: f64, timestamp: u64) {
    StatusRecord {
        battery: BatteryFields {
            voltage,
            percent_user: percent,
            percent_raw: percent,
            timestamp,
            charging: Some(false),
            ..Default::default()
        },
    }
    .publish(&harness.dir.path().join("battery_status.json"))
    .unwrap();
}

#[test]
fn test_warning_then_critical_then_shutdown() {
    let mut h = harness();

    // Healthy: quiet monitoring
    publish(&h, 3.9, 70.0, 1000);
    assert_eq!(h.monitor.poll_once(1000), PollOutcome::Continue);
    assert_eq!(h.monitor.state(), MonitorState::Monitoring);
    assert!(h.notifier.messages.lock().unwrap().is_empty());

    // Warning band: one notification
    publish(&h, 3.28, 40.0, 1030);
    assert_eq!(h.monitor.poll_once(1030), PollOutcome::Continue);
    assert_eq!(h.monitor.state(), MonitorState::Warning);
    assert_eq!(h.notifier.messages.lock().unwrap().len(), 1);

    // Critical band: countdown starts and runs to shutdown
    publish(&h, 3.15, 30.0, 1060);
    let PollOutcome::StartCountdown(trigger) = h.monitor.poll_once(1060) else {
        panic!("expected countdown start");
    };
    assert_eq!(trigger, Condition::CriticalVoltage);
    h.monitor.run_countdown(trigger);

    assert_eq!(h.monitor.state(), MonitorState::Shutdown);
    assert_eq!(*h.shutdown.invocations.lock().unwrap(), 1);

    let messages = h.notifier.messages.lock().unwrap();
    // Warning + initial alert + reminders (15,10,5..1) + final alert
    assert_eq!(messages.len(), 1 + 1 + 7 + 1);
    assert!(messages[1].1.contains("15 seconds"));
    assert_eq!(messages.last().unwrap().0, "SHUTTING DOWN NOW");
}

#[test]
fn test_countdown_fires_on_schedule_despite_read_failures() {
    let mut h = harness();
    publish(&h, 4.0, 0.5, 2000); // critical percent
    let PollOutcome::StartCountdown(trigger) = h.monitor.poll_once(2000) else {
        panic!("expected countdown start");
    };
    assert_eq!(trigger, Condition::CriticalPercentage);

    // Status becomes garbage mid-countdown; the countdown must not consult it
    std::fs::write(h.dir.path().join("battery_status.json"), b"{broken").unwrap();
    h.monitor.run_countdown(trigger);

    assert_eq!(h.monitor.state(), MonitorState::Shutdown);
    assert_eq!(*h.shutdown.invocations.lock().unwrap(), 1);

    // Exactly the configured cadence: initial + 7 reminders + final
    let messages = h.notifier.messages.lock().unwrap();
    assert_eq!(messages.len(), 9);
}

#[test]
fn test_validator_flagged_reading_never_starts_countdown() {
    use urja_guard::status::ValidationInfo;
    let mut h = harness();
    // Critical-looking values, but the acquisition side already flagged the
    // sample as a glitch (one bad reading, below the recovery threshold).
    StatusRecord {
        battery: BatteryFields {
            voltage: 2.60,
            percent_user: 1.0,
            percent_raw: 1.0,
            timestamp: 1000,
            charging: Some(false),
            validation: Some(ValidationInfo {
                bad: true,
                reasons: vec!["sudden voltage change 3.19V -> 2.60V".to_string()],
            }),
            ..Default::default()
        },
    }
    .publish(&h.dir.path().join("battery_status.json"))
    .unwrap();

    assert_eq!(h.monitor.poll_once(1000), PollOutcome::Continue);
    assert_eq!(h.monitor.state(), MonitorState::Monitoring);
    assert!(h.notifier.messages.lock().unwrap().is_empty());

    // The next accepted reading at the same values does start the countdown
    publish(&h, 2.60, 1.0, 1030);
    assert!(matches!(
        h.monitor.poll_once(1030),
        PollOutcome::StartCountdown(Condition::CriticalVoltage)
    ));
}

#[test]
fn test_critical_latch_is_single_shot() {
    let mut h = harness();
    publish(&h, 3.1, 50.0, 1000);
    assert!(matches!(
        h.monitor.poll_once(1000),
        PollOutcome::StartCountdown(_)
    ));
    // Subsequent polls never re-arm, whatever the record says
    publish(&h, 3.0, 0.0, 1030);
    assert_eq!(h.monitor.poll_once(1030), PollOutcome::Continue);
    assert_eq!(h.monitor.poll_once(1060), PollOutcome::Continue);
}

#[test]
fn test_improving_reading_does_not_exist_for_countdown() {
    // Once triggered, a recovered battery cannot cancel the countdown:
    // run_countdown never reads status, so publish a healthy record first
    // and verify shutdown still happens.
    let mut h = harness();
    publish(&h, 3.1, 50.0, 1000);
    let PollOutcome::StartCountdown(trigger) = h.monitor.poll_once(1000) else {
        panic!("expected countdown start");
    };
    publish(&h, 4.1, 95.0, 1001); // battery "recovers"
    h.monitor.run_countdown(trigger);
    assert_eq!(*h.shutdown.invocations.lock().unwrap(), 1);
}

#[test]
fn test_unreadable_and_stale_status_keep_monitoring() {
    let mut h = harness();
    // No file at all
    assert_eq!(h.monitor.poll_once(1000), PollOutcome::Continue);
    assert_eq!(h.monitor.state(), MonitorState::Monitoring);

    // Critical values but stale beyond the age limit: still OK
    publish(&h, 3.0, 0.0, 1000);
    let stale_now = 1000 + MonitorConfig::default().status_max_age_secs + 60;
    assert_eq!(h.monitor.poll_once(stale_now), PollOutcome::Continue);
    assert_eq!(h.monitor.state(), MonitorState::Monitoring);

    // Error-flagged record: still OK
    StatusRecord::from_error("gauge offline".to_string(), stale_now)
        .publish(&h.dir.path().join("battery_status.json"))
        .unwrap();
    assert_eq!(h.monitor.poll_once(stale_now), PollOutcome::Continue);
    assert!(h.notifier.messages.lock().unwrap().is_empty());
}
