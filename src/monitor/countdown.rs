//! Shutdown countdown state machine
//!
//! Created once when a critical condition fires, ticked once per second by
//! the monitor loop, and irreversible: improving readings or failed status
//! reads never stop it. The loop owns the timing; this machine only decides
//! what each tick emits.

use super::thresholds::Condition;

/// Reminder cadence: every tick inside the final stretch, every Nth before
const FINAL_STRETCH_TICKS: u32 = 5;
const EARLY_REMINDER_EVERY: u32 = 5;

/// An escalating reminder to broadcast on a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub message: String,
    /// Final-stretch reminders are more urgent
    pub urgent: bool,
}

/// One cancellation-free countdown toward shutdown
#[derive(Debug)]
pub struct Countdown {
    trigger: Condition,
    remaining: u32,
}

impl Countdown {
    pub fn new(trigger: Condition, ticks: u32) -> Self {
        Countdown {
            trigger,
            remaining: ticks,
        }
    }

    pub fn trigger(&self) -> Condition {
        self.trigger
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }

    /// Consume one tick; returns the reminder to emit for it, if any.
    ///
    /// The caller sleeps one second per tick; reminders are fire-and-forget
    /// and must never delay the next tick.
    pub fn tick(&mut self) -> Option<Reminder> {
        if self.remaining == 0 {
            return None;
        }
        let n = self.remaining;
        self.remaining -= 1;

        if n <= FINAL_STRETCH_TICKS {
            Some(Reminder {
                message: format!("SHUTTING DOWN IN {} SECONDS!", n),
                urgent: true,
            })
        } else if n % EARLY_REMINDER_EVERY == 0 {
            Some(Reminder {
                message: format!(
                    "Battery critically low! Shutdown in {} seconds - SAVE YOUR WORK!",
                    n
                ),
                urgent: false,
            })
        } else {
            None
        }
    }
}
