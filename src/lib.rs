//! Urja-Guard - Battery protection daemon for fuel-gauge monitored
//! single-board computers
//!
//! Reads a battery fuel gauge over I2C, filters out the sensor glitches
//! this chip family is prone to, recovers the chip when it misbehaves, and
//! drives a layered alert/shutdown protocol as the battery approaches
//! depletion.
//!
//! Two execution domains share nothing but the published status record:
//!
//! - the **acquisition cycle** (`acquire`): oneshot, timer-driven — read,
//!   validate, recover, publish, exit
//! - the **monitor loop** (`monitor`): resident — poll the record, warn,
//!   and own the irreversible shutdown countdown

pub mod acquisition;
pub mod charging;
pub mod config;
pub mod error;
pub mod gauge;
pub mod monitor;
pub mod recovery;
pub mod status;
pub mod transport;
pub mod validate;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Error, Result};
pub use gauge::{BatteryReading, ChipProfile, ChipVariant, FuelGauge};
pub use monitor::{Condition, MonitorLoop, MonitorState, Thresholds};
pub use status::StatusRecord;
