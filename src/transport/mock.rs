//! Mock register bus for testing

use super::RegisterBus;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock register bus for unit testing
///
/// Holds registers in chip order (no wire swap), records every write, and
/// can inject faults on specific registers.
#[derive(Clone)]
pub struct MockBus {
    inner: Arc<Mutex<MockBusInner>>,
}

struct MockBusInner {
    registers: HashMap<u8, u16>,
    writes: Vec<(u8, u16)>,
    failing_reads: HashMap<u8, &'static str>,
    fail_all: Option<&'static str>,
}

impl MockBus {
    /// Create a new mock bus with no registers populated
    pub fn new() -> Self {
        MockBus {
            inner: Arc::new(Mutex::new(MockBusInner {
                registers: HashMap::new(),
                writes: Vec::new(),
                failing_reads: HashMap::new(),
                fail_all: None,
            })),
        }
    }

    /// Set a register value (chip order)
    pub fn set_register(&self, reg: u8, value: u16) {
        let mut inner = self.inner.lock().unwrap();
        inner.registers.insert(reg, value);
    }

    /// Get the current value of a register
    pub fn register(&self, reg: u8) -> Option<u16> {
        let inner = self.inner.lock().unwrap();
        inner.registers.get(&reg).copied()
    }

    /// All writes seen so far, in order
    pub fn writes(&self) -> Vec<(u8, u16)> {
        let inner = self.inner.lock().unwrap();
        inner.writes.clone()
    }

    /// Make reads of one register fail with the given message
    pub fn fail_read(&self, reg: u8, message: &'static str) {
        let mut inner = self.inner.lock().unwrap();
        inner.failing_reads.insert(reg, message);
    }

    /// Make every access fail until cleared
    pub fn fail_all(&self, message: &'static str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_all = Some(message);
    }

    /// Clear all injected faults
    pub fn clear_faults(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.failing_reads.clear();
        inner.fail_all = None;
    }
}

impl RegisterBus for MockBus {
    fn read_word(&mut self, reg: u8) -> Result<u16> {
        let inner = self.inner.lock().unwrap();
        if let Some(msg) = inner.fail_all {
            return Err(Error::TransportFault(msg));
        }
        if let Some(msg) = inner.failing_reads.get(&reg) {
            return Err(Error::TransportFault(msg));
        }
        Ok(inner.registers.get(&reg).copied().unwrap_or(0))
    }

    fn write_word(&mut self, reg: u8, value: u16) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(msg) = inner.fail_all {
            return Err(Error::TransportFault(msg));
        }
        inner.registers.insert(reg, value);
        inner.writes.push((reg, value));
        Ok(())
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}
