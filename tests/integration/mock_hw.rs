//! Mock hardware and storage adapters for integration tests.
//!
//! Records every actuator call so tests can assert on the full command
//! history without touching real GPIO or I²C.

use std::cell::Cell;
use std::collections::HashMap;

use irrigation::app::events::AppEvent;
use irrigation::app::ports::{
    ActuatorPort, ConfigError, ConfigPort, EventSink, StorageError, StoragePort,
};
use irrigation::config::SystemConfig;
use irrigation::program::ValveMask;

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Valves(u16),
    Pump(bool),
}

// ── MockHardware ──────────────────────────────────────────────

/// Gateway whose pump reports ready after `warmup_polls` readiness
/// queries while it is on.
pub struct MockHardware {
    pub calls: Vec<ActuatorCall>,
    warmup_polls: Option<u32>,
    polls: Cell<u32>,
    pump_on: bool,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self::with_warmup(0)
    }

    pub fn with_warmup(polls: u32) -> Self {
        Self {
            calls: Vec::new(),
            warmup_polls: Some(polls),
            polls: Cell::new(0),
            pump_on: false,
        }
    }

    /// A pump that never becomes ready.
    pub fn dead_pump() -> Self {
        Self {
            warmup_polls: None,
            ..Self::new()
        }
    }

    pub fn valves(&self) -> ValveMask {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                ActuatorCall::Valves(bits) => Some(ValveMask::new(*bits)),
                ActuatorCall::Pump(_) => None,
            })
            .unwrap_or(ValveMask::CLOSED)
    }

    pub fn pump_on(&self) -> bool {
        self.pump_on
    }

    /// Non-empty masks in the order they were opened.
    pub fn opened_masks(&self) -> Vec<u16> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                ActuatorCall::Valves(bits) if *bits != 0 => Some(*bits),
                _ => None,
            })
            .collect()
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuatorPort for MockHardware {
    fn set_valve_mask(&mut self, mask: ValveMask) {
        self.calls.push(ActuatorCall::Valves(mask.bits()));
    }

    fn set_pump(&mut self, on: bool) {
        if on && !self.pump_on {
            self.polls.set(0);
        }
        self.pump_on = on;
        self.calls.push(ActuatorCall::Pump(on));
    }

    fn is_pump_ready(&self) -> bool {
        let Some(warmup) = self.warmup_polls else {
            return false;
        };
        if !self.pump_on {
            return false;
        }
        let seen = self.polls.get();
        self.polls.set(seen + 1);
        seen >= warmup
    }
}

// ── MockNvs ───────────────────────────────────────────────────

pub struct MockNvs {
    store: HashMap<String, Vec<u8>>,
    pub fail_writes: bool,
}

#[allow(dead_code)]
impl MockNvs {
    pub fn new() -> Self {
        Self {
            store: HashMap::new(),
            fail_writes: false,
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.store.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for MockNvs {
    fn default() -> Self {
        Self::new()
    }
}

impl StoragePort for MockNvs {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let k = format!("{}::{}", namespace, key);
        match self.store.get(&k) {
            Some(v) if v.len() > buf.len() => Err(StorageError::BufferTooSmall),
            Some(v) => {
                buf[..v.len()].copy_from_slice(v);
                Ok(v.len())
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::IoError);
        }
        let k = format!("{}::{}", namespace, key);
        self.store.insert(k, data.to_vec());
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.store.contains_key(&format!("{}::{}", namespace, key))
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.store.remove(&format!("{}::{}", namespace, key));
        Ok(())
    }
}

impl ConfigPort for MockNvs {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        Ok(SystemConfig::default())
    }

    fn save(&self, _config: &SystemConfig) -> Result<(), ConfigError> {
        Ok(())
    }
}

// ── Event recorder ────────────────────────────────────────────

pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
