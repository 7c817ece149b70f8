//! Irrigation pump relay driver.
//!
//! The pump is switched through an active-low relay on
//! [`pins::PUMP_RELAY_GPIO`].  The pump needs a warm-up period to build
//! pressure before any valve may open, so the driver remembers when it
//! was switched on and answers "is the pump ready?" from uptime alone.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the relay GPIO via hw_init helpers.
//! On host/test: tracks state in-memory only.

use crate::drivers::hw_init;
use crate::pins;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    Off,
    /// Running since the given uptime (ms).
    On { since_ms: u64 },
}

pub struct PumpDriver {
    state: PumpState,
}

impl PumpDriver {
    pub fn new() -> Self {
        Self { state: PumpState::Off }
    }

    /// Switch the relay.  Switching on while already on keeps the original
    /// start time, so warm-up is not restarted.
    pub fn set(&mut self, on: bool, now_ms: u64) {
        match (on, self.state) {
            (true, PumpState::On { .. }) => return,
            (true, PumpState::Off) => self.state = PumpState::On { since_ms: now_ms },
            (false, _) => self.state = PumpState::Off,
        }
        self.set_relay_hw(on);
    }

    fn set_relay_hw(&self, on: bool) {
        // Active low.
        hw_init::gpio_write(pins::PUMP_RELAY_GPIO, !on);
    }

    pub fn state(&self) -> PumpState {
        self.state
    }

    pub fn is_on(&self) -> bool {
        matches!(self.state, PumpState::On { .. })
    }

    pub fn switched_on_at_ms(&self) -> Option<u64> {
        match self.state {
            PumpState::On { since_ms } => Some(since_ms),
            PumpState::Off => None,
        }
    }

    /// True once the pump has been on for at least `warmup_ms`.
    pub fn is_ready(&self, now_ms: u64, warmup_ms: u64) -> bool {
        match self.state {
            PumpState::On { since_ms } => now_ms.saturating_sub(since_ms) >= warmup_ms,
            PumpState::Off => false,
        }
    }
}

impl Default for PumpDriver {
    fn default() -> Self {
        Self::new()
    }
}
