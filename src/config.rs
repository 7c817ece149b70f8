//! System configuration parameters
//!
//! Tunable parameters for the irrigation controller, plus the factory
//! watering program used when nothing has been persisted yet.
//! Values can be overridden via NVS (non-volatile storage).

use serde::{Deserialize, Serialize};

use crate::program::{ProgramSnapshot, ScheduleTime, StepDefinition, StepList, ValveMask};

/// Core system configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Pump ---
    /// Minutes the pump must run before valves may open
    pub pump_warmup_minutes: u16,
    /// Abort a run after this many minutes without pump readiness.
    /// `None` waits indefinitely.
    pub pump_wait_timeout_minutes: Option<u16>,

    // --- Reporting ---
    /// Status report interval (minutes, 0 disables periodic reports)
    pub status_interval_minutes: u16,

    // --- Timing ---
    /// Scheduler tick period (seconds)
    pub tick_interval_secs: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            pump_warmup_minutes: 5,
            pump_wait_timeout_minutes: None,
            status_interval_minutes: 10,
            tick_interval_secs: 60, // one tick per minute
        }
    }
}

impl SystemConfig {
    /// Range-check every field.  Values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.pump_warmup_minutes > 60 {
            return Err("pump_warmup_minutes must be 0-60");
        }
        if self.pump_wait_timeout_minutes == Some(0) {
            return Err("pump_wait_timeout_minutes must be > 0");
        }
        if self.status_interval_minutes > 1440 {
            return Err("status_interval_minutes must be 0-1440");
        }
        if !(1..=3600).contains(&self.tick_interval_secs) {
            return Err("tick_interval_secs must be 1-3600");
        }
        Ok(())
    }

    /// Pump warm-up expressed in milliseconds of uptime.
    pub fn pump_warmup_ms(&self) -> u64 {
        u64::from(self.pump_warmup_minutes) * 60_000
    }
}

// Factory program: evening watering of four zone groups.
const DEFAULT_STEPS: [StepDefinition; 4] = [
    StepDefinition::new(ValveMask::new(0x005), 20), // oxo xxx xxx xxx
    StepDefinition::new(ValveMask::new(0x402), 17), // xox xxx xxx xox
    StepDefinition::new(ValveMask::new(0x0C0), 15), // xxx xxx oox xxx
    StepDefinition::new(ValveMask::new(0xA00), 15), // xxx xxx xxx oxo
];

/// Default daily start time.
pub fn default_schedule() -> ScheduleTime {
    ScheduleTime::default()
}

/// Default step list.
pub fn default_steps() -> StepList {
    StepList::from_steps(&DEFAULT_STEPS)
}

/// The program a fresh controller runs.
pub fn default_program() -> ProgramSnapshot {
    ProgramSnapshot {
        schedule: default_schedule(),
        steps: default_steps(),
    }
}
