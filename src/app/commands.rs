//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (MQTT, serial,
//! a local console) that the [`AppService`](super::service::AppService)
//! interprets and acts upon.  Transports decode their own wire format into
//! an [`AppCommand`] and receive a [`CommandResponse`] back.

use core::fmt::Write as _;

use crate::config::SystemConfig;
use crate::program::{StepDefinition, ValveMask};

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Run the program now, regardless of the schedule time.
    StartProgram,

    /// Abort the running program.
    StopProgram,

    /// Open `valves` by hand for `duration_minutes`; `0` closes every valve.
    ValveControl {
        valves: ValveMask,
        duration_minutes: u16,
    },

    /// Switch the pump by hand.
    PumpControl { on: bool },

    /// Change and persist the daily start time.
    SetSchedule { hour: u8, minute: u8 },

    /// Replace (or clear, with `None`) and persist one step slot.
    SetStep {
        index: usize,
        step: Option<StepDefinition>,
    },

    /// Reload schedule and steps from the step store.
    ReloadProgram,

    /// Hot-reload configuration; persisted on the next save check.
    UpdateConfig(SystemConfig),

    /// Report the current status.
    GetStatus,

    /// Stop everything and reboot after `delay_secs` (clamped to 1-60).
    Restart { delay_secs: u8 },
}

impl AppCommand {
    /// Short name used in responses and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartProgram => "start",
            Self::StopProgram => "stop",
            Self::ValveControl { .. } => "valves",
            Self::PumpControl { .. } => "pump",
            Self::SetSchedule { .. } => "schedule",
            Self::SetStep { .. } => "step",
            Self::ReloadProgram => "reload",
            Self::UpdateConfig(_) => "config",
            Self::GetStatus => "status",
            Self::Restart { .. } => "restart",
        }
    }
}

/// Capacity of a response message.
pub const RESPONSE_MESSAGE_LEN: usize = 64;

/// Outcome of a command, handed back to whichever transport sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    pub command: &'static str,
    pub success: bool,
    pub message: heapless::String<RESPONSE_MESSAGE_LEN>,
    /// Set by `Restart`: the main loop reboots after this many seconds.
    pub restart_in_secs: Option<u8>,
}

impl CommandResponse {
    pub fn ok(command: &'static str, message: core::fmt::Arguments<'_>) -> Self {
        Self::new(command, true, message)
    }

    pub fn fail(command: &'static str, message: core::fmt::Arguments<'_>) -> Self {
        Self::new(command, false, message)
    }

    fn new(command: &'static str, success: bool, message: core::fmt::Arguments<'_>) -> Self {
        let mut text = heapless::String::new();
        // Overlong messages are truncated at capacity.
        let _ = text.write_fmt(message);
        Self {
            command,
            success,
            message: text,
            restart_in_secs: None,
        }
    }
}
