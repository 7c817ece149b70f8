//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, publish over MQTT,
//! refresh a display, etc.

use crate::fsm::StateId;
use crate::program::{ScheduleTime, StepDefinition};
use crate::scheduler::STATUS_LINE_LEN;

use super::commands::CommandResponse;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The application service has started (carries initial state).
    Started(StateId),

    /// The scheduler transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// A program step became active.
    StepStarted {
        index: usize,
        step: StepDefinition,
    },

    /// A run ended (completed, stopped or aborted); pump and valves are off.
    ProgramFinished,

    /// A timed manual valve override expired and the valves were closed.
    ManualValvesClosed,

    /// Periodic or requested status snapshot.
    Status(StatusReport),

    /// A command was processed.
    CommandHandled(CommandResponse),
}

/// A point-in-time status snapshot suitable for logging or transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub state: StateId,
    pub running: bool,
    /// Pump ready for the current run (false during warm-up).
    pub pump_on: bool,
    pub active_index: Option<usize>,
    pub active_step: Option<StepDefinition>,
    pub minutes_remaining: u16,
    pub next_run: ScheduleTime,
    pub line: heapless::String<STATUS_LINE_LEN>,
}
