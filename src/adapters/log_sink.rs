//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing application events to the ESP-IDF
//! logger (UART / USB-CDC in production).  A network adapter would
//! implement the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::StepStarted { index, step } => {
                info!(
                    "STEP  | #{} valves=[{}] for {} min",
                    index + 1,
                    step.valves,
                    step.duration_minutes
                );
            }
            AppEvent::ProgramFinished => {
                info!("STEP  | program finished, pump and valves off");
            }
            AppEvent::ManualValvesClosed => {
                info!("MANUAL| timed valve override expired");
            }
            AppEvent::Status(s) => {
                info!(
                    "STATUS| {} | state={:?} pump={} next={}",
                    s.line,
                    s.state,
                    if s.pump_on { "on" } else { "off" },
                    s.next_run,
                );
            }
            AppEvent::CommandHandled(r) if r.success => {
                info!("CMD   | {}: {}", r.command, r.message);
            }
            AppEvent::CommandHandled(r) => {
                warn!("CMD   | {} failed: {}", r.command, r.message);
            }
        }
    }
}
