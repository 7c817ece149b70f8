//! Shared mutable context threaded through every FSM handler.
//!
//! `RunContext` is the single struct that state handlers read from and
//! write to.  The scheduler fills in the per-tick inputs (clock reading,
//! pump readiness) before each tick, handlers update the run state, and
//! at most one [`Effect`] is left behind for the scheduler to apply to the
//! actuator gateway.

use crate::program::{ScheduleTime, StepDefinition, StepList, ValveMask};

// ---------------------------------------------------------------------------
// Effects (written by state handlers; applied by the scheduler)
// ---------------------------------------------------------------------------

/// Actuator effect requested by a state handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Switch the pump on.
    PumpOn,
    /// Close every valve, then open exactly this mask.
    ValveMask(ValveMask),
    /// Pump off and every valve closed.
    AllOff,
}

// ---------------------------------------------------------------------------
// RunContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
#[derive(Debug, Clone)]
pub struct RunContext {
    // -- Program --
    /// Step list; pending steps are read when they are activated.
    pub steps: StepList,
    /// Daily trigger time.
    pub schedule: ScheduleTime,

    // -- Inputs (refreshed before each tick) --
    /// Wall-clock reading for this tick, `None` for a forced transition.
    pub now: Option<(u8, u8)>,
    /// Gateway pump-readiness sample.
    pub pump_ready: bool,
    /// Ticks to wait for the pump before giving up.
    pub pump_wait_timeout: Option<u16>,

    // -- Run state --
    /// Index of the step being (or about to be) executed.
    pub cursor: usize,
    /// Copy of the executing step, taken when it was activated.
    pub active: Option<StepDefinition>,
    /// Step countdown.  Set to the step's duration on activation and
    /// decremented once per tick; the tick that brings it down to 1 moves
    /// on to the next step.  A D-minute step (D >= 2) therefore reads
    /// D, D-1, ..., 2 and never shows 1.
    pub remaining_minutes: u16,
    /// Pump has been confirmed ready for this run.
    pub pump_primed: bool,
    /// Schedule trigger latch; re-armed once the clock leaves the trigger minute.
    pub armed: bool,

    // -- Timing --
    /// Ticks elapsed since the current state was entered.
    pub ticks_in_state: u64,

    effect: Option<Effect>,
}

impl RunContext {
    pub fn new(steps: StepList, schedule: ScheduleTime, pump_wait_timeout: Option<u16>) -> Self {
        Self {
            steps,
            schedule,
            now: None,
            pump_ready: false,
            pump_wait_timeout,
            cursor: 0,
            active: None,
            remaining_minutes: 0,
            pump_primed: false,
            armed: true,
            ticks_in_state: 0,
            effect: None,
        }
    }

    /// Request an actuator effect.  Only one effect may be issued per tick.
    pub fn emit(&mut self, effect: Effect) {
        debug_assert!(
            self.effect.is_none(),
            "second effect {effect:?} in one tick (already {:?})",
            self.effect
        );
        self.effect = Some(effect);
    }

    /// Take the pending effect, leaving none.
    pub fn take_effect(&mut self) -> Option<Effect> {
        self.effect.take()
    }

    /// Clear the run state back to dormant.
    pub fn reset_run(&mut self) {
        self.cursor = 0;
        self.active = None;
        self.remaining_minutes = 0;
        self.pump_primed = false;
    }

    /// Whether this tick's clock reading hits the trigger time.
    pub fn schedule_due(&self) -> bool {
        self.now
            .is_some_and(|(hour, minute)| self.schedule.matches(hour, minute))
    }
}
