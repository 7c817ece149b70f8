//! Concrete state handler functions and table builder.
//!
//! Each state is defined by three plain `fn` pointers: no closures, no
//! dynamic dispatch, no heap.
//!
//! ```text
//!  IDLE ──[clock == schedule | start()]──▶ AWAITING_PUMP  (pump on)
//!    ▲                                        │
//!    │                                   [pump ready]
//!    │                                        ▼
//!    │                 ┌──[next step]── RUNNING(i)  (valve mask)
//!    │                 └──────────────────▶ │
//!    │                                 [no next step]
//!    │                                        ▼
//!    └────────[same tick]──────────────── FINISHED  (all off)
//!
//!  stop(): any active state ──▶ FINISHED
//! ```

use super::context::{Effect, RunContext};
use super::{StateDescriptor, StateId};
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
            fall_through: None,
        },
        // Index 1: AwaitingPump
        StateDescriptor {
            id: StateId::AwaitingPump,
            name: "AwaitingPump",
            on_enter: Some(awaiting_enter),
            on_exit: None,
            on_update: awaiting_update,
            fall_through: None,
        },
        // Index 2: Running
        StateDescriptor {
            id: StateId::Running,
            name: "Running",
            on_enter: Some(running_enter),
            on_exit: None,
            on_update: running_update,
            fall_through: None,
        },
        // Index 3: Finished
        StateDescriptor {
            id: StateId::Finished,
            name: "Finished",
            on_enter: Some(finished_enter),
            on_exit: None,
            on_update: finished_update,
            fall_through: Some(StateId::Idle),
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut RunContext) {
    ctx.reset_run();
    info!("IDLE: next run at {}", ctx.schedule);
}

fn idle_update(ctx: &mut RunContext) -> Option<StateId> {
    if !ctx.schedule_due() {
        ctx.armed = true;
        return None;
    }
    // A run that finishes inside its own trigger minute must not restart.
    if !ctx.armed {
        return None;
    }
    ctx.armed = false;
    info!("IDLE: schedule {} reached", ctx.schedule);
    Some(StateId::AwaitingPump)
}

// ═══════════════════════════════════════════════════════════════════════════
//  AWAITING_PUMP state: pump on, valves closed until warm-up completes
// ═══════════════════════════════════════════════════════════════════════════

fn awaiting_enter(ctx: &mut RunContext) {
    ctx.cursor = 0;
    ctx.active = None;
    ctx.remaining_minutes = 0;
    ctx.pump_primed = false;
    ctx.emit(Effect::PumpOn);
    info!("AWAITING_PUMP: pump on, waiting for warm-up");
}

fn awaiting_update(ctx: &mut RunContext) -> Option<StateId> {
    if ctx.pump_ready {
        if ctx.steps.get(0).is_some() {
            return Some(StateId::Running);
        }
        info!("AWAITING_PUMP: pump ready but no steps configured");
        return Some(StateId::Finished);
    }

    if let Some(limit) = ctx.pump_wait_timeout {
        if ctx.ticks_in_state >= u64::from(limit) {
            warn!(
                "AWAITING_PUMP: pump not ready after {} min, aborting run",
                ctx.ticks_in_state
            );
            return Some(StateId::Finished);
        }
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  RUNNING state: one step's valves open, counting down
// ═══════════════════════════════════════════════════════════════════════════

fn running_enter(ctx: &mut RunContext) {
    ctx.pump_primed = true;
    match ctx.steps.get(ctx.cursor).copied() {
        Some(step) => {
            ctx.active = Some(step);
            ctx.remaining_minutes = step.duration_minutes;
            ctx.emit(Effect::ValveMask(step.valves));
            info!(
                "RUNNING: step {} opens {} for {} min",
                ctx.cursor + 1,
                step.valves,
                step.duration_minutes
            );
        }
        None => {
            // Handlers only enter Running with a populated slot.
            warn!("RUNNING: step {} vanished before activation", ctx.cursor + 1);
            ctx.active = None;
            ctx.remaining_minutes = 0;
        }
    }
}

fn running_update(ctx: &mut RunContext) -> Option<StateId> {
    // The activating tick counts as the step's first minute.
    ctx.remaining_minutes = ctx.remaining_minutes.saturating_sub(1);
    if ctx.active.is_some() && ctx.remaining_minutes > 1 {
        return None;
    }

    ctx.cursor += 1;
    if ctx.steps.get(ctx.cursor).is_some() {
        Some(StateId::Running)
    } else {
        Some(StateId::Finished)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  FINISHED state: transient, shuts everything and folds back to Idle
// ═══════════════════════════════════════════════════════════════════════════

fn finished_enter(ctx: &mut RunContext) {
    ctx.emit(Effect::AllOff);
    ctx.pump_primed = false;
    ctx.active = None;
    ctx.remaining_minutes = 0;
    info!("FINISHED: pump off, all valves closed");
}

fn finished_update(_ctx: &mut RunContext) -> Option<StateId> {
    Some(StateId::Idle)
}
