//! Watering task scheduler.
//!
//! Owns the program (schedule time + step list), the run state and the
//! actuator gateway.  The main loop calls [`Scheduler::tick`] once per
//! minute with the local wall-clock reading; each call runs at most one
//! state transition and issues at most one actuator effect.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  TickFlag (timer ISR) ──▶ main loop ──▶ AppService.tick()    │
//! │                                            │                 │
//! │                                            ▼                 │
//! │                               Scheduler.tick(hour, minute)   │
//! │                                            │                 │
//! │                      ┌─────────────────────┤                 │
//! │                      ▼                     ▼                 │
//! │              Fsm + RunContext        ActuatorPort (owned)    │
//! │             (state transition)     set_valve_mask / set_pump │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Because the scheduler owns the gateway, nothing else can write valve
//! or pump state behind a running program; manual overrides go through
//! [`Scheduler::manual_valves`] and [`Scheduler::manual_pump`], which stop
//! the program first.

use core::fmt::Write as _;

use log::info;

use crate::app::ports::ActuatorPort;
use crate::error::ScheduleError;
use crate::fsm::context::{Effect, RunContext};
use crate::fsm::{Fsm, StateId, states};
use crate::program::{ProgramSnapshot, ScheduleTime, StepDefinition, ValveMask};

/// Capacity of a rendered status line.
pub const STATUS_LINE_LEN: usize = 64;

/// The scheduler engine.
pub struct Scheduler<G: ActuatorPort> {
    fsm: Fsm,
    ctx: RunContext,
    gateway: G,
    /// Last pump command sent to the gateway.
    pump_commanded: bool,
    /// Last valve mask sent to the gateway.
    valves: ValveMask,
}

impl<G: ActuatorPort> Scheduler<G> {
    /// Build an idle scheduler around `gateway` running `program`.
    ///
    /// `pump_wait_timeout` bounds the wait for pump readiness in ticks;
    /// `None` waits indefinitely.
    pub fn new(gateway: G, program: ProgramSnapshot, pump_wait_timeout: Option<u16>) -> Self {
        let mut ctx = RunContext::new(program.steps, program.schedule, pump_wait_timeout);
        let mut fsm = Fsm::new(states::build_state_table(), StateId::Idle);
        fsm.start(&mut ctx);
        Self {
            fsm,
            ctx,
            gateway,
            pump_commanded: false,
            valves: ValveMask::CLOSED,
        }
    }

    // ── Clock-driven operation ───────────────────────────────

    /// Advance by one tick using the current local time.
    ///
    /// Returns the effect that was applied to the gateway, if any.
    pub fn tick(&mut self, hour: u8, minute: u8) -> Option<Effect> {
        self.ctx.now = Some((hour, minute));
        self.ctx.pump_ready =
            self.fsm.current_state() == StateId::AwaitingPump && self.gateway.is_pump_ready();
        self.fsm.tick(&mut self.ctx);
        self.ctx.now = None;
        self.apply_effect()
    }

    // ── Commands ─────────────────────────────────────────────

    /// Start the program now, ignoring the schedule time.
    ///
    /// Returns `false` (and does nothing) if a run is already in progress.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        info!("Scheduler: manual start");
        self.fsm.force_transition(StateId::AwaitingPump, &mut self.ctx);
        self.apply_effect();
        true
    }

    /// Abort the current run: pump off, all valves closed, back to idle.
    ///
    /// Returns `false` (and does nothing) when already idle.
    pub fn stop(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        info!("Scheduler: stop requested");
        self.fsm.force_transition(StateId::Finished, &mut self.ctx);
        self.apply_effect();
        true
    }

    /// Replace one step slot.  The active step keeps running as captured.
    pub fn set_step(
        &mut self,
        index: usize,
        step: Option<StepDefinition>,
    ) -> Result<(), ScheduleError> {
        self.ctx.steps.set(index, step)?;
        match step {
            Some(s) => info!(
                "Scheduler: step {} = {} for {} min",
                index + 1,
                s.valves,
                s.duration_minutes
            ),
            None => info!("Scheduler: step {} cleared", index + 1),
        }
        Ok(())
    }

    /// Change the daily start time.
    pub fn set_schedule(&mut self, hour: u8, minute: u8) -> Result<(), ScheduleError> {
        let schedule = ScheduleTime::new(hour, minute)?;
        self.ctx.schedule = schedule;
        info!("Scheduler: daily start at {}", schedule);
        Ok(())
    }

    /// Replace the whole program, e.g. after reloading from the step store.
    pub fn load(&mut self, program: ProgramSnapshot) {
        self.ctx.schedule = program.schedule;
        self.ctx.steps = program.steps;
        info!(
            "Scheduler: program loaded, {} steps at {}",
            program.steps.len(),
            program.schedule
        );
    }

    /// Change the pump-readiness timeout; applies from the next wait.
    pub fn set_pump_wait_timeout(&mut self, ticks: Option<u16>) {
        self.ctx.pump_wait_timeout = ticks;
    }

    /// Open exactly `mask` outside of a program run.  Stops a running
    /// program first.
    pub fn manual_valves(&mut self, mask: ValveMask) {
        self.stop();
        info!("Scheduler: manual valves {}", mask);
        self.write_mask(mask);
    }

    /// Switch the pump outside of a program run.  Stops a running program
    /// first.
    pub fn manual_pump(&mut self, on: bool) {
        self.stop();
        info!("Scheduler: manual pump {}", if on { "on" } else { "off" });
        self.write_pump(on);
    }

    // ── Status ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    /// A run is in progress (waiting for the pump or executing a step).
    pub fn is_running(&self) -> bool {
        self.state().is_active()
    }

    /// The pump has reported ready for the current run.  Stays `false`
    /// during warm-up and for manual pump commands.
    pub fn is_pump_on(&self) -> bool {
        self.ctx.pump_primed
    }

    /// Last relay command, whoever issued it.
    pub fn pump_commanded(&self) -> bool {
        self.pump_commanded
    }

    /// Valve mask currently asserted on the gateway.
    pub fn valves(&self) -> ValveMask {
        self.valves
    }

    /// Pump off and every valve closed, whatever the current state.
    pub fn shutdown(&mut self) {
        if !self.stop() {
            self.write_pump(false);
            self.set_mask(ValveMask::CLOSED);
        }
        info!("Scheduler: outputs off");
    }

    /// The step currently executing, as captured at activation.
    pub fn active_step(&self) -> Option<StepDefinition> {
        if self.state() == StateId::Running {
            self.ctx.active
        } else {
            None
        }
    }

    /// Zero-based index of the executing step.
    pub fn active_index(&self) -> Option<usize> {
        self.active_step().map(|_| self.ctx.cursor)
    }

    /// Countdown of the executing step (see [`RunContext::remaining_minutes`]);
    /// `0` when no step is running.
    pub fn minutes_remaining(&self) -> u16 {
        if self.state() == StateId::Running {
            self.ctx.remaining_minutes
        } else {
            0
        }
    }

    pub fn next_scheduled_time(&self) -> ScheduleTime {
        self.ctx.schedule
    }

    /// Current program as held in memory.
    pub fn program(&self) -> ProgramSnapshot {
        ProgramSnapshot {
            schedule: self.ctx.schedule,
            steps: self.ctx.steps,
        }
    }

    /// One-line human-readable summary of what the scheduler is doing.
    pub fn status_line(&self) -> heapless::String<STATUS_LINE_LEN> {
        let mut line = heapless::String::new();
        // Longest rendering is well under capacity.
        let _ = match (self.state(), self.active_index()) {
            (StateId::AwaitingPump, _) => write!(line, "Waiting for pump"),
            (StateId::Running, Some(index)) => write!(
                line,
                "Step {}/{}: {} min left",
                index + 1,
                self.ctx.steps.len(),
                self.ctx.remaining_minutes
            ),
            _ => write!(line, "Waiting for {}", self.ctx.schedule),
        };
        line
    }

    /// Borrow the gateway (test doubles inspect recorded calls this way).
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    // ── Effect application ───────────────────────────────────

    fn apply_effect(&mut self) -> Option<Effect> {
        let effect = self.ctx.take_effect()?;
        match effect {
            Effect::PumpOn => {
                // A manual mask may still be open; the pump is not primed yet.
                if !self.valves.is_closed() {
                    info!("Scheduler: closing manual valves {} for run", self.valves);
                    self.set_mask(ValveMask::CLOSED);
                }
                self.write_pump(true);
            }
            Effect::ValveMask(mask) => self.write_mask(mask),
            Effect::AllOff => {
                self.write_pump(false);
                self.set_mask(ValveMask::CLOSED);
            }
        }
        Some(effect)
    }

    /// Every valve is closed before a new mask is opened.
    fn write_mask(&mut self, mask: ValveMask) {
        self.set_mask(ValveMask::CLOSED);
        if !mask.is_closed() {
            self.set_mask(mask);
        }
    }

    fn set_mask(&mut self, mask: ValveMask) {
        self.valves = mask;
        self.gateway.set_valve_mask(mask);
    }

    fn write_pump(&mut self, on: bool) {
        self.pump_commanded = on;
        self.gateway.set_pump(on);
    }
}
