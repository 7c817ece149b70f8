//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the [`Scheduler`] (and through it the actuator
//! gateway), the live configuration and the manual-override countdown.
//! It exposes a clean, hardware-agnostic API.  The step store and event
//! sink are injected at call sites, making the entire service testable
//! with mock adapters.
//!
//! ```text
//!   WallTime ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                │       AppService       │
//! AppCommand ──▶ │  Scheduler · Overrides │ ◀─▶ StepStorePort
//!                └───────────┬────────────┘
//!                            ▼
//!                       ActuatorPort
//! ```

use log::{info, warn};

use crate::config::SystemConfig;
use crate::error::{Error, Result};
use crate::fsm::StateId;
use crate::scheduler::Scheduler;
use crate::program::{ProgramSnapshot, ValveMask};

use super::commands::{AppCommand, CommandResponse};
use super::events::{AppEvent, StatusReport};
use super::ports::{ActuatorPort, ConfigPort, EventSink, StepStorePort, WallTime};

/// Bounds for the restart delay, in seconds.
const RESTART_DELAY_MIN_SECS: u8 = 1;
const RESTART_DELAY_MAX_SECS: u8 = 60;

/// Timed manual valve override.
#[derive(Debug, Clone, Copy)]
struct ManualRun {
    valves: ValveMask,
    remaining_minutes: u16,
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService<G: ActuatorPort> {
    scheduler: Scheduler<G>,
    config: SystemConfig,
    manual: Option<ManualRun>,
    tick_count: u64,
    config_dirty: bool,
}

impl<G: ActuatorPort> AppService<G> {
    /// Construct the service around `gateway`, running `program`.
    pub fn new(config: SystemConfig, gateway: G, program: ProgramSnapshot) -> Self {
        Self {
            scheduler: Scheduler::new(gateway, program, config.pump_wait_timeout_minutes),
            config,
            manual: None,
            tick_count: 0,
            config_dirty: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Started(self.scheduler.state()));
        info!(
            "AppService started, {} steps daily at {}",
            self.scheduler.program().steps.len(),
            self.scheduler.next_scheduled_time()
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one minute of the controller: scheduler, manual countdown,
    /// then events.
    pub fn tick(&mut self, now: WallTime, sink: &mut impl EventSink) {
        self.tick_count += 1;
        let prev_state = self.scheduler.state();
        let prev_index = self.scheduler.active_index();

        self.scheduler.tick(now.hour, now.minute);

        self.tick_manual(sink);
        self.emit_transitions(prev_state, prev_index, sink);

        let interval = u64::from(self.config.status_interval_minutes);
        if interval > 0 && self.tick_count % interval == 0 {
            sink.emit(&AppEvent::Status(self.status()));
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command and report the outcome.
    ///
    /// The response is also emitted as [`AppEvent::CommandHandled`].
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        store: &mut impl StepStorePort,
        sink: &mut impl EventSink,
    ) -> CommandResponse {
        let name = cmd.name();
        let prev_state = self.scheduler.state();
        let prev_index = self.scheduler.active_index();

        let response = match self.execute(cmd, store, sink) {
            Ok(response) => response,
            Err(e) => {
                warn!("Command '{}' rejected: {}", name, e);
                CommandResponse::fail(name, format_args!("{e}"))
            }
        };

        self.emit_transitions(prev_state, prev_index, sink);
        sink.emit(&AppEvent::CommandHandled(response.clone()));
        response
    }

    fn execute(
        &mut self,
        cmd: AppCommand,
        store: &mut impl StepStorePort,
        sink: &mut impl EventSink,
    ) -> Result<CommandResponse> {
        let name = cmd.name();
        let response = match cmd {
            AppCommand::StartProgram => {
                if self.scheduler.start() {
                    self.manual = None;
                    CommandResponse::ok(name, format_args!("program started"))
                } else {
                    CommandResponse::fail(name, format_args!("already running"))
                }
            }
            AppCommand::StopProgram => {
                if self.scheduler.stop() {
                    CommandResponse::ok(name, format_args!("program stopped"))
                } else {
                    CommandResponse::fail(name, format_args!("not running"))
                }
            }
            AppCommand::ValveControl {
                valves,
                duration_minutes,
            } => {
                if duration_minutes == 0 || valves.is_closed() {
                    self.manual = None;
                    self.scheduler.manual_valves(ValveMask::CLOSED);
                    CommandResponse::ok(name, format_args!("valves closed"))
                } else {
                    self.scheduler.manual_valves(valves);
                    self.manual = Some(ManualRun {
                        valves,
                        remaining_minutes: duration_minutes,
                    });
                    CommandResponse::ok(
                        name,
                        format_args!("{} open for {} min", valves, duration_minutes),
                    )
                }
            }
            AppCommand::PumpControl { on } => {
                self.scheduler.manual_pump(on);
                CommandResponse::ok(name, format_args!("pump {}", if on { "on" } else { "off" }))
            }
            AppCommand::SetSchedule { hour, minute } => {
                self.scheduler.set_schedule(hour, minute)?;
                let schedule = self.scheduler.next_scheduled_time();
                match store.save_schedule(schedule) {
                    Ok(()) => CommandResponse::ok(name, format_args!("daily start at {}", schedule)),
                    Err(e) => {
                        warn!("Schedule not persisted: {}", e);
                        CommandResponse::ok(
                            name,
                            format_args!("daily start at {} (not persisted)", schedule),
                        )
                    }
                }
            }
            AppCommand::SetStep { index, step } => {
                self.scheduler.set_step(index, step)?;
                let verb = if step.is_some() { "set" } else { "cleared" };
                let steps = self.scheduler.program().steps;
                match store.save_step(index, &steps) {
                    Ok(()) => CommandResponse::ok(name, format_args!("step {} {}", index + 1, verb)),
                    Err(e) => {
                        warn!("Step {} not persisted: {}", index + 1, e);
                        CommandResponse::ok(
                            name,
                            format_args!("step {} {} (not persisted)", index + 1, verb),
                        )
                    }
                }
            }
            AppCommand::ReloadProgram => {
                let program = store.load_all();
                self.scheduler.load(program);
                CommandResponse::ok(
                    name,
                    format_args!(
                        "{} steps daily at {}",
                        program.steps.len(),
                        program.schedule
                    ),
                )
            }
            AppCommand::UpdateConfig(config) => {
                config.validate().map_err(Error::Config)?;
                self.scheduler
                    .set_pump_wait_timeout(config.pump_wait_timeout_minutes);
                let warmup_changed = config.pump_warmup_minutes != self.config.pump_warmup_minutes;
                self.config = config;
                self.config_dirty = true;
                info!("Configuration updated at runtime");
                if warmup_changed {
                    CommandResponse::ok(name, format_args!("updated; warm-up applies after restart"))
                } else {
                    CommandResponse::ok(name, format_args!("updated"))
                }
            }
            AppCommand::GetStatus => {
                let status = self.status();
                let response = CommandResponse::ok(name, format_args!("{}", status.line));
                sink.emit(&AppEvent::Status(status));
                response
            }
            AppCommand::Restart { delay_secs } => {
                let delay = delay_secs.clamp(RESTART_DELAY_MIN_SECS, RESTART_DELAY_MAX_SECS);
                self.scheduler.shutdown();
                self.manual = None;
                let mut response =
                    CommandResponse::ok(name, format_args!("restarting in {} s", delay));
                response.restart_in_secs = Some(delay);
                response
            }
        };
        Ok(response)
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build a status snapshot from the scheduler.
    pub fn status(&self) -> StatusReport {
        StatusReport {
            state: self.scheduler.state(),
            running: self.scheduler.is_running(),
            pump_on: self.scheduler.is_pump_on(),
            active_index: self.scheduler.active_index(),
            active_step: self.scheduler.active_step(),
            minutes_remaining: self.scheduler.minutes_remaining(),
            next_run: self.scheduler.next_scheduled_time(),
            line: self.scheduler.status_line(),
        }
    }

    pub fn state(&self) -> StateId {
        self.scheduler.state()
    }

    pub fn scheduler(&self) -> &Scheduler<G> {
        &self.scheduler
    }

    /// Total ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Minutes left on a timed manual valve override.
    pub fn manual_minutes_remaining(&self) -> Option<u16> {
        self.manual.map(|m| m.remaining_minutes)
    }

    pub fn current_config(&self) -> SystemConfig {
        self.config
    }

    // ── Config dirty-flag management ──────────────────────────

    /// Persist the configuration if it changed since the last save.
    /// Returns `true` if the config was saved.
    pub fn save_config_if_dirty(&mut self, storage: &impl ConfigPort) -> bool {
        if !self.config_dirty {
            return false;
        }
        match storage.save(&self.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("Config saved to NVS");
                true
            }
            Err(e) => {
                warn!("Config save failed: {}", e);
                false
            }
        }
    }

    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }

    // ── Internal ──────────────────────────────────────────────

    fn tick_manual(&mut self, sink: &mut impl EventSink) {
        let Some(mut run) = self.manual else {
            return;
        };
        if self.scheduler.is_running() {
            // The run closed the manual mask when it switched the pump on.
            info!("Manual valves {} cancelled by program run", run.valves);
            self.manual = None;
            return;
        }
        run.remaining_minutes = run.remaining_minutes.saturating_sub(1);
        if run.remaining_minutes == 0 {
            info!("Manual valves {} expired", run.valves);
            self.scheduler.manual_valves(ValveMask::CLOSED);
            self.manual = None;
            sink.emit(&AppEvent::ManualValvesClosed);
        } else {
            self.manual = Some(run);
        }
    }

    fn emit_transitions(
        &self,
        prev_state: StateId,
        prev_index: Option<usize>,
        sink: &mut impl EventSink,
    ) {
        let state = self.scheduler.state();
        if state != prev_state {
            sink.emit(&AppEvent::StateChanged {
                from: prev_state,
                to: state,
            });
        }

        let index = self.scheduler.active_index();
        if index != prev_index {
            if let (Some(index), Some(step)) = (index, self.scheduler.active_step()) {
                sink.emit(&AppEvent::StepStarted { index, step });
            }
        }

        if prev_state.is_active() && state == StateId::Idle {
            sink.emit(&AppEvent::ProgramFinished);
        }
    }
}
