//! Function-pointer finite state machine engine.
//!
//! Classic embedded FSM pattern:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                      │
//! │  ┌──────────────┬──────────┬─────────┬──────────────┬─────────┐  │
//! │  │ StateId      │ on_enter │ on_exit │ on_update    │ falls   │  │
//! │  ├──────────────┼──────────┼─────────┼──────────────┼─────────┤  │
//! │  │ Idle         │ fn(ctx)  │    -    │ fn -> Option │    -    │  │
//! │  │ AwaitingPump │ fn(ctx)  │    -    │ fn -> Option │    -    │  │
//! │  │ Running      │ fn(ctx)  │    -    │ fn -> Option │    -    │  │
//! │  │ Finished     │ fn(ctx)  │    -    │ fn -> Option │  Idle   │  │
//! │  └──────────────┴──────────┴─────────┴──────────────┴─────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.
//! If it returns `Some(next_id)`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the next, and updates the
//! current pointer.  A self-transition (`Running` → `Running`) runs the
//! exit/enter pair too, which is how the next step gets loaded.
//!
//! States with a `fall_through` target are transient: right after their
//! `on_enter` the engine moves on to the target within the same call, so
//! they are never observed as the current state between ticks.

pub mod context;
pub mod states;

use context::RunContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all scheduler states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Idle = 0,
    AwaitingPump = 1,
    Running = 2,
    Finished = 3,
}

impl StateId {
    /// Total number of states: used to size the table array.
    pub const COUNT: usize = 4;

    /// Convert a `u8` index back to `StateId`.  Panics on out-of-range in
    /// debug builds; returns `Idle` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::AwaitingPump,
            2 => Self::Running,
            3 => Self::Finished,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Idle
            }
        }
    }

    /// True for every state that belongs to a run in progress.
    pub fn is_active(self) -> bool {
        matches!(self, Self::AwaitingPump | Self::Running)
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each state transition.
pub type StateActionFn = fn(&mut RunContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut RunContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
/// Stored in a fixed-size array: no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
    /// Transient state: continue straight to this state after `on_enter`.
    pub fall_through: Option<StateId>,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
///
/// Owns the state table (array of [`StateDescriptor`]); the
/// [`RunContext`] is owned by the caller and threaded through every
/// handler call.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    /// Index of the currently active state.
    current: usize,
    /// Monotonically increasing tick counter.
    tick_count: u64,
    /// Tick at which the current state was entered.
    state_entry_tick: u64,
}

impl Fsm {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        debug_assert!(
            table.iter().enumerate().all(|(i, d)| d.id as usize == i),
            "state table out of order"
        );
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            state_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut RunContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one tick.
    ///
    /// 1. Call `on_update` for the current state.
    /// 2. If it returns `Some(next)`, execute the transition:
    ///    `on_exit(current)` → update pointer → `on_enter(next)`.
    /// 3. Follow `fall_through` targets until a resting state is reached.
    pub fn tick(&mut self, ctx: &mut RunContext) {
        self.tick_count = self.tick_count.wrapping_add(1);
        ctx.ticks_in_state = self.ticks_in_current_state();

        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// Force an immediate transition outside the tick cadence
    /// (manual start and stop).  Does nothing if already in `next`.
    pub fn force_transition(&mut self, next: StateId, ctx: &mut RunContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    /// The current state's identity.
    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    /// How many ticks the FSM has been in the current state.
    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count.wrapping_sub(self.state_entry_tick)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut RunContext) {
        let mut next_idx = next_id as usize;

        // Bounded by the table size: fall-through chains cannot loop.
        for _ in 0..StateId::COUNT {
            info!(
                "FSM transition: {} -> {}",
                self.table[self.current].name, self.table[next_idx].name
            );

            if let Some(exit) = self.table[self.current].on_exit {
                exit(ctx);
            }

            self.current = next_idx;
            self.state_entry_tick = self.tick_count;
            ctx.ticks_in_state = 0;

            if let Some(enter) = self.table[self.current].on_enter {
                enter(ctx);
            }

            match self.table[self.current].fall_through {
                Some(target) => next_idx = target as usize,
                None => return,
            }
        }
    }
}
