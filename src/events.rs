//! Interrupt-to-main-loop hand-off.
//!
//! Two channels feed the main loop:
//! - the periodic timer callback raises a [`TickFlag`] once per minute;
//! - transports push decoded [`AppCommand`]s into a [`CommandQueue`].
//!
//! The main loop is the only consumer of both, so every scheduler call
//! runs to completion on one thread.  Nothing here calls scheduling logic
//! from interrupt or timer-task context.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ esp_timer   │────▶│  TickFlag    │────▶│              │
//! │ callback    │     │  (atomic)    │     │  Main Loop   │
//! ├─────────────┤     ├──────────────┤     │  (consumer)  │
//! │ Transport   │────▶│ CommandQueue │────▶│              │
//! │ (producer)  │     │  (SPSC)      │     │              │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::app::commands::AppCommand;

// ── Tick flag ─────────────────────────────────────────────────

/// Single-writer / single-reader "tick pending" flag.
///
/// A tick raised while the previous one is still pending is merged into
/// it and counted as an overrun.
pub struct TickFlag {
    pending: AtomicBool,
    overruns: AtomicU32,
}

impl TickFlag {
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
            overruns: AtomicU32::new(0),
        }
    }

    /// Mark a tick as pending.  Safe to call from ISR / timer context.
    pub fn raise(&self) {
        if self.pending.swap(true, Ordering::Release) {
            self.overruns.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Consume the pending tick, if any.  Main loop only.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::Acquire)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Ticks merged because the main loop had not consumed the previous one.
    pub fn overruns(&self) -> u32 {
        self.overruns.load(Ordering::Relaxed)
    }
}

impl Default for TickFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// The minute tick raised by the hardware timer.
pub static MINUTE_TICK: TickFlag = TickFlag::new();

// ── Command queue ─────────────────────────────────────────────

/// Maximum number of commands waiting for the main loop.
pub const COMMAND_QUEUE_CAP: usize = 8;

/// Lock-free SPSC queue of inbound commands (heapless ring buffer).
///
/// Split it once: the producer goes to the transport, the consumer stays
/// with the main loop.
pub type CommandQueue = heapless::spsc::Queue<AppCommand, COMMAND_QUEUE_CAP>;

/// Producer half handed to a transport.
pub type CommandProducer<'a> = heapless::spsc::Producer<'a, AppCommand, COMMAND_QUEUE_CAP>;

/// Consumer half kept by the main loop.
pub type CommandConsumer<'a> = heapless::spsc::Consumer<'a, AppCommand, COMMAND_QUEUE_CAP>;

/// Queue a command.  Returns `false` if the queue is full (command dropped).
pub fn push_command(tx: &mut CommandProducer<'_>, cmd: AppCommand) -> bool {
    match tx.enqueue(cmd) {
        Ok(()) => true,
        Err(dropped) => {
            log::warn!("Command queue full, dropping '{}'", dropped.name());
            false
        }
    }
}

/// Drain all pending commands into a callback, in FIFO order.
pub fn drain_commands(rx: &mut CommandConsumer<'_>, mut handler: impl FnMut(AppCommand)) {
    while let Some(cmd) = rx.dequeue() {
        handler(cmd);
    }
}
