//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService / Scheduler (domain)
//! ```
//!
//! Driven adapters (valves and pump, clock, event sinks, storage) implement
//! these traits.  The [`AppService`](super::service::AppService) and the
//! [`Scheduler`](crate::scheduler::Scheduler) consume them via generics, so
//! the domain core never touches hardware directly.
//!
//! ## Contract notes
//!
//! - **ActuatorPort** writes are fire-and-forget.  Adapters log failures;
//!   the scheduler never sees them.
//! - **ConfigPort** implementations MUST validate before persisting.
//! - **StepStorePort** reads never fail: missing or corrupt data yields the
//!   factory program.  Writes report errors to the caller.

use crate::config::SystemConfig;
use crate::program::{ProgramSnapshot, ScheduleTime, StepList, ValveMask};

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the scheduler calls this to drive valves and pump.
pub trait ActuatorPort {
    /// Open exactly the valves in `mask`; every other valve closes.
    fn set_valve_mask(&mut self, mask: ValveMask);

    /// Switch the pump relay.
    fn set_pump(&mut self, on: bool);

    /// Whether the pump has been running long enough for valves to open.
    /// Pure query, safe to call every tick.
    fn is_pump_ready(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: RTC / SNTP → domain)
// ───────────────────────────────────────────────────────────────

/// Local wall-clock reading, minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallTime {
    pub hour: u8,
    pub minute: u8,
}

impl WallTime {
    pub const fn new(hour: u8, minute: u8) -> Self {
        Self { hour, minute }
    }
}

impl core::fmt::Display for WallTime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Source of the current local time.
pub trait ClockPort {
    /// Current local time, or `None` while the clock has not been set.
    fn local_time(&self) -> Option<WallTime>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, MQTT,
/// display, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage.
///
/// - Keys are namespaced to prevent collisions between subsystems.
/// - Write operations MUST be atomic: no partial writes on power loss.
///   The ESP-IDF NVS API guarantees this natively; in-memory simulation
///   achieves it trivially.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Step store port (driven adapter: domain ↔ persisted program)
// ───────────────────────────────────────────────────────────────

/// Persisted watering program: schedule time plus step list.
///
/// Used at startup and on reconfiguration only, never from the tick path.
pub trait StepStorePort {
    /// The persisted program, or the factory default for any part that
    /// is missing or unreadable.
    fn load_all(&self) -> ProgramSnapshot;

    /// Persist the daily start time.
    fn save_schedule(&mut self, schedule: ScheduleTime) -> Result<(), StorageError>;

    /// Persist an edit to step slot `index`.  `steps` is the full list as
    /// held in memory and is written as a whole, so the stored program
    /// always matches the running one.
    fn save_step(&mut self, index: usize, steps: &StepList) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] and [`StepStorePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
    /// Value could not be encoded or decoded.
    Encoding,
    /// Caller buffer is smaller than the stored value.
    BufferTooSmall,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::Encoding => write!(f, "encoding error"),
            Self::BufferTooSmall => write!(f, "buffer too small"),
        }
    }
}
