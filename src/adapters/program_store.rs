//! Persisted watering program.
//!
//! Implements [`StepStorePort`] on top of any [`StoragePort`].  The program
//! lives in the `irrigation` namespace as two postcard blobs:
//!
//! | Key        | Value          |
//! |------------|----------------|
//! | `schedule` | `ScheduleTime` |
//! | `steps`    | `StepList`     |
//!
//! Each key falls back to the factory default on its own when it is
//! missing or fails to decode, so a corrupt step list never loses the
//! configured start time (and vice versa).

use log::{info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::adapters::nvs::NAMESPACE;
use crate::app::ports::{StepStorePort, StorageError, StoragePort};
use crate::config;
use crate::program::{MAX_STEPS, ProgramSnapshot, ScheduleTime, StepList};

pub const SCHEDULE_KEY: &str = "schedule";
pub const STEPS_KEY: &str = "steps";

/// Largest program blob (a full step list encodes to well under this).
const MAX_PROGRAM_BLOB: usize = 64;

pub struct ProgramStore<S> {
    storage: S,
}

impl<S: StoragePort> ProgramStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Underlying key/value store (shared with the config blob).
    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    fn load_key<T: DeserializeOwned>(&self, key: &str) -> Result<T, StorageError> {
        let mut buf = [0u8; MAX_PROGRAM_BLOB];
        let len = self.storage.read(NAMESPACE, key, &mut buf)?;
        postcard::from_bytes(&buf[..len]).map_err(|_| StorageError::Encoding)
    }

    fn store_key<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        let mut buf = [0u8; MAX_PROGRAM_BLOB];
        let bytes = postcard::to_slice(value, &mut buf).map_err(|_| StorageError::Encoding)?;
        self.storage.write(NAMESPACE, key, bytes)
    }

    fn load_or_default<T: DeserializeOwned>(&self, key: &str, default: impl FnOnce() -> T) -> T {
        match self.load_key(key) {
            Ok(value) => value,
            Err(StorageError::NotFound) => default(),
            Err(e) => {
                warn!("ProgramStore: '{}' unreadable ({}), using default", key, e);
                default()
            }
        }
    }
}

impl<S: StoragePort> StepStorePort for ProgramStore<S> {
    fn load_all(&self) -> ProgramSnapshot {
        let snapshot = ProgramSnapshot {
            schedule: self.load_or_default(SCHEDULE_KEY, config::default_schedule),
            steps: self.load_or_default(STEPS_KEY, config::default_steps),
        };
        info!(
            "ProgramStore: start {} with {} step(s), {} min total",
            snapshot.schedule,
            snapshot.steps.len(),
            snapshot.steps.total_minutes()
        );
        snapshot
    }

    fn save_schedule(&mut self, schedule: ScheduleTime) -> Result<(), StorageError> {
        self.store_key(SCHEDULE_KEY, &schedule)
    }

    fn save_step(&mut self, index: usize, steps: &StepList) -> Result<(), StorageError> {
        if index >= MAX_STEPS {
            return Err(StorageError::Encoding);
        }
        self.store_key(STEPS_KEY, steps)
    }
}
