//! Fuzz target: `ProgramStore` blob decoding
//!
//! Plants arbitrary bytes under the `schedule` and `steps` keys and
//! verifies:
//! - `load_all` never panics and always yields a valid schedule
//! - The loaded step list never exceeds `MAX_STEPS`
//! - A subsequent `save_step` / `load_all` keeps the edited list
//!
//! cargo fuzz run fuzz_program_store

#![no_main]

use libfuzzer_sys::fuzz_target;
use irrigation::adapters::nvs::NAMESPACE;
use irrigation::adapters::program_store::{ProgramStore, SCHEDULE_KEY, STEPS_KEY};
use irrigation::app::ports::{StepStorePort, StorageError, StoragePort};
use irrigation::program::{MAX_STEPS, StepDefinition, ValveMask};

// ── In-memory StoragePort for fuzz testing ────────────────────

use std::collections::HashMap;

struct MemStore {
    data: HashMap<String, Vec<u8>>,
}

impl MemStore {
    fn new() -> Self {
        Self { data: HashMap::new() }
    }
}

impl StoragePort for MemStore {
    fn read(&self, ns: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        match self.data.get(&format!("{ns}::{key}")) {
            Some(v) if v.len() > buf.len() => Err(StorageError::BufferTooSmall),
            Some(v) => {
                buf[..v.len()].copy_from_slice(v);
                Ok(v.len())
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, ns: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.data.insert(format!("{ns}::{key}"), data.to_vec());
        Ok(())
    }

    fn exists(&self, ns: &str, key: &str) -> bool {
        self.data.contains_key(&format!("{ns}::{key}"))
    }

    fn delete(&mut self, ns: &str, key: &str) -> Result<(), StorageError> {
        self.data.remove(&format!("{ns}::{key}"));
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };

    // The selector byte splits the remaining input between the two keys.
    let split = if rest.is_empty() { 0 } else { selector as usize % rest.len() };
    let (schedule_blob, steps_blob) = rest.split_at(split);

    let mut store = ProgramStore::new(MemStore::new());
    let _ = store.storage_mut().write(NAMESPACE, SCHEDULE_KEY, schedule_blob);
    let _ = store.storage_mut().write(NAMESPACE, STEPS_KEY, steps_blob);

    let program = store.load_all();
    assert!(program.schedule.hour() < 24 && program.schedule.minute() < 60);
    assert!(program.steps.len() <= MAX_STEPS);

    let index = selector as usize % MAX_STEPS;
    let step = StepDefinition::new(ValveMask::new(u16::from(selector) << 4), u16::from(selector));
    let mut steps = program.steps;
    steps.set(index, Some(step)).expect("index below MAX_STEPS");
    store.save_step(index, &steps).expect("in-memory write cannot fail");
    assert_eq!(store.load_all().steps, steps);
});
