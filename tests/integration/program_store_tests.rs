//! `ProgramStore` over a plain key/value mock, as any `StoragePort`
//! backend would see it.

use irrigation::adapters::nvs::NAMESPACE;
use irrigation::adapters::program_store::{ProgramStore, SCHEDULE_KEY, STEPS_KEY};
use irrigation::app::ports::{StepStorePort, StoragePort};
use irrigation::config::{default_program, default_steps};
use irrigation::program::{ScheduleTime, StepDefinition, StepList, ValveMask};

use crate::mock_hw::MockNvs;

#[test]
fn nothing_written_until_first_edit() {
    let store = ProgramStore::new(MockNvs::new());
    assert_eq!(store.load_all(), default_program());
    assert!(store.storage().keys().is_empty());
}

#[test]
fn program_lives_under_two_keys() {
    let mut store = ProgramStore::new(MockNvs::new());
    store.save_schedule(ScheduleTime::new(21, 0).unwrap()).unwrap();
    let steps = StepList::from_steps(&[StepDefinition::new(ValveMask::new(0x001), 1)]);
    store.save_step(0, &steps).unwrap();
    assert_eq!(
        store.storage().keys(),
        vec![
            format!("{NAMESPACE}::{SCHEDULE_KEY}"),
            format!("{NAMESPACE}::{STEPS_KEY}"),
        ]
    );
}

#[test]
fn oversized_blob_falls_back_to_defaults() {
    let mut store = ProgramStore::new(MockNvs::new());
    store.storage_mut().write(NAMESPACE, STEPS_KEY, &[0u8; 200]).unwrap();
    assert_eq!(store.load_all().steps, default_steps());
}

#[test]
fn full_step_list_round_trips() {
    let mut store = ProgramStore::new(MockNvs::new());
    let steps: Vec<StepDefinition> = (0..5)
        .map(|i| StepDefinition::new(ValveMask::new(0xFFF >> i), u16::MAX - i as u16))
        .collect();
    store.save_step(4, &StepList::from_steps(&steps)).unwrap();
    let loaded = store.load_all().steps;
    assert_eq!(loaded.iter().copied().collect::<Vec<_>>(), steps);
}
