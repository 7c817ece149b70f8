//! Fuzz target: `ValveMask` text parser
//!
//! Feeds arbitrary UTF-8 to `ValveMask::from_str` and verifies:
//! - No panics
//! - Accepted input never sets bits above channel 11
//! - Accepted input re-renders to a form that parses to the same mask
//!
//! cargo fuzz run fuzz_valve_mask_text

#![no_main]

use libfuzzer_sys::fuzz_target;
use irrigation::program::ValveMask;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(mask) = text.parse::<ValveMask>() else {
        return;
    };
    assert_eq!(mask.bits() & !0x0FFF, 0, "bits above channel 11 set by {text:?}");

    let rendered = mask.to_string();
    assert_eq!(rendered.parse::<ValveMask>(), Ok(mask));
});
