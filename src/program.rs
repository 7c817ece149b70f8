//! Watering program data model.
//!
//! A program is a daily [`ScheduleTime`] plus an ordered [`StepList`] of
//! at most [`MAX_STEPS`] watering steps.  Each [`StepDefinition`] opens a
//! set of valves (a [`ValveMask`]) for a number of minutes.
//!
//! ```text
//!   20:00 ──▶ step 0: oxo xxx xxx xxx  20 min
//!             step 1: xox xxx xxx xox  17 min
//!             step 2: xxx xxx oox xxx  15 min
//!             step 3: xxx xxx xxx oxo  15 min
//!             step 4: (empty) ── end of run
//! ```

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// Number of independently switchable valve channels on the board.
pub const VALVE_CHANNELS: usize = 12;

/// Capacity of the step list.
pub const MAX_STEPS: usize = 5;

// ═══════════════════════════════════════════════════════════════
//  Valve mask
// ═══════════════════════════════════════════════════════════════

/// Set of open valves, one bit per channel (bit set = open).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u16", into = "u16")]
pub struct ValveMask(u16);

impl ValveMask {
    /// Every valve closed.
    pub const CLOSED: Self = Self(0);

    const CHANNEL_BITS: u16 = (1 << VALVE_CHANNELS) - 1;

    /// Build a mask from raw bits; bits above the last channel are dropped.
    pub const fn new(bits: u16) -> Self {
        Self(bits & Self::CHANNEL_BITS)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn is_closed(self) -> bool {
        self.0 == 0
    }

    /// Whether `channel` (0-based) is open.  Out-of-range channels are closed.
    pub const fn is_open(self, channel: usize) -> bool {
        channel < VALVE_CHANNELS && self.0 & (1 << channel) != 0
    }

    /// Number of open valves.
    pub const fn open_count(self) -> u32 {
        self.0.count_ones()
    }
}

impl From<u16> for ValveMask {
    fn from(bits: u16) -> Self {
        Self::new(bits)
    }
}

impl From<ValveMask> for u16 {
    fn from(mask: ValveMask) -> Self {
        mask.0
    }
}

/// Renders as `oxo xxx xxx xxx`: channel 0 first, `o` = open, grouped by box pair.
impl fmt::Display for ValveMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for channel in 0..VALVE_CHANNELS {
            if channel > 0 && channel % 3 == 0 {
                f.write_str(" ")?;
            }
            f.write_str(if self.is_open(channel) { "o" } else { "x" })?;
        }
        Ok(())
    }
}

/// Error parsing the `o`/`x` text form of a [`ValveMask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveMaskParseError {
    /// A character other than `o`, `x` or space.
    InvalidChar(char),
    /// More than [`VALVE_CHANNELS`] channels given.
    TooManyChannels,
}

impl fmt::Display for ValveMaskParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChar(c) => write!(f, "invalid valve character {c:?}"),
            Self::TooManyChannels => write!(f, "more than {VALVE_CHANNELS} valve channels"),
        }
    }
}

impl FromStr for ValveMask {
    type Err = ValveMaskParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bits = 0u16;
        let mut channel = 0usize;
        for c in s.chars().filter(|c| *c != ' ') {
            if channel >= VALVE_CHANNELS {
                return Err(ValveMaskParseError::TooManyChannels);
            }
            match c {
                'o' | 'O' => bits |= 1 << channel,
                'x' | 'X' => {}
                other => return Err(ValveMaskParseError::InvalidChar(other)),
            }
            channel += 1;
        }
        Ok(Self(bits))
    }
}

// ═══════════════════════════════════════════════════════════════
//  Steps
// ═══════════════════════════════════════════════════════════════

/// One watering action: `valves` stay open for `duration_minutes` once active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub valves: ValveMask,
    /// `0` is accepted and behaves like a one-minute step.
    pub duration_minutes: u16,
}

impl StepDefinition {
    pub const fn new(valves: ValveMask, duration_minutes: u16) -> Self {
        Self {
            valves,
            duration_minutes,
        }
    }
}

/// Ordered, fixed-capacity list of steps.
///
/// The first empty slot ends a run, so only the populated prefix is ever
/// executed.  Slots after a gap are kept but unreachable until the gap is
/// filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StepList {
    slots: [Option<StepDefinition>; MAX_STEPS],
}

impl StepList {
    pub const fn new() -> Self {
        Self {
            slots: [None; MAX_STEPS],
        }
    }

    /// Build a list from the leading steps; extra entries beyond capacity are ignored.
    pub fn from_steps(steps: &[StepDefinition]) -> Self {
        let mut list = Self::new();
        for (slot, step) in list.slots.iter_mut().zip(steps) {
            *slot = Some(*step);
        }
        list
    }

    pub const fn capacity(&self) -> usize {
        MAX_STEPS
    }

    /// The step at `index`, if the slot exists and is populated.
    pub fn get(&self, index: usize) -> Option<&StepDefinition> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Replace one slot.  Rejects indices outside the capacity.
    pub fn set(&mut self, index: usize, step: Option<StepDefinition>) -> Result<(), ScheduleError> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(ScheduleError::StepIndexOutOfRange { index })?;
        *slot = step;
        Ok(())
    }

    /// Number of steps a run will execute (the populated prefix).
    pub fn len(&self) -> usize {
        self.slots.iter().take_while(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the steps a run will execute, in order.
    pub fn iter(&self) -> impl Iterator<Item = &StepDefinition> {
        self.slots.iter().map_while(Option::as_ref)
    }

    /// Sum of the durations of the executable steps.
    pub fn total_minutes(&self) -> u32 {
        self.iter().map(|s| u32::from(s.duration_minutes)).sum()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Schedule time
// ═══════════════════════════════════════════════════════════════

/// Daily trigger time.  Always holds a valid hour (0-23) and minute (0-59).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(u8, u8)", into = "(u8, u8)")]
pub struct ScheduleTime {
    hour: u8,
    minute: u8,
}

impl ScheduleTime {
    pub const fn new(hour: u8, minute: u8) -> Result<Self, ScheduleError> {
        if hour > 23 {
            return Err(ScheduleError::HourOutOfRange(hour));
        }
        if minute > 59 {
            return Err(ScheduleError::MinuteOutOfRange(minute));
        }
        Ok(Self { hour, minute })
    }

    pub const fn hour(self) -> u8 {
        self.hour
    }

    pub const fn minute(self) -> u8 {
        self.minute
    }

    /// Whether a clock reading falls on this trigger time.
    pub const fn matches(self, hour: u8, minute: u8) -> bool {
        self.hour == hour && self.minute == minute
    }
}

impl Default for ScheduleTime {
    fn default() -> Self {
        Self {
            hour: 20,
            minute: 0,
        }
    }
}

impl TryFrom<(u8, u8)> for ScheduleTime {
    type Error = ScheduleError;

    fn try_from((hour, minute): (u8, u8)) -> Result<Self, Self::Error> {
        Self::new(hour, minute)
    }
}

impl From<ScheduleTime> for (u8, u8) {
    fn from(t: ScheduleTime) -> Self {
        (t.hour, t.minute)
    }
}

impl fmt::Display for ScheduleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Schedule and steps as exchanged with the step store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgramSnapshot {
    pub schedule: ScheduleTime,
    pub steps: StepList,
}
