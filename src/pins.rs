//! GPIO / bus assignments for the irrigation controller board.
//!
//! Every driver references this module rather than hard-coding pin numbers
//! or bus addresses.

// ---------------------------------------------------------------------------
// Pump relay
// ---------------------------------------------------------------------------

/// Digital output driving the pump relay coil.  Active LOW: the relay
/// closes (pump runs) when the pin is pulled low.
pub const PUMP_RELAY_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// I²C bus (valve expanders)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 5;
pub const I2C_SCL_GPIO: i32 = 4;
/// Standard mode; the PCF8574 tops out at 100 kHz.
pub const I2C_FREQ_HZ: u32 = 100_000;

// ---------------------------------------------------------------------------
// Valve expanders (PCF8574, active-low outputs)
// ---------------------------------------------------------------------------

/// Expander driving valve channels 0-5 on P0..P5.
pub const VALVE_EXPANDER_LOW_ADDR: u8 = 0x38;
/// Expander driving valve channels 6-11 on P0..P5.
pub const VALVE_EXPANDER_HIGH_ADDR: u8 = 0x3C;
/// Valve channels wired to each expander.
pub const CHANNELS_PER_EXPANDER: u32 = 6;
