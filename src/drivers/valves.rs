//! Twelve-channel valve bank on two PCF8574 I²C port expanders.
//!
//! Channels 0-5 sit on the low expander, 6-11 on the high one, each on
//! P0..P5.  Outputs are active low: a cleared bit energises the valve
//! driver.  Unused pins P6/P7 are always written high.
//!
//! Generic over any `embedded-hal` 1.0 [`I2c`] bus so the host tests can
//! record the bytes that would hit the wire.

use embedded_hal::i2c::I2c;

use crate::error::ActuatorError;
use crate::pins;
use crate::program::ValveMask;

const CHANNEL_BITS: u16 = (1 << pins::CHANNELS_PER_EXPANDER) - 1;

pub struct ValveBank<I2C> {
    i2c: I2C,
    current: ValveMask,
}

impl<I2C: I2c> ValveBank<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            current: ValveMask::CLOSED,
        }
    }

    /// Drive every output high (all valves closed).
    pub fn init(&mut self) -> Result<(), ActuatorError> {
        self.write(ValveMask::CLOSED)
    }

    /// Write `mask` to both expanders.  Both writes are attempted even if
    /// the first fails; the first error is returned.
    pub fn write(&mut self, mask: ValveMask) -> Result<(), ActuatorError> {
        let (low, high) = expander_bytes(mask);
        let r_low = self.write_port(pins::VALVE_EXPANDER_LOW_ADDR, low);
        let r_high = self.write_port(pins::VALVE_EXPANDER_HIGH_ADDR, high);
        if r_low.is_ok() && r_high.is_ok() {
            self.current = mask;
        }
        r_low.and(r_high)
    }

    /// Last mask written successfully.
    pub fn current(&self) -> ValveMask {
        self.current
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    fn write_port(&mut self, address: u8, byte: u8) -> Result<(), ActuatorError> {
        self.i2c
            .write(address, &[byte])
            .map_err(|_| ActuatorError::I2cWriteFailed { address })
    }
}

/// Port bytes for (low expander, high expander).  Active low.
fn expander_bytes(mask: ValveMask) -> (u8, u8) {
    let bits = mask.bits();
    let low = !((bits & CHANNEL_BITS) as u8);
    let high = !(((bits >> pins::CHANNELS_PER_EXPANDER) & CHANNEL_BITS) as u8);
    (low, high)
}
