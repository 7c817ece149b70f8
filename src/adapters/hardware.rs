//! Hardware adapter: bridges real peripherals to the [`ActuatorPort`].
//!
//! Owns the valve bank, the pump relay and the uptime source.  This is the
//! only module in the system that touches actual hardware.  On non-espidf
//! targets the pump relay is a cfg-gated stub and the valve bank runs over
//! whatever `I2c` bus it is handed.

use embedded_hal::i2c::I2c;
use log::{error, info};

use crate::adapters::time::Esp32TimeAdapter;
use crate::app::ports::ActuatorPort;
use crate::drivers::pump::PumpDriver;
use crate::drivers::valves::ValveBank;
use crate::program::ValveMask;

/// Concrete adapter that combines all actuators behind the port trait.
pub struct HardwareAdapter<I2C> {
    valves: ValveBank<I2C>,
    pump: PumpDriver,
    time: Esp32TimeAdapter,
    warmup_ms: u64,
}

impl<I2C: I2c> HardwareAdapter<I2C> {
    pub fn new(valves: ValveBank<I2C>, pump: PumpDriver, time: Esp32TimeAdapter, warmup_ms: u64) -> Self {
        Self {
            valves,
            pump,
            time,
            warmup_ms,
        }
    }

    pub fn valves(&self) -> &ValveBank<I2C> {
        &self.valves
    }

    pub fn pump(&self) -> &PumpDriver {
        &self.pump
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<I2C: I2c> ActuatorPort for HardwareAdapter<I2C> {
    fn set_valve_mask(&mut self, mask: ValveMask) {
        match self.valves.write(mask) {
            Ok(()) => info!("HW: valves {}", mask),
            Err(e) => error!("HW: valves {} not applied: {}", mask, e),
        }
    }

    fn set_pump(&mut self, on: bool) {
        self.pump.set(on, self.time.uptime_ms());
        info!("HW: pump {}", if on { "on" } else { "off" });
    }

    fn is_pump_ready(&self) -> bool {
        self.pump.is_ready(self.time.uptime_ms(), self.warmup_ms)
    }
}
