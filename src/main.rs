//! Irrigation Controller Firmware: Main Entry Point
//!
//! Hexagonal architecture with a single-threaded, tick-driven main loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink   NvsAdapter    Esp32Time      │
//! │  (ActuatorPort)    (EventSink)    (Config+NVS)  (ClockPort)    │
//! │  ProgramStore (StepStorePort over NVS)                         │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Scheduler · FSM · manual overrides                    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  esp_timer → MINUTE_TICK      transports → CommandQueue        │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{error, info, warn};

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;

use irrigation::adapters::hardware::HardwareAdapter;
use irrigation::adapters::log_sink::LogEventSink;
use irrigation::adapters::nvs::NvsAdapter;
use irrigation::adapters::program_store::ProgramStore;
use irrigation::adapters::time::Esp32TimeAdapter;
use irrigation::app::commands::AppCommand;
use irrigation::app::ports::{ClockPort, ConfigPort, StepStorePort};
use irrigation::app::service::AppService;
use irrigation::config::SystemConfig;
use irrigation::drivers::pump::PumpDriver;
use irrigation::drivers::valves::ValveBank;
use irrigation::drivers::{hw_init, hw_timer};
use irrigation::events::{self, CommandQueue, MINUTE_TICK};
use irrigation::pins;

/// Main-loop poll period between tick/command checks.
const LOOP_IDLE_MS: u32 = 50;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Irrigation v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Peripherals ────────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        // Without the relay GPIO the pump state is unknown; halt.
        error!("HAL init failed, halting: {}", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }

    let peripherals = Peripherals::take()?;
    let i2c_cfg = I2cConfig::new().baudrate(Hertz(pins::I2C_FREQ_HZ));
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio5,
        peripherals.pins.gpio4,
        &i2c_cfg,
    )?;
    let mut valves = ValveBank::new(i2c);
    if let Err(e) = valves.init() {
        // Keep running: the scheduler still tracks time and the next
        // write retries both expanders.
        error!("Valve bank init failed: {}", e);
    }

    // ── 3. Config + program from NVS (or defaults) ────────────
    let nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults and no persistence", e);
            NvsAdapter::default()
        }
    };
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };
    let mut store = ProgramStore::new(nvs);
    let program = store.load_all();

    // ── 4. Wire adapters into the application core ───────────
    let clock = Esp32TimeAdapter::new();
    let hw = HardwareAdapter::new(valves, PumpDriver::new(), Esp32TimeAdapter::new(), config.pump_warmup_ms());
    let mut log_sink = LogEventSink::new();
    let mut app = AppService::new(config, hw, program);
    app.start(&mut log_sink);

    let mut queue = CommandQueue::new();
    let (mut cmd_tx, mut cmd_rx) = queue.split();
    events::push_command(&mut cmd_tx, AppCommand::GetStatus);

    match clock.local_time() {
        Some(now) => info!("Clock: local time {}", now),
        None => warn!("Clock: not set yet, ticks are skipped until it is"),
    }

    hw_timer::start_tick_timer(config.tick_interval_secs)?;
    info!("System ready. Entering event loop.");

    // ── 5. Event loop ─────────────────────────────────────────
    loop {
        let mut restart_in: Option<u8> = None;
        events::drain_commands(&mut cmd_rx, |cmd| {
            let response = app.handle_command(cmd, &mut store, &mut log_sink);
            if response.restart_in_secs.is_some() {
                restart_in = response.restart_in_secs;
            }
        });

        if app.save_config_if_dirty(store.storage()) {
            info!("Config persisted");
        }

        // The restart command already switched every output off.
        if let Some(secs) = restart_in {
            hw_timer::stop_tick_timer();
            info!("Restarting in {} s", secs);
            FreeRtos::delay_ms(u32::from(secs) * 1_000);
            esp_idf_hal::reset::restart();
        }

        if MINUTE_TICK.take() {
            match clock.local_time() {
                Some(now) => app.tick(now, &mut log_sink),
                None => warn!("Tick skipped: clock not set"),
            }
            let overruns = MINUTE_TICK.overruns();
            if overruns > 0 && app.tick_count() % 60 == 0 {
                warn!("{} tick(s) merged since boot", overruns);
            }
        }

        FreeRtos::delay_ms(LOOP_IDLE_MS);
    }
}
