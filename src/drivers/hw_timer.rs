//! Scheduler tick timer using ESP-IDF's esp_timer API.
//!
//! One periodic timer raises [`MINUTE_TICK`] every `tick_interval_secs`.
//! The callback runs in the ESP timer task context (not ISR) and only
//! touches the atomic flag; the main loop does the scheduling.
//!
//! On simulation targets a background thread sleeps between ticks.

use crate::events::MINUTE_TICK;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use super::hw_init::HwInitError;

#[cfg(target_os = "espidf")]
static mut TICK_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// SAFETY: TICK_TIMER is written once in `start_tick_timer()` before any
/// timer callbacks fire.  Only called from the single main task.
#[cfg(target_os = "espidf")]
unsafe fn tick_timer() -> esp_timer_handle_t { unsafe { TICK_TIMER } }

#[cfg(target_os = "espidf")]
unsafe extern "C" fn minute_tick_cb(_arg: *mut core::ffi::c_void) {
    MINUTE_TICK.raise();
}

/// Start the periodic scheduler tick.
#[cfg(target_os = "espidf")]
pub fn start_tick_timer(interval_secs: u32) -> Result<(), HwInitError> {
    // SAFETY: TICK_TIMER is written here once at boot from the main task
    // before the callback can fire.  The callback only raises an atomic.
    unsafe {
        let args = esp_timer_create_args_t {
            callback: Some(minute_tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"sched_tick\0".as_ptr() as *const _,
            skip_unhandled_events: true,
        };
        let ret = esp_timer_create(&args, &raw mut TICK_TIMER);
        if ret != ESP_OK as i32 {
            return Err(HwInitError::TimerCreateFailed(ret));
        }
        let period_us = u64::from(interval_secs) * 1_000_000;
        let ret = esp_timer_start_periodic(TICK_TIMER, period_us);
        if ret != ESP_OK as i32 {
            log::error!("hw_timer: tick timer start failed (rc={})", ret);
            return Err(HwInitError::TimerCreateFailed(ret));
        }
        info!("hw_timer: scheduler tick every {} s", interval_secs);
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
static SIM_RUNNING: core::sync::atomic::AtomicBool = core::sync::atomic::AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn start_tick_timer(interval_secs: u32) -> Result<(), HwInitError> {
    use core::sync::atomic::Ordering;

    if SIM_RUNNING.swap(true, Ordering::AcqRel) {
        return Ok(());
    }
    let period = std::time::Duration::from_secs(u64::from(interval_secs.max(1)));
    std::thread::spawn(move || {
        while SIM_RUNNING.load(Ordering::Acquire) {
            std::thread::sleep(period);
            MINUTE_TICK.raise();
        }
    });
    log::info!("hw_timer(sim): tick thread every {} s", interval_secs);
    Ok(())
}

/// Stop the scheduler tick.
#[cfg(target_os = "espidf")]
pub fn stop_tick_timer() {
    // SAFETY: tick_timer() contract (main task only); null-check guards
    // against a timer that was never created.
    unsafe {
        let t = tick_timer();
        if !t.is_null() { esp_timer_stop(t); }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn stop_tick_timer() {
    SIM_RUNNING.store(false, core::sync::atomic::Ordering::Release);
}
