//! ESP32 time adapter.
//!
//! Monotonic uptime for the pump warm-up and local wall-clock time for the
//! daily schedule.
//!
//! - **`target_os = "espidf"`**: `esp_timer_get_time()` for uptime,
//!   `gettimeofday` + `localtime_r` (honours `TZ`) for wall time.
//! - **`not(target_os = "espidf")`**: `std::time::Instant` for uptime and
//!   the host clock (UTC) for wall time.

use crate::app::ports::{ClockPort, WallTime};

/// Time adapter for the ESP32 platform.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    pub fn uptime_ms(&self) -> u64 {
        self.uptime_us() / 1_000
    }

    pub fn uptime_secs(&self) -> u64 {
        self.uptime_us() / 1_000_000
    }

    /// Local hour and minute. `None` while the wall clock is unset (pre-SNTP).
    #[cfg(target_os = "espidf")]
    pub fn wall_time(&self) -> Option<WallTime> {
        use core::ptr;
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, ptr::null_mut()) } != 0 {
            return None;
        }
        // Reject obviously unsynced time (e.g. before 2020-01-01)
        const EPOCH_2020: i64 = 1_577_836_800;
        if (tv.tv_sec as i64) < EPOCH_2020 {
            return None;
        }
        let secs = tv.tv_sec as esp_idf_svc::sys::time_t;
        let mut tm: esp_idf_svc::sys::tm = unsafe { core::mem::zeroed() };
        if unsafe { esp_idf_svc::sys::localtime_r(&secs, &mut tm) }.is_null() {
            return None;
        }
        if !(0..24).contains(&tm.tm_hour) || !(0..60).contains(&tm.tm_min) {
            return None;
        }
        Some(WallTime::new(tm.tm_hour as u8, tm.tm_min as u8))
    }

    /// Local hour and minute.  The host clock is read as UTC.
    #[cfg(not(target_os = "espidf"))]
    pub fn wall_time(&self) -> Option<WallTime> {
        let since_epoch = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .ok()?;
        Some(wall_time_from_epoch_secs(since_epoch.as_secs()))
    }
}

#[cfg(not(target_os = "espidf"))]
fn wall_time_from_epoch_secs(secs: u64) -> WallTime {
    let of_day = secs % 86_400;
    WallTime::new((of_day / 3_600) as u8, ((of_day % 3_600) / 60) as u8)
}

impl ClockPort for Esp32TimeAdapter {
    fn local_time(&self) -> Option<WallTime> {
        self.wall_time()
    }
}
