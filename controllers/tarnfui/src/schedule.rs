//! Active window evaluation.
//!
//! Decides whether workloads should be running at a given instant. The
//! window is `[startup_time, shutdown_time)` on any active day, evaluated in
//! the configured timezone. When `shutdown_time < startup_time` the window
//! wraps past midnight.

use crate::config::ScheduleConfig;
use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Timelike};

/// Returns true when `now` falls inside the active window.
///
/// Only the weekday and time of day in `config.timezone` matter, so the
/// same instant expressed in any offset gives the same answer.
pub fn is_active<T: TimeZone>(now: &DateTime<T>, config: &ScheduleConfig) -> bool {
    let local = now.with_timezone(&config.timezone);

    if !config.active_days.contains(&local.weekday()) {
        return false;
    }

    // Minute precision, matching the HH:MM configuration
    let time_of_day = NaiveTime::from_hms_opt(local.hour(), local.minute(), 0).unwrap_or_default();
    in_window(time_of_day, config.startup_time, config.shutdown_time)
}

fn in_window(time: NaiveTime, startup: NaiveTime, shutdown: NaiveTime) -> bool {
    if startup < shutdown {
        startup <= time && time < shutdown
    } else {
        // Wraps past midnight: 22:00 -> 06:00
        time >= startup || time < shutdown
    }
}
