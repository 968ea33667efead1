//! Fire-time arithmetic: periodic and realtime next-fire computation,
//! throttle evaluation, and maintenance-window checks

use chrono::{DateTime, Datelike, Days, Duration, TimeZone, Utc};

use crate::model::{FiringTime, MaintenanceWindow, ScheduleKind, Throttle};
use crate::utils::ms_since_midnight;

/// Next fire instant for a schedule, strictly after `now`.
///
/// Periodic schedules fire every interval; realtime schedules fire at the
/// earliest configured `(day, time)` entry after `now`, wrapping to next week
/// when nothing remains this week.
pub fn next_fire(kind: &ScheduleKind, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match kind {
        ScheduleKind::Periodic { interval_ms } => {
            Some(now + Duration::milliseconds(*interval_ms as i64))
        }
        ScheduleKind::Realtime { firing_times } => next_realtime_fire(firing_times, now),
    }
}

fn next_realtime_fire(firing_times: &[FiringTime], now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let today = now.weekday().num_days_from_sunday() as u8;
    let now_ms = ms_since_midnight(now);

    let mut best: Option<(u64, u32)> = None;
    for ft in firing_times {
        let mut days_ahead = (i32::from(ft.day_of_week) - i32::from(today)).rem_euclid(7) as u64;
        // An entry earlier today belongs to next week
        if days_ahead == 0 && ft.ms_since_midnight <= now_ms {
            days_ahead = 7;
        }
        let candidate = (days_ahead, ft.ms_since_midnight);
        if best.is_none_or(|b| candidate < b) {
            best = Some(candidate);
        }
    }

    let (days_ahead, ms) = best?;
    let date = now.date_naive().checked_add_days(Days::new(days_ahead))?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight) + Duration::milliseconds(ms as i64))
}

/// Whether a throttled alert must suppress a fire at `now`
pub fn is_throttled(
    throttle: &Throttle,
    last_check: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    if !throttle.enabled {
        return false;
    }
    match last_check {
        Some(last) => now - last < Duration::milliseconds(throttle.suppress_ms as i64),
        None => false,
    }
}

/// Whether `at` falls inside any configured maintenance window.
/// Window bounds are inclusive on both ends.
pub fn in_maintenance_window(windows: &[MaintenanceWindow], at: DateTime<Utc>) -> bool {
    let day = at.weekday().num_days_from_sunday() as u8;
    let ms = ms_since_midnight(at);
    windows
        .iter()
        .any(|w| w.day_of_week == day && ms >= w.start_ms && ms <= w.end_ms)
}
