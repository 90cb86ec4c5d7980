use chrono::{Datelike, NaiveDateTime, Timelike};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

use crate::display::{ElementId, Surface};

/// Time of day as rendered by the el-GR locale, e.g. `3:05:09 μ.μ.`
pub fn format_time(now: &NaiveDateTime) -> String {
    let (is_pm, hour) = now.hour12();
    let suffix = if is_pm { "μ.μ." } else { "π.μ." };
    format!("{}:{:02}:{:02} {}", hour, now.minute(), now.second(), suffix)
}

/// Date as rendered by the el-GR locale, e.g. `17/10/2026`
pub fn format_date(now: &NaiveDateTime) -> String {
    format!("{}/{}/{}", now.day(), now.month(), now.year())
}

pub fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Writes time and date into the given targets. Returns how many were present.
pub fn tick<S: Surface>(surface: &mut S, now: &NaiveDateTime, time_targets: &[ElementId]) -> usize {
    let time = format_time(now);
    let date = format_date(now);

    let mut written = 0;
    for id in time_targets {
        if surface.set_text(*id, &time) {
            written += 1;
        }
    }
    if surface.set_text(ElementId::CurrentDate, &date) {
        written += 1;
    }
    written
}

/// Interval that fires immediately, then every `period`.
pub fn ticker(period: Duration) -> tokio::time::Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
