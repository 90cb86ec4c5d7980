use chrono::NaiveDateTime;
use std::time::Duration;

use crate::constants::{CLOCK_INTERVAL_MS, TELEMETRY_INTERVAL_MS};
use crate::settings::Settings;

pub mod drone;
pub mod node_detail;
pub mod node_map;

pub use drone::DroneView;
pub use node_detail::NodeDetailView;
pub use node_map::NodeMapView;

/// Source of "now" for clock ticks and last-update stamps.
pub type NowFn = fn() -> NaiveDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPeriods {
    pub telemetry: Duration,
    pub clock: Duration,
}

impl Default for RefreshPeriods {
    fn default() -> Self {
        Self {
            telemetry: Duration::from_millis(TELEMETRY_INTERVAL_MS),
            clock: Duration::from_millis(CLOCK_INTERVAL_MS),
        }
    }
}

impl From<&Settings> for RefreshPeriods {
    fn from(settings: &Settings) -> Self {
        Self {
            telemetry: Duration::from_millis(settings.telemetry_interval_ms),
            clock: Duration::from_millis(settings.clock_interval_ms),
        }
    }
}

/// What a running view just did; handed to the observer after each callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    Updated,
    FetchFailed,
    ClockTick,
}
