use chrono::NaiveDateTime;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::{NowFn, RefreshPeriods, ViewEvent};
use crate::clock::{self, format_time, local_now};
use crate::constants::{DRONE_ICON_SIZE, DRONE_MAP_CENTER, DRONE_MAP_ZOOM, DRONE_MARKER_Z_OFFSET};
use crate::display::{ElementId, Surface};
use crate::map::{MapWidget, Marker, MarkerIcon, MarkerId, TileLayer};
use crate::source::{fetch_drone_data, TelemetrySource};
use crate::telemetry::{TelemetryPanel, TelemetryReading};

pub fn drone_marker(icon_url: &str) -> Marker {
    Marker {
        position: DRONE_MAP_CENTER.into(),
        icon: MarkerIcon::Image {
            url: icon_url.to_string(),
            size: [DRONE_ICON_SIZE, DRONE_ICON_SIZE],
            anchor: [DRONE_ICON_SIZE / 2, DRONE_ICON_SIZE / 2],
            class_name: "drone-icon".to_string(),
        },
        tooltip: None,
        href: None,
        z_index_offset: DRONE_MARKER_Z_OFFSET,
    }
}

/// Drone surveillance view: one map, one moving marker, telemetry fields and a clock.
pub struct DroneView<M: MapWidget, S: Surface> {
    map: M,
    surface: S,
    marker: MarkerId,
    current: Option<TelemetryReading>,
    periods: RefreshPeriods,
    now: NowFn,
}

impl<M: MapWidget, S: Surface> DroneView<M, S> {
    pub fn new(mut map: M, surface: S, icon_url: &str, periods: RefreshPeriods) -> Self {
        map.set_view(DRONE_MAP_CENTER.into(), DRONE_MAP_ZOOM);
        map.add_tile_layer(TileLayer::open_topo_map());
        let marker = map.add_marker(drone_marker(icon_url));

        Self {
            map,
            surface,
            marker,
            current: None,
            periods,
            now: local_now,
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, now: NowFn) -> Self {
        self.now = now;
        self
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn marker(&self) -> MarkerId {
        self.marker
    }

    /// The reading currently on display.
    pub fn current(&self) -> Option<&TelemetryReading> {
        self.current.as_ref()
    }

    /// Replaces everything on display with `reading`.
    pub fn apply(&mut self, reading: TelemetryReading, now: &NaiveDateTime) {
        TelemetryPanel::from(&reading).write_to(&mut self.surface);

        let position = reading.position();
        self.map.move_marker(self.marker, position);
        self.map.pan_to(position);

        self.surface.set_text(ElementId::LastUpdate, &format_time(now));
        self.current = Some(reading);
    }

    /// One refresh pass. On failure the display is left as it was.
    pub async fn refresh<T: TelemetrySource>(&mut self, source: &T) -> bool {
        match fetch_drone_data(source).await {
            Some(reading) => {
                let now = (self.now)();
                self.apply(reading, &now);
                true
            }
            None => false,
        }
    }

    pub fn tick_clock(&mut self, now: &NaiveDateTime) -> usize {
        clock::tick(&mut self.surface, now, &[ElementId::CurrentTime])
    }

    /// Runs the telemetry and clock timers until the future is dropped.
    ///
    /// Each telemetry tick spawns its own fetch, so a slow request never
    /// holds back the clock or the next tick. Results are applied in the
    /// order they arrive.
    pub async fn run<T, F>(&mut self, source: Arc<T>, mut observe: F)
    where
        T: TelemetrySource,
        F: FnMut(ViewEvent, &Self),
    {
        let (tx, mut rx) = mpsc::channel::<Option<TelemetryReading>>(16);
        let mut telemetry_ticker = clock::ticker(self.periods.telemetry);
        let mut clock_ticker = clock::ticker(self.periods.clock);

        loop {
            tokio::select! {
                _ = telemetry_ticker.tick() => {
                    let source = Arc::clone(&source);
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let reading = fetch_drone_data(source.as_ref()).await;
                        let _ = tx.send(reading).await;
                    });
                }
                Some(result) = rx.recv() => {
                    match result {
                        Some(reading) => {
                            let now = (self.now)();
                            self.apply(reading, &now);
                            observe(ViewEvent::Updated, self);
                        }
                        None => observe(ViewEvent::FetchFailed, self),
                    }
                }
                _ = clock_ticker.tick() => {
                    let now = (self.now)();
                    self.tick_clock(&now);
                    observe(ViewEvent::ClockTick, self);
                }
            }
        }
    }
}
