use chrono::NaiveDateTime;
use std::time::Duration;

use super::NowFn;
use crate::clock::{self, local_now};
use crate::constants::{NODE_MAP_CENTER, NODE_MAP_ZOOM};
use crate::display::{ElementId, Surface};
use crate::map::{MapWidget, TileLayer};
use crate::nodes::{render_nodes, Node, RenderSummary};

/// Node overview: every sensor node on one map plus a clock.
pub struct NodeMapView<M: MapWidget, S: Surface> {
    map: M,
    surface: S,
    summary: RenderSummary,
    now: NowFn,
}

impl<M: MapWidget, S: Surface> NodeMapView<M, S> {
    pub fn new(mut map: M, surface: S) -> Self {
        map.set_view(NODE_MAP_CENTER.into(), NODE_MAP_ZOOM);
        map.add_tile_layer(TileLayer::open_street_map());
        Self {
            map,
            surface,
            summary: RenderSummary::default(),
            now: local_now,
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, now: NowFn) -> Self {
        self.now = now;
        self
    }

    pub fn render(&mut self, nodes: &[Node]) -> RenderSummary {
        let summary = render_nodes(nodes, &mut self.map);
        tracing::info!(
            markers = summary.markers,
            parents = summary.parents,
            children = summary.children,
            connectors = summary.connectors,
            skipped = summary.skipped,
            "node map rendered"
        );
        if summary.skipped > 0 {
            tracing::debug!("{} node(s) without coordinates left off the map", summary.skipped);
        }
        self.summary = summary;
        summary
    }

    pub fn summary(&self) -> RenderSummary {
        self.summary
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_map(self) -> M {
        self.map
    }

    pub fn tick_clock(&mut self, now: &NaiveDateTime) -> usize {
        clock::tick(&mut self.surface, now, &[ElementId::DbUpdateTime, ElementId::CurrentTime])
    }

    /// Ticks the clock every `period` until the future is dropped.
    pub async fn run_clock<F: FnMut(&Self)>(&mut self, period: Duration, mut observe: F) {
        let mut ticker = clock::ticker(period);
        loop {
            ticker.tick().await;
            let now = (self.now)();
            self.tick_clock(&now);
            observe(self);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::TextBoard;
    use crate::map::{LatLng, MapScene};
    use chrono::NaiveDate;

    fn fixed_now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap().and_hms_opt(8, 0, 0).unwrap()
    }

    fn sample() -> Vec<Node> {
        serde_json::from_str(
            r#"[
                {"node_id": "N1", "title": "Node 1", "is_parent": true, "lat": 40.97, "lng": 24.37},
                {"node_id": "N1_1", "title": "Node 1.1", "is_parent": false, "lat": 40.959556, "lng": 24.353472},
                {"node_id": "N1_2", "is_parent": false, "lat": null, "lng": 24.380628},
                {"node_id": "N9_1", "is_parent": false, "lat": 41.0, "lng": 24.0}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn renders_on_the_kavala_view() {
        let mut view = NodeMapView::new(MapScene::new(), TextBoard::empty());
        let summary = view.render(&sample());

        assert_eq!(
            summary,
            RenderSummary { markers: 3, parents: 1, children: 2, connectors: 1, skipped: 1 }
        );
        let scene = view.into_map();
        assert_eq!(scene.center, Some(LatLng::new(40.95, 24.5)));
        assert_eq!(scene.zoom, 10);
        assert_eq!(scene.tile_layers[0].max_zoom, 18);
    }

    #[test]
    fn clock_fills_db_update_time_too() {
        let mut view = NodeMapView::new(MapScene::new(), TextBoard::all()).with_clock(fixed_now);
        assert_eq!(view.tick_clock(&fixed_now()), 3);
        assert_eq!(view.surface().text(ElementId::DbUpdateTime), Some("8:00:00 π.μ."));
        assert_eq!(view.surface().text(ElementId::CurrentDate), Some("17/10/2026"));
    }

    #[tokio::test(start_paused = true)]
    async fn clock_runs_immediately() {
        let mut view = NodeMapView::new(MapScene::new(), TextBoard::all()).with_clock(fixed_now);
        let _ = tokio::time::timeout(Duration::from_millis(10), view.run_clock(Duration::from_secs(1), |_| {})).await;
        assert_eq!(view.surface().text(ElementId::CurrentTime), Some("8:00:00 π.μ."));
    }
}
