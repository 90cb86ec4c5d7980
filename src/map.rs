use serde::{Deserialize, Serialize};

use crate::constants::{OSM_ATTRIBUTION, OSM_MAX_ZOOM, OSM_TILE_URL, TOPO_ATTRIBUTION, TOPO_MAX_ZOOM, TOPO_TILE_URL};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<(f64, f64)> for LatLng {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLayer {
    pub url_template: String,
    pub max_zoom: u8,
    pub attribution: String,
}

impl TileLayer {
    pub fn open_street_map() -> Self {
        Self {
            url_template: OSM_TILE_URL.to_string(),
            max_zoom: OSM_MAX_ZOOM,
            attribution: OSM_ATTRIBUTION.to_string(),
        }
    }

    pub fn open_topo_map() -> Self {
        Self {
            url_template: TOPO_TILE_URL.to_string(),
            max_zoom: TOPO_MAX_ZOOM,
            attribution: TOPO_ATTRIBUTION.to_string(),
        }
    }
}

// Icon shapes understood by the page script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkerIcon {
    Image {
        url: String,
        size: [u32; 2],
        anchor: [u32; 2],
        class_name: String,
    },
    Div {
        html: String,
        size: [u32; 2],
        anchor: [u32; 2],
        class_name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tooltip {
    pub text: String,
    pub direction: String,
    pub offset: [i32; 2],
    pub opacity: f64,
}

impl Tooltip {
    pub fn above(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            direction: "top".to_string(),
            offset: [0, -10],
            opacity: 0.9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub position: LatLng,
    pub icon: MarkerIcon,
    #[serde(default)]
    pub tooltip: Option<Tooltip>,
    /// Navigation target on click.
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub z_index_offset: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub points: Vec<LatLng>,
    pub color: String,
    pub weight: u32,
    #[serde(default)]
    pub dash_array: Option<String>,
}

/// Handle to a marker placed on a [`MapWidget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerId(pub usize);

/// The map operations the views rely on.
pub trait MapWidget {
    fn set_view(&mut self, center: LatLng, zoom: u8);
    fn add_tile_layer(&mut self, layer: TileLayer);
    fn add_marker(&mut self, marker: Marker) -> MarkerId;
    fn move_marker(&mut self, id: MarkerId, to: LatLng);
    fn pan_to(&mut self, center: LatLng);
    fn add_polyline(&mut self, line: Polyline);
}

/// A map recorded as plain data. The page script replays it with Leaflet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapScene {
    pub center: Option<LatLng>,
    pub zoom: u8,
    pub tile_layers: Vec<TileLayer>,
    pub markers: Vec<Marker>,
    pub lines: Vec<Polyline>,
}

impl MapScene {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn marker(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(id.0)
    }
}

impl MapWidget for MapScene {
    fn set_view(&mut self, center: LatLng, zoom: u8) {
        self.center = Some(center);
        self.zoom = zoom;
    }

    fn add_tile_layer(&mut self, layer: TileLayer) {
        self.tile_layers.push(layer);
    }

    fn add_marker(&mut self, marker: Marker) -> MarkerId {
        self.markers.push(marker);
        MarkerId(self.markers.len() - 1)
    }

    fn move_marker(&mut self, id: MarkerId, to: LatLng) {
        if let Some(marker) = self.markers.get_mut(id.0) {
            marker.position = to;
        }
    }

    fn pan_to(&mut self, center: LatLng) {
        self.center = Some(center);
    }

    fn add_polyline(&mut self, line: Polyline) {
        self.lines.push(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(at: LatLng) -> Marker {
        Marker {
            position: at,
            icon: MarkerIcon::Div {
                html: String::new(),
                size: [20, 20],
                anchor: [10, 10],
                class_name: "marker-icon".to_string(),
            },
            tooltip: None,
            href: None,
            z_index_offset: 0,
        }
    }

    #[test]
    fn scene_moves_markers_and_pans() {
        let mut scene = MapScene::new();
        scene.set_view(LatLng::new(40.8, 23.5), 7);
        let id = scene.add_marker(dot(LatLng::new(40.8, 23.5)));

        scene.move_marker(id, LatLng::new(41.0, 24.0));
        scene.pan_to(LatLng::new(41.0, 24.0));

        assert_eq!(scene.marker(id).unwrap().position, LatLng::new(41.0, 24.0));
        assert_eq!(scene.center, Some(LatLng::new(41.0, 24.0)));
        assert_eq!(scene.zoom, 7);
    }

    #[test]
    fn icons_serialize_with_kind_tag() {
        let json = serde_json::to_value(dot(LatLng::new(1.0, 2.0))).unwrap();
        assert_eq!(json["icon"]["kind"], "div");
        assert_eq!(json["position"]["lng"], 2.0);
    }
}
