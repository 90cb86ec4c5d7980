use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

use crate::constants::{CHILD_ICON_SIZE, CONNECTOR_COLOR, CONNECTOR_DASH, CONNECTOR_WEIGHT, PARENT_ICON_SIZE};
use crate::map::{LatLng, MapWidget, Marker, MarkerIcon, Polyline, Tooltip};

/// `is_parent` arrives either as a JSON boolean or as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParentFlag {
    Flag(bool),
    Text(String),
}

impl ParentFlag {
    pub fn is_set(&self) -> bool {
        match self {
            ParentFlag::Flag(flag) => *flag,
            ParentFlag::Text(text) => text == "true",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub node_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub is_parent: Option<ParentFlag>,
    #[serde(default, deserialize_with = "coordinate")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "coordinate")]
    pub lng: Option<f64>,
}

// Accepts numbers and numeric strings; anything else counts as missing
fn coordinate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

impl Node {
    pub fn is_parent(&self) -> bool {
        self.is_parent.as_ref().map_or(false, ParentFlag::is_set)
    }

    /// Coordinate of the node, if both halves are valid.
    pub fn position(&self) -> Option<LatLng> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(LatLng::new(lat, lng)),
            _ => None,
        }
    }

    pub fn label(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => &self.node_id,
        }
    }

    pub fn url(&self) -> String {
        node_url(&self.node_id, self.is_parent())
    }
}

/// `N1_2` -> `/node/1.2`, `N3` (parent) -> `/parent/3`
pub fn node_url(node_id: &str, is_parent: bool) -> String {
    let formatted: String = node_id.chars().skip(1).collect::<String>().replace('_', ".");
    if is_parent {
        format!("/parent/{}", formatted)
    } else {
        format!("/node/{}", formatted)
    }
}

/// Parent of a child id: `N1_2` -> `N1`. Ids without an underscore have none.
pub fn parent_id_of(node_id: &str) -> Option<String> {
    let (head, _) = node_id.split_once('_')?;
    let digits: String = head.chars().skip(1).collect();
    Some(format!("N{}", digits))
}

/// Route id -> stored id. Accepts `N1_1` as is and converts `1.1` to `N1_1`.
pub fn store_id(route_id: &str) -> String {
    if route_id.starts_with('N') {
        route_id.to_string()
    } else {
        format!("N{}", route_id.replace('.', "_"))
    }
}

/// Coordinates of every parent node with a valid position.
#[derive(Debug, Clone, Default)]
pub struct ParentIndex {
    coords: HashMap<String, LatLng>,
}

impl ParentIndex {
    pub fn build(nodes: &[Node]) -> Self {
        let coords = nodes
            .iter()
            .filter(|node| node.is_parent())
            .filter_map(|node| node.position().map(|pos| (node.node_id.clone(), pos)))
            .collect();
        Self { coords }
    }

    pub fn get(&self, node_id: &str) -> Option<LatLng> {
        self.coords.get(node_id).copied()
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }
}

pub fn node_icon(is_parent: bool) -> MarkerIcon {
    let (class_name, glyph, size) = if is_parent {
        ("home-icon", "fa-home", PARENT_ICON_SIZE)
    } else {
        ("marker-icon", "fa-circle", CHILD_ICON_SIZE)
    };
    MarkerIcon::Div {
        html: format!("<i class=\"fas {}\"></i>", glyph),
        size: [size, size],
        anchor: [size / 2, size / 2],
        class_name: class_name.to_string(),
    }
}

pub fn connector(child: LatLng, parent: LatLng) -> Polyline {
    Polyline {
        points: vec![child, parent],
        color: CONNECTOR_COLOR.to_string(),
        weight: CONNECTOR_WEIGHT,
        dash_array: Some(CONNECTOR_DASH.to_string()),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderSummary {
    pub markers: usize,
    pub parents: usize,
    pub children: usize,
    pub connectors: usize,
    pub skipped: usize,
}

/// Places every node on the map and links children to their parents.
///
/// The parent index is built from the whole list before the first marker is
/// drawn, so a child listed ahead of its parent still gets its connector.
pub fn render_nodes<M: MapWidget>(nodes: &[Node], map: &mut M) -> RenderSummary {
    let index = ParentIndex::build(nodes);
    if index.is_empty() {
        tracing::debug!("no parent node has coordinates, children get no connectors");
    } else {
        tracing::debug!(parents = index.len(), "parent index built");
    }
    let mut summary = RenderSummary::default();

    for node in nodes {
        let Some(position) = node.position() else {
            summary.skipped += 1;
            continue;
        };

        let is_parent = node.is_parent();
        map.add_marker(Marker {
            position,
            icon: node_icon(is_parent),
            tooltip: Some(Tooltip::above(node.label())),
            href: Some(node.url()),
            z_index_offset: 0,
        });
        summary.markers += 1;

        if is_parent {
            summary.parents += 1;
            continue;
        }
        summary.children += 1;

        if let Some(parent) = parent_id_of(&node.node_id).and_then(|id| index.get(&id)) {
            map.add_polyline(connector(position, parent));
            summary.connectors += 1;
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::MapScene;
    use serde_json::json;

    fn nodes(value: serde_json::Value) -> Vec<Node> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn child_is_linked_to_its_parent() {
        let list = nodes(json!([
            {"node_id": "N1", "is_parent": true, "lat": 10, "lng": 20},
            {"node_id": "N1_2", "is_parent": false, "lat": 11, "lng": 21}
        ]));
        let mut scene = MapScene::new();
        let summary = render_nodes(&list, &mut scene);

        assert_eq!(summary.connectors, 1);
        assert_eq!(scene.lines.len(), 1);
        assert_eq!(scene.lines[0].points, vec![LatLng::new(11.0, 21.0), LatLng::new(10.0, 20.0)]);
        assert_eq!(scene.lines[0].dash_array.as_deref(), Some("5,5"));
    }

    #[test]
    fn orphan_child_gets_no_connector() {
        let list = nodes(json!([{"node_id": "N1_2", "is_parent": false, "lat": 11, "lng": 21}]));
        let mut scene = MapScene::new();
        let summary = render_nodes(&list, &mut scene);

        assert_eq!(summary.markers, 1);
        assert_eq!(summary.connectors, 0);
        assert!(scene.lines.is_empty());
    }

    #[test]
    fn parent_listed_after_child_still_links() {
        let list = nodes(json!([
            {"node_id": "N4_1", "is_parent": "false", "lat": 1.5, "lng": 2.5},
            {"node_id": "N4", "is_parent": "true", "lat": "1.0", "lng": "2.0"}
        ]));
        let mut scene = MapScene::new();
        let summary = render_nodes(&list, &mut scene);

        assert_eq!(summary.parents, 1);
        assert_eq!(summary.children, 1);
        assert_eq!(scene.lines[0].points[1], LatLng::new(1.0, 2.0));
    }

    #[test]
    fn node_missing_lat_is_skipped_everywhere() {
        let list = nodes(json!([
            {"node_id": "N1", "is_parent": true, "lng": 20},
            {"node_id": "N1_1", "is_parent": false, "lat": 11, "lng": 21}
        ]));
        let mut scene = MapScene::new();
        let summary = render_nodes(&list, &mut scene);

        assert!(ParentIndex::build(&list).is_empty());
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.markers, 1);
        assert_eq!(summary.parents, 0);
        assert!(scene.lines.is_empty());
    }

    #[test]
    fn zero_coordinates_are_valid() {
        let list = nodes(json!([
            {"node_id": "N5", "is_parent": true, "lat": 0, "lng": 0},
            {"node_id": "N5_1", "is_parent": false, "lat": 0.0, "lng": "0"}
        ]));
        assert_eq!(list[0].position(), Some(LatLng::new(0.0, 0.0)));
        assert_eq!(ParentIndex::build(&list).len(), 1);

        let mut scene = MapScene::new();
        let summary = render_nodes(&list, &mut scene);
        assert_eq!(summary.markers, 2);
        assert_eq!(summary.skipped, 0);
        assert_eq!(scene.lines[0].points, vec![LatLng::new(0.0, 0.0), LatLng::new(0.0, 0.0)]);
    }

    #[test]
    fn null_and_garbage_coordinates_are_invalid() {
        let list = nodes(json!([
            {"node_id": "N1", "lat": null, "lng": 20},
            {"node_id": "N2", "lat": "north", "lng": 20}
        ]));
        assert!(list.iter().all(|n| n.position().is_none()));
    }

    #[test]
    fn markers_carry_label_icon_and_link() {
        let list = nodes(json!([
            {"node_id": "N2", "title": "Node 2", "is_parent": true, "lat": 40.995, "lng": 24.7},
            {"node_id": "N2_1", "is_parent": false, "lat": 40.97, "lng": 24.68}
        ]));
        let mut scene = MapScene::new();
        render_nodes(&list, &mut scene);

        let parent = &scene.markers[0];
        assert_eq!(parent.tooltip.as_ref().unwrap().text, "Node 2");
        assert_eq!(parent.href.as_deref(), Some("/parent/2"));
        assert!(matches!(&parent.icon, MarkerIcon::Div { class_name, size, .. } if class_name == "home-icon" && *size == [30, 30]));

        let child = &scene.markers[1];
        assert_eq!(child.tooltip.as_ref().unwrap().text, "N2_1");
        assert_eq!(child.href.as_deref(), Some("/node/2.1"));
        assert!(matches!(&child.icon, MarkerIcon::Div { anchor, .. } if *anchor == [10, 10]));
    }

    #[test]
    fn ids_convert_between_routes_and_store() {
        assert_eq!(node_url("N1_2", false), "/node/1.2");
        assert_eq!(node_url("N3", true), "/parent/3");
        assert_eq!(node_url("N1_2_3", false), "/node/1.2.3");
        assert_eq!(parent_id_of("N12_3"), Some("N12".to_string()));
        assert_eq!(parent_id_of("N12"), None);
        assert_eq!(store_id("1.1"), "N1_1");
        assert_eq!(store_id("N1_1"), "N1_1");
    }

    #[test]
    fn parent_flag_accepts_bool_and_string() {
        let list = nodes(json!([
            {"node_id": "N1", "is_parent": true},
            {"node_id": "N2", "is_parent": "true"},
            {"node_id": "N3", "is_parent": "yes"},
            {"node_id": "N4"}
        ]));
        let flags: Vec<bool> = list.iter().map(Node::is_parent).collect();
        assert_eq!(flags, vec![true, true, false, false]);
    }
}
