use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::constants::{HEADQUARTERS_REGION, REGION_MAPPING};
use crate::nodes::{Node, ParentFlag};

// Raw sensor reading as recorded by a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub node_id: String,
    pub timestamp: String,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub smoke_level: Option<f64>,
    #[serde(default)]
    pub gas_and_smoke: Option<f64>,
    #[serde(default)]
    pub danger_level: Option<f64>,
    #[serde(default)]
    pub rain: Option<bool>,
    #[serde(default)]
    pub wind_speed: Option<f64>,
    #[serde(default)]
    pub flora_density: Option<f64>,
    #[serde(default)]
    pub slope: Option<f64>,
    /// Columns the dashboard does not interpret, kept as recorded.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// Reading with every field the pages expect filled in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedReading {
    pub node_id: String,
    pub timestamp: String,
    pub temperature: f64,
    pub humidity: f64,
    pub gas_and_smoke: f64,
    pub danger_level: f64,
    pub rain: bool,
    pub wind_speed: f64,
    pub flora_density: f64,
    pub slope: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SensorReading {
    /// Fills in the fields the pages expect. Everything else the reading
    /// carries, `smoke_level` included, passes through untouched.
    pub fn normalize(&self) -> NormalizedReading {
        let mut extra = self.extra.clone();
        if let Some(smoke) = self.smoke_level {
            extra.insert("smoke_level".to_string(), Value::from(smoke));
        }
        NormalizedReading {
            node_id: self.node_id.clone(),
            timestamp: self.timestamp.clone(),
            temperature: self.temperature.unwrap_or(0.0),
            humidity: self.humidity.unwrap_or(0.0),
            gas_and_smoke: self.gas_and_smoke.or(self.smoke_level).unwrap_or(0.0),
            danger_level: self.danger_level.unwrap_or(0.0),
            rain: self.rain.unwrap_or(false),
            wind_speed: self.wind_speed.unwrap_or(0.0),
            flora_density: self.flora_density.unwrap_or(0.0),
            slope: self.slope.unwrap_or(0.0),
            extra,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentReport {
    pub parent_id: String,
    pub report_type: String,
    pub timestamp: String,
    pub status: String,
}

/// Node info merged with its latest reading, as shown on the detail page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub node_id: String,
    pub title: String,
    pub location: String,
    pub is_parent: bool,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub latest: Option<NormalizedReading>,
}

impl NodeView {
    pub fn build(node: &Node, latest: Option<&SensorReading>) -> Self {
        NodeView {
            node_id: node.node_id.clone(),
            title: node.label().to_string(),
            location: node.location.clone().unwrap_or_default(),
            is_parent: node.is_parent(),
            lat: node.lat,
            lng: node.lng,
            latest: latest.map(SensorReading::normalize),
        }
    }
}

/// Seed file layout. Only `nodes` is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSeed {
    pub nodes: Vec<Node>,
    /// node_id -> region_id
    #[serde(default)]
    pub node_regions: HashMap<String, String>,
    #[serde(default)]
    pub readings: Vec<SensorReading>,
    #[serde(default)]
    pub reports: Vec<ParentReport>,
}

impl StoreSeed {
    /// Either a full store object or a bare array of nodes.
    pub fn from_json(content: &str) -> Result<Self> {
        if let Ok(nodes) = serde_json::from_str::<Vec<Node>>(content) {
            return Ok(StoreSeed { nodes, ..Default::default() });
        }
        Ok(serde_json::from_str(content)?)
    }
}

/// Which nodes a region may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionScope {
    All,
    Region(String),
    Unknown,
}

pub fn region_scope(region_name: &str) -> RegionScope {
    if region_name == HEADQUARTERS_REGION {
        return RegionScope::All;
    }
    REGION_MAPPING
        .iter()
        .find(|(name, _)| *name == region_name)
        .map(|(_, id)| RegionScope::Region(id.to_string()))
        .unwrap_or(RegionScope::Unknown)
}

// Read-only node store shared by the HTTP handlers
#[derive(Clone)]
pub struct NodeStore {
    data: Arc<RwLock<StoreSeed>>,
}

impl NodeStore {
    pub fn new(seed: StoreSeed) -> Self {
        NodeStore {
            data: Arc::new(RwLock::new(seed)),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read node file {}", path.display()))?;
        let seed = StoreSeed::from_json(&content)
            .with_context(|| format!("Failed to parse node file {}", path.display()))?;
        Ok(Self::new(seed))
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, StoreSeed>> {
        self.data.read().map_err(|_| anyhow!("node store lock poisoned"))
    }

    pub fn node_count(&self) -> Result<usize> {
        Ok(self.read()?.nodes.len())
    }

    pub fn all_nodes(&self) -> Result<Vec<Node>> {
        Ok(self.read()?.nodes.clone())
    }

    /// Nodes visible to a region, by region name. Headquarters sees everything.
    pub fn nodes_for_region(&self, region_name: &str) -> Result<Vec<Node>> {
        let data = self.read()?;
        let nodes = match region_scope(region_name) {
            RegionScope::All => data.nodes.clone(),
            RegionScope::Region(region_id) => data
                .nodes
                .iter()
                .filter(|n| data.node_regions.get(&n.node_id) == Some(&region_id))
                .cloned()
                .collect(),
            RegionScope::Unknown => Vec::new(),
        };
        Ok(nodes)
    }

    pub fn node(&self, node_id: &str) -> Result<Option<Node>> {
        Ok(self.read()?.nodes.iter().find(|n| n.node_id == node_id).cloned())
    }

    pub fn node_region(&self, node_id: &str) -> Result<Option<String>> {
        Ok(self.read()?.node_regions.get(node_id).cloned())
    }

    /// Whether a caller from `region_name` may see the node. Headquarters sees
    /// every node, an unknown region name sees none.
    pub fn node_visible_to(&self, node_id: &str, region_name: &str) -> Result<bool> {
        Ok(match region_scope(region_name) {
            RegionScope::All => true,
            RegionScope::Region(region_id) => self.node_region(node_id)?.as_deref() == Some(region_id.as_str()),
            RegionScope::Unknown => false,
        })
    }

    /// Readings for a node, newest first.
    pub fn history(&self, node_id: &str) -> Result<Vec<SensorReading>> {
        let data = self.read()?;
        let mut readings: Vec<SensorReading> =
            data.readings.iter().filter(|r| r.node_id == node_id).cloned().collect();
        readings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(readings)
    }

    pub fn node_view(&self, node_id: &str) -> Result<Option<NodeView>> {
        let Some(node) = self.node(node_id)? else {
            return Ok(None);
        };
        let history = self.history(node_id)?;
        Ok(Some(NodeView::build(&node, history.first())))
    }

    /// Reports for a parent node, newest first.
    pub fn parent_reports(&self, parent_id: &str) -> Result<Vec<ParentReport>> {
        let data = self.read()?;
        let mut reports: Vec<ParentReport> =
            data.reports.iter().filter(|r| r.parent_id == parent_id).cloned().collect();
        reports.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(reports)
    }
}

fn sample_node(node_id: &str, title: &str, location: &str, is_parent: bool, lat: f64, lng: f64) -> Node {
    Node {
        node_id: node_id.to_string(),
        title: Some(title.to_string()),
        location: Some(location.to_string()),
        is_parent: Some(ParentFlag::Flag(is_parent)),
        lat: Some(lat),
        lng: Some(lng),
    }
}

fn sample_reading(node_id: &str, timestamp: &str, temperature: f64, humidity: f64, smoke: f64) -> SensorReading {
    SensorReading {
        node_id: node_id.to_string(),
        timestamp: timestamp.to_string(),
        temperature: Some(temperature),
        humidity: Some(humidity),
        smoke_level: Some(smoke),
        gas_and_smoke: None,
        danger_level: None,
        rain: None,
        wind_speed: None,
        flora_density: None,
        slope: None,
        extra: Map::new(),
    }
}

impl Default for NodeStore {
    /// Sample deployment around Kavala, used when no node file is configured.
    fn default() -> Self {
        let nodes = vec![
            sample_node("N1", "Node 1", "Αμυγδαλεώνας, Κεντρικο", true, 40.97, 24.37),
            sample_node("N1_1", "Node 1.1", "Αμυγδαλεώνας, Δυτικά", false, 40.959556, 24.353472),
            sample_node("N1_2", "Node 1.2", "Αμυγδαλεώνας, Κεντρικά", false, 40.983277, 24.380628),
            sample_node("N1_3", "Node 1.3", "Αμυγδαλεώνας, Ανατολικά", false, 40.963, 24.362999),
            sample_node("N2", "Node 2", "Χρυσούπολη, Κεντρικό", true, 40.995, 24.7),
            sample_node("N2_1", "Node 2.1", "Χρυσούπολη, Ανατολικά", false, 40.978577, 24.686108),
            sample_node("N2_2", "Node 2.2", "Χρυσούπολη, Βόρεια", false, 41.01721, 24.711714),
        ];
        let node_regions = nodes.iter().map(|n| (n.node_id.clone(), "FR1".to_string())).collect();
        let readings = vec![
            sample_reading("N1_1", "2024-01-15T10:30:00Z", 25.5, 60.2, 0.1),
            sample_reading("N1_1", "2024-01-15T10:00:00Z", 24.9, 61.0, 0.1),
            sample_reading("N1_2", "2024-01-15T10:30:00Z", 26.1, 58.4, 0.2),
            sample_reading("N2_1", "2024-01-15T10:30:00Z", 27.3, 55.0, 0.3),
        ];
        let reports = vec![
            ParentReport {
                parent_id: "N1".to_string(),
                report_type: "Daily summary".to_string(),
                timestamp: "2024-01-15T10:30:00Z".to_string(),
                status: "active".to_string(),
            },
            ParentReport {
                parent_id: "N2".to_string(),
                report_type: "Daily summary".to_string(),
                timestamp: "2024-01-15T10:30:00Z".to_string(),
                status: "active".to_string(),
            },
        ];

        NodeStore::new(StoreSeed { nodes, node_regions, readings, reports })
    }
}
