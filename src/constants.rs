// Server configuration
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const API_VERSION: &str = "1.2.0";

// Refresh periods
pub const TELEMETRY_INTERVAL_MS: u64 = 2000;
pub const CLOCK_INTERVAL_MS: u64 = 1000;

pub const TELEMETRY_PATH: &str = "/api/drone_telemetry";
pub const DEFAULT_DRONE_IMAGE_URL: &str = "/static/drone.svg";

// Drone map: Thessaloniki gulf on OpenTopoMap
pub const DRONE_MAP_CENTER: (f64, f64) = (40.8, 23.5);
pub const DRONE_MAP_ZOOM: u8 = 7;
pub const TOPO_TILE_URL: &str = "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png";
pub const TOPO_MAX_ZOOM: u8 = 17;
pub const TOPO_ATTRIBUTION: &str = "Map data: &copy; <a href=\"https://www.openstreetmap.org/\">OpenStreetMap</a> contributors, SRTM | Map style: &copy; <a href=\"https://opentopomap.org\">OpenTopoMap</a>";

// Node map: Kavala on OpenStreetMap
pub const NODE_MAP_CENTER: (f64, f64) = (40.95, 24.5);
pub const NODE_MAP_ZOOM: u8 = 10;
pub const OSM_TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const OSM_MAX_ZOOM: u8 = 18;
pub const OSM_ATTRIBUTION: &str = "© OpenStreetMap contributors";

// Icon sizes in pixels
pub const DRONE_ICON_SIZE: u32 = 60;
pub const PARENT_ICON_SIZE: u32 = 30;
pub const CHILD_ICON_SIZE: u32 = 20;
pub const DRONE_MARKER_Z_OFFSET: i32 = 1000;

// Connector line style
pub const CONNECTOR_COLOR: &str = "red";
pub const CONNECTOR_WEIGHT: u32 = 2;
pub const CONNECTOR_DASH: &str = "5,5";

// Localized (el-GR) labels
pub const FIRE_ALERT_CLASS: &str = "fire-alert";
pub const FIRE_NORMAL_TEXT: &str = "Κανονική κατάσταση";
pub const HEADQUARTERS_REGION: &str = "Αρχηγείο / Ε.Σ.Κ.Ε.ΔΙ.Κ.";

pub const REGION_MAPPING: &[(&str, &str)] = &[
    ("Ανατολικής Μακεδονίας και Θράκης", "FR1"),
    ("Κεντρικής Μακεδονίας", "FR2"),
    ("Δυτικής Μακεδονίας", "FR3"),
    ("Ηπείρου", "FR4"),
    ("Θεσσαλίας", "FR5"),
    ("Ιονίων Νήσων", "FR6"),
    ("Δυτικής Ελλάδας", "FR7"),
    ("Στερεάς Ελλάδας", "FR8"),
    ("Αττικής", "FR9"),
    ("Πελοποννήσου", "FR10"),
    ("Βορείου Αιγαίου", "FR11"),
    ("Νοτίου Αιγαίου", "FR12"),
    ("Κρήτης", "FR13"),
];
