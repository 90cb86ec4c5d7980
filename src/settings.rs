use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::constants::{
    CLOCK_INTERVAL_MS, DEFAULT_DRONE_IMAGE_URL, DEFAULT_HOST, DEFAULT_PORT, TELEMETRY_INTERVAL_MS,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// JSON file with the node list; the built-in sample set is used when unset.
    pub nodes_file: Option<String>,
    pub telemetry_interval_ms: u64,
    pub clock_interval_ms: u64,
    pub drone_image_url: String,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            nodes_file: None,
            telemetry_interval_ms: TELEMETRY_INTERVAL_MS,
            clock_interval_ms: CLOCK_INTERVAL_MS,
            drone_image_url: DEFAULT_DRONE_IMAGE_URL.to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Defaults, then the settings file (if it exists), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);
        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
            Self::parse(&content)
        } else {
            Settings::default()
        };
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// `key = value` lines; `#` starts a comment. Unknown keys and bad values are ignored.
    pub fn parse(content: &str) -> Self {
        let mut settings = Settings::default();
        let mut config_map = HashMap::new();

        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') || line.is_empty() {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                config_map.insert(key.trim().to_string(), value.trim().trim_matches('"').to_string());
            }
        }

        if let Some(host) = config_map.get("host") {
            settings.host = host.clone();
        }
        if let Some(port) = config_map.get("port").and_then(|v| v.parse::<u16>().ok()) {
            settings.port = port;
        }
        if let Some(nodes_file) = config_map.get("nodes_file").filter(|v| !v.is_empty()) {
            settings.nodes_file = Some(nodes_file.clone());
        }
        if let Some(ms) = config_map.get("telemetry_interval_ms").and_then(|v| v.parse::<u64>().ok()) {
            settings.telemetry_interval_ms = ms.max(1);
        }
        if let Some(ms) = config_map.get("clock_interval_ms").and_then(|v| v.parse::<u64>().ok()) {
            settings.clock_interval_ms = ms.max(1);
        }
        if let Some(url) = config_map.get("drone_image_url") {
            settings.drone_image_url = url.clone();
        }
        if let Some(filter) = config_map.get("log_filter") {
            settings.log_filter = filter.clone();
        }

        settings
    }

    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("HOST") {
            self.host = host;
        }
        if let Some(port) = var("PORT").and_then(|v| v.parse::<u16>().ok()) {
            self.port = port;
        }
        if let Some(nodes_file) = var("DASHBOARD_NODES_FILE") {
            self.nodes_file = Some(nodes_file);
        }
        if let Some(filter) = var("RUST_LOG") {
            self.log_filter = filter;
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Creating config directory")?;
        }

        let mut content = String::new();
        content.push_str("# Fire Dashboard Configuration File\n");
        content.push_str(&format!("host = \"{}\"\n", self.host));
        content.push_str(&format!("port = {}\n", self.port));
        if let Some(ref nodes_file) = self.nodes_file {
            content.push_str(&format!("nodes_file = \"{}\"\n", nodes_file));
        }
        content.push_str(&format!("telemetry_interval_ms = {}\n", self.telemetry_interval_ms));
        content.push_str(&format!("clock_interval_ms = {}\n", self.clock_interval_ms));
        content.push_str(&format!("drone_image_url = \"{}\"\n", self.drone_image_url));
        content.push_str(&format!("log_filter = \"{}\"\n", self.log_filter));

        std::fs::write(path, content).context("Failed to write to config file")?;
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `dashboard.ini` next to the executable (the crate root under `cargo run`).
    pub fn config_path() -> PathBuf {
        let mut path = std::env::current_exe()
            .unwrap_or_default()
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        if path.ends_with("target/debug") || path.ends_with("target/release") {
            path.pop();
            path.pop();
        }
        path.push("dashboard.ini");
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reads_known_keys_and_skips_the_rest() {
        let settings = Settings::parse(
            "# comment\n\
             host = \"127.0.0.1\"\n\
             port = 8080\n\
             nodes_file = nodes.json\n\
             telemetry_interval_ms = 500\n\
             colour = blue\n\
             clock_interval_ms = soon\n",
        );
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.nodes_file.as_deref(), Some("nodes.json"));
        assert_eq!(settings.telemetry_interval_ms, 500);
        assert_eq!(settings.clock_interval_ms, 1000);
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut settings = Settings::parse("port = 8080\n");
        settings.apply_env(|key| match key {
            "PORT" => Some("9090".to_string()),
            "HOST" => Some("localhost".to_string()),
            _ => None,
        });
        assert_eq!(settings.port, 9090);
        assert_eq!(settings.bind_addr(), "localhost:9090");
    }

    #[test]
    fn bad_port_in_environment_is_ignored() {
        let mut settings = Settings::default();
        settings.apply_env(|key| (key == "PORT").then(|| "http".to_string()));
        assert_eq!(settings.port, 5000);
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("dashboard.ini");
        let settings = Settings {
            port: 6001,
            nodes_file: Some("/srv/nodes.json".to_string()),
            ..Settings::default()
        };
        settings.save(&path).unwrap();

        let loaded = Settings::parse(&std::fs::read_to_string(&path).unwrap());
        assert_eq!(loaded, settings);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(Some(&dir.path().join("absent.ini"))).unwrap();
        assert_eq!(settings.telemetry_interval_ms, 2000);
        assert_eq!(settings.drone_image_url, "/static/drone.svg");
    }
}
