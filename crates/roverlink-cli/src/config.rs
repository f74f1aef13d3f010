//! Configuration vault – reads/writes `~/.roverlink/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use roverlink_supervisor::{DEFAULT_SETUP_PREFIX, ProcessSet};
use roverlink_types::BridgeError;

/// Worker-process pattern lists, overridable per deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    pub mapping: Vec<String>,
    pub positioning: Vec<String>,
    pub rpm_probe: String,
    pub odometry_probe: String,
    pub fusion_probe: String,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        let set = ProcessSet::default();
        Self {
            mapping: set.mapping,
            positioning: set.positioning,
            rpm_probe: set.rpm_probe,
            odometry_probe: set.odometry_probe,
            fusion_probe: set.fusion_probe,
        }
    }
}

impl From<ProcessConfig> for ProcessSet {
    fn from(cfg: ProcessConfig) -> Self {
        Self {
            mapping: cfg.mapping,
            positioning: cfg.positioning,
            rpm_probe: cfg.rpm_probe,
            odometry_probe: cfg.odometry_probe,
            fusion_probe: cfg.fusion_probe,
        }
    }
}

/// Persisted bridge configuration stored in `~/.roverlink/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// rosbridge WebSocket endpoint on the robot.
    #[serde(default = "default_rosbridge_url")]
    pub rosbridge_url: String,

    /// HTTP port the gateway binds on.
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Shell prefix sourced before every launched worker command. Set to an
    /// empty string to launch commands without environment activation.
    #[serde(default = "default_setup_prefix")]
    pub setup_prefix: String,

    #[serde(default)]
    pub processes: ProcessConfig,
}

fn default_rosbridge_url() -> String {
    "ws://localhost:9090".to_string()
}

fn default_http_port() -> u16 {
    roverlink_gateway::DEFAULT_PORT
}

fn default_setup_prefix() -> String {
    DEFAULT_SETUP_PREFIX.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rosbridge_url: default_rosbridge_url(),
            http_port: default_http_port(),
            setup_prefix: default_setup_prefix(),
            processes: ProcessConfig::default(),
        }
    }
}

impl Config {
    /// The setup prefix as the supervisor expects it: `None` when disabled.
    pub fn setup_prefix_opt(&self) -> Option<String> {
        if self.setup_prefix.is_empty() {
            None
        } else {
            Some(self.setup_prefix.clone())
        }
    }
}

/// Return the config path: `$ROVERLINK_CONFIG` when set, otherwise
/// `~/.roverlink/config.toml`.
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("ROVERLINK_CONFIG") {
        return PathBuf::from(path);
    }
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".roverlink").join("config.toml")
}

/// Load the configuration. Returns `Ok(None)` when no config file exists.
pub fn load() -> Result<Option<Config>, BridgeError> {
    load_from(&config_path())
}

fn load_from(path: &PathBuf) -> Result<Option<Config>, BridgeError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| BridgeError::Config(format!("read {}: {e}", path.display())))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| BridgeError::Config(format!("parse {}: {e}", path.display())))?;
    Ok(Some(cfg))
}

/// Write the configuration, creating `~/.roverlink/` if needed.
pub fn save(cfg: &Config) -> Result<(), BridgeError> {
    save_to(cfg, &config_path())
}

fn save_to(cfg: &Config, path: &PathBuf) -> Result<(), BridgeError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| BridgeError::Config(format!("create {}: {e}", parent.display())))?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| BridgeError::Config(format!("serialize config: {e}")))?;
    fs::write(path, raw)
        .map_err(|e| BridgeError::Config(format!("write {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment() {
        let cfg = Config::default();
        assert_eq!(cfg.rosbridge_url, "ws://localhost:9090");
        assert_eq!(cfg.http_port, 1880);
        assert!(cfg.setup_prefix.contains("setup.bash"));
        assert_eq!(cfg.processes.mapping.len(), 2);
    }

    #[test]
    fn empty_toml_falls_back_to_field_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.http_port, 1880);
        assert_eq!(cfg.processes.fusion_probe, "ekf_node");
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let cfg: Config = toml::from_str(r#"http_port = 8080"#).unwrap();
        assert_eq!(cfg.http_port, 8080);
        assert_eq!(cfg.rosbridge_url, "ws://localhost:9090");
    }

    #[test]
    fn empty_setup_prefix_disables_activation() {
        let cfg: Config = toml::from_str(r#"setup_prefix = """#).unwrap();
        assert_eq!(cfg.setup_prefix_opt(), None);

        let cfg = Config::default();
        assert!(cfg.setup_prefix_opt().is_some());
    }

    #[test]
    fn save_then_load_round_trips() {
        let home = tempfile::tempdir().unwrap();
        let path = config_path_for_home(home.path().to_str().unwrap());

        let mut cfg = Config::default();
        cfg.http_port = 2880;
        cfg.processes.mapping.push("extra_worker.py".to_string());
        save_to(&cfg, &path).unwrap();

        let loaded = load_from(&path).unwrap().expect("config must exist");
        assert_eq!(loaded.http_port, 2880);
        assert!(loaded.processes.mapping.contains(&"extra_worker.py".to_string()));
    }

    #[test]
    fn missing_file_loads_as_none() {
        let home = tempfile::tempdir().unwrap();
        let path = config_path_for_home(home.path().to_str().unwrap());
        assert!(load_from(&path).unwrap().is_none());
    }
}
