use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Runtime configuration, resolved once at startup and passed into the
/// components that need it. The paths are fixed for the process lifetime;
/// nothing re-reads ambient settings per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory the disk2iso service drops its JSON status documents into.
    pub api_dir: PathBuf,
    /// Where finished ISO images land.
    pub output_dir: PathBuf,
    /// systemd unit name of the ripping service.
    pub service_name: String,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_dir: PathBuf::from("/opt/disk2iso/api"),
            output_dir: PathBuf::from("/media/iso"),
            service_name: "disk2iso".to_string(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8088,
        }
    }
}

/// Get the path to the config file (tries working directory first, then
/// ~/.config/isowatch/config.yaml)
pub fn get_config_path() -> PathBuf {
    let project_config = PathBuf::from("config.yaml");

    if project_config.exists() {
        return project_config;
    }

    if let Some(home_dir) = dirs::home_dir() {
        let home_config = home_dir.join(".config").join("isowatch").join("config.yaml");
        if home_config.exists() {
            return home_config;
        }
    }

    project_config
}

impl Config {
    /// Load config from config.yaml in the working directory or
    /// ~/.config/isowatch/config.yaml, falling back to defaults.
    pub fn load() -> Result<Self> {
        let config_path = get_config_path();

        if config_path.exists() {
            info!("Loading config from {}", config_path.display());
            Self::load_from_file(&config_path)
        } else {
            warn!("No config.yaml found, using defaults");
            Ok(Config::default())
        }
    }

    /// Load config from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.api_dir, PathBuf::from("/opt/disk2iso/api"));
        assert_eq!(config.output_dir, PathBuf::from("/media/iso"));
        assert_eq!(config.service_name, "disk2iso");
        assert_eq!(config.server.port, 8088);
    }

    #[test]
    fn test_config_deserialization() {
        let yaml = r#"
api_dir: /var/lib/disk2iso/api
output_dir: /srv/iso
service_name: disk2iso
server:
  host: 127.0.0.1
  port: 9000
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.api_dir, PathBuf::from("/var/lib/disk2iso/api"));
        assert_eq!(config.output_dir, PathBuf::from("/srv/iso"));
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let yaml = "output_dir: /srv/iso\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/srv/iso"));
        assert_eq!(config.api_dir, PathBuf::from("/opt/disk2iso/api"));
        assert_eq!(config.server.port, 8088);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config {
            output_dir: PathBuf::from("/tmp/iso"),
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("output_dir"));
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.output_dir, config.output_dir);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "service_name: disk2iso-test\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.service_name, "disk2iso-test");
    }
}
