use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use jotter_core::config::CoreConfig;
use serde::{Deserialize, Serialize};

/// CLI configuration that can be loaded from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    /// Directory holding the command database
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Also write logs to this file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Seed the built-in commands on startup
    #[serde(default = "default_seed_builtins")]
    pub seed_builtins: bool,
}

fn default_seed_builtins() -> bool {
    true
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            log_file: None,
            seed_builtins: true,
        }
    }
}

impl CliConfig {
    /// Load config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to deserialize config")
    }

    /// Core settings, with `data_dir_override` (the `--data-dir` flag)
    /// taking precedence over the file.
    pub fn core_config(&self, data_dir_override: Option<&Path>) -> CoreConfig {
        let data_dir = data_dir_override
            .map(Path::to_path_buf)
            .or_else(|| self.data_dir.clone())
            .unwrap_or_else(CoreConfig::default_data_dir);
        CoreConfig::new(data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_full() {
        let json = r#"{
            "dataDir": "/tmp/jotter",
            "logFile": "/tmp/jotter/cli.log",
            "seedBuiltins": false
        }"#;
        let config = CliConfig::from_json(json).unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/jotter")));
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/jotter/cli.log")));
        assert!(!config.seed_builtins);
    }

    #[test]
    fn test_parse_config_minimal() {
        let config = CliConfig::from_json("{}").unwrap();
        assert!(config.data_dir.is_none());
        assert!(config.log_file.is_none());
        assert!(config.seed_builtins);
    }

    #[test]
    fn test_parse_config_rejects_bad_types() {
        assert!(CliConfig::from_json(r#"{"seedBuiltins": "yes"}"#).is_err());
    }

    #[test]
    fn test_flag_overrides_file() {
        let config = CliConfig {
            data_dir: Some(PathBuf::from("/from/file")),
            ..Default::default()
        };
        assert_eq!(config.core_config(None).data_dir, PathBuf::from("/from/file"));
        assert_eq!(
            config.core_config(Some(Path::new("/from/flag"))).data_dir,
            PathBuf::from("/from/flag")
        );
        assert_eq!(
            CliConfig::default().core_config(None).data_dir,
            CoreConfig::default_data_dir()
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jotter.json");
        std::fs::write(&path, r#"{"dataDir": "/srv/jotter"}"#).unwrap();

        let config = CliConfig::load(&path).unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("/srv/jotter")));

        let missing = CliConfig::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(missing.to_string().contains("Failed to read config file"));
    }
}
