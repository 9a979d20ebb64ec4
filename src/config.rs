//! Loader configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::timestamp::DEFAULT_TIMESTAMP_FORMATS;

/// Directory searched for continuous data and template files.
pub const DEFAULT_DATA_DIR: &str = "./";
/// Directory searched for `cc_sum` and detection files.
pub const DEFAULT_OUTPUT_DIR: &str = "./output/";

/// Configuration for [`Loader`](crate::Loader).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Base directory for `load_data` and `load_template`
    pub data_dir: PathBuf,
    /// Base directory for `load_cc` and `load_detections`
    pub output_dir: PathBuf,
    /// chrono layouts tried when the stored date is not RFC 3339
    pub timestamp_formats: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            timestamp_formats: DEFAULT_TIMESTAMP_FORMATS
                .iter()
                .map(|f| f.to_string())
                .collect(),
        }
    }
}

impl LoaderConfig {
    /// Read a JSON config file. Missing fields fall back to the defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).context("parsing loader config JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_conventional_directories() {
        let cfg = LoaderConfig::default();
        assert_eq!(cfg.data_dir, PathBuf::from("./"));
        assert_eq!(cfg.output_dir, PathBuf::from("./output/"));
        assert_eq!(cfg.timestamp_formats.len(), DEFAULT_TIMESTAMP_FORMATS.len());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: LoaderConfig = serde_json::from_str(r#"{ "output_dir": "/data/run1" }"#).unwrap();
        assert_eq!(cfg.output_dir, PathBuf::from("/data/run1"));
        assert_eq!(cfg.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
    }

    #[test]
    fn reads_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loader.json");
        let json = r#"{ "data_dir": "raw", "timestamp_formats": ["%d/%m/%Y"] }"#;
        std::fs::write(&path, json).unwrap();

        let cfg = LoaderConfig::from_json_file(&path).unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("raw"));
        assert_eq!(cfg.timestamp_formats, vec!["%d/%m/%Y".to_string()]);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LoaderConfig::from_json_file(&dir.path().join("nope.json")).is_err());
    }
}
