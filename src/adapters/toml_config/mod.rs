// TOML config adapter - Configuration management using TOML files

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::model::ConverterId;

/// Errors while locating or reading the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Paths (or bare names looked up on PATH) of the wrapped executables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutablesConfig {
    pub mkvmerge: String,
    pub ffmpeg: String,
    pub ffprobe: String,
    pub mp4box: String,
    pub avidemux: String,
    pub asfbin: String,
    /// `file(1)`, used to sniff containers for tools without an info command
    pub file: String,
}

impl Default for ExecutablesConfig {
    fn default() -> Self {
        if cfg!(windows) {
            Self {
                mkvmerge: "MKVMERGE.EXE".to_string(),
                ffmpeg: "FFMPEG.EXE".to_string(),
                ffprobe: "FFPROBE.EXE".to_string(),
                mp4box: "MP4BOX.EXE".to_string(),
                avidemux: "AVIDEMUX.EXE".to_string(),
                asfbin: "ASFBIN.EXE".to_string(),
                file: "FILE.EXE".to_string(),
            }
        } else {
            Self {
                mkvmerge: "mkvmerge".to_string(),
                ffmpeg: "ffmpeg".to_string(),
                ffprobe: "ffprobe".to_string(),
                mp4box: "MP4Box".to_string(),
                avidemux: "avidemux3_cli".to_string(),
                asfbin: "asfbin".to_string(),
                file: "file".to_string(),
            }
        }
    }
}

impl ExecutablesConfig {
    /// Main executable of a converter
    pub fn for_converter(&self, id: ConverterId) -> &str {
        match id {
            ConverterId::MkvMerge => &self.mkvmerge,
            ConverterId::FFmpeg => &self.ffmpeg,
            ConverterId::Mp4Box => &self.mp4box,
            ConverterId::AviDemux => &self.avidemux,
            ConverterId::AsfBin => &self.asfbin,
        }
    }

    /// Mutable slot for an executable key, as named in the config file
    pub fn slot_mut(&mut self, key: &str) -> Option<&mut String> {
        match key {
            "mkvmerge" => Some(&mut self.mkvmerge),
            "ffmpeg" => Some(&mut self.ffmpeg),
            "ffprobe" => Some(&mut self.ffprobe),
            "mp4box" => Some(&mut self.mp4box),
            "avidemux" => Some(&mut self.avidemux),
            "asfbin" => Some(&mut self.asfbin),
            "file" => Some(&mut self.file),
            _ => None,
        }
    }

    pub const KEYS: [&'static str; 7] = [
        "mkvmerge", "ffmpeg", "ffprobe", "mp4box", "avidemux", "asfbin", "file",
    ];
}

/// Complete runtime configuration
///
/// Every key has a default, so an empty file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    pub log_level: String,
    pub log_format: String,
    /// Per-subprocess timeout; 0 disables it
    pub timeout_secs: u64,
    pub probe: bool,
    pub dry_run: bool,
    pub keep_side_files: bool,
    pub retry_partial: bool,
    pub universal_container_on_retry: bool,
    /// Explicit converter order replacing extension matching
    pub converters: Option<Vec<String>>,
    pub executables: ExecutablesConfig,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            timeout_secs: 3600,
            probe: true,
            dry_run: false,
            keep_side_files: false,
            retry_partial: false,
            universal_container_on_retry: true,
            converters: None,
            executables: ExecutablesConfig::default(),
        }
    }
}

impl SplitterConfig {
    /// Parse a TOML document
    pub fn from_toml(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Explicit converter order, validated
    pub fn converter_order(&self) -> Result<Option<Vec<ConverterId>>, ConfigError> {
        self.converters
            .as_ref()
            .map(|names| {
                names
                    .iter()
                    .map(|name| {
                        name.parse::<ConverterId>()
                            .map_err(|e| ConfigError::Invalid(e.to_string()))
                    })
                    .collect()
            })
            .transpose()
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.log_format.as_str(), "pretty" | "compact" | "json") {
            return Err(ConfigError::Invalid(format!(
                "log_format must be pretty, compact or json, got '{}'",
                self.log_format
            )));
        }
        self.converter_order()?;
        Ok(())
    }
}

/// Loads `SplitterConfig` from TOML files
#[derive(Debug, Clone, Default)]
pub struct TomlConfigAdapter {
    search_paths: Vec<PathBuf>,
}

impl TomlConfigAdapter {
    /// Adapter searching the default locations
    pub fn new() -> Self {
        Self {
            search_paths: Self::default_search_paths(),
        }
    }

    /// Adapter searching only the given paths
    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// `./splitx.toml`, then the per-user config directory
    fn default_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("splitx.toml")];
        let user_dir = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("APPDATA").map(PathBuf::from))
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")));
        if let Some(dir) = user_dir {
            paths.push(dir.join("splitx").join("config.toml"));
        }
        paths
    }

    /// Load an explicitly named file; it must exist
    pub fn load_file(&self, path: &Path) -> Result<SplitterConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = SplitterConfig::from_toml(&content, path)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load the explicit file if given, else the first search path present
    ///
    /// Falls back to defaults when nothing is found.
    pub fn load(&self, explicit: Option<&Path>) -> Result<SplitterConfig, ConfigError> {
        if let Some(path) = explicit {
            return self.load_file(path);
        }
        for candidate in &self.search_paths {
            if candidate.is_file() {
                return self.load_file(candidate);
            }
        }
        debug!("No config file found; using defaults");
        Ok(SplitterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = SplitterConfig::from_toml("", Path::new("empty.toml")).unwrap();
        assert_eq!(config, SplitterConfig::default());
        assert_eq!(config.timeout_secs, 3600);
        assert!(config.probe);
        assert!(config.universal_container_on_retry);
        assert!(!config.retry_partial);
    }

    #[test]
    fn test_partial_file_overrides_keys() {
        let content = r#"
            timeout_secs = 60
            retry_partial = true
            converters = ["ffmpeg", "asfbin"]

            [executables]
            ffmpeg = "/opt/ffmpeg/bin/ffmpeg"
        "#;
        let config = SplitterConfig::from_toml(content, Path::new("splitx.toml")).unwrap();
        assert_eq!(config.timeout_secs, 60);
        assert!(config.retry_partial);
        assert_eq!(config.executables.ffmpeg, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(
            config.executables.mkvmerge,
            ExecutablesConfig::default().mkvmerge
        );
        assert_eq!(
            config.converter_order().unwrap(),
            Some(vec![ConverterId::FFmpeg, ConverterId::AsfBin])
        );
    }

    #[test]
    fn test_validate_rejects_unknown_values() {
        let mut config = SplitterConfig::default();
        config.converters = Some(vec!["handbrake".to_string()]);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = SplitterConfig::default();
        config.log_format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let result = SplitterConfig::from_toml("timeout_secs = \"soon\"", Path::new("bad.toml"));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_load_uses_first_existing_search_path() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        let present = dir.path().join("splitx.toml");
        std::fs::write(&present, "probe = false\n").unwrap();

        let adapter = TomlConfigAdapter::with_search_paths(vec![missing.clone(), present]);
        assert!(!adapter.load(None).unwrap().probe);

        let nothing = TomlConfigAdapter::with_search_paths(vec![missing.clone()]);
        assert_eq!(nothing.load(None).unwrap(), SplitterConfig::default());
        assert!(matches!(
            nothing.load(Some(&missing)),
            Err(ConfigError::Read { .. })
        ));
    }
}
