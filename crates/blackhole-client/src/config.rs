use blackhole_reduce::{PaddingPolicy, PipelineConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ClientError, Result};

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "BLACKHOLE_CONFIG";

/// Client settings; every field falls back to its default when absent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Block store endpoint root; `/check` and `/upload` are appended
    pub base_url: String,
    /// Maximum blocks per upload request
    pub batch_size: usize,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Images processed concurrently
    pub workers: usize,
    /// File extensions picked up from the input directory (case-insensitive)
    pub extensions: Vec<String>,
    /// How partial border blocks are filled (`edge` or `black`)
    pub padding: PaddingPolicy,
    /// Directory used when none is given on the command line
    pub default_directory: PathBuf,
    /// Write `<image>.blho` next to each image
    pub write_container: bool,
    /// Synchronize unique blocks with the store
    pub upload: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("http://localhost:8081/api/v1/blocks"),
            batch_size: 1000,
            timeout_secs: 30,
            workers: 4,
            extensions: vec![String::from("jpg"), String::from("jpeg")],
            padding: PaddingPolicy::Edge,
            default_directory: PathBuf::from("img"),
            write_container: true,
            upload: true,
        }
    }
}

impl ClientConfig {
    /// Parse a `.toml` or `.json` file and validate it.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("{}: {}", path.display(), e)))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        let config: ClientConfig = match ext.to_lowercase().as_str() {
            "toml" => toml::from_str(&contents).map_err(|e| ClientError::Config(e.to_string()))?,
            "json" => serde_json::from_str(&contents).map_err(|e| ClientError::Config(e.to_string()))?,
            _ => {
                return Err(ClientError::Config(format!(
                    "Unsupported config file extension: {}",
                    ext
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Reject settings the client cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(ClientError::Config("base_url must not be empty".into()));
        }
        if self.batch_size == 0 {
            return Err(ClientError::Config("batch_size must be at least 1".into()));
        }
        if self.workers == 0 {
            return Err(ClientError::Config("workers must be at least 1".into()));
        }
        if self.extensions.is_empty() {
            return Err(ClientError::Config("extensions must not be empty".into()));
        }
        Ok(())
    }

    /// Per-request timeout for the block store
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Reduction settings derived from this config
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            padding: self.padding,
        }
    }

    /// True if `path` has one of the configured extensions
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_values() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8081/api/v1/blocks");
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.workers, 4);
        assert_eq!(config.extensions, vec!["jpg", "jpeg"]);
        assert_eq!(config.padding, PaddingPolicy::Edge);
        assert_eq!(config.default_directory, PathBuf::from("img"));
        assert!(config.write_container);
        assert!(config.upload);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_toml_partial() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            r#"
base_url = "http://store:9000/blocks"
batch_size = 250
padding = "black"
"#
        )
        .unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.base_url, "http://store:9000/blocks");
        assert_eq!(config.batch_size, 250);
        assert_eq!(config.padding, PaddingPolicy::Black);
        assert_eq!(config.workers, 4);
        assert_eq!(config.pipeline().padding, PaddingPolicy::Black);
    }

    #[test]
    fn test_from_file_json() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        writeln!(
            file,
            r#"{{ "workers": 2, "extensions": ["png"], "upload": false }}"#
        )
        .unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.extensions, vec!["png"]);
        assert!(!config.upload);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_from_file_rejects_invalid_values() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "batch_size = 0").unwrap();
        assert!(matches!(
            ClientConfig::from_file(file.path()),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_from_file_unsupported_extension() {
        let file = NamedTempFile::with_suffix(".yaml").unwrap();
        assert!(matches!(
            ClientConfig::from_file(file.path()),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_validate() {
        let mut config = ClientConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        config.workers = 1;
        config.extensions.clear();
        assert!(config.validate().is_err());
        config.extensions.push("jpg".into());
        config.base_url = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_accepts_extensions_case_insensitively() {
        let config = ClientConfig::default();
        assert!(config.accepts(Path::new("a/photo.JPG")));
        assert!(config.accepts(Path::new("photo.jpeg")));
        assert!(!config.accepts(Path::new("photo.png")));
        assert!(!config.accepts(Path::new("photo.jpg.blho")));
        assert!(!config.accepts(Path::new("README")));
    }

    #[test]
    fn test_load_without_path_uses_defaults() {
        assert_eq!(ClientConfig::load(None).unwrap(), ClientConfig::default());
    }
}
