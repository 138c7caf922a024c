use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::config::{ClientConfig, CONFIG_ENV};
use crate::error::Result;

#[derive(Debug, Parser)]
#[command(name = "blho")]
#[command(about = "Reduce images to deduplicated 8x8 blocks and sync them with a block store", long_about = None)]
pub struct Cli {
    /// Directory of images to process (defaults to `default_directory` from the config)
    pub directory: Option<PathBuf>,

    /// Config file (.toml or .json)
    #[arg(short, long, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn load_config(&self) -> Result<ClientConfig> {
        ClientConfig::load(self.config.as_deref())
    }

    /// Directory from the command line, else from `config`
    pub fn directory<'a>(&'a self, config: &'a ClientConfig) -> &'a Path {
        self.directory
            .as_deref()
            .unwrap_or(config.default_directory.as_path())
    }
}

/// `RUST_LOG` if set and valid, otherwise `info` so per-file progress is visible
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn directory_falls_back_to_config() {
        let cli = Cli::try_parse_from(["blho"]).unwrap();
        let config = ClientConfig::default();
        assert_eq!(cli.directory(&config), Path::new("img"));
    }

    #[test]
    fn explicit_directory_and_config() {
        let cli = Cli::try_parse_from(["blho", "photos", "--config", "blho.toml"]).unwrap();
        let config = ClientConfig::default();
        assert_eq!(cli.directory(&config), Path::new("photos"));
        assert_eq!(cli.config.as_deref(), Some(Path::new("blho.toml")));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = Cli::try_parse_from(["blho", "-c", "/nonexistent/blho.toml"]).unwrap();
        assert!(cli.load_config().is_err());
    }

    #[test]
    fn log_filter_defaults_to_info() {
        std::env::remove_var("RUST_LOG");
        let hint = env_filter().max_level_hint();
        assert!(hint >= Some(LevelFilter::INFO), "got {:?}", hint);
    }
}
