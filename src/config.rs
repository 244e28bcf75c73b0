use crate::metadata::{DefaultMetadata, HoursFormat};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 9200;
pub const DEFAULT_INDEX: &str = "photos";
pub const DEFAULT_MAX_RESULT_WINDOW: usize = 10_000;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub indexor: IndexorConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IndexorConfig {
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub photo: PhotoConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClusterConfig {
    #[serde(default)]
    pub embedded: EmbeddedConfig,
    pub address: String,
    pub port: u16,
    pub index: String,
    #[serde(default = "default_max_result_window")]
    pub max_result_window: usize,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EmbeddedConfig {
    pub enabled: bool,
    /// Only meaningful for an embedded node; kept so existing config files load.
    pub expose: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PhotoConfig {
    #[serde(default)]
    pub hours_format: HoursFormat,
    pub thumbnail_dump_path: Option<PathBuf>,
    /// Replaces `magick` for HEIF previews
    pub heif_thumbnail_tool: Option<String>,
    pub default_metadata: Option<DefaultMetadata>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_result_window() -> usize {
    DEFAULT_MAX_RESULT_WINDOW
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            embedded: EmbeddedConfig::default(),
            address: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            index: DEFAULT_INDEX.to_string(),
            max_result_window: DEFAULT_MAX_RESULT_WINDOW,
        }
    }
}

impl ClusterConfig {
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.address, self.port)
    }
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(environment())
            .build()?;

        s.try_deserialize()
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from(path))
            .add_source(environment())
            .build()?;

        s.try_deserialize()
    }
}

// TW_INDEXOR__CLUSTER__PORT=9210 overrides indexor.cluster.port
fn environment() -> Environment {
    Environment::with_prefix("TW")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
