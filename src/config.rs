use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    pub boundary: BoundaryConfig,
    pub render: RenderConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub checkins: PathBuf,
    pub edges: PathBuf,
}

/// Where the backdrop geometry comes from. `file` wins when both are set,
/// so tests and offline runs can point at a local fixture.
#[derive(Debug, Deserialize, Clone)]
pub struct BoundaryConfig {
    pub url: Option<String>,
    pub file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    pub output: PathBuf,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Map extent as [min_lon, min_lat, max_lon, max_lat]. Computed from the
    /// boundary and check-in data when absent.
    pub extent: Option<[f64; 4]>,
    /// TTF/OTF font for the title and axis labels. Text layers are skipped
    /// when unset.
    pub font: Option<PathBuf>,
    #[serde(default = "default_title")]
    pub title: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

fn default_width() -> u32 {
    1200
}

fn default_height() -> u32 {
    800
}

fn default_title() -> String {
    "US User Network on Map with Edges".to_string()
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}
