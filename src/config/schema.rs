use crate::error::{Result, ScrawlError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ModelConfig {
    #[serde(default = "default_model")]
    pub name: String,
    /// `hub` or `directory`
    #[serde(default = "default_source")]
    pub source: String,
    pub repo: Option<String>,
    pub revision: Option<String>,
    pub file: Option<String>,
    /// Mirror directory used by the `directory` source
    pub mirror_dir: Option<PathBuf>,
    /// Overrides `$XDG_DATA_HOME/scrawl/models`
    pub models_dir: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct NetworkConfig {
    /// Treat the current connection as metered (not low-cost)
    #[serde(default)]
    pub metered: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ClassifierConfig {
    #[serde(default = "default_input_size")]
    pub input_size: u32,
    /// `[1, H, W, 1]` instead of `[1, 1, H, W]`
    #[serde(default)]
    pub channels_last: bool,
    /// Invert luminance before inference (dark ink on light paper)
    #[serde(default)]
    pub invert: bool,
    /// `unit` for [0, 1] or `byte` for [0, 255]
    #[serde(default = "default_pixel_scale")]
    pub pixel_scale: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub show_confidence: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct CanvasConfig {
    #[serde(default = "default_canvas_size")]
    pub width: u32,
    #[serde(default = "default_canvas_size")]
    pub height: u32,
    #[serde(default = "default_brush_radius")]
    pub brush_radius: f32,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct NotificationConfig {
    #[serde(default = "default_true")]
    pub enable_status: bool,
    #[serde(default = "default_true")]
    pub enable_errors: bool,
}

// Default value functions
fn default_model() -> String {
    "mnist".to_string()
}
fn default_source() -> String {
    "hub".to_string()
}
fn default_true() -> bool {
    true
}
fn default_input_size() -> u32 {
    28
}
fn default_pixel_scale() -> String {
    "unit".to_string()
}
fn default_canvas_size() -> u32 {
    280
}
fn default_brush_radius() -> f32 {
    10.0
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            source: default_source(),
            repo: None,
            revision: None,
            file: None,
            mirror_dir: None,
            models_dir: None,
            show_progress: default_true(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            input_size: default_input_size(),
            channels_last: false,
            invert: false,
            pixel_scale: default_pixel_scale(),
            labels: Vec::new(),
            show_confidence: false,
        }
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: default_canvas_size(),
            height: default_canvas_size(),
            brush_radius: default_brush_radius(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enable_status: default_true(),
            enable_errors: default_true(),
        }
    }
}

impl Config {
    /// Load config from the user config file, or defaults if it doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load and validate config from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            ScrawlError::Config(format!("Failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save config atomically (tmp + rename)
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| ScrawlError::Config(format!("Failed to serialize config: {e}")))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, toml_str)?;
        fs::rename(&tmp_path, path)?;

        Ok(())
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(xdg_config)
        } else {
            dirs::config_dir()
                .ok_or_else(|| ScrawlError::Config("Cannot determine config directory".to_string()))?
        };

        Ok(config_dir.join("scrawl").join("config.toml"))
    }

    fn validate(&self) -> Result<()> {
        if !matches!(self.model.source.as_str(), "hub" | "directory") {
            return Err(ScrawlError::Config(format!(
                "Unknown model source: {}. Must be 'hub' or 'directory'",
                self.model.source
            )));
        }
        if !matches!(self.classifier.pixel_scale.as_str(), "unit" | "byte") {
            return Err(ScrawlError::Config(format!(
                "Unknown pixel_scale: {}. Must be 'unit' or 'byte'",
                self.classifier.pixel_scale
            )));
        }
        if self.classifier.input_size == 0 {
            return Err(ScrawlError::Config(
                "classifier.input_size must be greater than 0".to_string(),
            ));
        }
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(ScrawlError::Config(
                "canvas width and height must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
