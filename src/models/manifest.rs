use crate::error::{Result, ScrawlError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Information about an installed model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstalledModel {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub source: String,
    pub downloaded_at: String,
}

/// Manifest tracking installed models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub models: Vec<InstalledModel>,
    pub last_updated: String,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            last_updated: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl Manifest {
    /// Load manifest from file, empty if it doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;

        serde_json::from_str(&content)
            .map_err(|e| ScrawlError::Config(format!("Failed to parse manifest: {e}")))
    }

    /// Load the manifest next to the models, rebuilding it from disk if missing or corrupt
    pub fn load_or_regenerate(models_dir: &Path) -> Result<Self> {
        let path = manifest_path(models_dir);
        if !path.exists() {
            return Self::regenerate_from_disk(models_dir);
        }

        match Self::load(&path) {
            Ok(manifest) => Ok(manifest),
            Err(e) => {
                tracing::warn!("Manifest unreadable, rebuilding from disk: {e}");
                Self::regenerate_from_disk(models_dir)
            }
        }
    }

    /// Save manifest to file atomically (tmp + rename)
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("tmp");
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ScrawlError::Config(format!("Failed to serialize manifest: {e}")))?;

        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, path)?;

        Ok(())
    }

    /// Add or update a model in the manifest
    pub fn add_model(&mut self, model: InstalledModel) {
        self.models.retain(|m| m.name != model.name);
        self.models.push(model);
        self.last_updated = chrono::Utc::now().to_rfc3339();
    }

    /// Remove a model from the manifest
    pub fn remove_model(&mut self, name: &str) -> Result<InstalledModel> {
        let index = self
            .models
            .iter()
            .position(|m| m.name == name)
            .ok_or_else(|| ScrawlError::NotFound(format!("Model '{name}' not in manifest")))?;

        self.last_updated = chrono::Utc::now().to_rfc3339();
        Ok(self.models.remove(index))
    }

    /// Find installed model by name
    #[must_use]
    pub fn find_model(&self, name: &str) -> Option<&InstalledModel> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Regenerate manifest from disk (in case of corruption)
    ///
    /// Expects the `<models_dir>/<name>/<file>.onnx` layout written by the
    /// directory source. Hub downloads live in the hub cache and are picked up
    /// again on the next provisioning run.
    pub fn regenerate_from_disk(models_dir: &Path) -> Result<Self> {
        let mut manifest = Self::default();

        if !models_dir.exists() {
            return Ok(manifest);
        }

        for entry in fs::read_dir(models_dir)?.flatten() {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            let Some(name) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };

            for file in fs::read_dir(&dir)?.flatten() {
                let path = file.path();
                if path.extension().is_some_and(|ext| ext == "onnx") {
                    let size_bytes = fs::metadata(&path).map_or(0, |m| m.len());
                    if size_bytes == 0 {
                        tracing::debug!("Skipping empty artifact {}", path.display());
                        continue;
                    }
                    manifest.add_model(InstalledModel {
                        name: name.clone(),
                        path,
                        size_bytes,
                        source: "directory".to_string(),
                        downloaded_at: chrono::Utc::now().to_rfc3339(),
                    });
                }
            }
        }

        Ok(manifest)
    }
}

/// Get manifest path inside a models directory
#[must_use]
pub fn manifest_path(models_dir: &Path) -> PathBuf {
    models_dir.join("manifest.json")
}

/// Get default models data directory
pub fn models_data_dir() -> Result<PathBuf> {
    let data_dir = if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg_data)
    } else {
        dirs::data_dir()
            .ok_or_else(|| ScrawlError::Config("Cannot determine data directory".to_string()))?
    };

    Ok(data_dir.join("scrawl/models"))
}
