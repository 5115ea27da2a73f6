use crate::error::{Result, ScrawlError};
use crate::models::download::format_bytes;
use crate::models::manifest::{manifest_path, InstalledModel, Manifest};
use std::fs;
use std::path::PathBuf;

/// Model manager for listing and removing installed models
pub struct ModelManager {
    manifest: Manifest,
    manifest_path: PathBuf,
}

impl ModelManager {
    /// Open the manifest in a models directory
    pub fn new(models_dir: &std::path::Path) -> Result<Self> {
        Ok(Self {
            manifest: Manifest::load_or_regenerate(models_dir)?,
            manifest_path: manifest_path(models_dir),
        })
    }

    /// List all installed models
    #[must_use]
    pub fn list_installed(&self) -> Vec<&InstalledModel> {
        self.manifest.models.iter().collect()
    }

    /// Check if a model is installed
    #[must_use]
    pub fn is_installed(&self, model_name: &str) -> bool {
        self.manifest.find_model(model_name).is_some()
    }

    /// Get info about an installed model
    #[must_use]
    pub fn get_installed_info(&self, model_name: &str) -> Option<&InstalledModel> {
        self.manifest.find_model(model_name)
    }

    /// Remove an installed model and its artifact
    pub fn remove(&mut self, model_name: &str) -> Result<InstalledModel> {
        if !self.is_installed(model_name) {
            return Err(ScrawlError::NotFound(format!(
                "Model '{model_name}' is not installed"
            )));
        }

        let removed = self.manifest.remove_model(model_name)?;

        match fs::remove_file(&removed.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Artifact {} already gone", removed.path.display());
            }
            Err(e) => return Err(e.into()),
        }

        self.manifest.save(&self.manifest_path)?;

        tracing::info!(
            "Removed model '{model_name}' (freed {})",
            format_bytes(removed.size_bytes)
        );
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn install(dir: &std::path::Path, name: &str) -> PathBuf {
        let path = dir.join(name).join(format!("{name}.onnx"));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"model").unwrap();

        let mut manifest = Manifest::load(&manifest_path(dir)).unwrap();
        manifest.add_model(InstalledModel {
            name: name.to_string(),
            path: path.clone(),
            size_bytes: 5,
            source: "directory".to_string(),
            downloaded_at: chrono::Utc::now().to_rfc3339(),
        });
        manifest.save(&manifest_path(dir)).unwrap();
        path
    }

    #[test]
    fn test_empty_models_dir() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ModelManager::new(temp_dir.path()).unwrap();
        assert!(manager.list_installed().is_empty());
        assert!(!manager.is_installed("mnist"));
    }

    #[test]
    fn test_list_and_info() {
        let temp_dir = TempDir::new().unwrap();
        install(temp_dir.path(), "mnist");

        let manager = ModelManager::new(temp_dir.path()).unwrap();
        assert_eq!(manager.list_installed().len(), 1);
        assert_eq!(manager.get_installed_info("mnist").unwrap().size_bytes, 5);
    }

    #[test]
    fn test_remove_deletes_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let path = install(temp_dir.path(), "mnist");

        let mut manager = ModelManager::new(temp_dir.path()).unwrap();
        manager.remove("mnist").unwrap();
        assert!(!path.exists());

        let reopened = ModelManager::new(temp_dir.path()).unwrap();
        assert!(!reopened.is_installed("mnist"));
    }

    #[test]
    fn test_remove_missing_artifact_still_updates_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let path = install(temp_dir.path(), "mnist");
        fs::remove_file(path).unwrap();

        let mut manager = ModelManager::new(temp_dir.path()).unwrap();
        assert!(manager.remove("mnist").is_ok());
        assert!(!manager.is_installed("mnist"));
    }

    #[test]
    fn test_remove_not_installed() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = ModelManager::new(temp_dir.path()).unwrap();

        let err = manager.remove("mnist").unwrap_err();
        assert!(err.to_string().contains("not installed"));
    }
}
