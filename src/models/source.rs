use crate::config::schema::ModelConfig;
use crate::error::{ProvisioningError, Result, ScrawlError};
use crate::models::download::HubSource;
use crate::models::registry::ModelSpec;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Where model artifacts come from
#[async_trait]
pub trait ModelSource: Send + Sync {
    /// Path of the local copy, if one exists
    async fn local_path(&self, spec: &ModelSpec) -> Result<Option<PathBuf>>;

    /// Fetch the artifact and return its local path.
    ///
    /// `refresh` is set when a local copy already exists and should be
    /// brought up to date rather than downloaded for the first time.
    async fn fetch(&self, spec: &ModelSpec, refresh: bool) -> Result<PathBuf>;

    /// Get source name for logging and the manifest
    fn source_name(&self) -> &str;
}

/// Mirror directory source (shared mount, USB stick, pre-seeded image)
#[derive(Debug, Clone)]
pub struct DirectorySource {
    mirror_dir: PathBuf,
    models_dir: PathBuf,
}

impl DirectorySource {
    #[must_use]
    pub fn new(mirror_dir: PathBuf, models_dir: PathBuf) -> Self {
        Self {
            mirror_dir,
            models_dir,
        }
    }

    /// Installed location: `<models_dir>/<name>/<file>`
    #[must_use]
    pub fn install_path(&self, spec: &ModelSpec) -> PathBuf {
        self.models_dir.join(&spec.name).join(&spec.file)
    }

    /// Mirror layout is either flat or grouped by model name
    fn mirror_path(&self, spec: &ModelSpec) -> Option<PathBuf> {
        [
            self.mirror_dir.join(&spec.file),
            self.mirror_dir.join(&spec.name).join(&spec.file),
        ]
        .into_iter()
        .find(|p| p.is_file())
    }
}

#[async_trait]
impl ModelSource for DirectorySource {
    async fn local_path(&self, spec: &ModelSpec) -> Result<Option<PathBuf>> {
        let path = self.install_path(spec);
        Ok(tokio::fs::try_exists(&path).await?.then_some(path))
    }

    async fn fetch(&self, spec: &ModelSpec, refresh: bool) -> Result<PathBuf> {
        if !self.mirror_dir.is_dir() {
            return Err(ProvisioningError::Network(format!(
                "Mirror directory {} is not reachable",
                self.mirror_dir.display()
            ))
            .into());
        }

        let src = self.mirror_path(spec).ok_or_else(|| {
            ProvisioningError::Service(format!(
                "{} not found in mirror {}",
                spec.file,
                self.mirror_dir.display()
            ))
        })?;

        let dest = self.install_path(spec);
        tracing::info!(
            "{} {} from {}",
            if refresh { "Refreshing" } else { "Copying" },
            spec.file,
            src.display()
        );

        copy_atomic(&src, &dest).await?;
        Ok(dest)
    }

    fn source_name(&self) -> &'static str {
        "directory"
    }
}

/// Copy through a temporary file so readers never see a partial artifact
async fn copy_atomic(src: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp_path = dest.with_extension("tmp");
    tokio::fs::copy(src, &tmp_path).await.map_err(|e| {
        ProvisioningError::Artifact(format!("Failed to copy {}: {e}", src.display()))
    })?;
    tokio::fs::rename(&tmp_path, dest).await?;

    Ok(())
}

/// Source enum wrapper for dynamic dispatch
#[derive(Debug)]
pub enum Source {
    Hub(HubSource),
    Directory(DirectorySource),
}

impl Source {
    /// Create source from config
    pub fn from_config(config: &ModelConfig, models_dir: &Path) -> Result<Self> {
        match config.source.as_str() {
            "hub" => Ok(Self::Hub(HubSource::new(models_dir, config.show_progress)?)),
            "directory" => {
                let mirror_dir = config.mirror_dir.clone().ok_or_else(|| {
                    ScrawlError::Config(
                        "model.mirror_dir must be set when model.source = \"directory\""
                            .to_string(),
                    )
                })?;
                Ok(Self::Directory(DirectorySource::new(
                    mirror_dir,
                    models_dir.to_path_buf(),
                )))
            }
            _ => Err(ScrawlError::Config(format!(
                "Unknown model source: {}. Must be 'hub' or 'directory'",
                config.source
            ))),
        }
    }
}

#[async_trait]
impl ModelSource for Source {
    async fn local_path(&self, spec: &ModelSpec) -> Result<Option<PathBuf>> {
        match self {
            Self::Hub(s) => s.local_path(spec).await,
            Self::Directory(s) => s.local_path(spec).await,
        }
    }

    async fn fetch(&self, spec: &ModelSpec, refresh: bool) -> Result<PathBuf> {
        match self {
            Self::Hub(s) => s.fetch(spec, refresh).await,
            Self::Directory(s) => s.fetch(spec, refresh).await,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            Self::Hub(s) => s.source_name(),
            Self::Directory(s) => s.source_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn spec() -> ModelSpec {
        ModelSpec::resolve(&ModelConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_directory_fetch_installs_copy() {
        let mirror = TempDir::new().unwrap();
        let models = TempDir::new().unwrap();
        fs::write(mirror.path().join("mnist-12.onnx"), b"onnx bytes").unwrap();

        let source = DirectorySource::new(mirror.path().to_path_buf(), models.path().to_path_buf());
        assert!(source.local_path(&spec()).await.unwrap().is_none());

        let path = source.fetch(&spec(), false).await.unwrap();
        assert_eq!(path, models.path().join("mnist/mnist-12.onnx"));
        assert_eq!(fs::read(&path).unwrap(), b"onnx bytes");
        assert_eq!(source.local_path(&spec()).await.unwrap(), Some(path));
    }

    #[tokio::test]
    async fn test_directory_fetch_grouped_mirror() {
        let mirror = TempDir::new().unwrap();
        let models = TempDir::new().unwrap();
        fs::create_dir_all(mirror.path().join("mnist")).unwrap();
        fs::write(mirror.path().join("mnist/mnist-12.onnx"), b"grouped").unwrap();

        let source = DirectorySource::new(mirror.path().to_path_buf(), models.path().to_path_buf());
        let path = source.fetch(&spec(), false).await.unwrap();
        assert_eq!(fs::read(path).unwrap(), b"grouped");
    }

    #[tokio::test]
    async fn test_directory_missing_file_is_service_error() {
        let mirror = TempDir::new().unwrap();
        let models = TempDir::new().unwrap();

        let source = DirectorySource::new(mirror.path().to_path_buf(), models.path().to_path_buf());
        let err = source.fetch(&spec(), false).await.unwrap_err();
        assert!(matches!(
            err,
            ScrawlError::Provisioning(ProvisioningError::Service(_))
        ));
    }

    #[tokio::test]
    async fn test_directory_unreachable_mirror_is_network_error() {
        let models = TempDir::new().unwrap();
        let source = DirectorySource::new(
            models.path().join("not-mounted"),
            models.path().to_path_buf(),
        );

        let err = source.fetch(&spec(), true).await.unwrap_err();
        assert!(matches!(
            err,
            ScrawlError::Provisioning(ProvisioningError::Network(_))
        ));
    }

    #[test]
    fn test_from_config_directory_requires_mirror() {
        let models = TempDir::new().unwrap();
        let config = ModelConfig {
            source: "directory".to_string(),
            ..ModelConfig::default()
        };

        let err = Source::from_config(&config, models.path()).unwrap_err();
        assert!(err.to_string().contains("mirror_dir"));
    }

    #[test]
    fn test_from_config_unknown_source() {
        let models = TempDir::new().unwrap();
        let config = ModelConfig {
            source: "ftp".to_string(),
            ..ModelConfig::default()
        };

        let err = Source::from_config(&config, models.path()).unwrap_err();
        assert!(err.to_string().contains("Unknown model source"));
    }

    #[test]
    fn test_from_config_names() {
        let models = TempDir::new().unwrap();
        let hub = Source::from_config(&ModelConfig::default(), models.path()).unwrap();
        assert_eq!(hub.source_name(), "hub");

        let config = ModelConfig {
            source: "directory".to_string(),
            mirror_dir: Some(models.path().join("mirror")),
            ..ModelConfig::default()
        };
        let dir = Source::from_config(&config, models.path()).unwrap();
        assert_eq!(dir.source_name(), "directory");
    }
}
