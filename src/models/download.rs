use crate::error::{ProvisioningError, Result, ScrawlError};
use crate::models::registry::ModelSpec;
use crate::models::source::ModelSource;
use async_trait::async_trait;
use hf_hub::api::sync::{ApiBuilder, ApiError};
use hf_hub::{Cache, Repo, RepoType};
use std::fs;
use std::path::{Path, PathBuf};

/// Hugging Face Hub model source
#[derive(Debug, Clone)]
pub struct HubSource {
    cache_dir: PathBuf,
    show_progress: bool,
}

impl HubSource {
    /// Create a hub source caching under `<models_dir>/hub`
    pub fn new(models_dir: &Path, show_progress: bool) -> Result<Self> {
        let cache_dir = models_dir.join("hub");
        fs::create_dir_all(&cache_dir)?;

        Ok(Self {
            cache_dir,
            show_progress,
        })
    }

    fn repo(spec: &ModelSpec) -> Repo {
        Repo::with_revision(
            spec.hf_repo.clone(),
            RepoType::Model,
            spec.hf_revision.clone(),
        )
    }

    /// Blocking download; `refresh` forces a re-fetch of a cached file
    fn download_blocking(&self, spec: &ModelSpec, refresh: bool) -> Result<PathBuf> {
        if !refresh {
            check_disk_space(&self.cache_dir, spec.size_kb)?;
        }

        tracing::info!(
            "{} {} from {}@{}",
            if refresh { "Refreshing" } else { "Downloading" },
            spec.file,
            spec.hf_repo,
            spec.hf_revision
        );

        let api = ApiBuilder::new()
            .with_cache_dir(self.cache_dir.clone())
            .with_progress(self.show_progress)
            .build()
            .map_err(|e| {
                ProvisioningError::Service(format!("Failed to initialize Hugging Face API: {e}"))
            })?;

        let repo = api.repo(Self::repo(spec));
        let fetched = if refresh {
            repo.download(&spec.file)
        } else {
            repo.get(&spec.file)
        };

        let path = fetched.map_err(|e| hub_error(&spec.file, &e))?;

        let size = fs::metadata(&path).map_or(0, |m| m.len());
        tracing::info!("Model {} ready ({})", spec.name, format_bytes(size));

        Ok(path)
    }
}

#[async_trait]
impl ModelSource for HubSource {
    async fn local_path(&self, spec: &ModelSpec) -> Result<Option<PathBuf>> {
        let cache = Cache::new(self.cache_dir.clone());
        Ok(cache.repo(Self::repo(spec)).get(&spec.file))
    }

    async fn fetch(&self, spec: &ModelSpec, refresh: bool) -> Result<PathBuf> {
        let source = self.clone();
        let spec = spec.clone();

        // hf-hub's sync client blocks on network IO
        tokio::task::spawn_blocking(move || source.download_blocking(&spec, refresh))
            .await
            .map_err(|e| ScrawlError::Other(format!("Download task panicked: {e}")))?
    }

    fn source_name(&self) -> &'static str {
        "hub"
    }
}

/// Split hub failures into service-side (HTTP status) and network-side problems
fn hub_error(file: &str, error: &ApiError) -> ScrawlError {
    let message = format!("Failed to download {file}: {error}");
    match error {
        ApiError::RequestError(inner) => match inner.as_ref() {
            ureq::Error::Status(code, _) => {
                tracing::debug!("Hub answered {code} for {file}");
                ProvisioningError::Service(message).into()
            }
            ureq::Error::Transport(_) => ProvisioningError::Network(message).into(),
        },
        ApiError::TooManyRetries(last) => hub_error(file, last),
        ApiError::MissingHeader(_)
        | ApiError::InvalidHeader(_)
        | ApiError::ParseIntError(_)
        | ApiError::InvalidResume => ProvisioningError::Service(message).into(),
        ApiError::IoError(_) | ApiError::LockAcquisition(_) => {
            ProvisioningError::Artifact(message).into()
        }
        _ => ProvisioningError::Network(message).into(),
    }
}

/// Check if enough disk space is available
fn check_disk_space(dir: &Path, required_kb: u64) -> Result<()> {
    let stats = nix::sys::statvfs::statvfs(dir)
        .map_err(|e| ScrawlError::Other(format!("Failed to check disk space: {e}")))?;

    #[allow(clippy::unnecessary_cast)] // field widths differ between platforms
    let available_bytes = stats.blocks_available() as u64 * stats.fragment_size() as u64;

    // 10MB headroom on top of the artifact itself
    let required_bytes = required_kb * 1_024 + 10 * 1_024 * 1_024;

    if available_bytes < required_bytes {
        return Err(ProvisioningError::DiskSpace(format!(
            "{} required, {} available in {}",
            format_bytes(required_bytes),
            format_bytes(available_bytes),
            dir.display()
        ))
        .into());
    }

    Ok(())
}

/// Format bytes as human-readable string
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
