use crate::classifier::ModelHandle;
use crate::config::schema::{Config, NetworkConfig};
use crate::error::{ProvisioningError, Result};
use crate::models::manifest::{manifest_path, models_data_dir, InstalledModel, Manifest};
use crate::models::registry::ModelSpec;
use crate::models::source::{ModelSource, Source};
use std::path::{Path, PathBuf};

/// Current network characteristics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkState {
    pub metered: bool,
}

impl NetworkState {
    /// Read from config, overridable with `SCRAWL_METERED`
    #[must_use]
    pub fn detect(config: &NetworkConfig) -> Self {
        let metered = std::env::var("SCRAWL_METERED")
            .ok()
            .and_then(|v| parse_flag(&v))
            .unwrap_or(config.metered);
        Self { metered }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Network requirements attached to a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadConditions {
    pub require_low_cost: bool,
}

impl DownloadConditions {
    /// Only fetch over unmetered connections
    #[must_use]
    pub const fn low_cost() -> Self {
        Self {
            require_low_cost: true,
        }
    }

    /// Fetch over any connection
    #[must_use]
    pub const fn any() -> Self {
        Self {
            require_low_cost: false,
        }
    }

    #[must_use]
    pub const fn permits(&self, network: NetworkState) -> bool {
        !self.require_low_cost || !network.metered
    }
}

/// Configured models directory, or the XDG default
pub fn resolve_models_dir(config: &Config) -> Result<PathBuf> {
    match &config.model.models_dir {
        Some(dir) => Ok(dir.clone()),
        None => models_data_dir(),
    }
}

/// Resolves the configured model to a local, mapped artifact
pub struct ModelProvisioner<S: ModelSource = Source> {
    spec: ModelSpec,
    source: S,
    network: NetworkState,
    models_dir: PathBuf,
}

impl ModelProvisioner<Source> {
    /// Create provisioner from config
    pub fn from_config(config: &Config) -> Result<Self> {
        let models_dir = resolve_models_dir(config)?;
        std::fs::create_dir_all(&models_dir)?;

        let spec = ModelSpec::resolve(&config.model)?;
        let source = Source::from_config(&config.model, &models_dir)?;
        let network = NetworkState::detect(&config.network);

        Ok(Self::new(spec, source, network, models_dir))
    }
}

impl<S: ModelSource> ModelProvisioner<S> {
    pub const fn new(spec: ModelSpec, source: S, network: NetworkState, models_dir: PathBuf) -> Self {
        Self {
            spec,
            source,
            network,
            models_dir,
        }
    }

    #[must_use]
    pub const fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Whether a local copy already exists
    pub async fn is_present(&self) -> Result<bool> {
        Ok(self.source.local_path(&self.spec).await?.is_some())
    }

    /// Locate or fetch the model and map it.
    ///
    /// An existing copy is refreshed only over a low-cost network; a missing
    /// one is fetched over any network. There are no retries.
    pub async fn provision(&self) -> Result<ModelHandle> {
        let local = self.source.local_path(&self.spec).await?;
        let (conditions, refresh) = if local.is_some() {
            (DownloadConditions::low_cost(), true)
        } else {
            (DownloadConditions::any(), false)
        };

        tracing::info!(
            "Provisioning model {} via {} (local copy: {}, conditions: {:?})",
            self.spec.name,
            self.source.source_name(),
            local.is_some(),
            conditions
        );

        let path = if conditions.permits(self.network) {
            self.source.fetch(&self.spec, refresh).await?
        } else if let Some(existing) = local {
            tracing::info!("Metered network, deferring refresh of {}", self.spec.name);
            existing
        } else {
            return Err(ProvisioningError::Network(format!(
                "Download conditions {conditions:?} not met"
            ))
            .into());
        };

        // Unusable artifacts never reach the manifest
        let handle = ModelHandle::open(self.spec.name.clone(), path)?;

        if let Err(e) = self.record(handle.path()) {
            tracing::warn!("Failed to update model manifest: {e}");
        }

        Ok(handle)
    }

    fn record(&self, path: &Path) -> Result<()> {
        let mut manifest = Manifest::load_or_regenerate(&self.models_dir)?;
        manifest.add_model(InstalledModel {
            name: self.spec.name.clone(),
            path: path.to_path_buf(),
            size_bytes: std::fs::metadata(path).map_or(0, |m| m.len()),
            source: self.source.source_name().to_string(),
            downloaded_at: chrono::Utc::now().to_rfc3339(),
        });
        manifest.save(&manifest_path(&self.models_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_conditions_permit() {
        let wifi = NetworkState { metered: false };
        let cellular = NetworkState { metered: true };

        assert!(DownloadConditions::any().permits(wifi));
        assert!(DownloadConditions::any().permits(cellular));
        assert!(DownloadConditions::low_cost().permits(wifi));
        assert!(!DownloadConditions::low_cost().permits(cellular));
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag(" Yes "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    #[serial]
    fn test_detect_env_override() {
        let original = std::env::var("SCRAWL_METERED").ok();

        std::env::set_var("SCRAWL_METERED", "true");
        assert!(NetworkState::detect(&NetworkConfig { metered: false }).metered);

        std::env::set_var("SCRAWL_METERED", "garbage");
        assert!(!NetworkState::detect(&NetworkConfig { metered: false }).metered);

        std::env::remove_var("SCRAWL_METERED");
        assert!(NetworkState::detect(&NetworkConfig { metered: true }).metered);

        if let Some(val) = original {
            std::env::set_var("SCRAWL_METERED", val);
        }
    }
}
