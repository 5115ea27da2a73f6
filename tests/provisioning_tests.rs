use async_trait::async_trait;
use scrawl::error::{ProvisioningError, Result, ScrawlError};
use scrawl::models::manifest::{manifest_path, Manifest};
use scrawl::models::{
    DirectorySource, ModelManager, ModelProvisioner, ModelSource, ModelSpec, NetworkState,
};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

fn spec() -> ModelSpec {
    ModelSpec {
        name: "mnist".to_string(),
        hf_repo: "onnxmodelzoo/mnist-12".to_string(),
        hf_revision: "main".to_string(),
        file: "mnist-12.onnx".to_string(),
        size_kb: 26,
    }
}

const UNMETERED: NetworkState = NetworkState { metered: false };
const METERED: NetworkState = NetworkState { metered: true };

/// Records fetches and delegates to a mirror directory
struct RecordingSource {
    inner: DirectorySource,
    fetches: Mutex<Vec<bool>>,
}

impl RecordingSource {
    fn new(mirror: &Path, models: &Path) -> Self {
        Self {
            inner: DirectorySource::new(mirror.to_path_buf(), models.to_path_buf()),
            fetches: Mutex::new(Vec::new()),
        }
    }

    fn fetches(&self) -> Vec<bool> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelSource for RecordingSource {
    async fn local_path(&self, spec: &ModelSpec) -> Result<Option<PathBuf>> {
        self.inner.local_path(spec).await
    }

    async fn fetch(&self, spec: &ModelSpec, refresh: bool) -> Result<PathBuf> {
        self.fetches.lock().unwrap().push(refresh);
        self.inner.fetch(spec, refresh).await
    }

    fn source_name(&self) -> &str {
        "recording"
    }
}

struct Dirs {
    mirror: TempDir,
    models: TempDir,
}

impl Dirs {
    fn new() -> Self {
        Self {
            mirror: TempDir::new().unwrap(),
            models: TempDir::new().unwrap(),
        }
    }

    fn publish(&self, contents: &[u8]) {
        std::fs::write(self.mirror.path().join("mnist-12.onnx"), contents).unwrap();
    }

    fn install(&self, contents: &[u8]) {
        let dir = self.models.path().join("mnist");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("mnist-12.onnx"), contents).unwrap();
    }

    fn provisioner(&self, network: NetworkState) -> ModelProvisioner<RecordingSource> {
        ModelProvisioner::new(
            spec(),
            RecordingSource::new(self.mirror.path(), self.models.path()),
            network,
            self.models.path().to_path_buf(),
        )
    }
}

fn recorded(provisioner: &ModelProvisioner<RecordingSource>) -> &RecordingSource {
    provisioner.source()
}

#[tokio::test]
async fn test_first_fetch_installs_model() {
    let dirs = Dirs::new();
    dirs.publish(b"v1");

    let provisioner = dirs.provisioner(METERED);
    assert!(!provisioner.is_present().await.unwrap());

    // A missing model is fetched over any network
    let handle = provisioner.provision().await.unwrap();
    assert_eq!(handle.name(), "mnist");
    assert_eq!(handle.bytes(), b"v1");
    assert!(handle.path().starts_with(dirs.models.path()));
    assert_eq!(recorded(&provisioner).fetches(), vec![false]);
    assert!(provisioner.is_present().await.unwrap());
}

#[tokio::test]
async fn test_local_copy_refreshed_when_unmetered() {
    let dirs = Dirs::new();
    dirs.install(b"old");
    dirs.publish(b"new");

    let provisioner = dirs.provisioner(UNMETERED);
    let handle = provisioner.provision().await.unwrap();

    assert_eq!(handle.bytes(), b"new");
    assert_eq!(recorded(&provisioner).fetches(), vec![true]);
}

#[tokio::test]
async fn test_refresh_deferred_when_metered() {
    let dirs = Dirs::new();
    dirs.install(b"old");
    dirs.publish(b"new");

    let provisioner = dirs.provisioner(METERED);
    let handle = provisioner.provision().await.unwrap();

    assert_eq!(handle.bytes(), b"old");
    assert!(recorded(&provisioner).fetches().is_empty());
}

#[tokio::test]
async fn test_unreachable_mirror_is_network_error() {
    let dirs = Dirs::new();
    let provisioner = ModelProvisioner::new(
        spec(),
        DirectorySource::new(
            dirs.mirror.path().join("not-mounted"),
            dirs.models.path().to_path_buf(),
        ),
        UNMETERED,
        dirs.models.path().to_path_buf(),
    );

    let err = provisioner.provision().await.unwrap_err();
    assert!(matches!(
        err,
        ScrawlError::Provisioning(ProvisioningError::Network(_))
    ));
}

#[tokio::test]
async fn test_missing_artifact_is_service_error() {
    let dirs = Dirs::new();
    let provisioner = dirs.provisioner(UNMETERED);

    let err = provisioner.provision().await.unwrap_err();
    assert!(matches!(
        err,
        ScrawlError::Provisioning(ProvisioningError::Service(_))
    ));
    assert!(!provisioner.is_present().await.unwrap());
}

#[tokio::test]
async fn test_refresh_failure_is_reported() {
    let dirs = Dirs::new();
    dirs.install(b"old");

    // Local copy exists but the mirror lost the file
    let provisioner = dirs.provisioner(UNMETERED);
    let err = provisioner.provision().await.unwrap_err();
    assert!(matches!(err, ScrawlError::Provisioning(_)));
    assert_eq!(recorded(&provisioner).fetches(), vec![true]);
}

#[tokio::test]
async fn test_empty_artifact_is_rejected() {
    let dirs = Dirs::new();
    dirs.publish(b"");

    let err = dirs.provisioner(UNMETERED).provision().await.unwrap_err();
    assert!(err.to_string().contains("is empty"));

    let manifest = Manifest::load_or_regenerate(dirs.models.path()).unwrap();
    assert!(manifest.find_model("mnist").is_none());
    assert!(!ModelManager::new(dirs.models.path())
        .unwrap()
        .is_installed("mnist"));
}

#[tokio::test]
async fn test_provisioning_records_manifest() {
    let dirs = Dirs::new();
    dirs.publish(b"weights");

    dirs.provisioner(UNMETERED).provision().await.unwrap();

    let manifest = Manifest::load(&manifest_path(dirs.models.path())).unwrap();
    let entry = manifest.find_model("mnist").unwrap();
    assert_eq!(entry.size_bytes, 7);
    assert_eq!(entry.source, "recording");

    let mut manager = ModelManager::new(dirs.models.path()).unwrap();
    assert!(manager.is_installed("mnist"));

    let removed = manager.remove("mnist").unwrap();
    assert!(!removed.path.exists());
    assert!(!ModelManager::new(dirs.models.path())
        .unwrap()
        .is_installed("mnist"));
}
