use crate::error::{ProvisioningError, Result};
use memmap2::Mmap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Opaque reference to a provisioned model artifact.
///
/// The file is memory-mapped read-only once; clones share the same map and
/// the mapping is released when the last clone is dropped.
#[derive(Clone)]
pub struct ModelHandle {
    name: String,
    path: PathBuf,
    map: Arc<Mmap>,
}

impl ModelHandle {
    /// Map a local model file
    pub fn open(name: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self> {
        let name = name.into();
        let path = path.into();

        let file = File::open(&path).map_err(|e| {
            ProvisioningError::Artifact(format!("Failed to open {}: {e}", path.display()))
        })?;

        let len = file.metadata()?.len();
        if len == 0 {
            return Err(ProvisioningError::Artifact(format!(
                "Model file {} is empty",
                path.display()
            ))
            .into());
        }

        // SAFETY: the artifact is only replaced via rename, never truncated in place
        let map = unsafe { Mmap::map(&file) }.map_err(|e| {
            ProvisioningError::Artifact(format!("Failed to map {}: {e}", path.display()))
        })?;

        tracing::debug!("Mapped model {} ({} bytes)", path.display(), len);

        Ok(Self {
            name,
            path,
            map: Arc::new(map),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.map
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("len", &self.map.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScrawlError;
    use tempfile::TempDir;

    #[test]
    fn test_open_maps_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("model.onnx");
        std::fs::write(&path, b"weights").unwrap();

        let handle = ModelHandle::open("mnist", &path).unwrap();
        assert_eq!(handle.name(), "mnist");
        assert_eq!(handle.path(), path);
        assert_eq!(handle.bytes(), b"weights");
        assert_eq!(handle.len(), 7);

        let clone = handle.clone();
        assert_eq!(clone.bytes().as_ptr(), handle.bytes().as_ptr());
    }

    #[test]
    fn test_open_missing_file() {
        let err = ModelHandle::open("mnist", "/nonexistent/model.onnx").unwrap_err();
        assert!(matches!(
            err,
            ScrawlError::Provisioning(ProvisioningError::Artifact(_))
        ));
    }

    #[test]
    fn test_open_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.onnx");
        std::fs::write(&path, b"").unwrap();

        let err = ModelHandle::open("mnist", &path).unwrap_err();
        assert!(err.to_string().contains("is empty"));
    }
}
