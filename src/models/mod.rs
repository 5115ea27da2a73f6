pub mod download;
pub mod manager;
pub mod manifest;
pub mod provisioner;
pub mod registry;
pub mod source;

pub use download::HubSource;
pub use manager::ModelManager;
pub use manifest::{InstalledModel, Manifest};
pub use provisioner::{DownloadConditions, ModelProvisioner, NetworkState};
pub use registry::{ModelInfo, ModelSpec};
pub use source::{DirectorySource, ModelSource, Source};
