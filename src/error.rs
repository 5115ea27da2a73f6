use thiserror::Error;

/// Main error type for Scrawl
#[derive(Error, Debug)]
pub enum ScrawlError {
    #[error("Provisioning error: {0}")]
    Provisioning(#[from] ProvisioningError),

    #[error("Classification error: {0}")]
    Classification(#[from] ClassificationError),

    #[error("Config error: {0}\n\nTroubleshooting:\n- Check config file: ~/.config/scrawl/config.toml\n- Delete the file to fall back to built-in defaults\n- Run with RUST_LOG=debug for more details")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Failures while locating or fetching the model artifact
#[derive(Error, Debug)]
pub enum ProvisioningError {
    #[error("Unknown model '{name}'{}\n\nTroubleshooting:\n- Known models: scrawl model list --available\n- Or set model.repo and model.file in config to use a custom repository", suggestion.as_ref().map(|s| format!(" (did you mean '{s}'?)")).unwrap_or_default())]
    UnknownModel {
        name: String,
        suggestion: Option<String>,
    },

    #[error("Network error: {0}\n\nTroubleshooting:\n- Check internet connection\n- Verify firewall or proxy settings\n- Use model.source = \"directory\" with a local mirror for offline use")]
    Network(String),

    #[error("Model service error: {0}\n\nTroubleshooting:\n- Verify model.repo, model.revision and model.file in config\n- Check Hugging Face service status\n- Try again in a moment")]
    Service(String),

    #[error("Not enough disk space: {0}")]
    DiskSpace(String),

    #[error("Model artifact error: {0}")]
    Artifact(String),
}

/// Failures while running a single classification
#[derive(Error, Debug)]
pub enum ClassificationError {
    #[error("classifier is not initialized")]
    NotInitialized,

    #[error("classifier has been closed")]
    Closed,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("model produced no result")]
    NoResult,
}

pub type Result<T> = std::result::Result<T, ScrawlError>;
