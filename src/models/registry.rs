use crate::config::schema::ModelConfig;
use crate::error::{ProvisioningError, Result};

/// Information about a known digit classification model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: &'static str,
    pub size_kb: u64,
    pub description: &'static str,
    pub recommended: bool,
    pub hf_repo: &'static str,
    pub hf_revision: &'static str,
    pub file: &'static str,
}

/// Registry of available digit models
pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        name: "mnist",
        size_kb: 26,
        description: "Small CNN trained on MNIST, opset 12",
        recommended: true,
        hf_repo: "onnxmodelzoo/mnist-12",
        hf_revision: "main",
        file: "mnist-12.onnx",
    },
    ModelInfo {
        name: "mnist-8",
        size_kb: 26,
        description: "Same network exported with opset 8",
        recommended: false,
        hf_repo: "onnxmodelzoo/mnist-8",
        hf_revision: "main",
        file: "mnist-8.onnx",
    },
    ModelInfo {
        name: "mnist-int8",
        size_kb: 11,
        description: "Quantized variant, smallest download",
        recommended: false,
        hf_repo: "onnxmodelzoo/mnist-12-int8",
        hf_revision: "main",
        file: "mnist-12-int8.onnx",
    },
];

impl ModelInfo {
    /// Find model by name
    #[must_use]
    pub fn find(name: &str) -> Option<&'static Self> {
        MODELS.iter().find(|m| m.name == name)
    }

    /// Get all model names
    #[must_use]
    pub fn all_names() -> Vec<&'static str> {
        MODELS.iter().map(|m| m.name).collect()
    }

    /// Get recommended model
    #[must_use]
    pub fn recommended() -> &'static Self {
        MODELS.iter().find(|m| m.recommended).unwrap_or(&MODELS[0])
    }

    /// Find closest match using Levenshtein distance
    #[must_use]
    pub fn suggest(name: &str) -> Option<&'static str> {
        if name.is_empty() {
            return None;
        }

        MODELS
            .iter()
            .map(|m| (m.name, levenshtein_distance(name, m.name)))
            .min_by_key(|(_, dist)| *dist)
            .filter(|(_, dist)| *dist <= 2) // Only suggest if within 2 edits
            .map(|(model_name, _)| model_name)
    }
}

/// Fully resolved description of the model to provision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub hf_repo: String,
    pub hf_revision: String,
    pub file: String,
    pub size_kb: u64,
}

impl ModelSpec {
    /// Resolve the configured model against the registry.
    ///
    /// A configured `repo` makes the name free-form; otherwise the name must be
    /// a registry entry, whose fields can still be overridden individually.
    pub fn resolve(config: &ModelConfig) -> Result<Self> {
        match (ModelInfo::find(&config.name), config.repo.as_ref()) {
            (Some(info), repo) => Ok(Self {
                name: info.name.to_string(),
                hf_repo: repo.cloned().unwrap_or_else(|| info.hf_repo.to_string()),
                hf_revision: config
                    .revision
                    .clone()
                    .unwrap_or_else(|| info.hf_revision.to_string()),
                file: config.file.clone().unwrap_or_else(|| info.file.to_string()),
                size_kb: info.size_kb,
            }),
            (None, Some(repo)) => Ok(Self {
                name: config.name.clone(),
                hf_repo: repo.clone(),
                hf_revision: config.revision.clone().unwrap_or_else(|| "main".to_string()),
                file: config.file.clone().unwrap_or_else(|| "model.onnx".to_string()),
                size_kb: 0,
            }),
            (None, None) => Err(ProvisioningError::UnknownModel {
                name: config.name.clone(),
                suggestion: ModelInfo::suggest(&config.name).map(str::to_string),
            }
            .into()),
        }
    }
}

/// Calculate Levenshtein distance between two strings
#[allow(clippy::needless_range_loop)]
fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let len1 = s1.chars().count();
    let len2 = s2.chars().count();

    if len1 == 0 {
        return len2;
    }
    if len2 == 0 {
        return len1;
    }

    let mut matrix = vec![vec![0; len2 + 1]; len1 + 1];

    for i in 0..=len1 {
        matrix[i][0] = i;
    }
    for j in 0..=len2 {
        matrix[0][j] = j;
    }

    for (i, c1) in s1.chars().enumerate() {
        for (j, c2) in s2.chars().enumerate() {
            let cost = usize::from(c1 != c2);
            matrix[i + 1][j + 1] = (matrix[i][j + 1] + 1)
                .min(matrix[i + 1][j] + 1)
                .min(matrix[i][j] + cost);
        }
    }

    matrix[len1][len2]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScrawlError;

    #[test]
    fn test_find_model() {
        assert!(ModelInfo::find("mnist").is_some());
        assert!(ModelInfo::find("mnist-int8").is_some());
        assert!(ModelInfo::find("cifar").is_none());
    }

    #[test]
    fn test_all_names_follow_registry_order() {
        let names = ModelInfo::all_names();
        assert_eq!(names.len(), MODELS.len());
        assert_eq!(names[0], "mnist");
        assert!(names.contains(&"mnist-int8"));
    }

    #[test]
    fn test_recommended() {
        let recommended = ModelInfo::recommended();
        assert_eq!(recommended.name, "mnist");
        assert!(recommended.recommended);
    }

    #[test]
    fn test_suggest() {
        assert_eq!(ModelInfo::suggest("mnst"), Some("mnist"));
        assert_eq!(ModelInfo::suggest("mnist-in8"), Some("mnist-int8"));
        assert_eq!(ModelInfo::suggest("resnet50"), None);
        assert_eq!(ModelInfo::suggest(""), None);
    }

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("mnist", "mnist"), 0);
        assert_eq!(levenshtein_distance("mnist", "mnst"), 1);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn test_resolve_known_model() {
        let spec = ModelSpec::resolve(&ModelConfig::default()).unwrap();
        assert_eq!(spec.name, "mnist");
        assert_eq!(spec.hf_repo, "onnxmodelzoo/mnist-12");
        assert_eq!(spec.file, "mnist-12.onnx");
    }

    #[test]
    fn test_resolve_overrides() {
        let config = ModelConfig {
            file: Some("digits.onnx".to_string()),
            revision: Some("v2".to_string()),
            ..ModelConfig::default()
        };
        let spec = ModelSpec::resolve(&config).unwrap();
        assert_eq!(spec.file, "digits.onnx");
        assert_eq!(spec.hf_revision, "v2");
    }

    #[test]
    fn test_resolve_custom_repo() {
        let config = ModelConfig {
            name: "my-digits".to_string(),
            repo: Some("someone/my-digits".to_string()),
            ..ModelConfig::default()
        };
        let spec = ModelSpec::resolve(&config).unwrap();
        assert_eq!(spec.name, "my-digits");
        assert_eq!(spec.file, "model.onnx");
        assert_eq!(spec.hf_revision, "main");
    }

    #[test]
    fn test_resolve_unknown_suggests() {
        let config = ModelConfig {
            name: "mnst".to_string(),
            ..ModelConfig::default()
        };
        let err = ModelSpec::resolve(&config).unwrap_err();
        assert!(matches!(
            err,
            ScrawlError::Provisioning(ProvisioningError::UnknownModel { .. })
        ));
        assert!(err.to_string().contains("did you mean 'mnist'?"));
    }
}
