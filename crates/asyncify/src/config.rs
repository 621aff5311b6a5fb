//! Engine configuration.
//!
//! Every name the engine recognises or emits is configurable so the engine
//! can target any brace-style language with a task-returning async model.
//! Defaults match the conventional `Task`/`CancellationToken` vocabulary.
//!
//! ```yaml
//! handle_type: Task
//! cancellation:
//!   param_name: cancellationToken
//!   type_name: CancellationToken
//! propagate: true
//! ```

use crate::error::AsyncifyResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsyncifyConfig {
    /// Name of the awaitable handle type (`Task`)
    pub handle_type: String,
    /// Cancellation parameter settings
    pub cancellation: CancellationConfig,
    /// Member names that block on a handle
    pub blocking: BlockingNames,
    /// Async sibling discovery
    pub sibling: SiblingConfig,
    /// Walk the call chain after the leaf fix
    pub propagate: bool,
    /// Pass the cancellation token on to callees that accept one
    pub forward_cancellation: bool,
}

impl Default for AsyncifyConfig {
    fn default() -> Self {
        Self {
            handle_type: "Task".to_string(),
            cancellation: CancellationConfig::default(),
            blocking: BlockingNames::default(),
            sibling: SiblingConfig::default(),
            propagate: true,
            forward_cancellation: true,
        }
    }
}

impl AsyncifyConfig {
    /// Parse from YAML; missing keys take defaults.
    pub fn from_yaml_str(yaml: &str) -> AsyncifyResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load from a YAML file.
    pub fn load(path: &Path) -> AsyncifyResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> AsyncifyResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Set the handle type name.
    #[must_use]
    pub fn with_handle_type(mut self, name: impl Into<String>) -> Self {
        self.handle_type = name.into();
        self
    }

    /// Enable or disable call-chain propagation.
    #[must_use]
    pub const fn with_propagation(mut self, propagate: bool) -> Self {
        self.propagate = propagate;
        self
    }

    /// Enable or disable cancellation forwarding.
    #[must_use]
    pub const fn with_forward_cancellation(mut self, forward: bool) -> Self {
        self.forward_cancellation = forward;
        self
    }

    /// Replace the cancellation settings.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationConfig) -> Self {
        self.cancellation = cancellation;
        self
    }
}

/// Cancellation parameter appended to converted routines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CancellationConfig {
    /// Parameter name
    pub param_name: String,
    /// Parameter type name
    pub type_name: String,
    /// Default value text
    pub default_value: String,
    /// Whether the target language supports parameter defaults
    pub supports_default_values: bool,
}

impl Default for CancellationConfig {
    fn default() -> Self {
        Self {
            param_name: "cancellationToken".to_string(),
            type_name: "CancellationToken".to_string(),
            default_value: "default(CancellationToken)".to_string(),
            supports_default_values: true,
        }
    }
}

impl CancellationConfig {
    /// Disable parameter defaults.
    #[must_use]
    pub const fn without_defaults(mut self) -> Self {
        self.supports_default_values = false;
        self
    }
}

/// Member names that synchronously wait on a handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockingNames {
    /// Value accessor (`Result`)
    pub result: String,
    /// Wait operation (`Wait`)
    pub wait: String,
    /// Awaiter retrieval (`GetAwaiter`)
    pub awaiter: String,
    /// Awaiter result retrieval (`GetResult`)
    pub awaiter_result: String,
}

impl Default for BlockingNames {
    fn default() -> Self {
        Self {
            result: "Result".to_string(),
            wait: "Wait".to_string(),
            awaiter: "GetAwaiter".to_string(),
            awaiter_result: "GetResult".to_string(),
        }
    }
}

/// Async sibling discovery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiblingConfig {
    /// Name suffix of async variants
    pub suffix: String,
    /// Assembly prefixes that mark platform libraries (matched case-insensitively)
    pub platform_prefixes: Vec<String>,
}

impl Default for SiblingConfig {
    fn default() -> Self {
        Self {
            suffix: "Async".to_string(),
            platform_prefixes: vec!["System.".to_string()],
        }
    }
}

impl SiblingConfig {
    /// Whether `assembly` belongs to the platform library.
    #[must_use]
    pub fn is_platform(&self, assembly: &str) -> bool {
        let assembly = assembly.to_ascii_lowercase();
        self.platform_prefixes
            .iter()
            .any(|prefix| assembly.starts_with(&prefix.to_ascii_lowercase()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AsyncifyConfig::default();
        assert_eq!(config.handle_type, "Task");
        assert_eq!(config.cancellation.param_name, "cancellationToken");
        assert_eq!(config.blocking.awaiter_result, "GetResult");
        assert!(config.propagate);
        assert!(config.forward_cancellation);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = AsyncifyConfig::from_yaml_str(
            "handle_type: Future\ncancellation:\n  param_name: ct\n",
        )
        .unwrap();
        assert_eq!(config.handle_type, "Future");
        assert_eq!(config.cancellation.param_name, "ct");
        assert_eq!(config.cancellation.type_name, "CancellationToken");
        assert_eq!(config.sibling.suffix, "Async");
    }

    #[test]
    fn invalid_yaml_is_config_error() {
        let err = AsyncifyConfig::from_yaml_str("propagate: [1, 2").unwrap_err();
        assert!(matches!(err, crate::AsyncifyError::Config(_)));
    }

    #[test]
    fn yaml_roundtrip() {
        let config = AsyncifyConfig::default()
            .with_handle_type("ValueTask")
            .with_propagation(false);
        let yaml = config.to_yaml().unwrap();
        assert_eq!(AsyncifyConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn platform_prefix_case_insensitive() {
        let sibling = SiblingConfig::default();
        assert!(sibling.is_platform("System.IO"));
        assert!(sibling.is_platform("system.runtime"));
        assert!(!sibling.is_platform("Systematic"));
        assert!(!sibling.is_platform("MyApp"));
    }

    #[test]
    fn load_from_file() {
        let dir = std::env::temp_dir().join(format!("asyncify-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("asyncify.yaml");
        std::fs::write(&path, "forward_cancellation: false\n").unwrap();
        let config = AsyncifyConfig::load(&path).unwrap();
        assert!(!config.forward_cancellation);
        std::fs::remove_dir_all(&dir).ok();
    }
}
