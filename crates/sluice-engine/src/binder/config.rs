//! Binder configuration

use serde::{Deserialize, Serialize};

/// What happens when a state variable and a stream attribute share a name
/// inside an operator invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadowPolicy {
    /// Report an error; the state variable wins
    #[default]
    Error,
    /// The state variable wins silently
    Silent,
    /// No check; the attribute wins
    Legacy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarningConfig {
    /// Warning codes to drop entirely
    pub disabled: Vec<String>,
    /// Promote every warning to an error
    pub deny_all: bool,
}

/// Options for one binding run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinderConfig {
    /// Only check syntax-level rules; duplicate clauses become warnings
    pub syntax_only: bool,
    /// Fully qualified main composite; when absent every port-less composite is a main
    pub main_composite: Option<String>,
    pub warnings: WarningConfig,
    pub state_shadowing: ShadowPolicy,
}

impl BinderConfig {
    /// Parse a configuration from JSON text
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BinderConfig::default();
        assert!(!config.syntax_only);
        assert_eq!(config.state_shadowing, ShadowPolicy::Error);
        assert!(config.main_composite.is_none());
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{
            "syntax_only": true,
            "state_shadowing": "legacy",
            "warnings": { "deny_all": true }
        }"#;
        let config = BinderConfig::from_json(json).unwrap();
        assert!(config.syntax_only);
        assert_eq!(config.state_shadowing, ShadowPolicy::Legacy);
        assert!(config.warnings.deny_all);
        assert!(config.warnings.disabled.is_empty());
    }
}
