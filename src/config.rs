//! Engine configuration: which tree positions carry translatable copy and
//! how aggressive the partial fallback is. Loaded from JSON or defaulted.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Partial-table entries must be strictly longer than this (in chars).
    pub partial_min_chars: usize,
    /// Attributes whose values are user-facing copy.
    pub translatable_attributes: Vec<String>,
    /// Element kinds whose contents are never copy.
    pub excluded_tags: Vec<String>,
    /// Presence of this attribute opts a subtree out.
    pub no_translate_attribute: String,
    /// Same, as a class name.
    pub no_translate_class: String,
    /// `input` types whose `value` is a label rather than user data.
    pub label_input_types: Vec<String>,
    /// Catalog memo size; 0 disables the memo.
    pub cache_capacity: usize,
    pub frame_interval_ms: u64,
    pub catalog_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            partial_min_chars: 3,
            translatable_attributes: strings(&["placeholder", "title", "aria-label", "alt"]),
            excluded_tags: strings(&["script", "style", "noscript", "template", "code", "pre"]),
            no_translate_attribute: "data-no-translate".to_string(),
            no_translate_class: "notranslate".to_string(),
            label_input_types: strings(&["button", "submit", "reset"]),
            cache_capacity: 1024,
            frame_interval_ms: 16,
            catalog_path: None,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config IO error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl EngineConfig {
    /// Load from a JSON file; missing fields take their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        info!(path = %path.display(), "engine config loaded");
        Ok(config)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }

    pub fn is_translatable_attribute(&self, name: &str) -> bool {
        self.translatable_attributes.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    pub fn is_excluded_tag(&self, tag: &str) -> bool {
        self.excluded_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn is_label_input_type(&self, input_type: &str) -> bool {
        self.label_input_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(input_type.trim()))
    }

    /// Attribute names the tree observer must report: the allow-list plus
    /// the display value.
    pub fn observed_attributes(&self) -> Vec<String> {
        let mut names = self.translatable_attributes.clone();
        names.push(crate::tree::VALUE_ATTRIBUTE.to_string());
        names
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"partial_min_chars": 5, "cache_capacity": 0}}"#).unwrap();
        let config = EngineConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.partial_min_chars, 5);
        assert_eq!(config.cache_capacity, 0);
        assert_eq!(config.no_translate_class, "notranslate");
        assert!(config.is_translatable_attribute("Placeholder"));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = EngineConfig::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn observed_attributes_include_display_value() {
        let config = EngineConfig::default();
        let observed = config.observed_attributes();
        assert!(observed.iter().any(|a| a == "value"));
        assert!(observed.iter().any(|a| a == "aria-label"));
    }

    #[test]
    fn frame_interval_never_zero() {
        let config = EngineConfig {
            frame_interval_ms: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.frame_interval(), Duration::from_millis(1));
    }
}
