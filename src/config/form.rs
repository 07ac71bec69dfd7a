//! Declarative form configuration.

use serde::Deserialize;

use super::FormOptions;
#[cfg(any(feature = "json", feature = "yaml"))]
use crate::error::SchemaError;

/// Configuration for an entire form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormConfig {
    /// Session options
    #[serde(default)]
    pub options: FormOptions,
    /// Field configurations, in declaration order
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

/// Configuration for a single field or file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldConfig {
    /// Unique key of the field
    pub key: String,
    /// Kind of field: "field" (default) or "file"
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default)]
    pub required: bool,
    /// Reject a second value of a non-multiple field instead of dropping it
    #[serde(default)]
    pub strict: bool,
    /// File sink: "disk" (default), "buffer" or "stream"
    #[serde(default)]
    pub sink: Option<String>,
    /// Explicit path for disk files
    #[serde(default)]
    pub path: Option<String>,
    /// Text encoding for buffered files: "utf8", "latin1", "ascii", "hex",
    /// "base64" or "utf16le"
    #[serde(default)]
    pub encoding: Option<String>,
    /// Conversion: "integer", "float" or "boolean"
    #[serde(default)]
    pub convert: Option<String>,
    /// Maximum file size in bytes
    #[serde(default)]
    pub max_size: Option<u64>,
    /// Message reported when `max_size` is exceeded
    #[serde(default)]
    pub max_size_error: Option<String>,
    /// Pattern rules, evaluated in order
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// A pattern rule.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    pub pattern: String,
    pub error: String,
}

impl FieldConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    /// Whether this entry describes a file.
    pub fn is_file(&self) -> bool {
        matches!(self.kind.as_deref(), Some("file")) || self.sink.is_some()
    }
}

impl FormConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field(mut self, field: FieldConfig) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_options(mut self, options: FormOptions) -> Self {
        self.options = options;
        self
    }

    #[cfg(feature = "json")]
    pub fn from_json_str(s: &str) -> Result<Self, SchemaError> {
        serde_json::from_str(s).map_err(|e| SchemaError::Config(e.to_string()))
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(s: &str) -> Result<Self, SchemaError> {
        serde_yaml::from_str(s).map_err(|e| SchemaError::Config(e.to_string()))
    }
}
