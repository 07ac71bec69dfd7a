//! Options of a parse session.

use std::path::PathBuf;

use serde::Deserialize;

use crate::sink::temp_file_path;

/// Runtime options shared by every parse of a form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormOptions {
    /// Directory for auto-named disk files
    pub temp_dir: PathBuf,
    /// Prefix of auto-named disk files
    pub file_prefix: String,
    /// Suffix of auto-named disk files
    pub file_suffix: String,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            file_prefix: "multiform-".to_string(),
            file_suffix: ".tmp".to_string(),
        }
    }
}

impl FormOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directory for auto-named disk files.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    pub fn with_file_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.file_suffix = suffix.into();
        self
    }

    /// A fresh, process-unique path under `temp_dir`.
    pub fn temp_file_path(&self) -> PathBuf {
        temp_file_path(&self.temp_dir, &self.file_prefix, &self.file_suffix)
    }
}
