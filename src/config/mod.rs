//! Configuration types for forms.
//!
//! This module provides:
//! - `FormOptions`: session options such as the temp directory
//! - `FormConfig`: a declarative form description loadable from JSON or YAML
//! - `FieldConfig` / `RuleConfig`: one field and its pattern rules

mod form;
mod options;

pub use form::{FieldConfig, FormConfig, RuleConfig};
pub use options::FormOptions;
