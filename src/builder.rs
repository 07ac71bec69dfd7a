//! Builder for creating Form instances.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{FieldConfig, FormConfig, FormOptions};
use crate::error::SchemaError;
use crate::form::Form;
use crate::schema::{DiskTarget, FieldSpec, Rule, Schema, SinkKind, SizeLimit};
use crate::sink::StreamConsumer;
use crate::value::{Converter, TextEncoding};

/// A field declared either in code or through a [`FieldConfig`].
#[derive(Debug)]
enum Declared {
    Spec(FieldSpec),
    Config(FieldConfig),
}

/// Builder for creating [`Form`] instances.
///
/// Fields keep their declaration order, whether they were added as specs or
/// came from a [`FormConfig`]. Config fields are resolved in [`build`],
/// so stream consumers and extra rules may be registered after loading the
/// config.
///
/// [`build`]: FormBuilder::build
#[derive(Debug, Default)]
pub struct FormBuilder {
    declared: Vec<Declared>,
    options: FormOptions,
    consumers: HashMap<String, Arc<dyn StreamConsumer>>,
    extra_rules: HashMap<String, Vec<Rule>>,
}

impl FormBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a declarative configuration.
    pub fn from_config(config: FormConfig) -> Self {
        let mut builder = FormBuilder::new().with_options(config.options);
        builder
            .declared
            .extend(config.fields.into_iter().map(Declared::Config));
        builder
    }

    /// Add a field spec.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.declared.push(Declared::Spec(spec));
        self
    }

    /// Add a field from its configuration.
    pub fn field_config(mut self, config: FieldConfig) -> Self {
        self.declared.push(Declared::Config(config));
        self
    }

    pub fn with_options(mut self, options: FormOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the directory for auto-named disk files.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.temp_dir = dir.into();
        self
    }

    /// Register the consumer for a configured `stream` file.
    pub fn with_consumer(mut self, key: impl Into<String>, consumer: Arc<dyn StreamConsumer>) -> Self {
        self.consumers.insert(key.into(), consumer);
        self
    }

    /// Append a rule to a configured field, after its pattern rules.
    pub fn with_rule(mut self, key: impl Into<String>, rule: Rule) -> Self {
        self.extra_rules.entry(key.into()).or_default().push(rule);
        self
    }

    /// Resolve every declaration and build the form.
    pub fn build(mut self) -> Result<Form, SchemaError> {
        let mut fields = Vec::with_capacity(self.declared.len());
        for declared in std::mem::take(&mut self.declared) {
            let spec = match declared {
                Declared::Spec(spec) => spec,
                Declared::Config(cfg) => self.spec_from_config(cfg)?,
            };
            fields.push(spec);
        }
        Ok(Form::new(Schema::new(fields)?, self.options))
    }

    fn spec_from_config(&mut self, cfg: FieldConfig) -> Result<FieldSpec, SchemaError> {
        let mut spec = if cfg.is_file() {
            self.file_from_config(&cfg)?
        } else {
            match cfg.kind.as_deref() {
                None | Some("field") => FieldSpec::field(cfg.key.clone()),
                Some(other) => {
                    return Err(SchemaError::Config(format!(
                        "unknown field kind '{other}' for '{}'",
                        cfg.key
                    )));
                }
            }
        };

        if let Some(name) = cfg.convert.as_deref() {
            spec = spec.with_converter(converter_from_name(&cfg.key, name)?);
        }
        spec.multiple = cfg.multiple;
        spec.required = cfg.required;
        spec.strict_duplicate = cfg.strict;

        for rule in &cfg.rules {
            let rule = Rule::try_pattern(&rule.pattern, rule.error.clone()).map_err(|source| {
                SchemaError::InvalidPattern {
                    key: cfg.key.clone(),
                    source,
                }
            })?;
            spec = spec.rule(rule);
        }
        if let Some(extra) = self.extra_rules.remove(&cfg.key) {
            spec.rules.extend(extra);
        }
        Ok(spec)
    }

    fn file_from_config(&mut self, cfg: &FieldConfig) -> Result<FieldSpec, SchemaError> {
        let sink = match cfg.sink.as_deref().unwrap_or("disk") {
            "disk" => SinkKind::Disk(match &cfg.path {
                Some(path) => DiskTarget::Path(PathBuf::from(path)),
                None => DiskTarget::Auto,
            }),
            "buffer" => {
                let encoding = match cfg.encoding.as_deref() {
                    Some(name) => Some(name.parse::<TextEncoding>().map_err(|_| {
                        SchemaError::UnknownEncoding {
                            key: cfg.key.clone(),
                            encoding: name.to_string(),
                        }
                    })?),
                    None => None,
                };
                SinkKind::Buffer {
                    encoding,
                    converter: None,
                }
            }
            "stream" => {
                let consumer = self
                    .consumers
                    .remove(&cfg.key)
                    .ok_or_else(|| SchemaError::MissingConsumer(cfg.key.clone()))?;
                SinkKind::Callback(consumer)
            }
            other => {
                return Err(SchemaError::UnknownSink {
                    key: cfg.key.clone(),
                    sink: other.to_string(),
                });
            }
        };

        let mut spec = FieldSpec::file(cfg.key.clone(), sink);
        if let Some(bytes) = cfg.max_size {
            let mut limit = SizeLimit::new(bytes);
            if let Some(message) = &cfg.max_size_error {
                limit = limit.with_message(message.clone());
            }
            spec = spec.with_max_size(limit);
        }
        Ok(spec)
    }
}

fn converter_from_name(key: &str, name: &str) -> Result<Converter, SchemaError> {
    match name.to_ascii_lowercase().as_str() {
        "integer" | "int" => Ok(Converter::integer()),
        "float" | "number" => Ok(Converter::float()),
        "boolean" | "bool" => Ok(Converter::boolean()),
        other => Err(SchemaError::Config(format!(
            "unknown conversion '{other}' for '{key}'"
        ))),
    }
}
