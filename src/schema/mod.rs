//! Declarative description of the fields and files a form expects.
//!
//! This module provides:
//! - `FieldSpec`: one schema entry, built with `FieldSpec::field` / `FieldSpec::file`
//! - `FieldKind` and `SinkKind`: what a key carries and where file bytes go
//! - `Schema`: an immutable, ordered set of specs with unique keys
//! - `Rule`, `Predicate`, `Verdict`: the validation rule contract

mod rule;

pub use rule::{Pattern, Predicate, Rule, Verdict};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{SIZE_LIMIT_MESSAGE, SchemaError};
use crate::sink::StreamConsumer;
use crate::value::{Converter, TextEncoding};

/// Where a disk sink writes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DiskTarget {
    /// A fresh temporary file under the configured temp directory
    #[default]
    Auto,
    Path(PathBuf),
}

/// Destination of a file part's bytes.
#[derive(Debug, Clone)]
pub enum SinkKind {
    Disk(DiskTarget),
    Buffer {
        encoding: Option<TextEncoding>,
        converter: Option<Converter>,
    },
    Callback(Arc<dyn StreamConsumer>),
}

impl SinkKind {
    pub fn name(&self) -> &'static str {
        match self {
            SinkKind::Disk(_) => "disk",
            SinkKind::Buffer { .. } => "buffer",
            SinkKind::Callback(_) => "stream",
        }
    }
}

/// Upper bound on a file part's size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeLimit {
    pub bytes: u64,
    /// Custom message; defaults to "File exceeded maximum size limit"
    pub message: Option<String>,
}

impl SizeLimit {
    pub fn new(bytes: u64) -> Self {
        Self {
            bytes,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or(SIZE_LIMIT_MESSAGE)
    }
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    Scalar {
        converter: Option<Converter>,
    },
    File {
        sink: SinkKind,
        max_size: Option<SizeLimit>,
    },
}

/// One schema entry.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub key: String,
    pub kind: FieldKind,
    pub multiple: bool,
    pub required: bool,
    /// Fail instead of silently dropping a second value of a non-multiple key
    pub strict_duplicate: bool,
    pub rules: Vec<Rule>,
}

impl FieldSpec {
    /// A plain text field.
    pub fn field(key: impl Into<String>) -> Self {
        Self::new(key, FieldKind::Scalar { converter: None })
    }

    /// A file field with the given sink.
    pub fn file(key: impl Into<String>, sink: SinkKind) -> Self {
        Self::new(
            key,
            FieldKind::File {
                sink,
                max_size: None,
            },
        )
    }

    /// A file field written to an auto-named temporary file.
    pub fn disk_file(key: impl Into<String>) -> Self {
        Self::file(key, SinkKind::Disk(DiskTarget::Auto))
    }

    /// A file field buffered in memory as raw bytes.
    pub fn buffered_file(key: impl Into<String>) -> Self {
        Self::file(
            key,
            SinkKind::Buffer {
                encoding: None,
                converter: None,
            },
        )
    }

    /// A file field handed to `consumer` as a stream.
    pub fn streamed_file(key: impl Into<String>, consumer: Arc<dyn StreamConsumer>) -> Self {
        Self::file(key, SinkKind::Callback(consumer))
    }

    fn new(key: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key: key.into(),
            kind,
            multiple: false,
            required: false,
            strict_duplicate: false,
            rules: Vec::new(),
        }
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict_duplicate = true;
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Set the converter of a scalar field, or of a buffered file.
    ///
    /// Has no effect on disk and stream files.
    pub fn with_converter(mut self, converter: Converter) -> Self {
        match &mut self.kind {
            FieldKind::Scalar { converter: c } => *c = Some(converter),
            FieldKind::File {
                sink: SinkKind::Buffer { converter: c, .. },
                ..
            } => *c = Some(converter),
            FieldKind::File { .. } => {}
        }
        self
    }

    /// Set the text encoding of a buffered file.
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        if let FieldKind::File {
            sink: SinkKind::Buffer { encoding: e, .. },
            ..
        } = &mut self.kind
        {
            *e = Some(encoding);
        }
        self
    }

    /// Write a disk file to an explicit path instead of a temporary one.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        if let FieldKind::File {
            sink: SinkKind::Disk(target),
            ..
        } = &mut self.kind
        {
            *target = DiskTarget::Path(path.into());
        }
        self
    }

    pub fn with_max_size(mut self, limit: SizeLimit) -> Self {
        if let FieldKind::File { max_size, .. } = &mut self.kind {
            *max_size = Some(limit);
        }
        self
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, FieldKind::File { .. })
    }
}

/// An immutable set of field specs, kept in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    index: HashMap<String, usize>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Build a schema from specs, rejecting repeated keys.
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self, SchemaError> {
        let mut index = HashMap::with_capacity(fields.len());
        for (i, spec) in fields.iter().enumerate() {
            if index.insert(spec.key.clone(), i).is_some() {
                return Err(SchemaError::DuplicateKey(spec.key.clone()));
            }
        }
        Ok(Self { fields, index })
    }

    pub fn get(&self, key: &str) -> Option<&FieldSpec> {
        self.index.get(key).map(|&i| &self.fields[i])
    }

    /// Specs in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldSpec>,
}

impl SchemaBuilder {
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        Schema::new(self.fields)
    }
}
