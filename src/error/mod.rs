//! Error types for multiform.
//!
//! This module provides:
//! - `FormError`: the single terminal failure of a parse, attributed to a key
//!   whenever the failure originated inside a per-key operation
//! - `ErrorKind`: a copyable discriminant of `FormError`
//! - `SchemaError`: failures while building a schema or loading a form config

use std::fmt;
use std::io;

use thiserror::Error;

/// Message used when a required field never arrived.
pub const REQUIRED_MESSAGE: &str = "Field is required";
/// Message used when a second value arrives for a strict non-multiple field.
pub const DUPLICATE_MESSAGE: &str = "Multiple values not allowed";
/// Default message for a file part that exceeded its `max_size`.
pub const SIZE_LIMIT_MESSAGE: &str = "File exceeded maximum size limit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RequiredFieldMissing,
    DuplicateNotAllowed,
    ValidationFailed,
    SizeLimitExceeded,
    /// Error while writing, reading or streaming a file part
    SinkIo,
    /// Error reported by the multipart source itself
    Decoder,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::RequiredFieldMissing => write!(f, "RequiredFieldMissing"),
            ErrorKind::DuplicateNotAllowed => write!(f, "DuplicateNotAllowed"),
            ErrorKind::ValidationFailed => write!(f, "ValidationFailed"),
            ErrorKind::SizeLimitExceeded => write!(f, "SizeLimitExceeded"),
            ErrorKind::SinkIo => write!(f, "SinkIo"),
            ErrorKind::Decoder => write!(f, "Decoder"),
        }
    }
}

/// The terminal failure of a form parse.
///
/// Exactly one `FormError` surfaces per parse, no matter how many operations
/// failed concurrently; the first one reported wins.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("{key}: {msg}", msg = REQUIRED_MESSAGE)]
    RequiredFieldMissing { key: String },

    #[error("{key}: {msg}", msg = DUPLICATE_MESSAGE)]
    DuplicateNotAllowed { key: String },

    #[error("{key}: {detail}")]
    ValidationFailed { key: String, detail: String },

    #[error("{key}: {detail}")]
    SizeLimitExceeded { key: String, detail: String },

    #[error("{key}: {source}")]
    SinkIo {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("multipart source failed: {source}")]
    Decoder {
        #[source]
        source: io::Error,
    },
}

impl FormError {
    /// Key of the field or file the error is attributed to, if any.
    ///
    /// Decoder errors cannot be attributed and return `None`.
    pub fn key(&self) -> Option<&str> {
        match self {
            FormError::RequiredFieldMissing { key }
            | FormError::DuplicateNotAllowed { key }
            | FormError::ValidationFailed { key, .. }
            | FormError::SizeLimitExceeded { key, .. }
            | FormError::SinkIo { key, .. } => Some(key),
            FormError::Decoder { .. } => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FormError::RequiredFieldMissing { .. } => ErrorKind::RequiredFieldMissing,
            FormError::DuplicateNotAllowed { .. } => ErrorKind::DuplicateNotAllowed,
            FormError::ValidationFailed { .. } => ErrorKind::ValidationFailed,
            FormError::SizeLimitExceeded { .. } => ErrorKind::SizeLimitExceeded,
            FormError::SinkIo { .. } => ErrorKind::SinkIo,
            FormError::Decoder { .. } => ErrorKind::Decoder,
        }
    }

    /// Human readable detail without the key prefix.
    pub fn detail(&self) -> String {
        match self {
            FormError::RequiredFieldMissing { .. } => REQUIRED_MESSAGE.to_string(),
            FormError::DuplicateNotAllowed { .. } => DUPLICATE_MESSAGE.to_string(),
            FormError::ValidationFailed { detail, .. }
            | FormError::SizeLimitExceeded { detail, .. } => detail.clone(),
            FormError::SinkIo { source, .. } | FormError::Decoder { source } => source.to_string(),
        }
    }

    pub(crate) fn sink_io(key: &str, source: io::Error) -> Self {
        FormError::SinkIo {
            key: key.to_string(),
            source,
        }
    }
}

/// Errors raised while building a schema or loading a form configuration.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("duplicate field key '{0}'")]
    DuplicateKey(String),

    #[error("invalid pattern for '{key}': {source}")]
    InvalidPattern {
        key: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown sink '{sink}' for '{key}'")]
    UnknownSink { key: String, sink: String },

    #[error("unknown encoding '{encoding}' for '{key}'")]
    UnknownEncoding { key: String, encoding: String },

    #[error("no stream consumer registered for '{0}'")]
    MissingConsumer(String),

    #[error("invalid form config: {0}")]
    Config(String),
}

/// An encoding name that [`TextEncoding`](crate::TextEncoding) does not know.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown text encoding '{0}'")]
pub struct ParseEncodingError(pub String);

#[cfg(feature = "miette")]
mod miette_impl;

#[cfg(feature = "miette")]
pub use miette_impl::*;
