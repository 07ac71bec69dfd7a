//! Miette integration for pretty error reporting.

use miette::{Diagnostic, Severity};
use thiserror::Error;

use super::{ErrorKind, FormError};

/// A diagnostic wrapper for form errors compatible with miette.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct FormDiagnostic {
    /// The error message
    pub message: String,

    #[source]
    /// The underlying error source
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,

    #[help]
    /// Help text for the user
    pub help: Option<String>,

    #[diagnostic(severity)]
    /// Severity level
    pub severity: Severity,
}

fn help_for(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::RequiredFieldMissing => "Submit a value for every required field",
        ErrorKind::DuplicateNotAllowed => "Send this field only once or mark it as multiple",
        ErrorKind::ValidationFailed => "Check the submitted value against the field rules",
        ErrorKind::SizeLimitExceeded => "Upload a smaller file or raise the field's max_size",
        ErrorKind::SinkIo => "Check the temp directory and the stream consumer",
        ErrorKind::Decoder => "The multipart body could not be decoded",
    }
}

impl From<FormError> for FormDiagnostic {
    fn from(e: FormError) -> Self {
        let kind = e.kind();
        let message = match e.key() {
            Some(key) => format!("[{kind}] on '{key}': {}", e.detail()),
            None => format!("[{kind}] {}", e.detail()),
        };
        let source: Option<Box<dyn std::error::Error + Send + Sync>> = match e {
            FormError::SinkIo { source, .. } | FormError::Decoder { source } => {
                Some(Box::new(source))
            }
            _ => None,
        };
        FormDiagnostic {
            message,
            source,
            help: Some(help_for(kind).into()),
            severity: Severity::Error,
        }
    }
}

impl From<FormError> for miette::Report {
    fn from(e: FormError) -> Self {
        miette::Report::new(FormDiagnostic::from(e))
    }
}
