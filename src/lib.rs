//! # multiform
//!
//! Streaming validation and collection of multipart form submissions.
//!
//! ## Overview
//!
//! multiform sits between a streaming multipart decoder and an application:
//! - **Declarative schema**: describe expected fields and files, their
//!   multiplicity, whether they are required, and their rules
//! - **Rule chains**: ordered pattern, sync and async predicates per value,
//!   stopping at the first failure
//! - **File sinks**: write parts to disk, buffer them in memory, or hand them
//!   to your own consumer, with per-field size limits
//! - **One resolution**: a parse resolves once, with the full result or the
//!   first error attributed to its key
//! - **Cleanup**: on failure every file written for the parse is removed
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use multiform::{FieldSpec, Form, MemorySource, Rule, SizeLimit};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let form = Form::builder()
//!     .field(
//!         FieldSpec::field("name")
//!             .required()
//!             .rule(Rule::try_pattern("^[A-Z]", "Bad capitalization")?),
//!     )
//!     .field(FieldSpec::disk_file("avatar").with_max_size(SizeLimit::new(1 << 20)))
//!     .build()?;
//!
//! let source = MemorySource::from_fields([("name", "Foo")]);
//! let result = form.parse(source).await?;
//! assert_eq!(result.text("name"), Some("Foo"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Sources
//!
//! Any decoder can drive a parse by implementing [`MultipartSource`]. The
//! crate ships [`ChannelSource`], fed through a [`SourceHandle`], and
//! [`MemorySource`], which replays a fixed list of events.
//!
//! ## Features
//!
//! - `json` - load a [`FormConfig`] from JSON (enabled by default)
//! - `yaml` - load a [`FormConfig`] from YAML
//! - `miette` - Pretty error reporting with miette

pub mod builder;
pub mod config;
pub mod engine;
pub mod error;
pub mod form;
pub mod schema;
pub mod sink;
pub mod source;
pub mod value;

// Re-exports for convenience
pub use builder::FormBuilder;
pub use config::{FieldConfig, FormConfig, FormOptions, RuleConfig};
pub use error::{ErrorKind, FormError, ParseEncodingError, SchemaError};
pub use form::{Form, parse};
pub use schema::{
    DiskTarget, FieldKind, FieldSpec, Pattern, Predicate, Rule, Schema, SchemaBuilder, SinkKind,
    SizeLimit, Verdict,
};
pub use sink::StreamConsumer;
pub use source::{
    ByteStream, ChannelSource, FilePart, MemorySource, MultipartSource, SourceEvent, SourceHandle,
    UpstreamPipe,
};
pub use value::{CollectedValue, Converter, FieldEntry, FormResult, TextEncoding, Value};

// Miette re-exports
#[cfg(feature = "miette")]
pub use error::FormDiagnostic;
