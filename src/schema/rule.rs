//! Validation rules attached to schema fields.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use regex::bytes::{Regex, RegexBuilder};

use crate::value::CollectedValue;

/// Outcome of a single predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    /// Failed; the rule's own error message is reported
    Fail,
    /// Failed with a message supplied by the predicate, which takes precedence
    Reject(String),
}

impl From<bool> for Verdict {
    fn from(passed: bool) -> Self {
        if passed { Verdict::Pass } else { Verdict::Fail }
    }
}

impl From<Result<(), String>> for Verdict {
    fn from(result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Verdict::Pass,
            Err(message) => Verdict::Reject(message),
        }
    }
}

/// A compiled pattern rule.
///
/// Text is matched with Unicode semantics. Raw bytes (disk files and
/// unencoded buffers) are matched byte by byte, so `\x89` means the byte
/// 0x89 there. A pattern that only makes sense in Unicode mode, such as
/// `\p{L}`, falls back to the Unicode form for bytes as well.
#[derive(Clone)]
pub struct Pattern {
    text: Regex,
    bytes: Option<Regex>,
}

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            text: Regex::new(pattern)?,
            bytes: RegexBuilder::new(pattern).unicode(false).build().ok(),
        })
    }

    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    /// Match the UTF-8 bytes of a text value.
    pub fn is_match_text(&self, text: &[u8]) -> bool {
        self.text.is_match(text)
    }

    /// Match raw bytes, one byte per character.
    pub fn is_match_bytes(&self, bytes: &[u8]) -> bool {
        self.bytes.as_ref().unwrap_or(&self.text).is_match(bytes)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.as_str()).finish()
    }
}

type SyncFn = dyn Fn(&str, &CollectedValue) -> Verdict + Send + Sync;
type AsyncFn = dyn Fn(String, CollectedValue) -> BoxFuture<'static, Verdict> + Send + Sync;

/// The shape of a predicate, chosen explicitly by the schema author.
#[derive(Clone)]
pub enum Predicate {
    /// Matches the value's text, or a file's raw bytes
    Pattern(Pattern),
    Sync(Arc<SyncFn>),
    /// Suspends the chain until the returned future resolves
    Async(Arc<AsyncFn>),
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Pattern(pattern) => pattern.fmt(f),
            Predicate::Sync(_) => f.write_str("Sync(..)"),
            Predicate::Async(_) => f.write_str("Async(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub predicate: Predicate,
    /// Reported when the predicate fails without a message of its own
    pub error: String,
}

impl Rule {
    pub fn pattern(pattern: Pattern, error: impl Into<String>) -> Self {
        Self {
            predicate: Predicate::Pattern(pattern),
            error: error.into(),
        }
    }

    /// Compile `pattern` and build a pattern rule from it.
    pub fn try_pattern(pattern: &str, error: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self::pattern(Pattern::new(pattern)?, error))
    }

    /// A synchronous predicate; anything convertible into a [`Verdict`] may be
    /// returned, so plain `bool` closures work.
    pub fn check<F, V>(f: F, error: impl Into<String>) -> Self
    where
        F: Fn(&str, &CollectedValue) -> V + Send + Sync + 'static,
        V: Into<Verdict>,
    {
        Self {
            predicate: Predicate::Sync(Arc::new(move |key, value| f(key, value).into())),
            error: error.into(),
        }
    }

    /// An asynchronous predicate receiving owned copies of the key and value.
    pub fn check_async<F, Fut, V>(f: F, error: impl Into<String>) -> Self
    where
        F: Fn(String, CollectedValue) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = V> + Send + 'static,
        V: Into<Verdict> + 'static,
    {
        Self {
            predicate: Predicate::Async(Arc::new(move |key, value| {
                f(key, value).map(Into::into).boxed()
            })),
            error: error.into(),
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(self.predicate, Predicate::Async(_))
    }
}
