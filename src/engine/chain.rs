//! Sequential evaluation of a field's rules.

use tracing::debug;

use crate::error::FormError;
use crate::schema::{Pattern, Predicate, Rule, Verdict};
use crate::value::{CollectedValue, Value};

/// Evaluates an ordered list of rules against one value.
///
/// Rules run strictly in order and the first failure ends the chain;
/// asynchronous predicates suspend it until their future resolves.
#[derive(Debug, Clone, Default)]
pub struct RuleChain {
    rules: Vec<Rule>,
}

impl RuleChain {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether any rule can suspend the chain.
    pub fn has_async(&self) -> bool {
        self.rules.iter().any(Rule::is_async)
    }

    pub async fn evaluate(&self, key: &str, value: &CollectedValue) -> Result<(), FormError> {
        for (index, rule) in self.rules.iter().enumerate() {
            let verdict = match &rule.predicate {
                Predicate::Pattern(pattern) => pattern_verdict(pattern, key, value).await?,
                Predicate::Sync(f) => f(key, value),
                Predicate::Async(f) => f(key.to_string(), value.clone()).await,
            };
            match verdict {
                Verdict::Pass => {}
                Verdict::Fail => {
                    debug!(key, rule = index, "rule failed");
                    return Err(FormError::ValidationFailed {
                        key: key.to_string(),
                        detail: rule.error.clone(),
                    });
                }
                Verdict::Reject(detail) => {
                    debug!(key, rule = index, "rule rejected value");
                    return Err(FormError::ValidationFailed {
                        key: key.to_string(),
                        detail,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Text is matched as text and raw bytes byte by byte. Disk files are
/// matched on their contents; streamed files carry nothing to match and
/// always pass.
async fn pattern_verdict(
    pattern: &Pattern,
    key: &str,
    value: &CollectedValue,
) -> Result<Verdict, FormError> {
    let matched = match value {
        CollectedValue::Scalar(Value::Bytes(raw))
        | CollectedValue::BufferedFile {
            data: Value::Bytes(raw),
            ..
        } => pattern.is_match_bytes(raw),
        CollectedValue::Scalar(v) | CollectedValue::BufferedFile { data: v, .. } => {
            pattern.is_match_text(&v.match_bytes())
        }
        CollectedValue::DiskFile { path, .. } => {
            let contents = tokio::fs::read(path)
                .await
                .map_err(|e| FormError::sink_io(key, e))?;
            pattern.is_match_bytes(&contents)
        }
        CollectedValue::StreamedFile { .. } => true,
    };
    Ok(Verdict::from(matched))
}
