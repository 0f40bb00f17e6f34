//! Several failures of one target reported as a single error.

use std::{error::Error, fmt, sync::Arc};

use super::ComposeError;
use crate::TargetId;

/// Every error raised while composing one target, in the order they were
/// raised.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use pod_composer::{ComposeError, TargetId};
///
/// let target = TargetId::new("default", "kibana-name");
/// let err = ComposeError::combine(&target, vec![
///     Arc::new(ComposeError::unknown_preset("audit")),
///     Arc::new(ComposeError::malformed("spec.containers[kibana].resources", "bad quantity")),
/// ]);
/// let Some(ComposeError::Aggregate(agg)) = err.as_deref() else {
///     panic!("two errors should aggregate");
/// };
/// assert_eq!(agg.target(), &target);
/// assert_eq!(agg.errors().len(), 2);
/// ```
#[derive(Debug)]
pub struct AggregatedErrors {
    target: TargetId,
    errors: Vec<Arc<ComposeError>>,
}

impl AggregatedErrors {
    /// Group `errors` raised while composing `target`.
    #[must_use]
    pub const fn new(target: TargetId, errors: Vec<Arc<ComposeError>>) -> Self {
        Self { target, errors }
    }

    /// The workload whose composition failed.
    #[must_use]
    pub const fn target(&self) -> &TargetId {
        &self.target
    }

    /// The grouped errors.
    #[must_use]
    pub fn errors(&self) -> &[Arc<ComposeError>] {
        &self.errors
    }
}

impl fmt::Display for AggregatedErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "composing '{}' failed with {} errors:",
            self.target,
            self.errors.len()
        )?;
        for err in &self.errors {
            write!(f, "\n  - {err}")?;
        }
        Ok(())
    }
}

impl Error for AggregatedErrors {}
