//! Constructors and aggregation helpers for `ComposeError`.

use std::sync::Arc;

use figment::Error as FigmentError;

use super::{AggregatedErrors, ComposeError};
use crate::TargetId;

impl ComposeError {
    /// Combine the errors raised while composing `target`.
    ///
    /// Returns `None` for an empty list and the error itself when there is
    /// only one; two or more become [`Self::Aggregate`].
    #[must_use]
    pub fn combine(target: &TargetId, mut errors: Vec<Arc<Self>>) -> Option<Arc<Self>> {
        if errors.len() > 1 {
            let aggregated = AggregatedErrors::new(target.clone(), errors);
            return Some(Arc::new(Self::Aggregate(Box::new(aggregated))));
        }
        errors.pop()
    }

    /// Construct a malformed-override error for `slot`.
    ///
    /// # Examples
    ///
    /// ```
    /// use pod_composer::ComposeError;
    /// let e = ComposeError::malformed("metadata.labels", "expected a map");
    /// assert!(matches!(e, ComposeError::MalformedOverride { .. }));
    /// ```
    #[must_use]
    pub fn malformed(slot: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedOverride {
            slot: slot.into(),
            message: message.into(),
        }
    }

    /// Construct an unknown-preset error for `key`.
    #[must_use]
    pub fn unknown_preset(key: impl Into<String>) -> Self {
        Self::UnknownPresetKey { key: key.into() }
    }

    /// Construct a settings error from a [`figment::Error`].
    ///
    /// # Examples
    ///
    /// ```
    /// use pod_composer::ComposeError;
    /// let fe = figment::Error::from("boom");
    /// let e = ComposeError::settings(fe);
    /// assert!(matches!(e, ComposeError::Settings(_)));
    /// ```
    #[must_use]
    pub fn settings(source: FigmentError) -> Self {
        Self::Settings(Box::new(source))
    }

    /// Construct a settings validation error.
    #[must_use]
    pub fn invalid_setting(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSettings {
            key: key.into(),
            message: message.into(),
        }
    }
}
