//! Primary error enum for composition flows.

use figment::Error as FigmentError;
use thiserror::Error;

use super::aggregate::AggregatedErrors;

/// Errors that can occur while composing a workload specification.
///
/// Every error is local to a single composition call; the preset scope used
/// by that call is discarded when one is returned.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ComposeError {
    /// A user-supplied slot could not be interpreted under its expected shape.
    #[error("Malformed override for '{slot}': {message}")]
    MalformedOverride {
        /// Path of the offending slot, for example `spec.containers[kibana].resources`.
        slot: String,
        /// Human-readable explanation of the shape failure.
        message: String,
    },

    /// A preset key was requested that no registered preset provides.
    #[error("Unknown preset key '{key}'")]
    UnknownPresetKey {
        /// The unresolved preset key.
        key: String,
    },

    /// Two non-overriding layers claimed the same keyed entry with different
    /// identity-bearing values.
    #[error("Conflicting identity for '{slot}': '{lower}' cannot be replaced by '{higher}'")]
    ConflictingIdentity {
        /// Path of the keyed entry field in conflict.
        slot: String,
        /// Value contributed by the lower-priority layer.
        lower: String,
        /// Value contributed by the higher-priority layer.
        higher: String,
    },

    /// Composer settings could not be gathered or extracted.
    #[error("Failed to load composer settings: {0}")]
    Settings(#[from] Box<FigmentError>),

    /// Composer settings were extracted but are unusable.
    #[error("Invalid setting '{key}': {message}")]
    InvalidSettings {
        /// Settings key that failed validation.
        key: String,
        /// Human-readable explanation of the validation failure.
        message: String,
    },

    /// Multiple errors occurred while composing a single target.
    #[error("{0}")]
    Aggregate(Box<AggregatedErrors>),
}
