//! Trait-based conversions between external error types and `ComposeError`.

use figment::Error as FigmentError;

use super::ComposeError;

/// Shape failures while decoding user input become
/// [`ComposeError::MalformedOverride`] at the fragment root. Callers that know
/// the exact slot should build the error with [`ComposeError::malformed`].
impl From<serde_json::Error> for ComposeError {
    fn from(e: serde_json::Error) -> Self {
        Self::malformed("<root>", e.to_string())
    }
}

impl From<FigmentError> for ComposeError {
    fn from(e: FigmentError) -> Self {
        Self::Settings(e.into())
    }
}

impl From<ComposeError> for FigmentError {
    /// Allow using `?` in tests that return `figment::Error`.
    fn from(e: ComposeError) -> Self {
        match e {
            ComposeError::Settings(fe) => *fe,
            other => Self::from(other.to_string()),
        }
    }
}
