//! Shorthands for lifting foreign errors into [`ComposeResult`].
//!
//! `into_compose` relies on the `From` conversions of [`ComposeError`]: JSON
//! failures become a malformed override at the fragment root and Figment
//! failures become settings errors. `for_slot` attributes a failure to a
//! named slot instead.
//!
//! # Examples
//!
//! ```
//! use pod_composer::{ComposeResult, ComposeResultExt};
//!
//! fn decode() -> ComposeResult<u16> {
//!     serde_json::from_str("8080").into_compose()
//! }
//! assert_eq!(decode().ok(), Some(8080));
//! ```

use std::sync::Arc;

use crate::{ComposeError, ComposeResult};

/// Generic extension for mapping any `Result<T, E>` with `E: Into<ComposeError>`
/// into a `ComposeResult<T>`.
pub trait ComposeResultExt<T, E> {
    /// Convert `Result<T, E>` into `ComposeResult<T>` using `Into<ComposeError>`.
    ///
    /// # Errors
    ///
    /// Propagates the original error after conversion into `Arc<ComposeError>`.
    fn into_compose(self) -> ComposeResult<T>;
}

impl<T, E> ComposeResultExt<T, E> for Result<T, E>
where
    E: Into<ComposeError>,
{
    fn into_compose(self) -> ComposeResult<T> {
        self.map_err(|e| Arc::new(e.into()))
    }
}

/// Extension tailored to attributing shape failures to a named slot.
pub trait SlotResultExt<T> {
    /// Convert the error into [`ComposeError::MalformedOverride`] for `slot`.
    ///
    /// # Errors
    ///
    /// Returns the malformed-override error wrapped in `Arc` when the input is `Err`.
    fn for_slot(self, slot: &str) -> ComposeResult<T>;
}

impl<T, E> SlotResultExt<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn for_slot(self, slot: &str) -> ComposeResult<T> {
        self.map_err(|e| Arc::new(ComposeError::malformed(slot, e.to_string())))
    }
}
