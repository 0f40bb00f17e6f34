//! Helpers for exercising composer settings inside a `figment::Jail`.
//!
//! A jail gives each test a private working directory and environment, so
//! settings files and `POD_COMPOSER_` variables never leak between tests.

use anyhow::{Result, anyhow};
use camino::Utf8Path;
use pod_composer::ComposerSettings;

/// Executes `f` inside a [`figment::Jail`], returning the closure's output.
///
/// # Errors
///
/// Returns an error if the jail initialisation fails or the closure returns a
/// [`figment::error::Error`].
pub fn with_jail<F, T>(f: F) -> Result<T>
where
    F: FnOnce(&mut figment::Jail) -> figment::error::Result<T>,
{
    let mut output = None;
    figment::Jail::try_with(|j| {
        output = Some(f(j)?);
        Ok(())
    })
    .map_err(|err| anyhow!(err.to_string()))?;
    output.ok_or_else(|| anyhow!("jail closure did not return a value"))
}

/// Load settings from the jail's environment and, when given, the TOML file
/// at `path` relative to the jail directory.
///
/// # Errors
///
/// Returns the composer's error converted into a [`figment::Error`].
pub fn load_settings(path: Option<&str>) -> figment::error::Result<ComposerSettings> {
    ComposerSettings::load(path.map(Utf8Path::new)).map_err(figment_error)
}

/// Converts any error implementing [`ToString`] into a [`figment::Error`].
#[expect(
    clippy::needless_pass_by_value,
    reason = "callers often own the error and passing by value avoids extra clones"
)]
pub fn figment_error<E: ToString>(err: E) -> figment::Error {
    figment::Error::from(err.to_string())
}
