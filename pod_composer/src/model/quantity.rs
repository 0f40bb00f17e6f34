//! Validated resource quantities.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const SUFFIXES: &[&str] = &[
    "", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "n", "u", "m", "k", "M", "G", "T", "P", "E",
];

/// Failure to interpret a string as a resource quantity.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("`{input}` is not a valid quantity: {reason}")]
pub struct QuantityError {
    input: String,
    reason: &'static str,
}

/// A resource amount such as `500m`, `1Gi` or `2e3`.
///
/// The original spelling is preserved; quantities are compared textually.
///
/// # Examples
///
/// ```
/// use pod_composer::Quantity;
///
/// let memory: Quantity = "3Gi".parse()?;
/// assert_eq!(memory.as_str(), "3Gi");
/// assert!("three gigs".parse::<Quantity>().is_err());
/// # Ok::<_, pod_composer::QuantityError>(())
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Quantity(String);

impl Quantity {
    /// Parse and validate `input`.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError`] when `input` is not `<number><suffix>`.
    pub fn parse(input: &str) -> Result<Self, QuantityError> {
        let fail = |reason| QuantityError {
            input: input.to_owned(),
            reason,
        };
        if input.is_empty() {
            return Err(fail("quantity is empty"));
        }
        let unsigned = input.strip_prefix(['+', '-']).unwrap_or(input);
        let split = unsigned
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(unsigned.len());
        let (number, suffix) = unsigned.split_at(split);
        if !number.chars().any(|c| c.is_ascii_digit()) {
            return Err(fail("missing numeric part"));
        }
        if number.matches('.').count() > 1 {
            return Err(fail("more than one decimal point"));
        }
        if !(SUFFIXES.contains(&suffix) || is_exponent(suffix)) {
            return Err(fail("unknown suffix"));
        }
        Ok(Self(input.to_owned()))
    }

    /// Built-in defaults are known to be well formed.
    pub(crate) fn from_static(input: &'static str) -> Self {
        Self(input.to_owned())
    }

    /// The quantity as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_exponent(suffix: &str) -> bool {
    suffix
        .strip_prefix(['e', 'E'])
        .map(|rest| rest.strip_prefix(['+', '-']).unwrap_or(rest))
        .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Quantity {
    type Error = QuantityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Quantity> for String {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
