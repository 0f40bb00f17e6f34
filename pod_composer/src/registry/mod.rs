//! Preset keys and the at-most-once application table.
//!
//! Several add-ons may depend on the same shared preset. The
//! [`PresetRegistry`] records which `(target, preset)` pairs have been applied
//! so the preset's contribution lands exactly once per composition, however
//! many dependents ask for it. A registry is an explicit value owned by one
//! composition call; parallel compositions never share one.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{ComposeError, ComposeResult};

/// Stable identifier of a preset.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresetKey(Cow<'static, str>);

impl PresetKey {
    /// A key backed by a string literal.
    #[must_use]
    pub const fn from_static(key: &'static str) -> Self {
        Self(Cow::Borrowed(key))
    }

    /// A key from an owned string.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(Cow::Owned(key.into()))
    }

    /// The key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PresetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for PresetKey {
    fn from(key: &'static str) -> Self {
        Self::from_static(key)
    }
}

/// Identity of the workload a preset is applied to.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetId {
    namespace: String,
    name: String,
}

impl TargetId {
    /// Target `name` in `namespace`.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Namespace of the target.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Name of the target.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Table of known preset keys and the pairs already applied.
///
/// # Examples
///
/// ```
/// use pod_composer::{PresetKey, PresetRegistry, TargetId};
///
/// let monitoring = PresetKey::from_static("cluster-monitoring");
/// let mut registry = PresetRegistry::new([monitoring.clone()]);
/// let target = TargetId::new("default", "kibana");
/// let mut runs = 0;
/// for _ in 0..3 {
///     registry.apply_once(&target, &monitoring, || {
///         runs += 1;
///         Ok(())
///     })?;
/// }
/// assert_eq!(runs, 1);
/// # Ok::<_, std::sync::Arc<pod_composer::ComposeError>>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct PresetRegistry {
    known: BTreeSet<PresetKey>,
    applied: BTreeSet<(TargetId, PresetKey)>,
}

impl PresetRegistry {
    /// A registry that recognises `known` keys and has applied nothing.
    #[must_use]
    pub fn new<I>(known: I) -> Self
    where
        I: IntoIterator<Item = PresetKey>,
    {
        Self {
            known: known.into_iter().collect(),
            applied: BTreeSet::new(),
        }
    }

    /// Returns `true` when `key` has a definition.
    #[must_use]
    pub fn is_known(&self, key: &PresetKey) -> bool {
        self.known.contains(key)
    }

    /// Returns `true` when `key` has already been applied to `target`.
    #[must_use]
    pub fn is_applied(&self, target: &TargetId, key: &PresetKey) -> bool {
        self.applied.contains(&(target.clone(), key.clone()))
    }

    /// Run `apply` unless `key` was already applied to `target`.
    ///
    /// Returns `Ok(true)` when `apply` ran and succeeded, `Ok(false)` when the
    /// pair was already applied. A failed `apply` leaves the pair unmarked.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::UnknownPresetKey`] for keys without a
    /// definition, or the error produced by `apply`.
    pub fn apply_once<F>(&mut self, target: &TargetId, key: &PresetKey, apply: F) -> ComposeResult<bool>
    where
        F: FnOnce() -> ComposeResult<()>,
    {
        if !self.is_known(key) {
            return Err(Arc::new(ComposeError::unknown_preset(key.as_str())));
        }
        if self.is_applied(target, key) {
            trace!(workload = %target, preset = %key, "preset already applied; skipping");
            return Ok(false);
        }
        apply()?;
        self.applied.insert((target.clone(), key.clone()));
        Ok(true)
    }

    /// Forget every applied pair; known keys are kept.
    pub fn clear_applied(&mut self) {
        self.applied.clear();
    }

    /// Iterate over applied pairs in key order.
    pub fn applied(&self) -> impl Iterator<Item = (&TargetId, &PresetKey)> {
        self.applied.iter().map(|(target, key)| (target, key))
    }
}
