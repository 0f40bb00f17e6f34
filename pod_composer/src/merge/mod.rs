//! Field merge rules and the trait tying them to fragment types.
//!
//! Each slot of a fragment merges with one of a small set of strategies:
//!
//! | Strategy | Slots | Rule |
//! |----------|-------|------|
//! | replace-if-set | image, command, automount, resources, probes | a set higher value replaces the lower one wholesale |
//! | append | env, ports | layers concatenate in order, duplicates are kept |
//! | map | labels, annotations | keys from the higher layer overwrite |
//! | keyed | containers, init containers, volumes, volume mounts | match by name, merge matches, append the rest |
//! | document | configuration documents | recursive on mappings, leaves replaced |
//!
//! Duplicate env names survive merging. Resolving them (last match wins) is
//! the consumer's job; see [`crate::Container::effective_env`].

pub mod rules;

use std::sync::Arc;

use crate::{ComposeError, ComposeResult, LayerProvenance};

/// Implemented by fragment types that fold a higher-priority layer into
/// themselves.
pub trait LayerMerge {
    /// Merge `higher` over `self` in place.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::ConflictingIdentity`] when a layer that may not
    /// override identity-bearing fields tries to change one.
    fn merge_layer(&mut self, higher: Self, scope: &MergeScope<'_>) -> ComposeResult<()>
    where
        Self: Sized;
}

/// Position of a merge within a fragment, and the layer being merged.
#[derive(Clone, Debug)]
pub struct MergeScope<'a> {
    provenance: &'a LayerProvenance,
    path: String,
}

impl<'a> MergeScope<'a> {
    /// Scope at the root of a fragment contributed by `provenance`.
    #[must_use]
    pub const fn root(provenance: &'a LayerProvenance) -> Self {
        Self {
            provenance,
            path: String::new(),
        }
    }

    /// Descend into a named field.
    #[must_use]
    pub fn field(&self, name: &str) -> Self {
        let path = if self.path.is_empty() {
            name.to_owned()
        } else {
            format!("{}.{name}", self.path)
        };
        Self {
            provenance: self.provenance,
            path,
        }
    }

    /// Descend into a keyed-list entry.
    #[must_use]
    pub fn entry(&self, key: &str) -> Self {
        Self {
            provenance: self.provenance,
            path: format!("{}[{key}]", self.path),
        }
    }

    /// Dotted path of the current slot.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Layer whose values are being merged in.
    #[must_use]
    pub const fn provenance(&self) -> &LayerProvenance {
        self.provenance
    }

    /// Permit replacing identity value `lower` with `higher` only when the
    /// layer is override-capable.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::ConflictingIdentity`] for non-user layers.
    pub fn ensure_replaceable(&self, lower: &str, higher: &str) -> ComposeResult<()> {
        if self.provenance.is_override_capable() {
            return Ok(());
        }
        Err(Arc::new(ComposeError::ConflictingIdentity {
            slot: self.path.clone(),
            lower: lower.to_owned(),
            higher: higher.to_owned(),
        }))
    }
}
