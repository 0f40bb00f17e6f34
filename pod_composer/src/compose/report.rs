//! Audit trail of one composition.

use crate::{LayerProvenance, PresetKey, TargetId};

/// Which layers contributed to a composed specification, in merge order.
///
/// # Examples
///
/// ```rust
/// use pod_composer::{CompositionReport, LayerProvenance, PresetKey, TargetId};
///
/// let mut report = CompositionReport::new(TargetId::new("default", "kb"));
/// report
///     .record(LayerProvenance::Defaults)
///     .record(LayerProvenance::Addon(PresetKey::from_static("keystore")));
///
/// assert_eq!(report.layers().len(), 2);
/// assert!(report.was_applied(&PresetKey::from_static("keystore")));
/// assert!(!report.has_user_layer());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositionReport {
    target: TargetId,
    layers: Vec<LayerProvenance>,
}

impl CompositionReport {
    /// An empty report for `target`.
    #[must_use]
    pub const fn new(target: TargetId) -> Self {
        Self {
            target,
            layers: Vec::new(),
        }
    }

    /// Record that a layer was folded.
    pub fn record(&mut self, provenance: LayerProvenance) -> &mut Self {
        self.layers.push(provenance);
        self
    }

    /// The workload the report describes.
    #[must_use]
    pub const fn target(&self) -> &TargetId {
        &self.target
    }

    /// Provenance of every folded layer, in merge order.
    #[must_use]
    pub fn layers(&self) -> &[LayerProvenance] {
        &self.layers
    }

    /// Keys of presets folded in this composition, in merge order.
    pub fn applied_presets(&self) -> impl Iterator<Item = &PresetKey> {
        self.layers.iter().filter_map(|layer| match layer {
            LayerProvenance::Addon(key) => Some(key),
            LayerProvenance::Defaults | LayerProvenance::User => None,
        })
    }

    /// Whether preset `key` was folded in this composition.
    #[must_use]
    pub fn was_applied(&self, key: &PresetKey) -> bool {
        self.applied_presets().any(|applied| applied == key)
    }

    /// Whether a user layer was folded.
    #[must_use]
    pub fn has_user_layer(&self) -> bool {
        self.layers.contains(&LayerProvenance::User)
    }
}
