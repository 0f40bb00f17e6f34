//! Optional fragment contributors and the shared presets they rely on.
//!
//! Every contributor is a [`Preset`]: a named, idempotent bundle of pod
//! template and configuration-document contributions. Add-ons additionally
//! gate themselves on [`FeatureFlags`]; shared presets are only applied when
//! an active add-on requires them (or the caller selects them by key).
//!
//! The built-in catalog runs in this fixed order, so later entries can
//! override earlier contributions through the ordinary merge rules:
//!
//! 1. [`keys::KEYSTORE`]
//! 2. [`keys::LEADER_ELECTION`] (requires [`keys::CLUSTER_MONITORING`])
//! 3. [`keys::METRICS_SHARDING`] (requires [`keys::CLUSTER_MONITORING`])
//! 4. [`keys::CLUSTER_MONITORING`]

mod keystore;
mod leader_election;
mod monitoring;
mod sharding;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

pub use keystore::{
    KEYSTORE_INIT_CONTAINER, KeystoreAddon, SECURE_SETTINGS_MOUNT_PATH, SECURE_SETTINGS_VOLUME,
};
pub use leader_election::{LEADER_CONDITION, LeaderElectionAddon};
pub use monitoring::{
    CLUSTER_MONITORING_LABEL, ClusterMonitoringPreset, MONITORING_TOKEN_FILE_ENV,
    MONITORING_TOKEN_VOLUME,
};
pub use sharding::{METRICS_PORT_NAME, MetricsShardingAddon};

use crate::{
    ComposeResult, ComposerSettings, DocValue, FeatureFlags, PodTemplate, PresetKey,
    PresetRegistry, ResourceIdentity,
};

/// Keys of the built-in presets.
pub mod keys {
    use crate::PresetKey;

    /// Keystore initialisation add-on.
    pub const KEYSTORE: PresetKey = PresetKey::from_static("keystore");
    /// Leader-election gating add-on.
    pub const LEADER_ELECTION: PresetKey = PresetKey::from_static("leader-election");
    /// Metrics-sharding add-on.
    pub const METRICS_SHARDING: PresetKey = PresetKey::from_static("metrics-sharding");
    /// Shared cluster-wide monitoring preset.
    pub const CLUSTER_MONITORING: PresetKey = PresetKey::from_static("cluster-monitoring");
}

/// What one layer adds: a pod template fragment and optional document edits.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Contribution {
    /// Pod template fragment.
    pub pod: PodTemplate,
    /// Configuration document edits.
    pub document: Option<DocValue>,
}

/// Inputs available to presets while contributing.
#[derive(Clone, Copy, Debug)]
pub struct AddonContext<'a> {
    /// Workload being composed.
    pub identity: &'a ResourceIdentity,
    /// Feature switches of the request.
    pub flags: &'a FeatureFlags,
    /// Active composer settings.
    pub settings: &'a ComposerSettings,
}

/// A named, idempotent contributor.
pub trait Preset: fmt::Debug + Send + Sync {
    /// Stable key of the preset.
    fn key(&self) -> PresetKey;

    /// Shared presets that must be applied before this one.
    fn requires(&self) -> Vec<PresetKey> {
        Vec::new()
    }

    /// Whether `flags` activate this preset without explicit selection.
    fn is_active(&self, _flags: &FeatureFlags) -> bool {
        false
    }

    /// Produce the contribution.
    ///
    /// # Errors
    ///
    /// Implementations return an error when their contribution cannot be
    /// built for this context.
    fn contribute(&self, ctx: &AddonContext<'_>) -> ComposeResult<Contribution>;
}

/// Ordered set of presets available to a composer.
#[derive(Clone, Default)]
pub struct PresetCatalog {
    presets: IndexMap<PresetKey, Arc<dyn Preset>>,
}

impl PresetCatalog {
    /// A catalog with no presets.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in presets in their documented order.
    #[must_use]
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        catalog.register(KeystoreAddon);
        catalog.register(LeaderElectionAddon);
        catalog.register(MetricsShardingAddon);
        catalog.register(ClusterMonitoringPreset);
        catalog
    }

    /// Add `preset` at the end, or replace the preset with the same key in
    /// place. Returns the replaced preset.
    pub fn register<P>(&mut self, preset: P) -> Option<Arc<dyn Preset>>
    where
        P: Preset + 'static,
    {
        self.presets.insert(preset.key(), Arc::new(preset))
    }

    /// Look up a preset by key.
    #[must_use]
    pub fn get(&self, key: &PresetKey) -> Option<&Arc<dyn Preset>> {
        self.presets.get(key)
    }

    /// Iterate over presets in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Preset>> {
        self.presets.values()
    }

    /// A fresh registry recognising every key in this catalog.
    #[must_use]
    pub fn registry(&self) -> PresetRegistry {
        PresetRegistry::new(self.presets.keys().cloned())
    }
}

impl fmt::Debug for PresetCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.presets.keys()).finish()
    }
}
