//! Layered composition of pod templates and configuration documents.
//!
//! A workload's final specification is built from independently authored
//! fragments: platform defaults, optional add-ons and the user's override.
//! The [`Composer`] folds them in that order, applying per-slot merge rules
//! (see [`merge`]) so the user's intent wins and no layer's contribution is
//! silently dropped. Shared presets required by several add-ons contribute
//! exactly once per target through the [`PresetRegistry`].
//!
//! ```rust
//! use pod_composer::{
//!     ComposeRequest, Composer, ComposerSettings, FeatureFlags, ResourceIdentity, UserOverride,
//! };
//! use serde_json::json;
//!
//! let composer = Composer::new(ComposerSettings::default());
//! let request = ComposeRequest::new(ResourceIdentity::new("kibana-name", "7.4.0"))
//!     .with_flags(FeatureFlags { keystore: true, ..FeatureFlags::default() })
//!     .with_override(UserOverride::from_value(json!({
//!         "metadata": { "labels": { "team": "observability" } }
//!     })));
//! let spec = composer.compose(request)?;
//!
//! assert_eq!(spec.pod.spec.init_containers.len(), 1);
//! assert_eq!(spec.pod.labels().get("team").map(String::as_str), Some("observability"));
//! # Ok::<_, std::sync::Arc<pod_composer::ComposeError>>(())
//! ```

use std::sync::Arc;

mod addons;
mod compose;
mod defaults;
mod document;
mod error;
mod input;
pub mod merge;
mod model;
mod registry;
mod result_ext;
mod settings;

pub use addons::{
    AddonContext, CLUSTER_MONITORING_LABEL, ClusterMonitoringPreset, Contribution,
    KEYSTORE_INIT_CONTAINER, KeystoreAddon, LEADER_CONDITION, LeaderElectionAddon,
    METRICS_PORT_NAME, MONITORING_TOKEN_FILE_ENV, MONITORING_TOKEN_VOLUME, MetricsShardingAddon,
    Preset, PresetCatalog, SECURE_SETTINGS_MOUNT_PATH, SECURE_SETTINGS_VOLUME, keys,
};
pub use compose::{
    ComposeRequest, ComposedSpec, Composer, CompositionReport, FragmentLayer, LayerComposer,
    LayerComposition, LayerProvenance,
};
pub use defaults::{
    DefaultFragmentBuilder, FeatureFlags, ResourceIdentity, TYPE_LABEL_KEY, image_with_version,
};
pub use document::{DocValue, Scalar};
pub use error::{AggregatedErrors, ComposeError};
pub use input::{UserOverride, UserVars};
pub use model::{
    ConfigMapVolumeSource, Container, ContainerPort, DuplicateKey, EmptyDirVolumeSource, EnvVar,
    HttpGetAction, Keyed, KeyedList, ObjectMeta, PodSpec, PodTemplate, Probe, Protocol,
    ProjectedVolumeSource, Quantity, QuantityError, ResourceRequirements, Scheme,
    SecretVolumeSource, ServiceAccountTokenProjection, TcpSocketAction, Volume, VolumeMount,
    VolumeProjection,
};
pub use registry::{PresetKey, PresetRegistry, TargetId};
pub use result_ext::{ComposeResultExt, SlotResultExt};
pub use settings::{
    ComposerSettings, ENV_PREFIX, MonitoringSettings, ShardShimSettings, WorkloadProfile,
};

/// Result alias used throughout composition.
///
/// Errors are shared behind [`Arc`] so failures from several layers can be
/// collected into one [`ComposeError::Aggregate`].
pub type ComposeResult<T> = Result<T, Arc<ComposeError>>;
