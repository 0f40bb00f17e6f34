//! Tunables for the default fragment builder and the built-in add-ons.
//!
//! Settings are gathered with Figment from three layers, lowest precedence
//! first: the compiled-in defaults, an optional TOML file, and environment
//! variables prefixed with [`ENV_PREFIX`]. Nested keys are separated by a
//! double underscore, so `POD_COMPOSER_WORKLOAD__HTTP_PORT=8443` overrides
//! `workload.http_port`.

use std::collections::BTreeMap;
use std::sync::Arc;

use camino::Utf8Path;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    ComposeError, ComposeResult, ComposeResultExt, Quantity, ResourceRequirements, Scheme,
};

/// Prefix of environment variables read by [`ComposerSettings::load`].
pub const ENV_PREFIX: &str = "POD_COMPOSER_";

/// All tunables consumed while composing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComposerSettings {
    /// Shape of the primary workload.
    pub workload: WorkloadProfile,
    /// Resource block given to the primary container.
    pub default_resources: ResourceRequirements,
    /// Sidecar deployed by the metrics-sharding add-on.
    pub shard_shim: ShardShimSettings,
    /// Collection job defaults.
    pub monitoring: MonitoringSettings,
}

impl Default for ComposerSettings {
    fn default() -> Self {
        let memory = || BTreeMap::from([(String::from("memory"), Quantity::from_static("1Gi"))]);
        Self {
            workload: WorkloadProfile::default(),
            default_resources: ResourceRequirements {
                limits: memory(),
                requests: memory(),
            },
            shard_shim: ShardShimSettings::default(),
            monitoring: MonitoringSettings::default(),
        }
    }
}

/// Describes the primary workload's container, labels and config volume.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkloadProfile {
    /// Name of the primary container.
    pub container_name: String,
    /// Abbreviation used in generated resource names, e.g. `<name>-kb-http`.
    pub short_name: String,
    /// Image repository; the version is appended as the tag.
    pub image_repository: String,
    /// HTTP port served by the workload.
    pub http_port: u16,
    /// Name of the HTTP port.
    pub port_name: String,
    /// Scheme of the readiness check.
    pub readiness_scheme: Scheme,
    /// Path of the readiness check.
    pub readiness_path: String,
    /// Name of the configuration volume.
    pub config_volume_name: String,
    /// Mount path of the configuration volume.
    pub config_mount_path: String,
    /// Domain prefixing workload-specific label keys.
    pub label_domain: String,
    /// Value of the shared type label.
    pub type_label_value: String,
}

impl Default for WorkloadProfile {
    fn default() -> Self {
        Self {
            container_name: String::from("kibana"),
            short_name: String::from("kb"),
            image_repository: String::from("docker.elastic.co/kibana/kibana"),
            http_port: 5601,
            port_name: String::from("https"),
            readiness_scheme: Scheme::Https,
            readiness_path: String::from("/login"),
            config_volume_name: String::from("elastic-internal-kibana-config"),
            config_mount_path: String::from("/usr/share/kibana/config"),
            label_domain: String::from("kibana.k8s.elastic.co"),
            type_label_value: String::from("kibana"),
        }
    }
}

impl WorkloadProfile {
    /// Label key carrying the workload name.
    #[must_use]
    pub fn name_label_key(&self) -> String {
        format!("{}/name", self.label_domain)
    }

    /// Label key carrying the workload version.
    #[must_use]
    pub fn version_label_key(&self) -> String {
        format!("{}/version", self.label_domain)
    }
}

/// Shard-shim sidecar settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShardShimSettings {
    /// Container name of the sidecar.
    pub container_name: String,
    /// Image of the sidecar.
    pub image: String,
    /// Port the sidecar serves metrics on.
    pub port: u16,
}

impl Default for ShardShimSettings {
    fn default() -> Self {
        Self {
            container_name: String::from("kube-state-metrics"),
            image: String::from("registry.k8s.io/kube-state-metrics/kube-state-metrics:v2.10.0"),
            port: 8080,
        }
    }
}

/// Collection job settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitoringSettings {
    /// Default collection period.
    pub period: String,
    /// Directory the monitoring token is projected into.
    pub token_dir: String,
    /// Lifetime of the projected token.
    pub token_expiration_seconds: u32,
    /// Output used when the caller names none.
    pub default_output: String,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            period: String::from("10s"),
            token_dir: String::from("/var/run/secrets/elastic.co/monitoring"),
            token_expiration_seconds: 3600,
            default_output: String::from("default"),
        }
    }
}

impl MonitoringSettings {
    /// Path of the projected token file.
    #[must_use]
    pub fn token_file(&self) -> String {
        format!("{}/token", self.token_dir.trim_end_matches('/'))
    }
}

impl ComposerSettings {
    /// Gather settings from defaults, the optional TOML file at `path`, and
    /// the environment.
    ///
    /// A missing file contributes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::Settings`] when a layer cannot be extracted, or
    /// [`ComposeError::InvalidSettings`] when validation fails.
    pub fn load(path: Option<&Utf8Path>) -> ComposeResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = path {
            debug!(path = %file, "reading composer settings file");
            figment = figment.merge(Toml::file(file.as_std_path()));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(&figment)
    }

    /// Extract and validate settings from a prepared Figment.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::Settings`] on extraction failure or
    /// [`ComposeError::InvalidSettings`] when validation fails.
    pub fn from_figment(figment: &Figment) -> ComposeResult<Self> {
        let settings: Self = figment.extract().into_compose()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings that would produce unusable fragments.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidSettings`] naming the first bad key.
    pub fn validate(&self) -> ComposeResult<()> {
        let required = [
            ("workload.container_name", &self.workload.container_name),
            ("workload.short_name", &self.workload.short_name),
            ("workload.image_repository", &self.workload.image_repository),
            ("workload.label_domain", &self.workload.label_domain),
            ("shard_shim.container_name", &self.shard_shim.container_name),
            ("shard_shim.image", &self.shard_shim.image),
        ];
        if let Some((key, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(Arc::new(ComposeError::invalid_setting(*key, "must not be empty")));
        }
        if self.shard_shim.container_name == self.workload.container_name {
            return Err(Arc::new(ComposeError::invalid_setting(
                "shard_shim.container_name",
                "must differ from workload.container_name",
            )));
        }
        if !self.default_resources.is_set() {
            return Err(Arc::new(ComposeError::invalid_setting(
                "default_resources",
                "must set limits or requests",
            )));
        }
        if self.workload.http_port == 0 || self.shard_shim.port == 0 {
            return Err(Arc::new(ComposeError::invalid_setting(
                "port",
                "ports must be non-zero",
            )));
        }
        Ok(())
    }
}
