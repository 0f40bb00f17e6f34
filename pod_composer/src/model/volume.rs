//! Volumes and volume mounts.

use serde::{Deserialize, Serialize};

use crate::merge::{LayerMerge, MergeScope, rules};
use crate::{ComposeResult, Keyed};

/// Where a volume is mounted inside a container, keyed by volume `name`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VolumeMount {
    /// Name of the mounted volume; the merge key.
    pub name: String,
    /// Mount path inside the container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_path: Option<String>,
    /// Mount read-only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    /// Sub-path within the volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
}

impl VolumeMount {
    /// A mount with only its name set.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A mount of `name` at `mount_path`.
    #[must_use]
    pub fn new(name: impl Into<String>, mount_path: impl Into<String>) -> Self {
        Self {
            mount_path: Some(mount_path.into()),
            ..Self::named(name)
        }
    }

    /// Mark the mount read-only.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = Some(true);
        self
    }
}

impl Keyed for VolumeMount {
    fn key(&self) -> &str {
        &self.name
    }
}

impl LayerMerge for VolumeMount {
    fn merge_layer(&mut self, higher: Self, _scope: &MergeScope<'_>) -> ComposeResult<()> {
        rules::replace_if_set(&mut self.mount_path, higher.mount_path);
        rules::replace_if_set(&mut self.read_only, higher.read_only);
        rules::replace_if_set(&mut self.sub_path, higher.sub_path);
        Ok(())
    }
}

/// A pod volume, keyed by `name`.
///
/// At most one source field is expected to be set. The source is
/// identity-bearing: a non-user layer may not point an existing volume at a
/// different source.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Volume {
    /// Volume name; the merge key.
    pub name: String,
    /// Secret-backed source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretVolumeSource>,
    /// Config-map-backed source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map: Option<ConfigMapVolumeSource>,
    /// Scratch space living as long as the pod.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_dir: Option<EmptyDirVolumeSource>,
    /// Projected sources such as service-account tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projected: Option<ProjectedVolumeSource>,
}

impl Volume {
    /// A volume with only its name set.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A volume backed by the secret `secret_name`.
    #[must_use]
    pub fn secret(name: impl Into<String>, secret_name: impl Into<String>) -> Self {
        Self {
            secret: Some(SecretVolumeSource {
                secret_name: secret_name.into(),
                optional: None,
            }),
            ..Self::named(name)
        }
    }

    /// An empty-dir volume.
    #[must_use]
    pub fn empty_dir(name: impl Into<String>) -> Self {
        Self {
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Self::named(name)
        }
    }

    /// Returns `true` when any source field is set.
    #[must_use]
    pub const fn has_source(&self) -> bool {
        self.secret.is_some()
            || self.config_map.is_some()
            || self.empty_dir.is_some()
            || self.projected.is_some()
    }

    fn same_source(&self, other: &Self) -> bool {
        self.secret == other.secret
            && self.config_map == other.config_map
            && self.empty_dir == other.empty_dir
            && self.projected == other.projected
    }

    fn describe_source(&self) -> String {
        let Self {
            secret,
            config_map,
            empty_dir,
            projected,
            ..
        } = self;
        if let Some(source) = secret {
            format!("secret/{}", source.secret_name)
        } else if let Some(source) = config_map {
            format!("configMap/{}", source.name)
        } else if empty_dir.is_some() {
            String::from("emptyDir")
        } else if projected.is_some() {
            String::from("projected")
        } else {
            String::from("<none>")
        }
    }
}

impl Keyed for Volume {
    fn key(&self) -> &str {
        &self.name
    }
}

impl LayerMerge for Volume {
    fn merge_layer(&mut self, higher: Self, scope: &MergeScope<'_>) -> ComposeResult<()> {
        if !higher.has_source() {
            return Ok(());
        }
        if self.has_source() && !self.same_source(&higher) {
            scope
                .field("source")
                .ensure_replaceable(&self.describe_source(), &higher.describe_source())?;
        }
        self.secret = higher.secret;
        self.config_map = higher.config_map;
        self.empty_dir = higher.empty_dir;
        self.projected = higher.projected;
        Ok(())
    }
}

/// Secret volume source.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SecretVolumeSource {
    /// Name of the secret.
    pub secret_name: String,
    /// Whether the secret may be absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
}

/// Config-map volume source.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigMapVolumeSource {
    /// Name of the config map.
    pub name: String,
}

/// Empty-dir volume source.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmptyDirVolumeSource {
    /// Storage medium, such as `Memory`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium: Option<String>,
}

/// Projected volume source.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectedVolumeSource {
    /// Projections combined into the volume.
    #[serde(default)]
    pub sources: Vec<VolumeProjection>,
}

/// One projection within a projected volume.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VolumeProjection {
    /// A bound service-account token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_token: Option<ServiceAccountTokenProjection>,
}

/// Service-account token projection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServiceAccountTokenProjection {
    /// File name of the token within the volume.
    pub path: String,
    /// Requested token lifetime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_seconds: Option<u32>,
    /// Intended audience of the token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
}
