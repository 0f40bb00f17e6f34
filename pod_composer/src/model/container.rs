//! Container slots and their merge behaviour.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::merge::{LayerMerge, MergeScope, rules};
use crate::{ComposeResult, Keyed, KeyedList, Quantity, VolumeMount};

/// A container entry, keyed by `name`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Container {
    /// Merge key; unique within a pod's containers.
    pub name: String,
    /// Image reference. Identity-bearing: only the user layer may change it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Entrypoint, replaced as a whole when a layer sets it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    /// Environment variables, appended across layers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    /// Exposed ports, appended across layers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<ContainerPort>,
    /// Volume mounts, merged by name.
    #[serde(default, skip_serializing_if = "KeyedList::is_empty")]
    pub volume_mounts: KeyedList<VolumeMount>,
    /// Resource block, replaced atomically.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
    /// Readiness probe, replaced atomically.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness_probe: Option<Probe>,
}

impl Container {
    /// A container with only its name set.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Resolve environment variables the way the runtime reads them: for a
    /// repeated name, the last entry wins. Order follows first appearance.
    ///
    /// # Examples
    ///
    /// ```
    /// use pod_composer::{Container, EnvVar};
    ///
    /// let container = Container {
    ///     env: vec![EnvVar::new("MODE", "a"), EnvVar::new("LEVEL", "1"), EnvVar::new("MODE", "b")],
    ///     ..Container::named("app")
    /// };
    /// let effective = container.effective_env();
    /// assert_eq!(effective, [("MODE", Some("b")), ("LEVEL", Some("1"))]);
    /// ```
    #[must_use]
    pub fn effective_env(&self) -> Vec<(&str, Option<&str>)> {
        let mut resolved: indexmap::IndexMap<&str, Option<&str>> = indexmap::IndexMap::new();
        for var in &self.env {
            resolved.insert(var.name.as_str(), var.value.as_deref());
        }
        resolved.into_iter().collect()
    }
}

impl Keyed for Container {
    fn key(&self) -> &str {
        &self.name
    }
}

impl LayerMerge for Container {
    fn merge_layer(&mut self, higher: Self, scope: &MergeScope<'_>) -> ComposeResult<()> {
        let Self {
            image,
            command,
            env,
            ports,
            volume_mounts,
            resources,
            readiness_probe,
            ..
        } = higher;
        rules::replace_identity(&mut self.image, image, &scope.field("image"))?;
        rules::replace_if_nonempty(&mut self.command, command);
        rules::append(&mut self.env, env);
        rules::append(&mut self.ports, ports);
        rules::merge_keyed(
            &mut self.volume_mounts,
            volume_mounts,
            &scope.field("volumeMounts"),
        )?;
        rules::replace_if(&mut self.resources, resources, ResourceRequirements::is_set);
        rules::replace_if_set(&mut self.readiness_probe, readiness_probe);
        Ok(())
    }
}

/// A single environment variable. Names may repeat across layers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EnvVar {
    /// Variable name.
    pub name: String,
    /// Literal value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl EnvVar {
    /// A variable with a literal value.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// Transport protocol of a container port.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    /// TCP (the platform default).
    #[default]
    Tcp,
    /// UDP.
    Udp,
    /// SCTP.
    Sctp,
}

/// A port exposed by a container.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContainerPort {
    /// Optional port name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Port number inside the container.
    pub container_port: u16,
    /// Transport protocol.
    #[serde(default)]
    pub protocol: Protocol,
}

impl ContainerPort {
    /// A named TCP port.
    #[must_use]
    pub fn tcp(name: impl Into<String>, container_port: u16) -> Self {
        Self {
            name: Some(name.into()),
            container_port,
            protocol: Protocol::Tcp,
        }
    }
}

/// Compute resources, merged as one unit.
///
/// A block with both maps empty counts as unset so a lower layer's block is
/// inherited.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResourceRequirements {
    /// Hard limits by resource name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<String, Quantity>,
    /// Requested amounts by resource name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<String, Quantity>,
}

impl ResourceRequirements {
    /// Returns `true` when either map carries an entry.
    #[must_use]
    pub fn is_set(&self) -> bool {
        !(self.limits.is_empty() && self.requests.is_empty())
    }
}

/// Container health probe, replaced atomically.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Probe {
    /// HTTP GET check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_get: Option<HttpGetAction>,
    /// TCP connect check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_socket: Option<TcpSocketAction>,
    /// Seconds before the first check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_delay_seconds: Option<u32>,
    /// Seconds between checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_seconds: Option<u32>,
    /// Seconds before a check times out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u32>,
    /// Consecutive successes required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_threshold: Option<u32>,
    /// Consecutive failures tolerated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_threshold: Option<u32>,
}

/// URI scheme for HTTP probes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Scheme {
    /// Plain HTTP.
    #[default]
    Http,
    /// HTTP over TLS.
    Https,
}

/// HTTP GET probe target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HttpGetAction {
    /// Request path.
    pub path: String,
    /// Target port.
    pub port: u16,
    /// URI scheme.
    #[serde(default)]
    pub scheme: Scheme,
}

/// TCP probe target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TcpSocketAction {
    /// Target port.
    pub port: u16,
}
