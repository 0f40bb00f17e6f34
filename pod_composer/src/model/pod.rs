//! Pod template fragments.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::merge::{LayerMerge, MergeScope, rules};
use crate::{ComposeResult, Container, KeyedList, Volume};

/// A pod template fragment.
///
/// The same type carries every layer's contribution and the final composed
/// template; absent slots mean "inherit".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PodTemplate {
    /// Labels and annotations.
    #[serde(default, skip_serializing_if = "ObjectMeta::is_empty")]
    pub metadata: ObjectMeta,
    /// Pod specification slots.
    #[serde(default)]
    pub spec: PodSpec,
}

impl PodTemplate {
    /// Labels of the template.
    #[must_use]
    pub const fn labels(&self) -> &BTreeMap<String, String> {
        &self.metadata.labels
    }
}

impl LayerMerge for PodTemplate {
    fn merge_layer(&mut self, higher: Self, scope: &MergeScope<'_>) -> ComposeResult<()> {
        self.metadata.merge_layer(higher.metadata, &scope.field("metadata"))?;
        self.spec.merge_layer(higher.spec, &scope.field("spec"))
    }
}

/// Map-valued metadata slots.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ObjectMeta {
    /// Labels; higher layers overwrite shared keys.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Annotations; higher layers overwrite shared keys.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl ObjectMeta {
    /// Returns `true` when no labels or annotations are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() && self.annotations.is_empty()
    }
}

impl LayerMerge for ObjectMeta {
    fn merge_layer(&mut self, higher: Self, _scope: &MergeScope<'_>) -> ComposeResult<()> {
        rules::merge_map(&mut self.labels, higher.labels);
        rules::merge_map(&mut self.annotations, higher.annotations);
        Ok(())
    }
}

/// Pod-level slots.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PodSpec {
    /// Init containers, merged by name.
    #[serde(default, skip_serializing_if = "KeyedList::is_empty")]
    pub init_containers: KeyedList<Container>,
    /// Application containers, merged by name.
    #[serde(default, skip_serializing_if = "KeyedList::is_empty")]
    pub containers: KeyedList<Container>,
    /// Volumes, merged by name.
    #[serde(default, skip_serializing_if = "KeyedList::is_empty")]
    pub volumes: KeyedList<Volume>,
    /// Whether the service-account token is mounted automatically.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automount_service_account_token: Option<bool>,
    /// Service account the pod runs as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
}

impl PodSpec {
    /// Look up an application container by name.
    #[must_use]
    pub fn container(&self, name: &str) -> Option<&Container> {
        self.containers.get(name)
    }

    /// Look up an init container by name.
    #[must_use]
    pub fn init_container(&self, name: &str) -> Option<&Container> {
        self.init_containers.get(name)
    }
}

impl LayerMerge for PodSpec {
    fn merge_layer(&mut self, higher: Self, scope: &MergeScope<'_>) -> ComposeResult<()> {
        let Self {
            init_containers,
            containers,
            volumes,
            automount_service_account_token,
            service_account_name,
        } = higher;
        rules::merge_keyed(
            &mut self.init_containers,
            init_containers,
            &scope.field("initContainers"),
        )?;
        rules::merge_keyed(&mut self.containers, containers, &scope.field("containers"))?;
        rules::merge_keyed(&mut self.volumes, volumes, &scope.field("volumes"))?;
        rules::replace_if_set(
            &mut self.automount_service_account_token,
            automount_service_account_token,
        );
        rules::replace_if_set(&mut self.service_account_name, service_account_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{Result, ensure};
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::LayerProvenance;

    #[rstest]
    fn decodes_platform_shaped_json() -> Result<(), serde_json::Error> {
        let pod: PodTemplate = serde_json::from_value(json!({
            "metadata": { "labels": { "tier": "web" } },
            "spec": {
                "containers": [{
                    "name": "kibana",
                    "resources": { "limits": { "memory": "3Gi" } },
                    "volumeMounts": [{ "name": "data", "mountPath": "/data" }]
                }],
                "volumes": [{ "name": "data", "emptyDir": {} }],
                "automountServiceAccountToken": true
            }
        }))?;
        assert_eq!(pod.labels().get("tier").map(String::as_str), Some("web"));
        assert_eq!(pod.spec.automount_service_account_token, Some(true));
        let container = pod.spec.container("kibana");
        assert_eq!(container.map(|c| c.volume_mounts.len()), Some(1));
        Ok(())
    }

    #[rstest]
    fn unknown_fields_are_rejected() {
        let result = serde_json::from_value::<PodTemplate>(json!({
            "spec": { "nodeName": "worker-1" }
        }));
        assert!(result.is_err());
    }

    #[rstest]
    fn labels_overwrite_by_key() -> Result<()> {
        let provenance = LayerProvenance::User;
        let mut pod = PodTemplate {
            metadata: ObjectMeta {
                labels: BTreeMap::from([
                    (String::from("name"), String::from("kb")),
                    (String::from("version"), String::from("7.4.0")),
                ]),
                ..ObjectMeta::default()
            },
            ..PodTemplate::default()
        };
        let higher = PodTemplate {
            metadata: ObjectMeta {
                labels: BTreeMap::from([(String::from("name"), String::from("renamed"))]),
                ..ObjectMeta::default()
            },
            ..PodTemplate::default()
        };
        pod.merge_layer(higher, &MergeScope::root(&provenance))?;
        ensure!(
            pod.labels().get("name").map(String::as_str) == Some("renamed"),
            "higher label should win"
        );
        ensure!(
            pod.labels().get("version").map(String::as_str) == Some("7.4.0"),
            "untouched label should remain"
        );
        Ok(())
    }
}
