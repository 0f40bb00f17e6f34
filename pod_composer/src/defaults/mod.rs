//! The baseline fragment every composition starts from.
//!
//! The builder turns a [`ResourceIdentity`], [`FeatureFlags`] and the
//! [`ComposerSettings`] into the default pod template and configuration
//! document. It cannot fail: absent names or versions are the caller's
//! responsibility.

use std::collections::BTreeMap;

use serde_json::json;

use crate::{
    ComposerSettings, Container, ContainerPort, Contribution, DocValue, HttpGetAction, KeyedList,
    ObjectMeta, PodSpec, PodTemplate, Probe, TargetId, Volume, VolumeMount,
};

/// Label key shared by every workload type.
pub const TYPE_LABEL_KEY: &str = "common.k8s.elastic.co/type";

/// Name, namespace and version of the workload being composed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceIdentity {
    /// Resource name.
    pub name: String,
    /// Namespace the resource lives in.
    pub namespace: String,
    /// Version, used as the image tag.
    pub version: String,
    /// Explicit image; used verbatim instead of `<repository>:<version>`.
    pub image: Option<String>,
}

impl ResourceIdentity {
    /// Identity `name` at `version` in the `default` namespace.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: String::from("default"),
            version: version.into(),
            image: None,
        }
    }

    /// Place the resource in `namespace`.
    #[must_use]
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Use `image` verbatim for the primary container.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Registry target for this identity.
    #[must_use]
    pub fn target(&self) -> TargetId {
        TargetId::new(&self.namespace, &self.name)
    }
}

/// Feature switches that gate add-ons and shape the defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Initialise a keystore from secure settings.
    pub keystore: bool,
    /// Gate collection on holding the leader-election lease.
    pub leader_election: bool,
    /// Deploy the shard-shim and collect cluster-wide metrics locally.
    pub sharded_metrics: bool,
    /// Output the collection job routes to.
    pub output: Option<String>,
}

/// `<repository>:<version>`.
///
/// # Examples
///
/// ```
/// use pod_composer::image_with_version;
/// assert_eq!(image_with_version("someimage", "6.4.2"), "someimage:6.4.2");
/// ```
#[must_use]
pub fn image_with_version(repository: &str, version: &str) -> String {
    format!("{repository}:{version}")
}

/// Produces the default fragment for one workload.
#[derive(Clone, Copy, Debug)]
pub struct DefaultFragmentBuilder<'a> {
    settings: &'a ComposerSettings,
}

impl<'a> DefaultFragmentBuilder<'a> {
    /// Builder reading its tunables from `settings`.
    #[must_use]
    pub const fn new(settings: &'a ComposerSettings) -> Self {
        Self { settings }
    }

    /// Image of the primary container.
    #[must_use]
    pub fn image(&self, identity: &ResourceIdentity) -> String {
        identity.image.clone().unwrap_or_else(|| {
            image_with_version(&self.settings.workload.image_repository, &identity.version)
        })
    }

    /// Identity labels: type, name and version.
    #[must_use]
    pub fn labels(&self, identity: &ResourceIdentity) -> BTreeMap<String, String> {
        let workload = &self.settings.workload;
        BTreeMap::from([
            (
                String::from(TYPE_LABEL_KEY),
                workload.type_label_value.clone(),
            ),
            (workload.name_label_key(), identity.name.clone()),
            (workload.version_label_key(), identity.version.clone()),
        ])
    }

    /// Name of the secret backing the configuration volume.
    #[must_use]
    pub fn config_secret_name(&self, identity: &ResourceIdentity) -> String {
        format!("{}-{}-config", identity.name, self.settings.workload.short_name)
    }

    /// In-cluster address of the workload's HTTP service.
    #[must_use]
    pub fn service_host(&self, identity: &ResourceIdentity) -> String {
        let workload = &self.settings.workload;
        format!(
            "https://{}-{}-http.{}.svc:{}",
            identity.name, workload.short_name, identity.namespace, workload.http_port
        )
    }

    /// The primary container with its probe, port, mount and resources.
    #[must_use]
    pub fn primary_container(&self, identity: &ResourceIdentity) -> Container {
        let workload = &self.settings.workload;
        let mut volume_mounts = KeyedList::new();
        volume_mounts.upsert(
            VolumeMount::new(&workload.config_volume_name, &workload.config_mount_path)
                .read_only(),
        );
        Container {
            image: Some(self.image(identity)),
            ports: vec![ContainerPort::tcp(&workload.port_name, workload.http_port)],
            volume_mounts,
            resources: Some(self.settings.default_resources.clone()),
            readiness_probe: Some(Probe {
                http_get: Some(HttpGetAction {
                    path: workload.readiness_path.clone(),
                    port: workload.http_port,
                    scheme: workload.readiness_scheme,
                }),
                initial_delay_seconds: Some(10),
                period_seconds: Some(10),
                timeout_seconds: Some(5),
                success_threshold: Some(1),
                failure_threshold: Some(3),
                ..Probe::default()
            }),
            ..Container::named(&workload.container_name)
        }
    }

    /// The default pod template.
    #[must_use]
    pub fn pod_template(&self, identity: &ResourceIdentity) -> PodTemplate {
        let mut containers = KeyedList::new();
        containers.upsert(self.primary_container(identity));
        let mut volumes = KeyedList::new();
        volumes.upsert(Volume::secret(
            &self.settings.workload.config_volume_name,
            self.config_secret_name(identity),
        ));
        PodTemplate {
            metadata: ObjectMeta {
                labels: self.labels(identity),
                ..ObjectMeta::default()
            },
            spec: PodSpec {
                containers,
                volumes,
                automount_service_account_token: Some(false),
                ..PodSpec::default()
            },
        }
    }

    /// The default configuration document of the collection job.
    #[must_use]
    pub fn document(&self, identity: &ResourceIdentity, flags: &FeatureFlags) -> DocValue {
        let monitoring = &self.settings.monitoring;
        let module = &self.settings.workload.type_label_value;
        let output = flags.output.as_ref().unwrap_or(&monitoring.default_output);
        json!({
            "module": module,
            "add_metadata": true,
            "hosts": [self.service_host(identity)],
            "period": monitoring.period,
            "use_output": output,
            "data_stream": {
                "dataset": format!("{module}.stack_monitoring"),
                "namespace": identity.namespace,
            },
        })
        .into()
    }

    /// Both halves of the default fragment.
    #[must_use]
    pub fn build(&self, identity: &ResourceIdentity, flags: &FeatureFlags) -> Contribution {
        Contribution {
            pod: self.pod_template(identity),
            document: Some(self.document(identity, flags)),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::Scheme;

    #[fixture]
    fn settings() -> ComposerSettings {
        ComposerSettings::default()
    }

    #[rstest]
    #[case("someimage", "6.4.2", "someimage:6.4.2")]
    #[case("differentimage", "6.4.1", "differentimage:6.4.1")]
    fn image_tag_is_version(#[case] image: &str, #[case] version: &str, #[case] want: &str) {
        assert_eq!(image_with_version(image, version), want);
    }

    #[rstest]
    fn explicit_image_is_used_verbatim(settings: ComposerSettings) {
        let builder = DefaultFragmentBuilder::new(&settings);
        let identity = ResourceIdentity::new("kb", "7.1.0").with_image("my-custom-image:1.0.0");
        assert_eq!(builder.image(&identity), "my-custom-image:1.0.0");
    }

    #[rstest]
    fn pod_template_carries_defaults(settings: ComposerSettings) {
        let builder = DefaultFragmentBuilder::new(&settings);
        let pod = builder.pod_template(&ResourceIdentity::new("kb", "7.1.0"));
        assert_eq!(pod.spec.automount_service_account_token, Some(false));
        assert_eq!(pod.spec.containers.len(), 1);
        assert!(pod.spec.init_containers.is_empty());
        assert_eq!(pod.spec.volumes.len(), 1);
        let container = pod.spec.container("kibana");
        assert_eq!(
            container.and_then(|c| c.image.as_deref()),
            Some("docker.elastic.co/kibana/kibana:7.1.0")
        );
        assert_eq!(container.map(|c| c.volume_mounts.len()), Some(1));
        assert_eq!(
            container
                .and_then(|c| c.readiness_probe.as_ref())
                .and_then(|p| p.http_get.as_ref())
                .map(|get| get.scheme),
            Some(Scheme::Https)
        );
        assert_eq!(
            container.and_then(|c| c.resources.as_ref()),
            Some(&settings.default_resources)
        );
    }

    #[rstest]
    fn document_routes_to_requested_output(settings: ComposerSettings) {
        let builder = DefaultFragmentBuilder::new(&settings);
        let flags = FeatureFlags {
            output: Some(String::from("monitoring-cluster")),
            ..FeatureFlags::default()
        };
        let doc = builder.document(&ResourceIdentity::new("kb", "8.0.0").in_namespace("ops"), &flags);
        assert_eq!(
            doc.get("use_output").and_then(DocValue::as_str),
            Some("monitoring-cluster")
        );
        assert_eq!(
            serde_json::Value::from(doc.get("hosts").cloned().unwrap_or_default()),
            json!(["https://kb-kb-http.ops.svc:5601"])
        );
    }
}
