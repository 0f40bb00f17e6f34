//! Builders for identities, requests and user fragments.

use std::collections::BTreeMap;

use pod_composer::{
    ComposeRequest, ComposedSpec, Composer, ComposerSettings, Container, FeatureFlags, KeyedList,
    ObjectMeta, PodSpec, PodTemplate, ResourceIdentity, UserOverride,
};

/// Name used by the canonical test workload.
pub const WORKLOAD_NAME: &str = "kibana-name";
/// Version used by the canonical test workload.
pub const WORKLOAD_VERSION: &str = "7.4.0";

/// The canonical test workload in the `default` namespace.
#[must_use]
pub fn identity() -> ResourceIdentity {
    ResourceIdentity::new(WORKLOAD_NAME, WORKLOAD_VERSION)
}

/// A composer with default settings and the built-in presets.
#[must_use]
pub fn composer() -> Composer {
    Composer::new(ComposerSettings::default())
}

/// A request for the canonical workload with `flags`.
#[must_use]
pub fn request(flags: FeatureFlags) -> ComposeRequest {
    ComposeRequest::new(identity()).with_flags(flags)
}

/// A user fragment carrying only `labels`.
#[must_use]
pub fn labels_override<'a, I>(entries: I) -> UserOverride
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let labels: BTreeMap<String, String> = entries
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect();
    UserOverride::Typed(PodTemplate {
        metadata: ObjectMeta {
            labels,
            ..ObjectMeta::default()
        },
        ..PodTemplate::default()
    })
}

/// A user fragment carrying `containers`, keyed by their names.
///
/// Later containers with a repeated name replace earlier ones.
#[must_use]
pub fn containers_override<I>(containers: I) -> UserOverride
where
    I: IntoIterator<Item = Container>,
{
    let mut list = KeyedList::new();
    for container in containers {
        list.upsert(container);
    }
    UserOverride::Typed(PodTemplate {
        spec: PodSpec {
            containers: list,
            ..PodSpec::default()
        },
        ..PodTemplate::default()
    })
}

/// Serialise the composed pod template for byte-level comparisons.
///
/// # Errors
///
/// Returns an error if serialisation fails.
pub fn pod_json(spec: &ComposedSpec) -> anyhow::Result<String> {
    Ok(serde_json::to_string(&spec.pod)?)
}
