//! User override coverage: labels, resources, init containers, env and
//! volumes supplied by the end user, plus malformed input.

use std::collections::BTreeMap;

use anyhow::{Context, Result, ensure};
use pod_composer::{
    ComposeError, Composer, Container, EnvVar, FeatureFlags, KEYSTORE_INIT_CONTAINER, KeyedList,
    PodSpec, PodTemplate, Quantity, ResourceRequirements, UserOverride, UserVars, Volume,
    VolumeMount,
};
use rstest::{fixture, rstest};
use serde_json::json;
use test_helpers::fragments;

#[fixture]
fn composer() -> Composer {
    fragments::composer()
}

fn compose_with_override(composer: &Composer, user: UserOverride) -> Result<PodTemplate> {
    let spec = composer.compose(fragments::request(FeatureFlags::default()).with_override(user))?;
    Ok(spec.pod)
}

#[rstest]
fn user_labels_overwrite_identity_labels(composer: Composer) -> Result<()> {
    let user = fragments::labels_override([
        ("label1", "value1"),
        ("label2", "value2"),
        ("kibana.k8s.elastic.co/name", "overridden-kibana-name"),
    ]);
    let pod = compose_with_override(&composer, user)?;
    let labels = pod.labels();
    let expected: BTreeMap<String, String> = [
        ("common.k8s.elastic.co/type", "kibana"),
        ("kibana.k8s.elastic.co/name", "overridden-kibana-name"),
        ("kibana.k8s.elastic.co/version", "7.4.0"),
        ("label1", "value1"),
        ("label2", "value2"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v.to_owned()))
    .collect();
    ensure!(*labels == expected, "unexpected labels {labels:?}");
    Ok(())
}

#[rstest]
fn user_resources_replace_defaults_atomically(composer: Composer) -> Result<()> {
    let resources = ResourceRequirements {
        limits: BTreeMap::from([(String::from("memory"), Quantity::parse("3Gi")?)]),
        requests: BTreeMap::new(),
    };
    let user = fragments::containers_override([Container {
        resources: Some(resources.clone()),
        ..Container::named("kibana")
    }]);
    let pod = compose_with_override(&composer, user)?;
    let merged = pod.spec.container("kibana").and_then(|c| c.resources.clone());
    ensure!(
        merged == Some(resources),
        "default requests must not leak into a user block, got {merged:?}"
    );
    Ok(())
}

#[rstest]
fn user_init_containers_are_appended(composer: Composer) -> Result<()> {
    let mut init_containers = KeyedList::new();
    init_containers.upsert(Container {
        image: Some(String::from("my-image")),
        ..Container::named("user-init-container")
    });
    let user = UserOverride::Typed(PodTemplate {
        spec: PodSpec {
            init_containers,
            ..PodSpec::default()
        },
        ..PodTemplate::default()
    });
    let spec = composer.compose(
        fragments::request(FeatureFlags {
            keystore: true,
            ..FeatureFlags::default()
        })
        .with_override(user),
    )?;
    let names: Vec<&str> = spec.pod.spec.init_containers.keys().collect();
    ensure!(
        names == ["elastic-internal-init-keystore", "user-init-container"],
        "unexpected init containers {names:?}"
    );
    Ok(())
}

#[rstest]
fn keystore_init_container_follows_user_image(composer: Composer) -> Result<()> {
    let user = fragments::containers_override([Container {
        image: Some(String::from("my-custom-image:1.0.0")),
        ..Container::named("kibana")
    }]);
    let spec = composer.compose(
        fragments::request(FeatureFlags {
            keystore: true,
            ..FeatureFlags::default()
        })
        .with_override(user),
    )?;
    let primary = spec.pod.spec.container("kibana").and_then(|c| c.image.as_deref());
    let init = spec
        .pod
        .spec
        .init_container(KEYSTORE_INIT_CONTAINER)
        .and_then(|c| c.image.as_deref());
    ensure!(primary == Some("my-custom-image:1.0.0"), "unexpected primary image {primary:?}");
    ensure!(init == primary, "init container should run {primary:?}, got {init:?}");
    Ok(())
}

#[rstest]
fn user_env_is_appended(composer: Composer) -> Result<()> {
    let user = fragments::containers_override([Container {
        env: vec![
            EnvVar::new("user-env-1", "user-env-1-value"),
            EnvVar::new("user-env-2", "user-env-2-value"),
        ],
        ..Container::named("kibana")
    }]);
    let pod = compose_with_override(&composer, user)?;
    let container = pod.spec.container("kibana").context("primary container missing")?;
    ensure!(container.env.len() == 2, "two env vars expected");
    ensure!(container.effective_env().first() == Some(&("user-env-1", Some("user-env-1-value"))));
    Ok(())
}

#[rstest]
fn user_volumes_and_mounts_are_appended(composer: Composer) -> Result<()> {
    let mut volume_mounts = KeyedList::new();
    volume_mounts.upsert(VolumeMount::new("user-volume-mount", "/tmp"));
    let mut containers = KeyedList::new();
    containers.upsert(Container {
        volume_mounts,
        ..Container::named("kibana")
    });
    let mut volumes = KeyedList::new();
    volumes.upsert(Volume::empty_dir("user-volume"));
    let user = UserOverride::Typed(PodTemplate {
        spec: PodSpec {
            containers,
            volumes,
            ..PodSpec::default()
        },
        ..PodTemplate::default()
    });
    let pod = compose_with_override(&composer, user)?;
    ensure!(pod.spec.volumes.len() == 2, "default and user volume expected");
    let mounts = pod.spec.container("kibana").map(|c| c.volume_mounts.len());
    ensure!(mounts == Some(2), "default and user mount expected, got {mounts:?}");
    Ok(())
}

#[rstest]
fn user_may_replace_the_primary_image(composer: Composer) -> Result<()> {
    let user = fragments::containers_override([Container {
        image: Some(String::from("my-fork:7.4.0")),
        ..Container::named("kibana")
    }]);
    let pod = compose_with_override(&composer, user)?;
    let image = pod.spec.container("kibana").and_then(|c| c.image.as_deref());
    ensure!(image == Some("my-fork:7.4.0"), "user image should win, got {image:?}");
    Ok(())
}

#[rstest]
fn malformed_resources_are_reported_with_their_slot(composer: Composer) -> Result<()> {
    let user = UserOverride::from_value(json!({
        "spec": {
            "containers": [{
                "name": "kibana",
                "resources": { "limits": { "memory": "plenty" } }
            }]
        }
    }));
    let err = composer
        .compose(fragments::request(FeatureFlags::default()).with_override(user))
        .err()
        .context("malformed override should fail")?;
    match err.as_ref() {
        ComposeError::MalformedOverride { slot, message } => {
            ensure!(slot == "spec.containers[kibana].resources", "unexpected slot {slot}");
            ensure!(message.contains("plenty"), "message should quote the input: {message}");
        }
        other => anyhow::bail!("expected a malformed override, got {other:?}"),
    }
    Ok(())
}

#[rstest]
fn user_vars_override_document_leaves(composer: Composer) -> Result<()> {
    let vars = UserVars::from_value(json!({
        "period": "30s",
        "hosts": ["https://kibana.example.com:5601"],
        "ssl": { "verification_mode": "none" },
    }))?;
    let spec = composer.compose(fragments::request(FeatureFlags::default()).with_vars(vars))?;
    let document = serde_json::Value::from(spec.document);
    ensure!(document["period"] == json!("30s"));
    ensure!(document["hosts"] == json!(["https://kibana.example.com:5601"]));
    ensure!(document["ssl"] == json!({ "verification_mode": "none" }));
    ensure!(document["add_metadata"] == json!(true), "untouched keys remain");
    Ok(())
}

#[cfg(feature = "yaml")]
#[rstest]
fn yaml_override_is_accepted(composer: Composer) -> Result<()> {
    let user = UserOverride::from_yaml_str(
        "metadata:\n  annotations:\n    team: observability\nspec:\n  containers:\n    - name: kibana\n      env:\n        - name: NODE_OPTIONS\n          value: --max-old-space-size=2048\n",
    )?;
    let pod = compose_with_override(&composer, user)?;
    ensure!(pod.metadata.annotations.get("team").map(String::as_str) == Some("observability"));
    let env = pod.spec.container("kibana").map(Container::effective_env);
    ensure!(
        env == Some(vec![("NODE_OPTIONS", Some("--max-old-space-size=2048"))]),
        "unexpected env {env:?}"
    );
    Ok(())
}
