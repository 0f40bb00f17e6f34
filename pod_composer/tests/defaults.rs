//! Default fragment coverage: what a composition yields with no add-ons and
//! no user input.

use anyhow::{Context, Result, ensure};
use pod_composer::{
    ComposeRequest, Composer, ComposerSettings, FeatureFlags, KEYSTORE_INIT_CONTAINER,
    ResourceIdentity, SECURE_SETTINGS_VOLUME, Scheme, TYPE_LABEL_KEY,
};
use rstest::{fixture, rstest};
use serde_json::json;
use test_helpers::fragments;

#[fixture]
fn composer() -> Composer {
    fragments::composer()
}

#[rstest]
fn default_pod_template(composer: Composer) -> Result<()> {
    let spec = composer.compose(fragments::request(FeatureFlags::default()))?;
    let pod = &spec.pod;

    ensure!(pod.spec.automount_service_account_token == Some(false));
    ensure!(pod.spec.init_containers.is_empty(), "no init containers by default");
    ensure!(pod.spec.containers.len() == 1, "exactly one container by default");
    ensure!(pod.spec.volumes.len() == 1, "exactly one volume by default");

    let container = pod.spec.container("kibana").context("primary container missing")?;
    ensure!(container.image.as_deref() == Some("docker.elastic.co/kibana/kibana:7.4.0"));
    ensure!(container.volume_mounts.len() == 1, "config mount expected");
    ensure!(container.ports.len() == 1, "one HTTP port expected");
    ensure!(container.ports.iter().all(|p| p.container_port == 5601));

    let probe = container
        .readiness_probe
        .as_ref()
        .and_then(|p| p.http_get.as_ref())
        .context("readiness probe missing")?;
    ensure!(probe.scheme == Scheme::Https && probe.path == "/login" && probe.port == 5601);

    let memory = container
        .resources
        .as_ref()
        .and_then(|r| r.limits.get("memory"))
        .map(|q| q.as_str());
    ensure!(memory == Some("1Gi"), "default memory limit expected, got {memory:?}");
    Ok(())
}

#[rstest]
fn default_labels(composer: Composer) -> Result<()> {
    let spec = composer.compose(fragments::request(FeatureFlags::default()))?;
    let labels = spec.pod.labels();
    ensure!(labels.get(TYPE_LABEL_KEY).map(String::as_str) == Some("kibana"));
    ensure!(labels.get("kibana.k8s.elastic.co/name").map(String::as_str) == Some("kibana-name"));
    ensure!(labels.get("kibana.k8s.elastic.co/version").map(String::as_str) == Some("7.4.0"));
    ensure!(labels.len() == 3, "only identity labels expected, got {labels:?}");
    Ok(())
}

#[rstest]
fn custom_image_is_used_verbatim(composer: Composer) -> Result<()> {
    let identity = ResourceIdentity::new("kibana-name", "7.1.0").with_image("my-custom-image:1.0.0");
    let spec = composer.compose(ComposeRequest::new(identity))?;
    let image = spec.pod.spec.container("kibana").and_then(|c| c.image.as_deref());
    ensure!(image == Some("my-custom-image:1.0.0"), "unexpected image {image:?}");
    Ok(())
}

#[rstest]
fn keystore_adds_init_container_and_volume(composer: Composer) -> Result<()> {
    let spec = composer.compose(fragments::request(FeatureFlags {
        keystore: true,
        ..FeatureFlags::default()
    }))?;
    let init = spec
        .pod
        .spec
        .init_container(KEYSTORE_INIT_CONTAINER)
        .context("keystore init container missing")?;
    ensure!(init.image.as_deref() == Some("docker.elastic.co/kibana/kibana:7.4.0"));
    ensure!(init.volume_mounts.contains_key(SECURE_SETTINGS_VOLUME));
    ensure!(spec.pod.spec.volumes.len() == 2, "config and secure settings volumes");
    ensure!(spec.pod.spec.containers.len() == 1, "keystore adds no application container");
    Ok(())
}

#[rstest]
fn default_document(composer: Composer) -> Result<()> {
    let identity = ResourceIdentity::new("kb", "8.2.0").in_namespace("observability");
    let spec = composer.compose(ComposeRequest::new(identity))?;
    let document = serde_json::Value::from(spec.document);
    let expected = json!({
        "module": "kibana",
        "add_metadata": true,
        "hosts": ["https://kb-kb-http.observability.svc:5601"],
        "period": "10s",
        "use_output": "default",
        "data_stream": {
            "dataset": "kibana.stack_monitoring",
            "namespace": "observability",
        },
    });
    ensure!(document == expected, "unexpected document {document}");
    Ok(())
}

#[rstest]
fn settings_shape_the_defaults() -> Result<()> {
    let mut settings = ComposerSettings::default();
    settings.workload.image_repository = String::from("registry.example.com/kibana");
    settings.workload.http_port = 5602;
    let composer = Composer::new(settings);
    let spec = composer.compose(fragments::request(FeatureFlags::default()))?;
    let container = spec.pod.spec.container("kibana").context("primary container missing")?;
    ensure!(container.image.as_deref() == Some("registry.example.com/kibana:7.4.0"));
    ensure!(container.ports.iter().all(|p| p.container_port == 5602));
    Ok(())
}
