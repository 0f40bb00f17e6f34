//! Shared setup for cluster-wide monitoring.
//!
//! Several add-ons scrape cluster-scoped endpoints and need an API token to
//! do so. The token is projected once per pod, whichever add-on asked first.

use std::collections::BTreeMap;

use serde_json::json;

use crate::{
    ComposeResult, Container, Contribution, EnvVar, KeyedList, ObjectMeta, PodSpec, PodTemplate,
    PresetKey, ProjectedVolumeSource, ServiceAccountTokenProjection, Volume, VolumeMount,
    VolumeProjection,
};

use super::{AddonContext, Preset, keys};

/// Name of the projected token volume.
pub const MONITORING_TOKEN_VOLUME: &str = "elastic-internal-monitoring-token";
/// Environment variable naming the token file.
pub const MONITORING_TOKEN_FILE_ENV: &str = "MONITORING_TOKEN_FILE";
/// Label marking pods that collect cluster-wide metrics.
pub const CLUSTER_MONITORING_LABEL: &str = "common.k8s.elastic.co/cluster-monitoring";

/// Projects a service-account token into the primary container.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClusterMonitoringPreset;

impl ClusterMonitoringPreset {
    fn token_volume(ctx: &AddonContext<'_>) -> Volume {
        Volume {
            projected: Some(ProjectedVolumeSource {
                sources: vec![VolumeProjection {
                    service_account_token: Some(ServiceAccountTokenProjection {
                        path: String::from("token"),
                        expiration_seconds: Some(ctx.settings.monitoring.token_expiration_seconds),
                        audience: None,
                    }),
                }],
            }),
            ..Volume::named(MONITORING_TOKEN_VOLUME)
        }
    }
}

impl Preset for ClusterMonitoringPreset {
    fn key(&self) -> PresetKey {
        keys::CLUSTER_MONITORING
    }

    fn contribute(&self, ctx: &AddonContext<'_>) -> ComposeResult<Contribution> {
        let monitoring = &ctx.settings.monitoring;
        let token_file = monitoring.token_file();

        let mut volume_mounts = KeyedList::new();
        volume_mounts
            .upsert(VolumeMount::new(MONITORING_TOKEN_VOLUME, &monitoring.token_dir).read_only());
        let mut containers = KeyedList::new();
        containers.upsert(Container {
            env: vec![EnvVar::new(MONITORING_TOKEN_FILE_ENV, &token_file)],
            volume_mounts,
            ..Container::named(&ctx.settings.workload.container_name)
        });
        let mut volumes = KeyedList::new();
        volumes.upsert(Self::token_volume(ctx));

        Ok(Contribution {
            pod: PodTemplate {
                metadata: ObjectMeta {
                    labels: BTreeMap::from([(
                        String::from(CLUSTER_MONITORING_LABEL),
                        String::from("true"),
                    )]),
                    ..ObjectMeta::default()
                },
                spec: PodSpec {
                    containers,
                    volumes,
                    ..PodSpec::default()
                },
            },
            document: Some(json!({ "bearer_token_file": token_file }).into()),
        })
    }
}
