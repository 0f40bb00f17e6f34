//! Cluster-wide metrics served by an in-pod shard-shim.

use serde_json::json;

use crate::{
    ComposeResult, Container, ContainerPort, Contribution, FeatureFlags, KeyedList, PodSpec,
    PodTemplate, PresetKey,
};

use super::{AddonContext, Preset, keys};

/// Name of the shim's metrics port.
pub const METRICS_PORT_NAME: &str = "metrics";

/// Deploys the shard-shim sidecar and points collection at it.
///
/// Every replica scrapes its own shim, so the leader-election `condition`
/// is removed from the document.
#[derive(Clone, Copy, Debug, Default)]
pub struct MetricsShardingAddon;

impl Preset for MetricsShardingAddon {
    fn key(&self) -> PresetKey {
        keys::METRICS_SHARDING
    }

    fn requires(&self) -> Vec<PresetKey> {
        vec![keys::CLUSTER_MONITORING]
    }

    fn is_active(&self, flags: &FeatureFlags) -> bool {
        flags.sharded_metrics
    }

    fn contribute(&self, ctx: &AddonContext<'_>) -> ComposeResult<Contribution> {
        let shim = &ctx.settings.shard_shim;
        let mut containers = KeyedList::new();
        containers.upsert(Container {
            image: Some(shim.image.clone()),
            ports: vec![ContainerPort::tcp(METRICS_PORT_NAME, shim.port)],
            ..Container::named(&shim.container_name)
        });
        Ok(Contribution {
            pod: PodTemplate {
                spec: PodSpec {
                    containers,
                    ..PodSpec::default()
                },
                ..PodTemplate::default()
            },
            document: Some(
                json!({
                    "hosts": [format!("localhost:{}", shim.port)],
                    "condition": null,
                })
                .into(),
            ),
        })
    }
}
