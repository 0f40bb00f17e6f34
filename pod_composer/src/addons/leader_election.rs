//! Gates collection of cluster-wide metrics on holding the leader lease.

use serde_json::json;

use crate::{ComposeResult, Contribution, FeatureFlags, PresetKey};

use super::{AddonContext, Preset, keys};

/// Condition under which only the lease holder collects.
pub const LEADER_CONDITION: &str = "${kubernetes_leaderelection.leader} == true";

/// Adds the leader-election `condition` to the document.
#[derive(Clone, Copy, Debug, Default)]
pub struct LeaderElectionAddon;

impl Preset for LeaderElectionAddon {
    fn key(&self) -> PresetKey {
        keys::LEADER_ELECTION
    }

    fn requires(&self) -> Vec<PresetKey> {
        vec![keys::CLUSTER_MONITORING]
    }

    fn is_active(&self, flags: &FeatureFlags) -> bool {
        flags.leader_election
    }

    fn contribute(&self, _ctx: &AddonContext<'_>) -> ComposeResult<Contribution> {
        Ok(Contribution {
            document: Some(json!({ "condition": LEADER_CONDITION }).into()),
            ..Contribution::default()
        })
    }
}
