//! Keystore initialisation from user-supplied secure settings.
//!
//! The init container runs the workload's own image so the keystore tooling
//! matches the version being deployed.

use crate::{
    ComposeResult, Container, Contribution, FeatureFlags, KeyedList, PodSpec, PodTemplate,
    PresetKey, Volume, VolumeMount,
};

use super::{AddonContext, Preset, keys};

/// Name of the keystore init container.
pub const KEYSTORE_INIT_CONTAINER: &str = "elastic-internal-init-keystore";
/// Name of the secure-settings volume.
pub const SECURE_SETTINGS_VOLUME: &str = "elastic-internal-secure-settings";
/// Where the secure settings are mounted in the init container.
pub const SECURE_SETTINGS_MOUNT_PATH: &str = "/mnt/elastic-internal/secure-settings";

const INIT_SCRIPT: &str = r#"set -eux
echo "Initializing keystore."
create_keystore
for filename in /mnt/elastic-internal/secure-settings/*; do
  [[ -e "$filename" ]] || continue
  key=$(basename "$filename")
  echo "Adding $key to the keystore."
  add_to_keystore "$key" "$filename"
done
echo "Keystore initialization successful."
"#;

/// Runs an init container that builds the keystore from secure settings.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeystoreAddon;

impl KeystoreAddon {
    fn secret_name(ctx: &AddonContext<'_>) -> String {
        format!(
            "{}-{}-secure-settings",
            ctx.identity.name, ctx.settings.workload.short_name
        )
    }
}

impl Preset for KeystoreAddon {
    fn key(&self) -> PresetKey {
        keys::KEYSTORE
    }

    fn is_active(&self, flags: &FeatureFlags) -> bool {
        flags.keystore
    }

    fn contribute(&self, ctx: &AddonContext<'_>) -> ComposeResult<Contribution> {
        let mut volume_mounts = KeyedList::new();
        volume_mounts
            .upsert(VolumeMount::new(SECURE_SETTINGS_VOLUME, SECURE_SETTINGS_MOUNT_PATH).read_only());
        // No image: the composer fills it from the final primary container.
        let init = Container {
            command: vec![
                String::from("/usr/bin/env"),
                String::from("bash"),
                String::from("-c"),
                String::from(INIT_SCRIPT),
            ],
            volume_mounts,
            ..Container::named(KEYSTORE_INIT_CONTAINER)
        };

        let mut init_containers = KeyedList::new();
        init_containers.upsert(init);
        let mut volumes = KeyedList::new();
        volumes.upsert(Volume::secret(SECURE_SETTINGS_VOLUME, Self::secret_name(ctx)));
        Ok(Contribution {
            pod: PodTemplate {
                spec: PodSpec {
                    init_containers,
                    volumes,
                    ..PodSpec::default()
                },
                ..PodTemplate::default()
            },
            document: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{Result, ensure};
    use rstest::{fixture, rstest};

    use super::*;
    use crate::{ComposerSettings, ResourceIdentity};

    #[fixture]
    fn settings() -> ComposerSettings {
        ComposerSettings::default()
    }

    #[rstest]
    fn init_container_leaves_image_to_the_composer(settings: ComposerSettings) -> Result<()> {
        let identity = ResourceIdentity::new("kibana-name", "7.4.0").with_image("my-image");
        let flags = FeatureFlags::default();
        let ctx = AddonContext {
            identity: &identity,
            flags: &flags,
            settings: &settings,
        };
        let contribution = KeystoreAddon.contribute(&ctx)?;
        let init = contribution.pod.spec.init_container(KEYSTORE_INIT_CONTAINER);
        ensure!(init.is_some(), "init container expected");
        ensure!(
            init.and_then(|c| c.image.as_deref()).is_none(),
            "init image is filled in after folding"
        );
        ensure!(contribution.document.is_none(), "keystore edits no document");
        Ok(())
    }

    #[rstest]
    fn secure_settings_volume_is_named_after_the_workload(
        settings: ComposerSettings,
    ) -> Result<()> {
        let identity = ResourceIdentity::new("kibana-name", "7.4.0");
        let flags = FeatureFlags::default();
        let ctx = AddonContext {
            identity: &identity,
            flags: &flags,
            settings: &settings,
        };
        let contribution = KeystoreAddon.contribute(&ctx)?;
        let volume = contribution.pod.spec.volumes.get(SECURE_SETTINGS_VOLUME);
        let secret_name = volume
            .and_then(|v| v.secret.as_ref())
            .map(|s| s.secret_name.as_str());
        ensure!(
            secret_name == Some("kibana-name-kb-secure-settings"),
            "unexpected secret {secret_name:?}"
        );
        Ok(())
    }
}
