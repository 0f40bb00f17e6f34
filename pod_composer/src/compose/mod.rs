//! The composition engine.
//!
//! A [`Composer`] folds the default fragment, every active add-on and the
//! user's override into one pod template and configuration document:
//!
//! 1. The [`DefaultFragmentBuilder`] output forms the first layer.
//! 2. Presets from the [`PresetCatalog`] run in catalog order when their
//!    gate holds or the caller selected them. Each preset's requirements run
//!    first. The [`PresetRegistry`] guarantees every preset contributes at
//!    most once per target.
//! 3. The user's override and vars form the last layer.
//!
//! Layers are folded with [`LayerMerge`], so the field rules of
//! [`crate::merge`] decide how each slot combines. Errors raised while
//! gathering layers are collected and reported together; a composition that
//! fails leaves the caller's registry untouched.

mod composer;
mod layer;
mod report;

use std::sync::Arc;

use tracing::{debug, trace, warn};

pub use composer::{LayerComposer, LayerComposition};
pub use layer::{FragmentLayer, LayerProvenance};
pub use report::CompositionReport;

use crate::merge::{LayerMerge, MergeScope};
use crate::{
    AddonContext, ComposeError, ComposeResult, ComposerSettings, Contribution,
    DefaultFragmentBuilder, DocValue, FeatureFlags, PodTemplate, PresetCatalog, PresetKey,
    PresetRegistry, ResourceIdentity, TargetId, UserOverride, UserVars,
};

/// Everything one composition call needs to know about its target.
///
/// ```rust
/// use pod_composer::{ComposeRequest, FeatureFlags, PresetKey, ResourceIdentity};
///
/// let request = ComposeRequest::new(ResourceIdentity::new("kibana-name", "7.4.0"))
///     .with_flags(FeatureFlags { keystore: true, ..FeatureFlags::default() })
///     .select(PresetKey::from_static("leader-election"));
/// assert!(request.flags().keystore);
/// assert_eq!(request.selected().len(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct ComposeRequest {
    identity: ResourceIdentity,
    flags: FeatureFlags,
    selected: Vec<PresetKey>,
    user_override: Option<UserOverride>,
    user_vars: Option<UserVars>,
}

impl ComposeRequest {
    /// A request for `identity` with no flags, selections or overrides.
    #[must_use]
    pub fn new(identity: ResourceIdentity) -> Self {
        Self {
            identity,
            flags: FeatureFlags::default(),
            selected: Vec::new(),
            user_override: None,
            user_vars: None,
        }
    }

    /// Replace the feature flags.
    #[must_use]
    pub fn with_flags(mut self, flags: FeatureFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Explicitly select a preset regardless of its gate.
    #[must_use]
    pub fn select(mut self, key: PresetKey) -> Self {
        self.selected.push(key);
        self
    }

    /// Attach the user's pod template override.
    #[must_use]
    pub fn with_override(mut self, user_override: UserOverride) -> Self {
        self.user_override = Some(user_override);
        self
    }

    /// Attach the user's configuration document vars.
    #[must_use]
    pub fn with_vars(mut self, vars: UserVars) -> Self {
        self.user_vars = Some(vars);
        self
    }

    /// The workload being composed.
    #[must_use]
    pub const fn identity(&self) -> &ResourceIdentity {
        &self.identity
    }

    /// The feature flags.
    #[must_use]
    pub const fn flags(&self) -> &FeatureFlags {
        &self.flags
    }

    /// Explicitly selected preset keys, in selection order.
    #[must_use]
    pub fn selected(&self) -> &[PresetKey] {
        &self.selected
    }
}

/// The final specification of one workload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComposedSpec {
    /// Composed pod template.
    pub pod: PodTemplate,
    /// Composed configuration document.
    pub document: DocValue,
    /// Which layers contributed.
    pub report: CompositionReport,
}

/// Folds defaults, add-ons and user overrides into final specifications.
///
/// A composer holds no per-call state; one instance may serve any number of
/// targets, including from several threads.
///
/// ```rust
/// use pod_composer::{ComposeRequest, Composer, ComposerSettings, ResourceIdentity};
///
/// let composer = Composer::new(ComposerSettings::default());
/// let spec = composer.compose(ComposeRequest::new(ResourceIdentity::new("kb", "8.1.0")))?;
/// let primary = spec.pod.spec.container("kibana");
/// assert_eq!(
///     primary.and_then(|c| c.image.as_deref()),
///     Some("docker.elastic.co/kibana/kibana:8.1.0")
/// );
/// # Ok::<_, std::sync::Arc<pod_composer::ComposeError>>(())
/// ```
#[derive(Clone, Debug)]
pub struct Composer {
    settings: ComposerSettings,
    catalog: PresetCatalog,
}

impl Composer {
    /// A composer using the built-in presets.
    #[must_use]
    pub fn new(settings: ComposerSettings) -> Self {
        Self::with_catalog(settings, PresetCatalog::builtin())
    }

    /// A composer using `catalog` instead of the built-in presets.
    #[must_use]
    pub const fn with_catalog(settings: ComposerSettings, catalog: PresetCatalog) -> Self {
        Self { settings, catalog }
    }

    /// The settings fragments are built from.
    #[must_use]
    pub const fn settings(&self) -> &ComposerSettings {
        &self.settings
    }

    /// The presets this composer can apply.
    #[must_use]
    pub const fn catalog(&self) -> &PresetCatalog {
        &self.catalog
    }

    /// Compose one target with a fresh preset scope.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::UnknownPresetKey`] for selections the catalog
    /// does not know, [`ComposeError::MalformedOverride`] when user input
    /// cannot be interpreted, [`ComposeError::ConflictingIdentity`] when two
    /// non-user layers disagree on an identity-bearing field, or an
    /// aggregate of several of these.
    pub fn compose(&self, request: ComposeRequest) -> ComposeResult<ComposedSpec> {
        let mut registry = self.catalog.registry();
        self.compose_with(request, &mut registry)
    }

    /// Compose one target and record the applied presets in `registry`.
    ///
    /// Every call starts from an empty preset scope, so repeated calls with
    /// the same request yield the same specification. On success `registry`
    /// holds exactly the pairs this call applied; on failure it is left as
    /// it was.
    ///
    /// # Errors
    ///
    /// As for [`Composer::compose`].
    pub fn compose_with(
        &self,
        request: ComposeRequest,
        registry: &mut PresetRegistry,
    ) -> ComposeResult<ComposedSpec> {
        let mut scope = registry.clone();
        scope.clear_applied();
        let composition = self.compose_layers(request, &mut scope);
        let primary = self.settings.workload.container_name.as_str();
        let composed =
            composition.fold(|target, layers| fold_layers(target, primary, layers))?;
        *registry = scope;
        Ok(composed)
    }

    /// Gather the ordered layers for `request` without folding them.
    ///
    /// Presets whose contribution succeeds are marked in `registry`.
    #[must_use]
    pub fn compose_layers(
        &self,
        request: ComposeRequest,
        registry: &mut PresetRegistry,
    ) -> LayerComposition {
        let ComposeRequest {
            identity,
            flags,
            selected,
            user_override,
            user_vars,
        } = request;
        let mut composer = LayerComposer::with_capacity(self.catalog.iter().count() + 2);
        let mut errors = Vec::new();

        composer.push_defaults(DefaultFragmentBuilder::new(&self.settings).build(&identity, &flags));

        for key in &selected {
            if self.catalog.get(key).is_none() {
                warn!(preset = %key, "selected preset has no definition");
                errors.push(Arc::new(ComposeError::unknown_preset(key.as_str())));
            }
        }

        let ctx = AddonContext {
            identity: &identity,
            flags: &flags,
            settings: &self.settings,
        };
        let target = identity.target();
        for preset in self.catalog.iter() {
            let key = preset.key();
            if !(preset.is_active(&flags) || selected.contains(&key)) {
                continue;
            }
            for required in preset.requires() {
                if let Err(err) = self.apply_preset(&required, &ctx, &target, registry, &mut composer)
                {
                    errors.push(err);
                }
            }
            if let Err(err) = self.apply_preset(&key, &ctx, &target, registry, &mut composer) {
                errors.push(err);
            }
        }

        match user_layer(user_override, user_vars) {
            Ok(Some(contribution)) => composer.push_user(contribution),
            Ok(None) => {}
            Err(err) => errors.push(err),
        }

        LayerComposition::new(target, composer.layers(), errors)
    }

    fn apply_preset(
        &self,
        key: &PresetKey,
        ctx: &AddonContext<'_>,
        target: &TargetId,
        registry: &mut PresetRegistry,
        composer: &mut LayerComposer,
    ) -> ComposeResult<()> {
        let preset = self
            .catalog
            .get(key)
            .ok_or_else(|| Arc::new(ComposeError::unknown_preset(key.as_str())))?;
        let applied = registry.apply_once(target, key, || {
            let contribution = preset.contribute(ctx)?;
            composer.push_addon(key.clone(), contribution);
            Ok(())
        })?;
        if applied {
            debug!(workload = %target, preset = %key, "preset contributed");
        }
        Ok(())
    }
}

fn user_layer(
    user_override: Option<UserOverride>,
    user_vars: Option<UserVars>,
) -> ComposeResult<Option<Contribution>> {
    if user_override.is_none() && user_vars.is_none() {
        return Ok(None);
    }
    let pod = user_override
        .map(UserOverride::into_pod)
        .transpose()?
        .unwrap_or_default();
    let document = user_vars.map(UserVars::into_document);
    Ok(Some(Contribution { pod, document }))
}

fn fold_layers(
    target: TargetId,
    primary: &str,
    layers: Vec<FragmentLayer>,
) -> ComposeResult<ComposedSpec> {
    let mut pod = PodTemplate::default();
    let mut document = DocValue::mapping();
    let mut report = CompositionReport::new(target);
    for layer in layers {
        let (provenance, contribution) = layer.into_parts();
        pod.merge_layer(contribution.pod, &MergeScope::root(&provenance))?;
        if let Some(edits) = contribution.document {
            document.merge(edits);
        }
        trace!(layer = %provenance, containers = pod.spec.containers.len(), "folded layer");
        report.record(provenance);
    }
    ensure_unique_container_names(&pod)?;
    inherit_primary_image(&mut pod, primary);
    debug!(
        workload = %report.target(),
        layers = report.layers().len(),
        containers = pod.spec.containers.len(),
        init_containers = pod.spec.init_containers.len(),
        "composed workload"
    );
    Ok(ComposedSpec {
        pod,
        document,
        report,
    })
}

/// Init containers without an image run the primary container's final image.
fn inherit_primary_image(pod: &mut PodTemplate, primary: &str) {
    let Some(image) = pod
        .spec
        .container(primary)
        .and_then(|container| container.image.clone())
    else {
        return;
    };
    for init in pod.spec.init_containers.iter_mut() {
        if init.image.is_none() {
            init.image = Some(image.clone());
        }
    }
}

/// Init and application containers share one name space within a pod.
fn ensure_unique_container_names(pod: &PodTemplate) -> ComposeResult<()> {
    let clash = pod
        .spec
        .init_containers
        .keys()
        .find(|name| pod.spec.containers.contains_key(name));
    clash.map_or(Ok(()), |name| {
        Err(Arc::new(ComposeError::ConflictingIdentity {
            slot: format!("spec.initContainers[{name}].name"),
            lower: String::from("application container"),
            higher: String::from("init container"),
        }))
    })
}

#[cfg(test)]
mod tests {
    use anyhow::{Result, ensure};
    use rstest::{fixture, rstest};

    use super::*;
    use crate::{Container, KeyedList, PodSpec, addons::keys};

    #[fixture]
    fn composer() -> Composer {
        Composer::new(ComposerSettings::default())
    }

    #[rstest]
    fn defaults_alone_yield_one_layer(composer: Composer) -> Result<()> {
        let spec = composer.compose(ComposeRequest::new(ResourceIdentity::new("kb", "8.0.0")))?;
        ensure!(
            spec.report.layers() == [LayerProvenance::Defaults],
            "only the defaults layer expected"
        );
        ensure!(spec.pod.spec.containers.len() == 1, "one primary container expected");
        Ok(())
    }

    #[rstest]
    fn requirements_precede_their_dependent(composer: Composer) -> Result<()> {
        let request = ComposeRequest::new(ResourceIdentity::new("kb", "8.0.0")).with_flags(
            FeatureFlags {
                leader_election: true,
                sharded_metrics: true,
                ..FeatureFlags::default()
            },
        );
        let spec = composer.compose(request)?;
        let applied: Vec<&PresetKey> = spec.report.applied_presets().collect();
        let expected = [
            &keys::CLUSTER_MONITORING,
            &keys::LEADER_ELECTION,
            &keys::METRICS_SHARDING,
        ];
        ensure!(applied == expected, "unexpected preset order: {applied:?}");
        Ok(())
    }

    #[rstest]
    fn failed_composition_leaves_registry_untouched(composer: Composer) {
        let mut registry = composer.catalog().registry();
        let request = ComposeRequest::new(ResourceIdentity::new("kb", "8.0.0"))
            .with_flags(FeatureFlags {
                keystore: true,
                ..FeatureFlags::default()
            })
            .select(PresetKey::from_static("audit"));
        assert!(composer.compose_with(request, &mut registry).is_err());
        assert_eq!(registry.applied().count(), 0);
    }

    #[rstest]
    fn reused_registry_does_not_drop_contributions(composer: Composer) -> Result<()> {
        let mut registry = composer.catalog().registry();
        let request = ComposeRequest::new(ResourceIdentity::new("kb", "8.0.0")).with_flags(
            FeatureFlags {
                keystore: true,
                ..FeatureFlags::default()
            },
        );
        let first = composer.compose_with(request.clone(), &mut registry)?;
        let second = composer.compose_with(request, &mut registry)?;
        ensure!(first == second, "repeated composition must be identical");
        ensure!(
            second.pod.spec.init_containers.len() == 1,
            "keystore init container must survive a reused registry"
        );
        let target = TargetId::new("default", "kb");
        ensure!(
            registry.is_applied(&target, &keys::KEYSTORE),
            "registry should record the keystore"
        );
        ensure!(registry.applied().count() == 1, "only this call's pairs are recorded");
        Ok(())
    }

    #[rstest]
    fn init_container_may_not_reuse_a_container_name(composer: Composer) {
        let mut init_containers = KeyedList::new();
        init_containers.upsert(Container::named("kibana"));
        let user = PodTemplate {
            spec: PodSpec {
                init_containers,
                ..PodSpec::default()
            },
            ..PodTemplate::default()
        };
        let request = ComposeRequest::new(ResourceIdentity::new("kb", "8.0.0"))
            .with_override(UserOverride::Typed(user));
        let err = composer.compose(request).err();
        assert!(matches!(
            err.as_deref(),
            Some(ComposeError::ConflictingIdentity { slot, .. })
                if slot == "spec.initContainers[kibana].name"
        ));
    }
}
