//! Accumulating layers and the errors raised while producing them.

use std::sync::Arc;

use crate::{ComposeError, ComposeResult, Contribution, PresetKey, TargetId};

use super::FragmentLayer;

/// Builder that accumulates [`FragmentLayer`] instances in merge order.
///
/// ```rust
/// use pod_composer::{Contribution, LayerComposer, LayerProvenance, PresetKey};
///
/// let mut composer = LayerComposer::new();
/// composer.push_defaults(Contribution::default());
/// composer.push_addon(PresetKey::from_static("keystore"), Contribution::default());
/// composer.push_user(Contribution::default());
///
/// let order: Vec<String> = composer
///     .layers()
///     .iter()
///     .map(|layer| layer.provenance().to_string())
///     .collect();
/// assert_eq!(order, ["defaults", "addon:keystore", "user"]);
/// ```
#[derive(Debug, Default)]
pub struct LayerComposer {
    layers: Vec<FragmentLayer>,
}

impl LayerComposer {
    /// Create an empty composer.
    #[must_use]
    pub const fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Create a composer with preallocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            layers: Vec::with_capacity(capacity),
        }
    }

    /// Push the defaults layer.
    pub fn push_defaults(&mut self, contribution: Contribution) {
        self.push_layer(FragmentLayer::defaults(contribution));
    }

    /// Push a layer contributed by preset `key`.
    pub fn push_addon(&mut self, key: PresetKey, contribution: Contribution) {
        self.push_layer(FragmentLayer::addon(key, contribution));
    }

    /// Push the user layer.
    pub fn push_user(&mut self, contribution: Contribution) {
        self.push_layer(FragmentLayer::user(contribution));
    }

    /// Push an arbitrary layer.
    pub fn push_layer(&mut self, layer: FragmentLayer) {
        self.layers.push(layer);
    }

    /// Consume the composer and return the accumulated layers.
    #[must_use]
    pub fn layers(self) -> Vec<FragmentLayer> {
        self.layers
    }
}

impl IntoIterator for LayerComposer {
    type Item = FragmentLayer;
    type IntoIter = std::vec::IntoIter<FragmentLayer>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.into_iter()
    }
}

/// The layers gathered for one target plus any errors raised gathering them.
///
/// Folding happens only when gathering succeeded. A broken user override or
/// an unknown preset means the layers are incomplete, and a fold over them
/// would report misleading conflicts.
#[derive(Debug)]
pub struct LayerComposition {
    target: TargetId,
    layers: Vec<FragmentLayer>,
    errors: Vec<Arc<ComposeError>>,
}

impl LayerComposition {
    /// Pair the `layers` gathered for `target` with the `errors` raised.
    #[must_use]
    pub const fn new(
        target: TargetId,
        layers: Vec<FragmentLayer>,
        errors: Vec<Arc<ComposeError>>,
    ) -> Self {
        Self {
            target,
            layers,
            errors,
        }
    }

    /// The workload the layers belong to.
    #[must_use]
    pub const fn target(&self) -> &TargetId {
        &self.target
    }

    /// The gathered layers in fold order.
    #[must_use]
    pub fn layers(&self) -> &[FragmentLayer] {
        &self.layers
    }

    /// Whether gathering raised any error.
    #[must_use]
    pub const fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Fold the layers with `fold`, or report the gathering errors.
    ///
    /// # Errors
    ///
    /// Returns the recorded error, a [`ComposeError::Aggregate`] naming the
    /// target when several were recorded, or the error returned by `fold`.
    pub fn fold<T, F>(self, fold: F) -> ComposeResult<T>
    where
        F: FnOnce(TargetId, Vec<FragmentLayer>) -> ComposeResult<T>,
    {
        let Self {
            target,
            layers,
            errors,
        } = self;
        match ComposeError::combine(&target, errors) {
            Some(err) => Err(err),
            None => fold(target, layers),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn target() -> TargetId {
        TargetId::new("default", "kb")
    }

    #[rstest]
    fn recorded_errors_skip_the_fold(target: TargetId) {
        let composition = LayerComposition::new(
            target,
            Vec::new(),
            vec![Arc::new(ComposeError::unknown_preset("audit"))],
        );
        assert!(composition.has_errors());
        let mut folded = false;
        let result = composition.fold(|_, _| {
            folded = true;
            Ok(())
        });
        assert!(!folded);
        assert!(matches!(
            result.err().as_deref(),
            Some(ComposeError::UnknownPresetKey { key }) if key == "audit"
        ));
    }

    #[rstest]
    fn several_errors_are_aggregated_under_the_target(target: TargetId) {
        let composition = LayerComposition::new(
            target.clone(),
            Vec::new(),
            vec![
                Arc::new(ComposeError::unknown_preset("audit")),
                Arc::new(ComposeError::malformed("metadata", "expected a mapping")),
            ],
        );
        let result: ComposeResult<()> = composition.fold(|_, _| Ok(()));
        match result.err().as_deref() {
            Some(ComposeError::Aggregate(agg)) => {
                assert_eq!(agg.target(), &target);
                assert_eq!(agg.errors().len(), 2);
            }
            other => panic!("expected aggregate, got {other:?}"),
        }
    }

    #[rstest]
    fn fold_receives_target_and_layers(target: TargetId) {
        let mut composer = LayerComposer::new();
        composer.push_defaults(Contribution::default());
        composer.push_user(Contribution::default());
        let composition = LayerComposition::new(target.clone(), composer.layers(), Vec::new());
        assert_eq!(composition.layers().len(), 2);
        let result = composition.fold(|folded_target, layers| Ok((folded_target, layers.len())));
        assert!(matches!(result, Ok((t, 2)) if t == target));
    }

    #[rstest]
    fn fold_errors_pass_through(target: TargetId) {
        let composition = LayerComposition::new(target, Vec::new(), Vec::new());
        let result: ComposeResult<()> = composition
            .fold(|_, _| Err(Arc::new(ComposeError::malformed("spec", "bad"))));
        assert!(matches!(
            result.err().as_deref(),
            Some(ComposeError::MalformedOverride { slot, .. }) if slot == "spec"
        ));
    }
}
