//! Layer metadata and the fragments each layer carries.

use std::fmt;

use crate::{Contribution, PresetKey};

/// Where a layer came from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum LayerProvenance {
    /// The platform defaults.
    Defaults,
    /// An add-on or shared preset.
    Addon(PresetKey),
    /// The end user's override.
    User,
}

impl LayerProvenance {
    /// Whether this layer may replace identity-bearing fields.
    ///
    /// Only the user's override is trusted to repoint images and volume
    /// sources.
    #[must_use]
    pub const fn is_override_capable(&self) -> bool {
        matches!(self, Self::User)
    }
}

impl fmt::Display for LayerProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defaults => f.write_str("defaults"),
            Self::Addon(key) => write!(f, "addon:{key}"),
            Self::User => f.write_str("user"),
        }
    }
}

/// A contribution tagged with its provenance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FragmentLayer {
    provenance: LayerProvenance,
    contribution: Contribution,
}

impl FragmentLayer {
    /// A layer holding the platform defaults.
    #[must_use]
    pub const fn defaults(contribution: Contribution) -> Self {
        Self {
            provenance: LayerProvenance::Defaults,
            contribution,
        }
    }

    /// A layer contributed by the preset `key`.
    #[must_use]
    pub const fn addon(key: PresetKey, contribution: Contribution) -> Self {
        Self {
            provenance: LayerProvenance::Addon(key),
            contribution,
        }
    }

    /// A layer holding the user's override.
    #[must_use]
    pub const fn user(contribution: Contribution) -> Self {
        Self {
            provenance: LayerProvenance::User,
            contribution,
        }
    }

    /// Returns the provenance of the layer.
    #[must_use]
    pub const fn provenance(&self) -> &LayerProvenance {
        &self.provenance
    }

    /// Returns the contribution carried by the layer.
    #[must_use]
    pub const fn contribution(&self) -> &Contribution {
        &self.contribution
    }

    /// Split the layer into provenance and contribution.
    #[must_use]
    pub fn into_parts(self) -> (LayerProvenance, Contribution) {
        (self.provenance, self.contribution)
    }
}
