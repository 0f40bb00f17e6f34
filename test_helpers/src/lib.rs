//! Test helpers shared across crates in the pod-composer workspace.
//!
//! [`figment`] wraps `figment::Jail` for settings tests; [`fragments`] builds
//! identities, requests and user fragments without repeating boilerplate.

pub mod figment;
pub mod fragments;
