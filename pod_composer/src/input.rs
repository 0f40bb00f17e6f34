//! User-authored overrides and vars.
//!
//! Both may arrive typed, as a JSON value, as JSON text or, with the `yaml`
//! feature, as YAML text. Anything that cannot be read under its expected
//! shape is reported as [`ComposeError::MalformedOverride`] naming the
//! narrowest slot that fails.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::{
    ComposeError, ComposeResult, ComposeResultExt, Container, DocValue, KeyedList, ObjectMeta,
    PodTemplate, ResourceRequirements, SlotResultExt, Volume,
};

const ROOT_SLOT: &str = "<root>";
const VARS_SLOT: &str = "vars";

/// The user's pod template override.
#[derive(Clone, Debug, PartialEq)]
pub enum UserOverride {
    /// An already typed fragment.
    Typed(PodTemplate),
    /// A raw fragment, checked when the composition runs.
    Raw(Value),
}

impl UserOverride {
    /// Wrap a raw JSON value.
    #[must_use]
    pub const fn from_value(value: Value) -> Self {
        Self::Raw(value)
    }

    /// Parse JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::MalformedOverride`] when the text is not JSON.
    pub fn from_json_str(text: &str) -> ComposeResult<Self> {
        serde_json::from_str::<Value>(text).into_compose().map(Self::Raw)
    }

    /// Parse YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::MalformedOverride`] when the text is not YAML.
    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(text: &str) -> ComposeResult<Self> {
        parse_yaml(text).for_slot(ROOT_SLOT).map(Self::Raw)
    }

    /// Interpret the override as a pod template fragment.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::MalformedOverride`] naming the first slot that
    /// does not have the expected shape.
    pub fn into_pod(self) -> ComposeResult<PodTemplate> {
        match self {
            Self::Typed(pod) => Ok(pod),
            Self::Raw(value) => decode_pod(&value),
        }
    }
}

impl From<PodTemplate> for UserOverride {
    fn from(pod: PodTemplate) -> Self {
        Self::Typed(pod)
    }
}

/// The user's configuration document vars; always a mapping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserVars(DocValue);

impl UserVars {
    /// Accept a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::MalformedOverride`] unless `value` is an object.
    pub fn from_value(value: Value) -> ComposeResult<Self> {
        if !value.is_object() {
            return Err(Arc::new(ComposeError::malformed(
                VARS_SLOT,
                format!("expected a mapping, found {}", kind_of(&value)),
            )));
        }
        Ok(Self(value.into()))
    }

    /// Parse JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::MalformedOverride`] when the text is not a JSON
    /// object.
    pub fn from_json_str(text: &str) -> ComposeResult<Self> {
        serde_json::from_str::<Value>(text)
            .for_slot(VARS_SLOT)
            .and_then(Self::from_value)
    }

    /// Parse YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::MalformedOverride`] when the text is not a YAML
    /// mapping.
    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(text: &str) -> ComposeResult<Self> {
        parse_yaml(text)
            .for_slot(VARS_SLOT)
            .and_then(Self::from_value)
    }

    /// Borrow the vars as a document.
    #[must_use]
    pub const fn document(&self) -> &DocValue {
        &self.0
    }

    /// Take the vars as a document.
    #[must_use]
    pub fn into_document(self) -> DocValue {
        self.0
    }
}

#[cfg(feature = "yaml")]
fn parse_yaml(text: &str) -> Result<Value, serde_saphyr::Error> {
    serde_saphyr::from_str_with_options(
        text,
        serde_saphyr::Options {
            strict_booleans: true,
            ..serde_saphyr::Options::default()
        },
    )
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

fn decode_pod(value: &Value) -> ComposeResult<PodTemplate> {
    if !value.is_object() {
        return Err(Arc::new(ComposeError::malformed(
            ROOT_SLOT,
            format!("expected a mapping, found {}", kind_of(value)),
        )));
    }
    PodTemplate::deserialize(value)
        .map_err(|err| Arc::new(ComposeError::malformed(locate_failure(value), err.to_string())))
}

/// Narrow a decode failure down to the slot that caused it.
fn locate_failure(value: &Value) -> String {
    if value
        .get("metadata")
        .is_some_and(|meta| ObjectMeta::deserialize(meta).is_err())
    {
        return String::from("metadata");
    }
    let Some(spec) = value.get("spec") else {
        return String::from(ROOT_SLOT);
    };
    for section in ["initContainers", "containers"] {
        if let Some(slot) = locate_container_failure(spec, section) {
            return slot;
        }
    }
    locate_volume_failure(spec).unwrap_or_else(|| String::from("spec"))
}

fn locate_volume_failure(spec: &Value) -> Option<String> {
    let list = spec.get("volumes")?;
    if KeyedList::<Volume>::deserialize(list).is_ok() {
        return None;
    }
    let bad = list
        .as_array()
        .into_iter()
        .flatten()
        .find(|entry| Volume::deserialize(*entry).is_err());
    Some(bad.map_or_else(
        || String::from("spec.volumes"),
        |entry| format!("spec.volumes[{}]", entry_name(entry)),
    ))
}

fn locate_container_failure(spec: &Value, section: &str) -> Option<String> {
    let list = spec.get(section)?;
    if KeyedList::<Container>::deserialize(list).is_ok() {
        return None;
    }
    let bad = list
        .as_array()
        .into_iter()
        .flatten()
        .find(|entry| Container::deserialize(*entry).is_err());
    let Some(entry) = bad else {
        return Some(format!("spec.{section}"));
    };
    let name = entry_name(entry);
    let resources_malformed = entry
        .get("resources")
        .is_some_and(|resources| ResourceRequirements::deserialize(resources).is_err());
    Some(if resources_malformed {
        format!("spec.{section}[{name}].resources")
    } else {
        format!("spec.{section}[{name}]")
    })
}

fn entry_name(entry: &Value) -> &str {
    entry.get("name").and_then(Value::as_str).unwrap_or("?")
}
