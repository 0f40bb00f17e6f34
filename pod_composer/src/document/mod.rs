//! Configuration documents: nested settings trees for data-collection jobs.
//!
//! A document is a tagged tree of scalars, lists and mappings. Layers merge
//! recursively on mappings; scalars and lists are replaced wholesale, so a
//! user-supplied `hosts` list replaces the generated one rather than being
//! concatenated. An explicit `null` inside a mapping removes that key.
//!
//! # Example
//!
//! ```rust
//! use pod_composer::DocValue;
//! use serde_json::json;
//!
//! let mut vars = DocValue::from(json!({
//!     "add_metadata": true,
//!     "hosts": ["localhost:8080"],
//!     "period": "10s"
//! }));
//! vars.merge(json!({"period": "30s"}).into());
//! assert_eq!(
//!     serde_json::Value::from(vars),
//!     json!({"add_metadata": true, "hosts": ["localhost:8080"], "period": "30s"})
//! );
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// A leaf value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scalar {
    /// Explicit null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer or float.
    Number(Number),
    /// String.
    String(String),
}

/// A node of a configuration document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum DocValue {
    /// A leaf.
    Scalar(Scalar),
    /// An ordered list, replaced as a whole.
    List(Vec<DocValue>),
    /// A mapping, merged key by key.
    Mapping(BTreeMap<String, DocValue>),
}

impl Default for DocValue {
    fn default() -> Self {
        Self::Mapping(BTreeMap::new())
    }
}

impl DocValue {
    /// An empty mapping.
    #[must_use]
    pub const fn mapping() -> Self {
        Self::Mapping(BTreeMap::new())
    }

    /// The null scalar.
    #[must_use]
    pub const fn null() -> Self {
        Self::Scalar(Scalar::Null)
    }

    /// Returns `true` for the null scalar.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(Scalar::Null))
    }

    /// Overlay `higher` onto `self`.
    ///
    /// Behaviour:
    /// - A mapping merged over a non-mapping first turns the target into an
    ///   empty mapping.
    /// - Mappings merge recursively; a `null` value removes the key.
    /// - Scalars and lists replace the target wholesale.
    pub fn merge(&mut self, higher: Self) {
        match higher {
            Self::Mapping(map) => self.merge_mapping(map),
            other @ (Self::Scalar(_) | Self::List(_)) => *self = other,
        }
    }

    fn merge_mapping(&mut self, higher: BTreeMap<String, Self>) {
        if !matches!(self, Self::Mapping(_)) {
            *self = Self::mapping();
        }
        let Self::Mapping(target) = self else {
            return;
        };
        for (key, value) in higher {
            if value.is_null() {
                target.remove(&key);
                continue;
            }
            target.entry(key).or_insert_with(Self::null).merge(value);
        }
    }

    /// Look up a key of a mapping.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Mapping(map) => map.get(key),
            Self::Scalar(_) | Self::List(_) => None,
        }
    }

    /// Follow `path` through nested mappings.
    #[must_use]
    pub fn get_path(&self, path: &[&str]) -> Option<&Self> {
        path.iter().try_fold(self, |node, key| node.get(key))
    }

    /// The string payload of a string scalar.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::String(s)) => Some(s),
            Self::Scalar(_) | Self::List(_) | Self::Mapping(_) => None,
        }
    }

    /// Returns `true` for mappings.
    #[must_use]
    pub const fn is_mapping(&self) -> bool {
        matches!(self, Self::Mapping(_))
    }
}

impl From<Value> for DocValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Scalar(Scalar::Null),
            Value::Bool(b) => Self::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Self::Scalar(Scalar::Number(n)),
            Value::String(s) => Self::Scalar(Scalar::String(s)),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Mapping(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<DocValue> for Value {
    fn from(value: DocValue) -> Self {
        match value {
            DocValue::Scalar(Scalar::Null) => Self::Null,
            DocValue::Scalar(Scalar::Bool(b)) => Self::Bool(b),
            DocValue::Scalar(Scalar::Number(n)) => Self::Number(n),
            DocValue::Scalar(Scalar::String(s)) => Self::String(s),
            DocValue::List(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            DocValue::Mapping(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&str> for DocValue {
    fn from(value: &str) -> Self {
        Self::Scalar(Scalar::String(value.to_owned()))
    }
}

impl From<String> for DocValue {
    fn from(value: String) -> Self {
        Self::Scalar(Scalar::String(value))
    }
}

impl From<bool> for DocValue {
    fn from(value: bool) -> Self {
        Self::Scalar(Scalar::Bool(value))
    }
}
