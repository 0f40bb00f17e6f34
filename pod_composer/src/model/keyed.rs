//! Ordered associative storage for keyed-list slots.
//!
//! Containers, init containers, volumes and volume mounts are all lists whose
//! entries are unique by `name`. [`KeyedList`] keeps the contribution order of
//! a sequence and the uniqueness of a map in one place so merge code never has
//! to scan for matching names.

use std::fmt;

use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::de::Error as _;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Entries stored in a [`KeyedList`] expose a stable merge key.
pub trait Keyed {
    /// Returns the key identifying this entry within its list.
    fn key(&self) -> &str;
}

/// Raised when a keyed list receives two entries with the same key.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("duplicate entry named `{key}`")]
pub struct DuplicateKey {
    /// The repeated key.
    pub key: String,
}

/// Ordered sequence of entries that are unique by [`Keyed::key`].
///
/// Serialises as a plain sequence. Equality is order-sensitive because entry
/// order is part of the merge contract.
///
/// # Examples
///
/// ```
/// use pod_composer::{KeyedList, VolumeMount};
///
/// let mut mounts = KeyedList::new();
/// mounts.upsert(VolumeMount::new("config", "/etc/app"));
/// mounts.upsert(VolumeMount::new("data", "/var/lib/app"));
/// assert_eq!(mounts.keys().collect::<Vec<_>>(), ["config", "data"]);
/// assert!(mounts.try_insert(VolumeMount::new("data", "/tmp")).is_err());
/// ```
#[derive(Clone)]
pub struct KeyedList<T> {
    entries: IndexMap<String, T>,
}

impl<T> KeyedList<T> {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the list holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.get(key)
    }

    /// Returns `true` when an entry with `key` exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterate over entries in contribution order.
    pub fn iter(&self) -> indexmap::map::Values<'_, String, T> {
        self.entries.values()
    }

    /// Iterate mutably over entries in contribution order. Keys stay fixed.
    pub fn iter_mut(&mut self) -> indexmap::map::ValuesMut<'_, String, T> {
        self.entries.values_mut()
    }

    /// Iterate over keys in contribution order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub(crate) fn entry(&mut self, key: String) -> Entry<'_, String, T> {
        self.entries.entry(key)
    }
}

impl<T: Keyed> KeyedList<T> {
    /// Build a list from `entries`, rejecting repeated keys.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateKey`] naming the first repeated key.
    pub fn try_from_entries<I>(entries: I) -> Result<Self, DuplicateKey>
    where
        I: IntoIterator<Item = T>,
    {
        let mut list = Self::new();
        for entry in entries {
            list.try_insert(entry)?;
        }
        Ok(list)
    }

    /// Append `entry` unless its key is already present.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateKey`] when an entry with the same key exists; the
    /// list is left untouched.
    pub fn try_insert(&mut self, entry: T) -> Result<(), DuplicateKey> {
        match self.entries.entry(entry.key().to_owned()) {
            Entry::Occupied(slot) => Err(DuplicateKey {
                key: slot.key().clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(())
            }
        }
    }

    /// Insert `entry`, replacing an existing entry with the same key in place.
    ///
    /// Returns the replaced entry, if any. Position is preserved on replace.
    pub fn upsert(&mut self, entry: T) -> Option<T> {
        self.entries.insert(entry.key().to_owned(), entry)
    }
}

impl<T> Default for KeyedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq> PartialEq for KeyedList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len() && self.entries.iter().eq(other.entries.iter())
    }
}

impl<T: Eq> Eq for KeyedList<T> {}

impl<T: fmt::Debug> fmt::Debug for KeyedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.values()).finish()
    }
}

impl<'a, T> IntoIterator for &'a KeyedList<T> {
    type Item = &'a T;
    type IntoIter = indexmap::map::Values<'a, String, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

impl<T> IntoIterator for KeyedList<T> {
    type Item = T;
    type IntoIter = indexmap::map::IntoValues<String, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

impl<T: Serialize> Serialize for KeyedList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.entries.len()))?;
        for entry in self.entries.values() {
            seq.serialize_element(entry)?;
        }
        seq.end()
    }
}

impl<'de, T> Deserialize<'de> for KeyedList<T>
where
    T: Deserialize<'de> + Keyed,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<T>::deserialize(deserializer)?;
        Self::try_from_entries(entries).map_err(D::Error::custom)
    }
}
