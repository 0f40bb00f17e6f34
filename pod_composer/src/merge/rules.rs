//! Pure functions combining one slot across two layers.

use std::collections::BTreeMap;

use indexmap::map::Entry;

use super::{LayerMerge, MergeScope};
use crate::{ComposeResult, Keyed, KeyedList};

/// Replace `lower` when `higher` is set.
pub fn replace_if_set<T>(lower: &mut Option<T>, higher: Option<T>) {
    if higher.is_some() {
        *lower = higher;
    }
}

/// Replace `lower` when `higher` is set and `is_set` accepts it.
///
/// Used for slots whose zero value means "inherit", such as an empty
/// resources block.
pub fn replace_if<T, F>(lower: &mut Option<T>, higher: Option<T>, is_set: F)
where
    F: Fn(&T) -> bool,
{
    if higher.as_ref().is_some_and(is_set) {
        *lower = higher;
    }
}

/// Replace a list slot as a whole when `higher` is non-empty.
pub fn replace_if_nonempty<T>(lower: &mut Vec<T>, higher: Vec<T>) {
    if !higher.is_empty() {
        *lower = higher;
    }
}

/// Replace an identity-bearing scalar.
///
/// # Errors
///
/// Fails through [`MergeScope::ensure_replaceable`] when both sides are set,
/// differ, and the higher layer is not override-capable.
pub fn replace_identity(
    lower: &mut Option<String>,
    higher: Option<String>,
    scope: &MergeScope<'_>,
) -> ComposeResult<()> {
    let Some(value) = higher else {
        return Ok(());
    };
    if let Some(existing) = lower.as_deref().filter(|existing| *existing != value) {
        scope.ensure_replaceable(existing, &value)?;
    }
    *lower = Some(value);
    Ok(())
}

/// Concatenate `higher` after `lower` without deduplication.
pub fn append<T>(lower: &mut Vec<T>, higher: Vec<T>) {
    lower.extend(higher);
}

/// Shallow key merge; keys in `higher` overwrite those in `lower`.
pub fn merge_map<K: Ord, V>(lower: &mut BTreeMap<K, V>, higher: BTreeMap<K, V>) {
    lower.extend(higher);
}

/// Match entries by key, merging matches recursively and appending new keys.
///
/// # Errors
///
/// Propagates the first error raised while merging a matched entry.
pub fn merge_keyed<T>(
    lower: &mut KeyedList<T>,
    higher: KeyedList<T>,
    scope: &MergeScope<'_>,
) -> ComposeResult<()>
where
    T: Keyed + LayerMerge,
{
    for entry in higher {
        match lower.entry(entry.key().to_owned()) {
            Entry::Occupied(mut slot) => {
                let entry_scope = scope.entry(slot.key());
                slot.get_mut().merge_layer(entry, &entry_scope)?;
            }
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::{Result, ensure};
    use rstest::rstest;

    use super::*;
    use crate::{ComposeError, LayerProvenance, PresetKey, VolumeMount};

    #[rstest]
    #[case(Some(1), None, Some(1))]
    #[case(Some(1), Some(2), Some(2))]
    #[case(None, Some(2), Some(2))]
    #[case(None, None, None)]
    fn replace_if_set_prefers_set_higher_values(
        #[case] lower: Option<u8>,
        #[case] higher: Option<u8>,
        #[case] expected: Option<u8>,
    ) {
        let mut slot = lower;
        replace_if_set(&mut slot, higher);
        assert_eq!(slot, expected);
    }

    #[rstest]
    fn append_keeps_duplicates_in_layer_order() {
        let mut env = vec!["A=1", "B=2"];
        append(&mut env, vec!["A=3"]);
        assert_eq!(env, ["A=1", "B=2", "A=3"]);
    }

    #[rstest]
    fn merge_map_overwrites_shared_keys() {
        let mut lower = BTreeMap::from([("name", "kb"), ("version", "7.4.0")]);
        merge_map(&mut lower, BTreeMap::from([("name", "renamed"), ("tier", "web")]));
        assert_eq!(
            lower,
            BTreeMap::from([("name", "renamed"), ("tier", "web"), ("version", "7.4.0")])
        );
    }

    #[rstest]
    #[case(LayerProvenance::User, true)]
    #[case(LayerProvenance::Defaults, false)]
    #[case(LayerProvenance::Addon(PresetKey::from_static("keystore")), false)]
    fn identity_replacement_depends_on_provenance(
        #[case] provenance: LayerProvenance,
        #[case] allowed: bool,
    ) {
        let scope = MergeScope::root(&provenance).field("image");
        let mut image = Some(String::from("repo/app:1"));
        let result = replace_identity(&mut image, Some(String::from("repo/app:2")), &scope);
        assert_eq!(result.is_ok(), allowed);
        if !allowed {
            assert!(matches!(
                result.as_ref().map_err(|e| &**e),
                Err(ComposeError::ConflictingIdentity { slot, .. }) if slot == "image"
            ));
            assert_eq!(image.as_deref(), Some("repo/app:1"));
        }
    }

    #[rstest]
    fn identical_identity_never_conflicts() {
        let provenance = LayerProvenance::Defaults;
        let scope = MergeScope::root(&provenance);
        let mut image = Some(String::from("repo/app:1"));
        let result = replace_identity(&mut image, Some(String::from("repo/app:1")), &scope);
        assert!(result.is_ok());
    }

    #[rstest]
    fn merge_keyed_merges_matches_and_appends_new_entries() -> Result<()> {
        let provenance = LayerProvenance::User;
        let scope = MergeScope::root(&provenance);
        let mut lower = KeyedList::new();
        lower.upsert(VolumeMount::new("config", "/etc/app"));
        let mut higher = KeyedList::new();
        higher.upsert(VolumeMount {
            read_only: Some(true),
            ..VolumeMount::named("config")
        });
        higher.upsert(VolumeMount::new("data", "/data"));

        merge_keyed(&mut lower, higher, &scope)?;

        let keys: Vec<&str> = lower.keys().collect();
        ensure!(keys == ["config", "data"], "unexpected order {keys:?}");
        let config = lower.get("config");
        ensure!(
            config.and_then(|m| m.mount_path.as_deref()) == Some("/etc/app"),
            "unset path should inherit"
        );
        ensure!(config.and_then(|m| m.read_only) == Some(true), "flag should merge in");
        Ok(())
    }
}
