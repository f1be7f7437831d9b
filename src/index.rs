//! Multi-field index (spec.md §4.5): maps composite attribute keys
//! (subsets of `{name, parent, path-suffix, size, digest}`) to sets of
//! records. Insert/remove touch every materialized key (O(subsets));
//! query is a single map lookup. Grounded on
//! `original_source/db.go`'s `queryGenerators` bitmask powerset,
//! generalized from 3 fields to 5 and from zero-valued Go structs to
//! explicit `Option<T>` fields so "field not part of this key" can never
//! be confused with "field's real value happens to be empty".

use crate::digest::Digest;
use crate::record::{FileRecord, RecordHandle};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::rc::Rc;

/// Which of the five query attributes a composite key constrains.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Fields(u8);

impl Fields {
    pub const NAME: Fields = Fields(0b00001);
    pub const PARENT: Fields = Fields(0b00010);
    pub const PATH_SUFFIX: Fields = Fields(0b00100);
    pub const SIZE: Fields = Fields(0b01000);
    pub const DIGEST: Fields = Fields(0b10000);

    pub const fn empty() -> Self {
        Fields(0)
    }

    pub fn contains(self, other: Fields) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Fields {
    type Output = Fields;
    fn bitor(self, rhs: Fields) -> Fields {
        Fields(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Fields {
    fn bitor_assign(&mut self, rhs: Fields) {
        self.0 |= rhs.0;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CompositeKey {
    name: Option<String>,
    parent: Option<String>,
    path_suffix: Option<PathBuf>,
    size: Option<u64>,
    digest: Option<Digest>,
}

impl CompositeKey {
    fn project(fields: Fields, r: &FileRecord) -> Self {
        CompositeKey {
            name: fields.contains(Fields::NAME).then(|| r.folded_name.clone()),
            parent: fields.contains(Fields::PARENT).then(|| r.folded_parent.clone()),
            // The directory component only: `relpath` anchors same-named
            // mirrored directories across separate input roots together
            // (spec.md §8 scenario 6's `a/fizz1`/`a/fizz2` sharing one
            // equivalence class), not the filename within them — that's
            // `name`'s job, matched independently if also requested.
            path_suffix: fields
                .contains(Fields::PATH_SUFFIX)
                .then(|| r.path_suffix.parent().map(PathBuf::from).unwrap_or_default()),
            size: fields.contains(Fields::SIZE).then(|| r.size()),
            digest: fields.contains(Fields::DIGEST).then(|| r.digest()).flatten(),
        }
    }
}

/// All field combinations materialized at startup: the full powerset of
/// the five singleton fields, minus combinations violating
/// `digest ⇒ size` and `path-suffix ⇒ parent`.
fn materialized_combos() -> Vec<Fields> {
    let singles = [Fields::NAME, Fields::PARENT, Fields::PATH_SUFFIX, Fields::SIZE, Fields::DIGEST];
    let mut combos = Vec::new();
    for bits in 1u8..(1 << singles.len()) {
        let mut combo = Fields::empty();
        for (i, f) in singles.iter().enumerate() {
            if bits & (1 << i) != 0 {
                combo |= *f;
            }
        }
        if combo.contains(Fields::DIGEST) && !combo.contains(Fields::SIZE) {
            continue;
        }
        if combo.contains(Fields::PATH_SUFFIX) && !combo.contains(Fields::PARENT) {
            continue;
        }
        combos.push(combo);
    }
    combos
}

pub struct Index {
    combos: Vec<Fields>,
    buckets: HashMap<CompositeKey, HashSet<RecordHandle>>,
}

impl Index {
    pub fn new() -> Self {
        Index { combos: materialized_combos(), buckets: HashMap::new() }
    }

    pub fn insert(&mut self, r: Rc<FileRecord>) {
        let handle = RecordHandle(r.clone());
        for &combo in &self.combos {
            let key = CompositeKey::project(combo, &r);
            self.buckets.entry(key).or_default().insert(handle.clone());
        }
    }

    pub fn remove(&mut self, r: &Rc<FileRecord>) {
        let handle = RecordHandle(r.clone());
        for &combo in &self.combos {
            let key = CompositeKey::project(combo, r);
            if let Some(set) = self.buckets.get_mut(&key) {
                set.remove(&handle);
            }
        }
    }

    /// Single-map lookup for the exact field combination the caller
    /// supplies. `fields` must be one of the materialized combos (any
    /// non-digest subset always is, by construction of the matcher's
    /// queries; digest-bearing queries always pair digest with size).
    pub fn query(&self, fields: Fields, key: &CompositeKey) -> Vec<Rc<FileRecord>> {
        debug_assert_eq!(Self::key_fields(key), fields);
        self.buckets.get(key).map(|set| set.iter().map(|h| h.0.clone()).collect()).unwrap_or_default()
    }

    fn key_fields(key: &CompositeKey) -> Fields {
        let mut f = Fields::empty();
        if key.name.is_some() {
            f |= Fields::NAME;
        }
        if key.parent.is_some() {
            f |= Fields::PARENT;
        }
        if key.path_suffix.is_some() {
            f |= Fields::PATH_SUFFIX;
        }
        if key.size.is_some() {
            f |= Fields::SIZE;
        }
        if key.digest.is_some() {
            f |= Fields::DIGEST;
        }
        f
    }

    pub fn key_for(fields: Fields, r: &FileRecord) -> CompositeKey {
        CompositeKey::project(fields, r)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::metadata::Metadata;
    use std::path::PathBuf;

    fn mk(id: u64, name: &str, size: u64) -> Rc<FileRecord> {
        let mut m = Metadata::default();
        m.size = size;
        Rc::new(FileRecord::new(
            id,
            PathBuf::from(format!("/tmp/{name}")),
            PathBuf::from(name),
            PathBuf::from(name),
            m,
            None,
        ))
    }

    #[test]
    fn insert_then_query_by_size() {
        let mut idx = Index::new();
        let r = mk(1, "a.txt", 42);
        idx.insert(r.clone());
        let key = Index::key_for(Fields::SIZE, &r);
        let found = idx.query(Fields::SIZE, &key);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 1);
    }

    #[test]
    fn remove_clears_all_materialized_keys() {
        let mut idx = Index::new();
        let r = mk(2, "b.txt", 7);
        idx.insert(r.clone());
        idx.remove(&r);
        let key = Index::key_for(Fields::SIZE, &r);
        assert!(idx.query(Fields::SIZE, &key).is_empty());
        let key = Index::key_for(Fields::NAME, &r);
        assert!(idx.query(Fields::NAME, &key).is_empty());
    }

    #[test]
    fn digest_without_size_never_materialized() {
        let combos = materialized_combos();
        assert!(combos.iter().all(|c| !c.contains(Fields::DIGEST) || c.contains(Fields::SIZE)));
        assert!(combos.iter().all(|c| !c.contains(Fields::PATH_SUFFIX) || c.contains(Fields::PARENT)));
    }

    #[test]
    fn every_record_is_a_member_of_its_own_projected_key() {
        let mut idx = Index::new();
        let r = mk(3, "c.txt", 99);
        idx.insert(r.clone());
        for &combo in &idx.combos {
            let key = Index::key_for(combo, &r);
            let found = idx.query(combo, &key);
            assert!(found.iter().any(|f| f.id == r.id), "missing from combo {combo:?}");
        }
    }
}
