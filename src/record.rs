//! `FileRecord` (spec.md §3): one per scanned regular file that passes
//! the size floor. Owned by the `Index` once inserted; the matcher and
//! arbiter only ever hold transient `Rc` handles during a single call
//! (spec.md §9 "Cyclic-risk ownership" — no back-references, flat
//! lifetimes).

use crate::digest::Digest;
use crate::metadata::Metadata;
use std::cell::{Cell, RefCell};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DigestState {
    Absent,
    Present(Digest),
    Failed,
}

/// `unknown` / `true` / `false`, evaluated on first query and never
/// changed afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cached {
    Unknown,
    True,
    False,
}

impl Cached {
    fn get_or_eval(cell: &Cell<Cached>, eval: impl FnOnce() -> bool) -> bool {
        match cell.get() {
            Cached::True => true,
            Cached::False => false,
            Cached::Unknown => {
                let v = eval();
                cell.set(if v { Cached::True } else { Cached::False });
                v
            },
        }
    }
}

#[derive(Debug)]
pub struct FileRecord {
    pub id: u64,
    pub abs_path: PathBuf,
    /// Display path relative to the working directory.
    pub display_path: PathBuf,
    /// Path suffix relative to the specific input root this file was
    /// found under.
    pub path_suffix: PathBuf,
    pub folded_name: String,
    pub folded_parent: String,
    pub metadata: Metadata,
    pub mtime: Option<SystemTime>,

    digest: RefCell<DigestState>,
    protected: Cell<Cached>,
    keep_ok: Cell<Cached>,
}

impl FileRecord {
    pub fn new(
        id: u64,
        abs_path: PathBuf,
        display_path: PathBuf,
        path_suffix: PathBuf,
        metadata: Metadata,
        mtime: Option<SystemTime>,
    ) -> Self {
        let folded_name = fold_basename(&abs_path);
        let folded_parent = abs_path
            .parent()
            .map(fold_basename)
            .unwrap_or_default();
        FileRecord {
            id,
            abs_path,
            display_path,
            path_suffix,
            folded_name,
            folded_parent,
            metadata,
            mtime,
            digest: RefCell::new(DigestState::Absent),
            protected: Cell::new(Cached::Unknown),
            keep_ok: Cell::new(Cached::Unknown),
        }
    }

    pub fn size(&self) -> u64 {
        self.metadata.size
    }

    pub fn has_digest(&self) -> bool {
        matches!(*self.digest.borrow(), DigestState::Present(_))
    }

    pub fn digest_failed(&self) -> bool {
        matches!(*self.digest.borrow(), DigestState::Failed)
    }

    pub fn digest(&self) -> Option<Digest> {
        match *self.digest.borrow() {
            DigestState::Present(d) => Some(d),
            _ => None,
        }
    }

    pub fn set_digest(&self, d: Digest) {
        *self.digest.borrow_mut() = DigestState::Present(d);
    }

    pub fn mark_digest_failed(&self) {
        // Sticky: once failed, never retried for the rest of the run.
        *self.digest.borrow_mut() = DigestState::Failed;
    }

    pub fn protected(&self, eval: impl FnOnce() -> bool) -> bool {
        Cached::get_or_eval(&self.protected, eval)
    }

    pub fn satisfies_keep(&self, eval: impl FnOnce() -> bool) -> bool {
        Cached::get_or_eval(&self.keep_ok, eval)
    }
}

fn fold_basename(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().to_lowercase()).unwrap_or_default()
}

/// Identity wrapper so records can live in `HashSet`/`HashMap` buckets by
/// pointer identity (`id`) rather than structural equality — several
/// distinct records can share every attribute except path.
#[derive(Clone)]
pub struct RecordHandle(pub Rc<FileRecord>);

impl PartialEq for RecordHandle {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}
impl Eq for RecordHandle {}
impl Hash for RecordHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state)
    }
}

impl std::fmt::Debug for RecordHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecordHandle({})", self.0.abs_path.display())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn mk(id: u64, path: &str) -> Rc<FileRecord> {
        Rc::new(FileRecord::new(
            id,
            PathBuf::from(path),
            PathBuf::from(path),
            PathBuf::from(path),
            Metadata::default(),
            None,
        ))
    }

    #[test]
    fn folds_name_and_parent() {
        let r = mk(1, "/tmp/Dir/FILE.TXT");
        assert_eq!(r.folded_name, "file.txt");
        assert_eq!(r.folded_parent, "dir");
    }

    #[test]
    fn protected_cache_evaluates_once() {
        let r = mk(2, "/tmp/a");
        let calls = Cell::new(0);
        assert!(r.protected(|| {
            calls.set(calls.get() + 1);
            true
        }));
        assert!(r.protected(|| {
            calls.set(calls.get() + 1);
            false // would flip the answer if re-evaluated
        }));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn record_handle_equality_is_by_id() {
        let a = RecordHandle(mk(3, "/tmp/a"));
        let b = RecordHandle(mk(3, "/tmp/b"));
        assert_eq!(a, b);
    }
}
