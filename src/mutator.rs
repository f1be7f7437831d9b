//! Mutator (spec.md §4.8): performs the filesystem mutation an arbiter
//! decision calls for, atomically via temp-file + rename. Grounded on
//! `original_source/scanner.go`'s `executeSwap`/temp-rename retry loop,
//! adapted to the three injectable primitives `{clone, link, copy}` plus
//! delete, each running under a read-lock of the destructive mutex
//! (`scandriver.rs` owns the `RwLock`; termination takes the write lock).

use crate::error::FdfError;
use crate::options::Verb;
use crate::reflink;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Link,
    Clone,
    Copy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Delete,
    Mutate(Primitive),
    /// Verb is a no-op for this pair (e.g. `--link` on an already-linked
    /// pair, or `--copy` without `--copy-unlinked` on an unlinked one).
    Nothing,
}

/// Chooses the mutation primitive for `verb` given whether `kept`/`rewritten`
/// already share an inode (spec.md §4.8's per-verb selection rules).
pub fn select_action(verb: Verb, already_hardlinked: bool, copy_unlinked: bool) -> Action {
    match verb {
        Verb::None => Action::Nothing,
        Verb::Delete => Action::Delete,
        Verb::Link => {
            if already_hardlinked {
                Action::Nothing
            } else {
                Action::Mutate(Primitive::Link)
            }
        },
        Verb::Split => {
            if already_hardlinked || copy_unlinked {
                Action::Mutate(Primitive::Copy)
            } else {
                Action::Nothing
            }
        },
        Verb::Clone => Action::Mutate(Primitive::Clone),
    }
}

/// Deletes `path`. Dry-run never touches the filesystem.
pub fn delete(path: &Path, dry_run: bool) -> Result<(), FdfError> {
    if dry_run {
        return Ok(());
    }
    fs::remove_file(path).map_err(FdfError::Io)
}

/// Runs `primitive(source, dest)` via a temp-file + atomic rename into
/// `dest`, retrying up to 3 times on `EEXIST` temp-name collisions.
pub fn mutate(primitive: Primitive, source: &Path, dest: &Path, dry_run: bool) -> Result<(), FdfError> {
    if dry_run {
        return Ok(());
    }
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));

    let mut last_err = None;
    for _ in 0..3 {
        let temp = unique_temp_name(dir);
        match run_primitive(primitive, source, &temp) {
            Ok(()) => {
                return fs::rename(&temp, dest).map_err(|e| {
                    let _ = fs::remove_file(&temp);
                    FdfError::Io(e)
                });
            },
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                last_err = Some(e);
                continue;
            },
            Err(e) => {
                let _ = fs::remove_file(&temp);
                return Err(FdfError::Io(e));
            },
        }
    }
    Err(FdfError::Io(last_err.unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::AlreadyExists, "temp name collision"))))
}

fn run_primitive(primitive: Primitive, source: &Path, temp: &Path) -> std::io::Result<()> {
    match primitive {
        Primitive::Link => fs::hard_link(source, temp),
        Primitive::Clone => reflink::reflink(source, temp),
        Primitive::Copy => fs::copy(source, temp).map(|_| ()),
    }
}

/// `.fdf-XXXX`-style temp name: created then immediately reused by name
/// only (the primitive itself creates the real file at that path), so
/// uniqueness just needs to survive concurrent runs in the same
/// directory, not represent an already-open file descriptor.
fn unique_temp_name(dir: &Path) -> PathBuf {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let pid = std::process::id();
    dir.join(format!(".fdf-{pid:x}-{n:x}"))
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn link_verb_selects_link_primitive_unless_already_linked() {
        assert_eq!(select_action(Verb::Link, false, false), Action::Mutate(Primitive::Link));
        assert_eq!(select_action(Verb::Link, true, false), Action::Nothing);
    }

    #[test]
    fn split_requires_existing_link_or_copy_unlinked() {
        assert_eq!(select_action(Verb::Split, false, false), Action::Nothing);
        assert_eq!(select_action(Verb::Split, false, true), Action::Mutate(Primitive::Copy));
        assert_eq!(select_action(Verb::Split, true, false), Action::Mutate(Primitive::Copy));
    }

    #[test]
    fn dry_run_never_touches_disk() {
        let dir = TempDir::new("mutator1").expect("tmp");
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        std::fs::write(&src, b"hello").unwrap();
        std::fs::write(&dest, b"world").unwrap();
        mutate(Primitive::Copy, &src, &dest, true).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"world");
    }

    #[test]
    fn copy_mutation_replaces_dest_atomically() {
        let dir = TempDir::new("mutator2").expect("tmp");
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        std::fs::write(&src, b"hello").unwrap();
        std::fs::write(&dest, b"world").unwrap();
        mutate(Primitive::Copy, &src, &dest, false).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello");
    }

    #[test]
    fn link_mutation_makes_dest_share_inode_with_source() {
        use std::os::unix::fs::MetadataExt;
        let dir = TempDir::new("mutator3").expect("tmp");
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        std::fs::write(&src, b"hello").unwrap();
        std::fs::write(&dest, b"world").unwrap();
        mutate(Primitive::Link, &src, &dest, false).unwrap();
        assert_eq!(fs::metadata(&src).unwrap().ino(), fs::metadata(&dest).unwrap().ino());
    }

    #[test]
    fn delete_removes_file_unless_dry_run() {
        let dir = TempDir::new("mutator4").expect("tmp");
        let f = dir.path().join("f");
        std::fs::write(&f, b"x").unwrap();
        delete(&f, true).unwrap();
        assert!(f.exists());
        delete(&f, false).unwrap();
        assert!(!f.exists());
    }
}
