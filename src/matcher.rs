//! Matcher (spec.md §4.6): given a candidate file, builds a query from
//! the active match fields, retrieves candidates from the `Index`, and
//! escalates through protection/copy-name/range filters, hardlink
//! short-circuit, and on-demand digest + byte compare to decide whether
//! the candidate is unique or a duplicate of some already-seen record.
//! Grounded on `original_source/scanner.go`'s `checkCandidates` and
//! `findDuplicate`.

use crate::bytecmp;
use crate::copyname;
use crate::digest::{self, HashKey};
use crate::error::FdfError;
use crate::index::{Fields, Index};
use crate::metadata::Metadata;
use crate::options::{Accessor, MatchSpec};
use crate::record::FileRecord;
use crate::rules::GlobRuleSet;
use std::path::Path;
use std::rc::Rc;

#[derive(Debug)]
pub enum Outcome {
    Ignored,
    Skipped(u64),
    /// Digest computation failed for the candidate; counted as an error,
    /// never inserted (it could never be content-matched anyway).
    Error,
    Unique(Rc<FileRecord>),
    Matched { matched: Rc<FileRecord>, current: Rc<FileRecord>, hardlink: bool },
}

pub struct Matcher {
    index: Index,
    match_spec: MatchSpec,
    exclude: GlobRuleSet,
    protect: Rc<GlobRuleSet>,
    digest_key: HashKey,
    skip_header: u64,
    skip_footer: u64,
    min_size: u64,
    next_id: u64,
}

impl Matcher {
    pub fn new(
        match_spec: MatchSpec,
        exclude: GlobRuleSet,
        protect: Rc<GlobRuleSet>,
        digest_key: HashKey,
        skip_header: u64,
        skip_footer: u64,
        min_size: u64,
    ) -> Self {
        Matcher {
            index: Index::new(),
            match_spec,
            exclude,
            protect,
            digest_key,
            skip_header,
            skip_footer,
            min_size,
            next_id: 0,
        }
    }

    fn is_protected(&self, r: &FileRecord) -> bool {
        let protect = &self.protect;
        r.protected(|| protect.includes(&r.abs_path))
    }

    /// Re-points the index's entry for an equivalence class from `old` to
    /// `new` after the arbiter swaps which side is kept. Without this, a
    /// class whose anchor record gets rewritten (e.g. deleted) would leave
    /// later duplicates comparing against a record no longer backed by a
    /// real file.
    pub fn reanchor(&mut self, old: &Rc<FileRecord>, new: &Rc<FileRecord>) {
        self.index.remove(old);
        self.index.insert(new.clone());
    }

    /// Steps 1-15 of spec.md §4.6. `hardlink_only` is set by the driver
    /// when the active verb is `--copy` without `--copy-unlinked` (step
    /// 11's "hardlink-only mode").
    pub fn process(
        &mut self,
        abs_path: &Path,
        display_path: &Path,
        path_suffix: &Path,
        hardlink_only: bool,
    ) -> Result<Outcome, FdfError> {
        if !self.exclude.includes(abs_path) {
            return Ok(Outcome::Ignored);
        }

        let meta = std::fs::symlink_metadata(abs_path).map_err(|e| FdfError::traversal(abs_path, e))?;
        if meta.is_dir() || meta.file_type().is_symlink() {
            return Ok(Outcome::Ignored);
        }

        let metadata = Metadata::new(&meta);
        if metadata.size < self.min_size {
            return Ok(Outcome::Skipped(metadata.size));
        }

        let id = self.next_id;
        self.next_id += 1;
        let mtime = Metadata::mtime(&meta);
        let candidate = Rc::new(FileRecord::new(
            id,
            abs_path.to_path_buf(),
            display_path.to_path_buf(),
            path_suffix.to_path_buf(),
            metadata,
            mtime,
        ));

        let fields = self.query_fields();
        let key = Index::key_for(fields, &candidate);
        let mut candidates = self.index.query(fields, &key);

        if self.is_protected(&candidate) {
            candidates.retain(|c| !self.is_protected(c));
        }

        if self.match_spec.copyname {
            candidates.retain(|c| copyname::is_copy_name(&c.folded_name, &candidate.folded_name));
        } else if self.match_spec.namesuffix {
            candidates.retain(|c| copyname::is_name_suffix(&c.folded_name, &candidate.folded_name));
        } else if self.match_spec.nameprefix {
            candidates.retain(|c| copyname::is_name_prefix(&c.folded_name, &candidate.folded_name));
        }

        for (accessor, range) in self.match_spec.post_filters() {
            candidates.retain(|c| range.equal(&access(accessor, c), &access(accessor, &candidate)));
        }

        if let Some(hardlinked) =
            candidates.iter().find(|c| c.metadata.link_identity() == candidate.metadata.link_identity())
        {
            let hardlinked = hardlinked.clone();
            return Ok(Outcome::Matched { matched: hardlinked, current: candidate, hardlink: true });
        }

        if hardlink_only {
            self.index.insert(candidate.clone());
            return Ok(Outcome::Unique(candidate));
        }

        if !self.match_spec.content {
            if let Some(m) = candidates.into_iter().next() {
                return Ok(Outcome::Matched { matched: m, current: candidate, hardlink: false });
            }
            self.index.insert(candidate.clone());
            return Ok(Outcome::Unique(candidate));
        }

        self.content_match(candidate, candidates)
    }

    fn query_fields(&self) -> Fields {
        let mut f = Fields::empty();
        if self.match_spec.exact_name() {
            f |= Fields::NAME;
        }
        if self.match_spec.exact_parent() {
            f |= Fields::PARENT;
        }
        if self.match_spec.relpath {
            f |= Fields::PATH_SUFFIX;
        }
        if self.match_spec.size {
            f |= Fields::SIZE;
        }
        f
    }

    fn content_match(&mut self, candidate: Rc<FileRecord>, candidates: Vec<Rc<FileRecord>>) -> Result<Outcome, FdfError> {
        if candidate.has_digest() {
            let fields = Fields::SIZE | Fields::DIGEST;
            let key = Index::key_for(fields, &candidate);
            for other in self.index.query(fields, &key) {
                if self.bytes_equal(&other, &candidate) {
                    return Ok(Outcome::Matched { matched: other, current: candidate, hardlink: false });
                }
            }
            self.index.insert(candidate.clone());
            return Ok(Outcome::Unique(candidate));
        }
        self.check_candidates(candidate, candidates)
    }

    fn check_candidates(&mut self, candidate: Rc<FileRecord>, candidates: Vec<Rc<FileRecord>>) -> Result<Outcome, FdfError> {
        if candidates.is_empty() {
            self.index.insert(candidate.clone());
            return Ok(Outcome::Unique(candidate));
        }

        let c_digest = match digest::digest_file(&candidate.abs_path, &self.digest_key, self.skip_header, self.skip_footer) {
            Ok(d) => {
                candidate.set_digest(d);
                d
            },
            Err(_) => {
                candidate.mark_digest_failed();
                return Ok(Outcome::Error);
            },
        };

        for other in &candidates {
            if !other.has_digest() && !other.digest_failed() {
                match digest::digest_file(&other.abs_path, &self.digest_key, self.skip_header, self.skip_footer) {
                    Ok(d) => {
                        other.set_digest(d);
                        // Re-project into the digest-bearing combos now
                        // that the digest is present; idempotent for
                        // every combo that doesn't include DIGEST.
                        self.index.insert(other.clone());
                    },
                    Err(_) => {
                        other.mark_digest_failed();
                        continue;
                    },
                }
            }
            if let Some(od) = other.digest() {
                if od == c_digest && self.bytes_equal(other, &candidate) {
                    return Ok(Outcome::Matched { matched: other.clone(), current: candidate, hardlink: false });
                }
            }
        }

        self.index.insert(candidate.clone());
        Ok(Outcome::Unique(candidate))
    }

    fn bytes_equal(&self, a: &FileRecord, b: &FileRecord) -> bool {
        bytecmp::files_equal(&a.abs_path, &b.abs_path, self.skip_header, self.skip_footer, self.skip_header, self.skip_footer)
    }
}

fn access(accessor: Accessor, r: &FileRecord) -> String {
    match accessor {
        Accessor::FoldedName => r.folded_name.clone(),
        Accessor::FoldedParent => r.folded_parent.clone(),
        Accessor::DirPath => r.abs_path.parent().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::digest::random_key;
    use tempdir::TempDir;

    fn matcher(spec: &str) -> Matcher {
        Matcher::new(
            MatchSpec::parse(spec).unwrap(),
            GlobRuleSet::new(true),
            Rc::new(GlobRuleSet::new(true)),
            random_key(),
            0,
            0,
            1,
        )
    }

    #[test]
    fn first_file_is_unique() {
        let dir = TempDir::new("matcher1").expect("tmp");
        let a = dir.path().join("a.txt");
        std::fs::write(&a, b"hello").unwrap();
        let mut m = matcher("content");
        match m.process(&a, &a, Path::new("a.txt"), false).unwrap() {
            Outcome::Unique(_) => {},
            _ => panic!("expected unique"),
        }
    }

    #[test]
    fn identical_content_matches_on_second_file() {
        let dir = TempDir::new("matcher2").expect("tmp");
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, b"hello").unwrap();
        std::fs::write(&b, b"hello").unwrap();
        let mut m = matcher("content");
        m.process(&a, &a, Path::new("a.txt"), false).unwrap();
        match m.process(&b, &b, Path::new("b.txt"), false).unwrap() {
            Outcome::Matched { hardlink, .. } => assert!(!hardlink),
            _ => panic!("expected a match"),
        }
    }

    #[test]
    fn different_content_is_unique() {
        let dir = TempDir::new("matcher3").expect("tmp");
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, b"hello").unwrap();
        std::fs::write(&b, b"world").unwrap();
        let mut m = matcher("content");
        m.process(&a, &a, Path::new("a.txt"), false).unwrap();
        match m.process(&b, &b, Path::new("b.txt"), false).unwrap() {
            Outcome::Unique(_) => {},
            _ => panic!("expected unique"),
        }
    }

    #[test]
    fn below_min_size_is_skipped() {
        let dir = TempDir::new("matcher4").expect("tmp");
        let a = dir.path().join("empty");
        std::fs::write(&a, b"").unwrap();
        let mut m = matcher("content");
        match m.process(&a, &a, Path::new("empty"), false).unwrap() {
            Outcome::Skipped(0) => {},
            _ => panic!("expected skipped"),
        }
    }

    #[test]
    fn excluded_path_is_ignored() {
        let dir = TempDir::new("matcher5").expect("tmp");
        let a = dir.path().join("a.txt");
        std::fs::write(&a, b"hello").unwrap();
        let mut exclude = GlobRuleSet::new(true);
        exclude.add(a.to_str().unwrap(), false).unwrap();
        let mut m = Matcher::new(
            MatchSpec::parse("content").unwrap(),
            exclude,
            Rc::new(GlobRuleSet::new(true)),
            random_key(),
            0,
            0,
            1,
        );
        match m.process(&a, &a, Path::new("a.txt"), false).unwrap() {
            Outcome::Ignored => {},
            _ => panic!("expected ignored"),
        }
    }

    #[test]
    fn size_only_match_collapses_different_content() {
        let dir = TempDir::new("matcher6").expect("tmp");
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, b"abcd").unwrap();
        std::fs::write(&b, b"wxyz").unwrap();
        let mut m = matcher("size");
        m.process(&a, &a, Path::new("a.txt"), false).unwrap();
        match m.process(&b, &b, Path::new("b.txt"), false).unwrap() {
            Outcome::Matched { hardlink, .. } => assert!(!hardlink),
            _ => panic!("expected a size match despite different content"),
        }
    }
}
