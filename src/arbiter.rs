//! Action arbiter (spec.md §4.7): given a matched pair and the active
//! verb, decides which file is kept versus rewritten. Grounded on
//! `original_source/scanner.go`'s duplicate-resolution cascade,
//! generalized from its single `--prefer-newer` flag to the three-way
//! timestamp preference and the fuller protect/keep-eligibility gate.

use crate::options::{TimestampPref, Verb};
use crate::record::FileRecord;
use crate::rules::GlobRuleSet;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Both sides are unique, skipped, ignored, or a hardlink already
    /// ignored by `--ignore-hardlinks`: nothing to report or do.
    NoAction,
    /// Duplicate pair, but no verb is active: report only.
    ReportOnly { kept: usize, rewritten: usize },
    /// A mutation should be attempted, keeping `kept` and rewriting
    /// `rewritten` (indices into the caller's `(matched, current)` pair:
    /// 0 = matched, 1 = current).
    Mutate { kept: usize, rewritten: usize },
    /// Both sides protected, or neither is keep-eligible: no safe choice.
    Skip,
}

pub struct Arbiter {
    protect: Rc<GlobRuleSet>,
    keep: Rc<GlobRuleSet>,
    timestamps: TimestampPref,
}

impl Arbiter {
    pub fn new(protect: Rc<GlobRuleSet>, keep: Rc<GlobRuleSet>, timestamps: TimestampPref) -> Self {
        Arbiter { protect, keep, timestamps }
    }

    fn protected(&self, r: &FileRecord) -> bool {
        let protect = &self.protect;
        r.protected(|| protect.includes(&r.abs_path))
    }

    fn keep_eligible(&self, r: &FileRecord) -> bool {
        let keep = &self.keep;
        r.satisfies_keep(|| keep.includes(&r.abs_path))
    }

    /// `matched` is the pre-existing record, `current` the one the
    /// matcher just classified as its duplicate. `copyname_mode` records
    /// whether the match spec has copy-name active (first tiebreak).
    pub fn decide(
        &self,
        matched: &Rc<FileRecord>,
        current: &Rc<FileRecord>,
        verb: Verb,
        copyname_mode: bool,
    ) -> Disposition {
        if verb == Verb::None {
            return Disposition::ReportOnly { kept: 0, rewritten: 1 };
        }

        let c_can_be_kept = self.keep_eligible(current);
        let m_can_be_kept = self.keep_eligible(matched);
        let c_protected = self.protected(current);
        let m_protected = self.protected(matched);

        let can_swap = !m_protected && c_can_be_kept;
        let can_avoid_swap = !c_protected && m_can_be_kept;

        let swap = match (can_swap, can_avoid_swap) {
            (true, false) => true,
            (false, true) => false,
            (false, false) => return Disposition::Skip,
            (true, true) => self.break_tie(matched, current, copyname_mode),
        };

        if swap {
            Disposition::Mutate { kept: 1, rewritten: 0 }
        } else {
            Disposition::Mutate { kept: 0, rewritten: 1 }
        }
    }

    fn break_tie(&self, matched: &FileRecord, current: &FileRecord, copyname_mode: bool) -> bool {
        if copyname_mode && current.folded_name.len() < matched.folded_name.len() {
            return true;
        }
        if current.folded_parent == matched.folded_parent && current.folded_name < matched.folded_name {
            return true;
        }
        match (self.timestamps, current.mtime, matched.mtime) {
            (TimestampPref::PreferNewer, Some(c), Some(m)) => c > m,
            (TimestampPref::PreferOlder, Some(c), Some(m)) => c < m,
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::metadata::Metadata;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};

    fn mk(id: u64, path: &str, mtime: Option<SystemTime>) -> Rc<FileRecord> {
        Rc::new(FileRecord::new(id, PathBuf::from(path), PathBuf::from(path), PathBuf::from(path), Metadata::default(), mtime))
    }

    fn arbiter(timestamps: TimestampPref) -> Arbiter {
        Arbiter::new(Rc::new(GlobRuleSet::new(true)), Rc::new(GlobRuleSet::new(true)), timestamps)
    }

    #[test]
    fn no_verb_is_report_only() {
        let a = arbiter(TimestampPref::Ignore);
        let m = mk(1, "/a", None);
        let c = mk(2, "/b", None);
        assert!(matches!(a.decide(&m, &c, Verb::None, false), Disposition::ReportOnly { .. }));
    }

    #[test]
    fn default_keeps_matched_rewrites_current() {
        let a = arbiter(TimestampPref::Ignore);
        let m = mk(1, "/a", None);
        let c = mk(2, "/b", None);
        assert_eq!(a.decide(&m, &c, Verb::Link, false), Disposition::Mutate { kept: 0, rewritten: 1 });
    }

    #[test]
    fn same_directory_lexicographic_tiebreak_prefers_earlier_name() {
        let a = arbiter(TimestampPref::Ignore);
        let m = mk(1, "/dir/zeta.txt", None);
        let c = mk(2, "/dir/alpha.txt", None);
        assert_eq!(a.decide(&m, &c, Verb::Link, false), Disposition::Mutate { kept: 1, rewritten: 0 });
    }

    #[test]
    fn prefer_newer_swaps_to_newer_current() {
        let a = arbiter(TimestampPref::PreferNewer);
        let old = SystemTime::UNIX_EPOCH;
        let newer = old + Duration::from_secs(10);
        let m = mk(1, "/a/old.txt", Some(old));
        let c = mk(2, "/b/new.txt", Some(newer));
        assert_eq!(a.decide(&m, &c, Verb::Link, false), Disposition::Mutate { kept: 1, rewritten: 0 });
    }
}
