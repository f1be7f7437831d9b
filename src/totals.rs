//! Totals aggregator (spec.md §3, §5): atomic counters updated from the
//! scan thread and read by the signal thread for a consistent snapshot.
//! Grounded on the teacher's `dupe.rs` counter fields, regrouped into
//! the richer scanned/unique/links/cloned/dupes/processed/skipped/errors
//! taxonomy and switched from plain integers to `AtomicU64` so the
//! signal-handling thread in `scandriver.rs` can read them without a lock.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct CountBytes {
    count: AtomicU64,
    bytes: AtomicU64,
}

impl CountBytes {
    fn add(&self, count: u64, bytes: u64) {
        self.count.fetch_add(count, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    fn sub(&self, count: u64, bytes: u64) {
        self.count.fetch_sub(count, Ordering::Relaxed);
        self.bytes.fetch_sub(bytes, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> (u64, u64) {
        (self.count.load(Ordering::Relaxed), self.bytes.load(Ordering::Relaxed))
    }
}

#[derive(Default)]
pub struct Totals {
    pub scanned: CountBytes,
    pub unique: CountBytes,
    pub links: CountBytes,
    pub cloned: CountBytes,
    pub dupes: CountBytes,
    pub processed: CountBytes,
    pub skipped: CountBytes,
    pub errors: AtomicU64,
}

impl Totals {
    pub fn new() -> Self {
        Totals::default()
    }

    pub fn scanned_one(&self, bytes: u64) {
        self.scanned.add(1, bytes);
    }

    pub fn unique_one(&self, bytes: u64) {
        self.unique.add(1, bytes);
    }

    pub fn link_one(&self, bytes: u64) {
        self.links.add(1, bytes);
    }

    pub fn dupe_one(&self, bytes: u64) {
        self.dupes.add(1, bytes);
    }

    pub fn processed_one(&self, bytes: u64) {
        self.processed.add(1, bytes);
    }

    pub fn skipped_one(&self, bytes: u64) {
        self.skipped.add(1, bytes);
    }

    /// A hardlinked duplicate that's deleted outright (`--delete` on an
    /// already-linked pair) leaves the `links` bucket it was counted
    /// into at match time, per `original_source/scanner.go`'s
    /// `Links.Remove` on a successful delete.
    pub fn unlink_one(&self, bytes: u64) {
        self.links.sub(1, bytes);
    }

    /// A plain content duplicate that's deleted outright leaves the
    /// `dupes` bucket `handle_outcome` put it in at match time, per
    /// `original_source/scanner.go`'s `Dupes.Remove` on a successful
    /// delete.
    pub fn dupe_resolved_one(&self, bytes: u64) {
        self.dupes.sub(1, bytes);
    }

    /// `--link` turns a plain content duplicate into a hardlink:
    /// `Dupes.Remove` + `Links.Add` in `original_source/scanner.go`'s
    /// `VerbMakeLinks` case. Only reachable when the pair wasn't already
    /// linked, so the file is always in `dupes`, never `links`, going in.
    pub fn link_established_one(&self, bytes: u64) {
        self.dupes.sub(1, bytes);
        self.links.add(1, bytes);
    }

    /// `--copy` splits an existing hardlink back into its own file:
    /// `Links.Remove` + `Dupes.Add` in `original_source/scanner.go`'s
    /// `VerbSplitLinks` case.
    pub fn link_split_one(&self, bytes: u64) {
        self.links.sub(1, bytes);
        self.dupes.add(1, bytes);
    }

    /// `--clone` on a plain content duplicate: leaves `dupes`, lands in
    /// `cloned` (`VerbClone`'s non-linked branch).
    pub fn cloned_from_dupe_one(&self, bytes: u64) {
        self.dupes.sub(1, bytes);
        self.cloned.add(1, bytes);
    }

    /// `--clone` on an already-hardlinked pair: leaves `links`, lands in
    /// `cloned` (`VerbClone`'s linked branch).
    pub fn cloned_from_link_one(&self, bytes: u64) {
        self.links.sub(1, bytes);
        self.cloned.add(1, bytes);
    }

    pub fn error_one(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Human-readable summary, in the teacher's `{label} N files, M bytes`
    /// cadence (see `ui.rs`).
    pub fn summary(&self) -> String {
        let (sc, scb) = self.scanned.snapshot();
        let (un, unb) = self.unique.snapshot();
        let (li, lib_) = self.links.snapshot();
        let (cl, clb) = self.cloned.snapshot();
        let (du, dub) = self.dupes.snapshot();
        let (pr, prb) = self.processed.snapshot();
        let (sk, skb) = self.skipped.snapshot();
        let er = self.errors.load(Ordering::Relaxed);
        format!(
            "scanned {sc} files / {scb} bytes\n\
             unique {un} / {unb}\n\
             links {li} / {lib_}\n\
             cloned {cl} / {clb}\n\
             duplicates {du} / {dub}\n\
             processed {pr} / {prb}\n\
             skipped {sk} / {skb}\n\
             errors {er}"
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn counters_accumulate_independently() {
        let t = Totals::new();
        t.scanned_one(10);
        t.scanned_one(5);
        t.unique_one(10);
        assert_eq!(t.scanned.snapshot(), (2, 15));
        assert_eq!(t.unique.snapshot(), (1, 10));
    }

    #[test]
    fn unlink_reverses_link_count() {
        let t = Totals::new();
        t.link_one(4);
        t.link_one(4);
        t.unlink_one(4);
        assert_eq!(t.links.snapshot(), (1, 4));
    }

    #[test]
    fn errors_counted_without_bytes() {
        let t = Totals::new();
        t.error_one();
        t.error_one();
        assert_eq!(t.errors.load(Ordering::Relaxed), 2);
    }
}
