//! Scan driver (spec.md §4.9, §5): walks each input directory once,
//! feeding every regular file to the matcher and, when a verb is set,
//! to the arbiter and mutator. Owns the destructive-exclusion lock and
//! the atomic totals. Grounded on `original_source/scanner.go`'s `Scan`
//! walk, rebuilt on `std::fs::read_dir` recursion instead of
//! `filepath.Walk` and on a `ctrlc`-driven signal thread instead of the
//! Go build's signal channel.

use crate::arbiter::{Arbiter, Disposition};
use crate::error::FdfError;
use crate::matcher::{Matcher, Outcome};
use crate::mutator::{self, Action, Primitive};
use crate::options::{RunConfig, Verb};
use crate::totals::Totals;
use crate::ui::ScanListener;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Arc, RwLock};

#[cfg(feature = "json")]
use crate::json::ReportBuilder;

/// Silently skipped Apple-platform housekeeping files (no warning line),
/// ported from `original_source/scanner.go`'s `silentSkip` set.
const SILENT_DOTFILES: &[&str] =
    &[".DS_Store", ".DocumentRevisions-V100", ".Spotlight-V100", ".TemporaryItems", ".Trashes", ".fseventsd"];

pub struct ScanDriver {
    matcher: Matcher,
    arbiter: Arbiter,
    config_verb: Verb,
    dry_run: bool,
    copy_unlinked: bool,
    ignore_hardlinks: bool,
    copyname_mode: bool,
    content_mode: bool,
    totals: Arc<Totals>,
    lock: Arc<RwLock<()>>,
    #[cfg(feature = "json")]
    report: Option<ReportBuilder>,
}

impl ScanDriver {
    pub fn new(matcher: Matcher, arbiter: Arbiter, config: &RunConfig, totals: Arc<Totals>, lock: Arc<RwLock<()>>) -> Self {
        ScanDriver {
            matcher,
            arbiter,
            config_verb: config.verb,
            dry_run: config.dry_run,
            copy_unlinked: config.copy_unlinked,
            ignore_hardlinks: config.ignore_hardlinks,
            copyname_mode: config.match_spec.copyname,
            content_mode: config.match_spec.content,
            totals,
            lock,
            #[cfg(feature = "json")]
            report: config.json_report.as_ref().map(|_| ReportBuilder::new()),
        }
    }

    #[cfg(feature = "json")]
    pub fn take_report(&mut self) -> Option<crate::json::Report> {
        self.report.take().map(ReportBuilder::finish)
    }

    pub fn totals(&self) -> &Arc<Totals> {
        &self.totals
    }

    pub fn run_input(&mut self, root: &Path, recursive: bool, listener: &mut dyn ScanListener) -> Result<(), FdfError> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        self.walk(root, root, &cwd, recursive, listener)
    }

    fn walk(&mut self, dir: &Path, root: &Path, cwd: &Path, recursive: bool, listener: &mut dyn ScanListener) -> Result<(), FdfError> {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                listener.notice(&format!("{}: {e}", dir.display()));
                return Ok(());
            },
        };

        // `filepath.Walk` visits each directory's children in lexical
        // filename order; `read_dir` makes no such guarantee, so sort
        // explicitly to match.
        let mut entries: Vec<_> = entries.collect();
        entries.sort_by(|a, b| {
            let a = a.as_ref().map(|e| e.file_name());
            let b = b.as_ref().map(|e| e.file_name());
            a.ok().cmp(&b.ok())
        });

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    listener.notice(&format!("{}: {e}", dir.display()));
                    continue;
                },
            };
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();

            if let Some(rest) = name.strip_prefix('.') {
                if rest.is_empty() || SILENT_DOTFILES.contains(&name.as_ref()) {
                    continue;
                }
                listener.notice(&format!("skipping dotfile {}", path.display()));
                continue;
            }

            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(e) => {
                    listener.notice(&format!("{}: {e}", path.display()));
                    continue;
                },
            };

            if file_type.is_symlink() {
                // Directory symlinks prune the subtree; file symlinks are
                // ignored entirely (spec.md §4.9).
                continue;
            }
            if file_type.is_dir() {
                if recursive {
                    self.walk(&path, root, cwd, recursive, listener)?;
                }
                continue;
            }

            // Cooperative suspension point: a no-op on this preemptively
            // scheduled runtime, but kept so the contract holds even if
            // the scheduler changes (spec.md §9).
            std::thread::yield_now();

            let display_path = path.strip_prefix(cwd).unwrap_or(&path).to_path_buf();
            let path_suffix = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            let hardlink_only = self.config_verb == Verb::Split && !self.copy_unlinked;

            match self.matcher.process(&path, &display_path, &path_suffix, hardlink_only) {
                Ok(outcome) => self.handle_outcome(outcome, listener),
                Err(e) => {
                    listener.notice(&e.to_string());
                    self.totals.error_one();
                },
            }
            listener.file_progress(&path, &self.totals);
        }
        Ok(())
    }

    fn handle_outcome(&mut self, outcome: Outcome, listener: &mut dyn ScanListener) {
        match outcome {
            Outcome::Ignored => {},
            Outcome::Skipped(size) => self.totals.skipped_one(size),
            Outcome::Error => self.totals.error_one(),
            Outcome::Unique(r) => {
                self.totals.scanned_one(r.size());
                self.totals.unique_one(r.size());
            },
            Outcome::Matched { matched, current, hardlink } => {
                self.totals.scanned_one(current.size());
                if hardlink {
                    self.totals.link_one(current.size());
                    if self.ignore_hardlinks {
                        return;
                    }
                } else {
                    self.totals.dupe_one(current.size());
                }
                listener.duplicate_found(&matched.abs_path, &current.abs_path);

                #[cfg(feature = "json")]
                if let Some(report) = &mut self.report {
                    report.record_match(self.content_mode, matched.id, &matched.display_path, &current.display_path);
                }

                if hardlink && self.config_verb == Verb::Link {
                    listener.hardlinked(&matched.abs_path, &current.abs_path);
                    return;
                }

                let disposition = self.arbiter.decide(&matched, &current, self.config_verb, self.copyname_mode);
                self.apply(disposition, matched, current, hardlink, listener);
            },
        }
    }

    fn apply(&mut self, disposition: Disposition, matched: Rc<crate::record::FileRecord>, current: Rc<crate::record::FileRecord>, hardlink: bool, listener: &mut dyn ScanListener) {
        match disposition {
            Disposition::NoAction | Disposition::ReportOnly { .. } => {},
            Disposition::Skip => {},
            Disposition::Mutate { kept, rewritten } => {
                let pair = [&matched, &current];
                let keep = pair[kept];
                let rewrite = pair[rewritten];
                let mutated = self.mutate_pair(keep, rewrite, hardlink, listener);
                // The index still anchors this equivalence class on
                // `matched`; if the arbiter chose to keep `current` and the
                // mutation actually ran (a dry run never touches disk),
                // later duplicates must compare against the record that's
                // actually still valid on disk.
                if mutated && !self.dry_run && kept == 1 {
                    self.matcher.reanchor(&matched, &current);
                }
            },
        }
    }

    /// Returns whether the rewritten file was actually touched on disk, so
    /// callers only reanchor the index when there's really a new file of
    /// record to point at (not on a no-op verb or a failed mutation).
    fn mutate_pair(&mut self, keep: &Rc<crate::record::FileRecord>, rewrite: &Rc<crate::record::FileRecord>, already_hardlinked: bool, listener: &mut dyn ScanListener) -> bool {
        let action = mutator::select_action(self.config_verb, already_hardlinked, self.copy_unlinked);
        if action == Action::Nothing {
            return false;
        }

        let _guard = self.lock.read().unwrap_or_else(|e| e.into_inner());
        let result = match action {
            Action::Nothing => unreachable!(),
            Action::Delete => mutator::delete(&rewrite.abs_path, self.dry_run),
            Action::Mutate(primitive) => mutator::mutate(primitive, &keep.abs_path, &rewrite.abs_path, self.dry_run),
        };
        drop(_guard);

        match result {
            Ok(()) => {
                self.totals.processed_one(rewrite.size());
                // spec.md §4.8 / original_source/scanner.go's `execute`:
                // `handle_outcome` already placed this pair in `dupes` or
                // `links` at match time; a successful mutation always
                // moves it out of that bucket rather than adding a second
                // count on top of it.
                match action {
                    Action::Mutate(Primitive::Link) => self.totals.link_established_one(rewrite.size()),
                    // Resolved open question (spec.md §9): `Totals.Cloned`
                    // attributes bytes to the rewritten record, mirroring
                    // `original_source/scanner.go`'s `f.totals.Cloned.Add(current)`.
                    Action::Mutate(Primitive::Clone) if already_hardlinked => self.totals.cloned_from_link_one(rewrite.size()),
                    Action::Mutate(Primitive::Clone) => self.totals.cloned_from_dupe_one(rewrite.size()),
                    // `--copy` only ever splits an already-linked pair in
                    // the original; our `--copy-unlinked` extension lets
                    // it also run on a plain duplicate, which was already
                    // in `dupes` and has no bucket to move into.
                    Action::Mutate(Primitive::Copy) if already_hardlinked => self.totals.link_split_one(rewrite.size()),
                    Action::Mutate(Primitive::Copy) => {},
                    Action::Delete if already_hardlinked => self.totals.unlink_one(rewrite.size()),
                    Action::Delete => self.totals.dupe_resolved_one(rewrite.size()),
                    Action::Nothing => {},
                }
                if action == Action::Mutate(Primitive::Link) {
                    listener.hardlinked(&keep.abs_path, &rewrite.abs_path);
                }
                true
            },
            Err(e) => {
                listener.notice(&format!("{}: {e}", rewrite.abs_path.display()));
                self.totals.error_one();
                false
            },
        }
    }
}
