//! JSON report emission (spec.md §6): `{ContentMatches, NameMatches?}`,
//! pretty-printed with two-space indent. Grounded on the teacher's
//! `json.rs::JsonSerializable`, regrouped from its single `dupes` tree
//! into the spec's two named match-group lists and gated behind the
//! `json` feature exactly as the teacher gates it.

#![cfg(feature = "json")]

use serde_derive::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Accumulates match groups as the scan progresses. Each group is keyed
/// by the `id` of the record that seeded it, so every later duplicate of
/// the same original extends the same group instead of starting a new
/// one.
#[derive(Default)]
pub struct ReportBuilder {
    content_index: HashMap<u64, usize>,
    content_groups: Vec<Vec<PathBuf>>,
    name_index: HashMap<u64, usize>,
    name_groups: Vec<Vec<PathBuf>>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        ReportBuilder::default()
    }

    /// `is_content_mode` routes the pair into `ContentMatches` when the
    /// active match spec requires content equality, and into
    /// `NameMatches` otherwise (size/name/relpath-only configurations).
    pub fn record_match(&mut self, is_content_mode: bool, matched_id: u64, matched_path: &Path, current_path: &Path) {
        let (index, groups) = if is_content_mode {
            (&mut self.content_index, &mut self.content_groups)
        } else {
            (&mut self.name_index, &mut self.name_groups)
        };
        let idx = match index.get(&matched_id) {
            Some(&i) => i,
            None => {
                let i = groups.len();
                groups.push(vec![matched_path.to_path_buf()]);
                index.insert(matched_id, i);
                i
            },
        };
        groups[idx].push(current_path.to_path_buf());
    }

    pub fn finish(self) -> Report {
        Report {
            content_matches: self.content_groups,
            name_matches: if self.name_groups.is_empty() { None } else { Some(self.name_groups) },
        }
    }
}

#[derive(Serialize)]
pub struct Report {
    #[serde(rename = "ContentMatches")]
    pub content_matches: Vec<Vec<PathBuf>>,
    #[serde(rename = "NameMatches", skip_serializing_if = "Option::is_none")]
    pub name_matches: Option<Vec<Vec<PathBuf>>>,
}

pub fn write_report(report: &Report, path: &Path) -> io::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn repeated_matches_against_the_same_seed_extend_one_group() {
        let mut b = ReportBuilder::new();
        b.record_match(true, 1, Path::new("/a/one"), Path::new("/a/two"));
        b.record_match(true, 1, Path::new("/a/one"), Path::new("/a/three"));
        let report = b.finish();
        assert_eq!(report.content_matches.len(), 1);
        assert_eq!(report.content_matches[0].len(), 3);
    }

    #[test]
    fn empty_name_matches_serializes_as_absent() {
        let mut b = ReportBuilder::new();
        b.record_match(true, 1, Path::new("/a"), Path::new("/b"));
        let report = b.finish();
        assert!(report.name_matches.is_none());
        let json = serde_json::to_string_pretty(&report).unwrap();
        assert!(!json.contains("NameMatches"));
    }

    #[test]
    fn name_mode_matches_land_in_name_matches() {
        let mut b = ReportBuilder::new();
        b.record_match(false, 1, Path::new("/a"), Path::new("/b"));
        let report = b.finish();
        assert!(report.content_matches.is_empty());
        assert_eq!(report.name_matches.unwrap().len(), 1);
    }
}
