//! Name normalization and the copy-name / name-suffix / name-prefix
//! equality relations (spec.md §4.1).

use regex::Regex;
use std::sync::OnceLock;

/// Folded name = lowercased basename.
pub fn fold_name(basename: &str) -> String {
    basename.to_lowercase()
}

fn copy_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*(?:Copy (?:[0-9]+ )?of )?(.*?)(?:[-_ ][()0-9]+?(?:x[0-9]+)?)?\s*(\.[^.]*?)?\s*$",
        )
        .expect("copy-name pattern is a fixed, valid regex")
    })
}

fn strip_copy_markers(name: &str) -> Option<String> {
    let caps = copy_name_pattern().captures(name)?;
    let stem = caps.get(1).map_or("", |m| m.as_str());
    let ext = caps.get(2).map_or("", |m| m.as_str());
    Some(format!("{stem}{ext}").to_lowercase())
}

/// `isCopyName(a, b)`: both names are folded by stripping a leading
/// `Copy of ` / `Copy N of ` marker, trailing ` (N)` / `-N` / `_N` / ` N`
/// (optionally `xN`) artifacts, and a trailing `copy` marker, preserving
/// only the last extension token. Must be transitive on the set under
/// test: an implementation that is not can create and break links within
/// a single traversal.
pub fn is_copy_name(a: &str, b: &str) -> bool {
    let a = strip_trailing_copy_word(a);
    let b = strip_trailing_copy_word(b);
    match (strip_copy_markers(&a), strip_copy_markers(&b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Strips an optional trailing `copy` marker (` copy`, `-copy`, `_copy`,
/// case-insensitive) before the last extension, so "file copy.txt" and
/// "file.txt" fold to the same stem alongside the `Copy of ` prefix form.
fn strip_trailing_copy_word(name: &str) -> String {
    static TRAILING: OnceLock<Regex> = OnceLock::new();
    let re = TRAILING.get_or_init(|| {
        Regex::new(r"(?i)^(.*?)[-_ ]?copy(\.[^.]*?)?$").expect("fixed pattern")
    });
    if let Some(caps) = re.captures(name) {
        let stem = caps.get(1).map_or("", |m| m.as_str());
        let ext = caps.get(2).map_or("", |m| m.as_str());
        format!("{stem}{ext}")
    } else {
        name.to_owned()
    }
}

/// After lowercasing, one full name is a suffix of the other (equal names
/// included).
pub fn is_name_suffix(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a.len() <= b.len() {
        b.ends_with(&a)
    } else {
        a.ends_with(&b)
    }
}

/// After lowercasing and stripping the last extension, one name is a
/// prefix of the other.
pub fn is_name_prefix(a: &str, b: &str) -> bool {
    let a = strip_last_extension(&a.to_lowercase());
    let b = strip_last_extension(&b.to_lowercase());
    if a.len() <= b.len() {
        b.starts_with(&a)
    } else {
        a.starts_with(&b)
    }
}

fn strip_last_extension(name: &str) -> String {
    match name.rfind('.') {
        Some(i) if i > 0 => name[..i].to_owned(),
        _ => name.to_owned(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fold_lowercases() {
        assert_eq!(fold_name("FOO.TXT"), "foo.txt");
    }

    #[test]
    fn copy_of_prefix() {
        assert!(is_copy_name("Copy of report.txt", "report.txt"));
        assert!(is_copy_name("Copy 2 of report.txt", "report.txt"));
    }

    #[test]
    fn numeric_suffix_variants() {
        assert!(is_copy_name("report (1).txt", "report.txt"));
        assert!(is_copy_name("report-2.txt", "report.txt"));
        assert!(is_copy_name("report_3.txt", "report.txt"));
    }

    #[test]
    fn trailing_copy_word() {
        assert!(is_copy_name("report copy.txt", "report.txt"));
    }

    #[test]
    fn longest_extension_collapses() {
        assert!(is_copy_name("archive.tar (1).gz", "archive.tar.gz"));
    }

    #[test]
    fn transitive_on_a_chain() {
        let names = ["report.txt", "Copy of report.txt", "report (1).txt"];
        for i in 0..names.len() {
            for j in 0..names.len() {
                assert!(is_copy_name(names[i], names[j]), "{} vs {}", names[i], names[j]);
            }
        }
    }

    #[test]
    fn unrelated_names_not_copies() {
        assert!(!is_copy_name("report.txt", "summary.txt"));
    }

    #[test]
    fn suffix_relation() {
        assert!(is_name_suffix("report.txt", "final_report.txt"));
        assert!(!is_name_suffix("report.txt", "report2.txt"));
    }

    #[test]
    fn prefix_relation_strips_extension() {
        assert!(is_name_prefix("report.txt", "report.final.txt"));
    }
}
