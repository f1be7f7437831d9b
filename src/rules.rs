//! Rule-list module: one `GlobRuleSet` type backs the protection,
//! exclusion, and keep-eligibility rule families of spec.md §6. Grounded
//! on `original_source/matchers/globset.go`'s `GlobSet`/`Glob`, rebuilt on
//! the `globset` crate for compiled, `**`-capable glob matching (the
//! "glob matching is an external predicate" collaborator from spec.md
//! §1).

use crate::error::FdfError;
use globset::{Glob, GlobMatcher};
use std::path::Path;

struct Rule {
    matcher: GlobMatcher,
    include: bool,
}

/// Later rules override earlier ones; an empty list always yields
/// `default_include`. A non-empty list's implicit base is the opposite
/// of the first rule's polarity.
pub struct GlobRuleSet {
    rules: Vec<Rule>,
    default_include: bool,
}

impl GlobRuleSet {
    pub fn new(default_include: bool) -> Self {
        GlobRuleSet { rules: Vec::new(), default_include }
    }

    /// `pattern` is resolved to an absolute path before matching, per
    /// spec.md §6 ("patterns resolve to absolute paths").
    pub fn add(&mut self, pattern: &str, include: bool) -> Result<(), FdfError> {
        let abs = to_absolute_pattern(pattern)?;
        let glob = Glob::new(&abs)
            .map_err(|e| FdfError::config(format!("invalid pattern `{pattern}`: {e}")))?;
        self.rules.push(Rule { matcher: glob.compile_matcher(), include });
        Ok(())
    }

    /// A `-dir`-flavored rule matches the directory and everything under
    /// it, mirroring `--exclude-dir`/`--protect-dir`/etc.
    pub fn add_dir(&mut self, dir: &str, include: bool) -> Result<(), FdfError> {
        let pattern = format!("{}/**", dir.trim_end_matches('/'));
        self.add(&pattern, include)
    }

    pub fn includes(&self, path: &Path) -> bool {
        if self.rules.is_empty() {
            return self.default_include;
        }
        let mut include = !self.rules[0].include;
        for rule in &self.rules {
            if rule.matcher.is_match(path) {
                include = rule.include;
            }
        }
        include
    }
}

fn to_absolute_pattern(pattern: &str) -> Result<String, FdfError> {
    let path = Path::new(pattern);
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| FdfError::config(format!("cannot resolve `{pattern}`: {e}")))?
            .join(path)
    };
    Ok(abs.to_string_lossy().into_owned())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_set_yields_default() {
        let set = GlobRuleSet::new(true);
        assert!(set.includes(Path::new("/anything")));
        let set = GlobRuleSet::new(false);
        assert!(!set.includes(Path::new("/anything")));
    }

    #[test]
    fn exclude_only_list_implies_include_base() {
        let mut set = GlobRuleSet::new(true);
        set.add_dir("/tmp/excluded", false).unwrap();
        assert!(!set.includes(Path::new("/tmp/excluded/file.txt")));
        assert!(set.includes(Path::new("/tmp/other/file.txt")));
    }

    #[test]
    fn later_rule_overrides_earlier() {
        let mut set = GlobRuleSet::new(true);
        set.add_dir("/tmp/a", false).unwrap();
        set.add("/tmp/a/keep.txt", true).unwrap();
        assert!(!set.includes(Path::new("/tmp/a/other.txt")));
        assert!(set.includes(Path::new("/tmp/a/keep.txt")));
    }
}
