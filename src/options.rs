//! CLI option parsing and the validated `RunConfig` (spec.md §6).
//! Grounded on the teacher's `bin.rs` (`getopts::Options`, `optflag`,
//! `optmulti`) and `original_source/options.go` for the verb/flag
//! taxonomy, generalized to the richer match-spec and rule-list flags.

use crate::error::FdfError;
use crate::rangecmp::RangeSpec;
use crate::rules::GlobRuleSet;
use getopts::Options as GetOpts;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    None,
    Link,
    Clone,
    Split,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampPref {
    Ignore,
    PreferNewer,
    PreferOlder,
}

/// Which string accessor a range comparer reads from a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessor {
    FoldedName,
    FoldedParent,
    DirPath,
}

/// A bare field name (exact equality, usable as an index field) or a
/// `field[ranges]` form (partial comparison, a post-filter only).
#[derive(Debug, Clone)]
pub enum NameFilter {
    Exact,
    Ranges(RangeSpec),
}

#[derive(Debug, Clone, Default)]
pub struct MatchSpec {
    pub content: bool,
    pub size: bool,
    pub name: Option<NameFilter>,
    pub parent: Option<NameFilter>,
    pub path: Option<RangeSpec>,
    pub relpath: bool,
    pub copyname: bool,
    pub namesuffix: bool,
    pub nameprefix: bool,
}

impl MatchSpec {
    pub fn parse(spec: &str) -> Result<Self, FdfError> {
        let mut m = MatchSpec::default();
        for token in spec.split('+') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let (head, bracket) = split_bracket(token)?;
            match head {
                "content" => m.content = true,
                "size" => m.size = true,
                "name" => m.name = Some(Self::name_filter(bracket)?),
                "parent" => m.parent = Some(Self::name_filter(bracket)?),
                "path" => m.path = Some(Self::range_or_whole(bracket)?),
                "relpath" => m.relpath = true,
                "copyname" => m.copyname = true,
                "namesuffix" => m.namesuffix = true,
                "nameprefix" => m.nameprefix = true,
                other => return Err(FdfError::config(format!("unknown match field `{other}`"))),
            }
        }
        m.apply_implications_and_validate()?;
        Ok(m)
    }

    fn name_filter(bracket: Option<&str>) -> Result<NameFilter, FdfError> {
        match bracket {
            None => Ok(NameFilter::Exact),
            Some(r) => Ok(NameFilter::Ranges(RangeSpec::parse(r)?)),
        }
    }

    fn range_or_whole(bracket: Option<&str>) -> Result<RangeSpec, FdfError> {
        match bracket {
            None => RangeSpec::parse("0:-1"),
            Some(r) => RangeSpec::parse(r),
        }
    }

    fn apply_implications_and_validate(&mut self) -> Result<(), FdfError> {
        // `content` implies `size`.
        if self.content {
            self.size = true;
        }
        // `path`/`relpath` imply `parent`.
        if (self.path.is_some() || self.relpath) && self.parent.is_none() {
            self.parent = Some(NameFilter::Exact);
        }
        // At most one of name / copyname / namesuffix / nameprefix.
        let exclusive = [self.name.is_some(), self.copyname, self.namesuffix, self.nameprefix];
        if exclusive.iter().filter(|b| **b).count() > 1 {
            return Err(FdfError::config(
                "at most one of name, copyname, namesuffix, nameprefix may be set",
            ));
        }
        // copyname/namesuffix additionally require size or content.
        if (self.copyname || self.namesuffix) && !self.size {
            return Err(FdfError::config("copyname/namesuffix require size or content"));
        }
        if !self.content
            && !self.size
            && self.name.is_none()
            && self.parent.is_none()
            && self.path.is_none()
            && !self.relpath
            && !self.copyname
            && !self.namesuffix
            && !self.nameprefix
        {
            return Err(FdfError::config("--match must name at least one field"));
        }
        Ok(())
    }

    pub fn post_filters(&self) -> Vec<(Accessor, RangeSpec)> {
        let mut v = Vec::new();
        if let Some(NameFilter::Ranges(r)) = &self.name {
            v.push((Accessor::FoldedName, r.clone()));
        }
        if let Some(NameFilter::Ranges(r)) = &self.parent {
            v.push((Accessor::FoldedParent, r.clone()));
        }
        if let Some(r) = &self.path {
            v.push((Accessor::DirPath, r.clone()));
        }
        v
    }

    pub fn exact_name(&self) -> bool {
        matches!(self.name, Some(NameFilter::Exact))
    }

    pub fn exact_parent(&self) -> bool {
        matches!(self.parent, Some(NameFilter::Exact))
    }
}

fn split_bracket(token: &str) -> Result<(&str, Option<&str>), FdfError> {
    match token.find('[') {
        None => Ok((token, None)),
        Some(i) => {
            if !token.ends_with(']') {
                return Err(FdfError::config(format!("unterminated range bracket in `{token}`")));
            }
            Ok((&token[..i], Some(&token[i + 1..token.len() - 1])))
        },
    }
}

/// One pass-through rule entry (`--protect PATTERN` vs `--protect-dir
/// DIR`, etc.), kept in CLI-appearance order so `RuleFamily::build` can
/// apply them with the documented "later rule wins" semantics.
#[derive(Debug, Clone)]
enum RuleEntry {
    Pattern(String, bool),
    Dir(String, bool),
}

#[derive(Debug, Clone, Default)]
struct RuleFamily {
    entries: Vec<RuleEntry>,
}

impl RuleFamily {
    fn push_pattern(&mut self, pattern: &str, include: bool) {
        self.entries.push(RuleEntry::Pattern(pattern.to_owned(), include));
    }
    fn push_dir(&mut self, dir: &str, include: bool) {
        self.entries.push(RuleEntry::Dir(dir.to_owned(), include));
    }
    fn build(&self, default_include: bool) -> Result<GlobRuleSet, FdfError> {
        let mut set = GlobRuleSet::new(default_include);
        for e in &self.entries {
            match e {
                RuleEntry::Pattern(p, inc) => set.add(p, *inc)?,
                RuleEntry::Dir(d, inc) => set.add_dir(d, *inc)?,
            }
        }
        Ok(set)
    }
}

pub struct RunConfig {
    pub inputs: Vec<PathBuf>,
    pub verb: Verb,
    pub recursive: bool,
    pub quiet: bool,
    pub verbose: bool,
    pub dry_run: bool,
    pub ignore_hardlinks: bool,
    pub copy_unlinked: bool,
    pub timestamps: TimestampPref,
    pub json_report: Option<PathBuf>,

    pub min_size: u64,
    pub skip_header: u64,
    pub skip_footer: u64,

    pub match_spec: MatchSpec,

    pub protect: GlobRuleSet,
    pub exclude: GlobRuleSet,
    pub keep: GlobRuleSet,
}

impl RunConfig {
    /// `min_size` as validated by `parse_config` (already `>= skip_header +
    /// skip_footer`); this just names the value the matcher actually wants,
    /// distinct from the raw `--minimum-size` field.
    pub fn effective_min_size(&self) -> u64 {
        self.min_size.max(self.skip_header + self.skip_footer)
    }
}

pub fn build_cli_options() -> GetOpts {
    let mut opts = GetOpts::new();
    opts.optopt("", "match", "fields to match on (default: content)", "FIELDS");
    opts.optflag("", "link", "(verb) hardlink duplicate files");
    opts.optflag("", "clone", "(verb) create copy-on-write clones");
    opts.optflag("", "copy", "(verb) split existing hardlinks via copy");
    opts.optflag("", "delete", "(verb) delete duplicate files");

    opts.optmulti("", "protect", "never modify/remove files matching PATTERN", "PATTERN");
    opts.optmulti("", "unprotect", "override an earlier --protect for PATTERN", "PATTERN");
    opts.optmulti("", "protect-dir", "never modify/remove files under DIR", "DIR");
    opts.optmulti("", "unprotect-dir", "override an earlier --protect-dir for DIR", "DIR");

    opts.optmulti("", "exclude", "don't scan files matching PATTERN", "PATTERN");
    opts.optmulti("", "include", "override an earlier --exclude for PATTERN", "PATTERN");
    opts.optmulti("", "exclude-dir", "don't scan DIR", "DIR");
    opts.optmulti("", "include-dir", "override an earlier --exclude-dir for DIR", "DIR");

    opts.optmulti("", "if-kept", "PATTERN is keep-eligible", "PATTERN");
    opts.optmulti("", "if-not-kept", "override an earlier --if-kept for PATTERN", "PATTERN");
    opts.optmulti("", "if-kept-dir", "DIR is keep-eligible", "DIR");
    opts.optmulti("", "if-not-kept-dir", "override an earlier --if-kept-dir for DIR", "DIR");

    opts.optopt("", "minimum-size", "ignore files smaller than N bytes (default 1)", "N");
    opts.optopt("", "skip-header", "exclude N leading bytes from hash+compare", "N");
    opts.optopt("", "skip-footer", "exclude N trailing bytes from hash+compare", "N");

    opts.optflag("r", "recursive", "traverse subdirectories");
    opts.optflag("q", "quiet", "hide regular progress output");
    opts.optflag("v", "verbose", "verbose output");
    opts.optflag("t", "dry-run", "don't change anything on disk");
    opts.optflag("h", "ignore-hardlinks", "don't report existing hardlinks");
    opts.optflag("", "copy-unlinked", "allow --copy to split files with no existing hardlinks");
    opts.optopt("", "timestamps", "ignore|prefer-newer|prefer-older (default: ignore)", "MODE");
    opts.optopt("", "json-report", "write a JSON report to FILE", "FILE");
    opts.optflag("", "help", "show this help screen and exit");
    opts
}

pub fn parse_config(opts: &GetOpts, args: &[String]) -> Result<RunConfig, FdfError> {
    let matches = opts
        .parse(args)
        .map_err(|e| FdfError::config(e.to_string()))?;

    let verbs = [
        (matches.opt_present("link"), Verb::Link),
        (matches.opt_present("clone"), Verb::Clone),
        (matches.opt_present("copy"), Verb::Split),
        (matches.opt_present("delete"), Verb::Delete),
    ];
    let active: Vec<Verb> = verbs.iter().filter(|(p, _)| *p).map(|(_, v)| *v).collect();
    if active.len() > 1 {
        return Err(FdfError::config("verbs --link/--clone/--copy/--delete are mutually exclusive"));
    }
    let verb = active.first().copied().unwrap_or(Verb::None);

    let match_spec = MatchSpec::parse(matches.opt_str("match").as_deref().unwrap_or("content"))?;

    let min_size = parse_u64_opt(&matches, "minimum-size", 1)?;
    let skip_header = parse_u64_opt(&matches, "skip-header", 0)?;
    let skip_footer = parse_u64_opt(&matches, "skip-footer", 0)?;
    if min_size < skip_header + skip_footer {
        return Err(FdfError::config(
            "minimum-size must exceed skip-header + skip-footer",
        ));
    }

    let timestamps = match matches.opt_str("timestamps").as_deref() {
        None | Some("ignore") => TimestampPref::Ignore,
        Some("prefer-newer") => TimestampPref::PreferNewer,
        Some("prefer-older") => TimestampPref::PreferOlder,
        Some(other) => return Err(FdfError::config(format!("unknown --timestamps value `{other}`"))),
    };

    let mut protect = RuleFamily::default();
    for p in matches.opt_strs("protect") {
        protect.push_pattern(&p, true);
    }
    for p in matches.opt_strs("unprotect") {
        protect.push_pattern(&p, false);
    }
    for d in matches.opt_strs("protect-dir") {
        protect.push_dir(&d, true);
    }
    for d in matches.opt_strs("unprotect-dir") {
        protect.push_dir(&d, false);
    }

    let mut exclude = RuleFamily::default();
    for p in matches.opt_strs("exclude") {
        exclude.push_pattern(&p, false);
    }
    for p in matches.opt_strs("include") {
        exclude.push_pattern(&p, true);
    }
    for d in matches.opt_strs("exclude-dir") {
        exclude.push_dir(&d, false);
    }
    for d in matches.opt_strs("include-dir") {
        exclude.push_dir(&d, true);
    }

    let mut keep = RuleFamily::default();
    for p in matches.opt_strs("if-kept") {
        keep.push_pattern(&p, true);
    }
    for p in matches.opt_strs("if-not-kept") {
        keep.push_pattern(&p, false);
    }
    for d in matches.opt_strs("if-kept-dir") {
        keep.push_dir(&d, true);
    }
    for d in matches.opt_strs("if-not-kept-dir") {
        keep.push_dir(&d, false);
    }

    let inputs: Vec<PathBuf> = if matches.free.is_empty() {
        vec![std::env::current_dir().map_err(FdfError::from)?]
    } else {
        matches.free.iter().map(PathBuf::from).collect()
    };

    Ok(RunConfig {
        inputs,
        verb,
        recursive: matches.opt_present("recursive"),
        quiet: matches.opt_present("quiet"),
        verbose: matches.opt_present("verbose"),
        dry_run: matches.opt_present("dry-run"),
        ignore_hardlinks: matches.opt_present("ignore-hardlinks"),
        copy_unlinked: matches.opt_present("copy-unlinked"),
        timestamps,
        json_report: matches.opt_str("json-report").map(PathBuf::from),
        min_size,
        skip_header,
        skip_footer,
        match_spec,
        // Protection is membership in the protect set, not a
        // default-include posture: an empty `--protect` list protects
        // nothing, so the base (used only when no rules were given)
        // is `false`.
        protect: protect.build(false)?,
        exclude: exclude.build(true)?,
        keep: keep.build(true)?,
    })
}

fn parse_u64_opt(matches: &getopts::Matches, name: &str, default: u64) -> Result<u64, FdfError> {
    match matches.opt_str(name) {
        None => Ok(default),
        Some(s) => s.parse().map_err(|_| FdfError::config(format!("invalid value for --{name}: `{s}`"))),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_match_is_content_and_size() {
        let m = MatchSpec::parse("content").unwrap();
        assert!(m.content);
        assert!(m.size);
    }

    #[test]
    fn relpath_implies_parent() {
        let m = MatchSpec::parse("relpath+content").unwrap();
        assert!(m.relpath);
        assert!(m.exact_parent());
    }

    #[test]
    fn copyname_requires_size_or_content() {
        assert!(MatchSpec::parse("copyname").is_err());
        assert!(MatchSpec::parse("copyname+size").is_ok());
    }

    #[test]
    fn name_and_copyname_are_exclusive() {
        assert!(MatchSpec::parse("name+copyname+size").is_err());
    }

    #[test]
    fn name_with_ranges_is_a_post_filter() {
        let m = MatchSpec::parse("name[0:3]+size").unwrap();
        assert!(!m.exact_name());
        assert_eq!(m.post_filters().len(), 1);
    }

    #[test]
    fn parse_errors_are_configuration_errors() {
        assert!(matches!(MatchSpec::parse("bogus"), Err(FdfError::Config(_))));
    }
}
