#[cfg(feature = "json")]
extern crate serde_derive;
#[cfg(feature = "json")]
extern crate serde_json;

mod arbiter;
mod bytecmp;
mod copyname;
mod digest;
mod error;
mod index;
#[cfg(feature = "json")]
mod json;
mod matcher;
mod metadata;
mod mutator;
mod options;
mod rangecmp;
mod record;
mod reflink;
mod rules;
mod scandriver;
mod totals;
mod ui;

pub use crate::arbiter::Arbiter;
pub use crate::digest::{random_key, HashKey};
pub use crate::error::{FdfError, Result};
#[cfg(feature = "json")]
pub use crate::json::{write_report, Report};
pub use crate::matcher::{Matcher, Outcome};
pub use crate::options::{build_cli_options, parse_config, MatchSpec, RunConfig, TimestampPref, Verb};
pub use crate::record::FileRecord;
pub use crate::rules::GlobRuleSet;
pub use crate::scandriver::ScanDriver;
pub use crate::totals::Totals;
pub use crate::ui::{ScanListener, SilentListener, TextUserInterface};
