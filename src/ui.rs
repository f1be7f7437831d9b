//! Scan listener / progress rendering (spec.md §6's progress line is an
//! external-collaborator concern, but the hook shape is grounded on the
//! teacher's `ui.rs::ScanListener`). `TextUserInterface` prints one
//! `ESC[2K`-cleared progress line per file (elided to terminal width) and
//! a final summary; `SilentListener` backs `--quiet`.

use crate::totals::Totals;
use std::path::Path;
use std::time::{Duration, Instant};

pub trait ScanListener {
    fn file_progress(&mut self, path: &Path, totals: &Totals);
    fn duplicate_found(&mut self, matched: &Path, current: &Path);
    fn hardlinked(&mut self, matched: &Path, current: &Path);
    fn notice(&mut self, message: &str);
    fn scan_over(&self, totals: &Totals, duration: Duration);
}

pub struct SilentListener;

impl ScanListener for SilentListener {
    fn file_progress(&mut self, _path: &Path, _totals: &Totals) {}
    fn duplicate_found(&mut self, _matched: &Path, _current: &Path) {}
    fn hardlinked(&mut self, _matched: &Path, _current: &Path) {}
    fn notice(&mut self, _message: &str) {}
    fn scan_over(&self, _totals: &Totals, _duration: Duration) {}
}

pub struct TextUserInterface {
    verbose: bool,
    next_update: Instant,
    start: Instant,
}

impl TextUserInterface {
    pub fn new(verbose: bool) -> Self {
        let now = Instant::now();
        TextUserInterface { verbose, next_update: now, start: now }
    }
}

impl ScanListener for TextUserInterface {
    fn file_progress(&mut self, path: &Path, totals: &Totals) {
        let now = Instant::now();
        if now < self.next_update {
            return;
        }
        self.next_update = now + Duration::from_millis(100);

        let width = terminal_width();
        if width == 0 {
            return;
        }
        let (sc, _) = totals.scanned.snapshot();
        let (du, _) = totals.dupes.snapshot();
        let line = format!("{du} dupes, {sc} scanned: {}", elide_middle(&path.display().to_string(), width.saturating_sub(24)));
        print!("\u{1b}[2K{line}\r");
        use std::io::Write;
        let _ = std::io::stdout().flush();
    }

    fn duplicate_found(&mut self, matched: &Path, current: &Path) {
        if self.verbose {
            println!("duplicate: {} == {}", current.display(), matched.display());
        }
    }

    fn hardlinked(&mut self, matched: &Path, current: &Path) {
        if self.verbose {
            println!("hardlinked: {} -> {}", current.display(), matched.display());
        }
    }

    fn notice(&mut self, message: &str) {
        println!("{message}");
    }

    fn scan_over(&self, totals: &Totals, scan_duration: Duration) {
        let nice_duration = match scan_duration.as_secs() {
            0..=5 => format!("{:.1}s", scan_duration.as_secs_f64()),
            6..=59 => format!("{}s", scan_duration.as_secs()),
            x => format!("{}m{}s", x / 60, x % 60),
        };
        println!("{}\nelapsed: {nice_duration}", totals.summary());
        let _ = self.start;
    }
}

/// Collapses the middle of `path` to `first…last` if it doesn't fit in
/// `width` columns. Generalized from the teacher's two-path
/// `combined_paths` elider (`ui.rs`) down to a single string.
fn elide_middle(path: &str, width: usize) -> String {
    if width == 0 || path.chars().count() <= width || width < 5 {
        return path.to_owned();
    }
    let chars: Vec<char> = path.chars().collect();
    let keep = (width - 1) / 2;
    let head: String = chars[..keep].iter().collect();
    let tail: String = chars[chars.len() - keep..].iter().collect();
    format!("{head}…{tail}")
}

#[cfg(unix)]
fn terminal_width() -> usize {
    unsafe {
        let mut ws: libc::winsize = std::mem::zeroed();
        if libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) == 0 && ws.ws_col > 0 {
            ws.ws_col as usize
        } else {
            0
        }
    }
}

#[cfg(not(unix))]
fn terminal_width() -> usize {
    0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn short_path_is_unchanged() {
        assert_eq!(elide_middle("short.txt", 80), "short.txt");
    }

    #[test]
    fn long_path_is_elided() {
        let long = "/very/long/path/that/does/not/fit/in/the/terminal/width/file.txt";
        let elided = elide_middle(long, 20);
        assert!(elided.len() < long.len());
        assert!(elided.contains('…'));
    }

    #[test]
    fn silent_listener_does_nothing_observable() {
        let mut l = SilentListener;
        let totals = Totals::new();
        l.file_progress(Path::new("/a"), &totals);
        l.scan_over(&totals, Duration::from_secs(1));
    }
}
