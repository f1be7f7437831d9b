//! Byte comparator (spec.md §4.4): a streaming equal-reader over both
//! files' comparable byte ranges. Grounded on
//! `original_source/filecompare.go`'s `equalReaders`, generalized to
//! compare only the `[skip_header, size - skip_footer)` window of each
//! file instead of the whole stream.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

const BUF_SIZE: usize = 1024 * 1024;

/// Returns `true` iff both files' comparable ranges are byte-identical.
/// Any I/O error or unequal short read is treated as non-match, not
/// propagated — callers only care whether the pair is equal.
pub fn files_equal(
    a: &Path,
    b: &Path,
    a_header: u64,
    a_footer: u64,
    b_header: u64,
    b_footer: u64,
) -> bool {
    match files_equal_inner(a, b, a_header, a_footer, b_header, b_footer) {
        Ok(equal) => equal,
        Err(_) => false,
    }
}

fn files_equal_inner(
    a: &Path,
    b: &Path,
    a_header: u64,
    a_footer: u64,
    b_header: u64,
    b_footer: u64,
) -> io::Result<bool> {
    let mut fa = File::open(a)?;
    let mut fb = File::open(b)?;

    let a_size = fa.metadata()?.len();
    let b_size = fb.metadata()?.len();
    let (a_start, a_end) = crate::digest::comparable_range(a_size, a_header, a_footer);
    let (b_start, b_end) = crate::digest::comparable_range(b_size, b_header, b_footer);
    if a_end - a_start != b_end - b_start {
        return Ok(false);
    }

    fa.seek(SeekFrom::Start(a_start))?;
    fb.seek(SeekFrom::Start(b_start))?;

    equal_readers(
        &mut (&mut fa).take(a_end - a_start),
        &mut (&mut fb).take(b_end - b_start),
    )
}

fn equal_readers(r1: &mut impl Read, r2: &mut impl Read) -> io::Result<bool> {
    let mut buf1 = vec![0u8; BUF_SIZE];
    let mut buf2 = vec![0u8; BUF_SIZE];

    loop {
        let n1 = read_fully(r1, &mut buf1)?;
        let n2 = read_fully(r2, &mut buf2)?;

        if n1 != n2 || buf1[..n1] != buf2[..n2] {
            return Ok(false);
        }
        if n1 == 0 {
            return Ok(true);
        }
    }
}

/// Reads until `buf` is full or the reader is exhausted, since a single
/// `Read::read` call is allowed to return short reads well before EOF.
fn read_fully(r: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        let n = r.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn identical_files_match() {
        let dir = TempDir::new("bytecmp").expect("tmp");
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, b"the quick brown fox").unwrap();
        std::fs::write(&b, b"the quick brown fox").unwrap();
        assert!(files_equal(&a, &b, 0, 0, 0, 0));
    }

    #[test]
    fn different_content_does_not_match() {
        let dir = TempDir::new("bytecmp2").expect("tmp");
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, b"the quick brown fox").unwrap();
        std::fs::write(&b, b"the slow brown fox!").unwrap();
        assert!(!files_equal(&a, &b, 0, 0, 0, 0));
    }

    #[test]
    fn header_footer_excluded_from_comparison() {
        let dir = TempDir::new("bytecmp3").expect("tmp");
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, b"AAAApayloadBBBB").unwrap();
        std::fs::write(&b, b"ZZZZZpayloadYYYY").unwrap();
        assert!(files_equal(&a, &b, 4, 4, 5, 4));
    }

    #[test]
    fn missing_file_is_non_match_not_error() {
        let dir = TempDir::new("bytecmp4").expect("tmp");
        let a = dir.path().join("a");
        let b = dir.path().join("missing");
        std::fs::write(&a, b"hello").unwrap();
        assert!(!files_equal(&a, &b, 0, 0, 0, 0));
    }
}
