use std::fs;
use std::io;
#[cfg(unix)]
use std::os::unix::fs::MetadataExt;
#[cfg(windows)]
use std::os::windows::fs::MetadataExt;
use std::path::Path;
use std::time::SystemTime;

/// Stat attributes a `FileRecord` freezes at construction time.
///
/// `dev`+`ino` give hardlink identity; `size` is frozen per the invariant
/// that a record's size never changes after construction.
#[derive(Copy, Clone, Hash, Ord, PartialOrd, PartialEq, Eq, Debug, Default)]
pub struct Metadata {
    pub dev: u64,
    pub ino: u64,
    pub size: u64,
    pub nlink: u64,
}

impl Metadata {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, io::Error> {
        let m = fs::symlink_metadata(path)?;
        Ok(Self::new(&m))
    }

    pub fn new(m: &fs::Metadata) -> Self {
        Metadata {
            dev: get_device_id(m),
            ino: get_inode(m),
            size: get_size(m),
            nlink: get_nlink(m),
        }
    }

    pub fn mtime(m: &fs::Metadata) -> Option<SystemTime> {
        m.modified().ok()
    }

    /// Hardlink identity: two records sharing this pair are the same inode.
    pub fn link_identity(&self) -> (u64, u64) {
        (self.dev, self.ino)
    }
}

#[cfg(unix)]
fn get_device_id(m: &fs::Metadata) -> u64 {
    m.dev()
}

#[cfg(windows)]
fn get_device_id(_m: &fs::Metadata) -> u64 {
    // No direct equivalent of a POSIX device id; hardlinking across
    // drives isn't possible anyway, so a constant is harmless here.
    0
}

#[cfg(unix)]
fn get_inode(m: &fs::Metadata) -> u64 {
    m.ino()
}

#[cfg(windows)]
fn get_inode(m: &fs::Metadata) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    m.file_size().hash(&mut hasher);
    m.last_write_time().hash(&mut hasher);
    hasher.finish()
}

#[cfg(unix)]
fn get_size(m: &fs::Metadata) -> u64 {
    m.size()
}

#[cfg(windows)]
fn get_size(m: &fs::Metadata) -> u64 {
    m.file_size()
}

#[cfg(unix)]
fn get_nlink(m: &fs::Metadata) -> u64 {
    m.nlink()
}

#[cfg(windows)]
fn get_nlink(_m: &fs::Metadata) -> u64 {
    1
}

/// Smallest block size worth worrying about when a small-file floor is
/// in play. APFS reports 4MB block sizes, so this is clamped.
#[cfg(unix)]
pub fn block_size(m: &fs::Metadata) -> u64 {
    std::cmp::min(16 * 1024, m.blksize())
}

#[cfg(windows)]
pub fn block_size(_m: &fs::Metadata) -> u64 {
    4096
}
