//! Live [`UsageSource`] backed by the kernel mount table and `statvfs(3)`.

use std::ffi::CString;
use std::io;
use std::path::PathBuf;

use super::{MountEntry, RawUsage, UsageSource};

/// Default location of the per-process mount table on Linux.
pub const DEFAULT_MOUNT_TABLE: &str = "/proc/self/mounts";

/// Reads mounts from a `/proc/mounts`-format file and queries usage with
/// `statvfs`.
#[derive(Debug, Clone)]
pub struct SystemUsageSource {
    mount_table: PathBuf,
}

impl Default for SystemUsageSource {
    fn default() -> Self {
        Self::new(DEFAULT_MOUNT_TABLE)
    }
}

impl SystemUsageSource {
    pub fn new(mount_table: impl Into<PathBuf>) -> Self {
        Self {
            mount_table: mount_table.into(),
        }
    }
}

impl UsageSource for SystemUsageSource {
    fn mounts(&self) -> io::Result<Vec<MountEntry>> {
        let content = std::fs::read_to_string(&self.mount_table)?;
        Ok(parse_mount_table(&content))
    }

    fn usage(&self, mountpoint: &str) -> io::Result<RawUsage> {
        statvfs_usage(mountpoint)
    }
}

/// Parse `/proc/mounts` content into entries, skipping malformed lines.
pub fn parse_mount_table(content: &str) -> Vec<MountEntry> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = fields.next()?;
            let mountpoint = fields.next()?;
            let fs_type = fields.next()?;
            Some(MountEntry {
                device: unescape_mount_field(device),
                mountpoint: unescape_mount_field(mountpoint),
                fs_type: fs_type.to_string(),
            })
        })
        .collect()
}

/// Decode the kernel's three-digit octal escapes (`\040` for a space, etc.).
fn unescape_mount_field(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 4 <= bytes.len() && is_octal_escape(&bytes[i + 1..i + 4]) {
            let value = (bytes[i + 1] - b'0') as u32 * 64
                + (bytes[i + 2] - b'0') as u32 * 8
                + (bytes[i + 3] - b'0') as u32;
            if let Ok(b) = u8::try_from(value) {
                out.push(b);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn is_octal_escape(digits: &[u8]) -> bool {
    digits.len() == 3 && digits.iter().all(|d| (b'0'..=b'7').contains(d))
}

/// Query capacity for `path` with `statvfs(3)`.
///
/// Used bytes are `blocks - bfree` (including root-reserved blocks) and
/// free bytes are `bavail`, matching what `df` shows.
fn statvfs_usage(path: &str) -> io::Result<RawUsage> {
    use std::mem::MaybeUninit;

    let c_path = CString::new(path)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let mut stat = MaybeUninit::<libc::statvfs>::uninit();

    // Safety: `c_path` is a valid NUL-terminated string and `stat` points
    // to writable storage of the right size.
    let ret = unsafe { libc::statvfs(c_path.as_ptr(), stat.as_mut_ptr()) };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }

    // Safety: statvfs returned 0, so the struct is initialised.
    let stat = unsafe { stat.assume_init() };
    let frsize = stat.f_frsize as u64;
    let blocks = stat.f_blocks as u64;

    Ok(RawUsage {
        total_bytes: blocks * frsize,
        used_bytes: blocks.saturating_sub(stat.f_bfree as u64) * frsize,
        free_bytes: stat.f_bavail as u64 * frsize,
    })
}
