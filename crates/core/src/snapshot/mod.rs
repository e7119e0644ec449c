//! Usage snapshot collection.
//!
//! [`list_volumes`] turns the raw mount table exposed by a [`UsageSource`]
//! into a sorted list of [`VolumeUsage`] values restricted to the
//! configured mount root. The OS-facing implementation lives in
//! [`system`]; tests inject their own source.

pub mod system;

use std::io;

use crate::error::CoreError;
use crate::volume::VolumeUsage;

/// One row of the mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub device: String,
    pub mountpoint: String,
    pub fs_type: String,
}

/// Raw capacity figures for a single mount, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
}

/// Source of mounted filesystems and their usage.
pub trait UsageSource: Send + Sync {
    /// Every mounted filesystem, in mount-table order.
    fn mounts(&self) -> io::Result<Vec<MountEntry>>;

    /// Capacity figures for the filesystem mounted at `mountpoint`.
    fn usage(&self, mountpoint: &str) -> io::Result<RawUsage>;
}

/// Collect usage for every mount under `mount_root`, sorted by mountpoint.
///
/// Mounts outside the root are ignored. A mount whose usage query is
/// denied is skipped silently; any other per-mount failure is logged and
/// skipped. Only a failure to read the mount table is an error.
pub fn list_volumes(
    source: &dyn UsageSource,
    mount_root: &str,
) -> Result<Vec<VolumeUsage>, CoreError> {
    let mounts = source
        .mounts()
        .map_err(|e| CoreError::Internal(format!("Failed to read mount table: {e}")))?;

    let mut volumes: Vec<VolumeUsage> = Vec::new();

    for entry in mounts {
        if !entry.mountpoint.starts_with(mount_root) {
            continue;
        }

        let raw = match source.usage(&entry.mountpoint) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                tracing::debug!(mountpoint = %entry.mountpoint, "Skipping mount -- access denied");
                continue;
            }
            Err(e) => {
                tracing::warn!(mountpoint = %entry.mountpoint, error = %e, "Skipping mount -- usage query failed");
                continue;
            }
        };

        let volume = VolumeUsage::from_bytes(
            entry.device,
            entry.mountpoint,
            raw.total_bytes,
            raw.used_bytes,
            raw.free_bytes,
        );

        // Stacked mounts: the later entry shadows the earlier one.
        match volumes.iter_mut().find(|v| v.mountpoint == volume.mountpoint) {
            Some(existing) => *existing = volume,
            None => volumes.push(volume),
        }
    }

    volumes.sort_by(|a, b| a.mountpoint.cmp(&b.mountpoint));
    Ok(volumes)
}
