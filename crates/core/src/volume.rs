//! Per-mount usage value type and unit conversion.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// Bytes per decimal terabyte (1 TB = 10^12 bytes).
pub const BYTES_PER_TB: f64 = 1_000_000_000_000.0;

/// Convert a raw byte count to decimal terabytes.
pub fn bytes_to_tb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_TB
}

/// Usage of a single mounted volume, in decimal terabytes.
///
/// `used_tb + free_tb` is not required to equal `total_tb`: filesystems
/// reserve blocks for root, and values are passed through as reported.
/// Utilization is always derived from `total_tb` / `used_tb` and never
/// stored alongside them.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeUsage {
    pub device: String,
    pub mountpoint: String,
    pub total_tb: f64,
    pub used_tb: f64,
    pub free_tb: f64,
}

impl VolumeUsage {
    pub fn new(
        device: impl Into<String>,
        mountpoint: impl Into<String>,
        total_tb: f64,
        used_tb: f64,
        free_tb: f64,
    ) -> Self {
        Self {
            device: device.into(),
            mountpoint: mountpoint.into(),
            total_tb,
            used_tb,
            free_tb,
        }
    }

    /// Build a volume from raw byte counts reported by the OS.
    pub fn from_bytes(
        device: impl Into<String>,
        mountpoint: impl Into<String>,
        total_bytes: u64,
        used_bytes: u64,
        free_bytes: u64,
    ) -> Self {
        Self::new(
            device,
            mountpoint,
            bytes_to_tb(total_bytes),
            bytes_to_tb(used_bytes),
            bytes_to_tb(free_bytes),
        )
    }

    /// Used capacity as a percentage of total; `0.0` for an empty volume.
    pub fn utilization_percent(&self) -> f64 {
        if self.total_tb > 0.0 {
            self.used_tb / self.total_tb * 100.0
        } else {
            0.0
        }
    }

    /// Final path component of the mountpoint (`"AMS01"` for `/mnt/AMS01`).
    pub fn basename(&self) -> &str {
        self.mountpoint.rsplit('/').next().unwrap_or(&self.mountpoint)
    }
}

impl Serialize for VolumeUsage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("VolumeUsage", 6)?;
        s.serialize_field("device", &self.device)?;
        s.serialize_field("mountpoint", &self.mountpoint)?;
        s.serialize_field("total_tb", &self.total_tb)?;
        s.serialize_field("used_tb", &self.used_tb)?;
        s.serialize_field("free_tb", &self.free_tb)?;
        s.serialize_field("utilization_percent", &self.utilization_percent())?;
        s.end()
    }
}
