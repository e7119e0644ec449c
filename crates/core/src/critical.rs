//! Selection of volumes nearing capacity.

use crate::volume::VolumeUsage;

/// Default utilization (percent) at or above which a volume is critical.
pub const DEFAULT_CRITICAL_THRESHOLD: f64 = 91.0;

/// Volumes from `general` at or above `threshold` percent utilization,
/// most utilized first. Ties keep their relative order from `general`.
pub fn select_critical(general: &[VolumeUsage], threshold: f64) -> Vec<VolumeUsage> {
    let mut critical: Vec<VolumeUsage> = general
        .iter()
        .filter(|v| v.utilization_percent() >= threshold)
        .cloned()
        .collect();

    // `sort_by` is stable.
    critical.sort_by(|a, b| b.utilization_percent().total_cmp(&a.utilization_percent()));
    critical
}
