//! Categorized report, filtering, view model and CSV export.
//!
//! A [`CategorizedReport`] is rebuilt from a fresh snapshot for every
//! request. [`ReportView`] and [`general_csv`] are both derived from the
//! same (optionally filtered) report, so the page and the download always
//! agree.

use serde::Serialize;

use crate::classify::{classify, Category};
use crate::critical::{select_critical, DEFAULT_CRITICAL_THRESHOLD};
use crate::error::CoreError;
use crate::volume::VolumeUsage;

/// Default provisioned fleet capacity in decimal TB.
pub const DEFAULT_FLEET_CAPACITY_TB: f64 = 2304.763289;

/// File name offered for the CSV download.
pub const CSV_FILENAME: &str = "general_storage_utilization.csv";

/// Header row of the CSV export.
pub const CSV_HEADER: [&str; 6] = [
    "Device",
    "Mountpoint",
    "Quota (TB)",
    "Used (TB)",
    "Free (TB)",
    "Utilization (%)",
];

/// Volumes grouped by storage tier.
///
/// `general` is sorted by mountpoint; `critical` is a subset of `general`
/// sorted by utilization, most utilized first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategorizedReport {
    pub curator: Vec<VolumeUsage>,
    pub raysync: Vec<VolumeUsage>,
    pub lucid: Vec<VolumeUsage>,
    pub defunct: Vec<VolumeUsage>,
    pub general: Vec<VolumeUsage>,
    pub critical: Vec<VolumeUsage>,
}

impl CategorizedReport {
    /// Mutable access to the group backing `category`.
    pub fn group_mut(&mut self, category: Category) -> &mut Vec<VolumeUsage> {
        match category {
            Category::Curator => &mut self.curator,
            Category::Raysync => &mut self.raysync,
            Category::Lucid => &mut self.lucid,
            Category::Defunct => &mut self.defunct,
        }
    }

    /// Keep only volumes whose mountpoint matches `filter` in every group.
    pub fn filtered(&self, filter: &MountFilter) -> Self {
        let keep = |group: &[VolumeUsage]| -> Vec<VolumeUsage> {
            group
                .iter()
                .filter(|v| filter.matches(&v.mountpoint))
                .cloned()
                .collect()
        };

        Self {
            curator: keep(&self.curator),
            raysync: keep(&self.raysync),
            lucid: keep(&self.lucid),
            defunct: keep(&self.defunct),
            general: keep(&self.general),
            critical: keep(&self.critical),
        }
    }
}

/// Tunables for report construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSettings {
    /// Total provisioned capacity (TB) used as the utilization denominator.
    pub fleet_capacity_tb: f64,
    /// Utilization percentage at or above which a general volume is critical.
    pub critical_threshold: f64,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            fleet_capacity_tb: DEFAULT_FLEET_CAPACITY_TB,
            critical_threshold: DEFAULT_CRITICAL_THRESHOLD,
        }
    }
}

impl ReportSettings {
    /// Reject capacities and thresholds that cannot produce a sensible report.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.fleet_capacity_tb.is_finite() || self.fleet_capacity_tb < 0.0 {
            return Err(CoreError::Validation(format!(
                "Fleet capacity must be a non-negative number of TB, got {}",
                self.fleet_capacity_tb
            )));
        }
        if !(0.0..=100.0).contains(&self.critical_threshold) {
            return Err(CoreError::Validation(format!(
                "Critical threshold must be between 0 and 100 percent, got {}",
                self.critical_threshold
            )));
        }
        Ok(())
    }
}

/// Classify `volumes` and fill the critical group.
pub fn build_report(volumes: Vec<VolumeUsage>, settings: &ReportSettings) -> CategorizedReport {
    let mut report = classify(volumes);
    report.critical = select_critical(&report.general, settings.critical_threshold);
    report
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Case-insensitive substring filter on mountpoints.
///
/// Input is trimmed; a blank filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountFilter {
    raw: String,
    needle: String,
}

impl MountFilter {
    pub fn new(raw: Option<&str>) -> Self {
        let raw = raw.unwrap_or_default().trim().to_string();
        let needle = raw.to_lowercase();
        Self { raw, needle }
    }

    /// The trimmed filter text as supplied (empty when none).
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }

    pub fn matches(&self, mountpoint: &str) -> bool {
        self.is_empty() || mountpoint.to_lowercase().contains(&self.needle)
    }
}

// ---------------------------------------------------------------------------
// View model
// ---------------------------------------------------------------------------

/// Everything the index page displays.
#[derive(Debug, Clone, Serialize)]
pub struct ReportView {
    pub critical: Vec<VolumeUsage>,
    pub general: Vec<VolumeUsage>,
    pub curator: Vec<VolumeUsage>,
    pub raysync: Vec<VolumeUsage>,
    pub lucid: Vec<VolumeUsage>,
    pub defunct: Vec<VolumeUsage>,
    /// Sum of used capacity over the (filtered) general group.
    pub total_used_tb: f64,
    /// `total_used_tb` as a percentage of the fleet capacity.
    pub percent_utilized: f64,
    pub fleet_capacity_tb: f64,
    pub critical_threshold: f64,
    /// Local date the report was generated, e.g. "October 19, 2026".
    pub report_date: String,
    /// Trimmed filter text; empty when unfiltered.
    pub current_filter: String,
}

impl ReportView {
    /// Build the view model from a categorized report.
    ///
    /// Summary figures come from the filtered general group only.
    pub fn build(report: &CategorizedReport, filter: &MountFilter, settings: &ReportSettings) -> Self {
        let filtered = report.filtered(filter);
        let total_used_tb: f64 = filtered.general.iter().map(|v| v.used_tb).sum();
        let percent_utilized = if settings.fleet_capacity_tb > 0.0 {
            total_used_tb / settings.fleet_capacity_tb * 100.0
        } else {
            0.0
        };

        Self {
            critical: filtered.critical,
            general: filtered.general,
            curator: filtered.curator,
            raysync: filtered.raysync,
            lucid: filtered.lucid,
            defunct: filtered.defunct,
            total_used_tb,
            percent_utilized,
            fleet_capacity_tb: settings.fleet_capacity_tb,
            critical_threshold: settings.critical_threshold,
            report_date: chrono::Local::now().format("%B %d, %Y").to_string(),
            current_filter: filter.as_str().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// CSV export
// ---------------------------------------------------------------------------

/// Render the filtered general group as a CSV document.
pub fn general_csv(report: &CategorizedReport, filter: &MountFilter) -> Result<String, CoreError> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    wtr.write_record(CSV_HEADER).map_err(csv_error)?;

    for v in report.general.iter().filter(|v| filter.matches(&v.mountpoint)) {
        wtr.write_record([
            v.device.clone(),
            v.mountpoint.clone(),
            format!("{:.5}", v.total_tb),
            format!("{:.5}", v.used_tb),
            format!("{:.5}", v.free_tb),
            format!("{:.2}", v.utilization_percent()),
        ])
        .map_err(csv_error)?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| CoreError::Internal(format!("Failed to flush CSV: {e}")))?;
    String::from_utf8(bytes).map_err(|e| CoreError::Internal(format!("CSV is not UTF-8: {e}")))
}

fn csv_error(e: csv::Error) -> CoreError {
    CoreError::Internal(format!("Failed to write CSV: {e}"))
}
