//! Naming-convention classification of volumes into storage tiers.
//!
//! Each [`CategoryRule`] is a prefix match on the mountpoint basename with
//! an optional exclusion substring checked against the full mountpoint.
//! Rules are evaluated independently, so a volume may match more than one;
//! the general group is whatever no general-removing rule claimed.

use std::collections::HashSet;

use serde::Serialize;

use crate::report::CategorizedReport;
use crate::volume::VolumeUsage;

/// Named storage tier recognised by a classification rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Archival / curation system volumes.
    Curator,
    /// Sync-replication volumes.
    Raysync,
    /// Storage appliance volumes.
    Lucid,
    /// Retired volumes, still counted as general capacity.
    Defunct,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Curator => "curator",
            Category::Raysync => "raysync",
            Category::Lucid => "lucid",
            Category::Defunct => "defunct",
        }
    }
}

/// One row of the classification table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRule {
    pub category: Category,
    /// Required prefix of the mountpoint basename.
    pub prefix: &'static str,
    /// Mountpoints containing this substring never match the rule.
    pub exclude: Option<&'static str>,
    /// Whether a match removes the volume from the general group.
    pub removes_from_general: bool,
}

impl CategoryRule {
    pub fn matches(&self, volume: &VolumeUsage) -> bool {
        if !volume.basename().starts_with(self.prefix) {
            return false;
        }
        match self.exclude {
            Some(needle) => !volume.mountpoint.contains(needle),
            None => true,
        }
    }
}

/// The production rule table.
pub const DEFAULT_RULES: &[CategoryRule] = &[
    CategoryRule {
        category: Category::Curator,
        prefix: "AMS",
        exclude: None,
        removes_from_general: true,
    },
    CategoryRule {
        category: Category::Raysync,
        prefix: "PMC_RAYSYNC_",
        exclude: Some("PMC_RAYSYNC_ROOT"),
        removes_from_general: true,
    },
    CategoryRule {
        category: Category::Lucid,
        prefix: "LUCID",
        exclude: Some("LUCID_ROOT"),
        removes_from_general: true,
    },
    CategoryRule {
        category: Category::Defunct,
        prefix: "DEFUNCT",
        exclude: None,
        removes_from_general: false,
    },
];

/// Classify with [`DEFAULT_RULES`].
pub fn classify(volumes: Vec<VolumeUsage>) -> CategorizedReport {
    classify_with(DEFAULT_RULES, volumes)
}

/// Partition `volumes` by `rules`.
///
/// Category groups keep input order. The general group is re-sorted by
/// mountpoint. `critical` is left empty for
/// [`crate::critical::select_critical`] to fill.
pub fn classify_with(rules: &[CategoryRule], volumes: Vec<VolumeUsage>) -> CategorizedReport {
    let mut report = CategorizedReport::default();
    let mut grouped: HashSet<&str> = HashSet::new();

    for rule in rules {
        for volume in volumes.iter().filter(|v| rule.matches(v)) {
            report.group_mut(rule.category).push(volume.clone());
            if rule.removes_from_general {
                grouped.insert(volume.mountpoint.as_str());
            }
        }
    }

    let mut general: Vec<VolumeUsage> = volumes
        .iter()
        .filter(|v| !grouped.contains(v.mountpoint.as_str()))
        .cloned()
        .collect();
    general.sort_by(|a, b| a.mountpoint.cmp(&b.mountpoint));
    report.general = general;

    tracing::debug!(
        curator = report.curator.len(),
        raysync = report.raysync.len(),
        lucid = report.lucid.len(),
        defunct = report.defunct.len(),
        general = report.general.len(),
        "Classified volumes"
    );

    report
}
