//! Shared query parameter types for report handlers.

use serde::Deserialize;
use storemon_core::report::MountFilter;

/// Optional mountpoint filter (`?filter=`).
///
/// Shared by the index page, the CSV download and the JSON report so all
/// three apply identical filtering.
#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    pub filter: Option<String>,
}

impl FilterParams {
    pub fn mount_filter(&self) -> MountFilter {
        MountFilter::new(self.filter.as_deref())
    }
}
