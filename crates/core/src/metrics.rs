//! Per-release update counts shaped for charting.

use serde::Serialize;

use crate::enums::UpdateType;
use crate::model::Release;
use crate::store::TypeCount;

/// Default release-name prefix for metrics.
pub const DEFAULT_METRICS_PREFIX: &str = "F";

/// Human label for an update type series.
pub fn type_label(update_type: UpdateType) -> &'static str {
    match update_type {
        UpdateType::Bugfix => "Bug fixes",
        UpdateType::Enhancement => "Enhancements",
        UpdateType::Security => "Security updates",
        UpdateType::Newpackage => "New packages",
    }
}

/// One chart series: `[release_index, count]` points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Series {
    pub label: String,
    pub data: Vec<(usize, i64)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReleaseMetrics {
    pub data: Vec<Series>,
    /// `[release_index, release_name]` axis labels.
    pub ticks: Vec<(usize, String)>,
}

/// Shape raw counts into one series per update type over the releases whose
/// name starts with `prefix`, ordered by release version.
pub fn shape_release_metrics(
    releases: &[Release],
    counts: &[TypeCount],
    prefix: &str,
) -> ReleaseMetrics {
    let mut selected: Vec<&Release> = releases
        .iter()
        .filter(|r| r.name.starts_with(prefix))
        .collect();
    selected.sort_by(|a, b| a.version.cmp(&b.version).then(a.name.cmp(&b.name)));

    let ticks = selected
        .iter()
        .enumerate()
        .map(|(i, r)| (i, r.name.clone()))
        .collect();

    let data = UpdateType::VALUES
        .iter()
        .map(|&update_type| Series {
            label: type_label(update_type).to_string(),
            data: selected
                .iter()
                .enumerate()
                .map(|(i, release)| {
                    let count = counts
                        .iter()
                        .filter(|c| c.release == release.name && c.update_type == update_type)
                        .map(|c| c.count)
                        .sum();
                    (i, count)
                })
                .collect(),
        })
        .collect();

    ReleaseMetrics { data, ticks }
}
