//! Basin/year aggregation of glacier runoff.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::constants::M2_PER_KM2;
use crate::domain::GlacierId;
use crate::hydrology::HydrologyRecord;

/// Runoff totals for one basin in one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasinYearSummary {
    pub basin: String,
    pub year: i32,
    pub total_glacier_runoff_m3: f64,
    pub mean_runoff_mm: f64,
    pub glacier_count: usize,
    pub total_glacier_area_km2: f64,
    /// Area-weighted runoff depth: total volume over total area, 0 when the
    /// basin has no glacier area.
    pub basin_runoff_mm: f64,
}

/// Runoff volume over glacier area; no area means no depth.
fn weighted_depth(runoff_m3: f64, area_km2: f64) -> f64 {
    if area_km2 > 0.0 {
        runoff_m3 / (area_km2 * M2_PER_KM2)
    } else {
        0.0
    }
}

#[derive(Default)]
struct Group<'a> {
    runoff_m3: f64,
    runoff_mm_sum: f64,
    n_rows: usize,
    area_km2: f64,
    glaciers: HashSet<&'a GlacierId>,
}

/// Group hydrology records by `(basin, year)`.
///
/// Output is sorted by basin then year and contains only groups that have
/// at least one record.
#[instrument(skip_all, fields(n_records = records.len()))]
pub fn aggregate_basins(records: &[HydrologyRecord]) -> Vec<BasinYearSummary> {
    let mut groups: BTreeMap<(&str, i32), Group<'_>> = BTreeMap::new();
    for r in records {
        let g = groups.entry((r.basin.as_str(), r.year)).or_default();
        g.runoff_m3 += r.glacier_runoff_m3;
        g.runoff_mm_sum += r.runoff_mm;
        g.n_rows += 1;
        g.area_km2 += r.area_km2;
        g.glaciers.insert(&r.glacier_id);
    }

    let summaries: Vec<BasinYearSummary> = groups
        .into_iter()
        .map(|((basin, year), g)| BasinYearSummary {
            basin: basin.to_string(),
            year,
            total_glacier_runoff_m3: g.runoff_m3,
            mean_runoff_mm: g.runoff_mm_sum / g.n_rows as f64,
            glacier_count: g.glaciers.len(),
            total_glacier_area_km2: g.area_km2,
            basin_runoff_mm: weighted_depth(g.runoff_m3, g.area_km2),
        })
        .collect();

    info!(
        n_basin_years = summaries.len(),
        n_basins = summaries.iter().map(|s| s.basin.as_str()).collect::<HashSet<_>>().len(),
        "basin aggregation complete"
    );
    summaries
}
