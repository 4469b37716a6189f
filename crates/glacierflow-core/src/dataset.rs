//! Joins geometry, climate and mass-balance sources into the glacier-year table.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{info, instrument, warn};

use crate::constants::{HISTORY_END_YEAR, HISTORY_START_YEAR};
use crate::domain::{
    ClimateFeature, GlacierId, GlacierRecord, GlacierYearFeature, InventoryArea,
    MassBalanceObservation,
};
use crate::error::CoreError;
use crate::keys::{GlacierKey, normalize_key};

/// Running mean that ignores missing and non-finite values.
#[derive(Debug, Default, Clone, Copy)]
struct MeanAcc {
    sum: f64,
    n: usize,
}

impl MeanAcc {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value
            && v.is_finite()
        {
            self.sum += v;
            self.n += 1;
        }
    }

    fn mean(self) -> Option<f64> {
        (self.n > 0).then(|| self.sum / self.n as f64)
    }
}

/// What makes two glacier rows the same glacier: the normalized key when
/// the ID has one, the raw ID otherwise.
#[derive(PartialEq, Eq, Hash)]
enum GlacierIdentity<'a> {
    Key(GlacierKey),
    Raw(&'a GlacierId),
}

/// First record per glacier, in input order.
///
/// IDs from different key spaces that normalize to the same key count as
/// one glacier.
pub(crate) fn distinct_glaciers(glaciers: &[GlacierRecord]) -> Vec<&GlacierRecord> {
    let mut seen: HashSet<GlacierIdentity<'_>> = HashSet::new();
    let mut out = Vec::with_capacity(glaciers.len());
    for g in glaciers {
        let identity = normalize_key(g.glacier_id.as_str())
            .map_or(GlacierIdentity::Raw(&g.glacier_id), GlacierIdentity::Key);
        if seen.insert(identity) {
            out.push(g);
        } else {
            warn!(glacier_id = %g.glacier_id, "duplicate glacier record ignored");
        }
    }
    out
}

/// Replace each glacier's area with the inventory area matched on normalized key.
///
/// Duplicate inventory keys are averaged first. Glaciers whose key is
/// unparseable or unmatched come back with `area_km2 = None`.
#[instrument(skip_all, fields(n_glaciers = glaciers.len(), n_inventory = inventory.len()))]
pub fn reconcile_area(glaciers: &[GlacierRecord], inventory: &[InventoryArea]) -> Vec<GlacierRecord> {
    let mut by_key: HashMap<GlacierKey, MeanAcc> = HashMap::new();
    for row in inventory {
        if let Some(key) = normalize_key(&row.rgi_id) {
            by_key.entry(key).or_default().push(row.area_km2);
        }
    }
    let areas: HashMap<GlacierKey, f64> = by_key
        .into_iter()
        .filter_map(|(k, acc)| acc.mean().map(|m| (k, m)))
        .collect();

    let mut unmatched = 0usize;
    let out: Vec<GlacierRecord> = glaciers
        .iter()
        .map(|g| {
            let area = normalize_key(g.glacier_id.as_str()).and_then(|k| areas.get(&k).copied());
            if area.is_none() {
                unmatched += 1;
            }
            GlacierRecord {
                area_km2: area,
                ..g.clone()
            }
        })
        .collect();

    if unmatched > 0 {
        warn!(unmatched, "glaciers without an inventory area");
    }
    info!(
        matched = out.len() - unmatched,
        inventory_keys = areas.len(),
        "area reconciliation complete"
    );
    out
}

/// Average duplicate climate rows per glacier.
fn climate_by_glacier(climate: &[ClimateFeature]) -> HashMap<&GlacierId, [Option<f64>; 3]> {
    let mut acc: HashMap<&GlacierId, [MeanAcc; 3]> = HashMap::new();
    for row in climate {
        let entry = acc.entry(&row.glacier_id).or_default();
        entry[0].push(row.temp_mean);
        entry[1].push(row.prec_mean);
        entry[2].push(row.srad_mean);
    }
    acc.into_iter()
        .map(|(id, [t, p, s])| (id, [t.mean(), p.mean(), s.mean()]))
        .collect()
}

/// Average duplicate (key, year) observations inside the historical window.
fn observations_by_key(
    observations: &[MassBalanceObservation],
) -> HashMap<&GlacierKey, Vec<(i32, f64)>> {
    let mut acc: BTreeMap<(&GlacierKey, i32), MeanAcc> = BTreeMap::new();
    for obs in observations {
        if (HISTORY_START_YEAR..=HISTORY_END_YEAR).contains(&obs.year) {
            acc.entry((&obs.glacier_key, obs.year))
                .or_default()
                .push(Some(obs.mass_change));
        }
    }
    let mut out: HashMap<&GlacierKey, Vec<(i32, f64)>> = HashMap::new();
    for ((key, year), a) in acc {
        if let Some(mean) = a.mean() {
            out.entry(key).or_default().push((year, mean));
        }
    }
    out
}

/// Build the canonical glacier-year table.
///
/// Inner join of glaciers and climate on `glacier_id` with observations on
/// the normalized key. Rows missing any feature are dropped; duplicate
/// sources are averaged before joining so no join multiplies rows.
/// Output is sorted by `(glacier_id, year)`.
///
/// # Errors
///
/// Returns [`CoreError::EmptyInput`] when no glacier-year survives the join.
#[instrument(skip_all, fields(
    n_glaciers = glaciers.len(),
    n_climate = climate.len(),
    n_observations = observations.len()
))]
pub fn build_ml_dataset(
    glaciers: &[GlacierRecord],
    climate: &[ClimateFeature],
    observations: &[MassBalanceObservation],
) -> Result<Vec<GlacierYearFeature>, CoreError> {
    let climate = climate_by_glacier(climate);
    let observations = observations_by_key(observations);

    let mut unparseable = 0usize;
    let mut incomplete = 0usize;
    let mut rows = Vec::new();

    for glacier in distinct_glaciers(glaciers) {
        let Some(key) = normalize_key(glacier.glacier_id.as_str()) else {
            unparseable += 1;
            continue;
        };
        let Some(series) = observations.get(&key) else {
            continue;
        };
        let features = climate.get(&glacier.glacier_id).and_then(|[t, p, s]| {
            let area = glacier.area_km2.filter(|a| a.is_finite())?;
            Some((area, (*t)?, (*p)?, (*s)?))
        });
        let Some((area_km2, temp_mean, prec_mean, srad_mean)) = features else {
            incomplete += 1;
            continue;
        };
        rows.extend(series.iter().map(|&(year, mass_change)| GlacierYearFeature {
            glacier_id: glacier.glacier_id.clone(),
            year,
            area_km2,
            temp_mean,
            prec_mean,
            srad_mean,
            mass_change,
        }));
    }

    if unparseable > 0 {
        warn!(unparseable, "glacier IDs without a recognizable key dropped");
    }
    if incomplete > 0 {
        warn!(incomplete, "glaciers with missing area or climate dropped");
    }

    rows.sort_by(|a, b| a.glacier_id.cmp(&b.glacier_id).then(a.year.cmp(&b.year)));

    if rows.is_empty() {
        return Err(CoreError::EmptyInput { stage: "dataset" });
    }

    info!(
        n_rows = rows.len(),
        n_glaciers = rows
            .iter()
            .map(|r| &r.glacier_id)
            .collect::<HashSet<_>>()
            .len(),
        "glacier-year dataset built"
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glacier(id: &str, area: Option<f64>) -> GlacierRecord {
        GlacierRecord {
            glacier_id: GlacierId::new(id),
            lat: Some(30.0),
            lon: Some(80.0),
            area_km2: area,
            region: "15".to_string(),
        }
    }

    fn climate(id: &str, temp: f64) -> ClimateFeature {
        ClimateFeature {
            glacier_id: GlacierId::new(id),
            prec_mean: Some(800.0),
            temp_mean: Some(temp),
            srad_mean: Some(150.0),
        }
    }

    fn obs(key: &str, year: i32, mass_change: f64) -> MassBalanceObservation {
        MassBalanceObservation {
            glacier_key: key.parse().unwrap(),
            year,
            mass_change,
        }
    }

    #[test]
    fn inner_join_across_key_spaces() {
        let glaciers = vec![
            glacier("RGI2000-v7.0-I-15-00002", Some(2.0)),
            glacier("RGI2000-v7.0-I-15-00001", Some(10.0)),
            glacier("RGI2000-v7.0-I-15-00003", Some(4.0)),
        ];
        let climate = vec![
            climate("RGI2000-v7.0-I-15-00001", -3.0),
            climate("RGI2000-v7.0-I-15-00002", -2.0),
            climate("RGI2000-v7.0-I-15-00003", -1.0),
        ];
        let observations = vec![
            obs("15.00002", 2001, -0.1),
            obs("15.00001", 2001, -0.5),
            obs("15.00001", 2000, -0.4),
        ];
        let rows = build_ml_dataset(&glaciers, &climate, &observations).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].glacier_id.as_str(), "RGI2000-v7.0-I-15-00001");
        assert_eq!(rows[0].year, 2000);
        assert_eq!(rows[1].year, 2001);
        assert_eq!(rows[2].glacier_id.as_str(), "RGI2000-v7.0-I-15-00002");
        assert_eq!(rows[2].area_km2, 2.0);
    }

    #[test]
    fn duplicates_are_averaged_not_multiplied() {
        let glaciers = vec![glacier("RGI60-15.00001", Some(1.0))];
        let climate = vec![climate("RGI60-15.00001", -2.0), climate("RGI60-15.00001", -4.0)];
        let observations = vec![obs("15.00001", 2005, -0.2), obs("15.00001", 2005, -0.4)];
        let rows = build_ml_dataset(&glaciers, &climate, &observations).unwrap();
        assert_eq!(rows.len(), 1);
        assert!((rows[0].temp_mean + 3.0).abs() < 1e-12);
        assert!((rows[0].mass_change + 0.3).abs() < 1e-12);
    }

    #[test]
    fn years_outside_history_and_missing_features_dropped() {
        let glaciers = vec![
            glacier("RGI60-15.00001", Some(1.0)),
            glacier("RGI60-15.00002", None),
            glacier("no-key-here", Some(1.0)),
        ];
        let climate = vec![
            climate("RGI60-15.00001", -2.0),
            climate("RGI60-15.00002", -2.0),
            climate("no-key-here", -2.0),
        ];
        let observations = vec![
            obs("15.00001", 1999, -0.2),
            obs("15.00001", 2024, -0.2),
            obs("15.00001", 2025, -0.2),
            obs("15.00002", 2010, -0.2),
        ];
        let rows = build_ml_dataset(&glaciers, &climate, &observations).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].year, 2024);
    }

    #[test]
    fn same_glacier_under_two_id_formats_joins_once() {
        let glaciers = vec![
            glacier("RGI60-15.00001", Some(1.0)),
            glacier("RGI2000-v7.0-I-15-00001", Some(9.0)),
            glacier("RGI60-15.00001", Some(5.0)),
        ];
        let climate = vec![
            climate("RGI60-15.00001", -2.0),
            climate("RGI2000-v7.0-I-15-00001", -2.0),
        ];
        let observations = vec![obs("15.00001", 2005, -0.2), obs("15.00001", 2006, -0.4)];
        let rows = build_ml_dataset(&glaciers, &climate, &observations).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.glacier_id.as_str() == "RGI60-15.00001"));
        assert!(rows.iter().all(|r| r.area_km2 == 1.0));
    }

    #[test]
    fn distinct_glaciers_keeps_unkeyed_ids_apart() {
        let glaciers = vec![
            glacier("GLIMS-a", Some(1.0)),
            glacier("GLIMS-b", Some(1.0)),
            glacier("GLIMS-a", Some(2.0)),
        ];
        let ids: Vec<&str> = distinct_glaciers(&glaciers)
            .iter()
            .map(|g| g.glacier_id.as_str())
            .collect();
        assert_eq!(ids, ["GLIMS-a", "GLIMS-b"]);
    }

    #[test]
    fn empty_join_is_an_error() {
        let glaciers = vec![glacier("RGI60-15.00001", Some(1.0))];
        let err = build_ml_dataset(&glaciers, &[], &[]).unwrap_err();
        assert!(matches!(err, CoreError::EmptyInput { stage: "dataset" }));
    }

    #[test]
    fn reconcile_area_averages_inventory_duplicates() {
        let glaciers = vec![
            glacier("RGI2000-v7.0-I-15-00001", Some(99.0)),
            glacier("RGI2000-v7.0-I-15-00009", Some(99.0)),
        ];
        let inventory = vec![
            InventoryArea { rgi_id: "RGI2000-v7.0-G-15-00001".into(), area_km2: Some(2.0) },
            InventoryArea { rgi_id: "RGI2000-v7.0-G-15-00001".into(), area_km2: Some(4.0) },
            InventoryArea { rgi_id: "RGI2000-v7.0-G-15-00002".into(), area_km2: None },
        ];
        let out = reconcile_area(&glaciers, &inventory);
        assert_eq!(out[0].area_km2, Some(3.0));
        assert_eq!(out[1].area_km2, None);
        assert_eq!(out[1].lat, Some(30.0));
    }
}
