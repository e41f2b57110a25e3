use crate::config::StationRegionMap;
use crate::error::{ProcessingError, Result};
use crate::models::{
    DailyRegionLoad, DailyStationTemperature, HeatLoadDaily, HeatLoadDailyBuilder, HeatwaveFlag,
};
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::debug;

/// Left-joins station-days onto their mapped region's daily load.
///
/// The output has exactly one row per input station-day. The load side is
/// indexed by (region, day) and must be unique on that key, which is what
/// keeps the join from fanning out.
pub struct RegionJoiner<'a> {
    region_map: &'a StationRegionMap,
}

impl<'a> RegionJoiner<'a> {
    pub fn new(region_map: &'a StationRegionMap) -> Self {
        Self { region_map }
    }

    /// `flags` must be the detector output for `daily`: same length, same
    /// order. Output is sorted by (region, day, station).
    pub fn join(
        &self,
        daily: &[DailyStationTemperature],
        flags: &[HeatwaveFlag],
        loads: &[DailyRegionLoad],
    ) -> Result<Vec<HeatLoadDaily>> {
        if flags.len() != daily.len() {
            return Err(ProcessingError::MisalignedFlags {
                row: flags.len().min(daily.len()),
            });
        }

        let load_index = index_loads(loads)?;

        let mut joined = Vec::with_capacity(daily.len());
        let mut unmatched = 0usize;

        for (row, (temperature, flag)) in daily.iter().zip(flags).enumerate() {
            if flag.station_id != temperature.station_id || flag.day != temperature.day {
                return Err(ProcessingError::MisalignedFlags { row });
            }

            let region_id = self.region_map.resolve(&temperature.station_id)?;
            let load = load_index.get(&(region_id, temperature.day)).copied();
            if load.is_none() {
                unmatched += 1;
            }

            joined.push(
                HeatLoadDailyBuilder::new()
                    .temperature(temperature)
                    .flags(flag)
                    .region(region_id)
                    .load(load)
                    .build()?,
            );
        }

        verify_row_count(daily.len(), joined.len())?;

        joined.sort_by(|a, b| {
            a.region_id
                .cmp(&b.region_id)
                .then_with(|| a.day.cmp(&b.day))
                .then_with(|| a.station_id.cmp(&b.station_id))
        });

        debug!(
            rows = joined.len(),
            without_load = unmatched,
            "Joined station days to regional load"
        );

        Ok(joined)
    }
}

/// Index daily loads by (region, day), rejecting duplicate keys.
pub fn index_loads(loads: &[DailyRegionLoad]) -> Result<HashMap<(&str, NaiveDate), &DailyRegionLoad>> {
    let mut index = HashMap::with_capacity(loads.len());

    for load in loads {
        if index.insert((load.region_id.as_str(), load.day), load).is_some() {
            return Err(ProcessingError::DuplicateLoadKey {
                region_id: load.region_id.clone(),
                day: load.day,
            });
        }
    }

    Ok(index)
}

pub fn verify_row_count(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(ProcessingError::IntegrityViolation { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StationRegion;
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    fn region_map() -> StationRegionMap {
        StationRegionMap::new(
            vec![
                StationRegion::new("IAD", "PJM"),
                StationRegion::new("DCA", "PJM"),
                StationRegion::new("BOS", "ISNE"),
            ],
            vec!["PJM".to_string(), "ISNE".to_string()],
        )
        .unwrap()
    }

    fn temperature(station: &str, d: u32, max: f64) -> DailyStationTemperature {
        DailyStationTemperature::new(station.into(), day(d), Some(max), Some(max - 5.0), 24)
    }

    fn flag(station: &str, d: u32, hot: bool) -> HeatwaveFlag {
        HeatwaveFlag {
            station_id: station.into(),
            day: day(d),
            is_hot_day: hot,
            is_heatwave_day: false,
        }
    }

    fn load(region: &str, d: u32, total: f64) -> DailyRegionLoad {
        DailyRegionLoad::new(region.into(), day(d), Some(total), Some(total / 10.0), 24)
    }

    #[test]
    fn test_left_join_keeps_unmatched_rows() {
        let daily = vec![temperature("IAD", 1, 33.0), temperature("BOS", 1, 25.0)];
        let flags = vec![flag("IAD", 1, true), flag("BOS", 1, false)];
        let loads = vec![load("PJM", 1, 1000.0)];

        let joined = RegionJoiner::new(&region_map()).join(&daily, &flags, &loads).unwrap();

        assert_eq!(joined.len(), 2);
        // Sorted by region: ISNE before PJM
        assert_eq!(joined[0].station_id, "BOS");
        assert_eq!(joined[0].region_id, "ISNE");
        assert_eq!(joined[0].daily_total_mwh, None);
        assert_eq!(joined[0].daily_peak_mwh, None);
        assert_eq!(joined[1].region_id, "PJM");
        assert_eq!(joined[1].daily_total_mwh, Some(1000.0));
        assert!(joined[1].is_hot_day);
    }

    #[test]
    fn test_stations_sharing_a_region_do_not_fan_out() {
        let daily = vec![
            temperature("IAD", 1, 33.0),
            temperature("DCA", 1, 34.0),
            temperature("IAD", 2, 30.0),
        ];
        let flags = vec![flag("IAD", 1, true), flag("DCA", 1, true), flag("IAD", 2, false)];
        let loads = vec![load("PJM", 1, 1000.0), load("PJM", 2, 900.0), load("ISNE", 1, 400.0)];

        let joined = RegionJoiner::new(&region_map()).join(&daily, &flags, &loads).unwrap();

        assert_eq!(joined.len(), daily.len());
        let keys: Vec<(&str, NaiveDate)> = joined
            .iter()
            .map(|r| (r.station_id.as_str(), r.day))
            .collect();
        assert_eq!(keys, vec![("DCA", day(1)), ("IAD", day(1)), ("IAD", day(2))]);
        assert_eq!(joined[0].daily_total_mwh, Some(1000.0));
        assert_eq!(joined[2].daily_total_mwh, Some(900.0));
    }

    #[test]
    fn test_duplicate_load_key_is_rejected() {
        let daily = vec![temperature("IAD", 1, 33.0)];
        let flags = vec![flag("IAD", 1, true)];
        let loads = vec![load("PJM", 1, 1000.0), load("PJM", 1, 1100.0)];

        let result = RegionJoiner::new(&region_map()).join(&daily, &flags, &loads);

        assert!(matches!(
            result,
            Err(ProcessingError::DuplicateLoadKey { ref region_id, .. }) if region_id == "PJM"
        ));
    }

    #[test]
    fn test_unmapped_station() {
        let daily = vec![temperature("LAX", 1, 33.0)];
        let flags = vec![flag("LAX", 1, true)];

        let result = RegionJoiner::new(&region_map()).join(&daily, &flags, &[]);

        assert!(matches!(result, Err(ProcessingError::UnmappedStation { .. })));
    }

    #[test]
    fn test_misaligned_flags() {
        let daily = vec![temperature("IAD", 1, 33.0), temperature("IAD", 2, 33.0)];
        let map = region_map();
        let joiner = RegionJoiner::new(&map);

        let short = joiner.join(&daily, &[flag("IAD", 1, true)], &[]);
        assert!(matches!(short, Err(ProcessingError::MisalignedFlags { row: 1 })));

        let swapped = joiner.join(&daily, &[flag("IAD", 2, true), flag("IAD", 1, true)], &[]);
        assert!(matches!(swapped, Err(ProcessingError::MisalignedFlags { row: 0 })));
    }

    #[test]
    fn test_verify_row_count() {
        assert!(verify_row_count(3, 3).is_ok());
        assert!(matches!(
            verify_row_count(3, 4),
            Err(ProcessingError::IntegrityViolation {
                expected: 3,
                actual: 4
            })
        ));
    }
}
