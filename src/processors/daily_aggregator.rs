use crate::models::{
    DailyRegionLoad, DailyStationTemperature, HourlyLoadReading, HourlyTemperatureReading,
};
use crate::utils::time::utc_day;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Running sum/max/count over the non-null values of one (entity, day).
#[derive(Debug, Default)]
struct DayAccumulator {
    sum: f64,
    max: Option<f64>,
    count: u32,
}

impl DayAccumulator {
    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.max = Some(self.max.map_or(v, |m| m.max(v)));
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    fn total(&self) -> Option<f64> {
        (self.count > 0).then_some(self.sum)
    }
}

/// Reduces hourly tables to one row per (entity, UTC calendar day).
///
/// Partial days (fewer than 24 hours) still produce a row computed over the
/// hours that exist; `valid_hours`/`hours_reported` let callers spot them.
#[derive(Debug, Default)]
pub struct DailyAggregator;

impl DailyAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Daily max and mean per station over non-null hours.
    pub fn aggregate_temperatures(
        &self,
        hourly: &[HourlyTemperatureReading],
    ) -> Vec<DailyStationTemperature> {
        let mut days: BTreeMap<(&str, NaiveDate), DayAccumulator> = BTreeMap::new();

        for reading in hourly {
            days.entry((reading.station_id.as_str(), utc_day(reading.hour_timestamp)))
                .or_default()
                .add(reading.temperature_c);
        }

        days.into_iter()
            .map(|((station_id, day), acc)| {
                DailyStationTemperature::new(
                    station_id.to_string(),
                    day,
                    acc.max,
                    acc.mean(),
                    acc.count,
                )
            })
            .collect()
    }

    /// Daily total and peak per region. Expects deduplicated hourly input;
    /// null hours are excluded from both aggregates rather than read as zero.
    pub fn aggregate_loads(&self, hourly: &[HourlyLoadReading]) -> Vec<DailyRegionLoad> {
        let mut days: BTreeMap<(&str, NaiveDate), DayAccumulator> = BTreeMap::new();

        for reading in hourly {
            days.entry((reading.region_id.as_str(), utc_day(reading.hour_timestamp)))
                .or_default()
                .add(reading.load_mwh);
        }

        days.into_iter()
            .map(|((region_id, day), acc)| {
                DailyRegionLoad::new(region_id.to_string(), day, acc.total(), acc.max, acc.count)
            })
            .collect()
    }
}
