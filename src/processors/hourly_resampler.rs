use crate::models::{HourlyTemperatureReading, RawTemperatureSample};
use crate::utils::time::truncate_to_hour;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

#[derive(Default)]
struct HourAccumulator {
    sum: f64,
    count: u32,
}

/// Averages raw samples into one reading per (station, hour).
#[derive(Debug, Default)]
pub struct HourlyResampler;

impl HourlyResampler {
    pub fn new() -> Self {
        Self
    }

    /// Timestamps are truncated to the hour before grouping. An hour whose
    /// samples are all missing still yields a row, with a null temperature.
    pub fn resample(&self, samples: &[RawTemperatureSample]) -> Vec<HourlyTemperatureReading> {
        let mut hours: BTreeMap<(&str, DateTime<Utc>), HourAccumulator> = BTreeMap::new();

        for sample in samples {
            let key = (sample.station_id.as_str(), truncate_to_hour(sample.observed_at));
            let acc = hours.entry(key).or_default();

            if let Some(temp) = sample.temperature_c {
                acc.sum += temp;
                acc.count += 1;
            }
        }

        hours
            .into_iter()
            .map(|((station_id, hour), acc)| HourlyTemperatureReading {
                station_id: station_id.to_string(),
                hour_timestamp: hour,
                temperature_c: (acc.count > 0).then(|| acc.sum / acc.count as f64),
                sample_count: acc.count,
            })
            .collect()
    }
}
