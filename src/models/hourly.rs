use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::constants::{SENTINEL_TOLERANCE, TEMPERATURE_SENTINEL_C};

/// A single raw temperature observation, possibly sub-hourly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTemperatureSample {
    pub station_id: String,
    pub observed_at: DateTime<Utc>,
    pub temperature_c: Option<f64>,
}

impl RawTemperatureSample {
    /// Build a sample, mapping the 999.9 sentinel and non-finite values to missing.
    pub fn new(station_id: String, observed_at: DateTime<Utc>, temperature_c: Option<f64>) -> Self {
        Self {
            station_id,
            observed_at,
            temperature_c: temperature_c.filter(|t| !is_missing_temperature(*t)),
        }
    }

    pub fn is_missing(&self) -> bool {
        self.temperature_c.is_none()
    }
}

/// True for the missing-value sentinel (|t| ≈ 999.9) and anything non-finite.
pub fn is_missing_temperature(value: f64) -> bool {
    !value.is_finite() || value.abs() >= TEMPERATURE_SENTINEL_C - SENTINEL_TOLERANCE
}

/// One averaged temperature per (station, hour).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyTemperatureReading {
    pub station_id: String,
    pub hour_timestamp: DateTime<Utc>,
    pub temperature_c: Option<f64>,
    /// Non-missing raw samples averaged into this hour
    pub sample_count: u32,
}

/// Regional load for one hour. `None` means the feed reported the hour without a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyLoadReading {
    pub region_id: String,
    pub hour_timestamp: DateTime<Utc>,
    pub load_mwh: Option<f64>,
}

impl HourlyLoadReading {
    pub fn new(region_id: String, hour_timestamp: DateTime<Utc>, load_mwh: Option<f64>) -> Self {
        Self {
            region_id,
            hour_timestamp,
            load_mwh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sentinel_is_missing() {
        let ts = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();

        assert!(RawTemperatureSample::new("IAD".into(), ts, Some(999.9)).is_missing());
        assert!(RawTemperatureSample::new("IAD".into(), ts, Some(-999.9)).is_missing());
        assert!(RawTemperatureSample::new("IAD".into(), ts, Some(f64::NAN)).is_missing());
        assert!(RawTemperatureSample::new("IAD".into(), ts, None).is_missing());

        let zero = RawTemperatureSample::new("IAD".into(), ts, Some(0.0));
        assert_eq!(zero.temperature_c, Some(0.0));
    }

    #[test]
    fn test_plausible_values_kept() {
        assert!(!is_missing_temperature(56.7));
        assert!(!is_missing_temperature(-89.2));
        assert!(is_missing_temperature(999.88));
    }
}
