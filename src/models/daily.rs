use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::utils::constants::HOURS_PER_DAY;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStationTemperature {
    pub station_id: String,
    pub day: NaiveDate,
    pub daily_max_temp_c: Option<f64>,
    pub daily_avg_temp_c: Option<f64>,
    /// Hours with a non-null temperature that fed the aggregates
    pub valid_hours: u32,
}

impl DailyStationTemperature {
    pub fn new(
        station_id: String,
        day: NaiveDate,
        daily_max_temp_c: Option<f64>,
        daily_avg_temp_c: Option<f64>,
        valid_hours: u32,
    ) -> Self {
        Self {
            station_id,
            day,
            daily_max_temp_c,
            daily_avg_temp_c,
            valid_hours,
        }
    }

    /// Null maximum is never hot.
    pub fn is_hot(&self, threshold_c: f64) -> bool {
        self.daily_max_temp_c.is_some_and(|t| t >= threshold_c)
    }

    pub fn is_partial_day(&self) -> bool {
        self.valid_hours < HOURS_PER_DAY
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRegionLoad {
    pub region_id: String,
    pub day: NaiveDate,
    pub daily_total_mwh: Option<f64>,
    pub daily_peak_mwh: Option<f64>,
    /// Hours with a load value that fed the aggregates
    pub hours_reported: u32,
}

impl DailyRegionLoad {
    pub fn new(
        region_id: String,
        day: NaiveDate,
        daily_total_mwh: Option<f64>,
        daily_peak_mwh: Option<f64>,
        hours_reported: u32,
    ) -> Self {
        Self {
            region_id,
            day,
            daily_total_mwh,
            daily_peak_mwh,
            hours_reported,
        }
    }

    /// Peak can only exceed total when negative hours were let through upstream.
    pub fn peak_within_total(&self) -> bool {
        match (self.daily_peak_mwh, self.daily_total_mwh) {
            (Some(peak), Some(total)) => peak <= total || peak <= 0.0,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatwaveFlag {
    pub station_id: String,
    pub day: NaiveDate,
    pub is_hot_day: bool,
    pub is_heatwave_day: bool,
}

/// A maximal run of consecutive hot days long enough to count as a heatwave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatwaveEvent {
    pub station_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub peak_temp_c: f64,
    /// Run touches the first or last day of the station's history, so its
    /// true extent is unknown.
    pub at_history_edge: bool,
}

impl HeatwaveEvent {
    pub fn length_days(&self) -> usize {
        ((self.end - self.start).num_days() + 1) as usize
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}
