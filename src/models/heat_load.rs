use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ProcessingError, Result};
use crate::models::{DailyRegionLoad, DailyStationTemperature, HeatwaveFlag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DayType {
    Normal,
    Hot,
    Heatwave,
}

impl DayType {
    pub fn classify(is_hot_day: bool, is_heatwave_day: bool) -> Self {
        if is_heatwave_day {
            DayType::Heatwave
        } else if is_hot_day {
            DayType::Hot
        } else {
            DayType::Normal
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DayType::Normal => "Normal Day",
            DayType::Hot => "Hot Day",
            DayType::Heatwave => "Heatwave Day",
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Final analytic row: one per (station, day), with the mapped region's load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatLoadDaily {
    pub station_id: String,
    pub region_id: String,
    pub day: NaiveDate,
    pub daily_max_temp_c: Option<f64>,
    pub daily_avg_temp_c: Option<f64>,
    pub is_hot_day: bool,
    pub is_heatwave_day: bool,
    pub daily_total_mwh: Option<f64>,
    pub daily_peak_mwh: Option<f64>,
}

impl HeatLoadDaily {
    pub fn day_type(&self) -> DayType {
        DayType::classify(self.is_hot_day, self.is_heatwave_day)
    }

    pub fn has_load(&self) -> bool {
        self.daily_total_mwh.is_some()
    }
}

#[derive(Default)]
pub struct HeatLoadDailyBuilder {
    station_id: Option<String>,
    region_id: Option<String>,
    day: Option<NaiveDate>,
    daily_max_temp_c: Option<f64>,
    daily_avg_temp_c: Option<f64>,
    is_hot_day: bool,
    is_heatwave_day: bool,
    daily_total_mwh: Option<f64>,
    daily_peak_mwh: Option<f64>,
}

impl HeatLoadDailyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temperature(mut self, daily: &DailyStationTemperature) -> Self {
        self.station_id = Some(daily.station_id.clone());
        self.day = Some(daily.day);
        self.daily_max_temp_c = daily.daily_max_temp_c;
        self.daily_avg_temp_c = daily.daily_avg_temp_c;
        self
    }

    pub fn flags(mut self, flag: &HeatwaveFlag) -> Self {
        self.is_hot_day = flag.is_hot_day;
        self.is_heatwave_day = flag.is_heatwave_day;
        self
    }

    pub fn region(mut self, region_id: &str) -> Self {
        self.region_id = Some(region_id.to_string());
        self
    }

    /// Absent load leaves both load fields null.
    pub fn load(mut self, load: Option<&DailyRegionLoad>) -> Self {
        self.daily_total_mwh = load.and_then(|l| l.daily_total_mwh);
        self.daily_peak_mwh = load.and_then(|l| l.daily_peak_mwh);
        self
    }

    pub fn build(self) -> Result<HeatLoadDaily> {
        Ok(HeatLoadDaily {
            station_id: self
                .station_id
                .ok_or_else(|| ProcessingError::MissingData("station_id".to_string()))?,
            region_id: self
                .region_id
                .ok_or_else(|| ProcessingError::MissingData("region_id".to_string()))?,
            day: self
                .day
                .ok_or_else(|| ProcessingError::MissingData("day".to_string()))?,
            daily_max_temp_c: self.daily_max_temp_c,
            daily_avg_temp_c: self.daily_avg_temp_c,
            is_hot_day: self.is_hot_day,
            is_heatwave_day: self.is_heatwave_day,
            daily_total_mwh: self.daily_total_mwh,
            daily_peak_mwh: self.daily_peak_mwh,
        })
    }
}
