use crate::error::{ProcessingError, Result};
use crate::models::{DayType, HeatLoadDaily};
use crate::writers::read_heat_load_daily;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadByDayType {
    pub days: usize,
    pub days_with_load: usize,
    pub total_mwh_sum: f64,
    pub peak_mwh_max: Option<f64>,
}

impl LoadByDayType {
    /// Mean daily total over rows that carry load.
    pub fn average_daily_total(&self) -> Option<f64> {
        if self.days_with_load == 0 {
            None
        } else {
            Some(self.total_mwh_sum / self.days_with_load as f64)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationHeatCounts {
    pub days: usize,
    pub hot_days: usize,
    pub heatwave_days: usize,
}

#[derive(Debug)]
pub struct HeatLoadStatistics {
    pub total_rows: usize,
    pub date_range: (NaiveDate, NaiveDate),
    pub regions: BTreeSet<String>,
    pub load_by_day_type: BTreeMap<(String, DayType), LoadByDayType>,
    pub station_counts: BTreeMap<String, StationHeatCounts>,
    pub rows_without_load: usize,
}

pub struct LoadAnalyzer;

impl LoadAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze_parquet(&self, path: &Path) -> Result<HeatLoadStatistics> {
        self.analyze_parquet_with_limit(path, 0)
    }

    /// `limit` of 0 reads every row.
    pub fn analyze_parquet_with_limit(&self, path: &Path, limit: usize) -> Result<HeatLoadStatistics> {
        let limit = if limit == 0 { None } else { Some(limit) };
        let rows = read_heat_load_daily(path, limit)?;

        self.calculate_statistics(&rows)
    }

    pub fn calculate_statistics(&self, rows: &[HeatLoadDaily]) -> Result<HeatLoadStatistics> {
        let first = rows
            .first()
            .ok_or_else(|| ProcessingError::MissingData("No rows to analyze".to_string()))?;

        let mut min_day = first.day;
        let mut max_day = first.day;
        let mut regions = BTreeSet::new();
        let mut load_by_day_type: BTreeMap<(String, DayType), LoadByDayType> = BTreeMap::new();
        let mut station_counts: BTreeMap<String, StationHeatCounts> = BTreeMap::new();
        let mut rows_without_load = 0;

        for row in rows {
            min_day = min_day.min(row.day);
            max_day = max_day.max(row.day);
            regions.insert(row.region_id.clone());

            let bucket = load_by_day_type
                .entry((row.region_id.clone(), row.day_type()))
                .or_default();
            bucket.days += 1;
            match row.daily_total_mwh {
                Some(total) => {
                    bucket.days_with_load += 1;
                    bucket.total_mwh_sum += total;
                }
                None => rows_without_load += 1,
            }
            if let Some(peak) = row.daily_peak_mwh {
                bucket.peak_mwh_max = Some(bucket.peak_mwh_max.map_or(peak, |p| p.max(peak)));
            }

            let counts = station_counts.entry(row.station_id.clone()).or_default();
            counts.days += 1;
            if row.is_hot_day {
                counts.hot_days += 1;
            }
            if row.is_heatwave_day {
                counts.heatwave_days += 1;
            }
        }

        Ok(HeatLoadStatistics {
            total_rows: rows.len(),
            date_range: (min_day, max_day),
            regions,
            load_by_day_type,
            station_counts,
            rows_without_load,
        })
    }
}

impl HeatLoadStatistics {
    pub fn average_load(&self, region_id: &str, day_type: DayType) -> Option<f64> {
        self.load_by_day_type
            .get(&(region_id.to_string(), day_type))
            .and_then(LoadByDayType::average_daily_total)
    }

    pub fn summary(&self) -> String {
        format!(
            "Rows: {} station days\n\
            Stations: {}\n\
            Regions: {}\n\
            Date Range: {} to {} ({} days)\n\
            Rows without load: {}",
            self.total_rows,
            self.station_counts.len(),
            self.regions.iter().cloned().collect::<Vec<_>>().join(", "),
            self.date_range.0,
            self.date_range.1,
            (self.date_range.1 - self.date_range.0).num_days() + 1,
            self.rows_without_load
        )
    }

    pub fn detailed_summary(&self) -> String {
        let mut out = self.summary();

        out.push_str("\n\nAverage Daily Load by Day Type:\n");
        for region in &self.regions {
            out.push_str(&format!("  {}:\n", region));
            for day_type in [DayType::Normal, DayType::Hot, DayType::Heatwave] {
                let line = match self.load_by_day_type.get(&(region.clone(), day_type)) {
                    Some(bucket) => match bucket.average_daily_total() {
                        Some(avg) => format!(
                            "{:.0} MWh over {} days (peak {:.0} MWh)",
                            avg,
                            bucket.days_with_load,
                            bucket.peak_mwh_max.unwrap_or(f64::NAN)
                        ),
                        None => format!("no load data ({} days)", bucket.days),
                    },
                    None => "no days".to_string(),
                };
                out.push_str(&format!("    - {:<13} {}\n", day_type.display_name(), line));
            }
        }

        out.push_str("\nHot and Heatwave Days by Station:\n");
        for (station, counts) in &self.station_counts {
            out.push_str(&format!(
                "  - {}: {} hot, {} heatwave of {} days\n",
                station, counts.hot_days, counts.heatwave_days, counts.days
            ));
        }

        out
    }
}

impl Default for LoadAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
