use crate::error::Result;
use crate::models::{DailyRegionLoad, DailyStationTemperature, HeatLoadDaily, HeatwaveEvent};
use crate::processors::region_joiner::{index_loads, verify_row_count};
use chrono::NaiveDate;
use std::fmt;
use tracing::warn;

/// Non-fatal data problems. The affected values travel on as nulls.
#[derive(Debug, Clone, PartialEq)]
pub enum DataQualityWarning {
    /// No valid hourly sample for the station on this day
    EmptyTemperatureDay { station_id: String, day: NaiveDate },
    /// No hourly load value for the region on this day
    EmptyLoadDay { region_id: String, day: NaiveDate },
    /// Minimum-length run touching the first or last day of history
    EdgeOfHistoryRun {
        station_id: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    PeakExceedsTotal {
        region_id: String,
        day: NaiveDate,
        peak_mwh: f64,
        total_mwh: f64,
    },
    /// Input records dropped by a reader
    SkippedRecord { source: String, count: usize },
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTemperatureDay { station_id, day } => {
                write!(f, "Station {} has no valid temperature on {}", station_id, day)
            }
            Self::EmptyLoadDay { region_id, day } => {
                write!(f, "Region {} has no load readings on {}", region_id, day)
            }
            Self::EdgeOfHistoryRun {
                station_id,
                start,
                end,
            } => write!(
                f,
                "Station {} heatwave {}..{} sits at the edge of available history",
                station_id, start, end
            ),
            Self::PeakExceedsTotal {
                region_id,
                day,
                peak_mwh,
                total_mwh,
            } => write!(
                f,
                "Region {} on {}: peak {:.1} MWh exceeds total {:.1} MWh",
                region_id, day, peak_mwh, total_mwh
            ),
            Self::SkippedRecord { source, count } => {
                write!(f, "{} malformed {} records skipped", count, source)
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QualityReport {
    pub warnings: Vec<DataQualityWarning>,
    pub temperature_days: usize,
    pub load_days: usize,
    pub joined_rows: usize,
    pub rows_without_load: usize,
    pub heatwave_events: usize,
}

impl QualityReport {
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn push(&mut self, warning: DataQualityWarning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    fn count(&self, predicate: impl Fn(&DataQualityWarning) -> bool) -> usize {
        self.warnings.iter().filter(|w| predicate(*w)).count()
    }
}

pub struct IntegrityChecker {
    min_run_days: usize,
}

impl IntegrityChecker {
    pub fn new(min_run_days: usize) -> Self {
        Self { min_run_days }
    }

    pub fn record_skipped(&self, source: &str, count: usize, report: &mut QualityReport) {
        if count > 0 {
            report.push(DataQualityWarning::SkippedRecord {
                source: source.to_string(),
                count,
            });
        }
    }

    pub fn check_daily_temperatures(&self, daily: &[DailyStationTemperature], report: &mut QualityReport) {
        report.temperature_days = daily.len();

        for row in daily.iter().filter(|r| r.daily_max_temp_c.is_none()) {
            report.push(DataQualityWarning::EmptyTemperatureDay {
                station_id: row.station_id.clone(),
                day: row.day,
            });
        }
    }

    /// The load table must be unique on (region, day); a duplicate is fatal.
    pub fn check_daily_loads(&self, loads: &[DailyRegionLoad], report: &mut QualityReport) -> Result<()> {
        index_loads(loads)?;
        report.load_days = loads.len();

        for load in loads {
            if load.daily_total_mwh.is_none() {
                report.push(DataQualityWarning::EmptyLoadDay {
                    region_id: load.region_id.clone(),
                    day: load.day,
                });
            }

            if let (false, Some(peak_mwh), Some(total_mwh)) =
                (load.peak_within_total(), load.daily_peak_mwh, load.daily_total_mwh)
            {
                report.push(DataQualityWarning::PeakExceedsTotal {
                    region_id: load.region_id.clone(),
                    day: load.day,
                    peak_mwh,
                    total_mwh,
                });
            }
        }

        Ok(())
    }

    /// A run of exactly the minimum length at the edge of history may have
    /// started earlier or continued later than the data shows.
    pub fn check_events(&self, events: &[HeatwaveEvent], report: &mut QualityReport) {
        report.heatwave_events = events.len();

        for event in events {
            if event.at_history_edge && event.length_days() == self.min_run_days {
                report.push(DataQualityWarning::EdgeOfHistoryRun {
                    station_id: event.station_id.clone(),
                    start: event.start,
                    end: event.end,
                });
            }
        }
    }

    /// Row count must match the pre-join temperature rows.
    pub fn check_joined(
        &self,
        temperature_rows: usize,
        joined: &[HeatLoadDaily],
        report: &mut QualityReport,
    ) -> Result<()> {
        verify_row_count(temperature_rows, joined.len())?;

        report.joined_rows = joined.len();
        report.rows_without_load = joined.iter().filter(|r| !r.has_load()).count();
        Ok(())
    }

    pub fn generate_summary(&self, report: &QualityReport) -> String {
        let mut summary = String::new();

        summary.push_str("=== Data Quality Report ===\n");
        summary.push_str(&format!("Station Days: {}\n", report.temperature_days));
        summary.push_str(&format!("Region Load Days: {}\n", report.load_days));
        summary.push_str(&format!("Joined Rows: {}\n", report.joined_rows));
        if report.joined_rows > 0 {
            summary.push_str(&format!(
                "Rows Without Load: {} ({:.1}%)\n",
                report.rows_without_load,
                100.0 * report.rows_without_load as f64 / report.joined_rows as f64
            ));
        }
        summary.push_str(&format!("Heatwave Events: {}\n", report.heatwave_events));

        summary.push_str(&format!("\nWarnings: {}\n", report.warning_count()));
        summary.push_str(&format!(
            "  Empty temperature days: {}\n",
            report.count(|w| matches!(w, DataQualityWarning::EmptyTemperatureDay { .. }))
        ));
        summary.push_str(&format!(
            "  Empty load days: {}\n",
            report.count(|w| matches!(w, DataQualityWarning::EmptyLoadDay { .. }))
        ));
        summary.push_str(&format!(
            "  Edge-of-history runs: {}\n",
            report.count(|w| matches!(w, DataQualityWarning::EdgeOfHistoryRun { .. }))
        ));
        summary.push_str(&format!(
            "  Peak above total: {}\n",
            report.count(|w| matches!(w, DataQualityWarning::PeakExceedsTotal { .. }))
        ));

        if !report.warnings.is_empty() {
            summary.push_str("\nFirst 10 Warnings:\n");
            for (i, warning) in report.warnings.iter().take(10).enumerate() {
                summary.push_str(&format!("  {}. {}\n", i + 1, warning));
            }
        }

        summary
    }
}

impl Default for IntegrityChecker {
    fn default() -> Self {
        Self::new(crate::utils::constants::DEFAULT_MIN_HEATWAVE_DAYS)
    }
}
