use crate::error::{ProcessingError, Result};
use crate::models::HourlyLoadReading;
use crate::readers::ReadOutcome;
use crate::utils::constants::{
    DEFAULT_BUFFER_SIZE, DEFAULT_LOAD_MAX_PLAUSIBLE_MWH, DEFAULT_LOAD_MIN_EXCLUSIVE_MWH,
};
use crate::utils::time::{parse_utc_timestamp, truncate_to_hour};
use chrono::{DateTime, Utc};
use memmap2::Mmap;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct HourlyLoadRow {
    #[serde(alias = "region", alias = "parent")]
    region_id: String,

    #[serde(alias = "hour_utc", alias = "period")]
    hour_timestamp: String,

    #[serde(
        alias = "load_megawatt_hours",
        alias = "value",
        alias = "value_mwh",
        default
    )]
    load_mwh: Option<String>,

    #[serde(alias = "subba", alias = "subregion", default)]
    subregion_id: Option<String>,
}

/// A parsed row before sub-regions are combined into their parent region.
#[derive(Debug)]
struct LoadRecord {
    reading: HourlyLoadReading,
    subregion_id: Option<String>,
}

/// Reads hourly regional load, dropping implausible values.
#[derive(Debug, Clone)]
pub struct LoadReader {
    use_mmap: bool,
    min_exclusive_mwh: f64,
    max_plausible_mwh: f64,
}

impl LoadReader {
    pub fn new() -> Self {
        Self {
            use_mmap: false,
            min_exclusive_mwh: DEFAULT_LOAD_MIN_EXCLUSIVE_MWH,
            max_plausible_mwh: DEFAULT_LOAD_MAX_PLAUSIBLE_MWH,
        }
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    /// Keep loads in `(min_exclusive, max_plausible]`.
    pub fn with_plausible_range(mut self, min_exclusive_mwh: f64, max_plausible_mwh: f64) -> Self {
        self.min_exclusive_mwh = min_exclusive_mwh;
        self.max_plausible_mwh = max_plausible_mwh;
        self
    }

    pub fn read_loads(&self, path: &Path) -> Result<ReadOutcome<HourlyLoadReading>> {
        let file = File::open(path)?;

        let outcome = if self.use_mmap {
            let mmap = unsafe { Mmap::map(&file)? };
            self.read_from(&mmap[..])?
        } else {
            self.read_from(file)?
        };

        debug!(
            path = %path.display(),
            records = outcome.records.len(),
            skipped = outcome.skipped,
            filtered = outcome.filtered,
            "Read hourly load readings"
        );
        Ok(outcome)
    }

    pub fn read_from<R: Read>(&self, source: R) -> Result<ReadOutcome<HourlyLoadReading>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .buffer_capacity(DEFAULT_BUFFER_SIZE)
            .from_reader(source);

        let mut outcome = ReadOutcome::default();
        let mut parsed = Vec::new();

        for (index, row) in reader.deserialize::<HourlyLoadRow>().enumerate() {
            let line = index + 2;
            let row = match row {
                Ok(row) => row,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    warn!(line, error = %e, "Skipping malformed load row");
                    outcome.skipped += 1;
                    continue;
                }
            };

            match self.parse_row(row) {
                Ok(record) => parsed.push(record),
                Err(e) => {
                    warn!(line, error = %e, "Skipping load record");
                    outcome.skipped += 1;
                }
            }
        }

        for reading in combine_subregions(parsed) {
            if self.is_plausible(reading.load_mwh) {
                outcome.records.push(reading);
            } else {
                debug!(
                    region = %reading.region_id,
                    hour = %reading.hour_timestamp,
                    load = ?reading.load_mwh,
                    "Excluding implausible load"
                );
                outcome.filtered += 1;
            }
        }

        Ok(outcome)
    }

    fn parse_row(&self, row: HourlyLoadRow) -> Result<LoadRecord> {
        if row.region_id.is_empty() {
            return Err(ProcessingError::InvalidFormat("Empty region id".to_string()));
        }

        let hour = truncate_to_hour(parse_utc_timestamp(&row.hour_timestamp)?);
        let load_mwh = match row.load_mwh.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<f64>().map_err(|_| {
                ProcessingError::InvalidFormat(format!("Invalid load value: '{}'", raw))
            })?),
        };

        let subregion_id = row.subregion_id.filter(|id| !id.is_empty());

        Ok(LoadRecord {
            reading: HourlyLoadReading::new(row.region_id, hour, load_mwh),
            subregion_id,
        })
    }

    /// Blank loads pass through as nulls; present values must be in range.
    fn is_plausible(&self, load_mwh: Option<f64>) -> bool {
        match load_mwh {
            None => true,
            Some(value) => {
                value.is_finite() && value > self.min_exclusive_mwh && value <= self.max_plausible_mwh
            }
        }
    }
}

/// Sum sub-region rows into one reading per (region, hour).
///
/// A sub-region repeated within an hour counts once, first valued row wins.
/// The sum is null only when no sub-region carries a value. Rows without a
/// sub-region pass through untouched and are deduplicated downstream.
fn combine_subregions(records: Vec<LoadRecord>) -> Vec<HourlyLoadReading> {
    let mut combined: Vec<HourlyLoadReading> = Vec::with_capacity(records.len());
    let mut positions: HashMap<(String, DateTime<Utc>), usize> = HashMap::new();
    let mut seen: HashMap<(String, DateTime<Utc>, String), Option<f64>> = HashMap::new();

    for LoadRecord {
        reading,
        subregion_id,
    } in records
    {
        let Some(subregion_id) = subregion_id else {
            combined.push(reading);
            continue;
        };

        let hour_key = (reading.region_id.clone(), reading.hour_timestamp);
        let previous = seen
            .entry((hour_key.0.clone(), hour_key.1, subregion_id))
            .or_insert(None);
        let added = match (*previous, reading.load_mwh) {
            (None, Some(value)) => {
                *previous = Some(value);
                Some(value)
            }
            _ => None,
        };

        match positions.get(&hour_key) {
            Some(&pos) => {
                if let Some(value) = added {
                    let total = &mut combined[pos].load_mwh;
                    *total = Some(total.unwrap_or(0.0) + value);
                }
            }
            None => {
                positions.insert(hour_key, combined.len());
                combined.push(HourlyLoadReading::new(
                    reading.region_id,
                    reading.hour_timestamp,
                    added,
                ));
            }
        }
    }

    combined
}

impl Default for LoadReader {
    fn default() -> Self {
        Self::new()
    }
}
