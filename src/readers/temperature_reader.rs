use crate::error::{ProcessingError, Result};
use crate::models::RawTemperatureSample;
use crate::readers::ReadOutcome;
use crate::utils::constants::{DEFAULT_BUFFER_SIZE, ENCODED_TEMPERATURE_MISSING};
use crate::utils::time::parse_utc_timestamp;
use memmap2::Mmap;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct RawTemperatureRow {
    #[serde(alias = "station", alias = "STATION")]
    station_id: String,

    #[serde(alias = "ts_utc", alias = "DATE")]
    timestamp: String,

    #[serde(alias = "temp_C", alias = "temp_c", alias = "TMP", default)]
    temperature_c: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TemperatureReader {
    use_mmap: bool,
    station_aliases: HashMap<String, String>,
}

impl TemperatureReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn with_station_aliases(mut self, aliases: HashMap<String, String>) -> Self {
        self.station_aliases = aliases;
        self
    }

    /// Read raw temperature samples from a CSV file with a header row.
    pub fn read_samples(&self, path: &Path) -> Result<ReadOutcome<RawTemperatureSample>> {
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
            "Read raw temperature samples"
        );
        Ok(outcome)
    }

    pub fn read_from<R: Read>(&self, source: R) -> Result<ReadOutcome<RawTemperatureSample>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .buffer_capacity(DEFAULT_BUFFER_SIZE)
            .from_reader(source);

        let mut outcome = ReadOutcome::default();

        for (index, row) in reader.deserialize::<RawTemperatureRow>().enumerate() {
            let line = index + 2;
            let row = match row {
                Ok(row) => row,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    warn!(line, error = %e, "Skipping malformed temperature row");
                    outcome.skipped += 1;
                    continue;
                }
            };

            match self.parse_row(row) {
                Ok(sample) => outcome.records.push(sample),
                Err(e) => {
                    warn!(line, error = %e, "Skipping temperature record");
                    outcome.skipped += 1;
                }
            }
        }

        Ok(outcome)
    }

    fn parse_row(&self, row: RawTemperatureRow) -> Result<RawTemperatureSample> {
        if row.station_id.is_empty() {
            return Err(ProcessingError::InvalidFormat("Empty station id".to_string()));
        }

        let observed_at = parse_utc_timestamp(&row.timestamp)?;
        let temperature_c = match row.temperature_c.as_deref() {
            Some(raw) => parse_temperature_field(raw)?,
            None => None,
        };

        let station_id = self
            .station_aliases
            .get(&row.station_id)
            .cloned()
            .unwrap_or(row.station_id);

        Ok(RawTemperatureSample::new(station_id, observed_at, temperature_c))
    }
}

/// Parse a temperature cell, plain Celsius or the encoded `+0317,1` form.
///
/// The encoded form carries tenths of a degree and a trailing quality code;
/// `+9999` marks a missing value. Sentinel handling for plain values happens
/// in [`RawTemperatureSample::new`].
pub fn parse_temperature_field(raw: &str) -> Result<Option<f64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if let Some((value, _quality)) = trimmed.split_once(',') {
        let value = value.trim();
        if value == ENCODED_TEMPERATURE_MISSING {
            return Ok(None);
        }
        let tenths = value.parse::<i32>().map_err(|_| {
            ProcessingError::InvalidFormat(format!("Invalid encoded temperature: '{}'", raw))
        })?;
        return Ok(Some(tenths as f64 / 10.0));
    }

    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|_| ProcessingError::InvalidFormat(format!("Invalid temperature: '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_temperature_field() {
        assert_eq!(parse_temperature_field("31.7").unwrap(), Some(31.7));
        assert_eq!(parse_temperature_field("+0317,1").unwrap(), Some(31.7));
        assert_eq!(parse_temperature_field("-0056,5").unwrap(), Some(-5.6));
        assert_eq!(parse_temperature_field("+9999,9").unwrap(), None);
        assert_eq!(parse_temperature_field("").unwrap(), None);
        assert!(parse_temperature_field("warm").is_err());
    }

    #[test]
    fn test_read_plain_csv() -> Result<()> {
        let data = "station_id,timestamp,temperature_c\n\
                    IAD,2024-07-01T13:05:00,31.0\n\
                    IAD,2024-07-01T13:55:00,999.9\n\
                    IAD,not-a-time,30.0\n\
                    BOS,2024-07-01T14:00:00,\n";

        let outcome = TemperatureReader::new().read_from(data.as_bytes())?;

        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.records[0].temperature_c, Some(31.0));
        assert!(outcome.records[1].is_missing());
        assert!(outcome.records[2].is_missing());
        assert_eq!(outcome.records[2].station_id, "BOS");

        Ok(())
    }

    #[test]
    fn test_read_isd_columns_with_aliases() -> Result<()> {
        let data = "STATION,DATE,SOURCE,TMP\n\
                    72403093738,2024-07-01T13:52:00,4,\"+0322,1\"\n\
                    72403093738,2024-07-01T14:52:00,4,\"+9999,9\"\n";

        let mut aliases = HashMap::new();
        aliases.insert("72403093738".to_string(), "IAD".to_string());

        let outcome = TemperatureReader::new()
            .with_station_aliases(aliases)
            .read_from(data.as_bytes())?;

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].station_id, "IAD");
        assert_eq!(outcome.records[0].temperature_c, Some(32.2));
        assert_eq!(
            outcome.records[0].observed_at,
            Utc.with_ymd_and_hms(2024, 7, 1, 13, 52, 0).unwrap()
        );
        assert!(outcome.records[1].is_missing());

        Ok(())
    }

    #[test]
    fn test_read_file_with_mmap() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "station,ts_utc,temp_C")?;
        writeln!(file, "BOS,2024-07-02 00:10:00,22.5")?;
        writeln!(file, "BOS,2024-07-02 00:40:00,23.5")?;
        file.flush()?;

        let buffered = TemperatureReader::new().read_samples(file.path())?;
        let mapped = TemperatureReader::new().with_mmap(true).read_samples(file.path())?;

        assert_eq!(buffered.records, mapped.records);
        assert_eq!(mapped.records.len(), 2);

        Ok(())
    }
}
