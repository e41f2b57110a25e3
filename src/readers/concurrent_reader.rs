use crate::config::PipelineSettings;
use crate::error::Result;
use crate::models::{HourlyLoadReading, RawTemperatureSample};
use crate::readers::{LoadReader, ReadOutcome, TemperatureReader};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use tracing::info;

/// Both raw sources, fully materialised.
#[derive(Debug, Clone, Default)]
pub struct PipelineInputs {
    pub temperature_samples: Vec<RawTemperatureSample>,
    pub load_readings: Vec<HourlyLoadReading>,
    pub skipped_records: usize,
    pub filtered_loads: usize,
}

impl PipelineInputs {
    pub fn new(
        temperature_samples: Vec<RawTemperatureSample>,
        load_readings: Vec<HourlyLoadReading>,
    ) -> Self {
        Self {
            temperature_samples,
            load_readings,
            skipped_records: 0,
            filtered_loads: 0,
        }
    }

    pub fn station_ids(&self) -> BTreeSet<&str> {
        self.temperature_samples
            .iter()
            .map(|s| s.station_id.as_str())
            .collect()
    }
}

pub struct ConcurrentReader {
    temperature_reader: TemperatureReader,
    load_reader: LoadReader,
}

impl ConcurrentReader {
    pub fn new(temperature_reader: TemperatureReader, load_reader: LoadReader) -> Self {
        Self {
            temperature_reader,
            load_reader,
        }
    }

    pub fn from_settings(settings: &PipelineSettings, use_mmap: bool) -> Self {
        Self::new(
            TemperatureReader::new()
                .with_mmap(use_mmap)
                .with_station_aliases(settings.alias_lookup()),
            LoadReader::new()
                .with_mmap(use_mmap)
                .with_plausible_range(
                    settings.load_min_exclusive_mwh,
                    settings.load_max_plausible_mwh,
                ),
        )
    }

    /// Read the temperature and load files concurrently on blocking threads.
    pub async fn read_inputs(&self, temperature_path: &Path, load_path: &Path) -> Result<PipelineInputs> {
        let temperature_reader = self.temperature_reader.clone();
        let temperature_path: PathBuf = temperature_path.to_path_buf();
        let temperature_handle: JoinHandle<Result<ReadOutcome<RawTemperatureSample>>> =
            tokio::task::spawn_blocking(move || temperature_reader.read_samples(&temperature_path));

        let load_reader = self.load_reader.clone();
        let load_path: PathBuf = load_path.to_path_buf();
        let load_handle: JoinHandle<Result<ReadOutcome<HourlyLoadReading>>> =
            tokio::task::spawn_blocking(move || load_reader.read_loads(&load_path));

        let (temperatures, loads) = tokio::try_join!(temperature_handle, load_handle)?;
        let (temperatures, loads) = (temperatures?, loads?);

        info!(
            temperature_samples = temperatures.records.len(),
            load_readings = loads.records.len(),
            skipped = temperatures.skipped + loads.skipped,
            filtered = loads.filtered,
            "Read raw inputs"
        );

        Ok(PipelineInputs {
            skipped_records: temperatures.skipped + loads.skipped,
            filtered_loads: loads.filtered,
            temperature_samples: temperatures.records,
            load_readings: loads.records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_read_inputs_concurrently() -> Result<()> {
        let mut temperatures = NamedTempFile::new()?;
        writeln!(temperatures, "STATION,DATE,TMP")?;
        writeln!(temperatures, "72509014739,2024-07-01T12:54:00,\"+0301,1\"")?;
        writeln!(temperatures, "72509014739,bad,\"+0301,1\"")?;
        temperatures.flush()?;

        let mut loads = NamedTempFile::new()?;
        writeln!(loads, "period,parent,value")?;
        writeln!(loads, "2024-07-01T12,ISNE,14000")?;
        writeln!(loads, "2024-07-01T13,ISNE,-1")?;
        loads.flush()?;

        let reader = ConcurrentReader::from_settings(&PipelineSettings::default(), false);
        let inputs = reader.read_inputs(temperatures.path(), loads.path()).await?;

        assert_eq!(inputs.temperature_samples.len(), 1);
        assert_eq!(inputs.temperature_samples[0].station_id, "BOS");
        assert_eq!(inputs.load_readings.len(), 1);
        assert_eq!(inputs.skipped_records, 1);
        assert_eq!(inputs.filtered_loads, 1);
        assert_eq!(inputs.station_ids().into_iter().collect::<Vec<_>>(), vec!["BOS"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_input_is_fatal() {
        let reader = ConcurrentReader::from_settings(&PipelineSettings::default(), false);
        let result = reader
            .read_inputs(Path::new("/nonexistent/t.csv"), Path::new("/nonexistent/l.csv"))
            .await;

        assert!(result.is_err());
    }
}
