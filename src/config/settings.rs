use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use validator::Validate;

use crate::config::region_map::StationRegion;
use crate::error::{ProcessingError, Result};
use crate::utils::constants::{
    ABSOLUTE_ZERO_C, COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY,
    COMPRESSION_ZSTD, DEFAULT_CONFIG_FILE, DEFAULT_HEAT_THRESHOLD_C,
    DEFAULT_LOAD_MAX_PLAUSIBLE_MWH, DEFAULT_LOAD_MIN_EXCLUSIVE_MWH, DEFAULT_MIN_HEATWAVE_DAYS,
    ENV_PREFIX,
};

/// Raw feed station code translated to the label used everywhere else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct StationAlias {
    #[validate(length(min = 1))]
    pub source_code: String,

    #[validate(length(min = 1))]
    pub station_id: String,
}

impl StationAlias {
    pub fn new(source_code: &str, station_id: &str) -> Self {
        Self {
            source_code: source_code.to_string(),
            station_id: station_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineSettings {
    pub heat_threshold_c: f64,

    #[validate(range(min = 1))]
    pub min_heatwave_days: usize,

    pub load_min_exclusive_mwh: f64,

    #[validate(range(min = 0.0))]
    pub load_max_plausible_mwh: f64,

    #[validate(length(min = 1))]
    pub compression: String,

    #[validate(nested)]
    pub station_regions: Vec<StationRegion>,

    /// Declared regions; when non-empty every mapped region must be listed
    pub regions: Vec<String>,

    #[validate(nested)]
    pub station_aliases: Vec<StationAlias>,

    /// Extra `station_id,region_id` CSV merged into `station_regions`
    pub region_map_file: Option<PathBuf>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            heat_threshold_c: DEFAULT_HEAT_THRESHOLD_C,
            min_heatwave_days: DEFAULT_MIN_HEATWAVE_DAYS,
            load_min_exclusive_mwh: DEFAULT_LOAD_MIN_EXCLUSIVE_MWH,
            load_max_plausible_mwh: DEFAULT_LOAD_MAX_PLAUSIBLE_MWH,
            compression: COMPRESSION_SNAPPY.to_string(),
            station_regions: vec![
                StationRegion::new("IAD", "PJM"),
                StationRegion::new("BOS", "ISNE"),
                StationRegion::new("NYC", "NYIS"),
                StationRegion::new("LAX", "CISO"),
            ],
            regions: vec![
                "PJM".to_string(),
                "ISNE".to_string(),
                "NYIS".to_string(),
                "CISO".to_string(),
            ],
            station_aliases: vec![
                StationAlias::new("72403093738", "IAD"),
                StationAlias::new("72509014739", "BOS"),
                StationAlias::new("74486094789", "NYC"),
                StationAlias::new("72295023174", "LAX"),
            ],
            region_map_file: None,
        }
    }
}

impl PipelineSettings {
    /// Layer defaults, the TOML file, then `HEATGRID_*` environment variables.
    ///
    /// An explicitly named file must exist; the default `heatgrid.toml` is
    /// optional.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let file_source = match config_file {
            Some(path) => File::from(path).required(true),
            None => File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false),
        };

        let settings: PipelineSettings = Config::builder()
            .add_source(file_source)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        settings.validate_all()?;
        debug!(
            threshold = settings.heat_threshold_c,
            min_days = settings.min_heatwave_days,
            mappings = settings.station_regions.len(),
            "Loaded pipeline settings"
        );

        Ok(settings)
    }

    pub fn with_threshold(mut self, threshold_c: f64) -> Self {
        self.heat_threshold_c = threshold_c;
        self
    }

    pub fn with_min_heatwave_days(mut self, days: usize) -> Self {
        self.min_heatwave_days = days;
        self
    }

    /// Derive-level checks plus the rules that need more than one field.
    pub fn validate_all(&self) -> Result<()> {
        validate_threshold(self.heat_threshold_c)?;
        self.validate()?;

        if !self.load_min_exclusive_mwh.is_finite()
            || self.load_min_exclusive_mwh >= self.load_max_plausible_mwh
        {
            return Err(ProcessingError::Configuration(format!(
                "Load sanity bounds are empty: ({}, {}]",
                self.load_min_exclusive_mwh, self.load_max_plausible_mwh
            )));
        }

        match self.compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY | COMPRESSION_GZIP | COMPRESSION_LZ4 | COMPRESSION_ZSTD
            | COMPRESSION_NONE => Ok(()),
            other => Err(ProcessingError::Configuration(format!(
                "Unsupported compression: {}",
                other
            ))),
        }
    }

    /// Lookup table from raw source codes to station labels.
    pub fn alias_lookup(&self) -> std::collections::HashMap<String, String> {
        self.station_aliases
            .iter()
            .map(|a| (a.source_code.clone(), a.station_id.clone()))
            .collect()
    }
}

/// A threshold must be a finite temperature above absolute zero.
pub fn validate_threshold(threshold_c: f64) -> Result<()> {
    if !threshold_c.is_finite() || threshold_c <= ABSOLUTE_ZERO_C {
        return Err(ProcessingError::InvalidThreshold(threshold_c));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_defaults_are_valid() {
        let settings = PipelineSettings::default();

        assert!(settings.validate_all().is_ok());
        assert_eq!(settings.heat_threshold_c, 32.22);
        assert_eq!(settings.min_heatwave_days, 3);
        assert_eq!(settings.station_regions.len(), 4);
    }

    #[test]
    fn test_invalid_threshold() {
        for bad in [f64::NAN, f64::INFINITY, -273.15, -300.0] {
            let settings = PipelineSettings::default().with_threshold(bad);
            assert!(matches!(
                settings.validate_all(),
                Err(ProcessingError::InvalidThreshold(_))
            ));
        }

        let cold = PipelineSettings::default().with_threshold(-40.0);
        assert!(cold.validate_all().is_ok());
    }

    #[test]
    fn test_min_run_length_validated() {
        let settings = PipelineSettings::default().with_min_heatwave_days(0);
        assert!(matches!(
            settings.validate_all(),
            Err(ProcessingError::Validation(_))
        ));
    }

    #[test]
    fn test_unknown_compression() {
        let settings = PipelineSettings {
            compression: "brotli".to_string(),
            ..PipelineSettings::default()
        };
        assert!(settings.validate_all().is_err());
    }

    #[test]
    fn test_load_from_toml_file() -> Result<()> {
        let mut file = Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "heat_threshold_c = 35.0")?;
        writeln!(file, "min_heatwave_days = 4")?;
        writeln!(file, "regions = [\"ERCO\"]")?;
        writeln!(file, "station_aliases = []")?;
        writeln!(file, "[[station_regions]]")?;
        writeln!(file, "station_id = \"DFW\"")?;
        writeln!(file, "region_id = \"ERCO\"")?;
        file.flush()?;

        let settings = PipelineSettings::load(Some(file.path()))?;

        assert_eq!(settings.heat_threshold_c, 35.0);
        assert_eq!(settings.min_heatwave_days, 4);
        assert_eq!(settings.station_regions, vec![StationRegion::new("DFW", "ERCO")]);
        assert!(settings.station_aliases.is_empty());
        // Untouched keys keep their defaults
        assert_eq!(settings.compression, "snappy");

        Ok(())
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let result = PipelineSettings::load(Some(Path::new("/nonexistent/heatgrid.toml")));
        assert!(matches!(result, Err(ProcessingError::ConfigSource(_))));
    }
}
