use crate::config::StationRegion;
use crate::error::{ProcessingError, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct MappingRow {
    #[serde(alias = "station")]
    station_id: String,

    #[serde(alias = "region")]
    region_id: String,
}

/// Reads a `station_id,region_id` mapping CSV.
///
/// Unlike the observation readers this never skips rows: a broken mapping
/// file is a configuration error.
pub struct RegionMapReader;

impl RegionMapReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read_mappings(&self, path: &Path) -> Result<Vec<StationRegion>> {
        let file = File::open(path).map_err(|e| {
            ProcessingError::Configuration(format!(
                "Cannot open region map {}: {}",
                path.display(),
                e
            ))
        })?;
        self.read_from(file)
    }

    pub fn read_from<R: Read>(&self, source: R) -> Result<Vec<StationRegion>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(source);

        reader
            .deserialize::<MappingRow>()
            .map(|row| {
                row.map(|r| StationRegion::new(&r.station_id, &r.region_id))
                    .map_err(|e| ProcessingError::Configuration(format!("Region map: {}", e)))
            })
            .collect()
    }
}

impl Default for RegionMapReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_mappings() -> Result<()> {
        let data = "station,region\n# Texas\nDFW,ERCO\nSEA,BPAT\n";
        let mappings = RegionMapReader::new().read_from(data.as_bytes())?;

        assert_eq!(
            mappings,
            vec![StationRegion::new("DFW", "ERCO"), StationRegion::new("SEA", "BPAT")]
        );
        Ok(())
    }

    #[test]
    fn test_broken_mapping_is_configuration_error() {
        let data = "station_id,region_id\nDFW\n";
        let result = RegionMapReader::new().read_from(data.as_bytes());

        assert!(result.unwrap_err().is_configuration());
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let result = RegionMapReader::new().read_mappings(Path::new("/nonexistent/map.csv"));
        assert!(matches!(result, Err(ProcessingError::Configuration(_))));
    }
}
