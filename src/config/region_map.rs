use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use validator::Validate;

use crate::config::settings::PipelineSettings;
use crate::error::{ProcessingError, Result};
use crate::readers::RegionMapReader;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct StationRegion {
    #[validate(length(min = 1))]
    pub station_id: String,

    #[validate(length(min = 1))]
    pub region_id: String,
}

impl StationRegion {
    pub fn new(station_id: &str, region_id: &str) -> Self {
        Self {
            station_id: station_id.to_string(),
            region_id: region_id.to_string(),
        }
    }
}

/// Static station → region assignment, one region per station.
#[derive(Debug, Clone, Default)]
pub struct StationRegionMap {
    stations: BTreeMap<String, String>,
    known_regions: BTreeSet<String>,
}

impl StationRegionMap {
    /// Build and validate a map. A station listed twice with different
    /// regions is rejected, as is any region outside `known_regions` when
    /// that set is non-empty.
    pub fn new<I, R>(entries: I, known_regions: R) -> Result<Self>
    where
        I: IntoIterator<Item = StationRegion>,
        R: IntoIterator<Item = String>,
    {
        let known_regions: BTreeSet<String> = known_regions.into_iter().collect();
        let mut stations = BTreeMap::new();

        for entry in entries {
            entry.validate()?;

            if !known_regions.is_empty() && !known_regions.contains(&entry.region_id) {
                return Err(ProcessingError::UnknownRegion {
                    station_id: entry.station_id,
                    region_id: entry.region_id,
                });
            }

            match stations.get(&entry.station_id) {
                Some(existing) if existing != &entry.region_id => {
                    return Err(ProcessingError::Configuration(format!(
                        "Station {} mapped to both {} and {}",
                        entry.station_id, existing, entry.region_id
                    )));
                }
                Some(_) => {}
                None => {
                    stations.insert(entry.station_id, entry.region_id);
                }
            }
        }

        Ok(Self {
            stations,
            known_regions,
        })
    }

    /// Inline `station_regions` plus the optional mapping CSV.
    pub fn from_settings(settings: &PipelineSettings) -> Result<Self> {
        let mut entries = settings.station_regions.clone();

        if let Some(path) = &settings.region_map_file {
            let from_file = RegionMapReader::new().read_mappings(path)?;
            debug!(
                path = %path.display(),
                count = from_file.len(),
                "Loaded station region mappings from file"
            );
            entries.extend(from_file);
        }

        Self::new(entries, settings.regions.iter().cloned())
    }

    pub fn resolve(&self, station_id: &str) -> Result<&str> {
        self.stations
            .get(station_id)
            .map(String::as_str)
            .ok_or_else(|| ProcessingError::UnmappedStation {
                station_id: station_id.to_string(),
            })
    }

    /// Every station referenced by the input must resolve.
    pub fn validate_stations<'a, I>(&self, station_ids: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for station_id in station_ids {
            self.resolve(station_id)?;
        }
        Ok(())
    }

    pub fn regions(&self) -> BTreeSet<&str> {
        self.stations.values().map(String::as_str).collect()
    }

    pub fn stations_in_region<'a>(&'a self, region_id: &'a str) -> impl Iterator<Item = &'a str> {
        self.stations
            .iter()
            .filter(move |(_, region)| region.as_str() == region_id)
            .map(|(station, _)| station.as_str())
    }

    pub fn is_declared_region(&self, region_id: &str) -> bool {
        self.known_regions.is_empty() || self.known_regions.contains(region_id)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_map() -> StationRegionMap {
        StationRegionMap::from_settings(&PipelineSettings::default()).unwrap()
    }

    #[test]
    fn test_resolve_declared_stations() {
        let map = default_map();

        assert_eq!(map.resolve("IAD").unwrap(), "PJM");
        assert_eq!(map.resolve("BOS").unwrap(), "ISNE");
        // Both stations the old merge step dropped resolve as well
        assert_eq!(map.resolve("NYC").unwrap(), "NYIS");
        assert_eq!(map.resolve("LAX").unwrap(), "CISO");
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn test_unmapped_station() {
        let map = default_map();

        assert!(matches!(
            map.resolve("ATL"),
            Err(ProcessingError::UnmappedStation { .. })
        ));
        assert!(map.validate_stations(["IAD", "BOS"]).is_ok());
        assert!(map.validate_stations(["IAD", "SEA"]).is_err());
    }

    #[test]
    fn test_unknown_region_rejected() {
        let result = StationRegionMap::new(
            vec![StationRegion::new("DFW", "ERCO")],
            vec!["PJM".to_string()],
        );
        assert!(matches!(result, Err(ProcessingError::UnknownRegion { .. })));

        // No declared regions means any region is accepted
        let open = StationRegionMap::new(vec![StationRegion::new("DFW", "ERCO")], Vec::new());
        assert!(open.is_ok());
    }

    #[test]
    fn test_conflicting_mapping_rejected() {
        let result = StationRegionMap::new(
            vec![
                StationRegion::new("IAD", "PJM"),
                StationRegion::new("IAD", "ISNE"),
            ],
            Vec::new(),
        );
        assert!(matches!(result, Err(ProcessingError::Configuration(_))));

        let repeated = StationRegionMap::new(
            vec![StationRegion::new("IAD", "PJM"), StationRegion::new("IAD", "PJM")],
            Vec::new(),
        )
        .unwrap();
        assert_eq!(repeated.len(), 1);
    }

    #[test]
    fn test_empty_ids_rejected() {
        let result = StationRegionMap::new(vec![StationRegion::new("", "PJM")], Vec::new());
        assert!(matches!(result, Err(ProcessingError::Validation(_))));
    }

    #[test]
    fn test_stations_in_region() {
        let map = StationRegionMap::new(
            vec![
                StationRegion::new("IAD", "PJM"),
                StationRegion::new("DCA", "PJM"),
                StationRegion::new("BOS", "ISNE"),
            ],
            Vec::new(),
        )
        .unwrap();

        let pjm: Vec<&str> = map.stations_in_region("PJM").collect();
        assert_eq!(pjm, vec!["DCA", "IAD"]);
        assert_eq!(map.regions().len(), 2);
    }
}
