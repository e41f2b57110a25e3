pub mod concurrent_reader;
pub mod load_reader;
pub mod region_map_reader;
pub mod temperature_reader;

pub use concurrent_reader::{ConcurrentReader, PipelineInputs};
pub use load_reader::LoadReader;
pub use region_map_reader::RegionMapReader;
pub use temperature_reader::{parse_temperature_field, TemperatureReader};

/// Records read from one source plus the rows left out.
#[derive(Debug, Clone)]
pub struct ReadOutcome<T> {
    pub records: Vec<T>,
    /// Rows excluded because they could not be parsed
    pub skipped: usize,
    /// Rows excluded by a sanity filter
    pub filtered: usize,
}

impl<T> Default for ReadOutcome<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
            filtered: 0,
        }
    }
}
