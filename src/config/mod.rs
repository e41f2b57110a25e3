pub mod region_map;
pub mod settings;

pub use region_map::{StationRegion, StationRegionMap};
pub use settings::{validate_threshold, PipelineSettings, StationAlias};
