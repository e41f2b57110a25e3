pub mod load_analyzer;

pub use load_analyzer::{HeatLoadStatistics, LoadAnalyzer, LoadByDayType, StationHeatCounts};
