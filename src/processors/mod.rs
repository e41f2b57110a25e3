pub mod daily_aggregator;
pub mod deduplicator;
pub mod heatwave_detector;
pub mod hourly_resampler;
pub mod integrity_checker;
pub mod pipeline;
pub mod region_joiner;

pub use daily_aggregator::DailyAggregator;
pub use deduplicator::{DedupPolicy, DedupStats, Deduplicator, Observation};
pub use heatwave_detector::{consecutive_runs, DetectionResult, HeatwaveDetector};
pub use hourly_resampler::HourlyResampler;
pub use integrity_checker::{DataQualityWarning, IntegrityChecker, QualityReport};
pub use pipeline::{HeatLoadPipeline, NullSink, PipelineOutput, StageOutput, StageSink};
pub use region_joiner::RegionJoiner;
