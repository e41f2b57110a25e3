use crate::config::{PipelineSettings, StationRegionMap};
use crate::error::{ProcessingError, Result};
use crate::models::{
    DailyRegionLoad, DailyStationTemperature, HeatLoadDaily, HeatwaveEvent, HeatwaveFlag,
    HourlyTemperatureReading,
};
use crate::processors::{
    DailyAggregator, Deduplicator, HeatwaveDetector, HourlyResampler, IntegrityChecker,
    QualityReport, RegionJoiner,
};
use crate::readers::PipelineInputs;
use crate::utils::constants::{
    DAILY_LOAD_TABLE, DAILY_TEMPERATURE_TABLE, HEATWAVE_FLAGS_TABLE, HEAT_LOAD_DAILY_TABLE,
    HOURLY_TEMPERATURE_TABLE,
};
use crate::utils::progress::ProgressReporter;
use tracing::info;

/// A fully materialised stage result, borrowed for publishing.
#[derive(Debug, Clone, Copy)]
pub enum StageOutput<'a> {
    HourlyTemperature(&'a [HourlyTemperatureReading]),
    DailyTemperature(&'a [DailyStationTemperature]),
    DailyLoad(&'a [DailyRegionLoad]),
    HeatwaveFlags(&'a [HeatwaveFlag]),
    HeatLoadDaily(&'a [HeatLoadDaily]),
}

impl StageOutput<'_> {
    pub fn table_name(&self) -> &'static str {
        match self {
            StageOutput::HourlyTemperature(_) => HOURLY_TEMPERATURE_TABLE,
            StageOutput::DailyTemperature(_) => DAILY_TEMPERATURE_TABLE,
            StageOutput::DailyLoad(_) => DAILY_LOAD_TABLE,
            StageOutput::HeatwaveFlags(_) => HEATWAVE_FLAGS_TABLE,
            StageOutput::HeatLoadDaily(_) => HEAT_LOAD_DAILY_TABLE,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            StageOutput::HourlyTemperature(rows) => rows.len(),
            StageOutput::DailyTemperature(rows) => rows.len(),
            StageOutput::DailyLoad(rows) => rows.len(),
            StageOutput::HeatwaveFlags(rows) => rows.len(),
            StageOutput::HeatLoadDaily(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Receives each stage's output once the stage has completed.
pub trait StageSink {
    fn publish(&mut self, output: StageOutput<'_>) -> Result<()>;
}

/// Discards everything. Used for validation runs.
#[derive(Debug, Default)]
pub struct NullSink {
    pub published: Vec<(&'static str, usize)>,
}

impl StageSink for NullSink {
    fn publish(&mut self, output: StageOutput<'_>) -> Result<()> {
        self.published.push((output.table_name(), output.len()));
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub hourly_temperature: Vec<HourlyTemperatureReading>,
    pub daily_temperature: Vec<DailyStationTemperature>,
    pub daily_load: Vec<DailyRegionLoad>,
    pub flags: Vec<HeatwaveFlag>,
    pub events: Vec<HeatwaveEvent>,
    pub heat_load_daily: Vec<HeatLoadDaily>,
    pub quality: QualityReport,
}

pub struct HeatLoadPipeline {
    region_map: StationRegionMap,
    detector: HeatwaveDetector,
    checker: IntegrityChecker,
    max_workers: usize,
}

impl HeatLoadPipeline {
    pub fn new(settings: &PipelineSettings, region_map: StationRegionMap) -> Result<Self> {
        settings.validate_all()?;

        Ok(Self {
            region_map,
            detector: HeatwaveDetector::from_settings(settings)?,
            checker: IntegrityChecker::new(settings.min_heatwave_days),
            max_workers: num_cpus::get(),
        })
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn region_map(&self) -> &StationRegionMap {
        &self.region_map
    }

    /// Run every stage in order. Each stage's output is handed to `sink`
    /// before the next stage starts, so an aborted run leaves earlier tables
    /// published and later ones untouched.
    ///
    /// Every station in the temperature input must resolve to a region; this
    /// is checked before anything is published.
    pub fn run(
        &self,
        inputs: PipelineInputs,
        sink: &mut dyn StageSink,
        progress: Option<&ProgressReporter>,
    ) -> Result<PipelineOutput> {
        self.region_map.validate_stations(inputs.station_ids())?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ProcessingError::Configuration(e.to_string()))?;

        let mut quality = QualityReport::default();
        self.checker
            .record_skipped("input", inputs.skipped_records, &mut quality);
        if inputs.filtered_loads > 0 {
            info!(
                count = inputs.filtered_loads,
                "Excluded implausible hourly load values"
            );
        }

        let aggregator = DailyAggregator::new();

        // Differing samples at one timestamp are averaged by the resampler
        report_stage(progress, "deduplicate");
        let (samples, sample_stats) =
            Deduplicator::exact_repeats().deduplicate(inputs.temperature_samples);
        let (loads, load_stats) = Deduplicator::new().deduplicate(inputs.load_readings);
        info!(
            temperature_removed = sample_stats.removed(),
            load_removed = load_stats.removed(),
            "Removed duplicate observations"
        );

        report_stage(progress, HOURLY_TEMPERATURE_TABLE);
        let hourly_temperature = HourlyResampler::new().resample(&samples);
        publish(sink, StageOutput::HourlyTemperature(&hourly_temperature))?;

        report_stage(progress, DAILY_TEMPERATURE_TABLE);
        let daily_temperature = aggregator.aggregate_temperatures(&hourly_temperature);
        self.checker
            .check_daily_temperatures(&daily_temperature, &mut quality);
        publish(sink, StageOutput::DailyTemperature(&daily_temperature))?;

        report_stage(progress, DAILY_LOAD_TABLE);
        let daily_load = aggregator.aggregate_loads(&loads);
        self.checker.check_daily_loads(&daily_load, &mut quality)?;
        publish(sink, StageOutput::DailyLoad(&daily_load))?;

        report_stage(progress, HEATWAVE_FLAGS_TABLE);
        let detection = pool.install(|| self.detector.detect(&daily_temperature));
        self.checker.check_events(&detection.events, &mut quality);
        info!(
            hot_days = detection.hot_days(),
            heatwave_days = detection.heatwave_days(),
            events = detection.events.len(),
            "Classified station days"
        );
        publish(sink, StageOutput::HeatwaveFlags(&detection.flags))?;

        report_stage(progress, HEAT_LOAD_DAILY_TABLE);
        let heat_load_daily = RegionJoiner::new(&self.region_map).join(
            &daily_temperature,
            &detection.flags,
            &daily_load,
        )?;
        self.checker
            .check_joined(daily_temperature.len(), &heat_load_daily, &mut quality)?;
        publish(sink, StageOutput::HeatLoadDaily(&heat_load_daily))?;

        Ok(PipelineOutput {
            hourly_temperature,
            daily_temperature,
            daily_load,
            flags: detection.flags,
            events: detection.events,
            heat_load_daily,
            quality,
        })
    }

    pub fn checker(&self) -> &IntegrityChecker {
        &self.checker
    }
}

fn report_stage(progress: Option<&ProgressReporter>, stage: &str) {
    if let Some(p) = progress {
        p.stage(stage);
    }
}

fn publish(sink: &mut dyn StageSink, output: StageOutput<'_>) -> Result<()> {
    info!(table = output.table_name(), rows = output.len(), "Publishing stage output");
    sink.publish(output)
}
