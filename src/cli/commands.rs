use crate::analyzers::LoadAnalyzer;
use crate::cli::args::{Cli, Commands, PipelineArgs};
use crate::config::{PipelineSettings, StationRegionMap};
use crate::error::Result;
use crate::processors::{HeatLoadPipeline, NullSink, PipelineOutput};
use crate::readers::{ConcurrentReader, PipelineInputs};
use crate::utils::filename::generate_default_output_dir;
use crate::utils::logging::init_logging;
use crate::utils::progress::ProgressReporter;
use crate::writers::{read_heat_load_daily, ParquetWriter, RunLock, TableStore};
use tracing::info;

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;
    let quiet = cli.quiet;

    match cli.command {
        Commands::Run {
            pipeline,
            output_dir,
            compression,
        } => {
            let mut settings = load_settings(&pipeline)?;
            if let Some(compression) = compression {
                settings.compression = compression;
                settings.validate_all()?;
            }
            let output_dir = output_dir.unwrap_or_else(generate_default_output_dir);

            let progress = ProgressReporter::new_spinner("Reading inputs...", quiet);
            progress.println(&format!("Temperature input: {}", pipeline.temperature_file.display()));
            progress.println(&format!("Load input: {}", pipeline.load_file.display()));
            progress.println(&format!("Output directory: {}", output_dir.display()));

            let (heat_pipeline, inputs) = prepare(&pipeline, &settings).await?;

            let _lock = RunLock::acquire(&output_dir)?;
            let mut store = TableStore::new(&output_dir, &settings.compression)?;
            let output = heat_pipeline.run(inputs, &mut store, Some(&progress))?;
            let manifest = store.write_manifest(&settings, &output)?;

            progress.finish_with_message(&format!(
                "Published {} tables",
                manifest.tables.len()
            ));

            print_run_summary(&heat_pipeline, &output);
            println!("\nPublished tables:");
            for table in store.published() {
                println!("  - {} ({} rows) -> {}", table.name, table.rows, table.file.display());
            }
            println!("Processing complete!");
        }

        Commands::Validate { pipeline } => {
            let settings = load_settings(&pipeline)?;

            let progress = ProgressReporter::new_spinner("Validating data...", quiet);
            let (heat_pipeline, inputs) = prepare(&pipeline, &settings).await?;

            let mut sink = NullSink::default();
            let output = heat_pipeline.run(inputs, &mut sink, Some(&progress))?;
            progress.finish_with_message("Validation complete - no tables written");

            print_run_summary(&heat_pipeline, &output);

            if output.quality.is_clean() {
                println!("✅ All data passed validation checks");
            } else {
                println!(
                    "⚠️  Found {} data quality warnings",
                    output.quality.warning_count()
                );
            }
        }

        Commands::Info {
            file,
            sample,
            analysis_limit,
        } => {
            println!("Analyzing Parquet file: {}", file.display());

            let writer = ParquetWriter::new();
            let file_info = writer.get_file_info(&file)?;

            let analyzer = LoadAnalyzer::new();
            let stats = analyzer.analyze_parquet_with_limit(&file, analysis_limit)?;

            println!("\n{}", stats.detailed_summary());

            println!("\nFile Details:");
            println!("{}", file_info.summary());

            if sample > 0 {
                println!("\nSample Rows (showing {} rows):", sample);
                match read_heat_load_daily(&file, Some(sample)) {
                    Ok(rows) => {
                        for (i, row) in rows.iter().enumerate() {
                            println!(
                                "{}. {} ({}) on {}: max={}, avg={}, {} | load total={}, peak={}",
                                i + 1,
                                row.station_id,
                                row.region_id,
                                row.day,
                                format_value(row.daily_max_temp_c, "°C"),
                                format_value(row.daily_avg_temp_c, "°C"),
                                row.day_type(),
                                format_value(row.daily_total_mwh, " MWh"),
                                format_value(row.daily_peak_mwh, " MWh"),
                            );
                        }
                    }
                    Err(e) => println!("Error reading sample data: {}", e),
                }
            }
        }
    }

    Ok(())
}

/// Settings from file and environment with command-line overrides on top.
fn load_settings(args: &PipelineArgs) -> Result<PipelineSettings> {
    let mut settings = PipelineSettings::load(args.config.as_deref())?;

    if let Some(threshold) = args.threshold {
        settings = settings.with_threshold(threshold);
    }
    if let Some(days) = args.min_run_days {
        settings = settings.with_min_heatwave_days(days);
    }
    if let Some(path) = &args.region_map {
        settings.region_map_file = Some(path.clone());
    }

    settings.validate_all()?;
    Ok(settings)
}

/// Resolve the station mapping and read both inputs. Nothing is written here.
async fn prepare(args: &PipelineArgs, settings: &PipelineSettings) -> Result<(HeatLoadPipeline, PipelineInputs)> {
    let region_map = StationRegionMap::from_settings(settings)?;
    info!(
        stations = region_map.len(),
        regions = region_map.regions().len(),
        "Loaded station region map"
    );

    let heat_pipeline = HeatLoadPipeline::new(settings, region_map)?.with_max_workers(args.max_workers);

    let reader = ConcurrentReader::from_settings(settings, args.mmap);
    let inputs = reader
        .read_inputs(&args.temperature_file, &args.load_file)
        .await?;

    Ok((heat_pipeline, inputs))
}

fn print_run_summary(pipeline: &HeatLoadPipeline, output: &PipelineOutput) {
    println!("\n{}", pipeline.checker().generate_summary(&output.quality));

    if !output.events.is_empty() {
        println!("Heatwaves:");
        for event in &output.events {
            println!(
                "  - {} {} to {} ({} days, peak {:.1}°C){}",
                event.station_id,
                event.start,
                event.end,
                event.length_days(),
                event.peak_temp_c,
                if event.at_history_edge {
                    " [edge of history]"
                } else {
                    ""
                }
            );
        }
    }
}

fn format_value(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.1}{}", v, unit),
        None => "null".to_string(),
    }
}
