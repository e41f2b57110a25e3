use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "heatgrid-processor")]
#[command(about = "Daily heatwave detection aligned with regional electricity load")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Suppress progress output")]
    pub quiet: bool,
}

/// Inputs and settings shared by `run` and `validate`.
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    #[arg(short, long, help = "Raw temperature CSV (station, timestamp, temperature)")]
    pub temperature_file: PathBuf,

    #[arg(short, long, help = "Hourly load CSV (region, hour, load)")]
    pub load_file: PathBuf,

    #[arg(short, long, help = "Settings file [default: heatgrid.toml if present]")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Hot day threshold in °C (overrides settings)")]
    pub threshold: Option<f64>,

    #[arg(long, help = "Minimum consecutive hot days for a heatwave (overrides settings)")]
    pub min_run_days: Option<usize>,

    #[arg(long, help = "Station to region CSV merged into the configured mapping")]
    pub region_map: Option<PathBuf>,

    #[arg(long, default_value_t = num_cpus::get())]
    pub max_workers: usize,

    #[arg(long, default_value = "false", help = "Memory-map input files")]
    pub mmap: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline and publish every table
    Run {
        #[command(flatten)]
        pipeline: PipelineArgs,

        #[arg(
            short,
            long,
            help = "Output directory [default: output/heatgrid-{YYMMDD}]"
        )]
        output_dir: Option<PathBuf>,

        #[arg(long, help = "Parquet compression (overrides settings)")]
        compression: Option<String>,
    },

    /// Run the pipeline without publishing and report data quality
    Validate {
        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Display information about a published heat_load_daily table
    Info {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long, default_value = "10")]
        sample: usize,

        #[arg(
            long,
            default_value = "0",
            help = "Maximum rows to analyze (0 = all rows)"
        )]
        analysis_limit: usize,
    },
}
