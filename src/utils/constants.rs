/// Table names published by a pipeline run
pub const HOURLY_TEMPERATURE_TABLE: &str = "hourly_temperature";
pub const DAILY_TEMPERATURE_TABLE: &str = "daily_station_temperature";
pub const HEATWAVE_FLAGS_TABLE: &str = "heatwave_flags";
pub const DAILY_LOAD_TABLE: &str = "daily_region_load";
pub const HEAT_LOAD_DAILY_TABLE: &str = "heat_load_daily";

/// File names
pub const TABLE_EXTENSION: &str = "parquet";
pub const RUN_LOCK_FILE: &str = ".heatgrid.lock";
pub const RUN_MANIFEST_FILE: &str = "run_manifest.json";
pub const DEFAULT_CONFIG_FILE: &str = "heatgrid.toml";
pub const ENV_PREFIX: &str = "HEATGRID";

/// Heatwave defaults (90°F)
pub const DEFAULT_HEAT_THRESHOLD_C: f64 = 32.22;
pub const DEFAULT_MIN_HEATWAVE_DAYS: usize = 3;

/// Temperature constraints
pub const ABSOLUTE_ZERO_C: f64 = -273.15;
pub const TEMPERATURE_SENTINEL_C: f64 = 999.9;
pub const SENTINEL_TOLERANCE: f64 = 0.05;
/// Encoded ISD form: tenths of a degree, +9999 when missing
pub const ENCODED_TEMPERATURE_MISSING: &str = "+9999";

/// Load sanity filter defaults
pub const DEFAULT_LOAD_MIN_EXCLUSIVE_MWH: f64 = 0.0;
pub const DEFAULT_LOAD_MAX_PLAUSIBLE_MWH: f64 = 500_000.0;

/// Processing defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB
pub const HOURS_PER_DAY: u32 = 24;

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
