pub mod constants;
pub mod filename;
pub mod logging;
pub mod progress;
pub mod time;

pub use constants::*;
pub use filename::{generate_default_output_dir, table_path};
pub use logging::init_logging;
pub use progress::ProgressReporter;
pub use time::{parse_utc_timestamp, truncate_to_hour, utc_day};
