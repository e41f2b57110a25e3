use crate::utils::constants::TABLE_EXTENSION;
use chrono::{Datelike, Local};
use std::path::{Path, PathBuf};

/// Generate default output directory with format: output/heatgrid-{YYMMDD}
pub fn generate_default_output_dir() -> PathBuf {
    let now = Local::now();
    let year = now.year() % 100; // Get last 2 digits of year
    let month = now.month();
    let day = now.day();

    let dirname = format!("heatgrid-{:02}{:02}{:02}", year, month, day);
    PathBuf::from("output").join(dirname)
}

/// Final location of a published table inside an output directory.
pub fn table_path(output_dir: &Path, table: &str) -> PathBuf {
    output_dir.join(format!("{}.{}", table, TABLE_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_default_output_dir() {
        let dir = generate_default_output_dir();
        let dir_str = dir.to_string_lossy();

        assert!(dir_str.starts_with("output/"));

        let parts: Vec<&str> = dir_str.split('/').collect();
        assert_eq!(parts.len(), 2);
        assert!(parts[1].starts_with("heatgrid-"));
        assert_eq!(parts[1].len(), "heatgrid-".len() + 6);
    }

    #[test]
    fn test_table_path() {
        let path = table_path(Path::new("out"), "heat_load_daily");
        assert_eq!(path, PathBuf::from("out/heat_load_daily.parquet"));
    }
}
