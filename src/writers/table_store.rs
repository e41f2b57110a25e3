use crate::config::PipelineSettings;
use crate::error::{ProcessingError, Result};
use crate::processors::{PipelineOutput, StageOutput, StageSink};
use crate::utils::constants::{RUN_LOCK_FILE, RUN_MANIFEST_FILE, TABLE_EXTENSION};
use crate::utils::filename::table_path;
use crate::writers::ParquetWriter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::Builder;
use tracing::{debug, info, warn};

/// Exclusive claim on an output directory for the duration of a run.
///
/// The lock file is created with create-new semantics, so a second run
/// against the same directory fails fast instead of racing table swaps.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(output_dir: &Path) -> Result<Self> {
        fs::create_dir_all(output_dir)?;
        let path = output_dir.join(RUN_LOCK_FILE);

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(ProcessingError::RunLocked(output_dir.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(file, "{}", std::process::id())?;

        debug!(path = %path.display(), "Acquired run lock");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to release run lock");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedTable {
    pub name: String,
    pub rows: usize,
    pub file: PathBuf,
}

/// Parquet tables in one directory, each replaced atomically on publish.
///
/// A table is written to a temporary file beside its final location and
/// renamed over it once complete, so readers only ever see the previous
/// table or the new one.
pub struct TableStore {
    output_dir: PathBuf,
    writer: ParquetWriter,
    published: Vec<PublishedTable>,
}

impl TableStore {
    pub fn new(output_dir: &Path, compression: &str) -> Result<Self> {
        fs::create_dir_all(output_dir)?;

        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            writer: ParquetWriter::new().with_compression(compression)?,
            published: Vec::new(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn published(&self) -> &[PublishedTable] {
        &self.published
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        table_path(&self.output_dir, table)
    }

    /// Record what this run produced next to the tables.
    pub fn write_manifest(&self, settings: &PipelineSettings, output: &PipelineOutput) -> Result<RunManifest> {
        let manifest = RunManifest {
            completed_at: Utc::now(),
            heat_threshold_c: settings.heat_threshold_c,
            min_heatwave_days: settings.min_heatwave_days,
            tables: self.published.clone(),
            heatwave_events: output.events.len(),
            rows_without_load: output.quality.rows_without_load,
            quality_warnings: output.quality.warning_count(),
        };

        let path = self.output_dir.join(RUN_MANIFEST_FILE);
        let mut temp = Builder::new()
            .prefix(".run_manifest.")
            .suffix(".tmp")
            .tempfile_in(&self.output_dir)?;
        serde_json::to_writer_pretty(temp.as_file_mut(), &manifest)?;
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| ProcessingError::Io(e.error))?;

        info!(path = %path.display(), "Wrote run manifest");
        Ok(manifest)
    }
}

impl StageSink for TableStore {
    fn publish(&mut self, output: StageOutput<'_>) -> Result<()> {
        let table = output.table_name();
        let final_path = self.table_path(table);

        let mut temp = Builder::new()
            .prefix(&format!(".{}.", table))
            .suffix(&format!(".{}.tmp", TABLE_EXTENSION))
            .tempfile_in(&self.output_dir)?;

        self.writer.write_table(output, temp.as_file_mut())?;
        temp.as_file().sync_all()?;
        temp.persist(&final_path)
            .map_err(|e| ProcessingError::Io(e.error))?;

        debug!(table, rows = output.len(), path = %final_path.display(), "Published table");
        self.published.push(PublishedTable {
            name: table.to_string(),
            rows: output.len(),
            file: final_path,
        });

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub completed_at: DateTime<Utc>,
    pub heat_threshold_c: f64,
    pub min_heatwave_days: usize,
    pub tables: Vec<PublishedTable>,
    pub heatwave_events: usize,
    pub rows_without_load: usize,
    pub quality_warnings: usize,
}

impl RunManifest {
    pub fn read(output_dir: &Path) -> Result<Self> {
        let file = File::open(output_dir.join(RUN_MANIFEST_FILE))?;
        Ok(serde_json::from_reader(file)?)
    }

    pub fn table_rows(&self, table: &str) -> Option<usize> {
        self.tables.iter().find(|t| t.name == table).map(|t| t.rows)
    }
}
