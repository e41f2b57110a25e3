use crate::error::{ProcessingError, Result};
use crate::models::{
    DailyRegionLoad, DailyStationTemperature, HeatLoadDaily, HeatwaveFlag, HourlyTemperatureReading,
};
use crate::processors::StageOutput;
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE,
};
use crate::utils::time::{days_since_epoch, from_days_since_epoch};
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Configuration(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Write one stage table. Empty tables are still written so that the
    /// published schema is always present.
    pub fn write_table<W: Write + Send>(&self, output: StageOutput<'_>, sink: W) -> Result<()> {
        let batch = match output {
            StageOutput::HourlyTemperature(rows) => hourly_temperature_batch(rows)?,
            StageOutput::DailyTemperature(rows) => daily_temperature_batch(rows)?,
            StageOutput::DailyLoad(rows) => daily_load_batch(rows)?,
            StageOutput::HeatwaveFlags(rows) => heatwave_flags_batch(rows)?,
            StageOutput::HeatLoadDaily(rows) => heat_load_daily_batch(rows)?,
        };

        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(sink, batch.schema(), Some(props))?;
        if batch.num_rows() > 0 {
            writer.write(&batch)?;
        }
        writer.close()?;

        Ok(())
    }

    pub fn write_table_to_path(&self, output: StageOutput<'_>, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        self.write_table(output, file)
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let file_metadata = metadata.file_metadata();
        let row_groups = metadata.num_row_groups();
        let total_rows = file_metadata.num_rows();
        let file_size = std::fs::metadata(path)?.len();

        let mut row_group_sizes = Vec::new();
        for i in 0..row_groups {
            let rg_metadata = metadata.row_group(i);
            row_group_sizes.push(rg_metadata.num_rows());
        }

        let compression = if row_groups > 0 && metadata.row_group(0).num_columns() > 0 {
            metadata.row_group(0).column(0).compression()
        } else {
            self.compression
        };

        let columns = file_metadata
            .schema_descr()
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        Ok(ParquetFileInfo {
            total_rows,
            row_groups: row_groups as i32,
            row_group_sizes,
            file_size,
            compression,
            columns,
        })
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn utc_timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Second, Some("UTC".into()))
}

fn hourly_temperature_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("station_id", DataType::Utf8, false),
        Field::new("hour_timestamp", utc_timestamp_type(), false),
        Field::new("temperature_c", DataType::Float64, true),
        Field::new("sample_count", DataType::UInt32, false),
    ]))
}

fn daily_temperature_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("station_id", DataType::Utf8, false),
        Field::new("day", DataType::Date32, false),
        Field::new("daily_max_temp_c", DataType::Float64, true),
        Field::new("daily_avg_temp_c", DataType::Float64, true),
        Field::new("valid_hours", DataType::UInt32, false),
    ]))
}

fn daily_load_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("region_id", DataType::Utf8, false),
        Field::new("day", DataType::Date32, false),
        Field::new("daily_total_mwh", DataType::Float64, true),
        Field::new("daily_peak_mwh", DataType::Float64, true),
        Field::new("hours_reported", DataType::UInt32, false),
    ]))
}

fn heatwave_flags_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("station_id", DataType::Utf8, false),
        Field::new("day", DataType::Date32, false),
        Field::new("is_hot_day", DataType::Boolean, false),
        Field::new("is_heatwave_day", DataType::Boolean, false),
    ]))
}

pub fn heat_load_daily_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("station_id", DataType::Utf8, false),
        Field::new("region_id", DataType::Utf8, false),
        Field::new("day", DataType::Date32, false),
        Field::new("daily_max_temp_c", DataType::Float64, true),
        Field::new("daily_avg_temp_c", DataType::Float64, true),
        Field::new("is_hot_day", DataType::Boolean, false),
        Field::new("is_heatwave_day", DataType::Boolean, false),
        Field::new("daily_total_mwh", DataType::Float64, true),
        Field::new("daily_peak_mwh", DataType::Float64, true),
    ]))
}

fn hourly_temperature_batch(rows: &[HourlyTemperatureReading]) -> Result<RecordBatch> {
    let station_ids: Vec<&str> = rows.iter().map(|r| r.station_id.as_str()).collect();
    let hours: Vec<i64> = rows.iter().map(|r| r.hour_timestamp.timestamp()).collect();
    let temperatures: Vec<Option<f64>> = rows.iter().map(|r| r.temperature_c).collect();
    let counts: Vec<u32> = rows.iter().map(|r| r.sample_count).collect();

    let batch = RecordBatch::try_new(
        hourly_temperature_schema(),
        vec![
            Arc::new(StringArray::from(station_ids)),
            Arc::new(TimestampSecondArray::from(hours).with_timezone("UTC")),
            Arc::new(Float64Array::from(temperatures)),
            Arc::new(UInt32Array::from(counts)),
        ],
    )?;

    Ok(batch)
}

fn daily_temperature_batch(rows: &[DailyStationTemperature]) -> Result<RecordBatch> {
    let batch = RecordBatch::try_new(
        daily_temperature_schema(),
        vec![
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.station_id.as_str()))),
            Arc::new(Date32Array::from_iter_values(rows.iter().map(|r| days_since_epoch(r.day)))),
            Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.daily_max_temp_c))),
            Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.daily_avg_temp_c))),
            Arc::new(UInt32Array::from_iter_values(rows.iter().map(|r| r.valid_hours))),
        ],
    )?;

    Ok(batch)
}

fn daily_load_batch(rows: &[DailyRegionLoad]) -> Result<RecordBatch> {
    let batch = RecordBatch::try_new(
        daily_load_schema(),
        vec![
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.region_id.as_str()))),
            Arc::new(Date32Array::from_iter_values(rows.iter().map(|r| days_since_epoch(r.day)))),
            Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.daily_total_mwh))),
            Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.daily_peak_mwh))),
            Arc::new(UInt32Array::from_iter_values(rows.iter().map(|r| r.hours_reported))),
        ],
    )?;

    Ok(batch)
}

fn heatwave_flags_batch(rows: &[HeatwaveFlag]) -> Result<RecordBatch> {
    let hot: Vec<bool> = rows.iter().map(|r| r.is_hot_day).collect();
    let heatwave: Vec<bool> = rows.iter().map(|r| r.is_heatwave_day).collect();

    let batch = RecordBatch::try_new(
        heatwave_flags_schema(),
        vec![
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.station_id.as_str()))),
            Arc::new(Date32Array::from_iter_values(rows.iter().map(|r| days_since_epoch(r.day)))),
            Arc::new(BooleanArray::from(hot)),
            Arc::new(BooleanArray::from(heatwave)),
        ],
    )?;

    Ok(batch)
}

fn heat_load_daily_batch(rows: &[HeatLoadDaily]) -> Result<RecordBatch> {
    let hot: Vec<bool> = rows.iter().map(|r| r.is_hot_day).collect();
    let heatwave: Vec<bool> = rows.iter().map(|r| r.is_heatwave_day).collect();

    let batch = RecordBatch::try_new(
        heat_load_daily_schema(),
        vec![
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.station_id.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.region_id.as_str()))),
            Arc::new(Date32Array::from_iter_values(rows.iter().map(|r| days_since_epoch(r.day)))),
            Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.daily_max_temp_c))),
            Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.daily_avg_temp_c))),
            Arc::new(BooleanArray::from(hot)),
            Arc::new(BooleanArray::from(heatwave)),
            Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.daily_total_mwh))),
            Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.daily_peak_mwh))),
        ],
    )?;

    Ok(batch)
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("Invalid {} column", name)))
}

fn optional(values: &Float64Array, i: usize) -> Option<f64> {
    if values.is_null(i) {
        None
    } else {
        Some(values.value(i))
    }
}

/// Read a published `heat_load_daily` table, stopping after `limit` rows
/// when one is given.
pub fn read_heat_load_daily(path: &Path, limit: Option<usize>) -> Result<Vec<HeatLoadDaily>> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
        .with_batch_size(limit.unwrap_or(8192).clamp(1, 8192))
        .build()?;

    let mut rows = Vec::new();
    let limit = limit.unwrap_or(usize::MAX);

    for batch_result in reader {
        let batch = batch_result?;

        let station_ids = column::<StringArray>(&batch, "station_id")?;
        let region_ids = column::<StringArray>(&batch, "region_id")?;
        let days = column::<Date32Array>(&batch, "day")?;
        let max_temps = column::<Float64Array>(&batch, "daily_max_temp_c")?;
        let avg_temps = column::<Float64Array>(&batch, "daily_avg_temp_c")?;
        let hot = column::<BooleanArray>(&batch, "is_hot_day")?;
        let heatwave = column::<BooleanArray>(&batch, "is_heatwave_day")?;
        let totals = column::<Float64Array>(&batch, "daily_total_mwh")?;
        let peaks = column::<Float64Array>(&batch, "daily_peak_mwh")?;

        for i in 0..batch.num_rows() {
            if rows.len() >= limit {
                return Ok(rows);
            }

            let day = from_days_since_epoch(days.value(i)).ok_or_else(|| {
                ProcessingError::InvalidFormat("Invalid date in Parquet file".to_string())
            })?;

            rows.push(HeatLoadDaily {
                station_id: station_ids.value(i).to_string(),
                region_id: region_ids.value(i).to_string(),
                day,
                daily_max_temp_c: optional(max_temps, i),
                daily_avg_temp_c: optional(avg_temps, i),
                is_hot_day: hot.value(i),
                is_heatwave_day: heatwave.value(i),
                daily_total_mwh: optional(totals, i),
                daily_peak_mwh: optional(peaks, i),
            });
        }
    }

    Ok(rows)
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub compression: Compression,
    pub columns: Vec<String>,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        let avg_rows = if self.row_groups > 0 {
            self.total_rows as f64 / self.row_groups as f64
        } else {
            0.0
        };

        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {:?}\n\
            - Avg rows per group: {:.0}\n\
            - Columns: {}",
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0, // Convert to MB
            self.compression,
            avg_rows,
            self.columns.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    fn sample_rows() -> Vec<HeatLoadDaily> {
        let day = NaiveDate::from_ymd_opt(2024, 7, 2).unwrap();
        vec![
            HeatLoadDaily {
                station_id: "BOS".into(),
                region_id: "ISNE".into(),
                day,
                daily_max_temp_c: None,
                daily_avg_temp_c: None,
                is_hot_day: false,
                is_heatwave_day: false,
                daily_total_mwh: None,
                daily_peak_mwh: None,
            },
            HeatLoadDaily {
                station_id: "IAD".into(),
                region_id: "PJM".into(),
                day,
                daily_max_temp_c: Some(34.5),
                daily_avg_temp_c: Some(28.25),
                is_hot_day: true,
                is_heatwave_day: true,
                daily_total_mwh: Some(370.0),
                daily_peak_mwh: Some(150.0),
            },
        ]
    }

    #[test]
    fn test_heat_load_daily_readback() -> Result<()> {
        let writer = ParquetWriter::new();
        let temp_file = NamedTempFile::new()?;
        let rows = sample_rows();

        writer.write_table_to_path(StageOutput::HeatLoadDaily(&rows), temp_file.path())?;

        let read = read_heat_load_daily(temp_file.path(), None)?;
        assert_eq!(read, rows);

        let limited = read_heat_load_daily(temp_file.path(), Some(1))?;
        assert_eq!(limited.len(), 1);
        Ok(())
    }

    #[test]
    fn test_empty_table_keeps_schema() -> Result<()> {
        let writer = ParquetWriter::new();
        let temp_file = NamedTempFile::new()?;

        writer.write_table_to_path(StageOutput::HeatLoadDaily(&[]), temp_file.path())?;

        let info = writer.get_file_info(temp_file.path())?;
        assert_eq!(info.total_rows, 0);
        assert!(info.columns.contains(&"is_heatwave_day".to_string()));
        assert!(read_heat_load_daily(temp_file.path(), None)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_hourly_table_info() -> Result<()> {
        let writer = ParquetWriter::new().with_row_group_size(2);
        let temp_file = NamedTempFile::new()?;
        let rows: Vec<HourlyTemperatureReading> = (0..5)
            .map(|h| HourlyTemperatureReading {
                station_id: "IAD".into(),
                hour_timestamp: Utc.with_ymd_and_hms(2024, 7, 1, h, 0, 0).unwrap(),
                temperature_c: if h == 3 { None } else { Some(25.0 + h as f64) },
                sample_count: 1,
            })
            .collect();

        writer.write_table_to_path(StageOutput::HourlyTemperature(&rows), temp_file.path())?;

        let info = writer.get_file_info(temp_file.path())?;
        assert_eq!(info.total_rows, 5);
        assert_eq!(info.row_groups, 3);
        assert!(info.summary().contains("Total rows: 5"));
        Ok(())
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        let compressions = ["snappy", "gzip", "lz4", "zstd", "none"];
        let rows = sample_rows();

        for compression in &compressions {
            let writer = ParquetWriter::new().with_compression(compression)?;
            let temp_file = NamedTempFile::new()?;

            let result = writer.write_table_to_path(StageOutput::HeatLoadDaily(&rows), temp_file.path());
            assert!(result.is_ok(), "Failed with compression: {}", compression);
        }

        assert!(ParquetWriter::new().with_compression("brotli-9000").is_err());
        Ok(())
    }
}
