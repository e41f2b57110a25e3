pub mod parquet_writer;
pub mod table_store;

pub use parquet_writer::{read_heat_load_daily, ParquetFileInfo, ParquetWriter};
pub use table_store::{PublishedTable, RunLock, RunManifest, TableStore};
