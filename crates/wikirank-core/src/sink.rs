//! Output sinks: JSONL record stream and Parquet table writer
//!
//! Both write to `<name>.tmp` and rename on finalize, so a crashed run never
//! leaves a truncated file under its final name.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::RecordBatch;
use arrow::datatypes::Schema;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;

use crate::error::EtlError;
use crate::normalize::NormalizedRecord;

/// File name of the cleaned record stream
pub const RECORDS_FILE: &str = "articles_clean.jsonl";

/// Write buffer for the JSONL file (1MB)
const WRITE_BUF_SIZE: usize = 1024 * 1024;

/// Totals reported when a record sink is closed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub rows_written: u64,
    pub bytes_written: u64,
    pub path: Option<PathBuf>,
}

/// Append-only destination for normalized records.
pub trait RecordSink {
    /// Append one chunk of records. Earlier chunks are never revisited.
    fn append(&mut self, records: &[NormalizedRecord]) -> Result<(), EtlError>;

    /// Bytes appended so far
    fn bytes_written(&self) -> u64;

    fn finish(self) -> Result<SinkStats, EtlError>
    where
        Self: Sized;
}

/// In-memory sink, used by tests and benches
impl RecordSink for Vec<NormalizedRecord> {
    fn append(&mut self, records: &[NormalizedRecord]) -> Result<(), EtlError> {
        self.extend_from_slice(records);
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        0
    }

    fn finish(self) -> Result<SinkStats, EtlError> {
        Ok(SinkStats {
            rows_written: self.len() as u64,
            ..Default::default()
        })
    }
}

/// Newline-delimited JSON writer with atomic tmp→rename
pub struct JsonlSink {
    writer: BufWriter<File>,
    line: Vec<u8>,
    tmp_path: PathBuf,
    final_path: PathBuf,
    rows_written: u64,
    bytes_written: u64,
}

impl std::fmt::Debug for JsonlSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlSink")
            .field("final_path", &self.final_path)
            .field("rows_written", &self.rows_written)
            .finish_non_exhaustive()
    }
}

impl JsonlSink {
    /// Create `articles_clean.jsonl.tmp` in `output_dir`
    pub fn create(output_dir: &Path) -> Result<Self, EtlError> {
        let final_path = output_dir.join(RECORDS_FILE);
        let tmp_path = output_dir.join(format!("{RECORDS_FILE}.tmp"));

        if tmp_path.exists() {
            fs::remove_file(&tmp_path)?;
        }
        let file = File::create(&tmp_path)?;

        Ok(Self {
            writer: BufWriter::with_capacity(WRITE_BUF_SIZE, file),
            line: Vec::with_capacity(512),
            tmp_path,
            final_path,
            rows_written: 0,
            bytes_written: 0,
        })
    }
}

impl RecordSink for JsonlSink {
    fn append(&mut self, records: &[NormalizedRecord]) -> Result<(), EtlError> {
        for record in records {
            self.line.clear();
            serde_json::to_writer(&mut self.line, record)?;
            self.line.push(b'\n');
            self.writer.write_all(&self.line)?;
            self.bytes_written += self.line.len() as u64;
        }
        self.rows_written += records.len() as u64;
        self.writer.flush()?;
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush, fsync and rename tmp → final
    fn finish(self) -> Result<SinkStats, EtlError> {
        let file = self
            .writer
            .into_inner()
            .map_err(|e| EtlError::Io(e.into_error()))?;
        file.sync_all()?;
        drop(file);
        fs::rename(&self.tmp_path, &self.final_path)?;
        Ok(SinkStats {
            rows_written: self.rows_written,
            bytes_written: self.bytes_written,
            path: Some(self.final_path),
        })
    }
}

/// Buffered parquet writer with atomic tmp→rename
pub struct ParquetSink {
    writer: ArrowWriter<File>,
    tmp_path: PathBuf,
    final_path: PathBuf,
    row_count: usize,
}

impl std::fmt::Debug for ParquetSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParquetSink")
            .field("final_path", &self.final_path)
            .field("row_count", &self.row_count)
            .finish_non_exhaustive()
    }
}

impl ParquetSink {
    /// Create a sink writing `path.tmp`, renamed to `path` on finalize
    pub fn new(path: &Path, schema: &Schema, zstd_level: i32) -> Result<Self, EtlError> {
        let final_path = path.to_path_buf();
        let mut tmp_name = final_path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        if tmp_path.exists() {
            fs::remove_file(&tmp_path)?;
        }

        let file = File::create(&tmp_path)?;
        let level = ZstdLevel::try_new(zstd_level)?;
        let props = WriterProperties::builder()
            .set_compression(Compression::ZSTD(level))
            .build();
        let writer = ArrowWriter::try_new(file, Arc::new(schema.clone()), Some(props))?;

        Ok(Self {
            writer,
            tmp_path,
            final_path,
            row_count: 0,
        })
    }

    pub fn write_batch(&mut self, batch: &RecordBatch) -> Result<(), EtlError> {
        self.row_count += batch.num_rows();
        self.writer.write(batch)?;
        Ok(())
    }

    /// Finalize: flush footer and atomically rename tmp → final
    pub fn finalize(self) -> Result<usize, EtlError> {
        let row_count = self.row_count;
        self.writer.close()?;
        fs::rename(&self.tmp_path, &self.final_path)?;
        Ok(row_count)
    }
}

/// Check if a completed parquet file exists and has a valid footer
pub fn is_valid_parquet(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    parquet::file::reader::SerializedFileReader::new(file).is_ok()
}

/// Remove stale .tmp files in the output directory
pub fn cleanup_tmp_files(output_dir: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(output_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "tmp") {
            log::warn!("Removing stale tmp file: {}", path.display());
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}
