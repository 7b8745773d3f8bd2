//! Row sources: CSV (plain or gzip) file reader and an in-memory source
//!
//! Sources hand out rows in bounded chunks. Column resolution happens once,
//! when the source is opened, before any data row is read.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use flate2::read::MultiGzDecoder;
use rustc_hash::FxHashSet;

use crate::config::ColumnMapping;
use crate::error::EtlError;
use crate::normalize::RawRow;

/// Read buffer for the CSV reader (256KB)
const READ_BUF_SIZE: usize = 256 * 1024;

/// Shared byte counter for progress tracking
pub type ByteCounter = Arc<AtomicU64>;

/// Ordered source of raw rows, consumed in chunks.
pub trait RowSource {
    /// Clear `buf` and fill it with up to `max_rows` rows.
    ///
    /// Returns the number of rows read; 0 means the input is exhausted.
    fn next_chunk(&mut self, max_rows: usize, buf: &mut Vec<RawRow>) -> Result<usize, EtlError>;

    /// Bytes consumed from the underlying file so far, if known
    fn bytes_read(&self) -> Option<u64> {
        None
    }

    /// Total size of the underlying file, if known
    fn total_bytes(&self) -> Option<u64> {
        None
    }
}

/// Reader wrapper that tracks bytes read
pub struct CountingReader<R> {
    inner: R,
    count: ByteCounter,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

/// Header positions of the four logical fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndices {
    pub language: usize,
    pub title: usize,
    pub page_id: usize,
    pub quality: usize,
}

impl ColumnIndices {
    /// Resolve all four columns by exact header name.
    ///
    /// Reports every missing column at once, in mapping order.
    pub fn resolve(headers: &[String], mapping: &ColumnMapping) -> Result<Self, EtlError> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let wanted = [
            &mapping.language,
            &mapping.title,
            &mapping.page_id,
            &mapping.quality,
        ];
        let found: Vec<Option<usize>> = wanted.iter().map(|name| find(name)).collect();

        let missing: Vec<String> = wanted
            .iter()
            .zip(&found)
            .filter(|(_, idx)| idx.is_none())
            .map(|(name, _)| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(EtlError::MissingColumns(missing));
        }

        match found.as_slice() {
            [Some(language), Some(title), Some(page_id), Some(quality)] => Ok(Self {
                language: *language,
                title: *title,
                page_id: *page_id,
                quality: *quality,
            }),
            _ => Err(EtlError::MissingColumns(Vec::new())),
        }
    }
}

/// Set of strings that read as "absent"
#[derive(Debug, Clone, Default)]
pub struct NaValues(FxHashSet<String>);

impl NaValues {
    pub fn new<S: AsRef<str>>(values: &[S]) -> Self {
        Self(values.iter().map(|v| v.as_ref().to_string()).collect())
    }

    /// `None` for empty fields and NA markers
    pub fn field(&self, raw: Option<&str>) -> Option<String> {
        let value = raw?;
        if value.is_empty() || self.0.contains(value) {
            None
        } else {
            Some(value.to_string())
        }
    }
}

/// CSV file source with header-based column resolution.
///
/// Files ending in `.gz` are decompressed on the fly. Invalid UTF-8 is
/// replaced rather than rejected, so a bad byte never aborts a chunk.
pub struct CsvSource {
    reader: csv::Reader<Box<dyn Read>>,
    headers: Vec<String>,
    indices: ColumnIndices,
    na: NaValues,
    record: csv::ByteRecord,
    counter: ByteCounter,
    total_bytes: Option<u64>,
}

impl std::fmt::Debug for CsvSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvSource")
            .field("headers", &self.headers)
            .field("indices", &self.indices)
            .finish_non_exhaustive()
    }
}

impl CsvSource {
    /// Open `path` and resolve the mapped columns from its header row.
    pub fn open(path: &Path, mapping: &ColumnMapping, na: NaValues) -> Result<Self, EtlError> {
        let file = File::open(path)?;
        let total_bytes = file.metadata().ok().map(|m| m.len());
        let counter: ByteCounter = Arc::new(AtomicU64::new(0));
        let counting = CountingReader {
            inner: file,
            count: counter.clone(),
        };

        let inner: Box<dyn Read> = if is_gzip_path(path) {
            Box::new(MultiGzDecoder::new(counting))
        } else {
            Box::new(counting)
        };
        let mut source = Self::from_reader(inner, mapping, na)?;
        source.counter = counter;
        source.total_bytes = total_bytes;
        Ok(source)
    }

    /// Build from any reader; used for in-memory CSV in tests.
    pub fn from_reader(
        reader: Box<dyn Read>,
        mapping: &ColumnMapping,
        na: NaValues,
    ) -> Result<Self, EtlError> {
        let mut reader = csv::ReaderBuilder::new()
            .buffer_capacity(READ_BUF_SIZE)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let headers: Vec<String> = reader
            .byte_headers()?
            .iter()
            .map(|h| String::from_utf8_lossy(h).into_owned())
            .collect();
        let indices = ColumnIndices::resolve(&headers, mapping)?;

        Ok(Self {
            reader,
            headers,
            indices,
            na,
            record: csv::ByteRecord::new(),
            counter: Arc::new(AtomicU64::new(0)),
            total_bytes: None,
        })
    }

    /// Header names as found in the file
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn indices(&self) -> ColumnIndices {
        self.indices
    }

    fn field(&self, idx: usize) -> Option<String> {
        let text = String::from_utf8_lossy(self.record.get(idx)?);
        self.na.field(Some(&*text))
    }
}

impl RowSource for CsvSource {
    fn next_chunk(&mut self, max_rows: usize, buf: &mut Vec<RawRow>) -> Result<usize, EtlError> {
        buf.clear();
        while buf.len() < max_rows {
            if !self.reader.read_byte_record(&mut self.record)? {
                break;
            }
            let idx = self.indices;
            buf.push(RawRow {
                language: self.field(idx.language),
                title: self.field(idx.title),
                page_id: self.field(idx.page_id),
                quality: self.field(idx.quality),
            });
        }
        Ok(buf.len())
    }

    fn bytes_read(&self) -> Option<u64> {
        Some(self.counter.load(Ordering::Relaxed))
    }

    fn total_bytes(&self) -> Option<u64> {
        self.total_bytes
    }
}

fn is_gzip_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

/// In-memory source over a fixed row list
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    rows: std::vec::IntoIter<RawRow>,
}

impl VecSource {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }
}

impl RowSource for VecSource {
    fn next_chunk(&mut self, max_rows: usize, buf: &mut Vec<RawRow>) -> Result<usize, EtlError> {
        buf.clear();
        buf.extend(self.rows.by_ref().take(max_rows));
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn na() -> NaValues {
        NaValues::new(crate::config::DEFAULT_NA_VALUES)
    }

    fn csv_source(text: &'static str) -> Result<CsvSource, EtlError> {
        let inner: Box<dyn Read> = Box::new(text.as_bytes());
        CsvSource::from_reader(inner, &ColumnMapping::default(), na())
    }

    #[test]
    fn resolve_reports_all_missing() {
        let headers = vec!["Language".to_string(), "Title".to_string()];
        match ColumnIndices::resolve(&headers, &ColumnMapping::default()) {
            Err(EtlError::MissingColumns(cols)) => {
                assert_eq!(cols, vec!["Page_ID", "WikiRank_score"]);
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn resolve_any_column_order() {
        let headers: Vec<String> = ["WikiRank_score", "extra", "Page_ID", "Title", "Language"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let idx = ColumnIndices::resolve(&headers, &ColumnMapping::default()).unwrap();
        assert_eq!(
            idx,
            ColumnIndices {
                language: 4,
                title: 3,
                page_id: 2,
                quality: 0
            }
        );
    }

    #[test]
    fn na_markers_become_none() {
        let na = na();
        assert_eq!(na.field(Some("")), None);
        assert_eq!(na.field(Some("NaN")), None);
        assert_eq!(na.field(Some("NULL")), None);
        assert_eq!(na.field(None), None);
        assert_eq!(na.field(Some("en")), Some("en".to_string()));
    }

    #[test]
    fn csv_source_maps_reordered_header() {
        let mut src = csv_source("Page_ID,WikiRank_score,Title,Language\n7,55.5,Cat,en\n").unwrap();
        assert_eq!(
            src.indices(),
            ColumnIndices {
                language: 3,
                title: 2,
                page_id: 0,
                quality: 1
            }
        );
        let mut buf = Vec::new();
        src.next_chunk(10, &mut buf).unwrap();
        assert_eq!(buf[0], RawRow::new(Some("en"), Some("Cat"), Some("7"), Some("55.5")));
    }

    #[test]
    fn csv_source_fails_before_reading_rows() {
        let err = csv_source("Language,Title\nen,Cat\n").unwrap_err();
        assert!(matches!(err, EtlError::MissingColumns(_)));
    }

    #[test]
    fn csv_source_reads_in_chunks() {
        let mut src = csv_source(
            "Language,Title,Page_ID,WikiRank_score\n\
             en,Cat,1,85\n\
             en,\"Dog, the\",2,60\n\
             fr,Chat,3,\n",
        )
        .unwrap();
        assert_eq!(src.headers().len(), 4);

        let mut buf = Vec::new();
        assert_eq!(src.next_chunk(2, &mut buf).unwrap(), 2);
        assert_eq!(buf[1].title.as_deref(), Some("Dog, the"));
        assert_eq!(src.next_chunk(2, &mut buf).unwrap(), 1);
        assert_eq!(buf[0], RawRow::new(Some("fr"), Some("Chat"), Some("3"), None));
        assert_eq!(src.next_chunk(2, &mut buf).unwrap(), 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn csv_source_tolerates_short_rows() {
        let mut src = csv_source("Language,Title,Page_ID,WikiRank_score\nen,Cat\n").unwrap();
        let mut buf = Vec::new();
        src.next_chunk(10, &mut buf).unwrap();
        assert_eq!(buf[0], RawRow::new(Some("en"), Some("Cat"), None, None));
    }

    #[test]
    fn csv_source_reads_gzip_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("input.csv.gz");
        let file = File::create(&path).unwrap();
        let mut gz = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        gz.write_all(b"Language,Title,Page_ID,WikiRank_score\nde,Katze,9,71.5\n")
            .unwrap();
        gz.finish().unwrap();

        let mut src = CsvSource::open(&path, &ColumnMapping::default(), na()).unwrap();
        let mut buf = Vec::new();
        assert_eq!(src.next_chunk(100, &mut buf).unwrap(), 1);
        assert_eq!(buf[0].title.as_deref(), Some("Katze"));
        assert!(src.bytes_read().unwrap() > 0);
        assert!(src.total_bytes().is_some());
    }

    #[test]
    fn vec_source_chunks_then_exhausts() {
        let rows = vec![RawRow::default(); 5];
        let mut src = VecSource::new(rows);
        let mut buf = Vec::new();
        assert_eq!(src.next_chunk(3, &mut buf).unwrap(), 3);
        assert_eq!(src.next_chunk(3, &mut buf).unwrap(), 2);
        assert_eq!(src.next_chunk(3, &mut buf).unwrap(), 0);
    }
}
