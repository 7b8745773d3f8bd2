//! Report emitter: final accumulator state → four summary tables
//!
//! Tables are built once from a [`SessionResult`] and can be written as
//! CSV/TSV (always) and Parquet (optional). Row order is fixed: language
//! ascending, then bin ascending; top-K by language then rank.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    ArrayRef, Float64Array, Int64Array, RecordBatch, StringArray, UInt32Array, UInt64Array,
};
use arrow::datatypes::Schema;
use arrow::error::ArrowError;
use serde::Serialize;

use crate::error::EtlError;
use crate::schema;
use crate::session::SessionResult;
use crate::sink::ParquetSink;

pub const LANG_SUMMARY_FILE: &str = "lang_summary.csv";
pub const QUALITY_BINS_FILE: &str = "lang_quality_bin_summary.csv";
pub const TITLE_LEN_BINS_FILE: &str = "lang_titlelen_bin_summary.csv";
pub const TOPK_FILE: &str = "lang_topk.tsv";

/// Every summary file name, CSV/TSV and Parquet
pub const SUMMARY_FILES: &[&str] = &[
    LANG_SUMMARY_FILE,
    QUALITY_BINS_FILE,
    TITLE_LEN_BINS_FILE,
    TOPK_FILE,
    "lang_summary.parquet",
    "lang_quality_bin_summary.parquet",
    "lang_titlelen_bin_summary.parquet",
    "lang_topk.parquet",
];

/// Decimal places kept for averages and ratios
const RATIO_DECIMALS: i32 = 6;

/// 2^52: from here up every f64 is already an integer
const F64_EXACT_INT: f64 = 4_503_599_627_370_496.0;

/// Round to `RATIO_DECIMALS` places. Values too large to carry that many
/// fractional digits are returned as-is.
fn round_ratio(v: f64) -> f64 {
    let scale = 10f64.powi(RATIO_DECIMALS);
    let scaled = v * scale;
    if !scaled.is_finite() || scaled.abs() >= F64_EXACT_INT {
        return v;
    }
    scaled.round() / scale
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LangSummaryRow {
    pub lang: String,
    pub article_count: u64,
    pub avg_quality: f64,
    pub high_quality_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityBinRow {
    pub lang: String,
    pub quality_bin: i64,
    pub bin_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleLenBinRow {
    pub lang: String,
    pub title_len_bin: i64,
    pub bin_count: u64,
    pub avg_quality: f64,
    pub high_quality_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopKRow {
    pub lang: String,
    /// 1-based
    pub rank: u32,
    pub quality: f64,
    pub page_id: i64,
    pub title: String,
}

/// Where one table was written and how many rows it has
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenTable {
    pub path: PathBuf,
    pub rows: usize,
}

/// The four summary tables, fully materialized
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    pub lang_summary: Vec<LangSummaryRow>,
    pub quality_bins: Vec<QualityBinRow>,
    pub title_len_bins: Vec<TitleLenBinRow>,
    pub topk: Vec<TopKRow>,
}

impl Report {
    /// Flatten final session state into tables.
    pub fn build(result: &SessionResult) -> Self {
        let agg = &result.aggregates;

        let lang_summary = agg
            .languages
            .iter()
            .map(|(lang, s)| LangSummaryRow {
                lang: lang.clone(),
                article_count: s.count,
                avg_quality: round_ratio(s.avg_quality()),
                high_quality_ratio: round_ratio(s.high_quality_ratio()),
            })
            .collect();

        let quality_bins = agg
            .quality_bins
            .iter()
            .map(|((lang, bin), count)| QualityBinRow {
                lang: lang.clone(),
                quality_bin: *bin,
                bin_count: *count,
            })
            .collect();

        let title_len_bins = agg
            .title_len_bins
            .iter()
            .map(|((lang, bin), s)| TitleLenBinRow {
                lang: lang.clone(),
                title_len_bin: *bin,
                bin_count: s.count,
                avg_quality: round_ratio(s.avg_quality()),
                high_quality_ratio: round_ratio(s.high_quality_ratio()),
            })
            .collect();

        let mut topk = Vec::with_capacity(result.topk.total_entries());
        for lang in result.topk.languages() {
            for (i, entry) in result.topk.ranked(lang).into_iter().enumerate() {
                topk.push(TopKRow {
                    lang: lang.to_string(),
                    rank: u32::try_from(i + 1).unwrap_or(u32::MAX),
                    quality: entry.quality,
                    page_id: entry.page_id,
                    title: entry.title.clone(),
                });
            }
        }

        Self {
            lang_summary,
            quality_bins,
            title_len_bins,
            topk,
        }
    }

    /// Write the CSV and TSV tables into `dir`.
    pub fn write_tables(&self, dir: &Path) -> Result<Vec<WrittenTable>, EtlError> {
        Ok(vec![
            write_delimited(
                &dir.join(LANG_SUMMARY_FILE),
                b',',
                &schema::LANG_SUMMARY,
                &self.lang_summary,
            )?,
            write_delimited(
                &dir.join(QUALITY_BINS_FILE),
                b',',
                &schema::QUALITY_BINS,
                &self.quality_bins,
            )?,
            write_delimited(
                &dir.join(TITLE_LEN_BINS_FILE),
                b',',
                &schema::TITLE_LEN_BINS,
                &self.title_len_bins,
            )?,
            // Tab-separated: titles may contain commas but never tabs
            write_delimited(&dir.join(TOPK_FILE), b'\t', &schema::TOPK, &self.topk)?,
        ])
    }

    /// Write the same four tables as zstd Parquet into `dir`.
    pub fn write_parquet(
        &self,
        dir: &Path,
        zstd_level: i32,
    ) -> Result<Vec<WrittenTable>, EtlError> {
        let tables = [
            ("lang_summary.parquet", self.lang_summary_batch()?),
            ("lang_quality_bin_summary.parquet", self.quality_bins_batch()?),
            ("lang_titlelen_bin_summary.parquet", self.title_len_bins_batch()?),
            ("lang_topk.parquet", self.topk_batch()?),
        ];
        let mut written = Vec::with_capacity(tables.len());
        for (name, rb) in tables {
            let path = dir.join(name);
            let mut sink = ParquetSink::new(&path, rb.schema().as_ref(), zstd_level)?;
            sink.write_batch(&rb)?;
            let rows = sink.finalize()?;
            written.push(WrittenTable { path, rows });
        }
        Ok(written)
    }

    pub fn lang_summary_batch(&self) -> Result<RecordBatch, ArrowError> {
        let rows = &self.lang_summary;
        batch(
            &schema::LANG_SUMMARY,
            vec![
                Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.lang.as_str()))),
                Arc::new(UInt64Array::from_iter_values(rows.iter().map(|r| r.article_count))),
                Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.avg_quality))),
                Arc::new(Float64Array::from_iter_values(
                    rows.iter().map(|r| r.high_quality_ratio),
                )),
            ],
        )
    }

    pub fn quality_bins_batch(&self) -> Result<RecordBatch, ArrowError> {
        let rows = &self.quality_bins;
        batch(
            &schema::QUALITY_BINS,
            vec![
                Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.lang.as_str()))),
                Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.quality_bin))),
                Arc::new(UInt64Array::from_iter_values(rows.iter().map(|r| r.bin_count))),
            ],
        )
    }

    pub fn title_len_bins_batch(&self) -> Result<RecordBatch, ArrowError> {
        let rows = &self.title_len_bins;
        batch(
            &schema::TITLE_LEN_BINS,
            vec![
                Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.lang.as_str()))),
                Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.title_len_bin))),
                Arc::new(UInt64Array::from_iter_values(rows.iter().map(|r| r.bin_count))),
                Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.avg_quality))),
                Arc::new(Float64Array::from_iter_values(
                    rows.iter().map(|r| r.high_quality_ratio),
                )),
            ],
        )
    }

    pub fn topk_batch(&self) -> Result<RecordBatch, ArrowError> {
        let rows = &self.topk;
        batch(
            &schema::TOPK,
            vec![
                Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.lang.as_str()))),
                Arc::new(UInt32Array::from_iter_values(rows.iter().map(|r| r.rank))),
                Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.quality))),
                Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.page_id))),
                Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.title.as_str()))),
            ],
        )
    }
}

fn batch(schema: &Arc<Schema>, columns: Vec<ArrayRef>) -> Result<RecordBatch, ArrowError> {
    RecordBatch::try_new(schema.clone(), columns)
}

/// Header first (even for an empty table), then one record per row.
fn write_delimited<T: Serialize>(
    path: &Path,
    delimiter: u8,
    schema: &Schema,
    rows: &[T],
) -> Result<WrittenTable, EtlError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Necessary)
        .from_path(path)?;
    writer.write_record(schema::header(schema))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(WrittenTable {
        path: path.to_path_buf(),
        rows: rows.len(),
    })
}
