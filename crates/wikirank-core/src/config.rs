//! ETL run configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::EtlError;

/// Quality score at or above which an article counts as high quality
pub const DEFAULT_HQ_THRESHOLD: f64 = 80.0;
pub const DEFAULT_QUALITY_BIN_SIZE: u32 = 10;
pub const DEFAULT_TITLE_LEN_BIN_SIZE: u32 = 20;
pub const DEFAULT_TOP_K: usize = 50;
/// Rows per chunk; bounds peak memory of the read loop
pub const DEFAULT_CHUNK_SIZE: usize = 200_000;

/// Values read as "absent", matching the usual dataframe NA conventions.
pub const DEFAULT_NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Source header names for the four logical fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub language: String,
    pub title: String,
    pub page_id: String,
    pub quality: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            language: "Language".to_string(),
            title: "Title".to_string(),
            page_id: "Page_ID".to_string(),
            quality: "WikiRank_score".to_string(),
        }
    }
}

/// Parameters that affect output content.
///
/// Two runs over the same input with equal params produce byte-identical
/// summary tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlParams {
    pub hq_threshold: f64,
    pub quality_bin_size: u32,
    pub title_len_bin_size: u32,
    pub top_k: usize,
    pub chunk_size: usize,
    /// Bucket key for rows without a language; `None` drops them from aggregates
    pub unknown_language: Option<String>,
}

impl Default for EtlParams {
    fn default() -> Self {
        Self {
            hq_threshold: DEFAULT_HQ_THRESHOLD,
            quality_bin_size: DEFAULT_QUALITY_BIN_SIZE,
            title_len_bin_size: DEFAULT_TITLE_LEN_BIN_SIZE,
            top_k: DEFAULT_TOP_K,
            chunk_size: DEFAULT_CHUNK_SIZE,
            unknown_language: None,
        }
    }
}

impl EtlParams {
    pub fn validate(&self) -> Result<(), EtlError> {
        if self.quality_bin_size == 0 {
            return Err(EtlError::InvalidConfig("quality_bin_size must be >= 1".into()));
        }
        if self.title_len_bin_size == 0 {
            return Err(EtlError::InvalidConfig("title_len_bin_size must be >= 1".into()));
        }
        if self.chunk_size == 0 {
            return Err(EtlError::InvalidConfig("chunk_size must be >= 1".into()));
        }
        if !self.hq_threshold.is_finite() {
            return Err(EtlError::InvalidConfig("hq_threshold must be finite".into()));
        }
        if self.unknown_language.as_deref() == Some("") {
            return Err(EtlError::InvalidConfig("unknown_language must not be empty".into()));
        }
        Ok(())
    }
}

/// Runtime configuration for one ETL run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Input CSV (optionally gzip-compressed)
    pub input: PathBuf,
    /// Output directory for JSONL, summary tables and manifest
    pub output_dir: PathBuf,
    pub columns: ColumnMapping,
    pub na_values: Vec<String>,
    pub params: EtlParams,
    /// Also write summary tables as Parquet
    pub parquet: bool,
    /// Zstd compression level for Parquet output
    pub zstd_level: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from("wikirank.csv"),
            output_dir: PathBuf::from("output"),
            columns: ColumnMapping::default(),
            na_values: DEFAULT_NA_VALUES.iter().map(|s| s.to_string()).collect(),
            params: EtlParams::default(),
            parquet: false,
            zstd_level: 3,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), EtlError> {
        self.params.validate()?;
        if self.parquet && !(1..=22).contains(&self.zstd_level) {
            return Err(EtlError::InvalidConfig(format!(
                "zstd_level {} out of range 1..=22",
                self.zstd_level
            )));
        }
        Ok(())
    }
}
