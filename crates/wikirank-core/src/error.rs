//! Common error type for the ETL pipeline

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Error from any stage of an ETL run.
///
/// Per-field parse failures never surface here: they degrade to missing
/// values inside the normalizer. Everything in this enum is fatal for the run.
#[derive(Debug)]
pub enum EtlError {
    /// Required columns absent from the source header
    MissingColumns(Vec<String>),
    /// Configuration rejected before any I/O
    InvalidConfig(String),
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    Arrow(ArrowError),
    Parquet(ParquetError),
}

impl std::fmt::Display for EtlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingColumns(cols) => write!(f, "missing columns: {}", cols.join(", ")),
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::Io(e) => write!(f, "IO: {e}"),
            Self::Csv(e) => write!(f, "CSV: {e}"),
            Self::Json(e) => write!(f, "JSON: {e}"),
            Self::Arrow(e) => write!(f, "Arrow: {e}"),
            Self::Parquet(e) => write!(f, "Parquet: {e}"),
        }
    }
}

impl std::error::Error for EtlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Csv(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Arrow(e) => Some(e),
            Self::Parquet(e) => Some(e),
            Self::MissingColumns(_) | Self::InvalidConfig(_) => None,
        }
    }
}

impl EtlError {
    /// Process exit status for this error.
    ///
    /// Schema resolution failures exit with 2 so wrappers can tell a wrong
    /// input file apart from a crash mid-run.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingColumns(_) => 2,
            _ => 1,
        }
    }
}

impl From<std::io::Error> for EtlError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<csv::Error> for EtlError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

impl From<serde_json::Error> for EtlError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<ArrowError> for EtlError {
    fn from(e: ArrowError) -> Self {
        Self::Arrow(e)
    }
}

impl From<ParquetError> for EtlError {
    fn from(e: ParquetError) -> Self {
        Self::Parquet(e)
    }
}
