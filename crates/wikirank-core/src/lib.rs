//! WikiRank Core - streaming ETL over WikiRank article-quality CSV exports
//!
//! Reads the input in bounded chunks, writes one normalized JSONL record
//! per row, and folds every row into per-language accumulators that are
//! emitted as summary tables once the input is exhausted.

pub mod aggregate;
pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod normalize;
pub mod progress;
pub mod report;
pub mod runner;
pub mod schema;
pub mod session;
pub mod sink;
pub mod source;
pub mod topk;

// Re-exports for convenience
pub use aggregate::{Aggregates, GroupStats, RunningAggregator};
pub use config::{ColumnMapping, Config, EtlParams};
pub use error::EtlError;
pub use logging::{ProgressAwareLogger, Verbosity, init_logging};
pub use manifest::{RunManifest, VerifyReport};
pub use normalize::{NormalizedRecord, Normalizer, RawRow};
pub use progress::{ChunkProgress, ProgressContext};
pub use report::{Report, WrittenTable};
pub use runner::{RunSummary, run};
pub use session::{AggregationSession, SessionResult, SessionStats};
pub use sink::{JsonlSink, ParquetSink, RecordSink, SinkStats};
pub use source::{CsvSource, NaValues, RowSource, VecSource};
pub use topk::{TopEntry, TopKTracker};
