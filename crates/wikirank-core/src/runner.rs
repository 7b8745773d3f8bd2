//! Main runner: one full ETL pass from input CSV to output directory

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::config::Config;
use crate::driver;
use crate::manifest::{MANIFEST_FILE, ManifestCounts, RunManifest};
use crate::progress::{ChunkProgress, ProgressContext, fmt_num};
use crate::report::{Report, SUMMARY_FILES, WrittenTable};
use crate::session::AggregationSession;
use crate::sink::{JsonlSink, RECORDS_FILE, RecordSink, cleanup_tmp_files, is_valid_parquet};
use crate::source::{CsvSource, NaValues, RowSource};

/// Pipeline execution summary
#[derive(Debug)]
pub struct RunSummary {
    pub output_dir: PathBuf,
    pub rows_read: u64,
    pub rows_without_language: u64,
    pub rows_rankable: u64,
    pub languages: usize,
    pub chunks: usize,
    pub topk_entries: usize,
    pub jsonl_bytes: u64,
    pub tables: Vec<WrittenTable>,
    pub content_hash: String,
    pub elapsed: Duration,
}

/// Run the ETL pipeline.
///
/// Columns are resolved before anything in the output directory is touched,
/// so a wrong input file leaves the previous outputs in place.
pub fn run(config: &Config, progress: &ProgressContext) -> Result<RunSummary> {
    let start = Instant::now();
    config.validate()?;

    let mut source = CsvSource::open(
        &config.input,
        &config.columns,
        NaValues::new(&config.na_values),
    )
    .with_context(|| format!("Failed to open {}", config.input.display()))?;
    log::info!("Detected columns: {:?}", source.headers());
    let idx = source.indices();
    log::info!("Column mapping:");
    log::info!(" lang    <- {} (#{})", config.columns.language, idx.language);
    log::info!(" title   <- {} (#{})", config.columns.title, idx.title);
    log::info!(" page_id <- {} (#{})", config.columns.page_id, idx.page_id);
    log::info!(" quality <- {} (#{})", config.columns.quality, idx.quality);

    std::fs::create_dir_all(&config.output_dir).context("Failed to create output directory")?;
    remove_stale_outputs(&config.output_dir)?;

    let mut sink = JsonlSink::create(&config.output_dir).context("Failed to create JSONL sink")?;
    let mut session = AggregationSession::new(&config.params);
    let chunk_progress = ChunkProgress::new(progress.input_bar(source.total_bytes()));

    let drive_stats = driver::drive(
        &mut source,
        &mut session,
        &mut sink,
        config.params.chunk_size,
        &chunk_progress,
    )
    .context("Chunk processing failed")?;

    let sink_stats = sink.finish().context("Failed to finalize JSONL output")?;
    let languages = session.language_count();
    let result = session.finish();

    let report = Report::build(&result);
    let mut tables = report
        .write_tables(&config.output_dir)
        .context("Failed to write summary tables")?;
    if config.parquet {
        let parquet_tables = report
            .write_parquet(&config.output_dir, config.zstd_level)
            .context("Failed to write Parquet summary tables")?;
        for table in &parquet_tables {
            if !is_valid_parquet(&table.path) {
                anyhow::bail!("Parquet footer check failed: {}", table.path.display());
            }
        }
        tables.extend(parquet_tables);
    }

    let mut outputs = vec![RECORDS_FILE.to_string()];
    outputs.extend(tables.iter().filter_map(|t| file_name(&t.path)));
    let counts = ManifestCounts {
        rows_read: drive_stats.rows_read,
        rows_without_language: result.stats.rows_without_language,
        languages,
        chunks: drive_stats.chunks,
        topk_entries: report.topk.len(),
    };
    let manifest = RunManifest::build(
        &config.output_dir,
        &outputs,
        &config.input,
        &config.params,
        counts,
    )?;
    manifest.write_to(&config.output_dir)?;

    let summary = RunSummary {
        output_dir: config.output_dir.clone(),
        rows_read: drive_stats.rows_read,
        rows_without_language: result.stats.rows_without_language,
        rows_rankable: result.stats.rows_rankable,
        languages,
        chunks: drive_stats.chunks,
        topk_entries: report.topk.len(),
        jsonl_bytes: sink_stats.bytes_written,
        tables,
        content_hash: manifest.content_hash,
        elapsed: start.elapsed(),
    };

    log::info!(
        "ETL done: {} rows, {} languages in {:.1}s -> {}",
        fmt_num(summary.rows_read),
        summary.languages,
        summary.elapsed.as_secs_f64(),
        summary.output_dir.display()
    );
    if summary.rows_without_language > 0 {
        log::warn!(
            "{} rows had no language and were left out of the summaries",
            fmt_num(summary.rows_without_language)
        );
    }

    Ok(summary)
}

/// Delete outputs of a previous run so nothing stale survives a partial rerun.
pub fn remove_stale_outputs(dir: &Path) -> Result<()> {
    let names = std::iter::once(RECORDS_FILE)
        .chain(SUMMARY_FILES.iter().copied())
        .chain(std::iter::once(MANIFEST_FILE));
    for name in names {
        let path = dir.join(name);
        if path.exists() {
            log::warn!("Removing previous output: {}", path.display());
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
    }
    cleanup_tmp_files(dir).context("Failed to clean tmp files")?;
    Ok(())
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}
