//! `wikirank run` - one ETL pass over a WikiRank CSV

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use wikirank_core::ProgressContext;
use wikirank_core::progress::{bytes_to_mb, fmt_num};

use super::print_summary;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Input CSV, optionally .gz (default: from config)
    pub input: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Rows per chunk
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Articles kept per language in the top-K table
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Quality score counted as high quality
    #[arg(long)]
    pub hq_threshold: Option<f64>,

    /// Also write summary tables as Parquet
    #[arg(long)]
    pub parquet: bool,

    /// Zstd compression level for Parquet (1-22)
    #[arg(short, long)]
    pub zstd_level: Option<i32>,
}

impl RunArgs {
    /// File config with command-line flags applied on top
    fn resolve(self, config: &Config) -> wikirank_core::Config {
        let mut run = config.to_run_config();
        if let Some(input) = self.input {
            run.input = input;
        }
        if let Some(output) = self.output {
            run.output_dir = output;
        }
        if let Some(n) = self.chunk_size {
            run.params.chunk_size = n;
        }
        if let Some(k) = self.top_k {
            run.params.top_k = k;
        }
        if let Some(t) = self.hq_threshold {
            run.params.hq_threshold = t;
        }
        if let Some(level) = self.zstd_level {
            run.zstd_level = level;
        }
        run.parquet |= self.parquet;
        run
    }
}

pub fn run(args: RunArgs, config: &Config, progress: &ProgressContext) -> Result<()> {
    let run_config = args.resolve(config);
    log::info!(
        "Input: {} -> {}",
        run_config.input.display(),
        run_config.output_dir.display()
    );

    let summary = wikirank_core::run(&run_config, progress)?;

    let mut rows = vec![
        ("Rows read", fmt_num(summary.rows_read)),
        ("Languages", summary.languages.to_string()),
        ("Without language", fmt_num(summary.rows_without_language)),
        ("Rankable rows", fmt_num(summary.rows_rankable)),
        ("Top-K entries", summary.topk_entries.to_string()),
        ("Chunks", summary.chunks.to_string()),
        ("JSONL size", format!("{:.1} MB", bytes_to_mb(summary.jsonl_bytes))),
        ("Elapsed", format!("{:.1}s", summary.elapsed.as_secs_f64())),
        ("Output", summary.output_dir.display().to_string()),
    ];
    for table in &summary.tables {
        let name = table
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        rows.push(("Table", format!("{name} ({} rows)", table.rows)));
    }
    let short_hash = summary.content_hash.get(..16).unwrap_or(&summary.content_hash);
    rows.push(("Content hash", short_hash.to_string()));
    print_summary("WikiRank ETL", &rows);
    Ok(())
}
