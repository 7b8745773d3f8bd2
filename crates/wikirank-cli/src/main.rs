//! wikirank - streaming ETL for WikiRank article-quality exports
//!
//! Cleans a WikiRank CSV into a JSONL record stream and per-language
//! summary tables, in bounded memory.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;
use wikirank_core::{EtlError, ProgressContext, Verbosity};

#[derive(Parser)]
#[command(name = "wikirank")]
#[command(about = "Streaming ETL for WikiRank article-quality exports")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./wikirank.toml or ~/.config/wikirank/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Clean the input and write JSONL plus summary tables
    Run(cmd::run::RunArgs),
    /// Check an output directory against its manifest
    Verify(cmd::verify::VerifyArgs),
    /// Show current configuration
    Config,
}

fn main() -> ExitCode {
    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            let code = e.downcast_ref::<EtlError>().map_or(1, EtlError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let progress = ProgressContext::new();

    // Logging:
    //   TTY:     quiet (warn) unless --debug; the bar shows activity
    //   non-TTY: info unless --debug; progress lines are the only indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = is_tty && !cli.debug;
    wikirank_core::init_logging(Verbosity::from_flags(quiet, cli.debug), multi);

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Run(args) => cmd::run::run(args, &config, &progress),
        Command::Verify(args) => cmd::verify::run(args),
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let run = config.to_run_config();
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec!["Input", &run.input.display().to_string()]);
            table.add_row(vec!["Output directory", &run.output_dir.display().to_string()]);
            table.add_row(vec![
                "Columns",
                &format!(
                    "lang={}, title={}, page_id={}, quality={}",
                    run.columns.language,
                    run.columns.title,
                    run.columns.page_id,
                    run.columns.quality
                ),
            ]);
            table.add_row(vec!["NA values", &format!("{} markers", run.na_values.len())]);
            table.add_row(vec!["HQ threshold", &run.params.hq_threshold.to_string()]);
            table.add_row(vec!["Quality bin", &run.params.quality_bin_size.to_string()]);
            table.add_row(vec!["Title length bin", &run.params.title_len_bin_size.to_string()]);
            table.add_row(vec!["Top-K", &run.params.top_k.to_string()]);
            table.add_row(vec!["Chunk size", &run.params.chunk_size.to_string()]);
            table.add_row(vec![
                "Unknown language",
                run.params.unknown_language.as_deref().unwrap_or("dropped"),
            ]);
            table.add_row(vec![
                "Parquet",
                &if run.parquet {
                    format!("yes (zstd {})", run.zstd_level)
                } else {
                    "no".to_string()
                },
            ]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
