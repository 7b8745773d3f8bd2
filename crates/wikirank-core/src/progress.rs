//! Progress reporting for TTY and non-TTY environments.
//!
//! TTY mode: one byte-based bar over the input file.
//! Non-TTY mode: periodic `log::info!` lines only.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Log a progress line on the first chunk and then every N chunks
pub const LOG_EVERY_CHUNKS: usize = 10;

fn bytes_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:<10.dim} {bar:30.green/dim} {binary_bytes:>7}/{binary_total_bytes:7} {eta:>4} {wide_msg:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("--")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {prefix:<10.cyan.bold} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Owns the terminal progress display for one run.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Create new context, detecting TTY automatically.
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty: std::io::stderr().is_terminal(),
        }
    }

    /// Context that never draws; for tests and library callers.
    pub fn hidden() -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty: false,
        }
    }

    /// Bar over the input file. Falls back to a spinner when the size is unknown.
    pub fn input_bar(&self, total_bytes: Option<u64>) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = match total_bytes {
            Some(total) => {
                let pb = self.multi.add(ProgressBar::new(total));
                pb.set_style(bytes_style());
                pb
            }
            None => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(spinner_style());
                pb.enable_steady_tick(Duration::from_millis(80));
                pb
            }
        };
        pb.set_prefix("input");
        pb
    }

    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// Get reference to `MultiProgress` for log bridge.
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-chunk progress tracker feeding both the bar and the log.
pub struct ChunkProgress {
    pb: ProgressBar,
    start: Instant,
}

impl ChunkProgress {
    pub fn new(pb: ProgressBar) -> Self {
        Self {
            pb,
            start: Instant::now(),
        }
    }

    pub fn hidden() -> Self {
        Self::new(ProgressBar::hidden())
    }

    /// Record a finished chunk. `chunk_idx` is 1-based.
    pub fn chunk_done(
        &self,
        chunk_idx: usize,
        rows_total: u64,
        bytes_read: Option<u64>,
        sink_bytes: u64,
    ) {
        if let Some(pos) = bytes_read {
            self.pb.set_position(pos);
        }
        self.pb.set_message(format!("{} rows", fmt_num(rows_total)));

        if should_log(chunk_idx) {
            log::info!(
                "[progress] chunk={} rows={} elapsed_s={} jsonl_mb={:.1}",
                chunk_idx,
                rows_total,
                self.start.elapsed().as_secs(),
                bytes_to_mb(sink_bytes)
            );
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

fn should_log(chunk_idx: usize) -> bool {
    chunk_idx == 1 || chunk_idx % LOG_EVERY_CHUNKS == 0
}

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}

/// Format number with thousand separators.
pub fn fmt_num(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
