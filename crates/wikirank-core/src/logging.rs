//! Logging setup: env_logger, routed through indicatif when bars are live

use indicatif::MultiProgress;

/// Log level chosen from CLI flags; `RUST_LOG` still wins when set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Debug,
}

impl Verbosity {
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if debug {
            Self::Debug
        } else if quiet {
            Self::Quiet
        } else {
            Self::Normal
        }
    }

    fn filter(self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Normal => "info",
            Self::Debug => "debug",
        }
    }
}

fn level_label(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    }
}

fn level_color(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[36m",
        log::Level::Trace => "\x1b[35m",
    }
}

/// Prints above the progress bars instead of through them.
pub struct ProgressAwareLogger {
    inner: env_logger::Logger,
    multi: MultiProgress,
}

impl log::Log for ProgressAwareLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !self.inner.matches(record) {
            return;
        }
        let line = format!(
            "[{}{}\x1b[0m] {}",
            level_color(record.level()),
            level_label(record.level()),
            record.args()
        );
        self.multi.suspend(|| eprintln!("{line}"));
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Install the global logger. Call once, before any work starts.
///
/// With `multi`, output goes through the progress bars' terminal handle;
/// without it, plain uncolored lines suitable for log files.
pub fn init_logging(verbosity: Verbosity, multi: Option<&MultiProgress>) {
    use std::io::Write;

    let env = env_logger::Env::default().default_filter_or(verbosity.filter());

    let Some(multi) = multi else {
        env_logger::Builder::from_env(env)
            .format(|buf, record| {
                writeln!(buf, "[{}] {}", level_label(record.level()), record.args())
            })
            .init();
        return;
    };

    let inner = env_logger::Builder::from_env(env).build();
    let max_level = inner.filter();
    let logger = ProgressAwareLogger {
        inner,
        multi: multi.clone(),
    };
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(max_level);
    }
}
