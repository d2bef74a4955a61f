//! Log setup: `zic.log` under the XDG state dir, or stderr when that fails.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Default filter for a `--debug` level (0, 1 or 2). `RUST_LOG` still wins.
pub fn default_filter(debug: u8) -> &'static str {
    match debug {
        0 => "info,zic=info,zic_core=info",
        1 => "info,zic=debug,zic_core=debug",
        _ => "debug,zic=trace,zic_core=trace",
    }
}

fn env_filter(debug: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(debug)))
}

/// `$XDG_STATE_HOME/zic/zic.log`.
pub fn log_file_path() -> Result<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix("zic")?;
    Ok(dirs.get_state_home().join("zic.log"))
}

/// Hands each event a clone of the log file handle; a failed clone degrades
/// to stderr for that event.
struct LogFile(File);

enum LogSink {
    File(File),
    Stderr,
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            LogSink::File(f) => f.write(buf),
            LogSink::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            LogSink::File(f) => f.flush(),
            LogSink::Stderr => io::stderr().lock().flush(),
        }
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogSink;

    fn make_writer(&'a self) -> Self::Writer {
        match self.0.try_clone() {
            Ok(f) => LogSink::File(f),
            Err(_) => LogSink::Stderr,
        }
    }
}

/// Log to the state-dir file at the verbosity of `debug`. Errors when the
/// file cannot be opened so the caller can use [`init_logging_stderr`].
pub fn init_logging(debug: u8) -> Result<()> {
    let path = log_file_path()?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(debug))
        .with_writer(LogFile(file))
        .with_ansi(false)
        .with_thread_names(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    tracing::info!("zic {} logging to {}", env!("CARGO_PKG_VERSION"), path.display());
    Ok(())
}

/// Stderr-only logging.
pub fn init_logging_stderr(debug: u8) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(debug))
        .with_writer(io::stderr)
        .with_ansi(false)
        .try_init();
}
