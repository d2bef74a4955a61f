//! CLI for the zic album downloader.

mod console;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use zic_core::cancel::CancelToken;
use zic_core::catalog::catalog_for;
use zic_core::config::{self, ConfigOverrides, ZicConfig};
use zic_core::jobs::{run_root, JobContext, RunReport};
use zic_core::logging;
use zic_core::transport::{CurlOptions, CurlTransport, Transport};

pub use console::ConsoleSink;

/// Exit status after Ctrl-C.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Download a whole album, or every album of an artist.
#[derive(Debug, Parser)]
#[command(name = "zic")]
#[command(about = "zic: resumable album and discography downloader", long_about = None)]
pub struct Cli {
    /// Album or artist page address.
    pub url: String,

    /// Files downloaded at the same time.
    #[arg(short = 'n', long, value_name = "N")]
    pub connections: Option<usize>,

    /// Connection and stall timeout, in seconds.
    #[arg(short = 't', long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Directory the album directories are created in.
    #[arg(short = 'p', long, default_value = ".")]
    pub path: PathBuf,

    /// SOCKS5 proxy.
    #[arg(short = 's', long, value_name = "HOST:PORT")]
    pub socks: Option<String>,

    /// Prefix album directories with the site's album id.
    #[arg(long)]
    pub with_album_id: bool,

    /// Log verbosity: 0, 1 or 2.
    #[arg(short = 'd', long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=2))]
    pub debug: u8,

    /// Give up on a file after N attempts (default: retry until interrupted).
    #[arg(long, value_name = "N")]
    pub max_file_attempts: Option<u32>,

    /// Config file to use instead of the default one.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            connections: self.connections,
            timeout_secs: self.timeout,
            socks_proxy: self.socks.clone(),
            with_album_id: self.with_album_id,
            file_attempt_limit: self.max_file_attempts,
        }
    }

    fn load_config(&self) -> Result<ZicConfig> {
        let mut cfg = match self.config {
            Some(ref path) => config::load_from_path(path)?,
            None => config::load_or_init()?,
        };
        cfg.apply_overrides(&self.overrides());
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Parse arguments, run, and return the process exit status.
pub async fn run_from_args() -> Result<i32> {
    let cli = Cli::parse();
    if logging::init_logging(cli.debug).is_err() {
        logging::init_logging_stderr(cli.debug);
    }
    let cfg = cli.load_config()?;
    tracing::debug!("loaded config: {:?}", cfg);
    if !cli.path.is_dir() {
        anyhow::bail!("{} is not a directory", cli.path.display());
    }

    let cancel = CancelToken::new();
    let transport: Arc<dyn Transport> = Arc::new(CurlTransport::new(CurlOptions::from_config(&cfg)));
    let catalog = catalog_for(&cli.url, Arc::clone(&transport), cancel.clone(), cfg.retry_policy())
        .with_context(|| format!("cannot download from {}", cli.url))?;

    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            eprintln!("Interrupted, stopping downloads (Ctrl-C again to quit now)");
            cancel.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(EXIT_INTERRUPTED);
            }
        })
    };

    let url = cli.url.clone();
    let base = cli.path.clone();
    let job_cancel = cancel.clone();
    let report = tokio::task::spawn_blocking(move || {
        let sink = ConsoleSink::new();
        let ctx = JobContext::new(transport.as_ref(), &catalog, &sink, &job_cancel, &cfg);
        run_root(&ctx, &url, &base)
    })
    .await
    .context("download thread failed")??;
    interrupt.abort();

    eprintln!("{}", summary(&report));
    Ok(exit_code(&report, cancel.is_cancelled()))
}

/// One line per album plus a total.
pub fn summary(report: &RunReport) -> String {
    let albums = report.albums();
    let mut out = String::new();
    for album in &albums {
        let name = album
            .directory
            .as_ref()
            .map(|d| d.display().to_string())
            .or_else(|| album.url.clone())
            .unwrap_or_default();
        out.push_str(&format!("{}: {}\n", name, album.verdict));
    }
    let complete = albums.iter().filter(|a| a.verdict.is_complete()).count();
    out.push_str(&format!("{} of {} albums complete", complete, albums.len()));
    out
}

/// Incomplete albums still exit 0; only an interruption changes the status.
pub fn exit_code(report: &RunReport, interrupted: bool) -> i32 {
    if interrupted || report.aborted() {
        EXIT_INTERRUPTED
    } else {
        0
    }
}
