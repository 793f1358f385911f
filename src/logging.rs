use anyhow::{Context, Result};
use chrono::Local;
use env_logger::{Builder, Target, WriteStyle};
use log::{error, LevelFilter};
use std::fmt::Display;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub fn log_file_name(timestamp: &str) -> String {
    format!("redcap_processing_{}.log", timestamp)
}

/// Duplicates every log line to stderr and the run log file.
struct TeeWriter<W: Write> {
    file: W,
}

impl<W: Write> Write for TeeWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

/// Installs the global logger and returns the path of the run log.
/// `RUST_LOG` still overrides the level chosen here.
pub fn init(log_dir: &Path, timestamp: &str, verbose: bool) -> Result<PathBuf> {
    let path = log_dir.join(log_file_name(timestamp));
    let file = File::create(&path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;

    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .write_style(WriteStyle::Never)
        .target(Target::Pipe(Box::new(TeeWriter { file })))
        .try_init()
        .context("failed to install logger")?;

    Ok(path)
}

/// Writes a fatal error to the run log before it propagates to the caller.
pub fn report_failure<T, E: Display>(result: std::result::Result<T, E>) -> std::result::Result<T, E> {
    if let Err(e) = &result {
        error!("Run aborted: {}", e);
    }
    result
}
