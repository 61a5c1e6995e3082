//! Process-wide logger setup.

use env_logger::{Builder, Env, Target};
use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::Path,
};

/// The filter used when `RUST_LOG` isn't set.
pub const DEFAULT_FILTER: &str = "info";

/// Install the global logger, writing to stderr and, if `log_file` is
/// provided, appending to that file as well.
///
/// Call this once at startup.
pub fn init(log_file: Option<&Path>) -> Result<(), LoggingError> {
    let mut builder =
        Builder::from_env(Env::default().default_filter_or(DEFAULT_FILTER));

    if let Some(path) = log_file {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| {
                    LoggingError::LogFile {
                        path: path.display().to_string(),
                        source,
                    }
                })?;
            }
        }

        let file = open_log_file(path)?;
        builder.target(Target::Pipe(Box::new(Tee::new(io::stderr(), file))));
    }

    builder.try_init()?;

    Ok(())
}

fn open_log_file(path: &Path) -> Result<File, LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::LogFile {
            path: path.display().to_string(),
            source,
        })
}

/// A writer which copies everything to two other writers.
#[derive(Debug)]
pub struct Tee<A, B> {
    first: A,
    second: B,
}

impl<A, B> Tee<A, B> {
    pub fn new(first: A, second: B) -> Self { Tee { first, second } }

    #[cfg(test)]
    fn into_inner(self) -> (A, B) { (self.first, self.second) }
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.first.write_all(buf)?;
        self.second.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.first.flush()?;
        self.second.flush()
    }
}

/// Errors that may occur while setting up logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Unable to open the log file, \"{}\"", path)]
    LogFile {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("The logger was already initialized")]
    AlreadyInitialized(#[from] log::SetLoggerError),
}
