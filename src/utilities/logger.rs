//! Channel-backed async logger.
//!
//! A background task receives log records over an mpsc channel and appends
//! them to a file, so tick bodies and side-effect tasks never block on disk.
//! The global `LOGGER` handle in `global_var` forwards to whatever logger was
//! installed into `LOGGER_CELL` at startup.

use crate::err::Result;
use crate::global_var::{DEBUG_MODE, LOGGER_CELL};
use std::fmt;
use std::ops::Deref;
use std::path::Path;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Clone, Copy, Debug)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Sending half of the logger. Cloning creates another handle to the same
/// background writer.
#[derive(Clone, Debug)]
pub struct AsyncLogger {
    tx: mpsc::Sender<LogRecord>,
}

impl AsyncLogger {
    fn log<S: Into<String>>(&self, level: LogLevel, msg: S) {
        let str_msg = msg.into();
        if *DEBUG_MODE {
            println!("{}: {}", level, &str_msg);
        }
        if let Err(err) = self.tx.try_send(LogRecord::new(level, str_msg)) {
            eprintln!("Failed to send log message: {}", err);
        }
    }

    /// Ask the writer task to flush and exit.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(LogRecord::Shutdown).await;
    }

    pub fn trace<S: Into<String>>(&self, msg: S) {
        self.log(LogLevel::Trace, msg);
    }
    pub fn debug<S: Into<String>>(&self, msg: S) {
        if *DEBUG_MODE {
            self.log(LogLevel::Debug, msg);
        }
    }
    pub fn info<S: Into<String>>(&self, msg: S) {
        self.log(LogLevel::Info, msg);
    }
    pub fn warn<S: Into<String>>(&self, msg: S) {
        self.log(LogLevel::Warn, msg);
    }
    pub fn error<S: Into<String>>(&self, msg: S) {
        self.log(LogLevel::Error, msg);
    }
}

#[derive(Debug)]
enum LogRecord {
    Message {
        level: LogLevel,
        msg: String,
        at: chrono::DateTime<chrono::Utc>,
    },
    Shutdown,
}

impl LogRecord {
    fn new(level: LogLevel, msg: String) -> Self {
        Self::Message {
            level,
            msg,
            at: chrono::Utc::now(),
        }
    }

    fn format_line(&self) -> Option<String> {
        match self {
            LogRecord::Message { level, msg, at } => Some(format!(
                "{} [{}] {}\n",
                at.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                level,
                msg
            )),
            LogRecord::Shutdown => None,
        }
    }
}

/// Open `path` for appending and spawn the writer task. Returns the logger
/// handle and the task handle; dropping the last handle closes the channel
/// and lets the task flush and exit.
pub async fn init_file_logger<P: AsRef<Path>>(path: P) -> Result<(AsyncLogger, JoinHandle<()>)> {
    // Keep the path so the writer can reopen the file after a write error.
    let path_buf = path.as_ref().to_path_buf();

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path_buf)
        .await?;

    let (tx, mut rx) = mpsc::channel::<LogRecord>(1024);
    let mut writer = BufWriter::new(file);

    let task = tokio::spawn(async move {
        while let Some(rec) = rx.recv().await {
            match rec {
                LogRecord::Message { .. } => {
                    let Some(line) = rec.format_line() else {
                        continue;
                    };
                    if writer.write_all(line.as_bytes()).await.is_err() {
                        // Flush, reopen, retry the line once; drop it if the
                        // file stays unwritable.
                        let _ = writer.flush().await;
                        match OpenOptions::new()
                            .create(true)
                            .append(true)
                            .open(&path_buf)
                            .await
                        {
                            Ok(new_file) => {
                                writer = BufWriter::new(new_file);
                                let _ = writer.write_all(line.as_bytes()).await;
                            }
                            Err(_) => {
                                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                            }
                        }
                    }
                }
                LogRecord::Shutdown => {
                    break;
                }
            }
        }
        let _ = writer.flush().await;
    });

    Ok((AsyncLogger { tx }, task))
}

pub(crate) struct Logger;

impl Deref for Logger {
    type Target = AsyncLogger;
    fn deref(&self) -> &Self::Target {
        if let Some(l) = LOGGER_CELL.get() {
            return l;
        }
        #[cfg(test)]
        {
            // Unit tests may hit LOGGER before anything installed a real
            // logger; fall back to a handle whose receiver is leaked so the
            // sends go nowhere instead of panicking.
            let _ = LOGGER_CELL.set(test_fallback_logger());
            return LOGGER_CELL
                .get()
                .expect("LOGGER_CELL should be set by test fallback");
        }
        LOGGER_CELL.get().expect("LOGGER_CELL should be set")
    }
}

#[cfg(test)]
fn test_fallback_logger() -> AsyncLogger {
    let (tx, rx) = mpsc::channel::<LogRecord>(1024);
    let _ = Box::leak(Box::new(rx));
    AsyncLogger { tx }
}
