//! Diagnostics sink shared by all pipeline components
//!
//! Every component receives a `Logger` at construction; nothing logs
//! through globals. The console sink colors warnings and errors, the file
//! sink timestamps each line.

use colored::Colorize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Destination for diagnostics.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

/// Cloneable handle wrapping the configured sink.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
}

impl Logger {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    /// Logger that discards everything; used in tests.
    pub fn null() -> Self {
        Self {
            sink: Arc::new(NullSink),
        }
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        self.sink.log(LogLevel::Debug, message.as_ref());
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.sink.log(LogLevel::Info, message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.sink.log(LogLevel::Warn, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.sink.log(LogLevel::Error, message.as_ref());
    }
}

/// Colored stderr sink for the CLI.
pub struct ConsoleSink {
    verbose: bool,
}

impl ConsoleSink {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl LogSink for ConsoleSink {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => {
                if self.verbose {
                    eprintln!("{} {}", "debug:".dimmed(), message.dimmed());
                }
            }
            LogLevel::Info => eprintln!("{}", message),
            LogLevel::Warn => eprintln!("{} {}", "warning:".yellow().bold(), message),
            LogLevel::Error => eprintln!("{} {}", "error:".red().bold(), message),
        }
    }
}

/// File sink with timestamped lines.
pub struct FileSink {
    file: Mutex<File>,
}

impl FileSink {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl LogSink for FileSink {
    fn log(&self, level: LogLevel, message: &str) {
        if let Ok(mut file) = self.file.lock() {
            let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            let _ = writeln!(file, "[{}] {} {}", timestamp, level.as_str(), message);
            let _ = file.flush();
        }
    }
}

/// Sink that drops every message.
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _level: LogLevel, _message: &str) {}
}

/// Sink that records messages in memory; used by tests asserting on
/// emitted warnings.
#[derive(Default)]
pub struct MemorySink {
    messages: Mutex<Vec<(LogLevel, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(LogLevel, String)> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.messages()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }

    pub fn count(&self, level: LogLevel, needle: &str) -> usize {
        self.messages()
            .iter()
            .filter(|(l, m)| *l == level && m.contains(needle))
            .count()
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: LogLevel, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push((level, message.to_string()));
        }
    }
}
