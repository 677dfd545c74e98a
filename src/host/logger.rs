// src/host/logger.rs

//! Host logger contract and implementations

use std::sync::Mutex;
use strum_macros::Display;
use tracing::{debug, error, info};

/// Severity/category of a host log message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LogLevel {
    /// A failure the user must see
    Error,
    /// Outcome of a user-requested operation
    Operation,
    /// Per-library progress within an operation
    Task,
    /// Low-importance status chatter
    Status,
}

/// Sink for user-visible messages
pub trait Logger: Send + Sync {
    fn log(&self, message: &str, level: LogLevel);
}

/// Terminal logger used by the CLI
///
/// Errors go to stderr and operation results to stdout. Task and status
/// messages are only shown when `verbose` is set; everything is mirrored to
/// `tracing`.
#[derive(Debug, Default)]
pub struct ConsoleLogger {
    verbose: bool,
}

impl ConsoleLogger {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, message: &str, level: LogLevel) {
        match level {
            LogLevel::Error => {
                error!("{}", message);
                eprintln!("{message}");
            }
            LogLevel::Operation => {
                info!("{}", message);
                println!("{message}");
            }
            LogLevel::Task => {
                info!("{}", message);
                if self.verbose {
                    println!("{message}");
                }
            }
            LogLevel::Status => {
                debug!("{}", message);
                if self.verbose {
                    println!("{message}");
                }
            }
        }
    }
}

/// Logger that records messages in memory
#[derive(Debug, Default)]
pub struct MemoryLogger {
    messages: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded messages
    pub fn messages(&self) -> Vec<(LogLevel, String)> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    /// Recorded messages at one level
    pub fn messages_at(&self, level: LogLevel) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }
}

impl Logger for MemoryLogger {
    fn log(&self, message: &str, level: LogLevel) {
        debug!("[{}] {}", level, message);
        if let Ok(mut messages) = self.messages.lock() {
            messages.push((level, message.to_string()));
        }
    }
}
