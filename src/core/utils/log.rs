/*!
 * Copyright (c) 2016 Microsoft Corporation. All rights reserved.
 * Licensed under the MIT License. See LICENSE file in the project root for
 * license information.
 */

use std::cell::RefCell;

/// Logging levels. Higher values indicate more verbose logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Fatal error level - terminates the program
    Fatal = -1,
    /// Warning level - indicates potential issues
    Warning = 0,
    /// Information level - general information messages
    Info = 1,
    /// Debug level - detailed debugging information
    Debug = 2,
}

/// Type alias for logging callback functions.
pub type LogCallback = fn(&str);

thread_local! {
    static LOG_LEVEL: RefCell<LogLevel> = RefCell::new(LogLevel::Info);
    static LOG_CALLBACK: RefCell<Option<LogCallback>> = RefCell::new(None);
}

/// Central logging facility.
/// Provides thread-local log level configuration and callback support.
#[derive(Debug)]
pub struct Log;

impl Log {
    /// Sets the current thread's logging level.
    pub fn reset_log_level(level: LogLevel) {
        LOG_LEVEL.with(|l| *l.borrow_mut() = level);
    }

    /// Sets the logging callback function for the current thread.
    /// If None, logs go to stdout; if Some, logs go to the callback.
    pub fn reset_callback(callback: Option<LogCallback>) {
        LOG_CALLBACK.with(|c| *c.borrow_mut() = callback);
    }

    /// Logs a debug message if the current log level allows it.
    pub fn debug(message: &str) {
        Self::write(LogLevel::Debug, "Debug", message);
    }

    /// Logs an info message if the current log level allows it.
    pub fn info(message: &str) {
        Self::write(LogLevel::Info, "Info", message);
    }

    /// Logs a warning message if the current log level allows it.
    pub fn warning(message: &str) {
        Self::write(LogLevel::Warning, "Warning", message);
    }

    /// Logs a fatal error message and terminates via panic.
    pub fn fatal(message: &str) -> ! {
        eprintln!("[LightGBM] [Fatal] {}", message);
        panic!("{}", message);
    }

    fn write(level: LogLevel, level_str: &str, message: &str) {
        let current = LOG_LEVEL.with(|l| *l.borrow());
        if level > current {
            return;
        }
        let formatted = format!("[LightGBM] [{}] {}", level_str, message);
        let handled = LOG_CALLBACK.with(|c| {
            if let Some(cb) = *c.borrow() {
                cb(&formatted);
                true
            } else {
                false
            }
        });
        if !handled {
            println!("{}", formatted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Fatal < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Debug);
    }

    #[test]
    #[should_panic(expected = "boom")]
    fn test_fatal_panics() {
        Log::fatal("boom");
    }
}
