//! Logger initialisation
//!
//! Log lines go to stdout and to the session's log file. Scenarios run on their own named
//! threads, so each line is tagged with the thread that emitted it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use fern;
use log::{self, info};
use std::{fmt, thread};
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level less than `INFO`, found `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// # Notes
///
/// - `min_level` must be greater than `log::Level::Info`.
///
/// # Safety
///
/// - This function must only be called once to prevent corrupting logs.
pub fn logger_init(
    min_level: self::LevelFilter,
    session: &session::Session,
) -> Result<(), LoggerInitError> {
    if min_level < log::Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level));
    }

    let log_file =
        fern::log_file(session.log_file_path.clone()).map_err(LoggerInitError::LogFileInitError)?;

    // Colour codes only go to the terminal, the log file stays plain text
    let stdout = fern::Dispatch::new()
        .format(|out, message, record| format_record(out, message, record, true))
        .chain(std::io::stdout());
    let file = fern::Dispatch::new()
        .format(|out, message, record| format_record(out, message, record, false))
        .chain(log_file);

    fern::Dispatch::new()
        .level(min_level)
        // Per-iteration solver traces swamp everything else
        .level_for("track_lib::ilqr::solver", min_level.min(LevelFilter::Debug))
        .chain(stdout)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Log level: {:?}", min_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Format one log line.
///
/// Debug and trace lines also carry the module path.
fn format_record(
    out: fern::FormatCallback,
    message: &fmt::Arguments,
    record: &log::Record,
    coloured: bool,
) {
    let prefix = line_prefix(record.level(), coloured);

    if record.level() > log::Level::Info {
        out.finish(format_args!("{} {}: {}", prefix, record.target(), message))
    } else {
        out.finish(format_args!("{} {}", prefix, message))
    }
}

/// The bracketed prefix of a log line: session time, level and the name of the emitting
/// thread, which is the scenario name for the simulation's worker threads.
fn line_prefix(level: log::Level, coloured: bool) -> String {
    let level = if coloured {
        level_to_str(level)
    } else {
        level_to_str(level).clear()
    };

    let thread = thread::current();

    format!(
        "[{:10.6} {} {}]",
        session::get_elapsed_seconds(),
        level,
        thread.name().unwrap_or("unnamed")
    )
}

/// Get the string representation of a log level
fn level_to_str(level: log::Level) -> ColoredString {
    match level {
        log::Level::Trace => "TRC".dimmed().italic(),
        log::Level::Debug => "DBG".dimmed(),
        log::Level::Info => "INF".normal(),
        log::Level::Warn => "WRN".yellow(),
        log::Level::Error => "ERR".red().bold(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_line_prefix() {
        let prefix = thread::Builder::new()
            .name("lqr_arc".into())
            .spawn(|| line_prefix(log::Level::Warn, false))
            .unwrap()
            .join()
            .unwrap();

        assert!(prefix.starts_with('['));
        assert!(prefix.ends_with("WRN lqr_arc]"));
        assert!(!prefix.contains('\u{1b}'));
    }
}
