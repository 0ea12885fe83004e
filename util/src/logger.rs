//! Generic logger utility functions
//!
//! The logger is process-wide state. It is initialised once per execution with
//! [`logger_init`], repeated initialisation is a no-op, and it can be flushed
//! and silenced with [`logger_shutdown`]. Nothing in the control libraries
//! depends on the logger having been initialised.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use conquer_once::OnceCell;
use fern;
use log::{self, debug, info};
use std::{path::Path, sync::Mutex};
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

/// Set once the logger has been installed, holding the level it was installed
/// with.
static LOGGER_LEVEL: OnceCell<LevelFilter> = OnceCell::uninit();

/// Held for the whole of initialisation so concurrent calls install the logger
/// once.
static INIT_LOCK: Mutex<()> = Mutex::new(());

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Cannot log with level `Off`, use logger_shutdown to silence the logger")]
    InvalidMinLogLevel,

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
/// Output goes to both stdout and the session's log file.
///
/// # Notes
///
/// - `min_level` must not be `LevelFilter::Off`.
/// - Calling this function more than once is allowed, from any thread, only
///   the first call installs the logger.
pub fn logger_init(
    min_level: self::LevelFilter,
    session: &session::Session,
) -> Result<(), LoggerInitError> {
    install(min_level, &session.log_file_path)
}

/// Flush any buffered log output and silence the logger.
///
/// After this call all log macros become no-ops for the rest of the execution.
pub fn logger_shutdown() {
    if LOGGER_LEVEL.get().is_some() {
        info!("Logger shutting down");
    }
    log::logger().flush();
    log::set_max_level(LevelFilter::Off);
}

/// Returns true if the logger has been initialised.
pub fn logger_is_init() -> bool {
    LOGGER_LEVEL.get().is_some()
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Install the logger, writing to stdout and the given log file.
fn install(min_level: LevelFilter, log_file_path: &Path) -> Result<(), LoggerInitError> {
    if min_level == LevelFilter::Off {
        return Err(LoggerInitError::InvalidMinLogLevel);
    }

    let _init = INIT_LOCK.lock().unwrap_or_else(|e| e.into_inner());

    // If already initialised there's nothing to do
    if let Some(level) = LOGGER_LEVEL.get() {
        debug!("Logger already initialised at level {:?}", level);
        return Ok(());
    }

    let log_file = fern::log_file(log_file_path)
        .map_err(LoggerInitError::LogFileInitError)?;

    // Setup the logger using fern's builder pattern
    fern::Dispatch::new()
        .format(|out, message, record| {
            // If debug or trace include the target, otherwise don't include it
            if record.level() > log::Level::Info {
                out.finish(format_args!(
                    "[{:10.6} {}] {}: {}",
                    session::get_elapsed_seconds(),
                    level_to_str(record.level()),
                    record.target(),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "[{:10.6} {}] {}",
                    session::get_elapsed_seconds(),
                    level_to_str(record.level()),
                    message
                ))
            }
        })
        .level(min_level)
        .chain(std::io::stdout())
        .chain(log_file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    // Set under the init lock, so this can't already be set
    LOGGER_LEVEL.try_init_once(|| min_level).ok();

    info!("Logging initialised");
    info!("    Log level: {:?}", min_level);
    info!("    Log file path: {:?}", log_file_path);

    Ok(())
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

    // The logger is global, so everything touching it is in one test
    #[test]
    fn test_init_and_shutdown() {
        assert!(!logger_is_init());
        logger_shutdown();
        assert_eq!(log::max_level(), LevelFilter::Off);

        let log_file_path =
            std::env::temp_dir().join(format!("util_logger_test_{}.log", std::process::id()));

        assert!(matches!(
            install(LevelFilter::Off, &log_file_path),
            Err(LoggerInitError::InvalidMinLogLevel)
        ));

        // Every concurrent call succeeds, only one installs the logger
        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| install(LevelFilter::Debug, &log_file_path)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(results.iter().all(|r| r.is_ok()));
        assert!(logger_is_init());
        assert_eq!(LOGGER_LEVEL.get(), Some(&LevelFilter::Debug));

        logger_shutdown();
        assert_eq!(log::max_level(), LevelFilter::Off);

        std::fs::remove_file(&log_file_path).ok();
    }
}
