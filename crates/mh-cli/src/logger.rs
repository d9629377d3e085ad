use crate::error::{CliError, Result as CliErrorResult};

use mh_config::LogLevel;

use std::fs::OpenOptions;
use std::path::Path;
use std::time::SystemTime;

use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{Record, debug};

/// Install the global logger.
///
/// Without a file, lines go to stderr so PIN prompts and command output on
/// stdout stay readable. Colors only apply to the terminal.
pub fn initialize(level: LogLevel, log_file: Option<&Path>, colored: bool) -> CliErrorResult<()> {
    let dispatch = Dispatch::new().level(*level);

    let dispatch = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    CliError::logger(format!("cannot open log file {}: {e}", path.display()))
                })?;

            dispatch
                .format(|out, message, record| {
                    write_line(out, message, record, record.level().to_string());
                })
                .chain(file)
        }
        None if colored => {
            let colors = ColoredLevelConfig::new()
                .debug(Color::Blue)
                .info(Color::Green)
                .warn(Color::Yellow)
                .error(Color::Red);

            dispatch
                .format(move |out, message, record| {
                    write_line(out, message, record, colors.color(record.level()).to_string());
                })
                .chain(std::io::stderr())
        }
        None => dispatch
            .format(|out, message, record| {
                write_line(out, message, record, record.level().to_string());
            })
            .chain(std::io::stderr()),
    };

    dispatch
        .apply()
        .map_err(|e| CliError::logger(format!("logger already installed: {e}")))?;

    debug!(
        "Logging at {} to {}",
        *level,
        log_file.map_or_else(|| String::from("stderr"), |p| p.display().to_string())
    );
    Ok(())
}

fn write_line(
    out: FormatCallback<'_>,
    message: &std::fmt::Arguments<'_>,
    record: &Record<'_>,
    level: String,
) {
    out.finish(format_args!(
        "[{} - {}] {} [{}]",
        humantime::format_rfc3339(SystemTime::now()),
        level,
        message,
        record.target(),
    ))
}
