//! GitHub Actions workflow commands and the `log` backend built on them.
//!
//! The runner parses specially formatted stdout lines (`::warning::...`) into
//! annotations. [`WorkflowLogger`] routes `log` records through those
//! commands so library code only ever talks to the `log` facade.

use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Environment variable set by the runner when step debug logging is on.
pub const RUNNER_DEBUG_ENV: &str = "RUNNER_DEBUG";

/// Escape a message for use as workflow command data.
///
/// # Examples
///
/// ```
/// use qpm_action_common::workflow::escape_data;
///
/// assert_eq!(escape_data("50%\nnext"), "50%25%0Anext");
/// ```
#[must_use]
pub fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Format a workflow command line, e.g. `::error::message`.
#[must_use]
pub fn command_line(command: &str, message: &str) -> String {
    format!("::{command}::{}", escape_data(message))
}

/// Map a log level to the workflow command used to report it.
///
/// `Info` records are written as plain lines and therefore have no command.
#[must_use]
pub const fn command_for_level(level: Level) -> Option<&'static str> {
    match level {
        Level::Error => Some("error"),
        Level::Warn => Some("warning"),
        Level::Info => None,
        Level::Debug | Level::Trace => Some("debug"),
    }
}

/// Render a log record message as the line written to stdout.
#[must_use]
pub fn render(level: Level, message: &str) -> String {
    match command_for_level(level) {
        Some(command) => command_line(command, message),
        None => message.to_owned(),
    }
}

/// `log` backend emitting workflow commands to stdout.
pub struct WorkflowLogger {
    max_level: LevelFilter,
    out: Mutex<Box<dyn Write + Send>>,
}

impl WorkflowLogger {
    /// Create a logger writing to `out`.
    pub fn new(max_level: LevelFilter, out: Box<dyn Write + Send>) -> Self {
        Self {
            max_level,
            out: Mutex::new(out),
        }
    }

    /// Install a stdout logger as the global `log` backend.
    ///
    /// The level is `Debug` when the runner enables step debugging and
    /// `Info` otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if a global logger has already been installed.
    pub fn install() -> Result<(), log::SetLoggerError> {
        let debug = std::env::var(RUNNER_DEBUG_ENV).is_ok_and(|value| value == "1");
        let max_level = if debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };
        log::set_boxed_logger(Box::new(Self::new(max_level, Box::new(std::io::stdout()))))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

impl Log for WorkflowLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = render(record.level(), &record.args().to_string());
        if let Ok(mut out) = self.out.lock() {
            // A closed stdout leaves nowhere to report the failure.
            let _ = writeln!(out, "{line}");
        }
    }

    fn flush(&self) {
        if let Ok(mut out) = self.out.lock() {
            let _ = out.flush();
        }
    }
}

/// Write a workflow command directly, bypassing the `log` level filter.
pub fn issue(out: &mut dyn Write, command: &str, message: &str) {
    if writeln!(out, "{}", command_line(command, message)).is_err() {
        // Best-effort; the runner reads stdout.
    }
}

/// Ask the runner to mask `secret` in all subsequent log output.
pub fn add_mask(out: &mut dyn Write, secret: &str) {
    if !secret.is_empty() {
        issue(out, "add-mask", secret);
    }
}

/// Start a collapsible log group.
pub fn start_group(out: &mut dyn Write, title: &str) {
    issue(out, "group", title);
}

/// End the current log group.
pub fn end_group(out: &mut dyn Write) {
    if writeln!(out, "::endgroup::").is_err() {
        // Best-effort; the runner reads stdout.
    }
}

/// Append `line` to a runner file command such as `GITHUB_PATH`.
///
/// # Errors
///
/// Returns any I/O error raised while opening or writing the file.
pub fn append_file_command(file: &Path, line: &str) -> std::io::Result<()> {
    let mut handle = OpenOptions::new().create(true).append(true).open(file)?;
    writeln!(handle, "{line}")
}
