//! External command execution and the QPM commands the action runs.
//!
//! Output is captured, stripped of ANSI colour codes, and echoed line by
//! line to the workflow log. Every command is bounded by a timeout.

use crate::error::{ActionError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use qpm_action_common::strip_ansi;
use std::io::Read;
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Default bound on a single command (30 minutes).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Marker preceding the cache directory in `qpm cache path` output.
pub const CACHE_PATH_MARKER: &str = "Config path is:";

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs a command with arguments and returns the captured output.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised while spawning the command, or
    /// [`ActionError::ProcessTimedOut`] if it does not finish in time.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use qpm_action::process::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor::new(None);
    /// let output = executor.run("qpm", &["--version"])?;
    /// assert!(output.status.success());
    /// # Ok::<(), qpm_action::error::ActionError>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone)]
pub struct SystemCommandExecutor {
    working_dir: Option<Utf8PathBuf>,
    timeout: Duration,
}

impl SystemCommandExecutor {
    /// Run commands in `working_dir`, or the current directory.
    #[must_use]
    pub fn new(working_dir: Option<Utf8PathBuf>) -> Self {
        Self {
            working_dir,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-command timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        let mut command = Command::new(cmd);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir.as_std_path());
        }

        let mut child = command.spawn()?;
        // Pipes are read on their own threads while the child runs.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        match child.wait_timeout(self.timeout)? {
            Some(status) => Ok(Output {
                status,
                stdout: collect(stdout)?,
                stderr: collect(stderr)?,
            }),
            None => {
                let _ = child.kill();
                let _ = child.wait();
                Err(ActionError::ProcessTimedOut {
                    program: cmd.to_owned(),
                    seconds: self.timeout.as_secs(),
                })
            }
        }
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        pipe.read_to_end(&mut buffer)?;
        Ok(buffer)
    })
}

fn collect(handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>) -> Result<Vec<u8>> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| ActionError::Io(std::io::Error::other("output reader panicked")))?
            .map_err(ActionError::from),
        None => Ok(Vec::new()),
    }
}

/// Run a command, echo its output, and fail on a non-zero exit.
///
/// Arguments equal to an entry of `secrets` are shown as `***` in logs and
/// errors. Returns stdout with ANSI escapes removed.
///
/// # Errors
///
/// Returns [`ActionError::ProcessFailed`] if the command exits unsuccessfully.
pub fn run_checked(
    executor: &dyn CommandExecutor,
    program: &str,
    args: &[&str],
    secrets: &[&str],
) -> Result<String> {
    let shown = args
        .iter()
        .map(|arg| {
            if !arg.is_empty() && secrets.contains(arg) {
                "***"
            } else {
                *arg
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    info!("running {program} {shown}");

    let output = executor.run(program, args)?;
    let stdout = strip_ansi(&String::from_utf8_lossy(&output.stdout)).into_owned();
    let stderr = strip_ansi(&String::from_utf8_lossy(&output.stderr)).into_owned();
    for line in stdout.lines().chain(stderr.lines()) {
        info!("{line}");
    }

    if !output.status.success() {
        return Err(ActionError::ProcessFailed {
            program: program.to_owned(),
            args: shown,
            status: output.status.to_string(),
            stderr: stderr.trim().to_owned(),
        });
    }
    Ok(stdout)
}

/// Extract the directory from `qpm cache path` output.
///
/// # Examples
///
/// ```
/// use qpm_action::process::parse_cache_path;
///
/// let output = "Config path is: /home/runner/.local/share/QPM-RS/cache\n";
/// assert_eq!(
///     parse_cache_path(output).map(|p| p.to_string()),
///     Some("/home/runner/.local/share/QPM-RS/cache".to_owned())
/// );
/// ```
#[must_use]
pub fn parse_cache_path(output: &str) -> Option<Utf8PathBuf> {
    output.lines().find_map(|line| {
        let (_, rest) = line.split_once(CACHE_PATH_MARKER)?;
        let path = rest.trim();
        (!path.is_empty()).then(|| Utf8PathBuf::from(path))
    })
}

/// The QPM commands the action invokes.
pub struct Qpm<'a> {
    program: Utf8PathBuf,
    executor: &'a dyn CommandExecutor,
}

impl<'a> Qpm<'a> {
    /// Drive the QPM executable at `program` through `executor`.
    #[must_use]
    pub fn new(program: &Utf8Path, executor: &'a dyn CommandExecutor) -> Self {
        Self {
            program: program.to_owned(),
            executor,
        }
    }

    /// `qpm restore`.
    ///
    /// # Errors
    ///
    /// Returns an error if QPM fails.
    pub fn restore(&self) -> Result<()> {
        run_checked(self.executor, self.program.as_str(), &["restore"], &[])?;
        Ok(())
    }

    /// `qpm cache path`, parsed.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::CachePathNotReported`] if the output has no
    /// path line.
    pub fn cache_path(&self) -> Result<Utf8PathBuf> {
        let stdout = run_checked(self.executor, self.program.as_str(), &["cache", "path"], &[])?;
        let path = parse_cache_path(&stdout).ok_or(ActionError::CachePathNotReported)?;
        debug!("QPM cache directory is {path}");
        Ok(path)
    }

    /// `qpm publish <token>`.
    ///
    /// # Errors
    ///
    /// Returns an error if QPM fails.
    pub fn publish(&self, token: &str) -> Result<()> {
        run_checked(
            self.executor,
            self.program.as_str(),
            &["publish", token],
            &[token],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ExpectedCall, StubExecutor, failure_output, output_with_stdout};
    use rstest::rstest;

    #[rstest]
    #[case::plain("Config path is: /tmp/qpm\n", Some("/tmp/qpm"))]
    #[case::after_noise("loading\nConfig path is:   C:\\qpm\\cache  \n", Some("C:\\qpm\\cache"))]
    #[case::missing("nothing here", None)]
    #[case::empty_path("Config path is:", None)]
    fn parses_cache_path(#[case] output: &str, #[case] expected: Option<&str>) {
        assert_eq!(
            parse_cache_path(output).as_ref().map(|path| path.as_str()),
            expected
        );
    }

    #[test]
    fn cache_path_strips_colour_before_parsing() {
        let executor = StubExecutor::new(vec![ExpectedCall {
            cmd: "qpm",
            args: vec!["cache", "path"],
            result: Ok(output_with_stdout("\u{1b}[32mConfig path is: /tmp/qpm\u{1b}[0m\n")),
        }]);
        let qpm = Qpm::new(Utf8Path::new("qpm"), &executor);

        assert_eq!(qpm.cache_path().expect("path"), Utf8PathBuf::from("/tmp/qpm"));
        executor.assert_finished();
    }

    #[test]
    fn missing_cache_path_is_an_error() {
        let executor = StubExecutor::new(vec![ExpectedCall {
            cmd: "qpm",
            args: vec!["cache", "path"],
            result: Ok(output_with_stdout("unexpected\n")),
        }]);
        let qpm = Qpm::new(Utf8Path::new("qpm"), &executor);

        assert!(matches!(
            qpm.cache_path(),
            Err(ActionError::CachePathNotReported)
        ));
    }

    #[test]
    fn failed_publish_hides_token() {
        let executor = StubExecutor::new(vec![ExpectedCall {
            cmd: "qpm",
            args: vec!["publish", "s3cret"],
            result: Ok(failure_output("\u{1b}[31mpublish rejected\u{1b}[0m")),
        }]);
        let qpm = Qpm::new(Utf8Path::new("qpm"), &executor);

        let err = qpm.publish("s3cret").expect_err("publish fails");
        let message = err.to_string();
        assert!(message.contains("publish ***"), "{message}");
        assert!(message.contains("publish rejected"), "{message}");
        assert!(!message.contains("s3cret"));
        assert!(!message.contains('\u{1b}'));
    }

    #[test]
    fn empty_token_is_passed_through() {
        let executor = StubExecutor::new(vec![ExpectedCall {
            cmd: "qpm",
            args: vec!["publish", ""],
            result: Ok(output_with_stdout("")),
        }]);
        Qpm::new(Utf8Path::new("qpm"), &executor)
            .publish("")
            .expect("publish");
        executor.assert_finished();
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_captures_output() {
        let output = SystemCommandExecutor::new(None)
            .run("sh", &["-c", "echo out; echo err >&2; exit 3"])
            .expect("spawn sh");
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(String::from_utf8_lossy(&output.stdout), "out\n");
        assert_eq!(String::from_utf8_lossy(&output.stderr), "err\n");
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_enforces_timeout() {
        let result = SystemCommandExecutor::new(None)
            .with_timeout(Duration::from_millis(100))
            .run("sleep", &["5"]);
        assert!(matches!(
            result,
            Err(ActionError::ProcessTimedOut { ref program, .. }) if program == "sleep"
        ));
    }

    #[test]
    fn missing_program_is_an_io_error() {
        let result = SystemCommandExecutor::new(None).run("qpm-action-no-such-program", &[]);
        assert!(matches!(result, Err(ActionError::Io(_))));
    }
}
