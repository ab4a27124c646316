//! CLI argument definitions for the QPM action.
//!
//! Every action input is both a `--flag` and an `INPUT_<NAME>` environment
//! variable, which is how the Actions runner passes `with:` values. The
//! binary is invoked once per lifecycle step (`main`, then `post`).

use clap::{ArgAction, Args, Parser, Subcommand};

/// Install QPM, restore dependencies, and publish QPM packages.
#[derive(Parser, Debug)]
#[command(name = "qpm-action")]
#[command(version, about)]
#[command(disable_version_flag = true)]
#[command(after_help = concat!(
    "Inputs may also be given as INPUT_<NAME> environment variables, e.g.\n",
    "INPUT_WORKFLOW_TOKEN or INPUT_QPM_RELEASE_BIN.\n\n",
    "EXAMPLES:\n",
    "  Install QPM and restore dependencies:\n",
    "    $ qpm-action --workflow-token \"$GITHUB_TOKEN\"\n\n",
    "  Publish after the build (post step):\n",
    "    $ qpm-action post --publish true --qpm-release-bin true",
))]
pub struct Cli {
    /// Lifecycle step to run.
    #[command(subcommand)]
    pub command: Option<Step>,

    /// Action inputs.
    #[command(flatten)]
    pub inputs: Inputs,
}

impl Cli {
    /// The requested step; `main` when none is given.
    #[must_use]
    pub fn step(&self) -> Step {
        self.command.unwrap_or(Step::Main)
    }
}

/// Action lifecycle steps.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Install QPM and restore dependencies (default).
    Main,
    /// Publish after the job's build steps.
    Post,
}

/// Action inputs.
#[derive(Args, Debug, Clone, Default)]
pub struct Inputs {
    /// Token for GitHub API calls and artifact downloads.
    #[arg(long, global = true, env = "INPUT_WORKFLOW_TOKEN", hide_env_values = true)]
    pub workflow_token: Option<String>,

    /// Publish the package.
    #[arg(long, global = true, env = "INPUT_PUBLISH", action = ArgAction::Set, value_parser = parse_flag, default_value = "false")]
    pub publish: bool,

    /// Publish during the main step instead of the post step.
    #[arg(long, global = true, env = "INPUT_EAGER_PUBLISH", action = ArgAction::Set, value_parser = parse_flag, default_value = "false")]
    pub eager_publish: bool,

    /// Version written to the manifests; defaults to qpm.shared.json's.
    #[arg(long, global = true, env = "INPUT_VERSION")]
    pub version: Option<String>,

    /// Release tag; defaults to the version.
    #[arg(long, global = true, env = "INPUT_TAG")]
    pub tag: Option<String>,

    /// Token passed to `qpm publish`.
    #[arg(long, global = true, env = "INPUT_PUBLISH_TOKEN", hide_env_values = true)]
    pub publish_token: Option<String>,

    /// Release binary: `true` for build/<name>, a path, or `false`.
    #[arg(long, global = true, env = "INPUT_QPM_RELEASE_BIN")]
    pub qpm_release_bin: Option<String>,

    /// Debug binary: `true` for build/debug/<name>, a path, or `false`.
    #[arg(long, global = true, env = "INPUT_QPM_DEBUG_BIN")]
    pub qpm_debug_bin: Option<String>,

    /// Mod archive: `true` for build/<id>.qmod, a path, or `false`.
    #[arg(long, global = true, env = "INPUT_QPM_QMOD")]
    pub qpm_qmod: Option<String>,

    /// Restore and save the QPM dependency cache.
    #[arg(long, global = true, env = "INPUT_CACHE", action = ArgAction::Set, value_parser = parse_flag, default_value = "true")]
    pub cache: bool,

    /// Key the dependency cache on qpm.shared.json.
    #[arg(long, global = true, env = "INPUT_CACHE_LOCKFILE", action = ArgAction::Set, value_parser = parse_flag, default_value = "true")]
    pub cache_lockfile: bool,

    /// Run `qpm restore`.
    #[arg(long, global = true, env = "INPUT_RESTORE", action = ArgAction::Set, value_parser = parse_flag, default_value = "true")]
    pub restore: bool,

    /// Semver range of the QPM release to install (implies release mode).
    #[arg(long, global = true, env = "INPUT_QPM_VERSION")]
    pub qpm_version: Option<String>,

    /// Branch or commit of QPM CI builds to install.
    #[arg(long, global = true, env = "INPUT_QPM_REF")]
    pub qpm_ref: Option<String>,

    /// Install QPM from releases instead of CI artifacts.
    #[arg(long, global = true, env = "INPUT_QPM_RELEASE", action = ArgAction::Set, value_parser = parse_flag, default_value = "false")]
    pub qpm_release: bool,

    /// Directory holding dependency cache archives.
    #[arg(long, global = true, env = "INPUT_CACHE_ROOT")]
    pub cache_root: Option<String>,
}

/// Parse a boolean input. An empty value is `false`.
///
/// # Errors
///
/// Returns a message naming the accepted spellings for anything else.
///
/// # Examples
///
/// ```
/// use qpm_action::cli::parse_flag;
///
/// assert_eq!(parse_flag("True"), Ok(true));
/// assert_eq!(parse_flag(""), Ok(false));
/// assert!(parse_flag("maybe").is_err());
/// ```
pub fn parse_flag(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(format!(
            "\"{other}\" is not a boolean; use true/false, yes/no, on/off or 1/0"
        )),
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
