//! Error types for the QPM action.
//!
//! Every failure bubbles up to the binary's top-level handler, which marks
//! the workflow step failed with the error's message. Variants therefore
//! carry enough context to be actionable on their own in the run log.

use crate::cache::CacheError;
use crate::download::DownloadError;
use crate::extraction::ExtractionError;
use crate::github::ApiError;
use crate::github::repo::RepoRefError;
use qpm_action_common::ManifestError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while installing QPM, restoring, or publishing.
#[derive(Debug, Error)]
pub enum ActionError {
    /// A required action input was not supplied.
    #[error("missing required input `{name}`")]
    MissingInput {
        /// Input name as written in the workflow file.
        name: &'static str,
    },

    /// A runner environment variable needed for this step is not set.
    #[error("runner environment variable {name} is not set")]
    MissingEnvironment {
        /// Name of the missing variable.
        name: &'static str,
    },

    /// A repository identifier could not be parsed.
    #[error(transparent)]
    Repository(#[from] RepoRefError),

    /// No workflow run of the QPM build matched the requested ref.
    #[error("no successful {workflow} run found for \"{filter}\"")]
    NoMatchingRun {
        /// Workflow file that was searched.
        workflow: String,
        /// Branch name or SHA prefix used to filter runs.
        filter: String,
    },

    /// The selected run has no artifact with the expected name.
    #[error("artifact {name} not found on run {run_id} for \"{filter}\"")]
    ArtifactNotFound {
        /// Expected artifact name.
        name: String,
        /// Workflow run that was searched.
        run_id: u64,
        /// Branch name or SHA prefix used to filter artifacts.
        filter: String,
    },

    /// A QPM version requirement is not a valid semver range.
    #[error("invalid QPM version requirement \"{requirement}\": {reason}")]
    InvalidRequirement {
        /// The rejected requirement.
        requirement: String,
        /// Parser message.
        reason: String,
    },

    /// No published QPM release satisfies the requirement.
    #[error("no QPM release satisfies \"{requirement}\"")]
    ReleaseNotFound {
        /// The requirement that matched nothing.
        requirement: String,
    },

    /// The selected release has no asset for this platform.
    #[error("release {tag} has no asset named {asset}")]
    ReleaseAssetNotFound {
        /// Release tag.
        tag: String,
        /// Expected asset file name.
        asset: String,
    },

    /// The extracted tool directory contains no QPM executable.
    #[error("no QPM executable found in {dir}")]
    ExecutableNotFound {
        /// Directory that was searched.
        dir: Utf8PathBuf,
    },

    /// Publishing was requested but no version could be determined.
    #[error(
        "no version to publish; set the `version` input or info.version in qpm.shared.json"
    )]
    MissingVersion,

    /// A binary to upload could not be read.
    #[error("failed to read {path} for release asset {asset}: {source}")]
    AssetRead {
        /// Local path of the binary.
        path: Utf8PathBuf,
        /// Release asset name it would have been uploaded as.
        asset: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Creating the version branch failed for a reason other than the
    /// branch already existing.
    #[error("failed to create branch {branch}: {reason}")]
    BranchCreation {
        /// Branch name.
        branch: String,
        /// Description of the failure.
        reason: String,
    },

    /// QPM did not report its cache directory.
    #[error("could not find \"Config path is:\" in `qpm cache path` output")]
    CachePathNotReported,

    /// An external command exited unsuccessfully.
    #[error("{program} {args} exited with {status}: {stderr}")]
    ProcessFailed {
        /// Program that was run.
        program: String,
        /// Space-joined arguments.
        args: String,
        /// Exit status description.
        status: String,
        /// Captured standard error, ANSI escapes removed.
        stderr: String,
    },

    /// An external command did not finish in time.
    #[error("{program} did not finish within {seconds} seconds")]
    ProcessTimedOut {
        /// Program that was run.
        program: String,
        /// Timeout that elapsed.
        seconds: u64,
    },

    /// Reading or writing a manifest failed.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// A GitHub API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Downloading the QPM archive failed.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Extracting the QPM archive failed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Restoring or saving the dependency cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

/// Result type alias using [`ActionError`].
pub type Result<T> = std::result::Result<T, ActionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_names_the_input() {
        let err = ActionError::MissingInput {
            name: "workflow_token",
        };
        assert!(err.to_string().contains("workflow_token"));
    }

    #[test]
    fn no_matching_run_includes_filter() {
        let err = ActionError::NoMatchingRun {
            workflow: "cargo-build.yml".to_owned(),
            filter: "feature/x".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("cargo-build.yml"));
        assert!(msg.contains("feature/x"));
    }

    #[test]
    fn process_failed_includes_command_and_stderr() {
        let err = ActionError::ProcessFailed {
            program: "qpm".to_owned(),
            args: "restore".to_owned(),
            status: "exit status: 1".to_owned(),
            stderr: "dependency not found".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("qpm restore"));
        assert!(msg.contains("dependency not found"));
    }

    #[test]
    fn asset_read_preserves_source() {
        let err = ActionError::AssetRead {
            path: Utf8PathBuf::from("build/libmod.so"),
            asset: "libmod_1_0_0.so".to_owned(),
            source: std::io::Error::other("missing"),
        };
        assert!(err.to_string().contains("libmod_1_0_0.so"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn missing_version_mentions_input() {
        assert!(ActionError::MissingVersion.to_string().contains("`version`"));
    }
}
