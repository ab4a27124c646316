//! Typed access to the GitHub REST endpoints the action needs.
//!
//! The API surface is split along the action's seams: [`ArtifactSource`] for
//! locating QPM builds, [`ReleaseApi`] for publishing binaries, and
//! [`GitDatabase`] for committing manifests without a checkout. The
//! production [`GitHubClient`] implements all three; tests inject mocks.

pub mod client;
pub mod repo;
pub mod types;

pub use client::GitHubClient;
pub use repo::RepoRef;
pub use types::{
    Artifact, ArtifactRun, Branch, GitCommit, GitRef, GitTree, ObjectRef, Release, ReleaseAsset,
    TreeEntry, WorkflowRun,
};

/// Errors arising from GitHub API calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The resource does not exist (HTTP 404).
    #[error("{method} {url} returned 404 Not Found")]
    NotFound {
        /// HTTP method.
        method: &'static str,
        /// Requested URL.
        url: String,
    },

    /// The API answered with an error status other than 404.
    #[error("{method} {url} returned HTTP {status}")]
    Status {
        /// HTTP method.
        method: &'static str,
        /// Requested URL.
        url: String,
        /// Response status code.
        status: u16,
    },

    /// The request could not be completed.
    #[error("{method} {url} failed: {reason}")]
    Transport {
        /// HTTP method.
        method: &'static str,
        /// Requested URL.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The response body could not be decoded.
    #[error("{method} {url} returned an unexpected body: {reason}")]
    Body {
        /// HTTP method.
        method: &'static str,
        /// Requested URL.
        url: String,
        /// Decoder message.
        reason: String,
    },
}

impl ApiError {
    /// The HTTP status code, when the server answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            Self::Status { status, .. } => Some(*status),
            Self::Transport { .. } | Self::Body { .. } => None,
        }
    }
}

/// Read-only queries used to locate a QPM build.
#[cfg_attr(test, mockall::automock)]
pub trait ArtifactSource {
    /// Fetch a branch and its head commit.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] if the branch does not exist.
    fn branch(&self, repo: &RepoRef, branch: &str) -> Result<Branch, ApiError>;

    /// List recent successful runs of a workflow file.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    fn workflow_runs(&self, repo: &RepoRef, workflow: &str) -> Result<Vec<WorkflowRun>, ApiError>;

    /// List the artifacts uploaded by a run.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    fn run_artifacts(&self, repo: &RepoRef, run_id: u64) -> Result<Vec<Artifact>, ApiError>;

    /// Fetch the latest published release.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] if the repository has no release.
    fn latest_release(&self, repo: &RepoRef) -> Result<Release, ApiError>;

    /// List releases, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    fn releases(&self, repo: &RepoRef) -> Result<Vec<Release>, ApiError>;
}

/// Release management for publishing binaries.
#[cfg_attr(test, mockall::automock)]
pub trait ReleaseApi {
    /// Fetch the release for `tag`, or `None` if the tag has no release.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for any reason other than 404.
    fn release_by_tag(&self, repo: &RepoRef, tag: &str) -> Result<Option<Release>, ApiError>;

    /// Create a release for `tag`, creating the tag at `target_commitish`
    /// if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    fn create_release(
        &self,
        repo: &RepoRef,
        tag: &str,
        target_commitish: &str,
    ) -> Result<Release, ApiError>;

    /// Upload `content` as a release asset named `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload fails.
    fn upload_asset(
        &self,
        repo: &RepoRef,
        release_id: u64,
        name: &str,
        content: &[u8],
    ) -> Result<ReleaseAsset, ApiError>;

    /// Delete a release asset.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    fn delete_asset(&self, repo: &RepoRef, asset_id: u64) -> Result<(), ApiError>;
}

/// Low-level Git database operations.
#[cfg_attr(test, mockall::automock)]
pub trait GitDatabase {
    /// Fetch a commit object.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit does not exist or the request fails.
    fn commit(&self, repo: &RepoRef, sha: &str) -> Result<GitCommit, ApiError>;

    /// Create `refs/heads/{branch}` pointing at `sha`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Status`] with status 422 if the ref already exists.
    fn create_branch_ref(&self, repo: &RepoRef, branch: &str, sha: &str)
    -> Result<GitRef, ApiError>;

    /// Create a tree from `entries` on top of `base_tree`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    fn create_tree(
        &self,
        repo: &RepoRef,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<GitTree, ApiError>;

    /// Create a commit object.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    fn create_commit(
        &self,
        repo: &RepoRef,
        message: &str,
        tree: &str,
        parents: &[String],
    ) -> Result<GitCommit, ApiError>;

    /// Move `refs/heads/{branch}` to `sha`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    fn update_branch_ref(
        &self,
        repo: &RepoRef,
        branch: &str,
        sha: &str,
        force: bool,
    ) -> Result<GitRef, ApiError>;
}
