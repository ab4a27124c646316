//! Response and request payloads for the GitHub REST endpoints in use.
//!
//! Only the fields the action reads are declared; serde ignores the rest.

use serde::{Deserialize, Serialize};

/// `GET /repos/{owner}/{repo}/branches/{branch}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Branch {
    /// Branch name.
    pub name: String,
    /// Head commit of the branch.
    pub commit: ObjectRef,
}

/// A reference to a Git object by SHA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Object SHA.
    pub sha: String,
}

/// Envelope of `GET .../actions/workflows/{id}/runs`.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRunList {
    /// Runs on this page.
    pub workflow_runs: Vec<WorkflowRun>,
}

/// One workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkflowRun {
    /// Run id, used to list its artifacts.
    pub id: u64,
    /// Monotonic per-workflow run number.
    pub run_number: u64,
    /// Branch the run was triggered for.
    #[serde(default)]
    pub head_branch: Option<String>,
    /// Commit the run built.
    pub head_sha: String,
}

/// Envelope of `GET .../actions/runs/{id}/artifacts`.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactList {
    /// Artifacts on this page.
    pub artifacts: Vec<Artifact>,
}

/// A build artifact uploaded by a workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Artifact {
    /// Artifact id.
    pub id: u64,
    /// Artifact name given by the uploading workflow.
    pub name: String,
    /// Authenticated zip download URL.
    pub archive_download_url: String,
    /// Whether the artifact has passed its retention period.
    #[serde(default)]
    pub expired: bool,
    /// Run that produced the artifact.
    #[serde(default)]
    pub workflow_run: Option<ArtifactRun>,
}

/// Run metadata embedded in an artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ArtifactRun {
    /// Run id.
    #[serde(default)]
    pub id: Option<u64>,
    /// Branch of the producing run.
    #[serde(default)]
    pub head_branch: Option<String>,
    /// Commit of the producing run.
    #[serde(default)]
    pub head_sha: Option<String>,
}

/// A GitHub release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    /// Release id, used for asset uploads.
    pub id: u64,
    /// Tag the release is attached to.
    pub tag_name: String,
    /// Whether the release is an unpublished draft.
    #[serde(default)]
    pub draft: bool,
    /// Assets attached to the release.
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// A file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    /// Asset id.
    pub id: u64,
    /// File name.
    pub name: String,
    /// Public download URL.
    pub browser_download_url: String,
}

/// A Git commit object (`GET/POST .../git/commits`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitCommit {
    /// Commit SHA.
    pub sha: String,
    /// Root tree of the commit.
    pub tree: ObjectRef,
}

/// A Git reference (`POST/PATCH .../git/refs`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitRef {
    /// Fully qualified ref name, e.g. `refs/heads/main`.
    #[serde(rename = "ref")]
    pub name: String,
    /// Object the ref points at.
    pub object: ObjectRef,
}

/// A Git tree object (`POST .../git/trees`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitTree {
    /// Tree SHA.
    pub sha: String,
}

/// A file to place in a new tree, given by content rather than blob SHA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    /// Repository-relative path.
    pub path: String,
    /// File mode; `100644` for regular files.
    pub mode: &'static str,
    /// Object type; always `blob` here.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// New file content.
    pub content: String,
}

impl TreeEntry {
    /// A regular, non-executable file with the given content.
    #[must_use]
    pub fn file(path: &str, content: String) -> Self {
        Self {
            path: path.to_owned(),
            mode: "100644",
            kind: "blob",
            content,
        }
    }
}
