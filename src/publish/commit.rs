//! Committing the manifests to the version branch through the Git database
//! API, without a checkout.

use crate::error::{ActionError, Result};
use crate::github::{GitDatabase, RepoRef, TreeEntry};
use log::{info, warn};

/// Message of the manifest commit.
pub const COMMIT_MESSAGE: &str = "Update version and post restore";

/// HTTP status GitHub returns when a ref already exists.
const REF_EXISTS_STATUS: u16 = 422;

/// Result of trying to create the version branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchCreation {
    /// The branch was created at the workflow commit.
    Created,
    /// The branch already existed; it is moved by the force update.
    AlreadyExists,
    /// Creation failed for another reason.
    Failed(String),
}

/// Create `refs/heads/{branch}` at `sha`.
pub fn create_branch(
    api: &dyn GitDatabase,
    repo: &RepoRef,
    branch: &str,
    sha: &str,
) -> BranchCreation {
    match api.create_branch_ref(repo, branch, sha) {
        Ok(_) => {
            info!("created branch {branch}");
            BranchCreation::Created
        }
        Err(err) if err.status() == Some(REF_EXISTS_STATUS) => {
            warn!("branch {branch} already exists; its head will be replaced");
            BranchCreation::AlreadyExists
        }
        Err(err) => BranchCreation::Failed(err.to_string()),
    }
}

/// A committed manifest update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestCommit {
    /// SHA of the new commit.
    pub sha: String,
    /// How the branch came to exist.
    pub branch_creation: BranchCreation,
}

/// Commit `files` (path, content) on top of `base_sha` and point `branch`
/// at the result.
///
/// # Errors
///
/// Returns [`ActionError::BranchCreation`] if the branch could not be
/// created for a reason other than already existing, or an API error.
pub fn commit_files(
    api: &dyn GitDatabase,
    repo: &RepoRef,
    branch: &str,
    base_sha: &str,
    files: &[(&str, String)],
) -> Result<ManifestCommit> {
    let base = api.commit(repo, base_sha)?;

    let branch_creation = create_branch(api, repo, branch, base_sha);
    if let BranchCreation::Failed(reason) = &branch_creation {
        return Err(ActionError::BranchCreation {
            branch: branch.to_owned(),
            reason: reason.clone(),
        });
    }

    let entries: Vec<TreeEntry> = files
        .iter()
        .map(|(path, content)| TreeEntry::file(path, content.clone()))
        .collect();
    let tree = api.create_tree(repo, &base.tree.sha, &entries)?;
    let commit = api.create_commit(repo, COMMIT_MESSAGE, &tree.sha, &[base.sha.clone()])?;
    api.update_branch_ref(repo, branch, &commit.sha, true)?;
    info!("committed manifests to {branch} as {}", commit.sha);

    Ok(ManifestCommit {
        sha: commit.sha,
        branch_creation,
    })
}
