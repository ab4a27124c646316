//! The publish protocol.
//!
//! 1. Read `qpm.json` and `qpm.shared.json`.
//! 2. Resolve the version and write it to both manifests.
//! 3. Derive the `version/v<x_y_z>` branch.
//! 4. Get or create the release for the tag.
//! 5. Upload the binaries and record their download links.
//! 6. Persist both manifests.
//! 7. Commit them to the branch through the Git database API.
//! 8. Run `qpm publish`.
//!
//! Steps are applied in order with no rollback; a missing version is
//! detected before anything remote changes.

pub mod commit;
pub mod naming;
pub mod release;

use crate::error::{ActionError, Result};
use crate::github::{GitDatabase, ReleaseApi, RepoRef};
use crate::process::Qpm;
use camino::Utf8Path;
use commit::{BranchCreation, commit_files};
use log::info;
use naming::{BinaryInput, branch_name, debug_so_asset_name, qmod_asset_name, so_asset_name};
use qpm_action_common::{
    QPM_MANIFEST, QPM_SHARED_MANIFEST, QpmPackage, QpmSharedPackage, read_manifest, write_manifest,
};
use release::{get_or_create_release, upload_replacing};

/// User-controlled publish settings.
#[derive(Debug, Clone)]
pub struct PublishOptions<'a> {
    /// Explicit version; falls back to the shared manifest's.
    pub version: Option<&'a str>,
    /// Release tag; falls back to the version.
    pub tag: Option<&'a str>,
    /// Token handed to `qpm publish`.
    pub publish_token: &'a str,
    /// Stripped binary to upload.
    pub release_bin: BinaryInput,
    /// Debug binary to upload.
    pub debug_bin: BinaryInput,
    /// `.qmod` to upload.
    pub qmod: BinaryInput,
}

/// Where and through what the protocol runs.
pub struct PublishContext<'a> {
    /// Checkout holding the manifests and binaries.
    pub workspace: &'a Utf8Path,
    /// Repository being published.
    pub repo: &'a RepoRef,
    /// Workflow commit; base of the manifest commit and new releases.
    pub sha: &'a str,
    /// Release API.
    pub releases: &'a dyn ReleaseApi,
    /// Git database API.
    pub git: &'a dyn GitDatabase,
    /// QPM executable.
    pub qpm: &'a Qpm<'a>,
}

/// What [`run_publish`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Published version.
    pub version: String,
    /// Release tag.
    pub tag: String,
    /// Branch holding the manifest commit.
    pub branch: String,
    /// Release the binaries were attached to.
    pub release_id: u64,
    /// SHA of the manifest commit.
    pub commit_sha: String,
    /// How the branch came to exist.
    pub branch_creation: BranchCreation,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Resolve the version to publish.
///
/// # Errors
///
/// Returns [`ActionError::MissingVersion`] when neither source has one.
pub fn resolve_version(explicit: Option<&str>, shared: &QpmSharedPackage) -> Result<String> {
    non_empty(explicit)
        .or_else(|| non_empty(Some(shared.version())))
        .map(str::to_owned)
        .ok_or(ActionError::MissingVersion)
}

/// Run the publish protocol.
///
/// # Errors
///
/// Returns the first failing step's error; earlier steps are not undone.
pub fn run_publish(ctx: &PublishContext<'_>, options: &PublishOptions<'_>) -> Result<PublishOutcome> {
    let manifest_path = ctx.workspace.join(QPM_MANIFEST);
    let shared_path = ctx.workspace.join(QPM_SHARED_MANIFEST);
    let mut manifest: QpmPackage = read_manifest(manifest_path.as_std_path())?;
    let mut shared: QpmSharedPackage = read_manifest(shared_path.as_std_path())?;

    let version = resolve_version(options.version, &shared)?;
    manifest.set_version(&version);
    shared.config.set_version(&version);

    let branch = branch_name(&version);
    manifest.info.additional_data.branch_name = Some(branch.clone());
    shared.additional_data_mut().branch_name = Some(branch.clone());

    let tag = non_empty(options.tag).unwrap_or(&version).to_owned();
    info!("publishing {} {version} (tag {tag}, branch {branch})", shared.config.info.id);
    let release = get_or_create_release(ctx.releases, ctx.repo, &tag, ctx.sha)?;

    let id = shared.config.info.id.clone();
    let data = shared.config.info.additional_data.clone();

    let so_name = so_asset_name(&id, &version, &data);
    if let Some(path) = options.release_bin.resolve(ctx.workspace, &so_name, false) {
        let asset = upload_replacing(ctx.releases, ctx.repo, &release, &path, &so_name)?;
        shared.additional_data_mut().so_link = Some(asset.browser_download_url);
    }

    let debug_name = debug_so_asset_name(&id, &version, &data);
    if let Some(path) = options.debug_bin.resolve(ctx.workspace, &debug_name, true) {
        let asset = upload_replacing(ctx.releases, ctx.repo, &release, &path, &debug_name)?;
        shared.additional_data_mut().debug_so_link = Some(asset.browser_download_url);
    }

    let default_qmod = format!("{id}.qmod");
    if let Some(path) = options.qmod.resolve(ctx.workspace, &default_qmod, false) {
        let name = qmod_asset_name(&path);
        let asset = upload_replacing(ctx.releases, ctx.repo, &release, &path, &name)?;
        shared.additional_data_mut().mod_link = Some(asset.browser_download_url);
    }

    let manifest_json = write_manifest(&manifest, manifest_path.as_std_path())?;
    let shared_json = write_manifest(&shared, shared_path.as_std_path())?;

    let committed = commit_files(
        ctx.git,
        ctx.repo,
        &branch,
        ctx.sha,
        &[(QPM_MANIFEST, manifest_json), (QPM_SHARED_MANIFEST, shared_json)],
    )?;

    ctx.qpm.publish(options.publish_token)?;
    info!("published {id} {version}");

    Ok(PublishOutcome {
        version,
        tag,
        branch,
        release_id: release.id,
        commit_sha: committed.sha,
        branch_creation: committed.branch_creation,
    })
}

#[cfg(test)]
#[path = "publish_tests.rs"]
mod tests;
