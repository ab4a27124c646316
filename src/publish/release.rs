//! Release management for publishing binaries.

use crate::error::{ActionError, Result};
use crate::github::{Release, ReleaseApi, ReleaseAsset, RepoRef};
use camino::Utf8Path;
use log::{debug, info};

/// Return the release for `tag`, creating it at `target_commitish` if
/// missing.
///
/// # Errors
///
/// Returns an error if the lookup or creation fails.
pub fn get_or_create_release(
    api: &dyn ReleaseApi,
    repo: &RepoRef,
    tag: &str,
    target_commitish: &str,
) -> Result<Release> {
    if let Some(release) = api.release_by_tag(repo, tag)? {
        debug!("release {tag} exists ({})", release.id);
        return Ok(release);
    }
    info!("creating release {tag} at {target_commitish}");
    Ok(api.create_release(repo, tag, target_commitish)?)
}

/// Upload `path` to `release` as `asset_name`, replacing an asset of the
/// same name.
///
/// # Errors
///
/// Returns [`ActionError::AssetRead`] if the file cannot be read, or an API
/// error if deletion or upload fails.
pub fn upload_replacing(
    api: &dyn ReleaseApi,
    repo: &RepoRef,
    release: &Release,
    path: &Utf8Path,
    asset_name: &str,
) -> Result<ReleaseAsset> {
    let content = std::fs::read(path).map_err(|source| ActionError::AssetRead {
        path: path.to_owned(),
        asset: asset_name.to_owned(),
        source,
    })?;

    for stale in release.assets.iter().filter(|asset| asset.name == asset_name) {
        info!("replacing existing asset {asset_name} on {}", release.tag_name);
        api.delete_asset(repo, stale.id)?;
    }

    let asset = api.upload_asset(repo, release.id, asset_name, &content)?;
    info!("uploaded {asset_name}: {}", asset.browser_download_url);
    Ok(asset)
}
