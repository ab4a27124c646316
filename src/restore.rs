//! Dependency restore: version overwrite, cache restore, `qpm restore`,
//! cache save.

use crate::cache::{DependencyCache, cache_key, lockfile_digest};
use crate::error::Result;
use crate::process::Qpm;
use camino::Utf8Path;
use log::{info, warn};
use qpm_action_common::{
    QPM_MANIFEST, QPM_SHARED_MANIFEST, QpmPackage, QpmSharedPackage, read_manifest, write_manifest,
};

/// Which restore steps run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreOptions<'a> {
    /// Version written into the manifests before restoring.
    pub version: Option<&'a str>,
    /// Restore and save the dependency cache.
    pub cache: bool,
    /// Tie the cache key to the lockfile digest.
    pub cache_lockfile: bool,
    /// Run `qpm restore`.
    pub restore: bool,
    /// Runner OS, for the cache key.
    pub os: &'a str,
}

/// What [`run_restore`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreOutcome {
    /// Version written into the manifests, if any.
    pub version_written: Option<String>,
    /// Key the dependency cache was restored from and saved to.
    pub cache_key: Option<String>,
    /// Whether a cache entry was found.
    pub cache_hit: bool,
    /// Whether `qpm restore` ran.
    pub restored: bool,
}

/// Overwrite the version in `qpm.json` and, when present, `qpm.shared.json`.
///
/// # Errors
///
/// Returns an error if a manifest cannot be read, parsed, or written.
pub fn overwrite_version(workspace: &Utf8Path, version: &str) -> Result<()> {
    let manifest_path = workspace.join(QPM_MANIFEST);
    let mut manifest: QpmPackage = read_manifest(manifest_path.as_std_path())?;
    manifest.set_version(version);
    write_manifest(&manifest, manifest_path.as_std_path())?;

    let shared_path = workspace.join(QPM_SHARED_MANIFEST);
    if shared_path.is_file() {
        let mut shared: QpmSharedPackage = read_manifest(shared_path.as_std_path())?;
        shared.config.set_version(version);
        write_manifest(&shared, shared_path.as_std_path())?;
    }
    info!("set package version to {version}");
    Ok(())
}

/// Run the restore steps selected by `options` in `workspace`.
///
/// A cache miss is not an error.
///
/// # Errors
///
/// Returns an error if the version overwrite, the cache, or QPM fails.
pub fn run_restore(
    workspace: &Utf8Path,
    qpm: &Qpm<'_>,
    cache: &dyn DependencyCache,
    options: &RestoreOptions<'_>,
) -> Result<RestoreOutcome> {
    let mut outcome = RestoreOutcome::default();

    if let Some(version) = options.version {
        overwrite_version(workspace, version)?;
        outcome.version_written = Some(version.to_owned());
    }

    let cached = if options.cache {
        let digest = if options.cache_lockfile {
            lockfile_digest(&workspace.join(QPM_SHARED_MANIFEST))?
        } else {
            None
        };
        let key = cache_key(options.os, digest.as_deref());
        let path = qpm.cache_path()?;
        match cache.restore(&path, &key)? {
            Some(matched) => {
                info!("dependency cache hit: {matched}");
                outcome.cache_hit = true;
            }
            None => warn!("dependency cache miss for {key}"),
        }
        outcome.cache_key = Some(key.clone());
        Some((path, key))
    } else {
        None
    };

    if options.restore {
        qpm.restore()?;
        outcome.restored = true;
    }

    if let Some((path, key)) = cached {
        cache.save(&path, &key)?;
    }
    Ok(outcome)
}
