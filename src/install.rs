//! QPM acquisition: tool cache → resolve → download → extract → cache.
//!
//! The installed directory is added to `PATH` for later steps and fixed up
//! so both `qpm` and `qpm-rust` name the same executable, whichever of the
//! two the archive shipped.

use crate::download::ToolDownloader;
use crate::error::{ActionError, Result};
use crate::extraction::ArchiveExtractor;
use crate::platform::Platform;
use crate::resolver::{QPM_TOOL_NAME, Resolver};
use crate::toolcache::{ToolCache, add_path};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use std::fs;

/// Executable names QPM ships under; the first present becomes canonical.
pub const EXECUTABLE_STEMS: [&str; 2] = ["qpm", "qpm-rust"];

/// Where and how to install.
#[derive(Debug)]
pub struct InstallConfig<'a> {
    /// Runner tool cache.
    pub tool_cache: &'a ToolCache,
    /// File named by `GITHUB_PATH`, if running on a runner.
    pub github_path: Option<&'a Utf8Path>,
    /// Scratch directory for the download; the system default when `None`.
    pub temp_root: Option<&'a Utf8Path>,
}

/// A usable QPM installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledTool {
    /// Directory holding the executable.
    pub dir: Utf8PathBuf,
    /// Path of the `qpm` executable.
    pub executable: Utf8PathBuf,
    /// Commit SHA or release tag of the installed build.
    pub version_key: String,
    /// Whether the tool cache already had this build.
    pub from_cache: bool,
}

/// Install the QPM build chosen by `resolver`.
///
/// # Errors
///
/// Returns an error if resolution, download, extraction, caching, or the
/// executable fix-up fails.
pub fn install_qpm(
    resolver: &Resolver<'_>,
    downloader: &dyn ToolDownloader,
    extractor: &dyn ArchiveExtractor,
    config: &InstallConfig<'_>,
) -> Result<InstalledTool> {
    let target = resolver.target()?;
    let key = target.version_key.clone();

    let (dir, from_cache) = match config.tool_cache.find(QPM_TOOL_NAME, &key) {
        Some(dir) => {
            info!("using cached QPM {key}");
            (dir, true)
        }
        None => {
            let download = resolver.locate(&target)?;
            let scratch = match config.temp_root {
                Some(root) => {
                    fs::create_dir_all(root)?;
                    tempfile::tempdir_in(root)?
                }
                None => tempfile::tempdir()?,
            };
            let archive = scratch.path().join("qpm-download.zip");
            let extracted = scratch.path().join("extracted");

            info!("downloading {} from {}", download.asset_name, download.url);
            downloader.download(&download.url, download.authenticated, &archive)?;
            let files = extractor.extract(&archive, &extracted)?;
            debug!("extracted {} files", files.len());

            let source = Utf8PathBuf::from_path_buf(extracted).map_err(|path| {
                ActionError::Io(std::io::Error::other(format!(
                    "non UTF-8 scratch path {}",
                    path.display()
                )))
            })?;
            (config.tool_cache.cache_dir(&source, QPM_TOOL_NAME, &key)?, false)
        }
    };

    let executable = fix_up_executables(&dir, resolver.platform())?;
    add_path(config.github_path, &dir)?;
    Ok(InstalledTool {
        dir,
        executable,
        version_key: key,
        from_cache,
    })
}

/// Mark the QPM executable runnable and hard-link its alias.
///
/// Returns the path of the `qpm` executable.
///
/// # Errors
///
/// Returns [`ActionError::ExecutableNotFound`] if neither name is present.
pub fn fix_up_executables(dir: &Utf8Path, platform: &Platform) -> Result<Utf8PathBuf> {
    let paths = EXECUTABLE_STEMS.map(|stem| dir.join(platform.executable_name(stem)));
    let Some(canonical) = paths.iter().find(|path| path.is_file()).cloned() else {
        return Err(ActionError::ExecutableNotFound {
            dir: dir.to_owned(),
        });
    };

    make_executable(&canonical)?;
    for alias in paths.iter().filter(|path| **path != canonical) {
        if !alias.exists() {
            fs::hard_link(&canonical, alias)?;
            debug!("linked {alias} to {canonical}");
        }
    }
    Ok(paths[0].clone())
}

#[cfg(unix)]
fn make_executable(path: &Utf8Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Utf8Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
#[path = "install_tests.rs"]
mod tests;
