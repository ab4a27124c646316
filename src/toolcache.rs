//! Runner tool cache.
//!
//! Mirrors the hosted runner layout so entries written by other actions
//! and by earlier steps are found:
//! `$RUNNER_TOOL_CACHE/<tool>/<key>/<arch>/` with a sibling
//! `<arch>.complete` marker written last.

use crate::error::Result;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info, warn};
use qpm_action_common::workflow::append_file_command;
use std::fs;

/// Tool cache rooted at `RUNNER_TOOL_CACHE`.
#[derive(Debug, Clone)]
pub struct ToolCache {
    root: Utf8PathBuf,
    arch: String,
}

impl ToolCache {
    /// Create a tool cache for entries built for `arch`.
    #[must_use]
    pub fn new(root: Utf8PathBuf, arch: &str) -> Self {
        Self {
            root,
            arch: arch.to_owned(),
        }
    }

    /// Directory holding `tool` at version `key`.
    #[must_use]
    pub fn tool_dir(&self, tool: &str, key: &str) -> Utf8PathBuf {
        self.version_dir(tool, key).join(&self.arch)
    }

    fn version_dir(&self, tool: &str, key: &str) -> Utf8PathBuf {
        self.root.join(tool).join(sanitise_key(key))
    }

    fn marker(&self, tool: &str, key: &str) -> Utf8PathBuf {
        self.version_dir(tool, key)
            .join(format!("{}.complete", self.arch))
    }

    /// Return the cached directory for `tool` at `key`, if complete.
    #[must_use]
    pub fn find(&self, tool: &str, key: &str) -> Option<Utf8PathBuf> {
        let dir = self.tool_dir(tool, key);
        if dir.is_dir() && self.marker(tool, key).is_file() {
            debug!("tool cache hit for {tool}@{key}: {dir}");
            Some(dir)
        } else {
            debug!("tool cache miss for {tool}@{key}");
            None
        }
    }

    /// Copy `source` into the cache as `tool` at `key`.
    ///
    /// Any incomplete entry is replaced. The marker is written only after
    /// every file is in place.
    ///
    /// # Errors
    ///
    /// Returns an error if copying or writing the marker fails.
    pub fn cache_dir(&self, source: &Utf8Path, tool: &str, key: &str) -> Result<Utf8PathBuf> {
        let dest = self.tool_dir(tool, key);
        let marker = self.marker(tool, key);
        if marker.exists() {
            fs::remove_file(&marker)?;
        }
        if dest.exists() {
            fs::remove_dir_all(&dest)?;
        }
        copy_dir_all(source, &dest)?;
        fs::write(&marker, b"")?;
        info!("cached {tool}@{key} in {dest}");
        Ok(dest)
    }
}

fn copy_dir_all(source: &Utf8Path, dest: &Utf8Path) -> std::io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in source.read_dir_utf8()? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Reduce a version key to a single safe path component.
///
/// # Examples
///
/// ```
/// use qpm_action::toolcache::sanitise_key;
///
/// assert_eq!(sanitise_key("v1.2.3"), "v1.2.3");
/// assert_eq!(sanitise_key("feature/x"), "feature_x");
/// assert_eq!(sanitise_key(".."), "_.");
/// ```
#[must_use]
pub fn sanitise_key(key: &str) -> String {
    let mut sanitised: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitised.is_empty() {
        sanitised.push('_');
    } else if sanitised.starts_with('.') {
        sanitised.replace_range(..1, "_");
    }
    sanitised
}

/// Make `dir` available on `PATH` for later workflow steps.
///
/// Without a `GITHUB_PATH` file (outside a runner) a warning is logged and
/// nothing else happens.
///
/// # Errors
///
/// Returns an error if the path file cannot be appended to.
pub fn add_path(github_path: Option<&Utf8Path>, dir: &Utf8Path) -> Result<()> {
    match github_path {
        Some(file) => {
            append_file_command(file.as_std_path(), dir.as_str())?;
            debug!("added {dir} to PATH");
        }
        None => warn!("GITHUB_PATH is not set; {dir} was not added to PATH"),
    }
    Ok(())
}
