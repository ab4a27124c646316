//! Dependency cache around `qpm restore`.
//!
//! QPM keeps downloaded dependencies in a per-user cache directory. The
//! directory is archived under a key derived from the OS and, optionally,
//! the lockfile digest, and unpacked again on later runs.

use crate::platform::os_label;
use crate::toolcache::sanitise_key;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use std::fs;

/// Directory under the tool cache root that holds dependency archives.
pub const CACHE_DIR_NAME: &str = "qpm-dependency-cache";

/// Prefix of every dependency cache key.
pub const CACHE_KEY_PREFIX: &str = "qpm-cache";

/// Errors arising from the dependency cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// I/O error reading or writing the cache.
    #[error("dependency cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored archive could not be unpacked.
    #[error("dependency cache entry {key} is unreadable: {reason}")]
    Corrupt {
        /// Cache key of the entry.
        key: String,
        /// Description of the failure.
        reason: String,
    },
}

/// A key/value store for directory snapshots.
#[cfg_attr(test, mockall::automock)]
pub trait DependencyCache {
    /// Restore the snapshot stored under `key` into `path`.
    ///
    /// Returns the matched key, or `None` on a miss.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored snapshot cannot be read.
    fn restore(&self, path: &Utf8Path, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a snapshot of `path` under `key`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    fn save(&self, path: &Utf8Path, key: &str) -> Result<(), CacheError>;
}

/// Dependency cache stored as `<key>.tar.zst` archives in a directory.
#[derive(Debug, Clone)]
pub struct DirectoryCache {
    root: Utf8PathBuf,
}

impl DirectoryCache {
    /// Store archives under `root`.
    #[must_use]
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    /// The default location below the runner tool cache.
    #[must_use]
    pub fn under_tool_cache(tool_cache: &Utf8Path) -> Self {
        Self::new(tool_cache.join(CACHE_DIR_NAME))
    }

    /// Archive path for `key`.
    #[must_use]
    pub fn archive_path(&self, key: &str) -> Utf8PathBuf {
        self.root.join(format!("{}.tar.zst", sanitise_key(key)))
    }
}

impl DependencyCache for DirectoryCache {
    fn restore(&self, path: &Utf8Path, key: &str) -> Result<Option<String>, CacheError> {
        let archive_path = self.archive_path(key);
        if !archive_path.is_file() {
            info!("no dependency cache entry for {key}");
            return Ok(None);
        }

        fs::create_dir_all(path)?;
        let decoder = zstd::Decoder::new(fs::File::open(&archive_path)?)?;
        tar::Archive::new(decoder)
            .unpack(path)
            .map_err(|e| CacheError::Corrupt {
                key: key.to_owned(),
                reason: e.to_string(),
            })?;
        info!("restored dependency cache {key} into {path}");
        Ok(Some(key.to_owned()))
    }

    fn save(&self, path: &Utf8Path, key: &str) -> Result<(), CacheError> {
        if !path.is_dir() {
            warn!("{path} does not exist; dependency cache not saved");
            return Ok(());
        }

        fs::create_dir_all(&self.root)?;
        let staging = tempfile::NamedTempFile::new_in(&self.root)?;
        {
            let encoder = zstd::Encoder::new(staging.as_file(), 0)?;
            let mut builder = tar::Builder::new(encoder);
            builder.follow_symlinks(false);
            builder.append_dir_all(".", path)?;
            builder.into_inner()?.finish()?;
        }

        let archive_path = self.archive_path(key);
        staging.persist(&archive_path).map_err(|e| e.error)?;
        info!("saved dependency cache {key}");
        debug!("dependency cache archive at {archive_path}");
        Ok(())
    }
}

/// Cache key for `os`, optionally tied to a lockfile digest.
///
/// # Examples
///
/// ```
/// use qpm_action::cache::cache_key;
///
/// assert_eq!(cache_key("linux", None), "qpm-cache-linux");
/// assert_eq!(cache_key("win32", Some("ab12")), "qpm-cache-windows-ab12");
/// ```
#[must_use]
pub fn cache_key(os: &str, lockfile_digest: Option<&str>) -> String {
    match lockfile_digest {
        Some(digest) => format!("{CACHE_KEY_PREFIX}-{}-{digest}", os_label(os)),
        None => format!("{CACHE_KEY_PREFIX}-{}", os_label(os)),
    }
}

/// Hex SHA-256 of the lockfile at `path`, or `None` if it does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn lockfile_digest(path: &Utf8Path) -> std::io::Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read(path)?;
    Ok(Some(format!("{:x}", Sha256::digest(&content))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct Dirs {
        _temp: TempDir,
        root: Utf8PathBuf,
    }

    #[fixture]
    fn dirs() -> Dirs {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        Dirs { _temp: temp, root }
    }

    #[rstest]
    fn restore_misses_without_entry(dirs: Dirs) {
        let cache = DirectoryCache::new(dirs.root.join("cache"));
        let restored = cache
            .restore(&dirs.root.join("qpm"), "qpm-cache-linux")
            .expect("restore");
        assert_eq!(restored, None);
    }

    #[rstest]
    fn save_then_restore_round_trips_tree(dirs: Dirs) {
        let cache = DirectoryCache::new(dirs.root.join("cache"));
        let source = dirs.root.join("qpm");
        fs::create_dir_all(source.join("beatsaber-hook").join("6.0.0")).expect("mkdir");
        fs::write(source.join("beatsaber-hook").join("6.0.0").join("qpm.json"), b"{}")
            .expect("write");

        cache.save(&source, "qpm-cache-linux").expect("save");
        fs::remove_dir_all(&source).expect("clear source");
        let restored = cache.restore(&source, "qpm-cache-linux").expect("restore");

        assert_eq!(restored.as_deref(), Some("qpm-cache-linux"));
        assert_eq!(
            fs::read(source.join("beatsaber-hook").join("6.0.0").join("qpm.json"))
                .expect("read restored"),
            b"{}"
        );
    }

    #[rstest]
    fn save_of_missing_directory_is_skipped(dirs: Dirs) {
        let cache = DirectoryCache::new(dirs.root.join("cache"));
        cache
            .save(&dirs.root.join("absent"), "qpm-cache-linux")
            .expect("save skips");
        assert!(!cache.archive_path("qpm-cache-linux").exists());
    }

    #[rstest]
    fn corrupt_archive_is_reported(dirs: Dirs) {
        let cache = DirectoryCache::new(dirs.root.join("cache"));
        fs::create_dir_all(dirs.root.join("cache")).expect("mkdir");
        fs::write(cache.archive_path("k"), b"garbage").expect("write");

        let result = cache.restore(&dirs.root.join("qpm"), "k");
        assert!(result.is_err());
    }

    #[rstest]
    fn lockfile_digest_tracks_content(dirs: Dirs) {
        let lockfile = dirs.root.join("qpm.shared.json");
        assert_eq!(lockfile_digest(&lockfile).expect("absent"), None);

        fs::write(&lockfile, b"abc").expect("write");
        assert_eq!(
            lockfile_digest(&lockfile).expect("digest").as_deref(),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[rstest]
    #[case::plain("linux", None, "qpm-cache-linux")]
    #[case::darwin("darwin", None, "qpm-cache-macos")]
    #[case::locked("linux", Some("beef"), "qpm-cache-linux-beef")]
    fn builds_cache_keys(
        #[case] os: &str,
        #[case] digest: Option<&str>,
        #[case] expected: &str,
    ) {
        assert_eq!(cache_key(os, digest), expected);
    }
}
