//! Zip extraction for QPM archives.
//!
//! Both CI artifacts and release assets are zip files. Entries are
//! validated before extraction to prevent zip-slip.

use std::fs::{self, File};
use std::io;
use std::path::Path;

/// Trait for extracting archives, enabling test mocking.
///
/// # Examples
///
/// ```
/// use qpm_action::extraction::ZipExtractor;
///
/// let extractor = ZipExtractor;
/// // Use extractor.extract(archive_path, dest_dir) in production
/// # let _ = extractor;
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor {
    /// Extract the archive at `archive_path` into `dest_dir`.
    ///
    /// Returns the relative paths of the extracted files.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::PathTraversal`] if any entry
    /// attempts to escape the destination directory.
    /// Returns [`ExtractionError::EmptyArchive`] if no files are found.
    fn extract(&self, archive_path: &Path, dest_dir: &Path)
    -> Result<Vec<String>, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file is not a readable zip archive.
    #[error("invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive contains no files.
    #[error("archive contains no files")]
    EmptyArchive,
}

/// Default extractor using the `zip` crate.
pub struct ZipExtractor;

impl ArchiveExtractor for ZipExtractor {
    fn extract(
        &self,
        archive_path: &Path,
        dest_dir: &Path,
    ) -> Result<Vec<String>, ExtractionError> {
        let mut archive = zip::ZipArchive::new(File::open(archive_path)?)?;
        let mut extracted = Vec::new();

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let Some(relative) = entry.enclosed_name() else {
                return Err(ExtractionError::PathTraversal {
                    path: entry.name().to_owned(),
                });
            };
            let dest_path = dest_dir.join(&relative);

            if entry.is_dir() {
                fs::create_dir_all(&dest_path)?;
                continue;
            }
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&dest_path)?;
            io::copy(&mut entry, &mut out)?;

            apply_mode(&dest_path, entry.unix_mode())?;

            extracted.push(relative.to_string_lossy().into_owned());
        }

        if extracted.is_empty() {
            return Err(ExtractionError::EmptyArchive);
        }
        Ok(extracted)
    }
}

/// Restore the Unix permission bits recorded in the archive.
#[cfg(unix)]
fn apply_mode(path: &Path, mode: Option<u32>) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    match mode {
        Some(mode) => fs::set_permissions(path, fs::Permissions::from_mode(mode)),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: Option<u32>) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).expect("create archive");
        let mut writer = zip::ZipWriter::new(file);
        for (name, content) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .expect("start entry");
            writer.write_all(content).expect("write entry");
        }
        writer.finish().expect("finish archive");
    }

    #[test]
    fn extracts_nested_files() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let archive = temp_dir.path().join("qpm.zip");
        let dest = temp_dir.path().join("out");
        write_zip(
            &archive,
            &[("qpm", b"binary".as_slice()), ("docs/README.md", b"hi".as_slice())],
        );

        let files = ZipExtractor.extract(&archive, &dest).expect("extract");

        assert_eq!(files.len(), 2);
        assert_eq!(fs::read(dest.join("qpm")).expect("read"), b"binary");
        assert!(dest.join("docs").join("README.md").is_file());
    }

    #[test]
    fn rejects_parent_traversal() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let archive = temp_dir.path().join("evil.zip");
        write_zip(&archive, &[("../escape.txt", b"x".as_slice())]);

        let result = ZipExtractor.extract(&archive, &temp_dir.path().join("out"));

        assert!(matches!(result, Err(ExtractionError::PathTraversal { .. })));
        assert!(!temp_dir.path().join("escape.txt").exists());
    }

    #[test]
    fn empty_archive_is_an_error() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let archive = temp_dir.path().join("empty.zip");
        write_zip(&archive, &[]);

        let result = ZipExtractor.extract(&archive, &temp_dir.path().join("out"));
        assert!(matches!(result, Err(ExtractionError::EmptyArchive)));
    }

    #[test]
    fn non_zip_is_rejected() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let archive = temp_dir.path().join("bogus.zip");
        fs::write(&archive, b"not a zip").expect("write");

        let result = ZipExtractor.extract(&archive, &temp_dir.path().join("out"));
        assert!(matches!(result, Err(ExtractionError::Zip(_))));
    }
}
