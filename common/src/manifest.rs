//! QPM manifest model for `qpm.json` and `qpm.shared.json`.
//!
//! Only the fields the action reads or writes are typed. Every other key is
//! kept in a flattened map so that reading a manifest and writing it back
//! yields the same JSON document, which matters because both files are
//! committed back to the repository after publishing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// File name of the package manifest.
pub const QPM_MANIFEST: &str = "qpm.json";

/// File name of the shared (lockfile) manifest.
pub const QPM_SHARED_MANIFEST: &str = "qpm.shared.json";

/// Errors arising from manifest I/O.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest file is not valid JSON for the expected schema.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Path that was parsed.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The manifest could not be serialised or written.
    #[error("failed to write {path}: {reason}")]
    Write {
        /// Path that was written.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },
}

/// `qpm.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QpmPackage {
    /// Package identity and version.
    pub info: PackageInfo,
    /// Keys the action does not interpret (dependencies, sharedDir, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `info` block of a package manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInfo {
    /// Human-readable package name.
    pub name: String,
    /// Package id, used to derive binary names.
    pub id: String,
    /// Package version. May be empty before publish resolves it; an empty
    /// version is left out when written.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    /// Publish-time metadata.
    #[serde(default)]
    pub additional_data: AdditionalData,
    /// Untyped `info` keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `info.additionalData`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalData {
    /// Branch the manifests are committed to on publish.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    /// Whether the package ships headers only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers_only: Option<bool>,
    /// Explicit release binary name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_so_name: Option<String>,
    /// Explicit debug binary name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_debug_so_name: Option<String>,
    /// Download link of the release binary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub so_link: Option<String>,
    /// Download link of the debug binary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_so_link: Option<String>,
    /// Download link of the mod file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mod_link: Option<String>,
    /// Untyped `additionalData` keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `qpm.shared.json`: the package manifest plus restore-time state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QpmSharedPackage {
    /// The wrapped package manifest.
    pub config: QpmPackage,
    /// Untyped keys such as `restoredDependencies`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QpmPackage {
    /// Overwrite the version field.
    pub fn set_version(&mut self, version: &str) {
        version.clone_into(&mut self.info.version);
    }
}

impl QpmSharedPackage {
    /// The version stored in the wrapped manifest.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.config.info.version
    }

    /// Mutable access to the publish-time metadata.
    pub fn additional_data_mut(&mut self) -> &mut AdditionalData {
        &mut self.config.info.additional_data
    }
}

/// Read and parse a manifest of type `T` from `path`.
///
/// # Errors
///
/// Returns [`ManifestError::Read`] when the file cannot be read and
/// [`ManifestError::Parse`] when its content does not match the schema.
pub fn read_manifest<T>(path: &Path) -> Result<T, ManifestError>
where
    T: for<'de> Deserialize<'de>,
{
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
        path: path.to_owned(),
        source,
    })
}

/// Serialise a manifest to the pretty JSON form written to disk.
///
/// # Errors
///
/// Returns [`ManifestError::Write`] if serialisation fails.
pub fn manifest_json<T: Serialize>(manifest: &T, path: &Path) -> Result<String, ManifestError> {
    serde_json::to_string_pretty(manifest).map_err(|e| ManifestError::Write {
        path: path.to_owned(),
        reason: e.to_string(),
    })
}

/// Serialise `manifest` and write it to `path`, returning the written JSON.
///
/// # Errors
///
/// Returns [`ManifestError::Write`] on serialisation or I/O failure.
pub fn write_manifest<T: Serialize>(manifest: &T, path: &Path) -> Result<String, ManifestError> {
    let json = manifest_json(manifest, path)?;
    std::fs::write(path, &json).map_err(|e| ManifestError::Write {
        path: path.to_owned(),
        reason: e.to_string(),
    })?;
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SHARED: &str = r#"{
  "config": {
    "sharedDir": "shared",
    "dependenciesDir": "extern",
    "info": {
      "name": "Example Mod",
      "id": "example-mod",
      "version": "0.1.0",
      "url": null,
      "additionalData": {
        "overrideSoName": "libexample.so",
        "cmake": true
      }
    },
    "dependencies": [
      { "id": "beatsaber-hook", "versionRange": "^5.0.0", "additionalData": {} }
    ]
  },
  "restoredDependencies": []
}"#;

    #[test]
    fn parses_typed_fields() {
        let shared: QpmSharedPackage = serde_json::from_str(SHARED).expect("parse");
        assert_eq!(shared.config.info.id, "example-mod");
        assert_eq!(shared.version(), "0.1.0");
        assert_eq!(
            shared.config.info.additional_data.override_so_name.as_deref(),
            Some("libexample.so")
        );
        assert!(shared.config.info.additional_data.so_link.is_none());
    }

    #[test]
    fn round_trip_preserves_unknown_keys() {
        let shared: QpmSharedPackage = serde_json::from_str(SHARED).expect("parse");
        let written = serde_json::to_string(&shared).expect("serialise");
        let original: Value = serde_json::from_str(SHARED).expect("value");
        let reparsed: Value = serde_json::from_str(&written).expect("value");
        assert_eq!(original, reparsed);
    }

    #[test]
    fn missing_version_defaults_to_empty() {
        let json = r#"{ "info": { "name": "n", "id": "i" } }"#;
        let package: QpmPackage = serde_json::from_str(json).expect("parse");
        assert_eq!(package.info.version, "");
        assert_eq!(package.info.additional_data, AdditionalData::default());
    }

    #[test]
    fn missing_version_stays_missing_when_written() {
        let json = r#"{ "info": { "name": "n", "id": "i" } }"#;
        let package: QpmPackage = serde_json::from_str(json).expect("parse");
        let written: Value = serde_json::to_value(&package).expect("serialise");
        let info = written.get("info").expect("info");
        assert_eq!(info.get("version"), None, "{written}");
    }

    #[rstest]
    #[case::so_link("soLink")]
    #[case::branch("branchName")]
    #[case::debug("debugSoLink")]
    fn unset_links_are_not_written(#[case] key: &str) {
        let json = r#"{ "info": { "name": "n", "id": "i", "version": "1.0.0" } }"#;
        let package: QpmPackage = serde_json::from_str(json).expect("parse");
        let written = serde_json::to_string(&package).expect("serialise");
        assert!(!written.contains(key), "{written}");
    }

    #[test]
    fn write_then_read_from_disk() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join(QPM_SHARED_MANIFEST);
        let mut shared: QpmSharedPackage = serde_json::from_str(SHARED).expect("parse");
        shared.additional_data_mut().so_link = Some("https://example.test/lib.so".to_owned());

        write_manifest(&shared, &path).expect("write");
        let read: QpmSharedPackage = read_manifest(&path).expect("read");
        assert_eq!(read, shared);
    }

    #[test]
    fn read_reports_parse_errors_with_path() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join(QPM_MANIFEST);
        std::fs::write(&path, "{ not json").expect("write");

        let err = read_manifest::<QpmPackage>(&path).expect_err("parse should fail");
        assert!(matches!(err, ManifestError::Parse { .. }));
        assert!(err.to_string().contains(QPM_MANIFEST));
    }

    #[test]
    fn read_reports_missing_file() {
        let err = read_manifest::<QpmPackage>(Path::new("/nonexistent/qpm.json"))
            .expect_err("read should fail");
        assert!(matches!(err, ManifestError::Read { .. }));
    }
}
