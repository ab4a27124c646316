//! Shared helpers for the behaviour suites.
//!
//! Builds throwaway package workspaces holding `qpm.json` and
//! `qpm.shared.json` and reads the versions back after a flow has run.

use camino::{Utf8Path, Utf8PathBuf};
use qpm_action::test_utils::{sample_manifest, sample_shared_manifest};
use qpm_action_common::{
    QPM_MANIFEST, QPM_SHARED_MANIFEST, QpmPackage, QpmSharedPackage, read_manifest,
};
use tempfile::TempDir;

/// A temporary package checkout.
pub struct Workspace {
    _temp: TempDir,
    /// Checkout root.
    pub root: Utf8PathBuf,
}

impl Workspace {
    /// A checkout whose manifests carry `version`.
    pub fn at_version(version: &str) -> Self {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 temp dir");
        std::fs::write(root.join(QPM_MANIFEST), sample_manifest(version)).expect("write qpm.json");
        std::fs::write(
            root.join(QPM_SHARED_MANIFEST),
            sample_shared_manifest(version),
        )
        .expect("write qpm.shared.json");
        Self { _temp: temp, root }
    }

    /// Versions recorded in `qpm.json` and `qpm.shared.json`.
    pub fn versions(&self) -> (String, String) {
        let manifest: QpmPackage = read(&self.root, QPM_MANIFEST);
        let shared: QpmSharedPackage = read(&self.root, QPM_SHARED_MANIFEST);
        (manifest.info.version, shared.version().to_owned())
    }
}

fn read<T: serde::de::DeserializeOwned>(root: &Utf8Path, name: &str) -> T {
    read_manifest(root.join(name).as_std_path()).expect("read manifest")
}
