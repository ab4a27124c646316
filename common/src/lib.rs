//! Shared building blocks for the QPM action: the `qpm.json` manifest model,
//! the workflow-command logging backend, and output sanitising helpers.

pub mod ansi;
pub mod manifest;
pub mod workflow;

pub use ansi::strip_ansi;
pub use manifest::{
    AdditionalData, ManifestError, PackageInfo, QPM_MANIFEST, QPM_SHARED_MANIFEST, QpmPackage,
    QpmSharedPackage, read_manifest, write_manifest,
};
pub use workflow::WorkflowLogger;
