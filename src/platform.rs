//! Platform identifiers and the QPM artifact names derived from them.
//!
//! The QPM build workflow uploads one artifact per runner OS, and the
//! release workflow attaches one zip per OS/architecture pair. Both names
//! are pure functions of the platform identifier.

use std::env::consts;

/// Suffix of the CI artifact name, e.g. `linux-qpm-rust`.
const ARTIFACT_SUFFIX: &str = "qpm-rust";

/// Normalise an OS identifier to the label used in QPM artifact names.
///
/// Node-style (`win32`, `darwin`) and Rust-style (`windows`, `macos`)
/// identifiers are both accepted; anything else passes through unchanged.
///
/// # Examples
///
/// ```
/// use qpm_action::platform::os_label;
///
/// assert_eq!(os_label("win32"), "windows");
/// assert_eq!(os_label("darwin"), "macos");
/// assert_eq!(os_label("linux"), "linux");
/// ```
#[must_use]
pub fn os_label(os: &str) -> &str {
    match os {
        "win32" | "windows" => "windows",
        "darwin" | "macos" => "macos",
        other => other,
    }
}

/// Normalise a CPU architecture to the label used in release asset names.
#[must_use]
pub fn arch_label(arch: &str) -> &str {
    match arch {
        "x86_64" | "x64" | "amd64" => "x64",
        "aarch64" | "arm64" => "arm64",
        other => other,
    }
}

/// Name of the CI artifact holding QPM for `os`.
///
/// # Examples
///
/// ```
/// use qpm_action::platform::artifact_name;
///
/// assert_eq!(artifact_name("win32"), "windows-qpm-rust");
/// assert_eq!(artifact_name("freebsd"), "freebsd-qpm-rust");
/// ```
#[must_use]
pub fn artifact_name(os: &str) -> String {
    format!("{}-{ARTIFACT_SUFFIX}", os_label(os))
}

/// Name of the release zip holding QPM for `os` and `arch`.
#[must_use]
pub fn release_asset_name(os: &str, arch: &str) -> String {
    format!("qpm-{}-{}.zip", os_label(os), arch_label(arch))
}

/// File name of an executable on `os`.
#[must_use]
pub fn executable_name(os: &str, stem: &str) -> String {
    if os_label(os) == "windows" {
        format!("{stem}.exe")
    } else {
        stem.to_owned()
    }
}

/// The platform the action runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// Operating system identifier.
    pub os: String,
    /// CPU architecture identifier.
    pub arch: String,
}

impl Platform {
    /// Build a platform from explicit identifiers.
    #[must_use]
    pub fn new(os: &str, arch: &str) -> Self {
        Self {
            os: os.to_owned(),
            arch: arch.to_owned(),
        }
    }

    /// The platform this binary was compiled for.
    #[must_use]
    pub fn current() -> Self {
        Self::new(consts::OS, consts::ARCH)
    }

    /// CI artifact name for this platform.
    #[must_use]
    pub fn artifact_name(&self) -> String {
        artifact_name(&self.os)
    }

    /// Release asset name for this platform.
    #[must_use]
    pub fn release_asset_name(&self) -> String {
        release_asset_name(&self.os, &self.arch)
    }

    /// Normalised OS label.
    #[must_use]
    pub fn os_label(&self) -> &str {
        os_label(&self.os)
    }

    /// Normalised architecture label.
    #[must_use]
    pub fn arch_label(&self) -> &str {
        arch_label(&self.arch)
    }

    /// File name of the executable `stem` on this platform.
    #[must_use]
    pub fn executable_name(&self, stem: &str) -> String {
        executable_name(&self.os, stem)
    }
}
