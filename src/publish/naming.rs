//! Names derived from the package manifest at publish time.

use camino::{Utf8Path, Utf8PathBuf};
use qpm_action_common::AdditionalData;

/// Directory that `true` binary inputs resolve against.
pub const BUILD_DIR: &str = "build";

/// A source of a release asset name, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSource {
    /// `additionalData.overrideSoName`.
    OverrideSoName,
    /// `additionalData.overrideDebugSoName`.
    OverrideDebugSoName,
    /// `debug_` followed by `additionalData.overrideSoName`.
    DebugPrefixedOverrideSoName,
    /// Derived from the package id and version.
    Derived,
}

/// Release binary name sources, highest precedence first.
pub const RELEASE_SO_NAME_PRECEDENCE: [NameSource; 2] =
    [NameSource::OverrideSoName, NameSource::Derived];

/// Debug binary name sources, highest precedence first.
pub const DEBUG_SO_NAME_PRECEDENCE: [NameSource; 3] = [
    NameSource::OverrideDebugSoName,
    NameSource::DebugPrefixedOverrideSoName,
    NameSource::Derived,
];

/// `1.2.3` → `1_2_3`.
#[must_use]
pub fn version_underscored(version: &str) -> String {
    version.replace('.', "_")
}

/// Branch the manifests are committed to for `version`.
///
/// # Examples
///
/// ```
/// use qpm_action::publish::naming::branch_name;
///
/// assert_eq!(branch_name("1.2.3"), "version/v1_2_3");
/// ```
#[must_use]
pub fn branch_name(version: &str) -> String {
    format!("version/v{}", version_underscored(version))
}

fn resolve(
    precedence: &[NameSource],
    data: &AdditionalData,
    derived: impl Fn() -> String,
) -> String {
    precedence
        .iter()
        .find_map(|source| match source {
            NameSource::OverrideSoName => data.override_so_name.clone(),
            NameSource::OverrideDebugSoName => data.override_debug_so_name.clone(),
            NameSource::DebugPrefixedOverrideSoName => data
                .override_so_name
                .as_ref()
                .map(|name| format!("debug_{name}")),
            NameSource::Derived => Some(derived()),
        })
        .unwrap_or_else(derived)
}

/// Release asset name of the stripped binary.
#[must_use]
pub fn so_asset_name(id: &str, version: &str, data: &AdditionalData) -> String {
    resolve(&RELEASE_SO_NAME_PRECEDENCE, data, || {
        format!("lib{id}_{}.so", version_underscored(version))
    })
}

/// Release asset name of the debug binary.
#[must_use]
pub fn debug_so_asset_name(id: &str, version: &str, data: &AdditionalData) -> String {
    resolve(&DEBUG_SO_NAME_PRECEDENCE, data, || {
        format!("debug_lib{id}_{}.so", version_underscored(version))
    })
}

/// Release asset name of a `.qmod`: its file name.
#[must_use]
pub fn qmod_asset_name(path: &Utf8Path) -> String {
    path.file_name().unwrap_or(path.as_str()).to_owned()
}

/// A binary input: disabled, the default build output, or a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinaryInput {
    /// Nothing to upload.
    Disabled,
    /// `build/<asset>` (or `build/debug/<asset>` for the debug binary).
    Default,
    /// An explicit path relative to the workspace.
    Path(Utf8PathBuf),
}

impl BinaryInput {
    /// Interpret an action input: `true` selects the default location,
    /// `false` or empty disables, anything else is a path.
    ///
    /// # Examples
    ///
    /// ```
    /// use qpm_action::publish::naming::BinaryInput;
    ///
    /// assert_eq!(BinaryInput::parse(""), BinaryInput::Disabled);
    /// assert_eq!(BinaryInput::parse("TRUE"), BinaryInput::Default);
    /// assert_eq!(
    ///     BinaryInput::parse("out/libmod.so"),
    ///     BinaryInput::Path("out/libmod.so".into())
    /// );
    /// ```
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("false") {
            Self::Disabled
        } else if trimmed.eq_ignore_ascii_case("true") {
            Self::Default
        } else {
            Self::Path(Utf8PathBuf::from(trimmed))
        }
    }

    /// Local file for this input, given the asset name and whether it is
    /// the debug binary. `None` when disabled.
    #[must_use]
    pub fn resolve(&self, workspace: &Utf8Path, asset: &str, debug: bool) -> Option<Utf8PathBuf> {
        match self {
            Self::Disabled => None,
            Self::Default if debug => Some(workspace.join(BUILD_DIR).join("debug").join(asset)),
            Self::Default => Some(workspace.join(BUILD_DIR).join(asset)),
            Self::Path(path) => Some(workspace.join(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn data(so: Option<&str>, debug: Option<&str>) -> AdditionalData {
        AdditionalData {
            override_so_name: so.map(str::to_owned),
            override_debug_so_name: debug.map(str::to_owned),
            ..AdditionalData::default()
        }
    }

    #[rstest]
    #[case::simple("1.2.3", "version/v1_2_3")]
    #[case::two_part("2.0", "version/v2_0")]
    #[case::prerelease("1.0.0-rc.1", "version/v1_0_0-rc_1")]
    fn branch_names(#[case] version: &str, #[case] expected: &str) {
        assert_eq!(branch_name(version), expected);
    }

    #[rstest]
    #[case::derived(None, "libmy-mod_1_2_3.so")]
    #[case::overridden(Some("libcustom.so"), "libcustom.so")]
    fn release_names(#[case] so: Option<&str>, #[case] expected: &str) {
        assert_eq!(so_asset_name("my-mod", "1.2.3", &data(so, None)), expected);
    }

    #[rstest]
    #[case::derived(None, None, "debug_libmy-mod_1_2_3.so")]
    #[case::prefixed_release_override(Some("libcustom.so"), None, "debug_libcustom.so")]
    #[case::explicit_debug(Some("libcustom.so"), Some("libdbg.so"), "libdbg.so")]
    #[case::debug_only(None, Some("libdbg.so"), "libdbg.so")]
    fn debug_names(
        #[case] so: Option<&str>,
        #[case] debug: Option<&str>,
        #[case] expected: &str,
    ) {
        assert_eq!(
            debug_so_asset_name("my-mod", "1.2.3", &data(so, debug)),
            expected
        );
    }

    #[test]
    fn precedence_lists_end_with_derived() {
        assert_eq!(RELEASE_SO_NAME_PRECEDENCE.last(), Some(&NameSource::Derived));
        assert_eq!(DEBUG_SO_NAME_PRECEDENCE.last(), Some(&NameSource::Derived));
        assert_eq!(DEBUG_SO_NAME_PRECEDENCE[0], NameSource::OverrideDebugSoName);
    }

    #[test]
    fn qmod_keeps_file_name() {
        assert_eq!(qmod_asset_name(Utf8Path::new("out/MyMod.qmod")), "MyMod.qmod");
    }

    #[rstest]
    #[case::disabled("false", None)]
    #[case::release_default("true", Some("/ws/build/libm.so"))]
    #[case::explicit("out/libm.so", Some("/ws/out/libm.so"))]
    fn resolves_release_inputs(#[case] input: &str, #[case] expected: Option<&str>) {
        let resolved = BinaryInput::parse(input).resolve(Utf8Path::new("/ws"), "libm.so", false);
        assert_eq!(resolved.as_ref().map(|path| path.as_str()), expected);
    }

    #[test]
    fn debug_default_lives_under_build_debug() {
        let resolved = BinaryInput::Default.resolve(Utf8Path::new("/ws"), "debug_libm.so", true);
        assert_eq!(
            resolved.as_ref().map(|path| path.as_str()),
            Some("/ws/build/debug/debug_libm.so")
        );
    }
}
