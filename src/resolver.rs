//! Resolution of the QPM build to install.
//!
//! In bleeding mode the newest successful CI run for a branch or commit is
//! located and its per-OS artifact selected; the version key is the commit
//! SHA. In release mode a published release is chosen, optionally by semver
//! range, and its per-platform zip selected; the version key is the tag.
//!
//! Resolution happens in two phases so that the tool cache can be consulted
//! between them: [`Resolver::target`] determines the version key with at
//! most one API call, and [`Resolver::locate`] finds the download only on a
//! cache miss.

use crate::error::{ActionError, Result};
use crate::github::{Artifact, ArtifactSource, Release, RepoRef, WorkflowRun};
use crate::platform::Platform;
use log::{debug, info};
use regex::Regex;
use semver::{Version, VersionReq};
use std::fmt;
use std::sync::OnceLock;

/// Tool-cache name of QPM.
pub const QPM_TOOL_NAME: &str = "qpm";

/// Owner of the repository that builds QPM.
pub const QPM_REPO_OWNER: &str = "QuestPackageManager";

/// Repository that builds QPM.
pub const QPM_REPO_NAME: &str = "QPM.CLI";

/// Workflow file whose runs upload QPM artifacts.
pub const QPM_WORKFLOW: &str = "cargo-build.yml";

/// Branch used in bleeding mode when no ref is given.
pub const QPM_DEFAULT_BRANCH: &str = "main";

/// The QPM repository.
#[must_use]
pub fn qpm_repository() -> RepoRef {
    RepoRef::new(QPM_REPO_OWNER, QPM_REPO_NAME)
}

/// Where QPM comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QpmSource {
    /// CI artifacts of the newest successful run for a branch or SHA.
    Bleeding {
        /// Branch name or (prefix of a) commit SHA.
        reference: String,
    },
    /// Published releases.
    Release {
        /// Semver range; `None` selects the latest release.
        requirement: Option<String>,
    },
}

impl Default for QpmSource {
    fn default() -> Self {
        Self::Bleeding {
            reference: QPM_DEFAULT_BRANCH.to_owned(),
        }
    }
}

/// Matches runs and artifacts against a branch name or SHA prefix.
///
/// # Examples
///
/// ```
/// use qpm_action::resolver::RefFilter;
///
/// let filter = RefFilter::new("main");
/// assert!(filter.matches(Some("main"), Some("0a1b2c")));
/// assert!(!filter.matches(Some("dev"), Some("0a1b2c")));
///
/// let by_sha = RefFilter::new("0a1b");
/// assert!(by_sha.matches(Some("dev"), Some("0a1b2c")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefFilter {
    reference: String,
}

impl RefFilter {
    /// Filter on `reference`.
    #[must_use]
    pub fn new(reference: &str) -> Self {
        Self {
            reference: reference.to_owned(),
        }
    }

    /// The branch name or SHA prefix.
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// `head_branch == ref || head_sha.starts_with(ref)`.
    #[must_use]
    pub fn matches(&self, head_branch: Option<&str>, head_sha: Option<&str>) -> bool {
        head_branch == Some(self.reference.as_str())
            || head_sha.is_some_and(|sha| sha.starts_with(&self.reference))
    }

    /// Whether the reference names a commit rather than a branch.
    #[must_use]
    pub fn is_commit_sha(&self) -> bool {
        (7..=40).contains(&self.reference.len())
            && self.reference.chars().all(|c| c.is_ascii_hexdigit())
    }
}

/// Pick the run with the highest run number among those matching `filter`.
///
/// # Errors
///
/// Returns [`ActionError::NoMatchingRun`] when no run matches.
pub fn select_latest_run<'a>(
    runs: &'a [WorkflowRun],
    filter: &RefFilter,
) -> Result<&'a WorkflowRun> {
    let mut matching: Vec<&WorkflowRun> = runs
        .iter()
        .filter(|run| filter.matches(run.head_branch.as_deref(), Some(&run.head_sha)))
        .collect();
    matching.sort_by_key(|run| run.run_number);
    matching
        .last()
        .copied()
        .ok_or_else(|| ActionError::NoMatchingRun {
            workflow: QPM_WORKFLOW.to_owned(),
            filter: filter.reference().to_owned(),
        })
}

/// Find the unexpired artifact named `name` produced for `filter`.
#[must_use]
pub fn select_artifact<'a>(
    artifacts: &'a [Artifact],
    name: &str,
    filter: &RefFilter,
) -> Option<&'a Artifact> {
    artifacts.iter().find(|artifact| {
        let (branch, sha) = artifact.workflow_run.as_ref().map_or((None, None), |run| {
            (run.head_branch.as_deref(), run.head_sha.as_deref())
        });
        artifact.name == name && !artifact.expired && filter.matches(branch, sha)
    })
}

fn version_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?").ok())
        .as_ref()
}

fn operator_gap() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"([<>=~^])\s+").ok())
        .as_ref()
}

fn hyphen_range() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\S+)\s+-\s+(\S+)$").ok())
        .as_ref()
}

/// Coerce a loosely formatted tag into a semantic version.
///
/// The first run of up to three dot-separated numbers is used and missing
/// components are zero; anything else in the tag is ignored.
///
/// # Examples
///
/// ```
/// use qpm_action::resolver::coerce_version;
/// use semver::Version;
///
/// assert_eq!(coerce_version("v1.2"), Some(Version::new(1, 2, 0)));
/// assert_eq!(coerce_version("release-3.0.1-rc"), Some(Version::new(3, 0, 1)));
/// assert_eq!(coerce_version("nightly"), None);
/// ```
#[must_use]
pub fn coerce_version(tag: &str) -> Option<Version> {
    let captures = version_pattern()?.captures(tag)?;
    let part = |index: usize| -> Option<u64> {
        captures
            .get(index)
            .map_or(Some(0), |m| m.as_str().parse().ok())
    };
    Some(Version::new(part(1)?, part(2)?, part(3)?))
}

/// A version range: one or more comparator sets joined by `||`.
///
/// A version satisfies the range when it satisfies any of the sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    alternatives: Vec<VersionReq>,
}

impl VersionRange {
    /// Whether `version` satisfies any alternative.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, req) in self.alternatives.iter().enumerate() {
            if index > 0 {
                f.write_str(" || ")?;
            }
            write!(f, "{req}")?;
        }
        Ok(())
    }
}

/// Parse an npm-style version range.
///
/// Comparators may be separated by spaces or commas, alternatives by `||`,
/// and `a - b` is an inclusive range. A version without an operator pins
/// that version (`1.4.0` is exactly 1.4.0, `1.4` is any 1.4.x), and `x`
/// or `*` components are wildcards.
///
/// # Errors
///
/// Returns [`ActionError::InvalidRequirement`] if the range is malformed.
///
/// # Examples
///
/// ```
/// use qpm_action::resolver::parse_requirement;
/// use semver::Version;
///
/// let range = parse_requirement("1.4.0 || >=2.0.0 <3.0.0").expect("range");
/// assert!(range.matches(&Version::new(1, 4, 0)));
/// assert!(!range.matches(&Version::new(1, 9, 0)));
/// assert!(range.matches(&Version::new(2, 5, 0)));
/// ```
pub fn parse_requirement(requirement: &str) -> Result<VersionRange> {
    let alternatives = requirement
        .split("||")
        .map(|alternative| {
            let comparators = comparators(alternative);
            let normalised = if comparators.is_empty() {
                "*".to_owned()
            } else {
                comparators.join(", ")
            };
            VersionReq::parse(&normalised).map_err(|e| ActionError::InvalidRequirement {
                requirement: requirement.to_owned(),
                reason: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(VersionRange { alternatives })
}

/// Translate one `||` alternative into `semver` comparators. Wildcard-only
/// comparators are dropped since they constrain nothing.
fn comparators(alternative: &str) -> Vec<String> {
    let trimmed = alternative.trim();
    if let Some(bounds) = hyphen_range().and_then(|re| re.captures(trimmed)) {
        let bound = |index: usize| bounds.get(index).map_or("", |m| m.as_str());
        return [format!(">={}", bound(1)), format!("<={}", bound(2))]
            .iter()
            .filter_map(|token| comparator(token))
            .collect();
    }
    let joined = operator_gap().map_or_else(
        || trimmed.to_owned(),
        |gap| gap.replace_all(trimmed, "$1").into_owned(),
    );
    joined
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .filter_map(comparator)
        .collect()
}

fn comparator(token: &str) -> Option<String> {
    let split = token
        .find(|c: char| !matches!(c, '<' | '>' | '=' | '~' | '^'))
        .unwrap_or(token.len());
    let (op, version) = token.split_at(split);
    let version = version.trim_start_matches(['v', 'V']);
    let concrete: Vec<&str> = version
        .split('.')
        .take_while(|part| !matches!(*part, "x" | "X" | "*"))
        .collect();
    if concrete.is_empty() {
        return None;
    }
    let op = if op.is_empty() { "=" } else { op };
    Some(format!("{op}{}", concrete.join(".")))
}

/// Pick the non-draft release with the highest semantic version whose
/// coerced tag satisfies `requirement`.
///
/// Selection is by version, not by the order the API lists releases or by
/// tag text, so `v1.10.0` wins over `v1.9.0`. Equal versions fall back to
/// the lexicographically greater tag.
#[must_use]
pub fn select_release<'a>(
    releases: &'a [Release],
    requirement: &VersionRange,
) -> Option<&'a Release> {
    releases
        .iter()
        .filter(|release| !release.draft)
        .filter_map(|release| coerce_version(&release.tag_name).map(|v| (v, release)))
        .filter(|(version, _)| requirement.matches(version))
        .max_by(|(a, ra), (b, rb)| a.cmp(b).then_with(|| ra.tag_name.cmp(&rb.tag_name)))
        .map(|(_, release)| release)
}

/// The QPM build chosen by [`Resolver::target`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolTarget {
    /// Tool-cache key: commit SHA (bleeding) or tag (release).
    pub version_key: String,
    kind: TargetKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TargetKind {
    Bleeding(RefFilter),
    Release(Box<Release>),
}

/// Where to fetch the chosen build from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDownload {
    /// Archive URL.
    pub url: String,
    /// Whether the URL requires the workflow token.
    pub authenticated: bool,
    /// Artifact or asset name, for logging.
    pub asset_name: String,
}

/// Locates QPM builds through an [`ArtifactSource`].
pub struct Resolver<'a> {
    api: &'a dyn ArtifactSource,
    repo: RepoRef,
    source: QpmSource,
    platform: Platform,
}

impl<'a> Resolver<'a> {
    /// Create a resolver for `source` on `platform`.
    #[must_use]
    pub fn new(
        api: &'a dyn ArtifactSource,
        repo: RepoRef,
        source: QpmSource,
        platform: Platform,
    ) -> Self {
        Self {
            api,
            repo,
            source,
            platform,
        }
    }

    /// The platform builds are resolved for.
    #[must_use]
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Determine which build to install and its version key.
    ///
    /// # Errors
    ///
    /// Returns an error if the branch or release cannot be fetched, the
    /// requirement is malformed, or no release satisfies it.
    pub fn target(&self) -> Result<ToolTarget> {
        match &self.source {
            QpmSource::Bleeding { reference } => {
                let filter = RefFilter::new(reference);
                let version_key = if filter.is_commit_sha() {
                    reference.clone()
                } else {
                    self.api.branch(&self.repo, reference)?.commit.sha
                };
                info!("QPM bleeding build for {reference} at {version_key}");
                Ok(ToolTarget {
                    version_key,
                    kind: TargetKind::Bleeding(filter),
                })
            }
            QpmSource::Release { requirement } => {
                let release = self.release(requirement.as_deref())?;
                info!("QPM release {}", release.tag_name);
                Ok(ToolTarget {
                    version_key: release.tag_name.clone(),
                    kind: TargetKind::Release(Box::new(release)),
                })
            }
        }
    }

    fn release(&self, requirement: Option<&str>) -> Result<Release> {
        let Some(requirement) = requirement else {
            return Ok(self.api.latest_release(&self.repo)?);
        };
        let range = parse_requirement(requirement)?;
        let releases = self.api.releases(&self.repo)?;
        debug!("{} releases to match against {range}", releases.len());
        select_release(&releases, &range)
            .cloned()
            .ok_or_else(|| ActionError::ReleaseNotFound {
                requirement: requirement.to_owned(),
            })
    }

    /// Find the archive for `target`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::NoMatchingRun`], [`ActionError::ArtifactNotFound`]
    /// or [`ActionError::ReleaseAssetNotFound`] when nothing matches, or an
    /// API error.
    pub fn locate(&self, target: &ToolTarget) -> Result<ToolDownload> {
        match &target.kind {
            TargetKind::Bleeding(filter) => self.locate_artifact(filter),
            TargetKind::Release(release) => self.locate_asset(release),
        }
    }

    fn locate_artifact(&self, filter: &RefFilter) -> Result<ToolDownload> {
        let runs = self.api.workflow_runs(&self.repo, QPM_WORKFLOW)?;
        let run = select_latest_run(&runs, filter)?;
        debug!("selected {QPM_WORKFLOW} run #{} ({})", run.run_number, run.id);

        let name = self.platform.artifact_name();
        let artifacts = self.api.run_artifacts(&self.repo, run.id)?;
        let artifact = select_artifact(&artifacts, &name, filter).ok_or_else(|| {
            ActionError::ArtifactNotFound {
                name: name.clone(),
                run_id: run.id,
                filter: filter.reference().to_owned(),
            }
        })?;
        Ok(ToolDownload {
            url: artifact.archive_download_url.clone(),
            authenticated: true,
            asset_name: name,
        })
    }

    fn locate_asset(&self, release: &Release) -> Result<ToolDownload> {
        let name = self.platform.release_asset_name();
        let asset = release
            .assets
            .iter()
            .find(|asset| asset.name == name)
            .ok_or_else(|| ActionError::ReleaseAssetNotFound {
                tag: release.tag_name.clone(),
                asset: name.clone(),
            })?;
        Ok(ToolDownload {
            url: asset.browser_download_url.clone(),
            authenticated: false,
            asset_name: name,
        })
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
