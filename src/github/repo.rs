//! Repository identity (`owner/name`).

use std::fmt;
use std::str::FromStr;

/// The repository identifier could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid repository \"{value}\"; expected owner/name")]
pub struct RepoRefError {
    /// The rejected value.
    pub value: String,
}

/// A GitHub repository, as in `GITHUB_REPOSITORY`.
///
/// # Examples
///
/// ```
/// use qpm_action::github::RepoRef;
///
/// let repo: RepoRef = "QuestPackageManager/QPM.CLI".parse().expect("valid");
/// assert_eq!(repo.owner(), "QuestPackageManager");
/// assert_eq!(repo.name(), "QPM.CLI");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    owner: String,
    name: String,
}

impl RepoRef {
    /// Build a repository reference from its parts.
    #[must_use]
    pub fn new(owner: &str, name: &str) -> Self {
        Self {
            owner: owner.to_owned(),
            name: name.to_owned(),
        }
    }

    /// Repository owner (user or organisation).
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for RepoRef {
    type Err = RepoRefError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || RepoRefError {
            value: value.to_owned(),
        };
        let (owner, name) = value.trim().split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }
        Ok(Self::new(owner, name))
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
