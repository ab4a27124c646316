//! Immutable run configuration.
//!
//! [`ActionConfig`] is built once from the parsed [`Inputs`] and handed to
//! each step by reference. [`RunnerEnv`] captures the runner-provided
//! variables; [`RunnerEnv::from_lookup`] lets tests supply them without
//! touching the process environment.

use crate::cli::{Inputs, Step};
use crate::error::{ActionError, Result};
use crate::github::RepoRef;
use crate::publish::PublishOptions;
use crate::publish::naming::BinaryInput;
use crate::resolver::{QPM_DEFAULT_BRANCH, QpmSource};
use crate::restore::RestoreOptions;
use camino::{Utf8Path, Utf8PathBuf};
use log::warn;

/// Variables the Actions runner sets for every step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerEnv {
    /// `GITHUB_REPOSITORY`, as `owner/name`.
    pub repository: Option<String>,
    /// `GITHUB_SHA`.
    pub sha: Option<String>,
    /// `GITHUB_WORKSPACE`.
    pub workspace: Option<Utf8PathBuf>,
    /// `GITHUB_PATH`.
    pub github_path: Option<Utf8PathBuf>,
    /// `RUNNER_TOOL_CACHE`.
    pub tool_cache: Option<Utf8PathBuf>,
    /// `RUNNER_TEMP`.
    pub temp: Option<Utf8PathBuf>,
}

impl RunnerEnv {
    /// Read the runner variables from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the runner variables through `lookup`. Empty values are absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use qpm_action::config::RunnerEnv;
    ///
    /// let env = RunnerEnv::from_lookup(|name| match name {
    ///     "GITHUB_SHA" => Some("abc123".to_owned()),
    ///     "GITHUB_PATH" => Some(String::new()),
    ///     _ => None,
    /// });
    /// assert_eq!(env.sha.as_deref(), Some("abc123"));
    /// assert!(env.github_path.is_none());
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let path = |name: &str| text(name).map(Utf8PathBuf::from);
        Self {
            repository: text("GITHUB_REPOSITORY"),
            sha: text("GITHUB_SHA"),
            workspace: path("GITHUB_WORKSPACE"),
            github_path: path("GITHUB_PATH"),
            tool_cache: path("RUNNER_TOOL_CACHE"),
            temp: path("RUNNER_TEMP"),
        }
    }

    /// The repository running the workflow.
    ///
    /// # Errors
    ///
    /// Returns an error if `GITHUB_REPOSITORY` is unset or malformed.
    pub fn repository(&self) -> Result<RepoRef> {
        let raw = self
            .repository
            .as_deref()
            .ok_or(ActionError::MissingEnvironment {
                name: "GITHUB_REPOSITORY",
            })?;
        Ok(raw.parse()?)
    }

    /// The commit that triggered the workflow.
    ///
    /// # Errors
    ///
    /// Returns an error if `GITHUB_SHA` is unset.
    pub fn sha(&self) -> Result<&str> {
        self.sha
            .as_deref()
            .ok_or(ActionError::MissingEnvironment { name: "GITHUB_SHA" })
    }

    /// The checkout directory; the working directory when unset.
    #[must_use]
    pub fn workspace(&self) -> &Utf8Path {
        self.workspace.as_deref().unwrap_or(Utf8Path::new("."))
    }

    /// The runner tool cache.
    ///
    /// # Errors
    ///
    /// Returns an error if `RUNNER_TOOL_CACHE` is unset.
    pub fn tool_cache(&self) -> Result<&Utf8Path> {
        self.tool_cache
            .as_deref()
            .ok_or(ActionError::MissingEnvironment {
                name: "RUNNER_TOOL_CACHE",
            })
    }
}

/// Settings for one invocation of the action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionConfig {
    /// Token for GitHub API calls and artifact downloads.
    pub workflow_token: String,
    /// Publish the package.
    pub publish: bool,
    /// Publish in the main step rather than the post step.
    pub eager_publish: bool,
    /// Version override.
    pub version: Option<String>,
    /// Release tag override.
    pub tag: Option<String>,
    /// Token for `qpm publish`; empty when not given.
    pub publish_token: String,
    /// Release binary to upload.
    pub release_bin: BinaryInput,
    /// Debug binary to upload.
    pub debug_bin: BinaryInput,
    /// `.qmod` to upload.
    pub qmod: BinaryInput,
    /// Use the dependency cache.
    pub cache: bool,
    /// Key the dependency cache on the lockfile.
    pub cache_lockfile: bool,
    /// Run `qpm restore`.
    pub restore: bool,
    /// Where QPM is installed from.
    pub qpm_source: QpmSource,
    /// Dependency cache directory override.
    pub cache_root: Option<Utf8PathBuf>,
}

fn present(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

impl ActionConfig {
    /// Build the configuration from parsed inputs.
    ///
    /// Release mode is used when `qpm_release` is set or a `qpm_version`
    /// range is given; otherwise CI builds of `qpm_ref` (default `main`).
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::MissingInput`] when `workflow_token` is absent.
    pub fn from_inputs(inputs: &Inputs) -> Result<Self> {
        let workflow_token =
            present(inputs.workflow_token.as_ref()).ok_or(ActionError::MissingInput {
                name: "workflow_token",
            })?;

        let requirement = present(inputs.qpm_version.as_ref());
        let reference = present(inputs.qpm_ref.as_ref());
        let qpm_source = if inputs.qpm_release || requirement.is_some() {
            if let Some(reference) = &reference {
                warn!("qpm_ref \"{reference}\" is ignored when installing a QPM release");
            }
            QpmSource::Release { requirement }
        } else {
            QpmSource::Bleeding {
                reference: reference.unwrap_or_else(|| QPM_DEFAULT_BRANCH.to_owned()),
            }
        };

        let binary = |value: Option<&String>| {
            value.map_or(BinaryInput::Disabled, |raw| BinaryInput::parse(raw))
        };

        Ok(Self {
            workflow_token,
            publish: inputs.publish,
            eager_publish: inputs.eager_publish,
            version: present(inputs.version.as_ref()),
            tag: present(inputs.tag.as_ref()),
            publish_token: present(inputs.publish_token.as_ref()).unwrap_or_default(),
            release_bin: binary(inputs.qpm_release_bin.as_ref()),
            debug_bin: binary(inputs.qpm_debug_bin.as_ref()),
            qmod: binary(inputs.qpm_qmod.as_ref()),
            cache: inputs.cache,
            cache_lockfile: inputs.cache_lockfile,
            restore: inputs.restore,
            qpm_source,
            cache_root: present(inputs.cache_root.as_ref()).map(Utf8PathBuf::from),
        })
    }

    /// Whether `step` publishes: the main step when eager, else the post step.
    #[must_use]
    pub fn should_publish(&self, step: Step) -> bool {
        self.publish
            && match step {
                Step::Main => self.eager_publish,
                Step::Post => !self.eager_publish,
            }
    }

    /// Restore settings for a runner on `os`.
    #[must_use]
    pub fn restore_options<'a>(&'a self, os: &'a str) -> RestoreOptions<'a> {
        RestoreOptions {
            version: self.version.as_deref(),
            cache: self.cache,
            cache_lockfile: self.cache_lockfile,
            restore: self.restore,
            os,
        }
    }

    /// Publish settings.
    #[must_use]
    pub fn publish_options(&self) -> PublishOptions<'_> {
        PublishOptions {
            version: self.version.as_deref(),
            tag: self.tag.as_deref(),
            publish_token: &self.publish_token,
            release_bin: self.release_bin.clone(),
            debug_bin: self.debug_bin.clone(),
            qmod: self.qmod.clone(),
        }
    }

    /// Secrets to mask in the run log.
    pub fn secrets(&self) -> impl Iterator<Item = &str> {
        [self.workflow_token.as_str(), self.publish_token.as_str()]
            .into_iter()
            .filter(|secret| !secret.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn inputs() -> Inputs {
        Inputs {
            workflow_token: Some("ghp_token".to_owned()),
            cache: true,
            cache_lockfile: true,
            restore: true,
            ..Inputs::default()
        }
    }

    #[rstest]
    fn missing_token_is_rejected(inputs: Inputs) {
        for token in [None, Some("  ".to_owned())] {
            let err = ActionConfig::from_inputs(&Inputs {
                workflow_token: token,
                ..inputs.clone()
            })
            .expect_err("token required");
            assert!(matches!(
                err,
                ActionError::MissingInput {
                    name: "workflow_token"
                }
            ));
        }
    }

    #[rstest]
    fn defaults_to_bleeding_main(inputs: Inputs) {
        let config = ActionConfig::from_inputs(&inputs).expect("config");
        assert_eq!(config.qpm_source, QpmSource::default());
        assert_eq!(config.release_bin, BinaryInput::Disabled);
        assert!(config.version.is_none());
        assert!(config.publish_token.is_empty());
    }

    #[rstest]
    fn qpm_ref_selects_bleeding_reference(inputs: Inputs) {
        let config = ActionConfig::from_inputs(&Inputs {
            qpm_ref: Some("0a1b2c3".to_owned()),
            ..inputs
        })
        .expect("config");
        assert_eq!(
            config.qpm_source,
            QpmSource::Bleeding {
                reference: "0a1b2c3".to_owned()
            }
        );
    }

    #[rstest]
    #[case::flag(true, None, None)]
    #[case::range(false, Some("^1.2"), Some("^1.2"))]
    #[case::flag_and_range(true, Some(">=1.0 <2"), Some(">=1.0 <2"))]
    fn release_mode_selection(
        inputs: Inputs,
        #[case] qpm_release: bool,
        #[case] qpm_version: Option<&str>,
        #[case] expected: Option<&str>,
    ) {
        let config = ActionConfig::from_inputs(&Inputs {
            qpm_release,
            qpm_version: qpm_version.map(str::to_owned),
            ..inputs
        })
        .expect("config");
        assert_eq!(
            config.qpm_source,
            QpmSource::Release {
                requirement: expected.map(str::to_owned)
            }
        );
    }

    #[rstest]
    fn empty_strings_are_absent(inputs: Inputs) {
        let config = ActionConfig::from_inputs(&Inputs {
            version: Some(String::new()),
            tag: Some(" ".to_owned()),
            qpm_version: Some(String::new()),
            cache_root: Some(String::new()),
            ..inputs
        })
        .expect("config");
        assert!(config.version.is_none());
        assert!(config.tag.is_none());
        assert!(config.cache_root.is_none());
        assert_eq!(config.qpm_source, QpmSource::default());
    }

    #[rstest]
    #[case::lazy_main(true, false, Step::Main, false)]
    #[case::lazy_post(true, false, Step::Post, true)]
    #[case::eager_main(true, true, Step::Main, true)]
    #[case::eager_post(true, true, Step::Post, false)]
    #[case::disabled(false, true, Step::Main, false)]
    fn publish_step_selection(
        inputs: Inputs,
        #[case] publish: bool,
        #[case] eager_publish: bool,
        #[case] step: Step,
        #[case] expected: bool,
    ) {
        let config = ActionConfig::from_inputs(&Inputs {
            publish,
            eager_publish,
            ..inputs
        })
        .expect("config");
        assert_eq!(config.should_publish(step), expected);
    }

    #[rstest]
    fn secrets_skip_empty_tokens(inputs: Inputs) {
        let config = ActionConfig::from_inputs(&inputs).expect("config");
        assert_eq!(config.secrets().collect::<Vec<_>>(), ["ghp_token"]);
    }

    #[rstest]
    fn options_carry_inputs(inputs: Inputs) {
        let config = ActionConfig::from_inputs(&Inputs {
            version: Some("1.2.3".to_owned()),
            qpm_qmod: Some("true".to_owned()),
            cache_lockfile: false,
            ..inputs
        })
        .expect("config");
        let restore = config.restore_options("Linux");
        assert_eq!(restore.version, Some("1.2.3"));
        assert!(!restore.cache_lockfile);
        assert_eq!(restore.os, "Linux");
        let publish = config.publish_options();
        assert_eq!(publish.version, Some("1.2.3"));
        assert_eq!(publish.qmod, BinaryInput::Default);
    }

    #[test]
    fn runner_env_reads_lookup() {
        let env = RunnerEnv::from_lookup(|name| match name {
            "GITHUB_REPOSITORY" => Some("example/example-mod".to_owned()),
            "GITHUB_WORKSPACE" => Some("/work".to_owned()),
            "RUNNER_TOOL_CACHE" => Some("/opt/hostedtoolcache".to_owned()),
            _ => None,
        });
        assert_eq!(env.repository().expect("repo").to_string(), "example/example-mod");
        assert_eq!(env.workspace(), Utf8Path::new("/work"));
        assert_eq!(
            env.tool_cache().expect("tool cache"),
            Utf8Path::new("/opt/hostedtoolcache")
        );
        assert!(matches!(
            env.sha(),
            Err(ActionError::MissingEnvironment { name: "GITHUB_SHA" })
        ));
    }

    #[test]
    fn runner_env_reads_process_environment() {
        let env = temp_env::with_vars(
            [
                ("GITHUB_SHA", Some("cafebabe")),
                ("GITHUB_WORKSPACE", None),
                ("RUNNER_TEMP", Some("")),
            ],
            RunnerEnv::from_env,
        );
        assert_eq!(env.sha().expect("sha"), "cafebabe");
        assert_eq!(env.workspace(), Utf8Path::new("."));
        assert!(env.temp.is_none());
    }

    #[test]
    fn malformed_repository_is_rejected() {
        let env = RunnerEnv {
            repository: Some("no-slash".to_owned()),
            ..RunnerEnv::default()
        };
        assert!(matches!(env.repository(), Err(ActionError::Repository(_))));
    }
}
