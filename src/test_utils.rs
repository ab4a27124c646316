//! Shared test utilities for the action crate.
//!
//! Exposed to integration tests through the `test-support` feature.

use crate::cache::{CacheError, DependencyCache};
use crate::error::{ActionError, Result};
use crate::github::{
    ApiError, GitCommit, GitDatabase, GitRef, GitTree, ObjectRef, Release, ReleaseApi,
    ReleaseAsset, RepoRef, TreeEntry,
};
use crate::process::CommandExecutor;
use camino::Utf8Path;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code.unsigned_abs())
}

/// Creates a successful command `Output` with the given stdout.
pub fn output_with_stdout(stdout: &str) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The command to execute (e.g., "qpm").
    pub cmd: &'static str,
    /// The arguments to pass to the command.
    pub args: Vec<&'static str>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Returns predefined results for an expected sequence of invocations and
/// reports [`ActionError::StubMismatch`] for anything else.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
        }
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        let call = self
            .expected
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| ActionError::StubMismatch {
                message: format!("unexpected invocation: {cmd} {}", args.join(" ")),
            })?;

        if call.cmd != cmd || call.args.as_slice() != args {
            return Err(ActionError::StubMismatch {
                message: format!(
                    "expected `{} {}`, got `{cmd} {}`",
                    call.cmd,
                    call.args.join(" "),
                    args.join(" ")
                ),
            });
        }
        call.result
    }
}

/// A `qpm.json` for package `example-mod` at `version`.
pub fn sample_manifest(version: &str) -> String {
    format!(
        r#"{{
  "sharedDir": "shared",
  "dependenciesDir": "extern",
  "info": {{
    "name": "Example Mod",
    "id": "example-mod",
    "version": "{version}",
    "url": "https://github.com/example/example-mod",
    "additionalData": {{
      "overrideSoName": "libexample-mod.so",
      "cmake": true
    }}
  }},
  "workspace": {{ "scripts": {{}} }},
  "dependencies": [
    {{ "id": "beatsaber-hook", "versionRange": "^6.0.0", "additionalData": {{}} }}
  ]
}}"#
    )
}

/// A `qpm.shared.json` wrapping [`sample_manifest`].
pub fn sample_shared_manifest(version: &str) -> String {
    format!(
        r#"{{
  "config": {},
  "restoredDependencies": [
    {{ "dependency": {{ "id": "beatsaber-hook", "versionRange": "=6.4.1" }}, "version": "6.4.1" }}
  ]
}}"#,
        sample_manifest(version)
    )
}

/// In-memory dependency cache recording every call.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RefCell<BTreeSet<String>>,
    calls: RefCell<Vec<String>>,
}

impl MemoryCache {
    /// A cache holding entries for `keys`.
    pub fn with_entries(keys: &[&str]) -> Self {
        let cache = Self::default();
        cache
            .entries
            .borrow_mut()
            .extend(keys.iter().map(|k| (*k).to_owned()));
        cache
    }

    /// Calls so far, as `restore <key>` / `save <key>`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Whether an entry exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains(key)
    }
}

impl DependencyCache for MemoryCache {
    fn restore(&self, _path: &Utf8Path, key: &str) -> std::result::Result<Option<String>, CacheError> {
        self.calls.borrow_mut().push(format!("restore {key}"));
        Ok(self.contains(key).then(|| key.to_owned()))
    }

    fn save(&self, _path: &Utf8Path, key: &str) -> std::result::Result<(), CacheError> {
        self.calls.borrow_mut().push(format!("save {key}"));
        self.entries.borrow_mut().insert(key.to_owned());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct FakeState {
    next_id: u64,
    releases: Vec<Release>,
    refs: BTreeMap<String, String>,
    trees: Vec<Vec<TreeEntry>>,
    calls: Vec<String>,
}

impl FakeState {
    fn id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory GitHub holding releases, branches and Git objects.
#[derive(Debug, Default)]
pub struct FakeGitHub {
    state: RefCell<FakeState>,
}

impl FakeGitHub {
    /// An empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a branch pointing at `sha`.
    #[must_use]
    pub fn with_branch(self, branch: &str, sha: &str) -> Self {
        self.state
            .borrow_mut()
            .refs
            .insert(branch.to_owned(), sha.to_owned());
        self
    }

    /// Add a release for `tag` with assets named `assets`.
    #[must_use]
    pub fn with_release(self, tag: &str, assets: &[&str]) -> Self {
        {
            let mut state = self.state.borrow_mut();
            let id = state.id();
            let assets = assets
                .iter()
                .map(|name| ReleaseAsset {
                    id: state.id(),
                    name: (*name).to_owned(),
                    browser_download_url: download_url(tag, name),
                })
                .collect();
            state.releases.push(Release {
                id,
                tag_name: tag.to_owned(),
                draft: false,
                assets,
            });
        }
        self
    }

    /// API calls so far, e.g. `create_tree`.
    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    /// The SHA `branch` points at.
    pub fn branch_head(&self, branch: &str) -> Option<String> {
        self.state.borrow().refs.get(branch).cloned()
    }

    /// The release for `tag`.
    pub fn release(&self, tag: &str) -> Option<Release> {
        self.state
            .borrow()
            .releases
            .iter()
            .find(|r| r.tag_name == tag)
            .cloned()
    }

    /// Entries of the most recently created tree.
    pub fn last_tree(&self) -> Vec<TreeEntry> {
        self.state.borrow().trees.last().cloned().unwrap_or_default()
    }

    fn record(&self, call: &str) {
        self.state.borrow_mut().calls.push(call.to_owned());
    }
}

fn download_url(tag: &str, name: &str) -> String {
    format!("https://github.test/releases/download/{tag}/{name}")
}

impl ReleaseApi for FakeGitHub {
    fn release_by_tag(&self, _repo: &RepoRef, tag: &str) -> std::result::Result<Option<Release>, ApiError> {
        self.record("release_by_tag");
        Ok(self.release(tag))
    }

    fn create_release(
        &self,
        _repo: &RepoRef,
        tag: &str,
        _target_commitish: &str,
    ) -> std::result::Result<Release, ApiError> {
        self.record("create_release");
        let mut state = self.state.borrow_mut();
        let release = Release {
            id: state.id(),
            tag_name: tag.to_owned(),
            draft: false,
            assets: Vec::new(),
        };
        state.releases.push(release.clone());
        Ok(release)
    }

    fn upload_asset(
        &self,
        _repo: &RepoRef,
        release_id: u64,
        name: &str,
        _content: &[u8],
    ) -> std::result::Result<ReleaseAsset, ApiError> {
        self.record("upload_asset");
        let mut state = self.state.borrow_mut();
        let id = state.id();
        let release = state
            .releases
            .iter_mut()
            .find(|r| r.id == release_id)
            .ok_or_else(|| ApiError::NotFound {
                method: "POST",
                url: format!("releases/{release_id}/assets"),
            })?;
        let asset = ReleaseAsset {
            id,
            name: name.to_owned(),
            browser_download_url: download_url(&release.tag_name, name),
        };
        release.assets.push(asset.clone());
        Ok(asset)
    }

    fn delete_asset(&self, _repo: &RepoRef, asset_id: u64) -> std::result::Result<(), ApiError> {
        self.record("delete_asset");
        for release in &mut self.state.borrow_mut().releases {
            release.assets.retain(|a| a.id != asset_id);
        }
        Ok(())
    }
}

impl GitDatabase for FakeGitHub {
    fn commit(&self, _repo: &RepoRef, sha: &str) -> std::result::Result<GitCommit, ApiError> {
        self.record("get_commit");
        Ok(GitCommit {
            sha: sha.to_owned(),
            tree: ObjectRef {
                sha: format!("{sha}-tree"),
            },
        })
    }

    fn create_branch_ref(
        &self,
        _repo: &RepoRef,
        branch: &str,
        sha: &str,
    ) -> std::result::Result<GitRef, ApiError> {
        self.record("create_ref");
        let mut state = self.state.borrow_mut();
        if state.refs.contains_key(branch) {
            return Err(ApiError::Status {
                method: "POST",
                url: "git/refs".to_owned(),
                status: 422,
            });
        }
        state.refs.insert(branch.to_owned(), sha.to_owned());
        Ok(git_ref(branch, sha))
    }

    fn create_tree(
        &self,
        _repo: &RepoRef,
        _base_tree: &str,
        entries: &[TreeEntry],
    ) -> std::result::Result<GitTree, ApiError> {
        self.record("create_tree");
        let mut state = self.state.borrow_mut();
        state.trees.push(entries.to_vec());
        Ok(GitTree {
            sha: format!("tree-{}", state.trees.len()),
        })
    }

    fn create_commit(
        &self,
        _repo: &RepoRef,
        _message: &str,
        tree: &str,
        _parents: &[String],
    ) -> std::result::Result<GitCommit, ApiError> {
        self.record("create_commit");
        let id = self.state.borrow_mut().id();
        Ok(GitCommit {
            sha: format!("commit-{id}"),
            tree: ObjectRef {
                sha: tree.to_owned(),
            },
        })
    }

    fn update_branch_ref(
        &self,
        _repo: &RepoRef,
        branch: &str,
        sha: &str,
        force: bool,
    ) -> std::result::Result<GitRef, ApiError> {
        self.record(if force { "force_update_ref" } else { "update_ref" });
        self.state
            .borrow_mut()
            .refs
            .insert(branch.to_owned(), sha.to_owned());
        Ok(git_ref(branch, sha))
    }
}

fn git_ref(branch: &str, sha: &str) -> GitRef {
    GitRef {
        name: format!("refs/heads/{branch}"),
        object: ObjectRef {
            sha: sha.to_owned(),
        },
    }
}
