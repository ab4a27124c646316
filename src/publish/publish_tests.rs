//! Unit tests for the publish protocol.

use super::*;
use crate::test_utils::{
    ExpectedCall, FakeGitHub, StubExecutor, output_with_stdout, sample_manifest,
    sample_shared_manifest,
};
use camino::Utf8PathBuf;
use qpm_action_common::AdditionalData;
use tempfile::TempDir;

const SHA: &str = "deadbeef";

fn workspace(shared_version: &str) -> (TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().expect("temp dir");
    let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
    std::fs::write(root.join(QPM_MANIFEST), sample_manifest(shared_version)).expect("write");
    std::fs::write(
        root.join(QPM_SHARED_MANIFEST),
        sample_shared_manifest(shared_version),
    )
    .expect("write");
    (temp, root)
}

fn options() -> PublishOptions<'static> {
    PublishOptions {
        version: None,
        tag: None,
        publish_token: "",
        release_bin: BinaryInput::Disabled,
        debug_bin: BinaryInput::Disabled,
        qmod: BinaryInput::Disabled,
    }
}

fn publish_call(token: &'static str) -> ExpectedCall {
    ExpectedCall {
        cmd: "qpm",
        args: vec!["publish", token],
        result: Ok(output_with_stdout("published\n")),
    }
}

fn shared_data(root: &Utf8Path) -> AdditionalData {
    let shared: QpmSharedPackage =
        read_manifest(root.join(QPM_SHARED_MANIFEST).as_std_path()).expect("read shared");
    shared.config.info.additional_data
}

#[test]
fn explicit_version_overrides_manifest() {
    let (_temp, root) = workspace("");
    let github = FakeGitHub::new();
    let executor = StubExecutor::new(vec![publish_call("")]);
    let qpm = Qpm::new(Utf8Path::new("qpm"), &executor);
    let repo = RepoRef::new("example", "example-mod");
    let ctx = PublishContext {
        workspace: &root,
        repo: &repo,
        sha: SHA,
        releases: &github,
        git: &github,
        qpm: &qpm,
    };
    let opts = PublishOptions {
        version: Some("2.0.0"),
        ..options()
    };

    let outcome = run_publish(&ctx, &opts).expect("publish");

    assert_eq!(outcome.branch, "version/v2_0_0");
    assert_eq!(outcome.tag, "2.0.0");
    assert_eq!(outcome.branch_creation, BranchCreation::Created);
    assert_eq!(github.branch_head("version/v2_0_0"), Some(outcome.commit_sha.clone()));
    assert_eq!(shared_data(&root).branch_name.as_deref(), Some("version/v2_0_0"));
    executor.assert_finished();
}

#[test]
fn missing_version_fails_before_remote_calls() {
    let (_temp, root) = workspace("");
    let github = FakeGitHub::new();
    let executor = StubExecutor::new(vec![]);
    let qpm = Qpm::new(Utf8Path::new("qpm"), &executor);
    let repo = RepoRef::new("example", "example-mod");
    let ctx = PublishContext {
        workspace: &root,
        repo: &repo,
        sha: SHA,
        releases: &github,
        git: &github,
        qpm: &qpm,
    };

    let err = run_publish(&ctx, &options()).expect_err("no version");

    assert!(matches!(err, ActionError::MissingVersion));
    assert!(github.calls().is_empty());
}

#[test]
fn uploads_binaries_and_records_links() {
    let (_temp, root) = workspace("1.0.0");
    std::fs::create_dir_all(root.join("build").join("debug")).expect("mkdir");
    std::fs::write(root.join("build").join("libexample-mod.so"), b"so").expect("write");
    std::fs::write(
        root.join("build").join("debug").join("debug_libexample-mod.so"),
        b"dbg",
    )
    .expect("write");
    std::fs::write(root.join("Example.qmod"), b"qmod").expect("write");

    let github = FakeGitHub::new().with_release("v1.0.0", &["libexample-mod.so"]);
    let executor = StubExecutor::new(vec![publish_call("tok")]);
    let qpm = Qpm::new(Utf8Path::new("qpm"), &executor);
    let repo = RepoRef::new("example", "example-mod");
    let ctx = PublishContext {
        workspace: &root,
        repo: &repo,
        sha: SHA,
        releases: &github,
        git: &github,
        qpm: &qpm,
    };
    let opts = PublishOptions {
        tag: Some("v1.0.0"),
        publish_token: "tok",
        release_bin: BinaryInput::Default,
        debug_bin: BinaryInput::Default,
        qmod: BinaryInput::parse("Example.qmod"),
        ..options()
    };

    let outcome = run_publish(&ctx, &opts).expect("publish");

    assert_eq!(outcome.tag, "v1.0.0");
    let data = shared_data(&root);
    assert_eq!(
        data.so_link.as_deref(),
        Some("https://github.test/releases/download/v1.0.0/libexample-mod.so")
    );
    assert_eq!(
        data.debug_so_link.as_deref(),
        Some("https://github.test/releases/download/v1.0.0/debug_libexample-mod.so")
    );
    assert_eq!(
        data.mod_link.as_deref(),
        Some("https://github.test/releases/download/v1.0.0/Example.qmod")
    );

    let release = github.release("v1.0.0").expect("release");
    assert_eq!(release.assets.len(), 3);
    assert!(github.calls().contains(&"delete_asset".to_owned()));
    assert!(!github.calls().contains(&"create_release".to_owned()));
}

#[test]
fn committed_tree_matches_written_manifests() {
    let (_temp, root) = workspace("3.1.4");
    let github = FakeGitHub::new();
    let executor = StubExecutor::new(vec![publish_call("")]);
    let qpm = Qpm::new(Utf8Path::new("qpm"), &executor);
    let repo = RepoRef::new("example", "example-mod");
    let ctx = PublishContext {
        workspace: &root,
        repo: &repo,
        sha: SHA,
        releases: &github,
        git: &github,
        qpm: &qpm,
    };

    run_publish(&ctx, &options()).expect("publish");

    let tree = github.last_tree();
    let paths: Vec<&str> = tree.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, [QPM_MANIFEST, QPM_SHARED_MANIFEST]);
    let on_disk = std::fs::read_to_string(root.join(QPM_SHARED_MANIFEST)).expect("read");
    assert_eq!(tree[1].content, on_disk);
}

#[test]
fn failing_qpm_publish_is_reported_after_commit() {
    let (_temp, root) = workspace("1.0.0");
    let github = FakeGitHub::new();
    let executor = StubExecutor::new(vec![ExpectedCall {
        cmd: "qpm",
        args: vec!["publish", ""],
        result: Ok(crate::test_utils::failure_output("unauthorised")),
    }]);
    let qpm = Qpm::new(Utf8Path::new("qpm"), &executor);
    let repo = RepoRef::new("example", "example-mod");
    let ctx = PublishContext {
        workspace: &root,
        repo: &repo,
        sha: SHA,
        releases: &github,
        git: &github,
        qpm: &qpm,
    };

    let err = run_publish(&ctx, &options()).expect_err("qpm fails");

    assert!(matches!(err, ActionError::ProcessFailed { .. }));
    assert!(github.branch_head("version/v1_0_0").is_some());
}

#[test]
fn resolve_version_prefers_explicit_non_empty_value() {
    let shared: QpmSharedPackage =
        serde_json::from_str(&sample_shared_manifest("1.0.0")).expect("parse");
    assert_eq!(resolve_version(Some("2.0.0"), &shared).expect("v"), "2.0.0");
    assert_eq!(resolve_version(Some("  "), &shared).expect("v"), "1.0.0");
    assert_eq!(resolve_version(None, &shared).expect("v"), "1.0.0");
}
