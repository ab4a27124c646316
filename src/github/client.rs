//! Blocking GitHub REST client over `ureq`.

use super::types::{ArtifactList, WorkflowRunList};
use super::{
    ApiError, Artifact, ArtifactSource, Branch, GitCommit, GitDatabase, GitRef, GitTree,
    Release, ReleaseApi, ReleaseAsset, RepoRef, TreeEntry, WorkflowRun,
};
use crate::http::{USER_AGENT, api_agent, map_ureq_error, transfer_agent};
use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use ureq::RequestBuilder;
use ureq::typestate::WithBody;

/// Public GitHub REST endpoint.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Endpoint for release asset uploads.
pub const GITHUB_UPLOADS_URL: &str = "https://uploads.github.com";

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";
const PAGE_SIZE: &str = "100";

/// Token-authenticated GitHub client.
///
/// # Examples
///
/// ```
/// use qpm_action::github::{GitHubClient, RepoRef};
///
/// let client = GitHubClient::new("ghp_example");
/// let repo = RepoRef::new("QuestPackageManager", "QPM.CLI");
/// assert_eq!(
///     client.repo_url(&repo, "releases/latest"),
///     "https://api.github.com/repos/QuestPackageManager/QPM.CLI/releases/latest"
/// );
/// ```
pub struct GitHubClient {
    token: String,
    api_base: String,
    uploads_base: String,
}

impl GitHubClient {
    /// Client for github.com.
    #[must_use]
    pub fn new(token: &str) -> Self {
        Self::with_base_urls(token, GITHUB_API_URL, GITHUB_UPLOADS_URL)
    }

    /// Client for a GitHub Enterprise host or a test server.
    #[must_use]
    pub fn with_base_urls(token: &str, api_base: &str, uploads_base: &str) -> Self {
        Self {
            token: token.to_owned(),
            api_base: api_base.trim_end_matches('/').to_owned(),
            uploads_base: uploads_base.trim_end_matches('/').to_owned(),
        }
    }

    /// URL of `path` under the repository's API root.
    #[must_use]
    pub fn repo_url(&self, repo: &RepoRef, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{path}",
            self.api_base,
            repo.owner(),
            repo.name()
        )
    }

    fn headers<B>(&self, request: RequestBuilder<B>) -> RequestBuilder<B> {
        request
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", USER_AGENT)
    }

    fn get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T, ApiError> {
        debug!("GET {url}");
        let mut request = self.headers(api_agent().get(url));
        for (key, value) in query {
            request = request.query(*key, *value);
        }
        let response = request
            .call()
            .map_err(|e| map_ureq_error("GET", url, &e))?;
        read_json("GET", url, response)
    }

    fn send<T: DeserializeOwned, P: Serialize>(
        &self,
        method: &'static str,
        request: RequestBuilder<WithBody>,
        url: &str,
        payload: &P,
    ) -> Result<T, ApiError> {
        debug!("{method} {url}");
        let response = self
            .headers(request)
            .send_json(payload)
            .map_err(|e| map_ureq_error(method, url, &e))?;
        read_json(method, url, response)
    }
}

fn read_json<T: DeserializeOwned>(
    method: &'static str,
    url: &str,
    mut response: ureq::http::Response<ureq::Body>,
) -> Result<T, ApiError> {
    response
        .body_mut()
        .read_json::<T>()
        .map_err(|e| ApiError::Body {
            method,
            url: url.to_owned(),
            reason: e.to_string(),
        })
}

impl ArtifactSource for GitHubClient {
    fn branch(&self, repo: &RepoRef, branch: &str) -> Result<Branch, ApiError> {
        self.get(&self.repo_url(repo, &format!("branches/{branch}")), &[])
    }

    fn workflow_runs(&self, repo: &RepoRef, workflow: &str) -> Result<Vec<WorkflowRun>, ApiError> {
        let url = self.repo_url(repo, &format!("actions/workflows/{workflow}/runs"));
        let list: WorkflowRunList =
            self.get(&url, &[("per_page", PAGE_SIZE), ("status", "success")])?;
        Ok(list.workflow_runs)
    }

    fn run_artifacts(&self, repo: &RepoRef, run_id: u64) -> Result<Vec<Artifact>, ApiError> {
        let url = self.repo_url(repo, &format!("actions/runs/{run_id}/artifacts"));
        let list: ArtifactList = self.get(&url, &[("per_page", PAGE_SIZE)])?;
        Ok(list.artifacts)
    }

    fn latest_release(&self, repo: &RepoRef) -> Result<Release, ApiError> {
        self.get(&self.repo_url(repo, "releases/latest"), &[])
    }

    fn releases(&self, repo: &RepoRef) -> Result<Vec<Release>, ApiError> {
        self.get(&self.repo_url(repo, "releases"), &[("per_page", PAGE_SIZE)])
    }
}

impl ReleaseApi for GitHubClient {
    fn release_by_tag(&self, repo: &RepoRef, tag: &str) -> Result<Option<Release>, ApiError> {
        match self.get(&self.repo_url(repo, &format!("releases/tags/{tag}")), &[]) {
            Ok(release) => Ok(Some(release)),
            Err(ApiError::NotFound { .. }) => Ok(None),
            Err(other) => Err(other),
        }
    }

    fn create_release(
        &self,
        repo: &RepoRef,
        tag: &str,
        target_commitish: &str,
    ) -> Result<Release, ApiError> {
        let url = self.repo_url(repo, "releases");
        let payload = json!({
            "tag_name": tag,
            "name": tag,
            "target_commitish": target_commitish,
        });
        self.send("POST", api_agent().post(&url), &url, &payload)
    }

    fn upload_asset(
        &self,
        repo: &RepoRef,
        release_id: u64,
        name: &str,
        content: &[u8],
    ) -> Result<ReleaseAsset, ApiError> {
        let url = format!(
            "{}/repos/{}/{}/releases/{release_id}/assets",
            self.uploads_base,
            repo.owner(),
            repo.name()
        );
        debug!("POST {url} ({name}, {} bytes)", content.len());
        let response = self
            .headers(transfer_agent().post(&url))
            .query("name", name)
            .header("Content-Type", "application/octet-stream")
            .send(content)
            .map_err(|e| map_ureq_error("POST", &url, &e))?;
        read_json("POST", &url, response)
    }

    fn delete_asset(&self, repo: &RepoRef, asset_id: u64) -> Result<(), ApiError> {
        let url = self.repo_url(repo, &format!("releases/assets/{asset_id}"));
        debug!("DELETE {url}");
        self.headers(api_agent().delete(&url))
            .call()
            .map_err(|e| map_ureq_error("DELETE", &url, &e))?;
        Ok(())
    }
}

impl GitDatabase for GitHubClient {
    fn commit(&self, repo: &RepoRef, sha: &str) -> Result<GitCommit, ApiError> {
        self.get(&self.repo_url(repo, &format!("git/commits/{sha}")), &[])
    }

    fn create_branch_ref(
        &self,
        repo: &RepoRef,
        branch: &str,
        sha: &str,
    ) -> Result<GitRef, ApiError> {
        let url = self.repo_url(repo, "git/refs");
        let payload = json!({ "ref": format!("refs/heads/{branch}"), "sha": sha });
        self.send("POST", api_agent().post(&url), &url, &payload)
    }

    fn create_tree(
        &self,
        repo: &RepoRef,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<GitTree, ApiError> {
        let url = self.repo_url(repo, "git/trees");
        let payload = json!({ "base_tree": base_tree, "tree": entries });
        self.send("POST", api_agent().post(&url), &url, &payload)
    }

    fn create_commit(
        &self,
        repo: &RepoRef,
        message: &str,
        tree: &str,
        parents: &[String],
    ) -> Result<GitCommit, ApiError> {
        let url = self.repo_url(repo, "git/commits");
        let payload = json!({ "message": message, "tree": tree, "parents": parents });
        self.send("POST", api_agent().post(&url), &url, &payload)
    }

    fn update_branch_ref(
        &self,
        repo: &RepoRef,
        branch: &str,
        sha: &str,
        force: bool,
    ) -> Result<GitRef, ApiError> {
        let url = self.repo_url(repo, &format!("git/refs/heads/{branch}"));
        let payload = json!({ "sha": sha, "force": force });
        self.send("PATCH", api_agent().patch(&url), &url, &payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_urls_drop_trailing_slash() {
        let client = GitHubClient::with_base_urls("t", "https://ghe.test/api/v3/", "https://ghe.test/up/");
        let repo = RepoRef::new("o", "r");
        assert_eq!(
            client.repo_url(&repo, "git/refs"),
            "https://ghe.test/api/v3/repos/o/r/git/refs"
        );
    }

    #[test]
    fn unreachable_server_maps_to_transport_error() {
        let client = GitHubClient::with_base_urls("t", "http://127.0.0.1:9", "http://127.0.0.1:9");
        let repo = RepoRef::new("o", "r");
        let err = client
            .latest_release(&repo)
            .expect_err("nothing listens on the discard port");
        assert!(matches!(err, ApiError::Transport { .. }), "{err:?}");
    }
}
