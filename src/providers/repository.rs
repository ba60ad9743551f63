//! Concrete implementation behind spec.md's "repository provider" interface
//! (§6): GitHub REST v3 for health metadata, codeload for the HEAD source
//! tarball. Grounded in the teacher's `shared::github::fetch_github_stars`
//! request-building style (blocking client, User-Agent, optional token,
//! timeout, graceful-None-on-error).
use serde::Deserialize;

#[derive(Deserialize)]
pub struct LicenseField {
    pub spdx_id: Option<String>,
}

#[derive(Deserialize)]
pub struct RepoResponse {
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub open_issues_count: u64,
    pub license: Option<LicenseField>,
    pub created_at: String,
    pub pushed_at: String,
    pub archived: bool,
    pub full_name: String,
}

fn authed_client(request: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
    let request = request
        .header("User-Agent", "regtrust")
        .header("Accept", "application/vnd.github.v3+json")
        .timeout(std::time::Duration::from_secs(10));

    if let Ok(token) = std::env::var("GITHUB_TOKEN") {
        if !token.is_empty() {
            return request.header("Authorization", format!("Bearer {token}"));
        }
    }
    request
}

/// Fetch repository health metadata. Returns `None` on any network, HTTP, or
/// parse error — the caller (the health probe) degrades to `{found: false}`.
pub fn fetch_repo_metadata(owner: &str, repo: &str) -> Option<RepoResponse> {
    let api_url = format!("https://api.github.com/repos/{owner}/{repo}");
    let client = reqwest::blocking::Client::new();
    let resp = authed_client(client.get(&api_url)).send().ok()?;

    if !resp.status().is_success() {
        return None;
    }

    resp.json().ok()
}

/// Download the gzipped tar stream of the HEAD revision source tree.
pub fn fetch_head_tarball(owner: &str, repo: &str) -> Result<Vec<u8>, String> {
    let tarball_url = format!("https://codeload.github.com/{owner}/{repo}/tar.gz/HEAD");
    let client = reqwest::blocking::Client::new();
    let resp = client
        .get(&tarball_url)
        .header("User-Agent", "regtrust")
        .timeout(std::time::Duration::from_secs(30))
        .send()
        .map_err(|e| format!("tarball download failed: {e}"))?;

    if !resp.status().is_success() {
        return Err(format!("tarball download failed: HTTP {}", resp.status()));
    }

    resp.bytes()
        .map(|b| b.to_vec())
        .map_err(|e| format!("failed to read tarball: {e}"))
}
