use crate::providers::repository;
use crate::shared::models::RepositoryHealth;
use regex::Regex;
use std::sync::LazyLock;

const CANONICAL_HOST: &str = "github.com";

static HOST_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:git\+)?(?:https?|git|ssh)://(?:[^@/]+@)?([^/]+)/([^/\s#?.]+)/([^/\s#?.]+?)(?:\.git)?/?(?:[#?].*)?$").unwrap()
});

static SHORTHAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(github):([^/\s]+)/([^/\s#?.]+?)(?:\.git)?$").unwrap());

/// Parse any of the URL shapes the spec's repository URL field may arrive in.
/// Returns `(owner, repo)` only for canonical-host (github.com) URLs.
pub fn parse_repository_url(url: &str) -> Option<(String, String)> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }

    if let Some(caps) = HOST_URL_RE.captures(url) {
        let host = caps[1].to_lowercase();
        if host != CANONICAL_HOST {
            return None;
        }
        return Some((caps[2].to_string(), caps[3].to_string()));
    }

    if let Some(caps) = SHORTHAND_RE.captures(url) {
        return Some((caps[2].to_string(), caps[3].to_string()));
    }

    None
}

/// Query the repository provider for health signals. Never fatal: any parse or
/// network failure degrades to `RepositoryHealth::not_found()`.
pub fn probe(repository_url: &str, publisher: Option<&str>, has_provenance: bool) -> RepositoryHealth {
    if repository_url.is_empty() {
        return RepositoryHealth::not_found();
    }

    let Some((owner, repo)) = parse_repository_url(repository_url) else {
        eprintln!("regtrust: warning: repository URL '{repository_url}' could not be parsed, skipping health probe");
        return RepositoryHealth::not_found();
    };

    let Some(data) = repository::fetch_repo_metadata(&owner, &repo) else {
        eprintln!("regtrust: warning: repository health fetch for {owner}/{repo} failed, skipping");
        return RepositoryHealth::not_found();
    };

    let publisher_matches_owner = publisher
        .map(|p| p.eq_ignore_ascii_case(&owner))
        .unwrap_or(false);

    RepositoryHealth {
        found: true,
        owner: data.full_name.split('/').next().unwrap_or(&owner).to_string(),
        repo: data.full_name.split('/').nth(1).unwrap_or(&repo).to_string(),
        stars: data.stargazers_count,
        forks: data.forks_count,
        open_issues: data.open_issues_count,
        license: data.license.and_then(|l| l.spdx_id),
        created_at: crate::shared::time::parse_rfc3339_to_unix(&data.created_at),
        pushed_at: crate::shared::time::parse_rfc3339_to_unix(&data.pushed_at),
        archived: data.archived,
        publisher_matches_owner,
        has_provenance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_standard_https_url() {
        let (owner, repo) = parse_repository_url("https://github.com/user/project").unwrap();
        assert_eq!(owner, "user");
        assert_eq!(repo, "project");
    }

    #[test]
    fn parse_git_plus_ssh_url() {
        let (owner, repo) = parse_repository_url("git+https://github.com/user/project.git").unwrap();
        assert_eq!(owner, "user");
        assert_eq!(repo, "project");
    }

    #[test]
    fn parse_git_protocol_url() {
        let (owner, repo) = parse_repository_url("git://github.com/user/project.git").unwrap();
        assert_eq!(owner, "user");
        assert_eq!(repo, "project");
    }

    #[test]
    fn parse_shorthand() {
        let (owner, repo) = parse_repository_url("github:user/project").unwrap();
        assert_eq!(owner, "user");
        assert_eq!(repo, "project");
    }

    #[test]
    fn non_canonical_host_is_rejected() {
        assert!(parse_repository_url("https://gitlab.com/user/project").is_none());
    }

    #[test]
    fn empty_url_returns_none() {
        assert!(parse_repository_url("").is_none());
    }
}
