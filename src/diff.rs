use crate::health;
use crate::path_classifier;
use crate::providers::repository;
use crate::shared::models::DiffResult;
use crate::shared::walk::walk_files;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

/// Paths that always differ between a published artifact and its source repo
/// and are therefore excluded from the modified-file hash comparison.
const ALWAYS_DIFFER: &[&str] = &[
    "package.json",
    ".npmignore",
    ".gitignore",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
];

/// Download the repository's HEAD source tree, extract it, and compare its file
/// list and content hashes against the published artifact. Never fatal: any
/// failure at any step produces `{performed: false, error}`, and the scratch
/// directory is always removed.
pub fn diff_against_repository(
    repository_url: &str,
    artifact_root: &Path,
    scratch_base: &Path,
) -> DiffResult {
    let Some((owner, repo)) = health::parse_repository_url(repository_url) else {
        eprintln!("regtrust: warning: repository URL '{repository_url}' could not be parsed, skipping diff");
        return DiffResult::not_performed("repository URL could not be parsed");
    };

    let scratch_dir = scratch_base.join(format!("{owner}-{repo}-{}", std::process::id()));
    let result = run_diff(&owner, &repo, artifact_root, &scratch_dir);
    std::fs::remove_dir_all(&scratch_dir).ok();
    result
}

fn run_diff(owner: &str, repo: &str, artifact_root: &Path, scratch_dir: &Path) -> DiffResult {
    if let Err(e) = std::fs::create_dir_all(scratch_dir) {
        eprintln!("regtrust: warning: failed to create scratch directory for diff: {e}");
        return DiffResult::not_performed(format!("failed to create scratch directory: {e}"));
    }

    let bytes = match repository::fetch_head_tarball(owner, repo) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("regtrust: warning: {e}, skipping diff");
            return DiffResult::not_performed(e);
        }
    };

    let gz = flate2::read::GzDecoder::new(&bytes[..]);
    let mut archive = tar::Archive::new(gz);
    if let Err(e) = archive.unpack(scratch_dir) {
        eprintln!("regtrust: warning: failed to extract repository tarball: {e}");
        return DiffResult::not_performed(format!("failed to extract tarball: {e}"));
    }

    let repo_root = match locate_single_top_level_dir(scratch_dir) {
        Some(dir) => dir,
        None => scratch_dir.to_path_buf(),
    };

    let artifact_files = collect_relevant_paths(artifact_root);
    let repo_files = collect_relevant_paths(&repo_root);

    let artifact_set: BTreeSet<&String> = artifact_files.iter().collect();
    let repo_set: BTreeSet<&String> = repo_files.iter().collect();
    let repo_ts_paths: HashSet<String> = repo_files
        .iter()
        .filter(|p| p.ends_with(".ts") || p.ends_with(".tsx") || p.ends_with(".mts") || p.ends_with(".cts"))
        .cloned()
        .collect();

    let mut unexpected_files = Vec::new();
    let mut expected_build_files = Vec::new();

    for path in artifact_set.difference(&repo_set) {
        if path_classifier::is_build_artifact(path, &repo_ts_paths) {
            expected_build_files.push((*path).clone());
        } else {
            unexpected_files.push((*path).clone());
        }
    }
    unexpected_files.sort();
    expected_build_files.sort();

    let mut modified_files = Vec::new();
    for path in artifact_set.intersection(&repo_set) {
        if ALWAYS_DIFFER.contains(&path.as_str()) {
            continue;
        }
        let artifact_file = artifact_root.join(path);
        let repo_file = repo_root.join(path);
        match (hash_file(&artifact_file), hash_file(&repo_file)) {
            (Some(a), Some(r)) if a != r => modified_files.push((*path).clone()),
            _ => {}
        }
    }
    modified_files.sort();

    DiffResult {
        performed: true,
        unexpected_files,
        expected_build_files,
        modified_files,
        error: None,
    }
}

fn locate_single_top_level_dir(extract_root: &Path) -> Option<PathBuf> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(extract_root)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();

    if entries.len() == 1 && entries[0].is_dir() {
        return entries.pop();
    }
    None
}

fn collect_relevant_paths(root: &Path) -> Vec<String> {
    if !root.is_dir() {
        return Vec::new();
    }
    walk_files(root)
        .into_iter()
        .filter(|f| !is_hidden_or_dependency_path(&f.rel_path))
        .map(|f| f.rel_path)
        .collect()
}

fn is_hidden_or_dependency_path(rel_path: &str) -> bool {
    rel_path.split('/').any(|segment| {
        segment.starts_with('.') || segment == "node_modules"
    })
}

fn hash_file(path: &Path) -> Option<[u8; 32]> {
    let bytes = std::fs::read(path).ok()?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Some(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tmp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("regtrust-diff-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn bad_repository_url_is_not_performed() {
        let result = diff_against_repository("not a url", Path::new("/tmp"), Path::new("/tmp"));
        assert!(!result.performed);
        assert!(result.error.is_some());
    }

    #[test]
    fn hidden_and_dependency_paths_are_excluded() {
        assert!(is_hidden_or_dependency_path(".git/config"));
        assert!(is_hidden_or_dependency_path("node_modules/foo/index.js"));
        assert!(!is_hidden_or_dependency_path("src/index.js"));
    }

    #[test]
    fn identical_files_hash_equal() {
        let dir = tmp_dir("hash");
        let a = dir.join("a.txt");
        let b = dir.join("b.txt");
        fs::write(&a, "same content").unwrap();
        fs::write(&b, "same content").unwrap();
        assert_eq!(hash_file(&a), hash_file(&b));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn different_files_hash_differently() {
        let dir = tmp_dir("hashdiff");
        let a = dir.join("a.txt");
        let b = dir.join("b.txt");
        fs::write(&a, "content one").unwrap();
        fs::write(&b, "content two").unwrap();
        assert_ne!(hash_file(&a), hash_file(&b));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn single_top_level_dir_is_located() {
        let dir = tmp_dir("toplevel");
        fs::create_dir_all(dir.join("repo-abc123")).unwrap();
        let found = locate_single_top_level_dir(&dir).unwrap();
        assert_eq!(found, dir.join("repo-abc123"));
        fs::remove_dir_all(&dir).ok();
    }
}
