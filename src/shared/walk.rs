use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A single file within the artifact, with both its real path and its
/// artifact-relative, forward-slash path (the form findings report).
pub struct WalkedFile {
    pub abs_path: PathBuf,
    pub rel_path: String,
}

/// Walk every regular file under `root`, yielding both its absolute path and its
/// path relative to `root` with forward slashes (matching the spec's finding-file
/// invariant regardless of host OS).
pub fn walk_files(root: &Path) -> Vec<WalkedFile> {
    if !root.is_dir() {
        return Vec::new();
    }

    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let abs_path = entry.path().to_path_buf();
            let rel = abs_path.strip_prefix(root).ok()?;
            let rel_path = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join("/");
            Some(WalkedFile { abs_path, rel_path })
        })
        .collect()
}

/// True if the first 512 bytes of `path` contain a NUL byte (binary-by-content heuristic).
pub fn looks_binary_by_content(path: &Path) -> bool {
    use std::io::Read;
    let Ok(mut f) = std::fs::File::open(path) else {
        return false;
    };
    let mut buf = [0u8; 512];
    let Ok(n) = f.read(&mut buf) else {
        return false;
    };
    buf[..n].contains(&0)
}
