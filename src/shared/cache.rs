use std::path::PathBuf;

/// Returns the cache directory, creating it if needed.
pub fn cache_dir() -> PathBuf {
    let dir = dirs_or_default();
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Returns the scratch subdirectory used for tarball extraction (registry
/// artifacts, repository diff downloads). Callers are responsible for removing
/// their own subdirectory once done; this directory itself is never cleaned
/// automatically.
pub fn scratch_dir() -> PathBuf {
    let dir = cache_dir().join("scratch");
    std::fs::create_dir_all(&dir).ok();
    dir
}

fn dirs_or_default() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("regtrust")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("regtrust")
    } else {
        PathBuf::from("/tmp/regtrust-cache")
    }
}
