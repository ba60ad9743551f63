use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

const TEST_DIR_SEGMENTS: &[&str] = &["__tests__", "tests", "test", "fixtures", "__fixtures__", "__mocks__"];
const NESTED_DEP_DIR: &str = "node_modules";
const BUILD_OUTPUT_DIRS: &[&str] = &[
    "dist", "lib", "build", ".next", "out", "prebuilds", "compiled", "esm", "cjs",
];
const NATIVE_ADDON_EXTENSIONS: &[&str] = &[".node", ".so", ".dll", ".dylib", ".exe", ".bin", ".wasm"];

static TEST_FILENAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(test|spec)\.[cm]?[jt]sx?$").unwrap());

/// Split a path into forward-slash segments, normalizing backslashes.
fn segments(path: &str) -> Vec<String> {
    path.replace('\\', "/")
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// True if `path` lives under a test-only directory, or is named like a test file.
pub fn is_test_path(path: &str) -> bool {
    let segs = segments(path);
    if segs.iter().any(|s| TEST_DIR_SEGMENTS.contains(&s.as_str())) {
        return true;
    }
    if let Some(filename) = segs.last() {
        if TEST_FILENAME_RE.is_match(filename) {
            return true;
        }
    }
    false
}

/// True if `path` passes through a nested-dependency directory and should always be skipped.
pub fn is_always_skip(path: &str) -> bool {
    segments(path).iter().any(|s| s == NESTED_DEP_DIR)
}

/// True if `path` is a TypeScript declaration-only file.
pub fn is_declaration_only(path: &str) -> bool {
    path.ends_with(".d.ts") || path.ends_with(".d.mts") || path.ends_with(".d.cts")
}

/// True if `path` matches the fixed native-addon/executable binary extension set.
pub fn is_native_binary(path: &str) -> bool {
    NATIVE_ADDON_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Build-artifact heuristic, used only by the diff engine.
///
/// `source_ts_paths` is the set of TypeScript/JSX source paths present in the
/// source repository (relative, forward-slash), used for the compiled-pair check.
pub fn is_build_artifact(path: &str, source_ts_paths: &HashSet<String>) -> bool {
    let segs = segments(path);
    if let Some(top) = segs.first() {
        let top_with_slash = format!("{top}/");
        if BUILD_OUTPUT_DIRS.iter().any(|d| *d == top_with_slash.trim_end_matches('/')) {
            return true;
        }
    }

    if is_declaration_only(path) || path.ends_with(".map") || is_native_binary(path) {
        return true;
    }

    if path.ends_with(".js") || path.ends_with(".mjs") || path.ends_with(".cjs") {
        if has_compiled_pair(path, source_ts_paths) {
            return true;
        }
    }

    false
}

fn has_compiled_pair(js_path: &str, source_ts_paths: &HashSet<String>) -> bool {
    let candidates = compiled_pair_candidates(js_path);
    candidates.iter().any(|c| source_ts_paths.contains(c))
}

fn compiled_pair_candidates(js_path: &str) -> Vec<String> {
    let stem = strip_js_extension(js_path);
    let mut out = Vec::new();
    for ext in [".ts", ".tsx", ".mts", ".cts"] {
        out.push(format!("{stem}{ext}"));
        out.push(format!("src/{stem}{ext}"));
    }
    out
}

fn strip_js_extension(path: &str) -> &str {
    for ext in [".mjs", ".cjs", ".js"] {
        if let Some(stripped) = path.strip_suffix(ext) {
            return stripped;
        }
    }
    path
}

/// True if `ext` (including the leading dot) is a source extension the static/obfuscation
/// scanners operate on.
pub fn is_scannable_source(path: &str) -> bool {
    (path.ends_with(".js") || path.ends_with(".mjs") || path.ends_with(".cjs") || path.ends_with(".ts"))
        && !is_test_path(path)
        && !is_declaration_only(path)
        && !is_always_skip(path)
}
