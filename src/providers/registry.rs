//! Concrete implementation behind spec.md's "Artifact Provider" interface
//! (§2 item 1, §6): parses the package-specifier grammar, fetches metadata and
//! the tarball from the public npm registry, and extracts it to a scratch
//! directory. Grounded in the teacher's `shared::aur_rpc` request-building
//! style; tarball extraction uses `tar` + `flate2::read::GzDecoder`, the
//! combination demonstrated in the cargo registry-source reference file.
use crate::shared::models::PackageMetadata;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const REGISTRY_BASE: &str = "https://registry.npmjs.org";

/// A parsed package specifier (spec.md §6 grammar).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Specifier {
    /// A registry package, optionally pinned to a version.
    Registry { name: String, version: Option<String> },
    /// A local artifact: an extracted directory or a `.tgz`/`.tar.gz` file.
    Local { path: PathBuf },
}

/// Parse a specifier string per spec.md §6:
/// - `name`, `name@version`
/// - `@scope/name`, `@scope/name@version` (split at the *last* `@`)
/// - any path starting `./`, `../`, `/`, or ending `.tgz`/`.tar.gz`
pub fn parse_specifier(input: &str) -> Specifier {
    if input.starts_with("./")
        || input.starts_with("../")
        || input.starts_with('/')
        || input.ends_with(".tgz")
        || input.ends_with(".tar.gz")
    {
        return Specifier::Local { path: PathBuf::from(input) };
    }

    if let Some(scope_rest) = input.strip_prefix('@') {
        let Some((scope, name_and_version)) = scope_rest.split_once('/') else {
            return Specifier::Registry { name: input.to_string(), version: None };
        };
        return match name_and_version.rfind('@') {
            Some(at_pos) => Specifier::Registry {
                name: format!("@{scope}/{}", &name_and_version[..at_pos]),
                version: Some(name_and_version[at_pos + 1..].to_string()),
            },
            None => Specifier::Registry {
                name: format!("@{scope}/{name_and_version}"),
                version: None,
            },
        };
    }

    match input.rfind('@') {
        Some(at_pos) if at_pos > 0 => Specifier::Registry {
            name: input[..at_pos].to_string(),
            version: Some(input[at_pos + 1..].to_string()),
        },
        _ => Specifier::Registry { name: input.to_string(), version: None },
    }
}

/// Fetch metadata and an extracted artifact directory for a specifier.
/// `scratch_base` is where registry tarballs get extracted; local directory
/// specifiers are used in place and never written to.
pub fn resolve(specifier: &Specifier, scratch_base: &Path) -> Result<(PackageMetadata, PathBuf), String> {
    match specifier {
        Specifier::Registry { name, version } => resolve_registry(name, version.as_deref(), scratch_base),
        Specifier::Local { path } => resolve_local(path, scratch_base),
    }
}

fn resolve_registry(
    name: &str,
    version: Option<&str>,
    scratch_base: &Path,
) -> Result<(PackageMetadata, PathBuf), String> {
    let url = format!("{REGISTRY_BASE}/{name}");
    let packument: Value = reqwest::blocking::get(&url)
        .map_err(|e| format!("registry request failed: {e}"))?
        .json()
        .map_err(|e| format!("failed to parse registry response: {e}"))?;

    if packument.get("error").is_some() {
        return Err(format!("package '{name}' not found on the registry"));
    }

    let resolved_version = match version {
        Some(v) => v.to_string(),
        None => packument
            .get("dist-tags")
            .and_then(|t| t.get("latest"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| format!("package '{name}' has no 'latest' dist-tag"))?
            .to_string(),
    };

    let version_value = packument
        .get("versions")
        .and_then(|v| v.get(&resolved_version))
        .ok_or_else(|| format!("version '{resolved_version}' not found for package '{name}'"))?;

    let publish_timestamp = packument
        .get("time")
        .and_then(|t| t.get(&resolved_version))
        .and_then(|v| v.as_str())
        .map(crate::shared::time::parse_rfc3339_to_unix);

    let tarball_url = version_value
        .get("dist")
        .and_then(|d| d.get("tarball"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| "registry version metadata is missing a tarball URL".to_string())?
        .to_string();

    let metadata = metadata_from_manifest(version_value, "registry", publish_timestamp);

    let tarball_bytes = reqwest::blocking::get(&tarball_url)
        .map_err(|e| format!("tarball download failed: {e}"))?
        .bytes()
        .map_err(|e| format!("failed to read tarball: {e}"))?;

    let extract_dir = scratch_base.join(format!(
        "{}-{resolved_version}-{}",
        name.replace('/', "_"),
        std::process::id()
    ));
    std::fs::create_dir_all(&extract_dir).map_err(|e| format!("failed to create scratch directory: {e}"))?;

    let gz = flate2::read::GzDecoder::new(&tarball_bytes[..]);
    let mut archive = tar::Archive::new(gz);
    archive
        .unpack(&extract_dir)
        .map_err(|e| format!("failed to extract tarball: {e}"))?;

    // npm tarballs conventionally wrap all contents in a `package/` directory.
    let package_dir = extract_dir.join("package");
    let artifact_root = if package_dir.is_dir() { package_dir } else { extract_dir };

    Ok((metadata, artifact_root))
}

fn resolve_local(path: &Path, scratch_base: &Path) -> Result<(PackageMetadata, PathBuf), String> {
    let is_tarball = path
        .to_str()
        .map(|s| s.ends_with(".tgz") || s.ends_with(".tar.gz"))
        .unwrap_or(false);

    let artifact_root = if is_tarball {
        let bytes = std::fs::read(path).map_err(|e| format!("failed to read local artifact: {e}"))?;
        let extract_dir = scratch_base.join(format!("local-{}", std::process::id()));
        std::fs::create_dir_all(&extract_dir)
            .map_err(|e| format!("failed to create scratch directory: {e}"))?;
        let gz = flate2::read::GzDecoder::new(&bytes[..]);
        let mut archive = tar::Archive::new(gz);
        archive.unpack(&extract_dir).map_err(|e| format!("failed to extract local artifact: {e}"))?;
        let package_dir = extract_dir.join("package");
        if package_dir.is_dir() { package_dir } else { extract_dir }
    } else {
        if !path.is_dir() {
            return Err(format!("local artifact path '{}' is not a directory or tarball", path.display()));
        }
        path.to_path_buf()
    };

    let manifest_path = artifact_root.join("package.json");
    let manifest_text = std::fs::read_to_string(&manifest_path)
        .map_err(|e| format!("failed to read package.json at '{}': {e}", manifest_path.display()))?;
    let manifest: Value = serde_json::from_str(&manifest_text)
        .map_err(|e| format!("failed to parse package.json: {e}"))?;

    let metadata = metadata_from_manifest(&manifest, "local", None);
    Ok((metadata, artifact_root))
}

/// Build a `PackageMetadata` from a manifest-shaped JSON value, probing each
/// field and defaulting if absent (spec.md §9: registry responses arrive as
/// arbitrary JSON; no strict schema is assumed).
fn metadata_from_manifest(manifest: &Value, source: &str, publish_timestamp: Option<u64>) -> PackageMetadata {
    PackageMetadata {
        name: str_field(manifest, "name").unwrap_or_default(),
        version: str_field(manifest, "version").unwrap_or_default(),
        description: str_field(manifest, "description"),
        license: license_field(manifest),
        publisher: publisher_field(manifest),
        publish_timestamp,
        artifact_source: source.to_string(),
        repository_url: repository_field(manifest),
        homepage: str_field(manifest, "homepage"),
        file_count: manifest
            .get("dist")
            .and_then(|d| d.get("fileCount"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize,
        unpacked_size: manifest
            .get("dist")
            .and_then(|d| d.get("unpackedSize"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0),
        dependencies: string_map_field(manifest, "dependencies"),
        optional_dependencies: string_map_field(manifest, "optionalDependencies"),
        lifecycle_scripts: string_map_field(manifest, "scripts"),
        maintainers: maintainers_field(manifest),
        has_provenance: has_provenance(manifest),
    }
}

fn str_field(manifest: &Value, key: &str) -> Option<String> {
    manifest.get(key)?.as_str().map(|s| s.to_string())
}

fn license_field(manifest: &Value) -> Option<String> {
    match manifest.get("license") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Object(obj)) => obj.get("type").and_then(|v| v.as_str()).map(|s| s.to_string()),
        _ => None,
    }
}

fn publisher_field(manifest: &Value) -> Option<String> {
    manifest
        .get("_npmUser")
        .and_then(|u| u.get("name"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

fn repository_field(manifest: &Value) -> Option<String> {
    match manifest.get("repository") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Object(obj)) => obj.get("url").and_then(|v| v.as_str()).map(|s| s.to_string()),
        _ => None,
    }
}

fn string_map_field(manifest: &Value, key: &str) -> HashMap<String, String> {
    manifest
        .get(key)
        .and_then(|v| v.as_object())
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

fn maintainers_field(manifest: &Value) -> Vec<String> {
    let Some(arr) = manifest.get("maintainers").and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    arr.iter()
        .filter_map(|m| match m {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => obj.get("name").and_then(|v| v.as_str()).map(|s| s.to_string()),
            _ => None,
        })
        .collect()
}

fn has_provenance(manifest: &Value) -> bool {
    manifest
        .get("dist")
        .map(|d| {
            d.get("attestations").is_some()
                || d.get("signatures")
                    .and_then(|s| s.as_array())
                    .map(|a| !a.is_empty())
                    .unwrap_or(false)
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_unscoped_unversioned() {
        assert_eq!(
            parse_specifier("lodash"),
            Specifier::Registry { name: "lodash".to_string(), version: None }
        );
    }

    #[test]
    fn parses_unscoped_versioned() {
        assert_eq!(
            parse_specifier("lodash@4.17.21"),
            Specifier::Registry { name: "lodash".to_string(), version: Some("4.17.21".to_string()) }
        );
    }

    #[test]
    fn parses_scoped_unversioned() {
        assert_eq!(
            parse_specifier("@babel/core"),
            Specifier::Registry { name: "@babel/core".to_string(), version: None }
        );
    }

    #[test]
    fn parses_scoped_versioned_splits_at_last_at() {
        assert_eq!(
            parse_specifier("@babel/core@7.20.0"),
            Specifier::Registry { name: "@babel/core".to_string(), version: Some("7.20.0".to_string()) }
        );
    }

    #[test]
    fn parses_local_relative_path() {
        assert_eq!(
            parse_specifier("./local-pkg"),
            Specifier::Local { path: PathBuf::from("./local-pkg") }
        );
    }

    #[test]
    fn parses_local_absolute_path() {
        assert_eq!(
            parse_specifier("/tmp/pkg"),
            Specifier::Local { path: PathBuf::from("/tmp/pkg") }
        );
    }

    #[test]
    fn parses_local_tarball() {
        assert_eq!(
            parse_specifier("./thing-1.0.0.tgz"),
            Specifier::Local { path: PathBuf::from("./thing-1.0.0.tgz") }
        );
    }

    #[test]
    fn license_accepts_string_or_object_shape() {
        let string_shape: Value = serde_json::json!({"license": "MIT"});
        assert_eq!(license_field(&string_shape), Some("MIT".to_string()));

        let object_shape: Value = serde_json::json!({"license": {"type": "ISC"}});
        assert_eq!(license_field(&object_shape), Some("ISC".to_string()));

        let missing: Value = serde_json::json!({});
        assert_eq!(license_field(&missing), None);
    }

    #[test]
    fn repository_accepts_string_or_object_shape() {
        let string_shape: Value = serde_json::json!({"repository": "github.com/user/repo"});
        assert_eq!(repository_field(&string_shape), Some("github.com/user/repo".to_string()));

        let object_shape: Value = serde_json::json!({"repository": {"url": "git+https://github.com/user/repo.git"}});
        assert_eq!(
            repository_field(&object_shape),
            Some("git+https://github.com/user/repo.git".to_string())
        );
    }

    #[test]
    fn maintainers_accepts_string_or_object_entries() {
        let manifest: Value = serde_json::json!({"maintainers": ["alice", {"name": "bob"}]});
        assert_eq!(maintainers_field(&manifest), vec!["alice".to_string(), "bob".to_string()]);
    }

    #[test]
    fn missing_fields_default_sensibly() {
        let manifest: Value = serde_json::json!({"name": "x", "version": "1.0.0"});
        let metadata = metadata_from_manifest(&manifest, "local", None);
        assert_eq!(metadata.name, "x");
        assert_eq!(metadata.version, "1.0.0");
        assert!(metadata.dependencies.is_empty());
        assert!(!metadata.has_provenance);
    }
}
