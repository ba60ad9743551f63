//! Fan-out-fan-in orchestrator (spec.md §5 and §9's state machine): fetch
//! metadata and extract the artifact, spawn the scanner set in parallel
//! alongside the optional repository-health probe and source-diff engine,
//! join everything, score, assemble the report, and clean up scratch space.
use crate::context::ScanContext;
use crate::diff;
use crate::health;
use crate::providers::registry::{self, Specifier};
use crate::scanners::{self, Scanner};
use crate::scorer;
use crate::shared::cache;
use crate::shared::config;
use crate::shared::models::{DiffResult, PackageMetadata, Report, RepositoryHealth, ScannerResult};
use rayon::prelude::*;
use std::time::Instant;

/// Options threaded through from the CLI.
pub struct ScanOptions {
    pub json: bool,
    pub no_github: bool,
    pub no_diff: bool,
}

/// Scan a specifier end to end and print the report. Returns the exit code
/// (spec.md §6) or an error string if the artifact could not be resolved.
pub fn run(specifier: &str, opts: &ScanOptions) -> Result<i32, String> {
    let start = Instant::now();
    let config = config::load_config();
    let parsed = registry::parse_specifier(specifier);

    if let Specifier::Registry { name, .. } = &parsed {
        if config.whitelist.contains(name) {
            let report = whitelisted_report(name, start.elapsed().as_millis() as u64);
            print_report(&report, opts.json);
            return Ok(config.thresholds.exit_code_for_grade(report.grade));
        }
    }

    let scratch_base = cache::scratch_dir();
    let (metadata, artifact_root) = registry::resolve(&parsed, &scratch_base)?;

    let has_cli_entry_point = has_bin_field(&artifact_root);
    let ctx = ScanContext::new(metadata.clone(), artifact_root.clone(), has_cli_entry_point);

    let repository_url = metadata.repository_url.clone().unwrap_or_default();
    let publisher = metadata.publisher.clone();
    let has_provenance = metadata.has_provenance;

    let (scanner_results, health_result, diff_result) = std::thread::scope(|scope| {
        let health_handle = (!opts.no_github && !repository_url.is_empty()).then(|| {
            let repository_url = repository_url.clone();
            let publisher = publisher.clone();
            scope.spawn(move || health::probe(&repository_url, publisher.as_deref(), has_provenance))
        });

        let diff_handle = (!opts.no_diff && !repository_url.is_empty()).then(|| {
            let repository_url = repository_url.clone();
            let artifact_root = artifact_root.clone();
            let scratch_base = scratch_base.clone();
            scope.spawn(move || diff::diff_against_repository(&repository_url, &artifact_root, &scratch_base))
        });

        let scanner_results = run_scanners(&ctx);

        let health_result = health_handle.map(|h| {
            h.join().unwrap_or_else(|_| {
                eprintln!("regtrust: warning: repository health probe panicked, skipping");
                RepositoryHealth::not_found()
            })
        });
        let diff_result = diff_handle.map(|h| {
            h.join().unwrap_or_else(|_| {
                eprintln!("regtrust: warning: source-diff engine panicked, skipping");
                DiffResult::not_performed("diff engine panicked")
            })
        });

        (scanner_results, health_result, diff_result)
    });

    // Only scratch-extracted artifacts are ours to remove; a local directory
    // specifier is scanned in place and must never be touched (spec.md §6).
    if artifact_root.starts_with(&scratch_base) {
        std::fs::remove_dir_all(&artifact_root).ok();
    }

    let score = scorer::compute_score(&scanner_results, health_result.as_ref(), diff_result.as_ref());
    let grade = scorer::grade_for_score(score);
    let verdict = crate::shared::models::verdict_for_grade(grade).to_string();

    let report = Report {
        package: metadata,
        scanners: scanner_results,
        github: health_result,
        diff: diff_result,
        score,
        grade,
        verdict,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    print_report(&report, opts.json);
    Ok(config.thresholds.exit_code_for_grade(report.grade))
}

/// Whitelist a package by name, persisting it to the user's config file.
pub fn allow(package_name: &str) -> Result<(), String> {
    config::allow_package(package_name)
}

/// Run every canonical scanner in parallel, isolating each from the others'
/// failures (spec.md §5: no scanner's panic may affect another's result, and
/// the canonical alphabetical order is preserved in the final report).
fn run_scanners(ctx: &ScanContext) -> Vec<ScannerResult> {
    canonical_boxed_scanners()
        .into_par_iter()
        .map(|scanner| {
            let id = scanner.id();
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| scanner.scan(ctx))).unwrap_or_else(|_| {
                eprintln!("regtrust: warning: scanner '{id}' panicked, returning empty result");
                ScannerResult::empty(id, format!("scanner '{id}' failed internally"))
            })
        })
        .collect()
}

fn canonical_boxed_scanners() -> Vec<Box<dyn Scanner + Send + Sync>> {
    scanners::canonical_scanners()
}

fn has_bin_field(artifact_root: &std::path::Path) -> bool {
    let manifest_path = artifact_root.join("package.json");
    let Ok(text) = std::fs::read_to_string(manifest_path) else {
        return false;
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) else {
        return false;
    };
    value.get("bin").is_some()
}

/// Short-circuit report for a whitelisted package: no network, no scanning,
/// a clean grade (SPEC_FULL.md §10.1's `regtrust allow`-skip contract).
fn whitelisted_report(name: &str, duration_ms: u64) -> Report {
    Report {
        package: PackageMetadata {
            name: name.to_string(),
            version: String::new(),
            description: None,
            license: None,
            publisher: None,
            publish_timestamp: None,
            artifact_source: "whitelist".to_string(),
            repository_url: None,
            homepage: None,
            file_count: 0,
            unpacked_size: 0,
            dependencies: Default::default(),
            optional_dependencies: Default::default(),
            lifecycle_scripts: Default::default(),
            maintainers: Vec::new(),
            has_provenance: false,
        },
        scanners: Vec::new(),
        github: None,
        diff: None,
        score: 100,
        grade: crate::shared::models::Grade::A,
        verdict: "CLEAN".to_string(),
        duration_ms,
    }
}

fn print_report(report: &Report, json: bool) {
    if json {
        crate::shared::output::print_json(report);
    } else {
        crate::shared::output::print_text(report);
    }
}
