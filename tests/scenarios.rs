//! End-to-end scoring scenarios, literal inputs and outputs from spec.md §8.
//! Exercises the scorer against synthetic scanner/health/diff results the way
//! the orchestrator assembles them, without touching the network.

use regtrust::scorer;
use regtrust::shared::models::{
    DiffResult, Finding, Grade, RepositoryHealth, ScannerResult, Severity,
};

fn clean(scanner: &str) -> ScannerResult {
    ScannerResult::new(scanner, Vec::new(), "clean")
}

fn all_clean_scanners() -> Vec<ScannerResult> {
    vec![
        clean("static"),
        clean("obfuscation"),
        clean("hooks"),
        clean("secrets"),
        clean("binaries"),
        clean("dependencies"),
        clean("typosquatting"),
    ]
}

fn owner_matched_popular_repo() -> RepositoryHealth {
    RepositoryHealth {
        found: true,
        owner: "chalk".to_string(),
        repo: "chalk".to_string(),
        stars: 100,
        forks: 50,
        open_issues: 0,
        license: Some("MIT".to_string()),
        created_at: 0,
        pushed_at: 0,
        archived: false,
        publisher_matches_owner: true,
        has_provenance: false,
    }
}

fn clean_diff() -> DiffResult {
    DiffResult {
        performed: true,
        unexpected_files: Vec::new(),
        expected_build_files: Vec::new(),
        modified_files: Vec::new(),
        error: None,
    }
}

/// Scenario 1: clean terminal-color library, owner-matched repo with >=100
/// stars, clean diff. 100 / A / CLEAN.
#[test]
fn scenario_clean_terminal_color_library() {
    let health = owner_matched_popular_repo();
    let diff = clean_diff();
    let score = scorer::compute_score(&all_clean_scanners(), Some(&health), Some(&diff));

    assert_eq!(score, 100);
    assert!(matches!(scorer::grade_for_score(score), Grade::A));
}

/// Scenario 2: same artifact, `--no-github --no-diff` — categories sum to 75,
/// health and diff absent. 75 / C / CAUTION.
#[test]
fn scenario_no_repository_data_collected() {
    let score = scorer::compute_score(&all_clean_scanners(), None, None);

    assert_eq!(score, 75);
    assert!(matches!(scorer::grade_for_score(score), Grade::C));
}

/// Scenario 3: one critical eval() pattern, otherwise clean, matched-owner
/// repo, no diff collected. static = 25 - 15 = 10; total = 75 / C.
#[test]
fn scenario_one_critical_eval_pattern() {
    let mut scanners = all_clean_scanners();
    scanners[0] = ScannerResult::new(
        "static",
        vec![Finding::new("static", Severity::Critical, "eval() call detected")],
        "Found 1 critical pattern(s) across 1 files",
    );
    let health = owner_matched_popular_repo();

    let score = scorer::compute_score(&scanners, Some(&health), None);

    assert_eq!(score, 75);
    assert!(matches!(scorer::grade_for_score(score), Grade::C));
}

/// Scenario 4a: ten warning-level network patterns in static, no CLI entry
/// point, no health, no diff. static collapses under diminishing returns but
/// every other category stays at max; total lands below 60 (grade F).
#[test]
fn scenario_ten_warnings_no_cli_downgrade() {
    let mut scanners = all_clean_scanners();
    let findings = (0..10)
        .map(|_| Finding::new("static", Severity::Warning, "fetch() call detected"))
        .collect();
    scanners[0] = ScannerResult::new("static", findings, "Found 10 warning pattern(s) across 1 files");

    let score = scorer::compute_score(&scanners, None, None);

    assert!(score < 60, "expected a failing score, got {score}");
    assert!(matches!(scorer::grade_for_score(score), Grade::F));
}

/// Scenario 4b: the same ten findings, but the manifest declares a CLI entry
/// point, so seven of the ten (every *cli-expected* pattern) are downgraded
/// to info by the static scanner's own rule 4 before reaching the scorer.
/// Only the three non-cli-expected (legacy-XHR-style) warnings remain, so
/// the category recovers substantially even though it does not return to max.
#[test]
fn scenario_ten_warnings_with_cli_downgrade() {
    let no_downgrade_score = scorer::compute_score(&all_clean_scanners_with_ten_static_warnings(), None, None);

    let mut scanners = all_clean_scanners();
    let mut findings: Vec<Finding> = (0..7)
        .map(|_| Finding::new("static", Severity::Info, "fetch() call detected (expected for CLI tool)"))
        .collect();
    findings.extend((0..3).map(|_| Finding::new("static", Severity::Warning, "legacy XHR reference")));
    scanners[0] = ScannerResult::new(
        "static",
        findings,
        "Found 3 warning, 7 info pattern(s) across 1 files (CLI tool — shell execution expected)",
    );

    let score = scorer::compute_score(&scanners, None, None);

    assert!(
        score > no_downgrade_score,
        "CLI downgrade should recover score: {score} should exceed {no_downgrade_score}"
    );
}

fn all_clean_scanners_with_ten_static_warnings() -> Vec<ScannerResult> {
    let mut scanners = all_clean_scanners();
    let findings = (0..10)
        .map(|_| Finding::new("static", Severity::Warning, "fetch() call detected"))
        .collect();
    scanners[0] = ScannerResult::new("static", findings, "Found 10 warning pattern(s) across 1 files");
    scanners
}

/// Scenario 5: obfuscated Telegram-bot-style artifact — two obfuscation
/// findings collapse that category to 0, one network warning shaves a little
/// off static, no health or diff collected. Total lands well under 60.
#[test]
fn scenario_obfuscated_telegram_bot_artifact() {
    let mut scanners = all_clean_scanners();
    scanners[0] = ScannerResult::new(
        "static",
        vec![Finding::new("static", Severity::Warning, "axios usage detected")],
        "Found 1 warning pattern(s) across 1 files",
    );
    scanners[1] = ScannerResult::new(
        "obfuscation",
        vec![
            Finding::new("obfuscation", Severity::Critical, "high-entropy blob detected"),
            Finding::new("obfuscation", Severity::Critical, "rotated string array detected"),
        ],
        "Found 2 critical pattern(s) across 1 files",
    );

    let score = scorer::compute_score(&scanners, None, None);

    assert!(score < 60, "expected a failing score, got {score}");
    assert!(matches!(scorer::grade_for_score(score), Grade::F));
}

/// Scenario 6: clean artifact, but 35 unexpected files in the published
/// artifact absent from source. diff deducts its capped 8 points; total
/// lands at 92 / A — a nudge, not a cliff.
#[test]
fn scenario_thirty_five_unexpected_files_in_diff() {
    let health = owner_matched_popular_repo();
    let diff = DiffResult {
        performed: true,
        unexpected_files: (0..35).map(|i| format!("extra-{i}.js")).collect(),
        expected_build_files: Vec::new(),
        modified_files: Vec::new(),
        error: None,
    };

    let score = scorer::compute_score(&all_clean_scanners(), Some(&health), Some(&diff));

    assert_eq!(score, 92);
    assert!(matches!(scorer::grade_for_score(score), Grade::A));
}

/// Scorer monotonicity (spec.md §8): adding a warning finding never increases
/// the total score, regardless of which category it lands in.
#[test]
fn monotonicity_across_every_category() {
    let baseline = scorer::compute_score(&all_clean_scanners(), None, None);

    for i in 0..all_clean_scanners().len() {
        let mut scanners = all_clean_scanners();
        let scanner_name = scanners[i].scanner.clone();
        scanners[i] = ScannerResult::new(
            &scanner_name,
            vec![Finding::new(&scanner_name, Severity::Warning, "synthetic finding")],
            "degraded",
        );
        let degraded = scorer::compute_score(&scanners, None, None);
        assert!(degraded <= baseline, "{scanner_name} category increased the score");
    }
}
