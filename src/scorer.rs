use crate::shared::models::{DiffResult, Grade, RepositoryHealth, ScannerResult, Severity};

/// Per-scanner category weight table: (max, critical-base, warning-base, info-base).
struct CategoryWeight {
    scanner: &'static str,
    max: f64,
    critical: f64,
    warning: f64,
    info: f64,
}

const WEIGHTS: &[CategoryWeight] = &[
    CategoryWeight { scanner: "static", max: 25.0, critical: 15.0, warning: 5.0, info: 0.0 },
    CategoryWeight { scanner: "obfuscation", max: 15.0, critical: 10.0, warning: 10.0, info: 3.0 },
    CategoryWeight { scanner: "hooks", max: 10.0, critical: 10.0, warning: 5.0, info: 0.0 },
    CategoryWeight { scanner: "secrets", max: 5.0, critical: 5.0, warning: 5.0, info: 0.0 },
    CategoryWeight { scanner: "binaries", max: 5.0, critical: 3.0, warning: 3.0, info: 1.0 },
    CategoryWeight { scanner: "dependencies", max: 10.0, critical: 10.0, warning: 5.0, info: 0.0 },
    CategoryWeight { scanner: "typosquatting", max: 5.0, critical: 5.0, warning: 5.0, info: 0.0 },
];

const REPO_HEALTH_MAX: f64 = 15.0;
const DIFF_MAX: f64 = 10.0;

/// Deduction for `n` findings at one severity, base deduction `b` per finding.
/// n = 0 -> 0; otherwise diminishing returns: b * (1 + ln n).
fn diminishing_deduction(base: f64, n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        base * (1.0 + (n as f64).ln())
    }
}

/// Score for one scanner's category, clamped to [0, max].
fn category_score(weight: &CategoryWeight, result: &ScannerResult) -> f64 {
    let critical_count = result.findings.iter().filter(|f| f.severity == Severity::Critical).count();
    let warning_count = result.findings.iter().filter(|f| f.severity == Severity::Warning).count();
    let info_count = result.findings.iter().filter(|f| f.severity == Severity::Info).count();

    let deduction = diminishing_deduction(weight.critical, critical_count)
        + diminishing_deduction(weight.warning, warning_count)
        + diminishing_deduction(weight.info, info_count);

    (weight.max - deduction).clamp(0.0, weight.max)
}

fn repository_health_score(health: Option<&RepositoryHealth>) -> f64 {
    let Some(health) = health else {
        return 0.0;
    };
    if !health.found {
        return 0.0;
    }

    let mut score = REPO_HEALTH_MAX;

    if health.archived {
        score -= 10.0;
    }
    if health.stars == 0 {
        score -= 5.0;
    }
    if repo_created_within_last_month(health.created_at) {
        score -= 5.0;
    }
    if !health.publisher_matches_owner {
        if health.has_provenance {
            // trusted automated publisher explains the mismatch
        } else if health.stars >= 100 {
            score -= 3.0;
        } else {
            score -= 10.0;
        }
    }

    score.clamp(0.0, REPO_HEALTH_MAX)
}

fn repo_created_within_last_month(created_at: u64) -> bool {
    let now = crate::shared::time::now_unix();
    const THIRTY_DAYS_SECS: u64 = 30 * 24 * 60 * 60;
    now.saturating_sub(created_at) < THIRTY_DAYS_SECS
}

fn diff_score(diff: Option<&DiffResult>) -> f64 {
    let Some(diff) = diff else {
        return 0.0;
    };
    if !diff.performed {
        return 0.0;
    }

    let u = diff.unexpected_files.len();
    if u == 0 {
        return DIFF_MAX;
    }

    let deduction = (3.0 * (1.0 + (u.max(1) as f64).ln())).min(8.0);
    (DIFF_MAX - deduction).clamp(0.0, DIFF_MAX)
}

/// Compute the total score, clamped to [0, 100], from all scan components.
pub fn compute_score(
    scanners: &[ScannerResult],
    health: Option<&RepositoryHealth>,
    diff: Option<&DiffResult>,
) -> u32 {
    let mut total = 0.0;

    for weight in WEIGHTS {
        if let Some(result) = scanners.iter().find(|r| r.scanner == weight.scanner) {
            total += category_score(weight, result);
        } else {
            // Missing category (scanner failed entirely) scores zero for that category.
        }
    }

    total += repository_health_score(health);
    total += diff_score(diff);

    (total.round() as i64).clamp(0, 100) as u32
}

pub fn grade_for_score(score: u32) -> Grade {
    crate::shared::models::grade_for_score(score)
}
