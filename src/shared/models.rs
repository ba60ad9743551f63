use serde::Serialize;
use std::collections::HashMap;

/// Severity of a single finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// One observation from a scanner. Value object — created once, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub scanner: String,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

impl Finding {
    pub fn new(scanner: &str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            scanner: scanner.to_string(),
            severity,
            message: message.into(),
            file: None,
            line: None,
            evidence: None,
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }
}

/// Output of one scanner pass.
#[derive(Debug, Serialize)]
pub struct ScannerResult {
    pub scanner: String,
    pub passed: bool,
    pub findings: Vec<Finding>,
    pub summary: String,
}

impl ScannerResult {
    /// Build a result, deriving `passed` from the finding list per the spec invariant:
    /// passed iff zero critical and zero warning findings.
    pub fn new(scanner: &str, findings: Vec<Finding>, summary: impl Into<String>) -> Self {
        let passed = findings
            .iter()
            .all(|f| f.severity != Severity::Critical && f.severity != Severity::Warning);
        Self {
            scanner: scanner.to_string(),
            passed,
            findings,
            summary: summary.into(),
        }
    }

    pub fn empty(scanner: &str, summary: impl Into<String>) -> Self {
        Self {
            scanner: scanner.to_string(),
            passed: true,
            findings: Vec::new(),
            summary: summary.into(),
        }
    }
}

/// Package metadata returned by the artifact provider.
#[derive(Debug, Clone, Serialize)]
pub struct PackageMetadata {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub license: Option<String>,
    pub publisher: Option<String>,
    pub publish_timestamp: Option<u64>,
    pub artifact_source: String,
    pub repository_url: Option<String>,
    pub homepage: Option<String>,
    pub file_count: usize,
    pub unpacked_size: u64,
    pub dependencies: HashMap<String, String>,
    pub optional_dependencies: HashMap<String, String>,
    pub lifecycle_scripts: HashMap<String, String>,
    pub maintainers: Vec<String>,
    pub has_provenance: bool,
}

/// Result of the repository-health probe.
#[derive(Debug, Clone, Serialize)]
pub struct RepositoryHealth {
    pub found: bool,
    pub owner: String,
    pub repo: String,
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    pub license: Option<String>,
    pub created_at: u64,
    pub pushed_at: u64,
    pub archived: bool,
    pub publisher_matches_owner: bool,
    pub has_provenance: bool,
}

impl RepositoryHealth {
    pub fn not_found() -> Self {
        Self {
            found: false,
            owner: String::new(),
            repo: String::new(),
            stars: 0,
            forks: 0,
            open_issues: 0,
            license: None,
            created_at: 0,
            pushed_at: 0,
            archived: false,
            publisher_matches_owner: false,
            has_provenance: false,
        }
    }
}

/// Result of the source-diff engine.
#[derive(Debug, Clone, Serialize)]
pub struct DiffResult {
    pub performed: bool,
    pub unexpected_files: Vec<String>,
    pub expected_build_files: Vec<String>,
    pub modified_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DiffResult {
    pub fn not_performed(error: impl Into<String>) -> Self {
        Self {
            performed: false,
            unexpected_files: Vec::new(),
            expected_build_files: Vec::new(),
            modified_files: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Letter grade derived deterministically from score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        write!(f, "{s}")
    }
}

pub fn grade_for_score(score: u32) -> Grade {
    match score {
        90..=100 => Grade::A,
        80..=89 => Grade::B,
        70..=79 => Grade::C,
        60..=69 => Grade::D,
        _ => Grade::F,
    }
}

pub fn verdict_for_grade(grade: Grade) -> &'static str {
    match grade {
        Grade::A | Grade::B => "CLEAN",
        Grade::C => "CAUTION",
        Grade::D | Grade::F => "DANGER",
    }
}

/// The final, assembled report.
#[derive(Debug, Serialize)]
pub struct Report {
    pub package: PackageMetadata,
    pub scanners: Vec<ScannerResult>,
    pub github: Option<RepositoryHealth>,
    pub diff: Option<DiffResult>,
    pub score: u32,
    pub grade: Grade,
    pub verdict: String,
    pub duration_ms: u64,
}
