use crate::context::ScanContext;
use crate::scanners::Scanner;
use crate::shared::models::{Finding, ScannerResult, Severity};
use regex::Regex;
use std::sync::LazyLock;

static GIT_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(git://|git\+https?://|github:|gitlab:|bitbucket:|https?://.*\.git$|[\w.-]+/[\w.-]+$)",
    )
    .unwrap()
});

pub struct DependencyScanner;

impl Scanner for DependencyScanner {
    fn id(&self) -> &'static str {
        "dependencies"
    }

    fn scan(&self, ctx: &ScanContext) -> ScannerResult {
        let direct = &ctx.metadata.dependencies;
        let optional = &ctx.metadata.optional_dependencies;

        if direct.is_empty() && optional.is_empty() {
            return ScannerResult::empty("dependencies", "No dependencies declared");
        }

        let mut findings = Vec::new();
        let total = direct.len() + optional.len();

        if total > 50 {
            findings.push(Finding::new(
                "dependencies",
                Severity::Critical,
                format!("{total} total dependencies — unusually large dependency surface"),
            ));
        } else if total > 20 {
            findings.push(Finding::new(
                "dependencies",
                Severity::Warning,
                format!("{total} total dependencies"),
            ));
        }

        let mut entries: Vec<(&String, &String)> = direct.iter().chain(optional.iter()).collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        for (name, version) in entries {
            if version == "*" || version.is_empty() || version == "latest" {
                findings.push(Finding::new(
                    "dependencies",
                    Severity::Critical,
                    format!("{name} has an unpinned version range ({version:?})"),
                ));
            } else if GIT_URL_RE.is_match(version) {
                findings.push(Finding::new(
                    "dependencies",
                    Severity::Warning,
                    format!("{name} resolves from a git URL rather than the registry: {version}"),
                ));
            }
        }

        let critical = findings.iter().filter(|f| f.severity == Severity::Critical).count();
        let warning = findings.iter().filter(|f| f.severity == Severity::Warning).count();

        let summary = if findings.is_empty() {
            format!("{total} dependencies, no issues found")
        } else {
            format!("{critical} critical, {warning} warning dependency issue(s) across {total} dependencies")
        };

        ScannerResult::new("dependencies", findings, summary)
    }
}
