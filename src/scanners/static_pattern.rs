use crate::context::ScanContext;
use crate::path_classifier;
use crate::scanners::Scanner;
use crate::shared::models::{Finding, ScannerResult, Severity};
use crate::shared::string_context::{is_suppressed, LineContext};
use crate::shared::walk::walk_files;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

#[derive(Debug, Deserialize)]
struct PatternRule {
    id: String,
    regex: String,
    severity: String,
    message: String,
    cli_expected: bool,
    check_string_context: bool,
}

#[derive(Debug, Deserialize)]
struct PatternTable {
    pattern: Vec<PatternRule>,
}

struct CompiledPattern {
    id: String,
    regex: Regex,
    severity: Severity,
    message: String,
    cli_expected: bool,
    check_string_context: bool,
}

fn parse_severity(s: &str) -> Severity {
    match s {
        "critical" => Severity::Critical,
        "warning" => Severity::Warning,
        _ => Severity::Info,
    }
}

static PATTERNS: LazyLock<Vec<CompiledPattern>> = LazyLock::new(|| {
    let toml_str = include_str!("../../data/static_patterns.toml");
    let table: PatternTable = toml::from_str(toml_str).expect("failed to parse static_patterns.toml");
    table
        .pattern
        .into_iter()
        .filter_map(|rule| {
            let regex = Regex::new(&rule.regex).ok()?;
            Some(CompiledPattern {
                id: rule.id,
                regex,
                severity: parse_severity(&rule.severity),
                message: rule.message,
                cli_expected: rule.cli_expected,
                check_string_context: rule.check_string_context,
            })
        })
        .collect()
});

/// IDs whose match on a line suppresses the bare-exec match on the same line
/// (spec section 4.2 rule 3 — avoids double-counting `exec(` inside `execSync(`).
const BARE_EXEC_SUPPRESSORS: &[&str] = &["EXEC-SYNC", "EXEC-FILE"];

pub struct StaticPatternScanner;

impl Scanner for StaticPatternScanner {
    fn id(&self) -> &'static str {
        "static"
    }

    fn scan(&self, ctx: &ScanContext) -> ScannerResult {
        if !ctx.artifact_root.is_dir() {
            return ScannerResult::empty("static", "No source files found");
        }

        let mut findings = Vec::new();
        let mut files_scanned = 0usize;

        let mut walked: Vec<_> = walk_files(&ctx.artifact_root)
            .into_iter()
            .filter(|f| path_classifier::is_scannable_source(&f.rel_path))
            .collect();
        walked.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));

        for file in walked {
            let Ok(content) = std::fs::read_to_string(&file.abs_path) else {
                continue;
            };
            files_scanned += 1;

            let mut line_ctx = LineContext::new();
            for (line_no, line) in content.lines().enumerate() {
                let mask = line_ctx.mask(line);
                let trimmed = line.trim();
                let evidence = truncate(trimmed, 200);

                let mut matched_ids_on_line: Vec<&str> = Vec::new();

                for pattern in PATTERNS.iter() {
                    let Some(m) = pattern.regex.find(line) else {
                        continue;
                    };

                    if pattern.id == "BARE-EXEC"
                        && matched_ids_on_line
                            .iter()
                            .any(|id| BARE_EXEC_SUPPRESSORS.contains(id))
                    {
                        continue;
                    }

                    matched_ids_on_line.push(&pattern.id);

                    let mut severity = pattern.severity;
                    let mut message = pattern.message.clone();

                    if pattern.check_string_context && is_suppressed(&mask, m.start()) {
                        severity = Severity::Info;
                        message = format!("{message} (in string/comment)");
                    } else if pattern.cli_expected && ctx.has_cli_entry_point {
                        severity = Severity::Info;
                        message = format!("{message} (expected for CLI tool)");
                    }

                    findings.push(
                        Finding::new("static", severity, message)
                            .with_file(file.rel_path.clone())
                            .with_line(line_no + 1)
                            .with_evidence(evidence.clone()),
                    );
                }
            }
        }

        let critical = findings.iter().filter(|f| f.severity == Severity::Critical).count();
        let warning = findings.iter().filter(|f| f.severity == Severity::Warning).count();
        let info = findings.iter().filter(|f| f.severity == Severity::Info).count();

        let summary = if findings.is_empty() {
            "No dangerous patterns detected".to_string()
        } else {
            let cli_suffix = if ctx.has_cli_entry_point {
                " (CLI tool — shell execution expected)"
            } else {
                ""
            };
            format!("Found {critical} critical, {warning} warning, {info} info pattern(s) across {files_scanned} files{cli_suffix}")
        };

        ScannerResult::new("static", findings, summary)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn make_ctx(dir: &PathBuf, has_cli: bool) -> ScanContext {
        use crate::shared::models::PackageMetadata;
        use std::collections::HashMap;
        ScanContext::new(
            PackageMetadata {
                name: "test-pkg".into(),
                version: "1.0.0".into(),
                description: None,
                license: None,
                publisher: None,
                publish_timestamp: None,
                artifact_source: "local".into(),
                repository_url: None,
                homepage: None,
                file_count: 0,
                unpacked_size: 0,
                dependencies: HashMap::new(),
                optional_dependencies: HashMap::new(),
                lifecycle_scripts: HashMap::new(),
                maintainers: Vec::new(),
                has_provenance: false,
            },
            dir.clone(),
            has_cli,
        )
    }

    fn tmp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("regtrust-static-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn flags_eval() {
        let dir = tmp_dir("eval");
        fs::write(dir.join("index.js"), "eval(userInput);\n").unwrap();
        let ctx = make_ctx(&dir, false);
        let result = StaticPatternScanner.scan(&ctx);
        assert!(!result.passed);
        assert!(result.findings.iter().any(|f| f.severity == Severity::Critical));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn eval_in_string_downgraded_to_info() {
        let dir = tmp_dir("eval-string");
        fs::write(dir.join("index.js"), "const msg = \"don't use eval(x) here\";\n").unwrap();
        let ctx = make_ctx(&dir, false);
        let result = StaticPatternScanner.scan(&ctx);
        assert!(result.passed);
        assert!(result.findings.iter().any(|f| f.severity == Severity::Info));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn cli_downgrade_applies_to_cli_expected_patterns_only() {
        let dir = tmp_dir("cli-downgrade");
        fs::write(dir.join("index.js"), "const cp = require('child_process');\neval(x);\n").unwrap();
        let ctx = make_ctx(&dir, true);
        let result = StaticPatternScanner.scan(&ctx);
        let eval_finding = result.findings.iter().find(|f| f.message.starts_with("eval")).unwrap();
        assert_eq!(eval_finding.severity, Severity::Critical);
        let cp_finding = result
            .findings
            .iter()
            .find(|f| f.message.contains("child_process"))
            .unwrap();
        assert_eq!(cp_finding.severity, Severity::Info);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn bare_exec_deduplicated_against_exec_sync() {
        let dir = tmp_dir("bare-exec");
        fs::write(dir.join("index.js"), "execSync('rm -rf /');\n").unwrap();
        let ctx = make_ctx(&dir, false);
        let result = StaticPatternScanner.scan(&ctx);
        let bare_exec_matches = result
            .findings
            .iter()
            .filter(|f| f.message.contains("shell command execution via exec()"))
            .count();
        assert_eq!(bare_exec_matches, 0);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_files_are_skipped() {
        let dir = tmp_dir("test-skip");
        fs::create_dir_all(dir.join("__tests__")).unwrap();
        fs::write(dir.join("__tests__/index.test.js"), "eval(x);\n").unwrap();
        let ctx = make_ctx(&dir, false);
        let result = StaticPatternScanner.scan(&ctx);
        assert!(result.passed);
        assert_eq!(result.summary, "No dangerous patterns detected");
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_artifact_directory_passes() {
        let ctx = make_ctx(&PathBuf::from("/nonexistent/regtrust-path"), false);
        let result = StaticPatternScanner.scan(&ctx);
        assert!(result.passed);
        assert_eq!(result.summary, "No source files found");
    }
}
