use crate::shared::models::{Grade, Report, Severity};
use colored::Colorize;

/// Print a report as colored terminal text. Every scanner's summary line is
/// printed regardless of outcome (spec.md §7: "Human output includes every
/// scanner's summary line regardless of outcome").
pub fn print_text(report: &Report) {
    let grade_colored = match report.grade {
        Grade::A => report.grade.to_string().green(),
        Grade::B => report.grade.to_string().green(),
        Grade::C => report.grade.to_string().yellow(),
        Grade::D => report.grade.to_string().truecolor(255, 165, 0),
        Grade::F => report.grade.to_string().red().bold(),
    };

    println!(
        "{} {} v{} (score: {}/100)",
        "regtrust:".bold(),
        report.package.name.bold(),
        report.package.version,
        report.score
    );
    println!("  Grade: {grade_colored}  Verdict: {}", report.verdict);

    println!("  Scanners:");
    for scanner in &report.scanners {
        let status = if scanner.passed {
            "ok".green().to_string()
        } else {
            "FAIL".red().bold().to_string()
        };
        println!("    [{status}] {}: {}", scanner.scanner, scanner.summary);

        for finding in &scanner.findings {
            let prefix = match finding.severity {
                Severity::Critical => "!!".red().bold().to_string(),
                Severity::Warning => " !".yellow().to_string(),
                Severity::Info => "  ".to_string(),
            };
            let location = match (&finding.file, finding.line) {
                (Some(f), Some(l)) => format!(" ({f}:{l})"),
                (Some(f), None) => format!(" ({f})"),
                _ => String::new(),
            };
            println!("      {prefix} {}{}", finding.message, location);
        }
    }

    if let Some(ref health) = report.github {
        if health.found {
            println!(
                "  Repository: {}/{} ({} stars, archived: {})",
                health.owner, health.repo, health.stars, health.archived
            );
        } else {
            println!("  Repository: not found");
        }
    }

    if let Some(ref diff) = report.diff {
        if diff.performed {
            println!(
                "  Diff: {} unexpected, {} expected-build, {} modified",
                diff.unexpected_files.len(),
                diff.expected_build_files.len(),
                diff.modified_files.len()
            );
        } else if let Some(ref err) = diff.error {
            println!("  Diff: not performed ({err})");
        }
    }

    println!("  Duration: {}ms", report.duration_ms);
}

/// Print a report as JSON, matching spec.md §6's Report schema.
pub fn print_json(report: &Report) {
    let json = serde_json::to_string_pretty(report).expect("Failed to serialize report");
    println!("{json}");
}
