use crate::context::ScanContext;
use crate::scanners::Scanner;
use crate::shared::models::{Finding, ScannerResult, Severity};

const DANGEROUS_HOOKS: &[&str] = &[
    "preinstall",
    "install",
    "postinstall",
    "preuninstall",
    "uninstall",
    "postuninstall",
];

const SHELL_MARKERS: &[&str] = &["curl", "wget", "bash", "sh -c", "node -e", "powershell", "cmd /c"];

pub struct LifecycleHookScanner;

impl Scanner for LifecycleHookScanner {
    fn id(&self) -> &'static str {
        "hooks"
    }

    fn scan(&self, ctx: &ScanContext) -> ScannerResult {
        if ctx.metadata.lifecycle_scripts.is_empty() {
            return ScannerResult::empty("hooks", "No lifecycle scripts declared");
        }

        let mut findings = Vec::new();

        // Fixed, deterministic order regardless of map iteration order.
        let mut entries: Vec<(&String, &String)> = ctx.metadata.lifecycle_scripts.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        for (hook, script) in entries {
            if hook == "prepare" {
                findings.push(Finding::new(
                    "hooks",
                    Severity::Info,
                    format!("prepare script defined: {script}"),
                ));
                continue;
            }

            if !DANGEROUS_HOOKS.contains(&hook.as_str()) {
                continue;
            }

            let lower = script.to_lowercase();
            if SHELL_MARKERS.iter().any(|marker| lower.contains(marker)) {
                findings.push(Finding::new(
                    "hooks",
                    Severity::Critical,
                    format!("{hook} executes shell commands: {script}"),
                ));
            } else {
                findings.push(Finding::new(
                    "hooks",
                    Severity::Warning,
                    format!("{hook} lifecycle script defined: {script}"),
                ));
            }
        }

        let critical = findings.iter().filter(|f| f.severity == Severity::Critical).count();
        let warning = findings.iter().filter(|f| f.severity == Severity::Warning).count();

        let summary = if critical == 0 && warning == 0 {
            "No dangerous lifecycle scripts".to_string()
        } else {
            format!("{critical} critical, {warning} warning lifecycle script(s)")
        };

        ScannerResult::new("hooks", findings, summary)
    }
}
