use crate::context::ScanContext;
use crate::path_classifier;
use crate::scanners::Scanner;
use crate::shared::models::{Finding, ScannerResult, Severity};
use crate::shared::walk::walk_files;
use std::collections::BTreeMap;

pub struct BinaryScanner;

impl Scanner for BinaryScanner {
    fn id(&self) -> &'static str {
        "binaries"
    }

    fn scan(&self, ctx: &ScanContext) -> ScannerResult {
        if !ctx.artifact_root.is_dir() {
            return ScannerResult::empty("binaries", "No binary files found");
        }

        let mut findings = Vec::new();
        let mut by_extension: BTreeMap<String, usize> = BTreeMap::new();

        let mut walked: Vec<_> = walk_files(&ctx.artifact_root)
            .into_iter()
            .filter(|f| !path_classifier::is_always_skip(&f.rel_path))
            .filter(|f| path_classifier::is_native_binary(&f.rel_path))
            .collect();
        walked.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));

        for file in walked {
            let ext = extension_of(&file.rel_path);
            *by_extension.entry(ext).or_insert(0) += 1;
            findings.push(
                Finding::new("binaries", Severity::Warning, "cannot be source-reviewed")
                    .with_file(file.rel_path.clone()),
            );
        }

        let summary = if findings.is_empty() {
            "No binary files found".to_string()
        } else {
            let parts: Vec<String> = by_extension.iter().map(|(ext, n)| format!("{n} {ext}")).collect();
            format!("{} binary file(s): {}", findings.len(), parts.join(", "))
        };

        ScannerResult::new("binaries", findings, summary)
    }
}

fn extension_of(path: &str) -> String {
    match path.rfind('.') {
        Some(idx) => path[idx..].to_string(),
        None => String::new(),
    }
}
