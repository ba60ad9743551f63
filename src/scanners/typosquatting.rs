use crate::context::ScanContext;
use crate::scanners::Scanner;
use crate::shared::models::{Finding, ScannerResult, Severity};
use serde::Deserialize;
use std::sync::LazyLock;

#[derive(Deserialize)]
struct PopularNames {
    names: Vec<String>,
}

static POPULAR_NAMES: LazyLock<Option<Vec<String>>> = LazyLock::new(|| {
    let toml_str = include_str!("../../data/popular_packages.toml");
    toml::from_str::<PopularNames>(toml_str)
        .ok()
        .map(|t| t.names)
});

pub struct TyposquattingScanner;

impl Scanner for TyposquattingScanner {
    fn id(&self) -> &'static str {
        "typosquatting"
    }

    fn scan(&self, ctx: &ScanContext) -> ScannerResult {
        let Some(popular) = POPULAR_NAMES.as_ref() else {
            return ScannerResult::empty("typosquatting", "Popular packages list unavailable — skipped");
        };

        let input = strip_scope(&ctx.metadata.name).to_lowercase();

        if popular.iter().any(|p| strip_scope(p).to_lowercase() == input) {
            return ScannerResult::empty("typosquatting", "is a known popular package");
        }

        let mut candidates: Vec<(String, usize)> = popular
            .iter()
            .map(|p| {
                let stripped = strip_scope(p).to_lowercase();
                let distance = strsim::levenshtein(&input, &stripped);
                (p.clone(), distance)
            })
            .filter(|(_, distance)| *distance <= 2)
            .collect();

        candidates.sort_by_key(|(_, distance)| *distance);

        let mut findings = Vec::new();
        for (name, distance) in &candidates {
            let severity = if *distance == 1 {
                Severity::Critical
            } else {
                Severity::Warning
            };
            findings.push(Finding::new(
                "typosquatting",
                severity,
                format!("name is edit-distance {distance} from popular package '{name}'"),
            ));
        }

        let summary = if findings.is_empty() {
            "No typosquatting risk detected".to_string()
        } else {
            format!("{} close match(es) to popular package names", findings.len())
        };

        ScannerResult::new("typosquatting", findings, summary)
    }
}

fn strip_scope(name: &str) -> &str {
    match name.strip_prefix('@') {
        Some(rest) => rest.split_once('/').map(|(_, n)| n).unwrap_or(rest),
        None => name,
    }
}
