pub mod binaries;
pub mod dependencies;
pub mod hooks;
pub mod ioc;
pub mod obfuscation;
pub mod secrets;
pub mod static_pattern;
pub mod typosquatting;

use crate::context::ScanContext;
use crate::shared::models::ScannerResult;

/// One independent static analyzer over a `ScanContext`. Infallible by construction:
/// any internal error is caught inside `scan()` and converted to an empty or
/// summary-only result, never propagated (spec invariant: no scanner's failure may
/// affect another scanner).
pub trait Scanner {
    fn id(&self) -> &'static str;
    fn scan(&self, ctx: &ScanContext) -> ScannerResult;
}

/// The fixed canonical scanner set, alphabetical by identity — matches the order
/// the report lists scanners in for machine output.
pub fn canonical_scanners() -> Vec<Box<dyn Scanner + Send + Sync>> {
    vec![
        Box::new(binaries::BinaryScanner),
        Box::new(dependencies::DependencyScanner),
        Box::new(hooks::LifecycleHookScanner),
        Box::new(ioc::IocExtractor),
        Box::new(obfuscation::ObfuscationScanner),
        Box::new(secrets::SecretScanner),
        Box::new(static_pattern::StaticPatternScanner),
        Box::new(typosquatting::TyposquattingScanner),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_is_alphabetical() {
        let ids: Vec<&'static str> = canonical_scanners().iter().map(|s| s.id()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn canonical_set_is_fixed() {
        let ids: Vec<&'static str> = canonical_scanners().iter().map(|s| s.id()).collect();
        assert_eq!(
            ids,
            vec![
                "binaries",
                "dependencies",
                "hooks",
                "ioc",
                "obfuscation",
                "secrets",
                "static",
                "typosquatting",
            ]
        );
    }
}
