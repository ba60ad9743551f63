use crate::context::ScanContext;
use crate::path_classifier;
use crate::scanners::Scanner;
use crate::shared::entropy::shannon_entropy;
use crate::shared::models::{Finding, ScannerResult, Severity};
use crate::shared::walk::walk_files;
use regex::Regex;
use std::sync::LazyLock;

const ENTROPY_WARNING: f64 = 6.2;
const ENTROPY_CRITICAL: f64 = 6.8;
const MINIFIED_KEYWORDS: &[&str] = &[
    "function", "return", "var", "let", "const", "if", "else", "for", "while", "class", "export",
    "import", "typeof", "instanceof",
];

static HEX_ESCAPE_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\\x[0-9a-fA-F]{2}){4,}").unwrap());
/// A hex-escape *run* for the string-array readability check (spec.md:120):
/// two or more consecutive `\xNN` escapes, mirroring `UNICODE_ESCAPE_RUN_RE`'s
/// `{2,}` threshold rather than §4.3(b)'s unrelated `{4,}` file-level marker.
static HEX_ESCAPE_ELEMENT_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\\x[0-9a-fA-F]{2}){2,}").unwrap());
static BASE64_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9+/]{500,}={0,2}").unwrap());
static ROTATION_VAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_0x[0-9a-fA-F]+\s*=\s*$").unwrap());
static UNICODE_ESCAPE_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\\u[0-9a-fA-F]{4}){2,}").unwrap());

pub struct ObfuscationScanner;

impl Scanner for ObfuscationScanner {
    fn id(&self) -> &'static str {
        "obfuscation"
    }

    fn scan(&self, ctx: &ScanContext) -> ScannerResult {
        if !ctx.artifact_root.is_dir() {
            return ScannerResult::empty("obfuscation", "No obfuscation detected");
        }

        let mut findings = Vec::new();

        let mut walked: Vec<_> = walk_files(&ctx.artifact_root)
            .into_iter()
            .filter(|f| path_classifier::is_scannable_source(&f.rel_path))
            .collect();
        walked.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));

        for file in walked {
            let Ok(content) = std::fs::read_to_string(&file.abs_path) else {
                continue;
            };

            scan_entropy(&content, &file.rel_path, &mut findings);
            scan_hex_escapes(&content, &file.rel_path, &mut findings);
            scan_base64_blobs(&content, &file.rel_path, &mut findings);
            scan_long_lines(&content, &file.rel_path, &mut findings);
            scan_string_arrays(&content, &file.rel_path, &mut findings);
        }

        let critical = findings.iter().filter(|f| f.severity == Severity::Critical).count();
        let warning = findings.iter().filter(|f| f.severity == Severity::Warning).count();
        let info = findings.iter().filter(|f| f.severity == Severity::Info).count();

        let summary = if findings.is_empty() {
            "No obfuscation detected".to_string()
        } else {
            format!("Obfuscation indicators: {critical} critical, {warning} warning, {info} info")
        };

        ScannerResult::new("obfuscation", findings, summary)
    }
}

fn scan_entropy(content: &str, rel_path: &str, findings: &mut Vec<Finding>) {
    if content.len() < 256 {
        return;
    }

    let entropy = shannon_entropy(content.as_bytes());
    if entropy < ENTROPY_WARNING {
        return;
    }

    let minified = looks_minified(content);

    let severity = if minified {
        Severity::Info
    } else if entropy >= ENTROPY_CRITICAL {
        Severity::Critical
    } else {
        Severity::Warning
    };

    let message = if minified {
        format!("High entropy ({entropy:.2} bits/byte) but file looks like minified source")
    } else {
        format!("High entropy ({entropy:.2} bits/byte), consistent with obfuscated or packed code")
    };

    findings.push(Finding::new("obfuscation", severity, message).with_file(rel_path.to_string()));
}

fn looks_minified(content: &str) -> bool {
    let has_long_line = content.lines().any(|l| l.len() > 500);
    if !has_long_line {
        return false;
    }

    let has_keywords = MINIFIED_KEYWORDS.iter().any(|kw| content.contains(kw));
    if !has_keywords {
        return false;
    }

    let hex_run_count = HEX_ESCAPE_RUN_RE.find_iter(content).count();
    hex_run_count < 6
}

fn scan_hex_escapes(content: &str, rel_path: &str, findings: &mut Vec<Finding>) {
    for (line_no, line) in content.lines().enumerate() {
        if HEX_ESCAPE_RUN_RE.is_match(line) {
            findings.push(
                Finding::new(
                    "obfuscation",
                    Severity::Warning,
                    "hex-escape sequence run, possible obfuscated string",
                )
                .with_file(rel_path.to_string())
                .with_line(line_no + 1)
                .with_evidence(truncate(line.trim(), 200)),
            );
        }
    }
}

fn scan_base64_blobs(content: &str, rel_path: &str, findings: &mut Vec<Finding>) {
    for (line_no, line) in content.lines().enumerate() {
        if BASE64_RUN_RE.is_match(line) {
            findings.push(
                Finding::new("obfuscation", Severity::Warning, "long base64-like blob")
                    .with_file(rel_path.to_string())
                    .with_line(line_no + 1)
                    .with_evidence(truncate(line.trim(), 200)),
            );
        }
    }
}

fn scan_long_lines(content: &str, rel_path: &str, findings: &mut Vec<Finding>) {
    for (line_no, line) in content.lines().enumerate() {
        if line.len() > 1000 {
            findings.push(
                Finding::new(
                    "obfuscation",
                    Severity::Info,
                    "possible minification without source maps",
                )
                .with_file(rel_path.to_string())
                .with_line(line_no + 1),
            );
        }
    }
}

/// One element collected from the string-array micro-parse.
struct ArrayElement {
    text: String,
}

fn scan_string_arrays(content: &str, rel_path: &str, findings: &mut Vec<Finding>) {
    let bytes = content.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'[' {
            i += 1;
            continue;
        }

        let open_idx = i;
        let (elements, end_idx) = parse_string_array(content, open_idx + 1);

        if elements.len() >= 50 {
            classify_string_array(content, open_idx, end_idx, &elements, rel_path, findings);
        }

        i = if end_idx > open_idx { end_idx } else { open_idx + 1 };
    }
}

/// Parse quoted-string elements starting at `start`, advancing past whitespace and
/// commas, until `]` or a non-string element. Returns the elements and the byte
/// index just past the closing `]` (or just past the last consumed element if no
/// `]` was found).
fn parse_string_array(content: &str, start: usize) -> (Vec<ArrayElement>, usize) {
    let bytes = content.as_bytes();
    let mut i = start;
    let mut elements = Vec::new();

    loop {
        while i < bytes.len() && (bytes[i] as char).is_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            return (elements, i);
        }
        if bytes[i] == b',' {
            i += 1;
            continue;
        }
        if bytes[i] == b']' {
            return (elements, i + 1);
        }
        if bytes[i] == b'\'' || bytes[i] == b'"' || bytes[i] == b'`' {
            let quote = bytes[i];
            let str_start = i + 1;
            let mut j = str_start;
            while j < bytes.len() && bytes[j] != quote {
                if bytes[j] == b'\\' && j + 1 < bytes.len() {
                    j += 2;
                    continue;
                }
                j += 1;
            }
            if j >= bytes.len() {
                return (elements, i);
            }
            elements.push(ArrayElement {
                text: content[str_start..j].to_string(),
            });
            i = j + 1;
            continue;
        }

        // Non-string element — stop here, this isn't (or isn't purely) a string array.
        return (elements, i);
    }
}

fn classify_string_array(
    content: &str,
    open_idx: usize,
    end_idx: usize,
    elements: &[ArrayElement],
    rel_path: &str,
    findings: &mut Vec<Finding>,
) {
    let before_start = open_idx.saturating_sub(50);
    let before_window = &content[before_start..open_idx];
    let has_rotation_var = ROTATION_VAR_RE.is_match(before_window);

    let after_end = (end_idx + 500).min(content.len());
    let after_window = if end_idx < content.len() {
        &content[end_idx..after_end]
    } else {
        ""
    };
    let has_push = after_window.contains(".push(");
    let has_shift = after_window.contains(".shift(");
    let has_rotation_call = has_push && has_shift;

    let readable_count = elements
        .iter()
        .filter(|e| {
            let has_letter = e.text.chars().any(|c| c.is_alphabetic());
            let has_hex_run = HEX_ESCAPE_ELEMENT_RUN_RE.is_match(&e.text);
            let has_unicode_run = UNICODE_ESCAPE_RUN_RE.is_match(&e.text);
            has_letter && !has_hex_run && !has_unicode_run
        })
        .count();
    let readability_ratio = readable_count as f64 / elements.len() as f64;
    let avg_len = elements.iter().map(|e| e.text.len()).sum::<usize>() as f64 / elements.len() as f64;

    if has_rotation_var && has_rotation_call {
        findings.push(
            Finding::new(
                "obfuscation",
                Severity::Critical,
                format!(
                    "large string array ({} elements) matches decode-rotation obfuscator pattern",
                    elements.len()
                ),
            )
            .with_file(rel_path.to_string()),
        );
    } else if readability_ratio >= 0.3 && avg_len >= 2.0 {
        findings.push(
            Finding::new(
                "obfuscation",
                Severity::Info,
                format!("large string array ({} elements), looks like bundled data", elements.len()),
            )
            .with_file(rel_path.to_string()),
        );
    } else {
        findings.push(
            Finding::new(
                "obfuscation",
                Severity::Info,
                format!(
                    "large string array ({} elements), low readability but no rotation marker",
                    elements.len()
                ),
            )
            .with_file(rel_path.to_string()),
        );
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
    use crate::shared::models::PackageMetadata;
    use std::collections::HashMap;
    use std::fs;
    use std::path::PathBuf;

    fn make_ctx(dir: &PathBuf) -> ScanContext {
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
            false,
        )
    }

    fn tmp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("regtrust-obf-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn flags_hex_escape_runs() {
        let dir = tmp_dir("hex");
        fs::write(dir.join("index.js"), "const s = \"\\x61\\x62\\x63\\x64\\x65\";\n").unwrap();
        let ctx = make_ctx(&dir);
        let result = ObfuscationScanner.scan(&ctx);
        assert!(result.findings.iter().any(|f| f.message.contains("hex-escape")));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn flags_long_base64_blob() {
        let dir = tmp_dir("b64");
        let blob = "A".repeat(600);
        fs::write(dir.join("index.js"), format!("const s = \"{blob}\";\n")).unwrap();
        let ctx = make_ctx(&dir);
        let result = ObfuscationScanner.scan(&ctx);
        assert!(result.findings.iter().any(|f| f.message.contains("base64")));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn flags_very_long_line_as_info() {
        let dir = tmp_dir("longline");
        let line = "x".repeat(1200);
        fs::write(dir.join("index.js"), format!("{line}\n")).unwrap();
        let ctx = make_ctx(&dir);
        let result = ObfuscationScanner.scan(&ctx);
        let f = result
            .findings
            .iter()
            .find(|f| f.message.contains("minification"))
            .unwrap();
        assert_eq!(f.severity, Severity::Info);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn minified_code_downgrades_entropy_to_info() {
        let dir = tmp_dir("minified");
        // Long line with recognizable keywords and no hex escapes, random-ish identifiers.
        let mut line = String::from("function ");
        for i in 0..200 {
            line.push_str(&format!("xQ{i}zK{i}wP "));
        }
        line.push_str("return var let const if else for while class export import typeof instanceof");
        fs::write(dir.join("index.js"), format!("{line}\n")).unwrap();
        let ctx = make_ctx(&dir);
        let result = ObfuscationScanner.scan(&ctx);
        // Either no entropy finding (below threshold) or downgraded to info — never critical/warning.
        assert!(!result
            .findings
            .iter()
            .any(|f| f.message.contains("entropy") && f.severity != Severity::Info));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn detects_rotation_obfuscated_string_array() {
        let dir = tmp_dir("rotation");
        let mut src = String::from("var _0x4a2b = [\n");
        for i in 0..60 {
            src.push_str(&format!("  \"\\x61\\x62\\x63{i}\",\n"));
        }
        src.push_str("];\n");
        src.push_str("(function(a,b){ a.push(b); a.shift(); })();\n");
        fs::write(dir.join("index.js"), src).unwrap();
        let ctx = make_ctx(&dir);
        let result = ObfuscationScanner.scan(&ctx);
        assert!(result
            .findings
            .iter()
            .any(|f| f.severity == Severity::Critical && f.message.contains("rotation")));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn large_readable_string_array_classified_as_data() {
        let dir = tmp_dir("data-array");
        let mut src = String::from("var keywords = [\n");
        for i in 0..60 {
            src.push_str(&format!("  \"keyword{i}\",\n"));
        }
        src.push_str("];\n");
        fs::write(dir.join("index.js"), src).unwrap();
        let ctx = make_ctx(&dir);
        let result = ObfuscationScanner.scan(&ctx);
        assert!(result
            .findings
            .iter()
            .any(|f| f.severity == Severity::Info && f.message.contains("bundled data")));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_artifact_directory_passes() {
        let ctx = make_ctx(&PathBuf::from("/nonexistent/regtrust-path"));
        let result = ObfuscationScanner.scan(&ctx);
        assert!(result.passed);
    }

    #[test]
    fn non_adjacent_hex_escapes_do_not_count_as_a_run() {
        // Two isolated \xNN escapes, never consecutive — should read as
        // readable text, not be excluded from readable_count.
        assert!(!HEX_ESCAPE_ELEMENT_RUN_RE.is_match("\\x41 middle \\x42 end"));
        assert!(HEX_ESCAPE_ELEMENT_RUN_RE.is_match("\\x41\\x42 end"));
    }

    #[test]
    fn large_array_of_non_adjacent_hex_escapes_classified_as_data() {
        let dir = tmp_dir("data-array-sparse-hex");
        let mut src = String::from("var keywords = [\n");
        for i in 0..60 {
            src.push_str(&format!("  \"\\x41 word{i} \\x42\",\n"));
        }
        src.push_str("];\n");
        fs::write(dir.join("index.js"), src).unwrap();
        let ctx = make_ctx(&dir);
        let result = ObfuscationScanner.scan(&ctx);
        assert!(result
            .findings
            .iter()
            .any(|f| f.severity == Severity::Info && f.message.contains("bundled data")));
        fs::remove_dir_all(&dir).ok();
    }
}
