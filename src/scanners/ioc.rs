use crate::context::ScanContext;
use crate::path_classifier;
use crate::scanners::Scanner;
use crate::shared::models::{Finding, ScannerResult, Severity};
use crate::shared::walk::walk_files;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::LazyLock;

const TEXT_LIKE_EXTENSIONS: &[&str] = &[
    ".js", ".mjs", ".cjs", ".ts", ".tsx", ".jsx", ".json", ".md", ".markdown", ".yml", ".yaml",
    ".txt", ".sh", ".html", ".htm", ".xml", ".cfg", ".ini", ".toml",
];

#[derive(Deserialize)]
struct Domains {
    domains: Vec<String>,
}

#[derive(Deserialize)]
struct Ips {
    ips: Vec<String>,
}

static IGNORED_DOMAINS: LazyLock<Option<Vec<String>>> = LazyLock::new(|| {
    toml::from_str::<Domains>(include_str!("../../data/ignored_domains.toml"))
        .ok()
        .map(|d| d.domains)
});

static IGNORED_IPS: LazyLock<Option<Vec<String>>> = LazyLock::new(|| {
    toml::from_str::<Ips>(include_str!("../../data/ignored_ips.toml"))
        .ok()
        .map(|i| i.ips)
});

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\b(?:https?|ftp)://[^\s'"<>]+"#).unwrap());
static IPV4_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d+)\.(\d+)\.(\d+)\.(\d+)\b").unwrap());
static HEX_ESCAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\\x[0-9a-fA-F]{2}){4,}").unwrap());
static UNICODE_ESCAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\\u[0-9a-fA-F]{4}){4,}").unwrap());
static CHARCODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"String\.fromCharCode\(([0-9,\s]+)\)").unwrap());
static BASE64_CANDIDATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9+/]{20,}={0,2}").unwrap());

#[derive(Clone, Copy, PartialEq, Eq)]
enum DecodedFrom {
    Plaintext,
    Hex,
    Unicode,
    Charcode,
    Base64,
}

impl DecodedFrom {
    fn label(self) -> &'static str {
        match self {
            DecodedFrom::Plaintext => "plaintext",
            DecodedFrom::Hex => "hex",
            DecodedFrom::Unicode => "unicode",
            DecodedFrom::Charcode => "charcode",
            DecodedFrom::Base64 => "base64",
        }
    }
}

struct IocRecord {
    kind_is_url: bool,
    defanged: String,
    decoded_from: DecodedFrom,
    locations: Vec<String>,
    count: usize,
}

pub struct IocExtractor;

impl Scanner for IocExtractor {
    fn id(&self) -> &'static str {
        "ioc"
    }

    fn scan(&self, ctx: &ScanContext) -> ScannerResult {
        if !ctx.artifact_root.is_dir() {
            return ScannerResult::empty("ioc", "No indicators of compromise found");
        }

        let mut records: HashMap<String, IocRecord> = HashMap::new();

        let mut walked: Vec<_> = walk_files(&ctx.artifact_root)
            .into_iter()
            .filter(|f| !path_classifier::is_always_skip(&f.rel_path))
            .filter(|f| is_text_like(&f.rel_path))
            .collect();
        walked.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));

        for file in walked {
            let Ok(content) = std::fs::read_to_string(&file.abs_path) else {
                continue;
            };

            for (line_no, line) in content.lines().enumerate() {
                let location = format!("{}:{}", file.rel_path, line_no + 1);
                record_plaintext_hits(line, &location, &mut records);
                record_deobfuscated_hits(line, &location, &mut records);
            }
        }

        let mut findings: Vec<Finding> = Vec::new();
        let mut url_count = 0;
        let mut ip_count = 0;

        let mut keys: Vec<&String> = records.keys().collect();
        keys.sort();

        for key in keys {
            let record = &records[key];
            if record.kind_is_url {
                url_count += 1;
            } else {
                ip_count += 1;
            }

            let severity = if record.decoded_from == DecodedFrom::Plaintext {
                Severity::Info
            } else {
                Severity::Warning
            };

            let origin = if record.decoded_from == DecodedFrom::Plaintext {
                String::new()
            } else {
                format!(" (decoded-from: {})", record.decoded_from.label())
            };

            let message = format!(
                "{} {}{} — seen {} time(s) at {}",
                if record.kind_is_url { "URL" } else { "IP" },
                record.defanged,
                origin,
                record.count,
                record.locations.join(", ")
            );

            findings.push(Finding::new("ioc", severity, message));
        }

        ScannerResult::new(
            "ioc",
            findings,
            format!("{url_count} URL(s), {ip_count} IP(s) found"),
        )
    }
}

fn is_text_like(path: &str) -> bool {
    TEXT_LIKE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

fn record_plaintext_hits(line: &str, location: &str, records: &mut HashMap<String, IocRecord>) {
    for url in extract_urls(line) {
        record_hit(&url, true, DecodedFrom::Plaintext, location, records);
    }
    for ip in extract_ips(line) {
        record_hit(&ip, false, DecodedFrom::Plaintext, location, records);
    }
}

fn record_deobfuscated_hits(line: &str, location: &str, records: &mut HashMap<String, IocRecord>) {
    for fragment in decode_fragments(line) {
        for url in extract_urls(&fragment.text) {
            record_hit(&url, true, fragment.from, location, records);
        }
        for ip in extract_ips(&fragment.text) {
            record_hit(&ip, false, fragment.from, location, records);
        }
    }
}

fn record_hit(
    value: &str,
    is_url: bool,
    from: DecodedFrom,
    location: &str,
    records: &mut HashMap<String, IocRecord>,
) {
    if is_url {
        if let Some(host) = extract_host(value) {
            if is_ignored_domain(&host) {
                return;
            }
        }
    } else if is_ignored_ip(value) {
        return;
    }

    let defanged = if is_url { defang_url(value) } else { defang_ip(value) };

    records
        .entry(value.to_string())
        .and_modify(|r| {
            r.count += 1;
            if r.locations.len() < 5 {
                r.locations.push(location.to_string());
            }
            // First-writer-wins: plaintext beats decoded, never downgrade.
            if r.decoded_from != DecodedFrom::Plaintext && from == DecodedFrom::Plaintext {
                r.decoded_from = DecodedFrom::Plaintext;
            }
        })
        .or_insert_with(|| IocRecord {
            kind_is_url: is_url,
            defanged,
            decoded_from: from,
            locations: vec![location.to_string()],
            count: 1,
        });
}

fn extract_urls(text: &str) -> Vec<String> {
    URL_RE
        .find_iter(text)
        .map(|m| trim_trailing_punctuation(m.as_str()).to_string())
        .collect()
}

fn extract_ips(text: &str) -> Vec<String> {
    IPV4_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?.as_str();
            for i in 1..=4 {
                let octet: u32 = caps.get(i)?.as_str().parse().ok()?;
                if octet > 255 {
                    return None; // looks like a dotted version number, not an IP
                }
            }
            Some(trim_trailing_punctuation(whole).to_string())
        })
        .collect()
}

fn trim_trailing_punctuation(s: &str) -> &str {
    s.trim_end_matches(['.', ',', ')', ';', '"', '\''])
}

fn extract_host(url: &str) -> Option<String> {
    let after_scheme = url.split_once("://")?.1;
    let host_and_rest = after_scheme.split(['/', '?', '#']).next()?;
    let host = host_and_rest.split(['@']).next_back()?;
    let host = host.split(':').next()?;
    Some(host.to_lowercase())
}

fn is_ignored_domain(host: &str) -> bool {
    let Some(ignored) = IGNORED_DOMAINS.as_ref() else {
        return false;
    };
    ignored
        .iter()
        .any(|d| host == d.as_str() || host.ends_with(&format!(".{d}")))
}

fn is_ignored_ip(ip: &str) -> bool {
    let Some(ignored) = IGNORED_IPS.as_ref() else {
        return false;
    };
    ignored.iter().any(|i| i == ip)
}

fn defang_url(url: &str) -> String {
    let (scheme, rest) = url.split_once("://").unwrap_or(("", url));
    let defanged_scheme = match scheme.to_lowercase().as_str() {
        "http" => "hxxp",
        "https" => "hxxps",
        "ftp" => "fxp",
        other => other,
    };

    let (host, path) = match rest.split_once('/') {
        Some((h, p)) => (h, format!("/{p}")),
        None => (rest, String::new()),
    };
    let defanged_host = host.replace('.', "[.]");

    format!("{defanged_scheme}[://]{defanged_host}{path}")
}

fn defang_ip(ip: &str) -> String {
    ip.replace('.', "[.]")
}

struct DecodedFragment {
    text: String,
    from: DecodedFrom,
}

fn decode_fragments(line: &str) -> Vec<DecodedFragment> {
    let mut out = Vec::new();

    for m in HEX_ESCAPE_RE.find_iter(line) {
        if let Some(decoded) = decode_hex_escapes(m.as_str()) {
            out.push(DecodedFragment {
                text: decoded,
                from: DecodedFrom::Hex,
            });
        }
    }

    for m in UNICODE_ESCAPE_RE.find_iter(line) {
        if let Some(decoded) = decode_unicode_escapes(m.as_str()) {
            out.push(DecodedFragment {
                text: decoded,
                from: DecodedFrom::Unicode,
            });
        }
    }

    for caps in CHARCODE_RE.captures_iter(line) {
        if let Some(decoded) = decode_charcodes(&caps[1]) {
            out.push(DecodedFragment {
                text: decoded,
                from: DecodedFrom::Charcode,
            });
        }
    }

    for m in BASE64_CANDIDATE_RE.find_iter(line) {
        if let Some(decoded) = decode_base64_if_printable(m.as_str()) {
            out.push(DecodedFragment {
                text: decoded,
                from: DecodedFrom::Base64,
            });
        }
    }

    out
}

fn decode_hex_escapes(run: &str) -> Option<String> {
    let mut bytes = Vec::new();
    let mut chars = run.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&'x') {
            chars.next();
            let hex: String = chars.by_ref().take(2).collect();
            let byte = u8::from_str_radix(&hex, 16).ok()?;
            bytes.push(byte);
        }
    }
    Some(String::from_utf8_lossy(&bytes).to_string())
}

fn decode_unicode_escapes(run: &str) -> Option<String> {
    let mut units = Vec::new();
    let mut chars = run.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&'u') {
            chars.next();
            let hex: String = chars.by_ref().take(4).collect();
            let unit = u16::from_str_radix(&hex, 16).ok()?;
            units.push(unit);
        }
    }
    Some(String::from_utf16_lossy(&units))
}

fn decode_charcodes(args: &str) -> Option<String> {
    let mut out = String::new();
    for part in args.split(',') {
        let n: u32 = part.trim().parse().ok()?;
        if n > 0x10FFFF {
            return None;
        }
        out.push(char::from_u32(n).unwrap_or('\u{FFFD}'));
    }
    Some(out)
}

fn decode_base64_if_printable(candidate: &str) -> Option<String> {
    use base64::Engine;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(candidate)
        .ok()?;
    if decoded.len() < 6 {
        return None;
    }
    let printable = decoded
        .iter()
        .filter(|&&b| (0x20..=0x7e).contains(&b) || b == b'\n' || b == b'\t')
        .count();
    if (printable as f64 / decoded.len() as f64) < 0.8 {
        return None;
    }
    Some(String::from_utf8_lossy(&decoded).to_string())
}
