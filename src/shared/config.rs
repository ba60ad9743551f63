use crate::shared::models::Grade;
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub whitelist: WhitelistConfig,
}

/// Grade-based exit policy (spec.md §6 exit-code contract, user-overridable
/// per SPEC_FULL.md §10.3).
#[derive(Debug, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default = "default_block_at")]
    pub block_at: String,
    #[serde(default = "default_warn_at")]
    pub warn_at: String,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            block_at: default_block_at(),
            warn_at: default_warn_at(),
        }
    }
}

impl ThresholdConfig {
    /// Map a grade to an exit code (spec.md §6) using this config's block/warn
    /// grade letters: grades at or past `block_at` exit 2, grades at or past
    /// `warn_at` (but short of `block_at`) exit 1, everything better exits 0.
    /// An unrecognized letter falls back to the matching default.
    pub fn exit_code_for_grade(&self, grade: Grade) -> i32 {
        let rank = grade_rank(grade);
        let block_rank = letter_rank(&self.block_at).unwrap_or_else(|| letter_rank(&default_block_at()).unwrap());
        let warn_rank = letter_rank(&self.warn_at).unwrap_or_else(|| letter_rank(&default_warn_at()).unwrap());

        if rank >= block_rank {
            2
        } else if rank >= warn_rank {
            1
        } else {
            0
        }
    }
}

fn grade_rank(grade: Grade) -> u8 {
    match grade {
        Grade::A => 0,
        Grade::B => 1,
        Grade::C => 2,
        Grade::D => 3,
        Grade::F => 4,
    }
}

fn letter_rank(letter: &str) -> Option<u8> {
    match letter.trim().to_ascii_uppercase().as_str() {
        "A" => Some(0),
        "B" => Some(1),
        "C" => Some(2),
        "D" => Some(3),
        "F" => Some(4),
        _ => None,
    }
}

fn default_block_at() -> String {
    "D".to_string()
}

fn default_warn_at() -> String {
    "C".to_string()
}

#[derive(Debug, Deserialize, Default)]
pub struct WhitelistConfig {
    #[serde(default)]
    pub packages: Vec<String>,
}

impl WhitelistConfig {
    pub fn contains(&self, package_name: &str) -> bool {
        self.packages.iter().any(|p| p == package_name)
    }
}

/// Load config from `$XDG_CONFIG_HOME/regtrust/config.toml` (falling back to
/// `~/.config/regtrust/config.toml`), falling back to defaults on any
/// read/parse error — never panics, matching the teacher's `load_config`.
pub fn load_config() -> Config {
    let path = config_path();
    match std::fs::read_to_string(&path) {
        Ok(content) => toml::from_str(&content).unwrap_or_default(),
        Err(_) => Config::default(),
    }
}

/// Persist a package name into the whitelist, creating the config file if needed.
pub fn allow_package(package_name: &str) -> Result<(), String> {
    let path = config_path();
    let mut config = load_config();

    if !config.whitelist.contains(package_name) {
        config.whitelist.packages.push(package_name.to_string());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| format!("failed to create config directory: {e}"))?;
    }

    let serialized = toml::to_string_pretty(&ConfigOut {
        thresholds: OutThresholds {
            block_at: config.thresholds.block_at,
            warn_at: config.thresholds.warn_at,
        },
        whitelist: OutWhitelist { packages: config.whitelist.packages },
    })
    .map_err(|e| format!("failed to serialize config: {e}"))?;

    std::fs::write(&path, serialized).map_err(|e| format!("failed to write config: {e}"))
}

#[derive(serde::Serialize)]
struct ConfigOut {
    thresholds: OutThresholds,
    whitelist: OutWhitelist,
}

#[derive(serde::Serialize)]
struct OutThresholds {
    block_at: String,
    warn_at: String,
}

#[derive(serde::Serialize)]
struct OutWhitelist {
    packages: Vec<String>,
}

fn config_path() -> std::path::PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        std::path::PathBuf::from(xdg).join("regtrust").join("config.toml")
    } else if let Ok(home) = std::env::var("HOME") {
        std::path::PathBuf::from(home)
            .join(".config")
            .join("regtrust")
            .join("config.toml")
    } else {
        std::path::PathBuf::from("/etc/regtrust/config.toml")
    }
}
