use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::tiers::TierMode;

pub const CONFIG_JSON: &str = ".callsight.json";
pub const CONFIG_TOML: &str = ".callsight.toml";

/// Hard safety ceiling: files larger than this are **always** skipped, regardless of config.
/// Generated sources past this size are not worth a tree-sitter parse.
pub const ABSOLUTE_MAX_FILE_BYTES: u64 = 1_000_000; // 1 MB

/// Controls workspace scanning behavior (what to skip).
///
/// Note: `.gitignore` is always respected by the scanner; these are additional
/// hard skips.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory *names* to skip anywhere in the tree (e.g. "Generated", "Migrations").
    ///
    /// These are compared against path components, not full paths.
    pub exclude_dir_names: Vec<String>,
    /// Lowercase extensions, without the dot.
    pub extensions: Vec<String>,
    pub max_file_bytes: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            exclude_dir_names: vec![],
            extensions: vec!["cs".to_string()],
            max_file_bytes: 512 * 1024,
        }
    }
}

impl ScanConfig {
    pub fn effective_max_file_bytes(&self) -> u64 {
        self.max_file_bytes.min(ABSOLUTE_MAX_FILE_BYTES)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Depth used by chain and reachability tools when the caller gives none.
    pub default_max_depth: usize,
    pub shortest_path_max_depth: usize,
    /// Upper bound on paths enumerated between two routines.
    pub max_paths: usize,
    pub tier: TierMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_max_depth: 10,
            shortest_path_max_depth: 20,
            max_paths: 1000,
            tier: TierMode::Auto,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Per-document artifacts kept after a snapshot build.
    pub max_documents: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_documents: 2048 }
    }
}

/// Which files count as test code for `find_test_only_methods`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestPathConfig {
    /// Glob patterns, matched case-insensitively against `/`-separated relative paths.
    pub patterns: Vec<String>,
}

impl Default for TestPathConfig {
    fn default() -> Self {
        Self {
            patterns: [
                "**/*Test*/**",
                "**/*Tests.cs",
                "**/*Test.cs",
                "**/test/**",
                "**/tests/**",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Settings that govern file discovery and exclusion.
    pub scan: ScanConfig,
    pub engine: EngineConfig,
    pub cache: CacheConfig,
    pub test_paths: TestPathConfig,
}

/// Load `.callsight.json`, else `.callsight.toml`, else defaults. A file that
/// fails to parse is reported and ignored.
pub fn load_config(repo_root: &Path) -> Config {
    let json = repo_root.join(CONFIG_JSON);
    if let Ok(text) = std::fs::read_to_string(&json) {
        match serde_json::from_str::<Config>(&text) {
            Ok(cfg) => return cfg,
            Err(e) => warn!(path = %json.display(), error = %e, "invalid config; using defaults"),
        }
        return Config::default();
    }

    let toml_path = repo_root.join(CONFIG_TOML);
    if let Ok(text) = std::fs::read_to_string(&toml_path) {
        match toml::from_str::<Config>(&text) {
            Ok(cfg) => return cfg,
            Err(e) => warn!(path = %toml_path.display(), error = %e, "invalid config; using defaults"),
        }
    }
    Config::default()
}
