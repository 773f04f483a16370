//! Configuration module for the relation-discovery pipeline.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file (`ontext.toml`)
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `ONTEXT_` and use double
//! underscores to separate nested levels:
//! - `ONTEXT_FILTERS__MIN_SENTENCE_OCCURRENCES=3` sets `filters.min_sentence_occurrences`
//! - `ONTEXT_CLUSTERING__K=8` sets `clustering.k`
//! - `ONTEXT_LIMITS__MAX_CONTEXTS=50000` sets `limits.max_contexts`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

pub const CONFIG_FILE: &str = "ontext.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Path to the raw SVO corpus (tab-separated S, V, O, N)
    #[serde(default = "default_svo_path")]
    pub svo_path: PathBuf,

    /// Directory holding one instance file per category
    #[serde(default = "default_category_dir")]
    pub category_dir: PathBuf,

    /// Whitespace-separated `cat1 cat2 score` table of pairs to process
    #[serde(default = "default_categories_table")]
    pub categories_table: PathBuf,

    /// Base directory for run outputs (one timestamped subdirectory per run)
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Shared artifact cache directory; unset disables caching
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Prefix for cache filenames, identifying the corpus
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Preprocessing filter configuration
    #[serde(default)]
    pub filters: FilterConfig,

    /// Clustering configuration
    #[serde(default)]
    pub clustering: ClusteringConfig,

    /// Resource limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FilterConfig {
    /// Drop lines observed fewer than this many times
    #[serde(default = "default_min_sentence_occurrences")]
    pub min_sentence_occurrences: u64,

    /// Drop lines whose verb appears on fewer than this many distinct lines
    #[serde(default = "default_min_context_occurrences")]
    pub min_context_occurrences: u64,

    /// Drop lines whose unordered (S, O) pair appears on fewer lines than this
    #[serde(default = "default_min_pair_occurrences")]
    pub min_pair_occurrences: u64,

    /// Also keep lines whose subject is in Cat2 and object in Cat1
    #[serde(default = "default_true")]
    pub reverse_categories: bool,
}

/// Which clustering engine drives relation discovery.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClusterMethod {
    /// Dense co-occurrence matrix + k-means
    Matrix,
    /// Weighted co-occurrence graph + HCS
    Graph,
}

impl std::str::FromStr for ClusterMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "matrix" => Ok(Self::Matrix),
            "graph" => Ok(Self::Graph),
            other => Err(format!(
                "unknown clustering method '{other}' (expected 'matrix' or 'graph')"
            )),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClusteringConfig {
    /// Clustering engine to use
    #[serde(default = "default_method")]
    pub method: ClusterMethod,

    /// Number of clusters for the matrix path
    #[serde(default = "default_k")]
    pub k: usize,

    /// Promoted pairs per relation
    #[serde(default = "default_promote")]
    pub promote: usize,

    /// Seed for k-means++ initialization; pinned for reproducible runs
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Iteration cap for the k-means refinement loop
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Highly-connected threshold multiplier for the graph path
    #[serde(default = "default_hcs_multiplier")]
    pub hcs_multiplier: f64,

    /// Graph-path promotion: discard pairs with dominance score below 1
    #[serde(default = "default_true")]
    pub only_commonest: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LimitsConfig {
    /// Hard cap on distinct contexts; the dense matrix is quadratic in this
    #[serde(default = "default_max_contexts")]
    pub max_contexts: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default log level: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides, e.g. `pipeline = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_svo_path() -> PathBuf {
    PathBuf::from("svo-triples.txt")
}
fn default_category_dir() -> PathBuf {
    PathBuf::from("instances")
}
fn default_categories_table() -> PathBuf {
    PathBuf::from("categories.txt")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("ontext-runs")
}
fn default_cache_prefix() -> String {
    "svo".to_string()
}
fn default_min_sentence_occurrences() -> u64 {
    5
}
fn default_min_context_occurrences() -> u64 {
    3
}
fn default_min_pair_occurrences() -> u64 {
    5
}
fn default_true() -> bool {
    true
}
fn default_method() -> ClusterMethod {
    ClusterMethod::Matrix
}
fn default_k() -> usize {
    5
}
fn default_promote() -> usize {
    50
}
fn default_seed() -> u64 {
    42
}
fn default_max_iterations() -> usize {
    300
}
fn default_hcs_multiplier() -> f64 {
    2.0
}
fn default_max_contexts() -> usize {
    20_000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            svo_path: default_svo_path(),
            category_dir: default_category_dir(),
            categories_table: default_categories_table(),
            output_dir: default_output_dir(),
            cache_dir: None,
            cache_prefix: default_cache_prefix(),
            filters: FilterConfig::default(),
            clustering: ClusteringConfig::default(),
            limits: LimitsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_sentence_occurrences: default_min_sentence_occurrences(),
            min_context_occurrences: default_min_context_occurrences(),
            min_pair_occurrences: default_min_pair_occurrences(),
            reverse_categories: true,
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            k: default_k(),
            promote: default_promote(),
            seed: default_seed(),
            max_iterations: default_max_iterations(),
            hcs_multiplier: default_hcs_multiplier(),
            only_commonest: true,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_contexts: default_max_contexts(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources: defaults, then `ontext.toml`
    /// in the working directory, then `ONTEXT_*` environment variables.
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(&PathBuf::from(CONFIG_FILE))
    }

    /// Load configuration with an explicit TOML path.
    pub fn load_from(config_path: &PathBuf) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("ONTEXT_").split("__"))
            .extract()
    }

    /// Write a commented default configuration file.
    pub fn init_config_file(force: bool) -> std::io::Result<PathBuf> {
        let path = PathBuf::from(CONFIG_FILE);
        if path.exists() && !force {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{CONFIG_FILE} already exists (use --force to overwrite)"),
            ));
        }

        let defaults = Settings::default();
        let body = toml::to_string_pretty(&defaults)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(&path, body)?;
        Ok(path)
    }

    /// Check whether a configuration file is present, for a friendlier
    /// first-run message.
    pub fn check_init() -> Result<(), String> {
        if PathBuf::from(CONFIG_FILE).exists() {
            Ok(())
        } else {
            Err(format!(
                "No {CONFIG_FILE} found. Run 'ontext init' to create one."
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.filters.min_sentence_occurrences, 5);
        assert_eq!(s.filters.min_context_occurrences, 3);
        assert_eq!(s.filters.min_pair_occurrences, 5);
        assert_eq!(s.clustering.k, 5);
        assert_eq!(s.clustering.promote, 50);
        assert_eq!(s.limits.max_contexts, 20_000);
        assert_eq!(s.clustering.method, ClusterMethod::Matrix);
    }

    #[test]
    fn cluster_method_parses_from_str() {
        assert_eq!("matrix".parse::<ClusterMethod>(), Ok(ClusterMethod::Matrix));
        assert_eq!("graph".parse::<ClusterMethod>(), Ok(ClusterMethod::Graph));
        assert!("spectral".parse::<ClusterMethod>().is_err());
    }
}
