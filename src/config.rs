//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.psulens.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Language model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Classifier settings.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Recommendation settings.
    #[serde(default)]
    pub recommend: RecommendConfig,

    /// Dataset settings.
    #[serde(default)]
    pub data: DataConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Default output style (bullet, narrative, table).
    #[serde(default = "default_style")]
    pub style: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            style: default_style(),
        }
    }
}

fn default_style() -> String {
    "bullet".to_string()
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Whether to consult the language model at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds. On timeout the pipeline falls back
    /// to its rule-based path; no retry is attempted.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: default_model(),
            ollama_url: default_ollama_url(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_timeout() -> u64 {
    30
}

/// Classifier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Minimum normalized fuzzy score to accept an entity match.
    #[serde(default = "default_fuzzy_accept")]
    pub fuzzy_accept: f32,

    /// Clarifying candidates attached to an ambiguous query.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            fuzzy_accept: default_fuzzy_accept(),
            max_candidates: default_max_candidates(),
        }
    }
}

fn default_fuzzy_accept() -> f32 {
    0.75
}

fn default_max_candidates() -> usize {
    3
}

/// Recommendation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendConfig {
    /// Growth rate below which a target is flagged.
    #[serde(default = "default_growth_threshold")]
    pub growth_threshold: f64,

    /// Consecutive declining ROI steps needed to flag a target.
    #[serde(default = "default_roi_decline_years")]
    pub roi_decline_years: usize,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            growth_threshold: default_growth_threshold(),
            roi_decline_years: default_roi_decline_years(),
        }
    }
}

fn default_growth_threshold() -> f64 {
    0.02
}

fn default_roi_decline_years() -> usize {
    2
}

/// Dataset settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Dataset file path.
    #[serde(default = "default_data_path")]
    pub path: String,

    /// PSUs to create when generating a synthetic dataset.
    #[serde(default = "default_psu_count")]
    pub psu_count: usize,

    /// First year of generated data.
    #[serde(default = "default_start_year")]
    pub start_year: i32,

    /// Last year of generated data.
    #[serde(default = "default_end_year")]
    pub end_year: i32,

    /// Seed for deterministic generation.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: default_data_path(),
            psu_count: default_psu_count(),
            start_year: default_start_year(),
            end_year: default_end_year(),
            seed: default_seed(),
        }
    }
}

fn default_data_path() -> String {
    "data/psu_dataset.json".to_string()
}

fn default_psu_count() -> usize {
    20
}

fn default_start_year() -> i32 {
    2020
}

fn default_end_year() -> i32 {
    2024
}

fn default_seed() -> u64 {
    42
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists
    /// but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".psulens.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings; options
    /// without a CLI default only override when explicitly provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        self.model.name = args.model.clone();
        self.model.ollama_url = args.ollama_url.clone();
        self.model.temperature = args.temperature;

        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }
        if args.no_llm {
            self.model.enabled = false;
        }

        if let Some(ref data) = args.data {
            self.data.path = data.display().to_string();
        }
        if let Some(seed) = args.seed {
            self.data.seed = seed;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
