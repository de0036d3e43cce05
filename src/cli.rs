//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::OutputStyle;
use clap::Parser;
use std::path::PathBuf;

/// PSULens - LLM-assisted performance analyst for PSUs
///
/// Ask natural-language questions about government-owned industrial
/// sectors and Public Sector Units: trends, comparisons, rankings and
/// policy recommendations, rendered as text or JSON.
///
/// Examples:
///   psulens "revenue trend for PSU-3 since 2021"
///   psulens "compare ROI of PSU-1 and PSU-2 in 2021" --style table
///   psulens "top 5 energy PSUs by profit" --format json -o ranking.json
///   psulens --overview
///   psulens --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Natural-language query to analyze
    ///
    /// Not required with --overview or --init-config.
    #[arg(value_name = "QUERY")]
    pub query: Option<String>,

    /// Dataset file to load (JSON)
    ///
    /// Defaults to the path in .psulens.toml. When the file is missing
    /// a deterministic synthetic dataset is generated instead.
    #[arg(short, long, value_name = "FILE")]
    pub data: Option<PathBuf>,

    /// Always generate a synthetic dataset, ignoring any data file
    #[arg(long)]
    pub generate: bool,

    /// Seed for synthetic dataset generation
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Output style when the query doesn't name one
    #[arg(short, long, default_value = "bullet", value_name = "STYLE")]
    pub style: StyleArg,

    /// Output format (text, json)
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write the response to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Ollama model for intent disambiguation and phrasing
    ///
    /// Can also be set via PSULENS_MODEL env var or .psulens.toml.
    #[arg(short, long, default_value = "llama3.2:latest", env = "PSULENS_MODEL")]
    pub model: String,

    /// Ollama API endpoint URL
    #[arg(long, default_value = "http://localhost:11434", env = "OLLAMA_URL")]
    pub ollama_url: String,

    /// Temperature for language model responses (0.0 - 1.0)
    #[arg(long, default_value = "0.1")]
    pub temperature: f32,

    /// Language model timeout in seconds
    ///
    /// On timeout the rule-based fallback answers instead; the query
    /// never fails because of the model.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Run fully rule-based, never contacting the language model
    #[arg(long)]
    pub no_llm: bool,

    /// Always include policy recommendations in the response
    #[arg(short, long)]
    pub recommend: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .psulens.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Print a summary of the loaded dataset and exit
    #[arg(long)]
    pub overview: bool,

    /// Generate a default .psulens.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output style flag. Mirrors [`OutputStyle`] so clap stays out of the
/// domain model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StyleArg {
    /// Bulleted lists (default)
    #[default]
    Bullet,
    /// Prose paragraphs
    Narrative,
    /// Tables
    Table,
}

impl From<StyleArg> for OutputStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Bullet => OutputStyle::Bullet,
            StyleArg::Narrative => OutputStyle::Narrative,
            StyleArg::Table => OutputStyle::Table,
        }
    }
}

/// Output format for the rendered response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown-flavored text (default)
    #[default]
    Text,
    /// JSON document tree
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.query.is_none() && !self.overview {
            return Err("A query is required (or use --overview)".to_string());
        }

        if !self.no_llm
            && !self.ollama_url.starts_with("http://")
            && !self.ollama_url.starts_with("https://")
        {
            return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
        }

        if !(0.0..=1.0).contains(&self.temperature) {
            return Err("Temperature must be between 0.0 and 1.0".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref data) = self.data {
            if !self.generate && !data.exists() {
                return Err(format!("Dataset file does not exist: {}", data.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            query: Some("revenue trend for PSU-1".to_string()),
            data: None,
            generate: false,
            seed: None,
            style: StyleArg::Bullet,
            format: OutputFormat::Text,
            output: None,
            model: "llama3.2:latest".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            temperature: 0.1,
            timeout: None,
            no_llm: false,
            recommend: false,
            config: None,
            verbose: false,
            quiet: false,
            overview: false,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_requires_query() {
        let mut args = make_args();
        args.query = None;
        assert!(args.validate().is_err());

        args.overview = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_ollama_url() {
        let mut args = make_args();
        args.ollama_url = "localhost:11434".to_string();
        assert!(args.validate().is_err());

        // --no-llm makes the URL irrelevant
        args.no_llm = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_temperature_range() {
        let mut args = make_args();
        args.temperature = 1.5;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_style_arg_maps_to_output_style() {
        assert_eq!(OutputStyle::from(StyleArg::Table), OutputStyle::Table);
        assert_eq!(OutputStyle::from(StyleArg::Bullet), OutputStyle::Bullet);
    }
}
