//! PSULens - AI-assisted PSU Performance Analyst
//!
//! A CLI tool that answers natural-language questions about
//! government-owned industrial sectors and Public Sector Units, using
//! rule-based classification and analysis with an optional Ollama model
//! for intent disambiguation and recommendation phrasing.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, dataset, unknown entity, missing data)
//!   2 - Ambiguous query (clarifying candidates printed; re-prompt)

mod classify;
mod cli;
mod config;
mod engine;
mod error;
mod format;
mod llm;
mod models;
mod pipeline;
mod recommend;
mod store;

use anyhow::{Context, Result};
use classify::ClassifierSettings;
use cli::{Args, OutputFormat};
use config::{Config, DataConfig};
use error::QueryError;
use indicatif::{ProgressBar, ProgressStyle};
use llm::{LanguageClient, LlmConfig};
use models::OutputStyle;
use pipeline::{Pipeline, PipelineSettings, QueryOutcome};
use recommend::RecommendSettings;
use std::path::Path;
use std::time::Duration;
use store::{DataStore, GenerateOptions};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("PSULens v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Query failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .psulens.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(".psulens.toml");

    if path.exists() {
        eprintln!("⚠️  .psulens.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .psulens.toml")?;

    println!("✅ Created .psulens.toml with default settings.");
    println!("   Edit it to customize the model, dataset and thresholds.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run one query end to end. Returns the exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    // Step 1: Load or generate the dataset
    let store = build_store(&args, &config)?;
    info!(
        "Store ready: {} sectors, {} PSUs",
        store.sectors().len(),
        store.psus().len()
    );

    // Handle --overview: print the dataset summary and exit
    if args.overview {
        return handle_overview(&args, &store);
    }

    let query = args.query.clone().unwrap_or_default();

    // Step 2: Set up the language client (optional by design)
    let llm_client = if config.model.enabled {
        if !args.quiet {
            println!("🤖 Model: {} ({})", config.model.name, config.model.ollama_url);
        }
        Some(LanguageClient::new(LlmConfig {
            ollama_url: config.model.ollama_url.clone(),
            model: config.model.name.clone(),
            temperature: config.model.temperature,
            timeout_seconds: config.model.timeout_seconds,
        }))
    } else {
        info!("Language model disabled; running fully rule-based");
        None
    };

    // Step 3: Build the pipeline
    let settings = PipelineSettings {
        classifier: ClassifierSettings {
            fuzzy_accept: config.classifier.fuzzy_accept,
            max_candidates: config.classifier.max_candidates,
            default_style: effective_style(&args, &config),
            force_recommendations: args.recommend,
        },
        recommend: RecommendSettings {
            growth_threshold: config.recommend.growth_threshold,
            roi_decline_years: config.recommend.roi_decline_years,
        },
    };
    let pipeline = Pipeline::new(store, llm_client, settings);

    // Step 4: Handle the query
    let spinner = make_spinner(args.quiet);
    let outcome = pipeline.handle_query(&query).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    match outcome {
        Ok(outcome) => {
            emit_response(&args, &outcome)?;
            Ok(0)
        }
        Err(e @ QueryError::AmbiguousQuery { .. }) => {
            eprintln!("⚠️  {}", e);
            let candidates = e.candidates();
            if !candidates.is_empty() {
                eprintln!("   Did you mean:");
                for candidate in candidates {
                    eprintln!("   - {}", candidate);
                }
            }
            Ok(2)
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            Ok(1)
        }
    }
}

/// Render the response and write it to stdout or the output file.
fn emit_response(args: &Args, outcome: &QueryOutcome) -> Result<()> {
    let rendered = match args.format {
        OutputFormat::Text => format::render::render_text(&outcome.response),
        OutputFormat::Json => format::render::render_json(&outcome.response)?,
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write response to {}", path.display()))?;
            if !args.quiet {
                println!("✅ Response saved to: {}", path.display());
            }
        }
        None => {
            println!("{}", rendered);
        }
    }

    if !args.quiet {
        println!(
            "Intent: {} | Targets: {} | {} | {:.1}s",
            outcome.meta.intent,
            outcome.meta.target_count,
            outcome.meta.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            outcome.meta.duration_seconds
        );
    }

    Ok(())
}

/// Handle --overview: summarize the dataset and exit.
fn handle_overview(args: &Args, store: &DataStore) -> Result<i32> {
    let overview = match engine::overview(store) {
        Ok(overview) => overview,
        Err(e) => {
            eprintln!("❌ {}", e);
            return Ok(1);
        }
    };

    let response = format::format_overview(&overview);
    let rendered = match args.format {
        OutputFormat::Text => format::render::render_text(&response),
        OutputFormat::Json => format::render::render_json(&response)?,
    };
    println!("{}", rendered);

    Ok(0)
}

/// Load the dataset file, or generate synthetic data when asked to (or
/// when no file exists).
fn build_store(args: &Args, config: &Config) -> Result<DataStore> {
    let options = generate_options(&config.data);

    let dataset = if args.generate {
        info!("Generating synthetic dataset (seed {})", options.seed);
        store::generate_dataset(&options)
    } else {
        let path = Path::new(&config.data.path);
        if path.exists() {
            info!("Loading dataset from {}", path.display());
            store::load_dataset(path)?
        } else {
            warn!(
                "Dataset file {} not found; generating synthetic data (seed {})",
                path.display(),
                options.seed
            );
            store::generate_dataset(&options)
        }
    };

    DataStore::new(dataset)
}

fn generate_options(data: &DataConfig) -> GenerateOptions {
    GenerateOptions {
        psu_count: data.psu_count,
        start_year: data.start_year,
        end_year: data.end_year,
        seed: data.seed,
    }
}

/// The CLI style flag wins; a non-default config style applies when the
/// flag was left at its default.
fn effective_style(args: &Args, config: &Config) -> OutputStyle {
    let from_args: OutputStyle = args.style.into();
    if from_args != OutputStyle::default() {
        return from_args;
    }
    match config.general.style.as_str() {
        "narrative" => OutputStyle::Narrative,
        "table" => OutputStyle::Table,
        _ => OutputStyle::Bullet,
    }
}

fn make_spinner(quiet: bool) -> Option<ProgressBar> {
    if quiet {
        return None;
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Analyzing query...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    Some(spinner)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .psulens.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
