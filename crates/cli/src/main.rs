//! Fraud detection training CLI
//!
//! Trains the fraud pipeline on a CSV dataset, persists the model artifact
//! and metrics report, and prints the report to stdout.

mod output;

use anyhow::{Context, Result};
use clap::Parser;
use fraud_lib::{
    artifact::{DEFAULT_METRICS_PATH, DEFAULT_MODEL_PATH},
    dataset::TARGET_COLUMN,
    observability::StructuredLogger,
    trainer::{train_with_outcome, DataConfig, ModelConfig},
};
use output::OutputFormat;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Train the fraud detection model
#[derive(Debug, Parser)]
#[command(name = "fraud-train")]
#[command(author, version, about = "Train the fraud detection model", long_about = None)]
pub struct Cli {
    /// Path to the transactions CSV
    #[arg(value_name = "DATA")]
    pub data: PathBuf,

    /// Where to write the fitted model artifact
    #[arg(long, default_value = DEFAULT_MODEL_PATH)]
    pub model_output: PathBuf,

    /// Where to write the metrics report
    #[arg(long, default_value = DEFAULT_METRICS_PATH)]
    pub metrics_output: PathBuf,

    /// Fraction of rows held out for evaluation
    #[arg(long, default_value_t = 0.2)]
    pub test_size: f64,

    /// Seed for the stratified split
    #[arg(long, default_value_t = 42)]
    pub random_state: u64,

    /// Columns removed before training (no values falls back to the defaults)
    #[arg(long, num_args = 0.., default_values = ["nameOrig", "nameDest"])]
    pub drop_columns: Vec<String>,

    /// Name of the 0/1 label column
    #[arg(long, default_value = TARGET_COLUMN)]
    pub target_column: String,

    /// Output format
    #[arg(long, short, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Enable verbose logging on stderr
    #[arg(long, short)]
    pub verbose: bool,
}

impl Cli {
    fn data_config(&self) -> DataConfig {
        DataConfig::new(&self.data)
            .with_target_column(&self.target_column)
            .with_drop_columns(self.drop_columns.clone())
    }

    fn model_config(&self) -> ModelConfig {
        ModelConfig {
            test_size: self.test_size,
            random_state: self.random_state,
            model_output_path: self.model_output.clone(),
            metrics_output_path: self.metrics_output.clone(),
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    info!(
        data = %cli.data.display(),
        test_size = cli.test_size,
        random_state = cli.random_state,
        drop_columns = ?cli.drop_columns,
        "Starting training run"
    );
    let outcome = train_with_outcome(&cli.data_config(), &cli.model_config())
        .with_context(|| format!("training failed for {}", cli.data.display()))?;

    StructuredLogger::new("fraud-train").log_training_completed(
        &outcome.artifact.model_version,
        outcome.report.accuracy,
        outcome.report.roc_auc,
        &cli.model_output.display().to_string(),
    );

    let rendered = output::render_report(&outcome.report, cli.format)?;
    match cli.format {
        OutputFormat::Json => println!("{}", rendered),
        OutputFormat::Table => {
            output::print_info(&format!(
                "Trained on {} rows, evaluated on {} rows",
                outcome.train_rows, outcome.test_rows
            ));
            println!("{}", rendered);
            println!(
                "accuracy: {}  roc_auc: {}",
                output::color_score(outcome.report.accuracy),
                output::color_score(outcome.report.roc_auc)
            );
            output::print_success(&format!(
                "Model {} saved to {}",
                outcome.artifact.model_version,
                cli.model_output.display()
            ));
            output::print_success(&format!(
                "Metrics saved to {}",
                cli.metrics_output.display()
            ));
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
