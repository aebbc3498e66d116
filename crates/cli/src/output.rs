//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use fraud_lib::evaluation::{ClassMetrics, MetricsReport};
use tabled::{settings::Style, Table, Tabled};

/// Output format for the training report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Indented JSON metrics report (default)
    #[default]
    Json,
    /// Human-readable table summary
    Table,
}

/// One row of the per-class summary table
#[derive(Tabled)]
struct ClassRow {
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Precision")]
    precision: String,
    #[tabled(rename = "Recall")]
    recall: String,
    #[tabled(rename = "F1")]
    f1_score: String,
    #[tabled(rename = "Support")]
    support: u64,
}

impl ClassRow {
    fn new(class: &str, metrics: &ClassMetrics) -> Self {
        Self {
            class: class.to_string(),
            precision: format_score(metrics.precision),
            recall: format_score(metrics.recall),
            f1_score: format_score(metrics.f1_score),
            support: metrics.support,
        }
    }
}

/// Render the metrics report in the requested format
pub fn render_report(report: &MetricsReport, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Table => {
            let mut rows: Vec<ClassRow> = report
                .classes
                .iter()
                .map(|(class, metrics)| ClassRow::new(class, metrics))
                .collect();
            rows.push(ClassRow::new("macro avg", &report.macro_avg));
            rows.push(ClassRow::new("weighted avg", &report.weighted_avg));

            Ok(Table::new(rows).with(Style::rounded()).to_string())
        }
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a score in [0, 1] with four decimals
pub fn format_score(score: f64) -> String {
    format!("{:.4}", score)
}

/// Color a score based on value
pub fn color_score(score: f64) -> String {
    let formatted = format_score(score);
    if score >= 0.9 {
        formatted.green().to_string()
    } else if score >= 0.7 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}
