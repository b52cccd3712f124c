// CLI Interface
//
// This module provides the command-line interface for LeRole.

use crate::config::RoleConfig;
use crate::errors::format_error;
use crate::lerole::{Diagnostics, LeRole};
use anyhow::{anyhow, Context, Result as AnyhowResult};
use clap::{Parser, Subcommand, ValueEnum};
use leconflit::ConflictRule;
use lecouverture::{Confidence, RecommendationReport};
use lelicence::TierPrice;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// LeRole - License-aware role recommendations
#[derive(Parser, Debug)]
#[command(name = "lerole")]
#[command(author = "LeRole Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Recommend the cheapest role combinations that grant a set of capabilities", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $LEROLE_CONFIG or ./lerole.toml)
    #[arg(global = true, long = "config", short = 'c')]
    pub config: Option<PathBuf>,

    /// Capability records file, overriding the configuration
    #[arg(global = true, long = "records", short = 'r')]
    pub records: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(global = true, long = "verbose", short = 'v')]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Recommend role combinations for a set of capabilities
    Recommend {
        /// Requested capabilities
        #[arg(value_name = "CAPABILITY", required = true, num_args = 1..)]
        capabilities: Vec<String>,

        /// Output format
        #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Number of options to return (overrides the configuration)
        #[arg(long = "top-k")]
        top_k: Option<usize>,
    },

    /// Answer a JSON file of requests (an array of capability arrays) in parallel
    Batch {
        /// Requests file
        #[arg(value_name = "REQUESTS_JSON")]
        requests: PathBuf,

        /// Output format
        #[arg(long = "format", value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Show snapshot statistics and generation
    Stats {
        /// Output format
        #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List conflict rules violated by holding all of the given roles
    Conflicts {
        /// Roles held together
        #[arg(value_name = "ROLE", required = true, num_args = 1..)]
        roles: Vec<String>,

        /// Output format
        #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the effective license tier table
    Tiers {
        /// Output format
        #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

impl Cli {
    /// Run the CLI, printing the command output to stdout
    pub fn run(self) -> AnyhowResult<()> {
        let output = self.execute()?;
        println!("{}", output);
        Ok(())
    }

    /// Run the CLI and return what it would print
    pub fn execute(self) -> AnyhowResult<String> {
        let config_path = RoleConfig::locate(self.config.as_deref());
        let mut config = RoleConfig::from_env(Some(config_path.as_path()))?;

        init_logging_impl(self.verbose, &config.logging.level);

        if let Some(records) = self.records {
            config.snapshot.records_path = Some(absolute_path(&records)?);
        }
        if let Commands::Recommend { top_k: Some(top_k), .. } = &self.command {
            config.search.top_k = *top_k;
        }

        let base_dir = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let lerole = LeRole::from_config(config, base_dir).map_err(|e| anyhow!(format_error(&e)))?;

        match self.command {
            Commands::Recommend { capabilities, format, .. } => {
                cmd_recommend_impl(&lerole, &capabilities, format)
            }
            Commands::Batch { requests, format } => cmd_batch_impl(&lerole, &requests, format),
            Commands::Stats { format } => cmd_stats_impl(&lerole, format),
            Commands::Conflicts { roles, format } => cmd_conflicts_impl(&lerole, &roles, format),
            Commands::Tiers { format } => cmd_tiers_impl(&lerole, format),
        }
    }
}

/// Initialize logging implementation
///
/// `--verbose` wins, then `LEROLE_LOG`, then `RUST_LOG`, then the configured level.
fn init_logging_impl(verbose: bool, configured: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("LEROLE_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(configured))
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn absolute_path(path: &Path) -> AnyhowResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    Ok(cwd.join(path))
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> AnyhowResult<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize output")
}

/// Recommend command implementation
fn cmd_recommend_impl(
    lerole: &LeRole,
    capabilities: &[String],
    format: OutputFormat,
) -> AnyhowResult<String> {
    let report = lerole.recommend(capabilities);
    info!(
        "Recommended {} options for {} capabilities",
        report.options.len(),
        report.requested.len()
    );

    match format {
        OutputFormat::Json => to_json(&report),
        OutputFormat::Text => Ok(render_report(&report)),
    }
}

/// Batch command implementation
fn cmd_batch_impl(lerole: &LeRole, path: &Path, format: OutputFormat) -> AnyhowResult<String> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read requests file: {:?}", path))?;
    let requests: Vec<Vec<String>> = serde_json::from_str(&content)
        .with_context(|| format!("Requests file must be an array of capability arrays: {:?}", path))?;

    let reports = lerole.recommend_batch(&requests);
    info!("Answered {} requests", reports.len());

    match format {
        OutputFormat::Json => to_json(&reports),
        OutputFormat::Text => Ok(reports
            .iter()
            .enumerate()
            .map(|(i, report)| format!("Request {}\n{}", i + 1, render_report(report)))
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

/// Stats command implementation
fn cmd_stats_impl(lerole: &LeRole, format: OutputFormat) -> AnyhowResult<String> {
    let diagnostics = lerole.diagnostics();
    match format {
        OutputFormat::Json => to_json(&diagnostics),
        OutputFormat::Text => Ok(render_diagnostics(&diagnostics)),
    }
}

/// Conflicts command implementation
fn cmd_conflicts_impl(lerole: &LeRole, roles: &[String], format: OutputFormat) -> AnyhowResult<String> {
    let violations = lerole.conflicts_for(roles);
    match format {
        OutputFormat::Json => to_json(&violations),
        OutputFormat::Text => Ok(render_conflicts(&violations)),
    }
}

/// Tiers command implementation
fn cmd_tiers_impl(lerole: &LeRole, format: OutputFormat) -> AnyhowResult<String> {
    let tiers = lerole.tiers();
    match format {
        OutputFormat::Json => to_json(&tiers),
        OutputFormat::Text => Ok(render_tiers(&tiers)),
    }
}

fn confidence_label(confidence: Confidence) -> &'static str {
    match confidence {
        Confidence::High => "HIGH",
        Confidence::Medium => "MEDIUM",
    }
}

fn render_report(report: &RecommendationReport) -> String {
    let mut out = format!(
        "Requested: {}\n",
        if report.requested.is_empty() {
            "(nothing)".to_string()
        } else {
            report.requested.join(", ")
        }
    );

    for warning in &report.warnings {
        out.push_str(&format!("  ! {}\n", warning));
    }

    if report.options.is_empty() {
        out.push_str("No recommendation.\n");
        return out;
    }

    for (i, option) in report.options.iter().enumerate() {
        out.push_str(&format!(
            "{}. {}\n   License: {} ({:.2}/month)  Coverage: {:.0}%  Conflicts: {}  Confidence: {}\n",
            i + 1,
            option.roles.join(" + "),
            option.license_required,
            option.monthly_cost,
            option.coverage * 100.0,
            option.conflict_count,
            confidence_label(option.confidence)
        ));
        for warning in &option.warnings {
            out.push_str(&format!("   - {}\n", warning));
        }
    }

    out
}

fn render_diagnostics(diagnostics: &Diagnostics) -> String {
    let records = diagnostics
        .records_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(none)".to_string());

    format!(
        "Generation:    {}\nRecords:       {} ({})\nRoles:         {}\nCapabilities:  {}\nLicense tiers: {} in snapshot, {} priced",
        diagnostics.generation,
        diagnostics.stats.records,
        records,
        diagnostics.stats.roles,
        diagnostics.stats.capabilities,
        diagnostics.stats.tiers,
        diagnostics.pricing_tiers
    )
}

fn render_conflicts(violations: &[ConflictRule]) -> String {
    if violations.is_empty() {
        return "No conflicts.".to_string();
    }
    violations
        .iter()
        .map(|rule| {
            let mut line = format!("[{}] {} <-> {}", rule.severity, rule.role_a, rule.role_b);
            if !rule.description.is_empty() {
                line.push_str(&format!(": {}", rule.description));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_tiers(tiers: &[TierPrice]) -> String {
    let mut sorted: Vec<&TierPrice> = tiers.iter().collect();
    sorted.sort_by_key(|t| t.priority.unwrap_or(0));

    sorted
        .iter()
        .map(|t| {
            format!(
                "{:>4}  {:>8.2}  {}",
                t.priority.unwrap_or(0),
                t.monthly_cost,
                t.name
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Main entry point for the CLI
pub fn main() -> AnyhowResult<()> {
    let cli = Cli::parse();
    cli.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lecouverture::CapabilityRecord;

    #[test]
    fn test_recommend_parsing() {
        let cli = Cli::try_parse_from(["lerole", "recommend", "VendInvoice", "VendPayment", "--top-k", "2"])
            .unwrap();
        match cli.command {
            Commands::Recommend { capabilities, format, top_k } => {
                assert_eq!(capabilities, vec!["VendInvoice", "VendPayment"]);
                assert_eq!(format, OutputFormat::Text);
                assert_eq!(top_k, Some(2));
            }
            _ => panic!("Expected Recommend command"),
        }
    }

    #[test]
    fn test_recommend_requires_capabilities() {
        assert!(Cli::try_parse_from(["lerole", "recommend"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["lerole", "stats", "--records", "roles.json", "-v"]).unwrap();
        assert_eq!(cli.records, Some(PathBuf::from("roles.json")));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Stats { .. }));
    }

    #[test]
    fn test_json_format_parsing() {
        let cli = Cli::try_parse_from(["lerole", "tiers", "--format", "json"]).unwrap();
        assert!(matches!(cli.command, Commands::Tiers { format: OutputFormat::Json }));
    }

    #[test]
    fn test_render_report_text() {
        let lerole = LeRole::with_records(
            RoleConfig::default(),
            &[CapabilityRecord::new("Controller", "LedgerClose", "Finance", 40)],
        )
        .unwrap();

        let text = render_report(&lerole.recommend(&["LedgerClose", "Ghost"]));
        assert!(text.contains("1. Controller"));
        assert!(text.contains("Confidence: HIGH"));
        assert!(text.contains("Coverage: 50%"));
        assert!(text.contains("'Ghost'"));
    }

    #[test]
    fn test_render_tiers_sorted_by_priority() {
        let text = render_tiers(&[
            TierPrice::new("Premium", 180.0, 40),
            TierPrice::new("Team", 8.0, 10),
        ]);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].ends_with("Team"));
        assert!(lines[1].ends_with("Premium"));
    }

    #[test]
    fn test_render_no_conflicts() {
        assert_eq!(render_conflicts(&[]), "No conflicts.");
    }
}
