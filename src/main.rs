use anyhow::{Context, Result};
use biomed_digest::config::{find_config_file, load_config, FetchConfig, LogFormat};
use biomed_digest::utils::{papers_table, HttpClient, DEFAULT_USER_AGENT};
use biomed_digest::{Aggregator, Paper};
use clap::{Parser, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Biomed Digest - Fetch recent papers from PubMed, bioRxiv and medRxiv
#[derive(Parser, Debug)]
#[command(name = "biomed-digest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetch recent papers from PubMed, bioRxiv and medRxiv", long_about = None)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Test mode: 7-day window, at most 10 papers per source
    #[arg(long)]
    test: bool,

    /// Lookback window in days (overrides configuration)
    #[arg(long)]
    days: Option<u32>,

    /// Maximum papers per source (overrides configuration)
    #[arg(long)]
    max_per_source: Option<usize>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Show all environment variables
    #[arg(long)]
    env: bool,
}

impl Cli {
    /// `--config` if given, else the first config file found on disk
    fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(find_config_file)
    }
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

fn print_env_vars() {
    println!("Environment variables:");
    println!();
    println!("  PUBMED_QUERY         Entrez query for PubMed");
    println!("  BIORXIV_CATEGORIES   bioRxiv categories, '+'-separated");
    println!("  BIORXIV_KEYWORDS     bioRxiv keywords, '+'-separated");
    println!("  MEDRXIV_CATEGORIES   medRxiv categories, '+'-separated");
    println!("  MEDRXIV_KEYWORDS     medRxiv keywords, '+'-separated");
    println!("  NCBI_API_KEY         NCBI E-utilities API key");
    println!("  FETCH_DAYS           Lookback window in days (default: 1)");
    println!("  MAX_PAPER_NUM        Maximum papers per source (default: 50)");
    println!("  TEST_MODE            Set to 1 for a 7-day window capped at 10 papers");
    println!("  RUST_LOG             Log filter, overrides -v/-q and logging.level");
    println!();
    println!("Any configuration key can also be set with the BIOMED_DIGEST_ prefix,");
    println!("using __ between nested keys:");
    println!("  export BIOMED_DIGEST_FETCH_MODE=concurrent");
    println!("  export BIOMED_DIGEST_PACING__MAX_ATTEMPTS=5");
}

fn init_logging(cli: &Cli, config: &FetchConfig) {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => config.logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("biomed_digest={}", level)));
    let registry = tracing_subscriber::registry().with(filter);

    match config.logging.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.env {
        print_env_vars();
        return Ok(());
    }

    let config_path = cli.config_path();
    let mut config = load_config(config_path.as_deref()).context("Failed to load configuration")?;
    if cli.test {
        config.apply_test_mode();
    }
    if let Some(days) = cli.days {
        config.days = days;
    }
    if let Some(max) = cli.max_per_source {
        config.max_per_source = max;
    }
    config.validate()?;

    init_logging(&cli, &config);
    match &config_path {
        Some(path) => tracing::info!("Using config file: {}", path.display()),
        None => tracing::debug!("No config file found, using defaults and environment"),
    }

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let user_agent = config
        .http
        .user_agent
        .as_deref()
        .unwrap_or(DEFAULT_USER_AGENT);
    let client = Arc::new(HttpClient::with_settings(user_agent, config.http.timeout())?);

    let aggregator = Aggregator::from_config(&config, client);
    tracing::info!(
        "Fetching the last {} day(s) from: {}",
        config.days,
        aggregator.ids().collect::<Vec<_>>().join(", ")
    );

    let papers = aggregator.fetch_all().await;
    output_papers(&papers, cli.output)
}

fn output_papers(papers: &[Paper], format: OutputFormat) -> Result<()> {
    let actual_format = if format == OutputFormat::Auto {
        if std::io::stdout().is_terminal() {
            OutputFormat::Table
        } else {
            OutputFormat::Json
        }
    } else {
        format
    };

    match actual_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(papers)?);
        }
        OutputFormat::Plain => {
            for paper in papers {
                println!(
                    "{} - {} ({})",
                    paper.title(),
                    paper.authors().join(", "),
                    paper.journal()
                );
                if !paper.abs_url().is_empty() {
                    println!("  URL: {}", paper.abs_url());
                }
                if !paper.doi().is_empty() {
                    println!("  DOI: {}", paper.doi());
                }
                if !paper.pdf_url().is_empty() {
                    println!("  PDF: {}", paper.pdf_url());
                }
                println!();
            }
        }
        OutputFormat::Table => {
            if papers.is_empty() {
                println!("No papers found.");
            } else {
                println!("{}", papers_table(papers));
            }
        }
        OutputFormat::Auto => unreachable!(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["biomed-digest"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert_eq!(cli.output, OutputFormat::Auto);
        assert!(cli.config.is_none());
        assert!(!cli.test);
        assert!(cli.days.is_none());
        assert!(cli.max_per_source.is_none());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "biomed-digest",
            "-vv",
            "--test",
            "--days",
            "3",
            "--max-per-source",
            "20",
            "-o",
            "json",
        ]);
        assert_eq!(cli.verbose, 2);
        assert!(cli.test);
        assert_eq!(cli.days, Some(3));
        assert_eq!(cli.max_per_source, Some(20));
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let cli = Cli::parse_from(["biomed-digest", "--config", "/tmp/digest.toml"]);
        assert_eq!(cli.config_path(), Some(PathBuf::from("/tmp/digest.toml")));
    }
}
