//! CLI for the engagement-metrics analytics library.
//!
//! Loads a content export and an optional follower export, runs the report
//! pipeline, prints a summary and writes the report as JSON.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use engagement_metrics::{
    FollowerRecord, ReportConfig, Stream, StreamKind, assemble_records, load_content_csv,
    load_follower_csv, quality,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "engagement-metrics")]
#[command(about = "Engagement, reach and follower-growth analytics for social media exports", long_about = None)]
#[command(version)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the full analysis report
    Analyze {
        #[command(flatten)]
        input: InputArgs,
        /// Where to write the JSON report
        #[arg(short, long, default_value = "data/analysis_report.json")]
        output: PathBuf,
        #[command(flatten)]
        overrides: ConfigArgs,
    },
    /// Check input files and print data-quality findings
    Validate {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Print the effective configuration as TOML
    Config {
        #[command(flatten)]
        overrides: ConfigArgs,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Content export CSV
    #[arg(long)]
    content: PathBuf,
    /// Follower export CSV
    #[arg(long)]
    followers: Option<PathBuf>,
}

#[derive(Args)]
struct ConfigArgs {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Trailing window length in days
    #[arg(long)]
    window_size: Option<usize>,
    /// Spike threshold as a multiple of the rolling average
    #[arg(long)]
    spike_multiplier: Option<f64>,
    /// Number of top days to rank
    #[arg(long)]
    top_n: Option<usize>,
    /// Months per growth trend window
    #[arg(long)]
    trend_window_months: Option<usize>,
}

impl ConfigArgs {
    /// File values first, then command line overrides.
    fn resolve(&self) -> Result<ReportConfig> {
        let mut config = match &self.config {
            Some(path) => ReportConfig::from_path(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ReportConfig::default(),
        };
        if let Some(v) = self.window_size {
            config.window_size = v;
        }
        if let Some(v) = self.spike_multiplier {
            config.spike_multiplier = v;
        }
        if let Some(v) = self.top_n {
            config.top_n = v;
        }
        if let Some(v) = self.trend_window_months {
            config.trend_window_months = v;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Analyze {
            input,
            output,
            overrides,
        } => analyze(&input, &output, &overrides.resolve()?),
        Commands::Validate { input } => validate(&input),
        Commands::Config { overrides } => {
            print!("{}", toml::to_string(&overrides.resolve()?)?);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_followers(path: Option<&Path>) -> Result<Option<Vec<FollowerRecord>>> {
    path.map(|p| {
        load_follower_csv(p).with_context(|| format!("loading follower export {}", p.display()))
    })
    .transpose()
}

/// Run the pipeline and write the report.
fn analyze(input: &InputArgs, output: &Path, config: &ReportConfig) -> Result<()> {
    let content = load_content_csv(&input.content)
        .with_context(|| format!("loading content export {}", input.content.display()))?;
    let followers = load_followers(input.followers.as_deref())?;

    let report = assemble_records(content, followers, config, Utc::now())?;
    report
        .write_json(output)
        .with_context(|| format!("writing report {}", output.display()))?;

    println!("{}", "=".repeat(60));
    println!("  ANALYSIS COMPLETE");
    println!("{}", "=".repeat(60));
    for line in report.summary_lines() {
        println!("  {line}");
    }
    println!("{}", "=".repeat(60));
    println!("Report saved to: {}", output.display());
    Ok(())
}

/// Load both streams and print data-quality findings.
fn validate(input: &InputArgs) -> Result<()> {
    let content = load_content_csv(&input.content)
        .with_context(|| format!("loading content export {}", input.content.display()))?;
    let content = Stream::new(StreamKind::Content, content)?;
    let followers = load_followers(input.followers.as_deref())?
        .map(|records| Stream::new(StreamKind::Followers, records))
        .transpose()?;

    let findings = quality::assess(&content, followers.as_ref());

    println!("Content: {} rows, {} to {}", content.len(), content.start(), content.end());
    if let Some(followers) = &followers {
        println!(
            "Followers: {} rows, {} to {}",
            followers.len(),
            followers.start(),
            followers.end()
        );
    }
    println!("Sponsored data: {}", findings.has_sponsored_data);
    if findings.warnings.is_empty() {
        println!("All checks passed with no issues.");
    } else {
        println!("Warnings ({}):", findings.warnings.len());
        for warning in &findings.warnings {
            println!("  - {warning}");
        }
    }
    Ok(())
}
