use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use perfalert::alerts::{
    AlertStore, GitHubIssueTracker, InMemoryAlertStore, IssueTracker, JsonlAlertStore,
    LogIssueTracker,
};
use perfalert::config::{Config, TrackerConfig};
use perfalert::metrics::FileMetricsFetcher;
use perfalert::{Analyzer, BatchSummary};
use std::path::PathBuf;

/// Command-line arguments for the performance change point analyzer
#[derive(Parser)]
#[command(
    name = "perfalert",
    about = "Performance change point detection and alerting for benchmark results",
    long_about = "Detects statistically significant shifts in benchmark metric series using \
                  E-Divisive, skips changes that are too old or already reported, and files \
                  an issue for every new change point."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,

    /// Log issues instead of filing them and keep alert records in memory
    #[arg(long, help = "Analyse without filing issues or writing alert records")]
    dry_run: bool,

    /// Restrict the run to these test ids
    #[arg(
        short,
        long = "test",
        value_name = "TEST_ID",
        help = "Only analyse the given test (repeatable)"
    )]
    tests: Vec<String>,
}

impl Cli {
    /// Validate the CLI arguments
    ///
    /// # Returns
    ///
    /// `Ok(())` if all arguments are valid, `Err(String)` with error message otherwise
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            if config_path.exists() && !config_path.is_file() {
                return Err(format!(
                    "Configuration path is not a file: {}",
                    config_path.display()
                ));
            }

            if let Some(extension) = config_path.extension() {
                if extension != "toml" {
                    warn!(
                        "Configuration file does not have .toml extension: {}",
                        config_path.display()
                    );
                }
            }
        }

        if self.tests.iter().any(|test_id| test_id.trim().is_empty()) {
            return Err("Test ids must not be empty".to_string());
        }

        Ok(())
    }

    /// Load the configuration file, or defaults when none was given
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => {
                warn!("No configuration file given, using defaults with no tests configured");
                Config::default()
            }
        };

        if !self.tests.is_empty() {
            config.retain_tests(&self.tests);
        }

        Ok(config)
    }
}

fn build_tracker(config: &Config, dry_run: bool) -> Result<Box<dyn IssueTracker>> {
    if dry_run {
        info!("Dry run: issues will be logged, not filed");
        return Ok(Box::new(LogIssueTracker::new()));
    }

    match &config.tracker {
        TrackerConfig::GitHub {
            owner,
            repo,
            token_env,
            api_url,
        } => {
            let tracker =
                GitHubIssueTracker::from_env(api_url.clone(), owner.clone(), repo.clone(), token_env)
                    .context("Failed to create GitHub issue tracker")?;
            info!("Filing issues on GitHub repository {}/{}", owner, repo);
            Ok(Box::new(tracker))
        }
        TrackerConfig::Log => Ok(Box::new(LogIssueTracker::new())),
    }
}

fn build_store(config: &Config, dry_run: bool) -> Box<dyn AlertStore> {
    if dry_run {
        info!("Dry run: alert records are kept in memory");
        return Box::new(InMemoryAlertStore::new());
    }

    Box::new(JsonlAlertStore::new(config.storage.alerts_dir.clone()))
}

/// Load configuration, wire up the collaborators and analyse every test
fn run(cli: &Cli) -> Result<BatchSummary> {
    let config = cli.load_config()?;

    let tracker = build_tracker(&config, cli.dry_run)?;
    let store = build_store(&config, cli.dry_run);
    let fetcher = Box::new(FileMetricsFetcher::new(config.storage.metrics_dir.clone()));

    let analyzer = Analyzer::new(config.settings.clone(), fetcher, store, tracker);

    info!("Analysing {} test(s)", config.tests.len());
    Ok(analyzer.run_batch(&config.tests))
}

fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting perfalert");

    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    match run(&cli) {
        Ok(summary) => info!("{}", summary),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}
