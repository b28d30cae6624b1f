//! a11y-crawl main entry point
//!
//! This is the command-line interface for the a11y-crawl accessibility scanner.

use a11y_crawl::browser::BrowserProvider;
use a11y_crawl::config::{load_config_with_hash, Config};
use a11y_crawl::scan::{ScanId, ScanOptions, ScanProgress, ScanRequest, ScanService};
use a11y_crawl::storage::{open_store, SqliteScanStore};
use a11y_crawl::ScanStatus;
use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// a11y-crawl: a bounded accessibility crawler
///
/// a11y-crawl audits a small, same-host slice of a website in a headless
/// browser, scores the findings and produces PDF and CSV reports.
#[derive(Parser, Debug)]
#[command(name = "a11y-crawl")]
#[command(version)]
#[command(about = "A bounded accessibility crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a site and wait for the result
    Scan {
        /// Root URL to crawl
        url: String,

        /// Address that receives the confirmation and the results
        #[arg(long)]
        email: String,

        /// Page budget (defaults to the configured max-pages)
        #[arg(long)]
        max_pages: Option<u32>,

        /// Also send the results to the admin address
        #[arg(long)]
        copy_admin: bool,

        /// Admin address overriding the configured one
        #[arg(long)]
        admin_email: Option<String>,
    },

    /// Show the progress of a scan
    Status {
        #[arg(value_name = "SCAN_ID")]
        scan_id: String,
    },

    /// Print the full record of a scan as JSON
    Details {
        #[arg(value_name = "SCAN_ID")]
        scan_id: String,
    },

    /// Show scan counts from the local database
    Stats,

    /// Validate the configuration without scanning
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    match cli.command {
        Command::Scan {
            url,
            email,
            max_pages,
            copy_admin,
            admin_email,
        } => {
            let request = ScanRequest {
                url,
                email,
                max_pages,
                options: ScanOptions {
                    send_copy_to_admin: copy_admin,
                    admin_email,
                },
            };
            handle_scan(&config, request).await
        }
        Command::Status { scan_id } => handle_status(&config, &scan_id).await,
        Command::Details { scan_id } => handle_details(&config, &scan_id).await,
        Command::Stats => handle_stats(&config),
        Command::Check => handle_check(&config),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("a11y_crawl=info,warn"),
            1 => EnvFilter::new("a11y_crawl=debug,info"),
            2 => EnvFilter::new("a11y_crawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

#[cfg(feature = "chromium")]
fn browser_provider(config: &Config) -> anyhow::Result<Arc<dyn BrowserProvider>> {
    Ok(Arc::new(a11y_crawl::browser::ChromiumProvider::new(
        config.browser.clone(),
    )))
}

#[cfg(not(feature = "chromium"))]
fn browser_provider(_config: &Config) -> anyhow::Result<Arc<dyn BrowserProvider>> {
    Err(anyhow!(
        "a11y-crawl was built without the `chromium` feature; no browser is available"
    ))
}

/// Handles the scan command: submits the scan and waits for it to finish
async fn handle_scan(config: &Config, request: ScanRequest) -> anyhow::Result<()> {
    let service = ScanService::from_config(config, browser_provider(config)?)?;

    let submitted = service.submit(request).await?;
    println!("Scan {} started", submitted.scan_id);

    let record = submitted
        .handle
        .await
        .context("Scan task panicked")??;

    print_progress(&ScanProgress::from(&record));
    Ok(())
}

/// Handles the status command
async fn handle_status(config: &Config, scan_id: &str) -> anyhow::Result<()> {
    let scan_id: ScanId = scan_id.parse()?;
    let store = open_store(&config.storage)?;
    let record = store
        .read(&scan_id)
        .await?
        .ok_or_else(|| anyhow!("Scan not found: {}", scan_id))?;

    print_progress(&ScanProgress::from(&record));
    Ok(())
}

/// Handles the details command
async fn handle_details(config: &Config, scan_id: &str) -> anyhow::Result<()> {
    let scan_id: ScanId = scan_id.parse()?;
    let store = open_store(&config.storage)?;
    let record = store
        .read(&scan_id)
        .await?
        .ok_or_else(|| anyhow!("Scan not found: {}", scan_id))?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

/// Handles the stats command
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let store = SqliteScanStore::new(Path::new(&config.storage.database_path))?;

    println!("=== a11y-crawl Statistics ===\n");
    println!("Database: {}\n", config.storage.database_path);

    let mut active = 0;
    for status in ScanStatus::all_statuses() {
        let count = store.count_by_status(status)?;
        if status.is_active() {
            active += count;
        }
        println!("  {:<10} {}", status, count);
    }

    if active > 0 {
        println!("\n{} scans have not finished yet", active);
    }
    Ok(())
}

/// Handles the check command: validates config and shows what a scan would use
fn handle_check(config: &Config) -> anyhow::Result<()> {
    println!("=== a11y-crawl Configuration ===\n");

    println!("Scan:");
    println!("  Max pages: {}", config.scan.max_pages);
    println!("  Deep scan threshold: {}", config.scan.deep_scan_threshold);
    println!("  Navigation timeout: {}ms", config.scan.navigation_timeout_ms);
    println!("  Settle delay: {}ms", config.scan.settle_delay_ms);
    println!("  Audit timeout: {}ms", config.scan.audit_timeout_ms);
    println!("  Rule tags: {}", config.scan.rule_tags.join(", "));

    println!("\nBrowser:");
    println!("  User agent: {}", config.browser.user_agent);
    println!(
        "  Viewport: {}x{}",
        config.browser.viewport_width, config.browser.viewport_height
    );
    println!("  Engine script: {}", config.browser.engine_script);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);
    println!("  Reports: {}", config.storage.reports_dir);
    println!(
        "  Report font: {}",
        config.storage.report_font.as_deref().unwrap_or("bundled DejaVu Sans")
    );
    match &config.storage.remote {
        Some(remote) => println!("  Object store: {}", remote.endpoint),
        None => println!("  Object store: none"),
    }

    println!("\nNotifications:");
    println!("  Admin: {}", config.notify.admin_email);
    println!("  Errors: {}", config.notify.error_email);
    println!(
        "  Webhook: {}",
        config.notify.webhook_url.as_deref().unwrap_or("none (log only)")
    );

    if !Path::new(&config.browser.engine_script).is_file() {
        return Err(anyhow!(
            "Engine script {} does not exist",
            config.browser.engine_script
        ));
    }

    if let Some(font) = &config.storage.report_font {
        if !Path::new(font).is_file() {
            return Err(anyhow!("Report font {} does not exist", font));
        }
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

fn print_progress(progress: &ScanProgress) {
    println!("Scan:          {}", progress.scan_id);
    println!("URL:           {}", progress.url);
    println!("Status:        {}", progress.status);
    println!(
        "Pages:         {} scanned, {} found",
        progress.pages_scanned, progress.pages_found
    );
    println!(
        "Issues:        {} ({} critical, {} warning, {} info)",
        progress.issues.total,
        progress.issues.critical,
        progress.issues.warning,
        progress.issues.info
    );
    if let Some(score) = progress.accessibility_score {
        println!("Score:         {}/100", score);
    }
    if !progress.status.is_terminal() {
        println!("               still in progress");
    }
    if let Some(reports) = &progress.reports {
        println!("PDF report:    {}", reports.pdf);
        println!("CSV report:    {}", reports.csv);
    }
}
