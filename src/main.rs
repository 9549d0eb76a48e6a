//! Site-Mirror main entry point
//!
//! This is the command-line interface for the Site-Mirror offline website mirror.

use anyhow::Context;
use clap::builder::BoolishValueParser;
use clap::Parser;
use site_mirror::config::{load_config_with_hash, MirrorConfig};
use site_mirror::output::print_summary;
use site_mirror::url::parse_start_url;
use site_mirror::Coordinator;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use toml::{Table, Value};
use tracing_subscriber::EnvFilter;

/// Site-Mirror: an offline website mirror
///
/// Site-Mirror crawls a website, downloads its pages and the resources they embed,
/// and rewrites every reference so the copy can be browsed from disk. Flags override
/// the values in the configuration file.
#[derive(Parser, Debug)]
#[command(name = "site-mirror")]
#[command(version = "1.0.0")]
#[command(about = "Mirror a website for offline browsing", long_about = None)]
struct Cli {
    /// Path to the configuration file (flat key=value, or TOML if it ends in .toml)
    #[arg(value_name = "CONFIG", default_value = "config.txt")]
    config: PathBuf,

    /// Page the crawl starts from
    #[arg(long)]
    start_url: Option<String>,

    /// Directory the mirror is written to
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Maximum number of pages to fetch
    #[arg(long)]
    max_pages: Option<usize>,

    /// Seconds to wait after each page fetch
    #[arg(long)]
    delay: Option<f64>,

    /// Honor robots.txt of the start URL's host
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new())]
    obey_robots: Option<bool>,

    /// Skip URLs outside the start URL's site and its CDN allow-list
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new())]
    same_domain_only: Option<bool>,

    /// User-Agent header sent with every request
    #[arg(long)]
    user_agent: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<f64>,

    /// Number of concurrent resource downloads
    #[arg(long)]
    max_workers: Option<usize>,

    /// Also copy every downloaded image into a flat folder
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new())]
    collect_images: Option<bool>,

    /// Folder for the image copies (default: <OUTPUT_DIR>/<host>-images)
    #[arg(long)]
    images_dir: Option<PathBuf>,

    /// Host pattern treated as part of the site (repeatable; replaces the defaults)
    #[arg(long = "cdn-pattern", value_name = "PATTERN")]
    cdn_patterns: Vec<String>,

    /// Validate the configuration and print it without crawling
    #[arg(long)]
    dry_run: bool,

    /// Skip the start-URL reachability check
    #[arg(long)]
    skip_check: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Collects the flags that were given into a table layered over the file
    fn overrides(&self) -> Table {
        let mut table = Table::new();

        if let Some(url) = &self.start_url {
            table.insert("start_url".into(), Value::String(url.clone()));
        }
        if let Some(dir) = &self.output_dir {
            table.insert(
                "output_dir".into(),
                Value::String(dir.to_string_lossy().into_owned()),
            );
        }
        if let Some(n) = self.max_pages {
            table.insert("max_pages".into(), Value::Integer(n as i64));
        }
        if let Some(delay) = self.delay {
            table.insert("delay".into(), Value::Float(delay));
        }
        if let Some(flag) = self.obey_robots {
            table.insert("obey_robots".into(), Value::Boolean(flag));
        }
        if let Some(flag) = self.same_domain_only {
            table.insert("same_domain_only".into(), Value::Boolean(flag));
        }
        if let Some(ua) = &self.user_agent {
            table.insert("user_agent".into(), Value::String(ua.clone()));
        }
        if let Some(timeout) = self.timeout {
            table.insert("timeout".into(), Value::Float(timeout));
        }
        if let Some(n) = self.max_workers {
            table.insert("max_workers".into(), Value::Integer(n as i64));
        }
        if let Some(flag) = self.collect_images {
            table.insert("collect_images".into(), Value::Boolean(flag));
        }
        if let Some(dir) = &self.images_dir {
            table.insert(
                "images_dir".into(),
                Value::String(dir.to_string_lossy().into_owned()),
            );
        }
        if !self.cdn_patterns.is_empty() {
            let patterns = self.cdn_patterns.iter().cloned().map(Value::String);
            table.insert("cdn_patterns".into(), Value::Array(patterns.collect()));
        }

        table
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config, cli.overrides())
        .context("Failed to load configuration")?;
    match config_hash {
        Some(hash) => tracing::info!("Configuration loaded successfully (hash: {})", hash),
        None => tracing::info!("Configuration assembled from flags and defaults"),
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(ExitCode::SUCCESS);
    }

    let coordinator = Coordinator::new(config).context("Failed to set up the mirror")?;

    if !cli.skip_check {
        tracing::info!("Checking that {} is reachable", coordinator.start_url());
        if let Err(e) = coordinator.probe().await {
            tracing::error!("Start URL {} is not reachable: {}", coordinator.start_url(), e);
            tracing::error!("Check the URL and your connection, or pass --skip-check");
            return Ok(ExitCode::from(1));
        }
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing up with what was saved");
            on_signal.cancel();
        }
    });

    let stats = coordinator.run(cancel).await.context("Mirror failed")?;
    print_summary(&stats);

    if stats.cancelled {
        Ok(ExitCode::from(130))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Events go to stdout, one per line, so a supervising process can stream them.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_mirror=info,warn"),
            1 => EnvFilter::new("site_mirror=debug,info"),
            _ => EnvFilter::new("site_mirror=trace,debug"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: prints the effective configuration
fn handle_dry_run(config: &MirrorConfig) {
    println!("=== Site-Mirror Dry Run ===\n");

    println!("Crawl:");
    println!("  Start URL: {}", config.start_url);
    println!("  Max pages: {}", config.max_pages);
    println!("  Delay: {}s (resources {}s)", config.delay, config.delay / 2.0);
    println!("  Workers: {} (batches of {})", config.max_workers, config.batch_size());
    println!("  Timeout: {}s", config.timeout);

    println!("\nPoliteness:");
    println!("  Obey robots.txt: {}", config.obey_robots);
    println!("  Same domain only: {}", config.same_domain_only);
    println!("  User agent: {}", config.user_agent());

    println!("\nCDN patterns ({}):", config.cdn_patterns.len());
    for pattern in &config.cdn_patterns {
        println!("  - {}", pattern);
    }

    println!("\nOutput:");
    println!("  Directory: {}", config.output_dir.display());
    match parse_start_url(&config.start_url).map(|url| config.image_collection_dir(&url)) {
        Ok(Ok(Some(dir))) => println!("  Image folder: {}", dir.display()),
        Ok(Ok(None)) => println!("  Image folder: disabled"),
        _ => {}
    }

    println!("\n✓ Configuration is valid");
}
