//! Grabnet main entry point
//!
//! This is the command-line interface for the Grabnet file-harvesting
//! crawler.

use clap::Parser;
use grabnet::config::CrawlConfig;
use grabnet::crawler::Crawler;
use grabnet::output::print_summary;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Grabnet: a file-harvesting web crawler
///
/// Grabnet walks a website from a seed URL, downloads every file matching
/// the target extension, and negotiates login forms it runs into along the
/// way. Crawling respects robots.txt and never fetches the same page or
/// file twice.
#[derive(Parser, Debug)]
#[command(name = "grabnet")]
#[command(version)]
#[command(about = "Crawl a site and download files by extension", long_about = None)]
struct Cli {
    /// Seed URL the crawl starts from
    #[arg(value_name = "URL")]
    seed: String,

    /// Target file extension (e.g. pdf, csv, zip)
    #[arg(short, long, value_name = "EXT")]
    ext: String,

    /// Directory downloaded files are written into
    #[arg(short, long, value_name = "DIR", default_value = "downloads")]
    output_dir: PathBuf,

    /// Only follow links whose host exactly equals the seed's host
    /// (subdomains count as different hosts)
    #[arg(long)]
    same_domain_only: bool,

    /// Number of concurrent worker tasks
    #[arg(short, long, default_value_t = 4)]
    workers: usize,

    /// Maximum link depth from the seed
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Write log output to a file instead of stderr
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    let config = match CrawlConfig::new(
        &cli.seed,
        &cli.ext,
        cli.output_dir,
        cli.same_domain_only,
        cli.workers,
        cli.max_depth,
    ) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    let crawler = Crawler::new(config)?;

    // Ctrl-C closes the frontier; workers finish their current page and
    // the run ends with a partial summary.
    let frontier = crawler.frontier();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            frontier.close();
        }
    });

    let summary = crawler.run().await;

    if !cli.quiet {
        print_summary(&summary);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(
    verbose: u8,
    quiet: bool,
    log_file: Option<&std::path::Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("grabnet=info,warn"),
            1 => EnvFilter::new("grabnet=debug,info"),
            2 => EnvFilter::new("grabnet=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    match log_file {
        Some(path) => {
            let file = std::sync::Arc::new(std::fs::File::create(path)?);
            builder.with_ansi(false).with_writer(file).init();
        }
        None => builder.init(),
    }

    Ok(())
}
