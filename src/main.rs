mod config;
mod db;
mod errors;
mod fetch;
mod harvest;
mod logging;
mod models;
mod normalize;
mod parser;
mod pipeline;
mod reconcile;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::{HarvestConfig, SourceProfile, DEFAULT_JSON_OUTPUT};
use db::Database;
use fetch::HttpFetcher;
use pipeline::{run_batch, BatchReport};
use reconcile::ListingStore;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "remote-harvest")]
#[command(about = "Scrape remote job listings and reconcile them into a local database")]
struct Cli {
    /// Path to the SQLite database (defaults to the user data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Run one scrape batch and save the results
    Scrape {
        /// Maximum number of listings to collect across all seeds
        #[arg(short, long, default_value_t = config::DEFAULT_MAX_LISTINGS)]
        max_listings: usize,

        /// Seed URL to start from (repeatable; replaces the profile's seeds)
        #[arg(short, long)]
        seed: Vec<String>,

        /// JSON file with selector and seed overrides for the source site
        #[arg(short, long)]
        profile: Option<PathBuf>,

        /// Per-request timeout in seconds
        #[arg(short, long, default_value = "10")]
        timeout: u64,

        /// Extra attempts for a failed page fetch
        #[arg(short, long, default_value = "0")]
        retries: u32,

        /// Also write the collected listings to a JSON file
        #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_JSON_OUTPUT)]
        json: Option<PathBuf>,

        /// Dry run - show what would be saved without touching the database
        #[arg(long)]
        dry_run: bool,
    },

    /// List stored listings
    List {
        /// Filter by status (pending, approved, rejected, archived)
        #[arg(short, long)]
        status: Option<String>,

        /// Filter by coverage (malaysia, asia, worldwide, other)
        #[arg(short, long)]
        coverage: Option<String>,
    },

    /// List known companies
    Companies,
}

fn build_config(
    max_listings: usize,
    seeds: Vec<String>,
    profile: Option<PathBuf>,
    timeout: u64,
    retries: u32,
    json: Option<PathBuf>,
) -> Result<HarvestConfig> {
    let mut profile = match profile {
        Some(path) => SourceProfile::from_file(&path)?,
        None => SourceProfile::default(),
    };
    if !seeds.is_empty() {
        profile.seeds = seeds;
    }

    Ok(HarvestConfig {
        profile,
        max_listings,
        fetch_timeout: Duration::from_secs(timeout),
        fetch_retries: retries,
        retry_pause: config::DEFAULT_RETRY_PAUSE,
        json_output: json,
    })
}

/// A dry run never opens the database, so nothing is created on disk.
fn open_store(db_path: Option<PathBuf>, dry_run: bool) -> Result<Option<Database>> {
    if dry_run {
        return Ok(None);
    }
    let db = Database::open(db_path)?;
    db.init()?;
    Ok(Some(db))
}

fn print_report(report: &BatchReport, dry_run: bool) {
    if dry_run {
        for listing in &report.listings {
            println!(
                "[DRY RUN] Would save: {} at {} ({}, {})",
                listing.job_title,
                if listing.company_name.is_empty() {
                    "Unknown"
                } else {
                    listing.company_name.as_str()
                },
                listing.coverage,
                listing.job_category
            );
        }
    }

    println!("\nResults:");
    println!("  Pages fetched:  {}", report.stats.pages_fetched);
    if report.stats.fetch_failures > 0 {
        println!("  Fetch errors:   {}", report.stats.fetch_failures);
    }
    println!("  Listings found: {}", report.listings.len());

    match &report.summary {
        Some(summary) => {
            println!("  New jobs:       {}", summary.created);
            println!("  Updated jobs:   {}", summary.updated);
            if summary.failed > 0 {
                println!("  Save errors:    {}", summary.failed);
            }
        }
        None => println!("\n(Dry run - no listings were saved)"),
    }
}

fn main() -> Result<()> {
    logging::setup_logging("remote_harvest=info");

    let cli = Cli::parse();
    let db_path = cli.db;

    match cli.command {
        Commands::Init => {
            let db = Database::open(db_path)?;
            db.init()?;
            println!("Database initialized at {}", db.path().display());
        }

        Commands::Scrape {
            max_listings,
            seed,
            profile,
            timeout,
            retries,
            json,
            dry_run,
        } => {
            let config = build_config(max_listings, seed, profile, timeout, retries, json)?;
            let fetcher =
                HttpFetcher::new(config.fetch_timeout, config.fetch_retries, config.retry_pause)?;
            let today = chrono::Local::now().date_naive();

            let db = open_store(db_path, dry_run)?;
            let store = db.as_ref().map(|db| db as &dyn ListingStore);
            let report = run_batch(&config, &fetcher, store, today)?;
            print_report(&report, dry_run);
        }

        Commands::List { status, coverage } => {
            let db = Database::open(db_path)?;
            db.ensure_initialized()?;
            let listings = db.list_listings(status.as_deref(), coverage.as_deref())?;
            if listings.is_empty() {
                println!("No listings found.");
            } else {
                println!(
                    "{:<6} {:<9} {:<10} {:<24} {:<30} {:<20} {:<10}",
                    "ID", "STATUS", "COVERAGE", "CATEGORY", "TITLE", "COMPANY", "LISTED"
                );
                println!("{}", "-".repeat(115));
                for listing in listings {
                    println!(
                        "{:<6} {:<9} {:<10} {:<24} {:<30} {:<20} {:<10}",
                        listing.id,
                        listing.status,
                        listing.coverage,
                        listing.category.unwrap_or_default(),
                        truncate(&listing.job_title, 28),
                        truncate(&listing.company_name.unwrap_or_default(), 18),
                        listing.listing_date.unwrap_or_else(|| "-".to_string())
                    );
                }
            }
        }

        Commands::Companies => {
            let db = Database::open(db_path)?;
            db.ensure_initialized()?;
            let companies = db.list_companies()?;
            if companies.is_empty() {
                println!("No companies found.");
            } else {
                println!("{:<6} {:<40} {:<20}", "ID", "NAME", "FIRST SEEN");
                println!("{}", "-".repeat(68));
                for company in companies {
                    println!(
                        "{:<6} {:<40} {:<20}",
                        company.id,
                        truncate(&company.name, 38),
                        company.created_at
                    );
                }
            }
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
