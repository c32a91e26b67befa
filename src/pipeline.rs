use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use tracing::{error, info};

use crate::config::HarvestConfig;
use crate::fetch::PageFetcher;
use crate::harvest::{CollectStats, Harvester};
use crate::normalize::{NormalizedListing, Normalizer};
use crate::parser::ListingParser;
use crate::reconcile::{reconcile_all, ListingStore, ReconcileSummary};

#[derive(Debug)]
pub struct BatchReport {
    pub listings: Vec<NormalizedListing>,
    pub stats: CollectStats,
    /// `None` when the batch ran without a store (dry run).
    pub summary: Option<ReconcileSummary>,
}

/// Runs one batch: collect every listing first, then reconcile them into
/// `store` and write the optional JSON dump. Only configuration problems fail
/// the batch; everything after that degrades into log lines and lower counts.
pub fn run_batch(
    config: &HarvestConfig,
    fetcher: &dyn PageFetcher,
    store: Option<&dyn ListingStore>,
    today: NaiveDate,
) -> Result<BatchReport> {
    let seeds = config.profile.seed_urls()?;
    let parser = ListingParser::new(&config.profile)?;
    let normalizer = Normalizer::new(&config.profile, today);

    info!(
        cap = config.max_listings,
        seeds = seeds.len(),
        "Starting to scrape listings from {}",
        config.profile.platform
    );
    let collection =
        Harvester::new(fetcher, &parser, &normalizer, config.max_listings).collect(&seeds);

    let summary = store.map(|store| reconcile_all(store, &collection.listings));

    if let Some(path) = &config.json_output {
        if let Err(e) = save_to_json(&collection.listings, path) {
            error!(path = %path.display(), "{:#}", e);
        }
    }

    Ok(BatchReport {
        listings: collection.listings,
        stats: collection.stats,
        summary,
    })
}

pub fn save_to_json(listings: &[NormalizedListing], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(listings).context("Failed to serialize listings")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write listings to {}", path.display()))?;
    info!("Saved job listings to {}", path.display());
    Ok(())
}
