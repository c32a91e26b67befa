use anyhow::Result;
use tracing::{error, info};

use crate::normalize::NormalizedListing;

/// The narrow record interface reconciliation needs from a store.
pub trait ListingStore {
    fn find_listing_id(&self, listing_url: &str) -> Result<Option<i64>>;
    fn find_company_id(&self, name: &str) -> Result<Option<i64>>;
    fn insert_company(&self, name: &str) -> Result<i64>;
    fn insert_listing(&self, listing: &NormalizedListing, company_id: Option<i64>) -> Result<i64>;
    fn update_listing(
        &self,
        id: i64,
        listing: &NormalizedListing,
        company_id: Option<i64>,
    ) -> Result<()>;

    /// Exact, case-sensitive name match. Companies are never renamed or merged.
    fn get_or_create_company(&self, name: &str) -> Result<i64> {
        match self.find_company_id(name)? {
            Some(id) => Ok(id),
            None => self.insert_company(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created(i64),
    Updated(i64),
}

/// Create/update tallies for one batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    pub total: usize,
}

impl ReconcileSummary {
    fn record(self, result: &Result<Outcome>) -> Self {
        let mut next = Self {
            total: self.total + 1,
            ..self
        };
        match result {
            Ok(Outcome::Created(_)) => next.created += 1,
            Ok(Outcome::Updated(_)) => next.updated += 1,
            Err(_) => next.failed += 1,
        }
        next
    }
}

/// Inserts the listing, or updates the row that already has its URL.
pub fn reconcile_listing(store: &dyn ListingStore, listing: &NormalizedListing) -> Result<Outcome> {
    let existing = store.find_listing_id(&listing.listing_url)?;

    let company_id = if listing.company_name.is_empty() {
        None
    } else {
        Some(store.get_or_create_company(&listing.company_name)?)
    };

    match existing {
        Some(id) => {
            store.update_listing(id, listing, company_id)?;
            Ok(Outcome::Updated(id))
        }
        None => {
            let id = store.insert_listing(listing, company_id)?;
            Ok(Outcome::Created(id))
        }
    }
}

/// Reconciles listings one at a time, in order. A failing record is logged and
/// counted; it never stops the rest of the batch.
pub fn reconcile_all(store: &dyn ListingStore, listings: &[NormalizedListing]) -> ReconcileSummary {
    let summary = listings
        .iter()
        .fold(ReconcileSummary::default(), |summary, listing| {
            let result = reconcile_listing(store, listing);
            match &result {
                Ok(outcome) => {
                    let (action, id) = match outcome {
                        Outcome::Created(id) => ("Created", id),
                        Outcome::Updated(id) => ("Updated", id),
                    };
                    info!(
                        id,
                        listing_date = ?listing.listing_date,
                        platform = %listing.platform,
                        coverage = %listing.coverage,
                        "{}: {} from {}",
                        action,
                        listing.job_title,
                        listing.company_name
                    );
                }
                Err(e) => {
                    error!(
                        url = %listing.listing_url,
                        "Error saving job: {} from {}: {:#}",
                        listing.job_title,
                        listing.company_name,
                        e
                    );
                }
            }
            summary.record(&result)
        });

    info!(
        "Scraping completed. New jobs: {}, Updated jobs: {}, Total: {}",
        summary.created, summary.updated, summary.total
    );
    summary
}
