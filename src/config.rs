use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::errors::ConfigError;

pub const DEFAULT_MAX_LISTINGS: usize = 50;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RETRY_PAUSE: Duration = Duration::from_secs(2);
pub const DEFAULT_JSON_OUTPUT: &str = "job_listings.json";

const WWR_BASE_URL: &str = "https://weworkremotely.com";

/// Everything that depends on the markup of one listings site.
///
/// Site layout changes should only ever need a new profile, which can be
/// loaded from a JSON file; any field left out keeps the WeWorkRemotely value.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceProfile {
    pub platform: String,
    pub job_type: String,
    /// Listing index pages to start pagination from, visited in order.
    pub seeds: Vec<String>,
    pub listing_selector: String,
    /// Anchors whose href starts with this prefix link to a job's detail page.
    pub detail_path_prefix: String,
    pub title_selector: String,
    pub company_selector: String,
    pub tags_selector: String,
    pub date_selector: String,
    pub next_page_selector: String,
}

impl Default for SourceProfile {
    fn default() -> Self {
        Self::weworkremotely()
    }
}

impl SourceProfile {
    pub fn weworkremotely() -> Self {
        Self {
            platform: "WeWorkRemotely".to_string(),
            job_type: "remote".to_string(),
            seeds: vec![
                format!("{}/100-percent-remote-jobs", WWR_BASE_URL),
                format!("{}/remote-asia-jobs", WWR_BASE_URL),
            ],
            // The site renders featured and plain listings differently
            listing_selector: "li.feature, li:not([class])".to_string(),
            detail_path_prefix: "/remote-jobs/".to_string(),
            title_selector: "span.title".to_string(),
            company_selector: "span.company".to_string(),
            tags_selector: ".region.company".to_string(),
            date_selector: ".listing-date__date".to_string(),
            next_page_selector: "a[rel=next]".to_string(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadProfile {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::InvalidProfile {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn seed_urls(&self) -> Result<Vec<Url>, ConfigError> {
        if self.seeds.is_empty() {
            return Err(ConfigError::NoSeeds);
        }
        self.seeds
            .iter()
            .map(|seed| {
                Url::parse(seed).map_err(|source| ConfigError::InvalidSeed {
                    url: seed.clone(),
                    source,
                })
            })
            .collect()
    }
}

/// Knobs for one batch run.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub profile: SourceProfile,
    /// Total records accepted across all seeds combined.
    pub max_listings: usize,
    pub fetch_timeout: Duration,
    /// Extra attempts after a failed fetch before giving up on a seed.
    pub fetch_retries: u32,
    /// Wait between a failed fetch and its retry.
    pub retry_pause: Duration,
    pub json_output: Option<PathBuf>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            profile: SourceProfile::default(),
            max_listings: DEFAULT_MAX_LISTINGS,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            fetch_retries: 0,
            retry_pause: DEFAULT_RETRY_PAUSE,
            json_output: None,
        }
    }
}
