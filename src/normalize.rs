use chrono::{Days, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use tracing::warn;
use url::Url;

use crate::config::SourceProfile;
use crate::parser::ParsedJob;

static HOURS_AGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)h").expect("valid hours pattern"));
static DAYS_AGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)d").expect("valid days pattern"));

/// Geographic eligibility of a remote job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coverage {
    Malaysia,
    Asia,
    Worldwide,
    Other,
}

impl Coverage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Coverage::Malaysia => "malaysia",
            Coverage::Asia => "asia",
            Coverage::Worldwide => "worldwide",
            Coverage::Other => "other",
        }
    }

    /// First match wins. Matching is case-sensitive.
    pub fn classify(tags: &str) -> Self {
        if tags.contains("Malaysia") {
            Coverage::Malaysia
        } else if tags.contains("Asia") {
            Coverage::Asia
        } else if tags.contains("Anywhere in the World") {
            Coverage::Worldwide
        } else {
            Coverage::Other
        }
    }
}

impl fmt::Display for Coverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobCategory {
    TechDevelopment,
    DesignCreative,
    WritingContent,
    AdminVirtualAssistant,
    MarketingSocialMedia,
    CustomerSupport,
    Other,
}

/// Keyword groups in priority order. Keywords match as substrings of the
/// lower-cased title.
const CATEGORY_KEYWORDS: &[(JobCategory, &[&str])] = &[
    (
        JobCategory::TechDevelopment,
        &[
            "developer",
            "engineer",
            "software",
            "frontend",
            "backend",
            "fullstack",
            "devops",
            "sre",
            "data scientist",
            "machine learning",
            "programmer",
        ],
    ),
    (
        JobCategory::DesignCreative,
        &["designer", "ui", "ux", "graphic", "creative", "illustrator"],
    ),
    (
        JobCategory::WritingContent,
        &["writer", "content", "copywriter", "editor", "journalist", "blogger"],
    ),
    (
        JobCategory::AdminVirtualAssistant,
        &["assistant", "admin", "virtual assistant", "secretary", "data entry"],
    ),
    (
        JobCategory::MarketingSocialMedia,
        &["marketing", "social media", "seo", "growth", "community manager"],
    ),
    (
        JobCategory::CustomerSupport,
        &["support", "customer service", "customer success", "helpdesk"],
    ),
];

impl JobCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobCategory::TechDevelopment => "tech-development",
            JobCategory::DesignCreative => "design-creative",
            JobCategory::WritingContent => "writing-content",
            JobCategory::AdminVirtualAssistant => "admin-virtual-assistant",
            JobCategory::MarketingSocialMedia => "marketing-social-media",
            JobCategory::CustomerSupport => "customer-support",
            JobCategory::Other => "other",
        }
    }

    pub fn classify(title: &str) -> Self {
        let title = title.to_lowercase();
        CATEGORY_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| title.contains(k)))
            .map(|(category, _)| *category)
            .unwrap_or(JobCategory::Other)
    }
}

impl fmt::Display for JobCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves relative date text such as "3h" or "5d" against `today`.
///
/// Hours always resolve to `today`. Text matching neither form yields `None`
/// and a warning; the listing is still kept. Empty text means the listing had
/// no date element and yields `None` quietly.
pub fn resolve_listing_date(date_text: &str, today: NaiveDate) -> Option<NaiveDate> {
    if date_text.is_empty() {
        return None;
    }
    if HOURS_AGO.is_match(date_text) {
        return Some(today);
    }

    let days = DAYS_AGO
        .captures(date_text)
        .and_then(|caps| caps[1].parse::<u64>().ok());
    let resolved = days.and_then(|days| today.checked_sub_days(Days::new(days)));
    if resolved.is_none() {
        warn!(date_text, "Unable to parse listing date");
    }
    resolved
}

/// The canonical record handed to reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedListing {
    pub listing_url: String,
    pub job_title: String,
    pub company_name: String,
    pub date_scraped: NaiveDate,
    pub listing_date: Option<NaiveDate>,
    pub coverage: Coverage,
    pub job_category: JobCategory,
    pub job_type: String,
    pub platform: String,
}

/// Turns parsed fields into typed listings for one batch run.
pub struct Normalizer {
    today: NaiveDate,
    platform: String,
    job_type: String,
}

impl Normalizer {
    pub fn new(profile: &SourceProfile, today: NaiveDate) -> Self {
        Self {
            today,
            platform: profile.platform.clone(),
            job_type: profile.job_type.clone(),
        }
    }

    /// Returns `None` only when the detail path cannot form an absolute URL.
    pub fn normalize(&self, job: ParsedJob, page_url: &Url) -> Option<NormalizedListing> {
        let listing_url = match page_url.join(&job.detail_path) {
            Ok(url) => url.to_string(),
            Err(e) => {
                warn!(detail_path = %job.detail_path, error = %e, "dropping listing with bad detail path");
                return None;
            }
        };

        Some(NormalizedListing {
            listing_url,
            listing_date: resolve_listing_date(&job.date_text, self.today),
            coverage: Coverage::classify(&job.tags_text),
            job_category: JobCategory::classify(&job.title_text),
            job_title: job.title_text,
            company_name: job.company_text,
            date_scraped: self.today,
            job_type: self.job_type.clone(),
            platform: self.platform.clone(),
        })
    }
}
