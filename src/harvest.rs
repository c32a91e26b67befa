use std::collections::HashSet;
use tracing::{error, info, warn};
use url::Url;

use crate::fetch::PageFetcher;
use crate::normalize::{NormalizedListing, Normalizer};
use crate::parser::ListingParser;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CollectStats {
    pub seeds_visited: usize,
    pub pages_fetched: usize,
    pub fetch_failures: usize,
    pub nodes_skipped: usize,
}

#[derive(Debug, Default)]
pub struct Collection {
    pub listings: Vec<NormalizedListing>,
    pub stats: CollectStats,
}

impl Collection {
    fn is_full(&self, cap: usize) -> bool {
        self.listings.len() >= cap
    }
}

/// Walks seed URLs and their pagination, collecting at most `cap` listings in
/// total across all seeds.
pub struct Harvester<'a> {
    fetcher: &'a dyn PageFetcher,
    parser: &'a ListingParser,
    normalizer: &'a Normalizer,
    cap: usize,
}

impl<'a> Harvester<'a> {
    pub fn new(
        fetcher: &'a dyn PageFetcher,
        parser: &'a ListingParser,
        normalizer: &'a Normalizer,
        cap: usize,
    ) -> Self {
        Self {
            fetcher,
            parser,
            normalizer,
            cap,
        }
    }

    /// Seeds are visited in order; once the cap is hit, later seeds are never
    /// fetched.
    pub fn collect(&self, seeds: &[Url]) -> Collection {
        let mut collection = Collection::default();

        for seed in seeds {
            if collection.is_full(self.cap) {
                break;
            }
            self.collect_seed(seed, &mut collection);
        }

        info!(
            "Finished scraping. Total listings processed: {}",
            collection.listings.len()
        );
        collection
    }

    fn collect_seed(&self, seed: &Url, collection: &mut Collection) {
        collection.stats.seeds_visited += 1;
        let mut visited: HashSet<Url> = HashSet::new();
        let mut next = Some(seed.clone());

        while let Some(url) = next.take() {
            if !visited.insert(url.clone()) {
                warn!(url = %url, "pagination loops back to a visited page, stopping seed");
                break;
            }

            info!(url = %url, "Fetching page");
            let html = match self.fetcher.fetch(&url) {
                Ok(html) => html,
                Err(e) => {
                    collection.stats.fetch_failures += 1;
                    error!(seed = %seed, error = %e, "fetch failed, abandoning seed");
                    break;
                }
            };
            collection.stats.pages_fetched += 1;

            let page = self.parser.parse_page(&html, &url);
            collection.stats.nodes_skipped += page.skipped;

            for job in page.jobs {
                if collection.is_full(self.cap) {
                    break;
                }
                match self.normalizer.normalize(job, &url) {
                    Some(listing) => collection.listings.push(listing),
                    None => collection.stats.nodes_skipped += 1,
                }
            }

            if collection.is_full(self.cap) {
                info!(cap = self.cap, "listing cap reached");
                break;
            }
            next = page.next_page;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceProfile;
    use crate::fetch::StaticFetcher;
    use crate::parser::fixtures::{listing_item, listing_page};
    use chrono::NaiveDate;

    const SEED_A: &str = "https://weworkremotely.com/100-percent-remote-jobs";
    const SEED_B: &str = "https://weworkremotely.com/remote-asia-jobs";

    fn items(prefix: &str, count: usize) -> Vec<String> {
        (0..count)
            .map(|i| {
                listing_item(
                    &format!("/remote-jobs/{}-{}", prefix, i),
                    "Software Developer",
                    "Acme",
                    "Anywhere in the World",
                    "1d",
                )
            })
            .collect()
    }

    fn seeds() -> Vec<Url> {
        vec![Url::parse(SEED_A).unwrap(), Url::parse(SEED_B).unwrap()]
    }

    fn run(fetcher: &StaticFetcher, cap: usize) -> Collection {
        let profile = SourceProfile::default();
        let parser = ListingParser::new(&profile).unwrap();
        let normalizer = Normalizer::new(&profile, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        Harvester::new(fetcher, &parser, &normalizer, cap).collect(&seeds())
    }

    #[test]
    fn test_collect_follows_pagination_and_all_seeds() {
        let fetcher = StaticFetcher::new([
            (
                SEED_A.to_string(),
                listing_page(&items("a1", 2), Some("/100-percent-remote-jobs?page=2")),
            ),
            (
                format!("{}?page=2", SEED_A),
                listing_page(&items("a2", 2), None),
            ),
            (SEED_B.to_string(), listing_page(&items("b1", 1), None)),
        ]);

        let collection = run(&fetcher, 50);
        assert_eq!(collection.listings.len(), 5);
        assert_eq!(
            collection.stats,
            CollectStats {
                seeds_visited: 2,
                pages_fetched: 3,
                fetch_failures: 0,
                nodes_skipped: 0,
            }
        );
        assert_eq!(
            collection.listings[4].listing_url,
            "https://weworkremotely.com/remote-jobs/b1-0"
        );
    }

    #[test]
    fn test_collect_stops_at_cap_mid_page() {
        let fetcher = StaticFetcher::new([
            (
                SEED_A.to_string(),
                listing_page(&items("a1", 8), Some("/100-percent-remote-jobs?page=2")),
            ),
            (
                format!("{}?page=2", SEED_A),
                listing_page(&items("a2", 8), Some("/100-percent-remote-jobs?page=3")),
            ),
            (SEED_B.to_string(), listing_page(&items("b1", 8), None)),
        ]);

        let collection = run(&fetcher, 10);
        assert_eq!(collection.listings.len(), 10);
        assert_eq!(collection.stats.seeds_visited, 1);
        assert_eq!(
            fetcher.requested(),
            vec![SEED_A.to_string(), format!("{}?page=2", SEED_A)]
        );
    }

    #[test]
    fn test_collect_cap_counts_across_seeds() {
        let fetcher = StaticFetcher::new([
            (SEED_A.to_string(), listing_page(&items("a", 6), None)),
            (SEED_B.to_string(), listing_page(&items("b", 6), None)),
        ]);

        let collection = run(&fetcher, 10);
        assert_eq!(collection.listings.len(), 10);
        let from_b = collection
            .listings
            .iter()
            .filter(|l| l.listing_url.contains("/remote-jobs/b-"))
            .count();
        assert_eq!(from_b, 4);
    }

    #[test]
    fn test_fetch_failure_only_ends_current_seed() {
        // Seed A's second page is missing
        let fetcher = StaticFetcher::new([
            (
                SEED_A.to_string(),
                listing_page(&items("a", 3), Some("/100-percent-remote-jobs?page=2")),
            ),
            (SEED_B.to_string(), listing_page(&items("b", 2), None)),
        ]);

        let collection = run(&fetcher, 50);
        assert_eq!(collection.listings.len(), 5);
        assert_eq!(collection.stats.fetch_failures, 1);
        assert_eq!(collection.stats.pages_fetched, 2);
    }

    #[test]
    fn test_pagination_loop_is_broken() {
        let fetcher = StaticFetcher::new([
            (
                SEED_A.to_string(),
                listing_page(&items("a", 1), Some("/100-percent-remote-jobs")),
            ),
            (SEED_B.to_string(), listing_page(&[], None)),
        ]);

        let collection = run(&fetcher, 50);
        assert_eq!(collection.listings.len(), 1);
        assert_eq!(
            fetcher.requested(),
            vec![SEED_A.to_string(), SEED_B.to_string()]
        );
    }

    #[test]
    fn test_zero_cap_fetches_nothing() {
        let fetcher = StaticFetcher::new([(SEED_A.to_string(), listing_page(&items("a", 3), None))]);
        let collection = run(&fetcher, 0);
        assert!(collection.listings.is_empty());
        assert!(fetcher.requested().is_empty());
    }

    #[test]
    fn test_skipped_nodes_are_counted() {
        let mut page_items = items("a", 2);
        page_items.push(r#"<li><span class="title">Orphan</span></li>"#.to_string());
        let fetcher = StaticFetcher::new([
            (SEED_A.to_string(), listing_page(&page_items, None)),
            (SEED_B.to_string(), listing_page(&[], None)),
        ]);

        let collection = run(&fetcher, 50);
        assert_eq!(collection.listings.len(), 2);
        assert_eq!(collection.stats.nodes_skipped, 1);
    }
}
