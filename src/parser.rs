use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::config::SourceProfile;
use crate::errors::{ConfigError, ParseSkip};

/// Raw fields of one listing, before any classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedJob {
    pub detail_path: String,
    pub title_text: String,
    pub company_text: String,
    pub tags_text: String,
    pub date_text: String,
}

#[derive(Debug, Default)]
pub struct ParsedPage {
    pub jobs: Vec<ParsedJob>,
    pub skipped: usize,
    pub next_page: Option<Url>,
}

/// Extracts listings from one page using the selectors of a [`SourceProfile`].
pub struct ListingParser {
    listing: Selector,
    anchor: Selector,
    title: Selector,
    company: Selector,
    tags: Selector,
    date: Selector,
    next_page: Selector,
    detail_path_prefix: String,
}

fn compile(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector(selector.to_string()))
}

impl ListingParser {
    pub fn new(profile: &SourceProfile) -> Result<Self, ConfigError> {
        Ok(Self {
            listing: compile(&profile.listing_selector)?,
            anchor: compile("a[href]")?,
            title: compile(&profile.title_selector)?,
            company: compile(&profile.company_selector)?,
            tags: compile(&profile.tags_selector)?,
            date: compile(&profile.date_selector)?,
            next_page: compile(&profile.next_page_selector)?,
            detail_path_prefix: profile.detail_path_prefix.clone(),
        })
    }

    /// Parses every listing node on the page. Malformed nodes are dropped one
    /// by one; the page as a whole never fails.
    pub fn parse_page(&self, html: &str, page_url: &Url) -> ParsedPage {
        let document = Html::parse_document(html);
        let mut page = ParsedPage::default();

        for node in document.select(&self.listing) {
            match self.parse_node(node) {
                Ok(job) => page.jobs.push(job),
                Err(reason) => {
                    page.skipped += 1;
                    debug!(%reason, "skipping listing node");
                }
            }
        }

        page.next_page = self.next_page_url(&document, page_url);
        page
    }

    fn parse_node(&self, node: ElementRef) -> Result<ParsedJob, ParseSkip> {
        let detail_path = node
            .select(&self.anchor)
            .filter_map(|a| a.value().attr("href"))
            .find(|href| href.starts_with(&self.detail_path_prefix))
            .ok_or(ParseSkip::MissingDetailLink)?;

        let title = node
            .select(&self.title)
            .next()
            .ok_or(ParseSkip::MissingTitle)?;
        let company = node
            .select(&self.company)
            .next()
            .ok_or(ParseSkip::MissingCompany)?;

        let tags_text = node
            .select(&self.tags)
            .next()
            .map(element_text)
            .unwrap_or_default();
        let date_text = node
            .select(&self.date)
            .next()
            .map(element_text)
            .unwrap_or_default();

        Ok(ParsedJob {
            detail_path: detail_path.to_string(),
            title_text: element_text(title),
            company_text: element_text(company),
            tags_text,
            date_text,
        })
    }

    fn next_page_url(&self, document: &Html, page_url: &Url) -> Option<Url> {
        let href = document
            .select(&self.next_page)
            .find_map(|a| a.value().attr("href"))?;

        match page_url.join(href) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(href, error = %e, "ignoring unresolvable next page link");
                None
            }
        }
    }
}

/// Concatenated text of the element, trimmed at both ends only.
fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Markup builders shaped like WeWorkRemotely listing pages.
#[cfg(test)]
pub mod fixtures {
    pub fn listing_item(href: &str, title: &str, company: &str, tags: &str, date: &str) -> String {
        format!(
            r#"<li>
                <a href="{href}">
                    <span class="company">{company}</span>
                    <span class="title">{title}</span>
                    <span class="region company">{tags}</span>
                    <div class="listing-date"><span class="listing-date__date">{date}</span></div>
                </a>
            </li>"#
        )
    }

    pub fn listing_page(items: &[String], next_page: Option<&str>) -> String {
        let next = next_page
            .map(|href| format!(r#"<a rel="next" href="{href}">Next</a>"#))
            .unwrap_or_default();
        format!(
            r#"<html><body><section class="jobs"><ul>{}</ul></section>{}</body></html>"#,
            items.join("\n"),
            next
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{listing_item, listing_page};
    use super::*;

    fn parser() -> ListingParser {
        ListingParser::new(&SourceProfile::default()).unwrap()
    }

    fn page_url() -> Url {
        Url::parse("https://weworkremotely.com/100-percent-remote-jobs").unwrap()
    }

    #[test]
    fn test_parse_page_extracts_fields() {
        let html = listing_page(
            &[listing_item(
                "/remote-jobs/doist-senior-backend-engineer",
                "Senior Backend Engineer",
                "Doist",
                "Anywhere in the World",
                "2d",
            )],
            None,
        );

        let page = parser().parse_page(&html, &page_url());
        assert_eq!(page.skipped, 0);
        assert_eq!(
            page.jobs,
            vec![ParsedJob {
                detail_path: "/remote-jobs/doist-senior-backend-engineer".to_string(),
                title_text: "Senior Backend Engineer".to_string(),
                company_text: "Doist".to_string(),
                tags_text: "Anywhere in the World".to_string(),
                date_text: "2d".to_string(),
            }]
        );
        assert!(page.next_page.is_none());
    }

    #[test]
    fn test_parse_page_drops_nodes_without_detail_link() {
        let html = listing_page(
            &[
                listing_item("/remote-jobs/a", "Frontend Developer", "Acme", "USA Only", "1d"),
                listing_item("/categories/design", "Design", "Ads", "", ""),
                r#"<li><span class="title">No Link</span><span class="company">Nowhere</span></li>"#
                    .to_string(),
                listing_item("/remote-jobs/b", "Copywriter", "Words Inc", "Asia Only", "5h"),
            ],
            None,
        );

        let page = parser().parse_page(&html, &page_url());
        assert_eq!(page.skipped, 2);
        let paths: Vec<_> = page.jobs.iter().map(|j| j.detail_path.as_str()).collect();
        assert_eq!(paths, vec!["/remote-jobs/a", "/remote-jobs/b"]);
        assert!(page
            .jobs
            .iter()
            .all(|j| j.detail_path.starts_with("/remote-jobs/")));
    }

    #[test]
    fn test_parse_page_requires_title_and_company() {
        let html = listing_page(
            &[
                r#"<li><a href="/remote-jobs/x"><span class="company">Acme</span></a></li>"#
                    .to_string(),
                r#"<li><a href="/remote-jobs/y"><span class="title">Editor</span></a></li>"#
                    .to_string(),
            ],
            None,
        );

        let page = parser().parse_page(&html, &page_url());
        assert!(page.jobs.is_empty());
        assert_eq!(page.skipped, 2);
    }

    #[test]
    fn test_parse_page_tolerates_missing_tags_and_date() {
        let html = listing_page(
            &[r#"<li><a href="/remote-jobs/z">
                    <span class="company">Acme</span>
                    <span class="title">Virtual Assistant</span>
                </a></li>"#
                .to_string()],
            None,
        );

        let page = parser().parse_page(&html, &page_url());
        assert_eq!(page.jobs.len(), 1);
        assert_eq!(page.jobs[0].tags_text, "");
        assert_eq!(page.jobs[0].date_text, "");
    }

    #[test]
    fn test_parse_page_selects_featured_and_unclassed_items_only() {
        let html = r#"<html><body><ul>
            <li class="feature"><a href="/remote-jobs/featured">
                <span class="company">Featured Co</span><span class="title">Designer</span>
            </a></li>
            <li class="view-all"><a href="/remote-jobs/ignored">
                <span class="company">Ignored</span><span class="title">Engineer</span>
            </a></li>
            <li><a href="/remote-jobs/plain">
                <span class="company">Plain Co</span><span class="title">Writer</span>
            </a></li>
        </ul></body></html>"#;

        let page = parser().parse_page(html, &page_url());
        let companies: Vec<_> = page.jobs.iter().map(|j| j.company_text.as_str()).collect();
        assert_eq!(companies, vec!["Featured Co", "Plain Co"]);
    }

    #[test]
    fn test_parse_page_takes_first_company_span() {
        // The region tag also carries the "company" class
        let html = listing_page(
            &[listing_item("/remote-jobs/q", "SEO Lead", "Growthly", "Malaysia", "3h")],
            None,
        );
        let page = parser().parse_page(&html, &page_url());
        assert_eq!(page.jobs[0].company_text, "Growthly");
        assert_eq!(page.jobs[0].tags_text, "Malaysia");
    }

    #[test]
    fn test_parse_page_trims_ends_but_keeps_inner_whitespace() {
        let html = listing_page(
            &[listing_item(
                "/remote-jobs/w",
                "\n   Senior   Support Agent ",
                "  Acme  Inc\n",
                "Anywhere in\n the World",
                " 4d ",
            )],
            None,
        );
        let page = parser().parse_page(&html, &page_url());
        let job = &page.jobs[0];
        assert_eq!(job.title_text, "Senior   Support Agent");
        assert_eq!(job.company_text, "Acme  Inc");
        assert_eq!(job.tags_text, "Anywhere in\n the World");
        assert_eq!(job.date_text, "4d");
    }

    #[test]
    fn test_next_page_resolved_against_page_url() {
        let html = listing_page(&[], Some("/100-percent-remote-jobs?page=2"));
        let page = parser().parse_page(&html, &page_url());
        assert_eq!(
            page.next_page.map(|u| u.to_string()),
            Some("https://weworkremotely.com/100-percent-remote-jobs?page=2".to_string())
        );
    }

    #[test]
    fn test_invalid_selector_is_a_config_error() {
        let mut profile = SourceProfile::default();
        profile.title_selector = "span[".to_string();
        assert!(matches!(
            ListingParser::new(&profile),
            Err(ConfigError::InvalidSelector(s)) if s == "span["
        ));
    }
}
