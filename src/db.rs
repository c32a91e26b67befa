use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection};
use std::path::PathBuf;

use crate::models::{Company, JobListing};
use crate::normalize::NormalizedListing;
use crate::reconcile::ListingStore;

const LISTING_COLUMNS: &str = "l.id, l.listing_url, l.job_title, l.company_id, c.name, l.category,
                    l.coverage, l.job_type, l.platform, l.listing_date, l.date_scraped,
                    l.status, l.visible, l.created_at, l.updated_at";

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    /// Opens the database at `path`, or at the per-user data directory.
    pub fn open(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
        }
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Ok(Self { conn, path })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn default_path() -> Result<PathBuf> {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "remote-harvest") {
            Ok(proj_dirs.data_dir().join("remote-harvest.db"))
        } else {
            Ok(PathBuf::from("remote-harvest.db"))
        }
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS companies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                website TEXT,
                logo_url TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS job_listings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                listing_url TEXT NOT NULL UNIQUE,
                job_title TEXT NOT NULL,
                company_id INTEGER REFERENCES companies(id),
                category TEXT,
                coverage TEXT NOT NULL CHECK (coverage IN ('malaysia', 'asia', 'worldwide', 'other')),
                job_type TEXT NOT NULL,
                platform TEXT NOT NULL,
                listing_date TEXT,
                date_scraped TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'approved', 'rejected', 'archived')),
                visible INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_listings_company ON job_listings(company_id);
            CREATE INDEX IF NOT EXISTS idx_listings_status ON job_listings(status);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='job_listings'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!(
                "Database not initialized. Run 'remote-harvest init' first."
            ));
        }
        Ok(())
    }

    // --- Company operations ---

    pub fn list_companies(&self) -> Result<Vec<Company>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, website, logo_url, created_at FROM companies ORDER BY name")?;
        let rows = stmt.query_map([], Self::row_to_company)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list companies")
    }

    fn row_to_company(row: &rusqlite::Row) -> rusqlite::Result<Company> {
        Ok(Company {
            id: row.get(0)?,
            name: row.get(1)?,
            website: row.get(2)?,
            logo_url: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    // --- Listing operations ---

    pub fn list_listings(
        &self,
        status: Option<&str>,
        coverage: Option<&str>,
    ) -> Result<Vec<JobListing>> {
        let mut sql = format!(
            "SELECT {}
             FROM job_listings l
             LEFT JOIN companies c ON l.company_id = c.id
             WHERE 1=1",
            LISTING_COLUMNS
        );

        let mut params: Vec<String> = vec![];

        if let Some(s) = status {
            sql.push_str(&format!(" AND l.status = ?{}", params.len() + 1));
            params.push(s.to_string());
        }

        if let Some(cov) = coverage {
            sql.push_str(&format!(" AND l.coverage = ?{}", params.len() + 1));
            params.push(cov.to_string());
        }

        sql.push_str(" ORDER BY l.date_scraped DESC, l.id DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), Self::row_to_listing)?;

        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list job listings")
    }

    #[cfg(test)]
    pub fn get_listing_by_url(&self, listing_url: &str) -> Result<Option<JobListing>> {
        let result = self.conn.query_row(
            &format!(
                "SELECT {}
                 FROM job_listings l
                 LEFT JOIN companies c ON l.company_id = c.id
                 WHERE l.listing_url = ?1",
                LISTING_COLUMNS
            ),
            [listing_url],
            Self::row_to_listing,
        );
        match result {
            Ok(listing) => Ok(Some(listing)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn row_to_listing(row: &rusqlite::Row) -> rusqlite::Result<JobListing> {
        Ok(JobListing {
            id: row.get(0)?,
            listing_url: row.get(1)?,
            job_title: row.get(2)?,
            company_id: row.get(3)?,
            company_name: row.get(4)?,
            category: row.get(5)?,
            coverage: row.get(6)?,
            job_type: row.get(7)?,
            platform: row.get(8)?,
            listing_date: row.get(9)?,
            date_scraped: row.get(10)?,
            status: row.get(11)?,
            visible: row.get(12)?,
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }

    fn find_id(&self, sql: &str, key: &str) -> Result<Option<i64>> {
        match self.conn.query_row(sql, [key], |row| row.get(0)) {
            Ok(id) => Ok(Some(id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl ListingStore for Database {
    fn find_listing_id(&self, listing_url: &str) -> Result<Option<i64>> {
        self.find_id("SELECT id FROM job_listings WHERE listing_url = ?1", listing_url)
            .context("Failed to look up listing")
    }

    fn find_company_id(&self, name: &str) -> Result<Option<i64>> {
        self.find_id("SELECT id FROM companies WHERE name = ?1", name)
            .context("Failed to look up company")
    }

    fn insert_company(&self, name: &str) -> Result<i64> {
        self.conn
            .execute("INSERT INTO companies (name) VALUES (?1)", [name])
            .with_context(|| format!("Failed to create company '{}'", name))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_listing(&self, listing: &NormalizedListing, company_id: Option<i64>) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO job_listings (
                    listing_url, job_title, company_id, category, coverage,
                    job_type, platform, listing_date, date_scraped, status, visible
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'pending', 1)",
                params![
                    listing.listing_url,
                    listing.job_title,
                    company_id,
                    listing.job_category.as_str(),
                    listing.coverage.as_str(),
                    listing.job_type,
                    listing.platform,
                    listing.listing_date.map(|d| d.to_string()),
                    listing.date_scraped.to_string(),
                ],
            )
            .with_context(|| format!("Failed to insert listing {}", listing.listing_url))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_listing(
        &self,
        id: i64,
        listing: &NormalizedListing,
        company_id: Option<i64>,
    ) -> Result<()> {
        self.conn
            .execute(
                "UPDATE job_listings
                 SET date_scraped = ?1, listing_date = ?2, job_title = ?3,
                     company_id = ?4, coverage = ?5, category = ?6,
                     updated_at = datetime('now')
                 WHERE id = ?7",
                params![
                    listing.date_scraped.to_string(),
                    listing.listing_date.map(|d| d.to_string()),
                    listing.job_title,
                    company_id,
                    listing.coverage.as_str(),
                    listing.job_category.as_str(),
                    id,
                ],
            )
            .with_context(|| format!("Failed to update listing #{}", id))?;
        Ok(())
    }
}
