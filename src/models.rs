use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobListing {
    pub id: i64,
    pub listing_url: String,
    pub job_title: String,
    pub company_id: Option<i64>,
    pub company_name: Option<String>, // denormalized for convenience
    pub category: Option<String>,
    pub coverage: String, // "malaysia", "asia", "worldwide", "other"
    pub job_type: String,
    pub platform: String,
    pub listing_date: Option<String>,
    pub date_scraped: String,
    pub status: String, // "pending", "approved", "rejected", "archived"
    pub visible: bool,
    pub created_at: String,
    pub updated_at: String,
}
