use anyhow::{Context, Result};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::errors::FetchError;

const USER_AGENT: &str = concat!("remote-harvest/", env!("CARGO_PKG_VERSION"));

/// Retrieves the raw markup of one listing page.
pub trait PageFetcher {
    fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    retries: u32,
    retry_pause: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, retries: u32, retry_pause: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            retries,
            retry_pause,
        })
    }

    fn fetch_once(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| FetchError::from_reqwest(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        response
            .text()
            .map_err(|e| FetchError::from_reqwest(url.as_str(), e))
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url) {
                Ok(body) => {
                    debug!(url = %url, bytes = body.len(), "fetched page");
                    return Ok(body);
                }
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    warn!(url = %url, attempt, error = %e, "fetch failed, retrying");
                    thread::sleep(self.retry_pause);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Serves canned pages from memory and records every request made.
#[cfg(test)]
pub struct StaticFetcher {
    pages: std::collections::HashMap<String, String>,
    requested: std::cell::RefCell<Vec<String>>,
}

#[cfg(test)]
impl StaticFetcher {
    pub fn new<I, K, V>(pages: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pages: pages
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            requested: std::cell::RefCell::new(Vec::new()),
        }
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }
}

#[cfg(test)]
impl PageFetcher for StaticFetcher {
    fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        self.requested.borrow_mut().push(url.to_string());
        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: reqwest::StatusCode::NOT_FOUND,
            })
    }
}
