use thiserror::Error;

/// A listing page could not be retrieved. Ends the current seed's pagination.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

/// Problems with the batch configuration, raised before any page is fetched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read profile {path}: {source}")]
    ReadProfile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid profile {path}: {source}")]
    InvalidProfile {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid seed URL '{url}': {source}")]
    InvalidSeed {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid selector '{0}'")]
    InvalidSelector(String),

    #[error("no seed URLs configured")]
    NoSeeds,
}

/// Why a listing node was dropped during parsing. Not an error for the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseSkip {
    #[error("no link to a job detail page")]
    MissingDetailLink,

    #[error("no title element")]
    MissingTitle,

    #[error("no company element")]
    MissingCompany,
}
