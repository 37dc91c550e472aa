//! Error taxonomy for the harvest pipeline.
//!
//! Transport, body-decode, and initialization failures are fatal to the run
//! and bubble up to `main`. Extraction gaps (missing display name, empty
//! ingredient name, zero-noun normalization) are not errors at all; they are
//! absorbed where they occur.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarvestError {
    /// Building the shared HTTP client failed.
    #[error("failed to build the http client")]
    ClientBuild(#[source] reqwest::Error),

    /// The GET request itself failed, or the server answered with a
    /// non-success status.
    #[error("failed to fetch {url}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response arrived but its body could not be decoded into text.
    #[error("failed to decode page body for {url}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Loading the tokenizer model for POS tagging and lemmatization failed.
    /// The normalization service can never be constructed after this.
    #[error("failed to initialize the lemmatizer")]
    LemmatizerInit(#[source] Box<nlprule::Error>),

    #[error("i/o error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A write to the persistence sink failed.
    #[error("store error: {0}")]
    Store(String),
}

impl HarvestError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
