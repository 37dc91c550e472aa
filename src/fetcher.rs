//! Polite page fetching.
//!
//! One request-with-wait is the atomic unit of crawl work: after every
//! request, successful or not, the fetcher sleeps a random `1..=max` seconds
//! before returning. That sleep is the pipeline's rate limit against the
//! source site, so every caller is paced the same way. There is no retry at
//! this layer; retry policy belongs to the caller (and the pipeline's policy
//! is to abort the run).

use std::time::Duration;

use rand::Rng;
use tracing::debug;

use crate::errors::HarvestError;

/// Seam for the crawl and extraction passes; lets tests substitute canned
/// documents for live pages.
pub trait Fetch {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, HarvestError>>;
}

/// HTTP fetcher with a fixed user-agent and a pinned TLS ceiling.
///
/// The target site's front end negotiates badly above TLS 1.2, so both the
/// minimum and maximum protocol versions are pinned to 1.2.
pub struct PageFetcher {
    client: reqwest::Client,
    max_delay_secs: u64,
}

impl PageFetcher {
    pub fn new(user_agent: &str, max_delay_secs: u64) -> Result<Self, HarvestError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .max_tls_version(reqwest::tls::Version::TLS_1_2)
            .build()
            .map_err(HarvestError::ClientBuild)?;
        Ok(Self {
            client,
            max_delay_secs: max_delay_secs.max(1),
        })
    }

    async fn get_text(&self, url: &str) -> Result<String, HarvestError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| HarvestError::Fetch {
                url: url.to_string(),
                source,
            })?;
        response.text().await.map_err(|source| HarvestError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

impl Fetch for PageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, HarvestError> {
        debug!(%url, "fetching page");
        let result = self.get_text(url).await;

        let wait = rand::rng().random_range(1..=self.max_delay_secs);
        debug!(secs = wait, "politeness delay");
        tokio::time::sleep(Duration::from_secs(wait)).await;

        result
    }
}
