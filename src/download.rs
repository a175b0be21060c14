use anyhow::{Context, Result};
use std::io::Read;
use std::time::Duration;
use tracing::info;

/// Retrieves the raw bytes behind a location.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// HTTP(S) fetcher backed by a shared `ureq` agent.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(60)))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        info!("Downloading contents from {}", url);

        let resp = self
            .agent
            .get(url)
            .call()
            .with_context(|| format!("HTTP request to {} failed", url))?;

        let mut body = Vec::new();
        resp.into_body()
            .into_reader()
            .read_to_end(&mut body)
            .context("Network read error")?;
        Ok(body)
    }
}
