use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use reqwest::blocking::Client;
use vivienda_core::{DEFAULT_BEACON_URL, Pulse, PulseEnvelope, PulseRequest, PulseSource};

pub const ENV_BEACON_URL: &str = "VIVIENDA_BEACON_URL";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Beacon 2.0 client over HTTPS.
pub struct HttpBeacon {
    client: Client,
    base_url: String,
}

impl HttpBeacon {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("vivienda/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building beacon HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn from_env() -> Result<Self> {
        let base_url = env::var(ENV_BEACON_URL)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BEACON_URL.to_string());
        Self::new(base_url)
    }
}

impl PulseSource for HttpBeacon {
    type Error = anyhow::Error;

    fn fetch(&self, request: PulseRequest) -> Result<Pulse> {
        let url = request.url(&self.base_url);
        debug!("fetching beacon pulse from {url}");
        let envelope: PulseEnvelope = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("requesting {url}"))?
            .error_for_status()
            .with_context(|| format!("beacon rejected {url}"))?
            .json()
            .with_context(|| format!("decoding pulse from {url}"))?;
        Ok(envelope.pulse)
    }
}
