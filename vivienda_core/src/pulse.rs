//! Beacon pulses: the public random value and its provenance.

use std::convert::Infallible;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SelectionError};

pub const DEFAULT_BEACON_URL: &str = "https://random.uchile.cl/beacon/2.0";

/// The subset of a beacon 2.0 pulse that the selection depends on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pulse {
    pub uri: String,
    pub time_stamp: String,
    pub chain_index: u64,
    pub pulse_index: u64,
    pub output_value: String,
}

/// Response body of the `pulse/last` and `pulse/time/{ms}` endpoints.
#[derive(Clone, Debug, Deserialize)]
pub struct PulseEnvelope {
    pub pulse: Pulse,
}

impl Pulse {
    /// `chain-pulse` pair identifying the pulse within the beacon.
    pub fn index_label(&self) -> String {
        format!("{}-{}", self.chain_index, self.pulse_index)
    }

    /// Pulse time as `dd/mm/YYYY HH:MM:SS UTC`.
    pub fn display_time(&self) -> Result<String> {
        let parsed = DateTime::parse_from_rfc3339(&self.time_stamp).map_err(|err| {
            SelectionError::invalid(format!(
                "pulse timestamp '{}' is not RFC 3339: {err}",
                self.time_stamp
            ))
        })?;
        Ok(parsed
            .with_timezone(&Utc)
            .format("%d/%m/%Y %H:%M:%S UTC")
            .to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PulseRequest {
    Latest,
    /// Pulse in force at this Unix time, in milliseconds.
    At(u64),
}

impl PulseRequest {
    /// Parses the operator's date option; empty or `latest` means most recent.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("latest") {
            return Ok(Self::Latest);
        }
        value.parse().map(Self::At).map_err(|_| {
            SelectionError::invalid(format!(
                "pulse date '{value}' must be a Unix timestamp in milliseconds"
            ))
        })
    }

    pub fn path(&self) -> String {
        match self {
            Self::Latest => "pulse/last".to_string(),
            Self::At(millis) => format!("pulse/time/{millis}"),
        }
    }

    pub fn url(&self, base: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), self.path())
    }
}

/// Anything able to hand over a pulse: the live beacon or a recorded one.
pub trait PulseSource {
    type Error;

    fn fetch(&self, request: PulseRequest) -> std::result::Result<Pulse, Self::Error>;
}

/// A pulse already in hand replays itself, whatever was requested.
impl PulseSource for Pulse {
    type Error = Infallible;

    fn fetch(&self, _request: PulseRequest) -> std::result::Result<Pulse, Infallible> {
        Ok(self.clone())
    }
}
