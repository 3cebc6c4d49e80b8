//! Audit manifest written next to the output tables.
//!
//! The manifest pins the pulse, a fingerprint of the seed and a BLAKE3 digest
//! of every batch file, so a recomputation can be compared byte for byte. It
//! never contains the secret or the seed itself.

use std::fs;
use std::path::Path;

use blake3::Hasher;
use serde::de::Error as DeError;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Result;
use crate::pulse::Pulse;

/// Layout revision of the manifest JSON; bumped on any field change.
pub const MANIFEST_VERSION: u16 = 1;

const BATCH_DIGEST_LABEL: &[u8] = b"vivienda::batch";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDigest {
    pub file_name: String,
    pub rows: usize,
    pub blake3: String,
}

impl BatchDigest {
    pub fn of(file_name: impl Into<String>, rows: usize, bytes: &[u8]) -> Self {
        Self {
            file_name: file_name.into(),
            rows,
            blake3: batch_digest(bytes),
        }
    }
}

pub fn batch_digest(bytes: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(BATCH_DIGEST_LABEL);
    hasher.update(bytes);
    hasher.finalize().to_hex().to_string()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditManifest {
    pub version: u16,
    pub pulse: Pulse,
    pub seed_fingerprint: String,
    pub secret_used: bool,
    pub base_groups: usize,
    pub extension_groups: usize,
    pub selected: usize,
    pub batches: Vec<BatchDigest>,
}

impl AuditManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Names of batches whose digest differs from `other`, in batch order.
    pub fn mismatched_batches<'a>(&'a self, other: &AuditManifest) -> Vec<&'a str> {
        let mut mismatched: Vec<&str> = self
            .batches
            .iter()
            .zip(&other.batches)
            .filter(|(mine, theirs)| mine != theirs)
            .map(|(mine, _)| mine.file_name.as_str())
            .collect();
        mismatched.extend(
            self.batches
                .iter()
                .skip(other.batches.len())
                .map(|b| b.file_name.as_str()),
        );
        mismatched
    }
}

impl Serialize for AuditManifest {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("AuditManifest", 8)?;
        state.serialize_field("version", &self.version)?;
        state.serialize_field("pulse", &self.pulse)?;
        state.serialize_field("seed_fingerprint", &self.seed_fingerprint)?;
        state.serialize_field("secret_used", &self.secret_used)?;
        state.serialize_field("base_groups", &self.base_groups)?;
        state.serialize_field("extension_groups", &self.extension_groups)?;
        state.serialize_field("selected", &self.selected)?;
        state.serialize_field("batches", &self.batches)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for AuditManifest {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Helper {
            version: u16,
            pulse: Pulse,
            seed_fingerprint: String,
            secret_used: bool,
            base_groups: usize,
            extension_groups: usize,
            selected: usize,
            batches: Vec<BatchDigest>,
        }
        let helper = Helper::deserialize(deserializer)?;
        if helper.version != MANIFEST_VERSION {
            return Err(D::Error::custom(format!(
                "manifest version {} is not supported (this build reads version {MANIFEST_VERSION})",
                helper.version
            )));
        }
        Ok(Self {
            version: helper.version,
            pulse: helper.pulse,
            seed_fingerprint: helper.seed_fingerprint,
            secret_used: helper.secret_used,
            base_groups: helper.base_groups,
            extension_groups: helper.extension_groups,
            selected: helper.selected,
            batches: helper.batches,
        })
    }
}
