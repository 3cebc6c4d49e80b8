//! Verifiable random selection of housing indices.
//!
//! A public beacon pulse and an optional operator secret are combined with
//! HMAC-SHA3-512 into a seed. That seed drives one ChaCha20 stream, which in
//! a fixed order samples dwellings per block, extends the selection without
//! repeating earlier picks, shuffles the result and splits it into files.
//! Re-running with the same pulse, secret and tables reproduces every byte.

pub mod audit;
pub mod base;
pub mod batch;
pub mod config;
pub mod error;
pub mod extension;
pub mod group;
pub mod pipeline;
pub mod pulse;
pub mod rng;
pub mod seed;
pub mod shuffle;
pub mod tables;

pub use crate::audit::{AuditManifest, BatchDigest, MANIFEST_VERSION, batch_digest};
pub use crate::base::select_base;
pub use crate::batch::{batch_bounds, partition};
pub use crate::config::{DEFAULT_MAX_ATTEMPTS, DuplicateKeyPolicy, RunConfig};
pub use crate::error::{Result, SelectionError};
pub use crate::extension::select_extension;
pub use crate::group::{Group, SelectedGroup, Selection, SelectionRecord};
pub use crate::pipeline::{
    RunReport, SelectionOutcome, SelectionRun, SelectionSummary, Stage, TOTAL_STEPS,
};
pub use crate::pulse::{DEFAULT_BEACON_URL, Pulse, PulseEnvelope, PulseRequest, PulseSource};
pub use crate::rng::{ChaChaStream, SampleStream};
pub use crate::seed::{SEED_BYTES, Seed, derive_seed, derive_seed_from_bytes};
pub use crate::shuffle::{flatten, flatten_and_shuffle};
pub use crate::tables::{batch_to_bytes, read_groups, read_groups_from_path, write_batch};
