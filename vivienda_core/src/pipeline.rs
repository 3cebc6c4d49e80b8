//! End-to-end run: seed, base draw, extension draw, shuffle, batches.
//!
//! Stage order is fixed and is what makes a run reproducible from its pulse,
//! secret and input tables.

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::audit::{AuditManifest, BatchDigest, MANIFEST_VERSION};
use crate::base::select_base;
use crate::batch::batch_bounds;
use crate::config::RunConfig;
use crate::error::{Result, SelectionError};
use crate::extension::select_extension;
use crate::group::{Group, SelectedGroup, Selection, SelectionRecord};
use crate::pulse::Pulse;
use crate::rng::ChaChaStream;
use crate::seed::{Seed, derive_seed};
use crate::shuffle::flatten_and_shuffle;
use crate::tables::{batch_to_bytes, read_groups_from_path};

pub const TOTAL_STEPS: usize = 5;

/// Stages reported while a run progresses. Fetching the pulse is step 1 and
/// happens before the core is involved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Seed,
    Select,
    Shuffle,
    Write,
}

impl Stage {
    pub fn step(self) -> usize {
        match self {
            Stage::Seed => 2,
            Stage::Select => 3,
            Stage::Shuffle => 4,
            Stage::Write => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Seed => "Building seed and PRNG from pulse and secret",
            Stage::Select => "Selecting dwelling indices in every block",
            Stage::Shuffle => "Shuffling selected dwellings",
            Stage::Write => "Writing result files",
        }
    }

    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Seed => Some(Stage::Select),
            Stage::Select => Some(Stage::Shuffle),
            Stage::Shuffle => Some(Stage::Write),
            Stage::Write => None,
        }
    }
}

const STAGING_SUFFIX: &str = ".partial";

#[derive(Debug)]
pub struct SelectionOutcome {
    pub seed: Seed,
    /// Whether the secret changed the seed. HMAC zero-pads short keys, so an
    /// all-zero secret such as `00` counts as no secret at all.
    pub secret_used: bool,
    pub base_groups: usize,
    pub base: Selection,
    pub extension: Vec<SelectedGroup>,
    pub records: Vec<SelectionRecord>,
    pub bounds: Vec<Range<usize>>,
}

impl SelectionOutcome {
    pub fn batches(&self) -> Vec<&[SelectionRecord]> {
        self.bounds
            .iter()
            .map(|range| &self.records[range.clone()])
            .collect()
    }

    pub fn selected(&self) -> usize {
        self.records.len()
    }

    pub fn file_count(&self) -> usize {
        self.bounds.len()
    }

    pub fn summary(&self, pulse: &Pulse) -> Result<SelectionSummary> {
        Ok(SelectionSummary {
            pulse_time: pulse.display_time()?,
            pulse_uri: pulse.uri.clone(),
            pulse_index: pulse.index_label(),
            selected: self.selected(),
            files: self.file_count(),
        })
    }

    /// Encodes every batch and the manifest describing them.
    pub fn render(
        &self,
        pulse: &Pulse,
        config: &RunConfig,
    ) -> Result<(Vec<Vec<u8>>, AuditManifest)> {
        let mut encoded = Vec::with_capacity(self.file_count());
        let mut digests = Vec::with_capacity(self.file_count());
        for (index, batch) in self.batches().into_iter().enumerate() {
            let bytes = batch_to_bytes(batch)?;
            digests.push(BatchDigest::of(config.batch_file_name(index), batch.len(), &bytes));
            encoded.push(bytes);
        }
        let manifest = AuditManifest {
            version: MANIFEST_VERSION,
            pulse: pulse.clone(),
            seed_fingerprint: hex::encode(self.seed.fingerprint()),
            secret_used: self.secret_used,
            base_groups: self.base_groups,
            extension_groups: self.extension.len(),
            selected: self.selected(),
            batches: digests,
        };
        Ok((encoded, manifest))
    }
}

/// The closing summary shown to the operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionSummary {
    pub pulse_time: String,
    pub pulse_uri: String,
    pub pulse_index: String,
    pub selected: usize,
    pub files: usize,
}

#[derive(Debug)]
pub struct RunReport {
    pub summary: SelectionSummary,
    pub files: Vec<PathBuf>,
    pub manifest_path: PathBuf,
    pub manifest: AuditManifest,
}

#[derive(Clone, Debug, Default)]
pub struct SelectionRun {
    config: RunConfig,
}

impl SelectionRun {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn execute(
        &self,
        pulse: &Pulse,
        secret_hex: &str,
        base_groups: &[Group],
        extension_groups: &[Group],
        file_count: usize,
    ) -> Result<SelectionOutcome> {
        self.execute_with(
            pulse,
            secret_hex,
            base_groups,
            extension_groups,
            file_count,
            |_| {},
        )
    }

    /// As [`execute`](Self::execute), calling `on_stage` after each stage completes.
    pub fn execute_with(
        &self,
        pulse: &Pulse,
        secret_hex: &str,
        base_groups: &[Group],
        extension_groups: &[Group],
        file_count: usize,
        on_stage: impl FnMut(Stage),
    ) -> Result<SelectionOutcome> {
        self.run_stages(
            pulse,
            secret_hex,
            || Ok((base_groups.to_vec(), extension_groups.to_vec())),
            file_count,
            on_stage,
        )
    }

    /// Reads both tables from the configured paths, runs the selection and
    /// writes the batch files plus the audit manifest.
    ///
    /// Everything is first written under a staging name and only renamed into
    /// place once all files are on disk; a failed write removes the staged files.
    pub fn run_files(
        &self,
        pulse: &Pulse,
        secret_hex: &str,
        file_count: usize,
        mut on_stage: impl FnMut(Stage),
    ) -> Result<RunReport> {
        let outcome = self.run_stages(
            pulse,
            secret_hex,
            || {
                let base = read_groups_from_path(&self.config.base_table)?;
                let extension = read_groups_from_path(&self.config.extension_table)?;
                Ok((base, extension))
            },
            file_count,
            &mut on_stage,
        )?;
        let (encoded, manifest) = outcome.render(pulse, &self.config)?;
        fs::create_dir_all(self.config.output_dir())?;
        let files: Vec<PathBuf> = (0..encoded.len())
            .map(|index| self.config.batch_path(index))
            .collect();
        let manifest_path = self.config.manifest_path();
        let manifest_bytes = serde_json::to_vec_pretty(&manifest)?;

        let mut targets: Vec<(&Path, &[u8])> = files
            .iter()
            .map(PathBuf::as_path)
            .zip(encoded.iter().map(Vec::as_slice))
            .collect();
        targets.push((manifest_path.as_path(), manifest_bytes.as_slice()));
        publish(&targets)?;
        on_stage(Stage::Write);
        debug!(
            "wrote {} batch files and manifest {}",
            files.len(),
            manifest_path.display()
        );
        Ok(RunReport {
            summary: outcome.summary(pulse)?,
            files,
            manifest_path,
            manifest,
        })
    }

    fn run_stages<L>(
        &self,
        pulse: &Pulse,
        secret_hex: &str,
        load_groups: L,
        file_count: usize,
        mut on_stage: impl FnMut(Stage),
    ) -> Result<SelectionOutcome>
    where
        L: FnOnce() -> Result<(Vec<Group>, Vec<Group>)>,
    {
        if file_count == 0 {
            return Err(SelectionError::InvalidPartitionCount(file_count));
        }
        self.config.validate()?;

        let seed = derive_seed(&pulse.output_value, secret_hex)?;
        let secret_used = seed != derive_seed(&pulse.output_value, "")?;
        let mut stream = ChaChaStream::from_seed(&seed);
        debug!(
            "seed fingerprint={} pulse={}",
            hex::encode(&seed.fingerprint()[..8]),
            pulse.index_label()
        );
        on_stage(Stage::Seed);

        let (base_groups, extension_groups) = load_groups()?;
        let base = select_base(&base_groups, &mut stream, self.config.duplicate_keys)?;
        let extension = select_extension(
            &extension_groups,
            &base,
            &mut stream,
            self.config.max_attempts,
        )?;
        on_stage(Stage::Select);

        let records = flatten_and_shuffle(&extension, &mut stream);
        on_stage(Stage::Shuffle);

        let bounds = batch_bounds(records.len(), file_count)?;
        debug!(
            "stream samples={} shuffles={} word_pos={}",
            stream.samples_drawn(),
            stream.shuffles_applied(),
            stream.word_pos()
        );
        Ok(SelectionOutcome {
            seed,
            secret_used,
            base_groups: base_groups.len(),
            base,
            extension,
            records,
            bounds,
        })
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(STAGING_SUFFIX);
    PathBuf::from(name)
}

/// Writes every file under its staging name, then renames them all into place.
fn publish(targets: &[(&Path, &[u8])]) -> Result<()> {
    let mut staged = Vec::with_capacity(targets.len());
    for (path, bytes) in targets {
        let staging = staging_path(path);
        if let Err(err) = fs::write(&staging, bytes) {
            discard(&staged);
            return Err(err.into());
        }
        staged.push(staging);
    }
    for (staging, (path, _)) in staged.iter().zip(targets) {
        fs::rename(staging, path)?;
    }
    Ok(())
}

fn discard(staged: &[PathBuf]) {
    for path in staged {
        if let Err(err) = fs::remove_file(path) {
            warn!("could not remove staged file {}: {err}", path.display());
        }
    }
}
