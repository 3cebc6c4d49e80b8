//! Run configuration: table locations, output naming and sampling limits.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Result, SelectionError};

pub const DEFAULT_BASE_TABLE: &str = "resultados_manzanas_detalle_30000.csv";
pub const DEFAULT_EXTENSION_TABLE: &str = "resultados_manzanas_detalle_last15000.csv";
pub const DEFAULT_OUTPUT_PREFIX: &str = "resultados_indices_viviendas_";
pub const DEFAULT_MANIFEST_NAME: &str = "resultados_indices_viviendas_manifest.json";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10_000;

pub const ENV_BASE_TABLE: &str = "VIVIENDA_BASE_TABLE";
pub const ENV_EXTENSION_TABLE: &str = "VIVIENDA_EXTENSION_TABLE";
pub const ENV_OUTPUT_DIR: &str = "VIVIENDA_OUTPUT_DIR";
pub const ENV_MAX_ATTEMPTS: &str = "VIVIENDA_MAX_ATTEMPTS";
pub const ENV_DUPLICATE_KEYS: &str = "VIVIENDA_DUPLICATE_KEYS";

/// What the base sampler does when a group key repeats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicateKeyPolicy {
    /// Fail the run at the repeated row.
    #[default]
    Reject,
    /// Keep drawing; the later row's draw replaces the earlier one.
    Overwrite,
}

impl FromStr for DuplicateKeyPolicy {
    type Err = SelectionError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "overwrite" => Ok(Self::Overwrite),
            other => Err(SelectionError::invalid(format!(
                "unknown duplicate key policy '{other}' (expected reject or overwrite)"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    pub base_table: PathBuf,
    pub extension_table: PathBuf,
    pub output_dir: PathBuf,
    pub output_prefix: String,
    pub manifest_name: String,
    pub max_attempts: u32,
    pub duplicate_keys: DuplicateKeyPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_table: PathBuf::from(DEFAULT_BASE_TABLE),
            extension_table: PathBuf::from(DEFAULT_EXTENSION_TABLE),
            output_dir: PathBuf::from("."),
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            duplicate_keys: DuplicateKeyPolicy::default(),
        }
    }
}

impl RunConfig {
    /// Defaults overlaid with the `VIVIENDA_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = lookup(ENV_BASE_TABLE) {
            config.base_table = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_EXTENSION_TABLE) {
            config.extension_table = PathBuf::from(path);
        }
        if let Some(dir) = lookup(ENV_OUTPUT_DIR) {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_MAX_ATTEMPTS) {
            config.max_attempts = raw.trim().parse().map_err(|_| {
                SelectionError::invalid(format!("{ENV_MAX_ATTEMPTS} must be a positive integer, got '{raw}'"))
            })?;
        }
        if let Some(raw) = lookup(ENV_DUPLICATE_KEYS) {
            config.duplicate_keys = raw.parse()?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings no run can use.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(SelectionError::invalid(format!(
                "max attempts ({ENV_MAX_ATTEMPTS}) must be at least 1"
            )));
        }
        Ok(())
    }

    pub fn with_tables(mut self, base: impl Into<PathBuf>, extension: impl Into<PathBuf>) -> Self {
        self.base_table = base.into();
        self.extension_table = extension.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_duplicate_keys(mut self, policy: DuplicateKeyPolicy) -> Self {
        self.duplicate_keys = policy;
        self
    }

    pub fn batch_file_name(&self, index: usize) -> String {
        format!("{}{}.csv", self.output_prefix, index)
    }

    pub fn batch_path(&self, index: usize) -> PathBuf {
        self.output_dir.join(self.batch_file_name(index))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir.join(&self.manifest_name)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}
