use thiserror::Error;

pub type Result<T> = std::result::Result<T, SelectionError>;

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("cannot sample {count} distinct indices from a range of {range}")]
    InvalidSample { range: u32, count: u32 },

    #[error(
        "group {key}: no draw of {count} from 1..={population} avoids the {taken} base indices \
         (gave up after {attempts} attempts)"
    )]
    ExhaustedSampleSpace {
        key: String,
        population: u32,
        count: u32,
        taken: usize,
        attempts: u32,
    },

    #[error("file count must be at least 1, got {0}")]
    InvalidPartitionCount(usize),

    #[error("group key {key} appears again at row {row} of the base table")]
    DuplicateGroupKey { key: String, row: usize },

    #[error("table error: {0}")]
    Table(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl SelectionError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
