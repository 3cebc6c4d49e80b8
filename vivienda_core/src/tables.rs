//! CSV block tables in, CSV selection tables out.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, SelectionError};
use crate::group::{Group, SelectionRecord};

pub const OUTPUT_COLUMNS: [&str; 4] = ["MANZENT", "REGION", "COMUNA", "INDICE_VIVIENDA"];

#[derive(Debug, Deserialize)]
struct GroupRow {
    #[serde(rename = "MANZENT")]
    key: String,
    #[serde(rename = "REGION")]
    region: String,
    #[serde(rename = "COMUNA")]
    locality: String,
    #[serde(rename = "TOTAL_VIVIENDAS")]
    population_size: String,
    #[serde(rename = "TIMES_SELECTED")]
    required_count: String,
}

impl GroupRow {
    fn into_group(self, row: usize) -> Result<Group> {
        let population = parse_count(&self.population_size, "TOTAL_VIVIENDAS", row, &self.key)?;
        let required = parse_count(&self.required_count, "TIMES_SELECTED", row, &self.key)?;
        Group::new(self.key, self.region, self.locality, population, required).map_err(|err| {
            match err {
                SelectionError::InvalidInput(message) => {
                    SelectionError::invalid(format!("row {row}: {message}"))
                }
                other => other,
            }
        })
    }
}

fn parse_count(raw: &str, column: &str, row: usize, key: &str) -> Result<u32> {
    raw.parse().map_err(|_| {
        SelectionError::invalid(format!(
            "row {row} (group {key}): {column} must be a non-negative integer, got '{raw}'"
        ))
    })
}

/// Reads a block table, keeping row order. Rows are numbered from 1, header excluded.
pub fn read_groups<R: Read>(reader: R) -> Result<Vec<Group>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut groups = Vec::new();
    for (position, row) in reader.deserialize::<GroupRow>().enumerate() {
        groups.push(row?.into_group(position + 1)?);
    }
    Ok(groups)
}

pub fn read_groups_from_path(path: &Path) -> Result<Vec<Group>> {
    let file = File::open(path).map_err(|err| {
        SelectionError::Io(std::io::Error::new(
            err.kind(),
            format!("opening {}: {err}", path.display()),
        ))
    })?;
    read_groups(BufReader::new(file))
}

/// Writes one output table; the header is present even for an empty batch.
///
/// Rows end in `\r\n`, the line ending the published result files have always had.
pub fn write_batch<W: Write>(writer: W, records: &[SelectionRecord]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer);
    writer.write_record(OUTPUT_COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn batch_to_bytes(records: &[SelectionRecord]) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_batch(&mut buffer, records)?;
    Ok(buffer)
}
