use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SelectionError};

/// A census block: a population of numbered dwellings and how many to pick.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Group {
    pub key: String,
    pub region: String,
    pub locality: String,
    pub population_size: u32,
    pub required_count: u32,
}

impl Group {
    pub fn new(
        key: impl Into<String>,
        region: impl Into<String>,
        locality: impl Into<String>,
        population_size: u32,
        required_count: u32,
    ) -> Result<Self> {
        let key = key.into();
        if population_size == 0 {
            return Err(SelectionError::invalid(format!(
                "group {key} has an empty population"
            )));
        }
        if required_count > population_size {
            return Err(SelectionError::invalid(format!(
                "group {key} requires {required_count} dwellings from a population of {population_size}"
            )));
        }
        Ok(Self {
            key,
            region: region.into(),
            locality: locality.into(),
            population_size,
            required_count,
        })
    }
}

/// Indices drawn per group key within one universe.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    samples: HashMap<String, Vec<u32>>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a draw, returning the one it replaced, if any.
    pub fn insert(&mut self, key: impl Into<String>, indices: Vec<u32>) -> Option<Vec<u32>> {
        self.samples.insert(key.into(), indices)
    }

    pub fn get(&self, key: &str) -> Option<&[u32]> {
        self.samples.get(key).map(Vec::as_slice)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.samples.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn total_selected(&self) -> usize {
        self.samples.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u32])> + '_ {
        self.samples
            .iter()
            .map(|(key, indices)| (key.as_str(), indices.as_slice()))
    }
}

/// An extension-universe group with the indices accepted for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedGroup {
    pub group: Group,
    pub indices: Vec<u32>,
    /// Candidate draws consumed before acceptance, the accepted one included.
    pub attempts: u32,
}

/// One selected dwelling, as written to the output tables.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionRecord {
    #[serde(rename = "MANZENT")]
    pub group_key: String,
    #[serde(rename = "REGION")]
    pub region: String,
    #[serde(rename = "COMUNA")]
    pub locality: String,
    #[serde(rename = "INDICE_VIVIENDA")]
    pub index: u32,
}

impl SelectionRecord {
    pub fn new(group: &Group, index: u32) -> Self {
        Self {
            group_key: group.key.clone(),
            region: group.region.clone(),
            locality: group.locality.clone(),
            index,
        }
    }
}
