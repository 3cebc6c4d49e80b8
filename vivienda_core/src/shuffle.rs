use log::debug;

use crate::group::{SelectedGroup, SelectionRecord};
use crate::rng::SampleStream;

/// One record per selected dwelling, groups in draw order, indices ascending.
pub fn flatten(selections: &[SelectedGroup]) -> Vec<SelectionRecord> {
    let total = selections.iter().map(|s| s.indices.len()).sum();
    let mut records = Vec::with_capacity(total);
    for selected in selections {
        let mut indices = selected.indices.clone();
        indices.sort_unstable();
        records.extend(
            indices
                .into_iter()
                .map(|index| SelectionRecord::new(&selected.group, index)),
        );
    }
    records
}

/// Flattens the extension selection and applies the run's single shuffle.
pub fn flatten_and_shuffle<S: SampleStream>(
    selections: &[SelectedGroup],
    stream: &mut S,
) -> Vec<SelectionRecord> {
    let mut records = flatten(selections);
    stream.shuffle(&mut records);
    debug!("shuffled {} selection records", records.len());
    records
}
