//! First universe: one draw per block, in table order.

use log::{debug, warn};

use crate::config::DuplicateKeyPolicy;
use crate::error::{Result, SelectionError};
use crate::group::{Group, Selection};
use crate::rng::SampleStream;

/// Draws `required_count` distinct dwellings for every group, once each.
pub fn select_base<S: SampleStream>(
    groups: &[Group],
    stream: &mut S,
    duplicates: DuplicateKeyPolicy,
) -> Result<Selection> {
    let mut selection = Selection::new();
    for (position, group) in groups.iter().enumerate() {
        if duplicates == DuplicateKeyPolicy::Reject && selection.contains_key(&group.key) {
            return Err(SelectionError::DuplicateGroupKey {
                key: group.key.clone(),
                row: position + 1,
            });
        }
        let indices = stream.sample(group.population_size, group.required_count)?;
        if selection.insert(group.key.clone(), indices).is_some() {
            warn!(
                "base group {} repeated at row {}, earlier draw replaced",
                group.key,
                position + 1
            );
        }
    }
    debug!(
        "base selection groups={} distinct_keys={} dwellings={}",
        groups.len(),
        selection.len(),
        selection.total_selected()
    );
    Ok(selection)
}
