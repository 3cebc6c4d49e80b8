//! Second universe: draws that never repeat a dwelling picked in the base run.
//!
//! Each candidate comes from the shared stream; a candidate touching the base
//! draw for the same key is thrown away and redrawn. Keys unknown to the base
//! selection take their first candidate.

use std::collections::HashSet;

use log::{debug, warn};

use crate::error::{Result, SelectionError};
use crate::group::{Group, SelectedGroup, Selection};
use crate::rng::SampleStream;

const NOISY_REDRAWS: u32 = 100;

pub fn select_extension<S: SampleStream>(
    groups: &[Group],
    base: &Selection,
    stream: &mut S,
    max_attempts: u32,
) -> Result<Vec<SelectedGroup>> {
    if max_attempts == 0 {
        return Err(SelectionError::invalid(
            "extension sampling needs at least one attempt per group",
        ));
    }
    let mut selected = Vec::with_capacity(groups.len());
    let mut redraws = 0u64;
    let mut fresh = 0usize;
    for group in groups {
        let choice = match base.get(&group.key) {
            Some(taken) => draw_disjoint(group, taken, stream, max_attempts)?,
            None => {
                fresh += 1;
                SelectedGroup {
                    group: group.clone(),
                    indices: stream.sample(group.population_size, group.required_count)?,
                    attempts: 1,
                }
            }
        };
        redraws += u64::from(choice.attempts - 1);
        selected.push(choice);
    }
    debug!(
        "extension selection groups={} new_keys={} redraws={} dwellings={}",
        groups.len(),
        fresh,
        redraws,
        selected.iter().map(|s| s.indices.len()).sum::<usize>()
    );
    Ok(selected)
}

fn draw_disjoint<S: SampleStream>(
    group: &Group,
    taken: &[u32],
    stream: &mut S,
    max_attempts: u32,
) -> Result<SelectedGroup> {
    let taken: HashSet<u32> = taken.iter().copied().collect();
    let blocked = taken
        .iter()
        .filter(|&&index| index <= group.population_size)
        .count();
    let exhausted = |attempts| SelectionError::ExhaustedSampleSpace {
        key: group.key.clone(),
        population: group.population_size,
        count: group.required_count,
        taken: blocked,
        attempts,
    };
    if group.required_count as usize + blocked > group.population_size as usize {
        return Err(exhausted(0));
    }
    for attempt in 1..=max_attempts {
        let candidate = stream.sample(group.population_size, group.required_count)?;
        if candidate.iter().all(|index| !taken.contains(index)) {
            if attempt > NOISY_REDRAWS {
                warn!(
                    "group {} needed {} draws to avoid its base selection",
                    group.key, attempt
                );
            }
            return Ok(SelectedGroup {
                group: group.clone(),
                indices: candidate,
                attempts: attempt,
            });
        }
    }
    Err(exhausted(max_attempts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::select_base;
    use crate::config::{DEFAULT_MAX_ATTEMPTS, DuplicateKeyPolicy};
    use crate::rng::ChaChaStream;
    use crate::seed::derive_seed_from_bytes;
    use proptest::prelude::*;

    fn stream(label: &[u8]) -> ChaChaStream {
        ChaChaStream::from_seed(&derive_seed_from_bytes(label, b"").unwrap())
    }

    fn group(key: &str, population: u32, count: u32) -> Group {
        Group::new(key, "5", "5101", population, count).unwrap()
    }

    fn base_of(key: &str, indices: &[u32]) -> Selection {
        let mut selection = Selection::new();
        selection.insert(key, indices.to_vec());
        selection
    }

    #[test]
    fn disjoint_from_base_sample() {
        let base_groups = vec![group("A", 10, 2)];
        let mut s = stream(b"extension-example");
        let base = select_base(&base_groups, &mut s, DuplicateKeyPolicy::Reject).unwrap();
        let extended =
            select_extension(&[group("A", 12, 2)], &base, &mut s, DEFAULT_MAX_ATTEMPTS).unwrap();
        let picked = &extended[0].indices;
        assert_eq!(picked.len(), 2);
        assert_ne!(picked[0], picked[1]);
        assert!(picked.iter().all(|i| (1..=12).contains(i)));
        assert!(picked.iter().all(|i| !base.get("A").unwrap().contains(i)));
    }

    #[test]
    fn new_keys_take_first_draw() {
        let base = base_of("A", &[1, 2]);
        let mut s = stream(b"fresh");
        let extended =
            select_extension(&[group("Z", 8, 3)], &base, &mut s, DEFAULT_MAX_ATTEMPTS).unwrap();
        let mut replay = stream(b"fresh");
        assert_eq!(extended[0].indices, replay.sample(8, 3).unwrap());
        assert_eq!(extended[0].attempts, 1);
        assert_eq!(s.samples_drawn(), 1);
    }

    #[test]
    fn forced_unique_disjoint_draw() {
        // Only {4, 5} avoids the base draw, so it must be what comes back.
        let base = base_of("A", &[1, 2, 3]);
        let mut s = stream(b"tight");
        let extended =
            select_extension(&[group("A", 5, 2)], &base, &mut s, DEFAULT_MAX_ATTEMPTS).unwrap();
        let mut picked = extended[0].indices.clone();
        picked.sort_unstable();
        assert_eq!(picked, vec![4, 5]);
        assert_eq!(s.samples_drawn(), u64::from(extended[0].attempts));
    }

    #[test]
    fn impossible_draw_fails_without_drawing() {
        let base = base_of("A", &[1, 2, 3]);
        let mut s = stream(b"full");
        let err =
            select_extension(&[group("A", 4, 2)], &base, &mut s, DEFAULT_MAX_ATTEMPTS).unwrap_err();
        match err {
            SelectionError::ExhaustedSampleSpace {
                key,
                taken,
                attempts,
                ..
            } => {
                assert_eq!(key, "A");
                assert_eq!(taken, 3);
                assert_eq!(attempts, 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(s.samples_drawn(), 0);
    }

    #[test]
    fn base_indices_beyond_new_population_do_not_block() {
        let base = base_of("A", &[9, 10]);
        let mut s = stream(b"shrunk");
        let extended =
            select_extension(&[group("A", 4, 4)], &base, &mut s, DEFAULT_MAX_ATTEMPTS).unwrap();
        let mut picked = extended[0].indices.clone();
        picked.sort_unstable();
        assert_eq!(picked, vec![1, 2, 3, 4]);
    }

    #[test]
    fn attempt_cap_is_enforced() {
        // One disjoint pair out of 190: a single attempt almost surely misses.
        let taken: Vec<u32> = (1..=18).collect();
        let base = base_of("A", &taken);
        let mut s = stream(b"capped");
        let result = select_extension(&[group("A", 20, 2)], &base, &mut s, 1);
        match result {
            Err(SelectionError::ExhaustedSampleSpace { attempts, .. }) => {
                assert_eq!(attempts, 1);
                assert_eq!(s.samples_drawn(), 1);
            }
            Ok(extended) => {
                let mut picked = extended[0].indices.clone();
                picked.sort_unstable();
                assert_eq!(picked, vec![19, 20]);
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn zero_attempt_budget_rejected_before_drawing() {
        let base = base_of("A", &[1]);
        let mut s = stream(b"no-budget");
        let err = select_extension(&[group("A", 9, 2), group("Z", 9, 2)], &base, &mut s, 0)
            .unwrap_err();
        assert!(matches!(err, SelectionError::InvalidInput(_)));
        assert_eq!(s.samples_drawn(), 0);
    }

    #[test]
    fn zero_count_always_accepted() {
        let base = base_of("A", &[1, 2, 3, 4]);
        let mut s = stream(b"zero");
        let extended =
            select_extension(&[group("A", 4, 0)], &base, &mut s, DEFAULT_MAX_ATTEMPTS).unwrap();
        assert!(extended[0].indices.is_empty());
    }

    #[test]
    fn output_follows_input_order() {
        let base = base_of("B", &[1]);
        let groups = vec![group("C", 9, 1), group("A", 9, 1), group("B", 9, 1), group("A", 9, 2)];
        let extended =
            select_extension(&groups, &base, &mut stream(b"order"), DEFAULT_MAX_ATTEMPTS).unwrap();
        let keys: Vec<_> = extended.iter().map(|s| s.group.key.as_str()).collect();
        assert_eq!(keys, vec!["C", "A", "B", "A"]);
    }

    proptest! {
        #[test]
        fn extension_never_overlaps_base(
            label in prop::collection::vec(any::<u8>(), 1..16),
            shapes in prop::collection::vec((2u32..200, 0u32..4, 0u32..4), 1..25),
        ) {
            let base_groups: Vec<Group> = shapes
                .iter()
                .enumerate()
                .map(|(i, (population, count, _))| group(&format!("G{i}"), *population, (*count).min(*population / 2)))
                .collect();
            let extension_groups: Vec<Group> = shapes
                .iter()
                .enumerate()
                .map(|(i, (population, _, count))| group(&format!("G{i}"), population + 5, (*count).min(*population / 2)))
                .collect();
            let mut s = stream(&label);
            let base = select_base(&base_groups, &mut s, DuplicateKeyPolicy::Reject).unwrap();
            let extended = select_extension(&extension_groups, &base, &mut s, DEFAULT_MAX_ATTEMPTS).unwrap();
            for choice in &extended {
                let taken = base.get(&choice.group.key).unwrap();
                prop_assert_eq!(choice.indices.len(), choice.group.required_count as usize);
                prop_assert!(choice.indices.iter().all(|i| !taken.contains(i)));
                prop_assert!(choice.indices.iter().all(|&i| i >= 1 && i <= choice.group.population_size));
            }
        }
    }
}
