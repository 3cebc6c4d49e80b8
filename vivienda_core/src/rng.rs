//! The single deterministic stream every sampling and shuffling call draws from.
//!
//! A run owns exactly one [`ChaChaStream`], built from the derived [`Seed`] and
//! handed by `&mut` to each stage in a fixed order: base groups in table order,
//! extension groups in table order, then one global shuffle. Reordering any of
//! those calls changes every later output.

use rand::seq::{SliceRandom, index};
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;

use crate::error::{Result, SelectionError};
use crate::seed::Seed;

/// Sampling contract the selection stages rely on.
pub trait SampleStream {
    /// Draws `count` distinct indices uniformly from `1..=range`.
    ///
    /// The returned order is the draw order and carries no meaning.
    fn sample(&mut self, range: u32, count: u32) -> Result<Vec<u32>>;

    /// Permutes `items` uniformly in place.
    fn shuffle<T>(&mut self, items: &mut [T]);
}

/// ChaCha20 keyed by the first 32 seed bytes, stream chosen by bytes 32..40.
#[derive(Clone, Debug)]
pub struct ChaChaStream {
    rng: ChaCha20Rng,
    samples: u64,
    shuffles: u64,
}

impl ChaChaStream {
    pub fn from_seed(seed: &Seed) -> Self {
        let bytes = seed.as_bytes();
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes[..32]);
        let mut stream_id = [0u8; 8];
        stream_id.copy_from_slice(&bytes[32..40]);
        let mut rng = ChaCha20Rng::from_seed(key);
        rng.set_stream(u64::from_le_bytes(stream_id));
        Self {
            rng,
            samples: 0,
            shuffles: 0,
        }
    }

    /// Number of `sample` calls served so far, rejected redraws included.
    pub fn samples_drawn(&self) -> u64 {
        self.samples
    }

    pub fn shuffles_applied(&self) -> u64 {
        self.shuffles
    }

    /// Position in the ChaCha keystream, in 32-bit words.
    pub fn word_pos(&self) -> u128 {
        self.rng.get_word_pos()
    }
}

impl SampleStream for ChaChaStream {
    fn sample(&mut self, range: u32, count: u32) -> Result<Vec<u32>> {
        if count > range {
            return Err(SelectionError::InvalidSample { range, count });
        }
        self.samples += 1;
        let drawn = index::sample(&mut self.rng, range as usize, count as usize);
        Ok(drawn.into_iter().map(|i| i as u32 + 1).collect())
    }

    fn shuffle<T>(&mut self, items: &mut [T]) {
        self.shuffles += 1;
        items.shuffle(&mut self.rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::derive_seed_from_bytes;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn stream(label: &[u8]) -> ChaChaStream {
        let seed = derive_seed_from_bytes(label, b"rng-tests").unwrap();
        ChaChaStream::from_seed(&seed)
    }

    #[test]
    fn same_seed_same_draws() {
        let mut a = stream(b"pulse");
        let mut b = stream(b"pulse");
        for range in [1u32, 5, 40, 1000] {
            assert_eq!(a.sample(range, range.min(3)).unwrap(), b.sample(range, range.min(3)).unwrap());
        }
        let mut left: Vec<u32> = (0..50).collect();
        let mut right = left.clone();
        a.shuffle(&mut left);
        b.shuffle(&mut right);
        assert_eq!(left, right);
        assert_eq!(a.word_pos(), b.word_pos());
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = stream(b"pulse-a");
        let mut b = stream(b"pulse-b");
        assert_ne!(a.sample(1_000_000, 8).unwrap(), b.sample(1_000_000, 8).unwrap());
    }

    #[test]
    fn call_order_matters() {
        let mut a = stream(b"order");
        let mut b = stream(b"order");
        let _ = a.sample(100, 2).unwrap();
        let first_a = a.sample(100, 2).unwrap();
        let first_b = b.sample(100, 2).unwrap();
        assert_ne!(first_a, first_b);
    }

    #[test]
    fn oversized_sample_rejected_without_consuming() {
        let mut a = stream(b"reject");
        let before = a.word_pos();
        let err = a.sample(3, 4).unwrap_err();
        assert!(matches!(err, SelectionError::InvalidSample { range: 3, count: 4 }));
        assert_eq!(a.word_pos(), before);
        assert_eq!(a.samples_drawn(), 0);
    }

    #[test]
    fn full_and_empty_samples() {
        let mut a = stream(b"edges");
        let mut full = a.sample(6, 6).unwrap();
        full.sort_unstable();
        assert_eq!(full, vec![1, 2, 3, 4, 5, 6]);
        assert!(a.sample(6, 0).unwrap().is_empty());
        assert!(a.sample(0, 0).unwrap().is_empty());
    }

    #[test]
    fn every_index_reachable() {
        let mut a = stream(b"coverage");
        let mut seen = HashSet::new();
        for _ in 0..400 {
            seen.extend(a.sample(10, 1).unwrap());
        }
        assert_eq!(seen.len(), 10);
        assert!(seen.iter().all(|&i| (1..=10).contains(&i)));
    }

    proptest! {
        #[test]
        fn samples_are_distinct_and_in_range(
            label in prop::collection::vec(any::<u8>(), 1..32),
            range in 1u32..2_000,
            fraction in 0.0f64..=1.0,
        ) {
            let count = ((range as f64) * fraction) as u32;
            let mut a = stream(&label);
            let drawn = a.sample(range, count).unwrap();
            prop_assert_eq!(drawn.len(), count as usize);
            let unique: HashSet<_> = drawn.iter().copied().collect();
            prop_assert_eq!(unique.len(), drawn.len());
            prop_assert!(drawn.iter().all(|&i| i >= 1 && i <= range));
        }

        #[test]
        fn shuffle_is_a_permutation(
            label in prop::collection::vec(any::<u8>(), 1..32),
            len in 0usize..300,
        ) {
            let mut a = stream(&label);
            let mut items: Vec<usize> = (0..len).collect();
            a.shuffle(&mut items);
            items.sort_unstable();
            prop_assert_eq!(items, (0..len).collect::<Vec<_>>());
        }
    }
}
