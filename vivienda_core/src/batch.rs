//! Splitting the shuffled sequence into output files.
//!
//! Batch `i` of `n` over `len` records spans
//! `floor(i * len / n)..floor((i + 1) * len / n)`, so sizes differ by at most
//! one and the batches tile the sequence in order.

use std::ops::Range;

use crate::error::{Result, SelectionError};

pub fn batch_bounds(len: usize, file_count: usize) -> Result<Vec<Range<usize>>> {
    if file_count == 0 {
        return Err(SelectionError::InvalidPartitionCount(file_count));
    }
    let boundary = |i: usize| ((i as u128 * len as u128) / file_count as u128) as usize;
    Ok((0..file_count)
        .map(|i| boundary(i)..boundary(i + 1))
        .collect())
}

pub fn partition<T>(sequence: &[T], file_count: usize) -> Result<Vec<&[T]>> {
    Ok(batch_bounds(sequence.len(), file_count)?
        .into_iter()
        .map(|range| &sequence[range])
        .collect())
}
