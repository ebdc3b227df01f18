//! Combining per-shard offset lists

use std::cmp::Ordering;

use crate::sort::CompiledComparator;

/// Filter-only results: shards are contiguous, so concatenation in shard
/// order is store order.
pub fn concat_chunks(chunks: Vec<Vec<usize>>) -> Vec<usize> {
    chunks.concat()
}

/// K-way merge of shard lists each already sorted by `comparator`.
///
/// At every step the smallest head wins; the comparator's offset tie-break
/// makes the result identical to sorting the union directly.
pub fn merge_sorted_chunks(chunks: Vec<Vec<usize>>, comparator: &CompiledComparator) -> Vec<usize> {
    let total = chunks.iter().map(Vec::len).sum();
    let mut output = Vec::with_capacity(total);
    let mut heads = vec![0usize; chunks.len()];

    // linear scan over heads; shard counts are small
    while output.len() < total {
        let mut best: Option<(usize, usize)> = None;

        for (shard, chunk) in chunks.iter().enumerate() {
            let Some(&candidate) = chunk.get(heads[shard]) else {
                continue;
            };
            let better = match best {
                None => true,
                Some((_, current)) => comparator.compare(candidate, current) == Ordering::Less,
            };
            if better {
                best = Some((shard, candidate));
            }
        }

        match best {
            Some((shard, offset)) => {
                output.push(offset);
                heads[shard] += 1;
            }
            None => break,
        }
    }

    output
}
