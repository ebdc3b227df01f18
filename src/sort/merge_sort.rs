//! Sort strategies over offset vectors

use std::cmp::Ordering;

use super::comparator::CompiledComparator;

/// Row count at which sorting switches from merge sort to an unstable sort
pub const STABLE_SORT_THRESHOLD: usize = 5_000;

/// Stable bottom-up merge sort using one scratch buffer
pub fn merge_sort<F>(items: &mut [usize], compare: F)
where
    F: Fn(usize, usize) -> Ordering,
{
    let size = items.len();
    if size < 2 {
        return;
    }

    let mut buffer = vec![0usize; size];
    let mut width = 1;

    while width < size {
        let mut start = 0;
        while start < size {
            let middle = (start + width).min(size);
            let end = (start + width * 2).min(size);
            let (mut left, mut right, mut write) = (start, middle, start);

            while left < middle && right < end {
                if compare(items[left], items[right]) != Ordering::Greater {
                    buffer[write] = items[left];
                    left += 1;
                } else {
                    buffer[write] = items[right];
                    right += 1;
                }
                write += 1;
            }

            let rest_left = middle - left;
            buffer[write..write + rest_left].copy_from_slice(&items[left..middle]);
            write += rest_left;
            buffer[write..write + (end - right)].copy_from_slice(&items[right..end]);

            start += width * 2;
        }

        items.copy_from_slice(&buffer);
        width *= 2;
    }
}

/// Sorts offsets with the strategy matching their count.
///
/// A comparator that is not a total order always goes through the merge
/// sort, which yields some permutation for any comparator; std sorts may
/// panic on such input.
pub fn sort_offsets(offsets: &mut [usize], comparator: &CompiledComparator) {
    if offsets.len() < STABLE_SORT_THRESHOLD || !comparator.is_total_order() {
        merge_sort(offsets, |a, b| comparator.compare(a, b));
    } else {
        offsets.sort_unstable_by(|&a, &b| comparator.compare(a, b));
    }
}
