//! Candidate partitioning.

use snapfind_core::CandidatePhoto;

/// Split candidates into consecutive batches of `batch_size`, keeping order.
///
/// The last batch may be smaller. A `batch_size` of zero is treated as one.
pub fn partition(candidates: &[CandidatePhoto], batch_size: usize) -> Vec<&[CandidatePhoto]> {
    candidates.chunks(batch_size.max(1)).collect()
}

/// Number of batches `partition` produces: ⌈len / batch_size⌉.
pub fn batch_count(len: usize, batch_size: usize) -> usize {
    len.div_ceil(batch_size.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photos(n: usize) -> Vec<CandidatePhoto> {
        (0..n)
            .map(|i| CandidatePhoto::new(format!("id_{}", i), format!("https://cdn/{}.jpg", i)))
            .collect()
    }

    #[test]
    fn test_partition_counts_and_reassembles() {
        for len in [0usize, 1, 9, 10, 11, 20, 25, 99, 100, 101] {
            let input = photos(len);
            let batches = partition(&input, 10);

            assert_eq!(batches.len(), batch_count(len, 10), "len {}", len);
            assert_eq!(batches.len(), (len + 9) / 10, "len {}", len);
            assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= 10));

            let rejoined: Vec<CandidatePhoto> = batches.concat();
            assert_eq!(rejoined, input, "len {}", len);
        }
    }

    #[test]
    fn test_last_batch_may_be_smaller() {
        let input = photos(25);
        let sizes: Vec<usize> = partition(&input, 10).iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
    }

    #[test]
    fn test_empty_input_has_no_batches() {
        assert!(partition(&[], 10).is_empty());
        assert_eq!(batch_count(0, 10), 0);
    }

    #[test]
    fn test_zero_batch_size_is_treated_as_one() {
        let input = photos(3);
        assert_eq!(partition(&input, 0).len(), 3);
        assert_eq!(batch_count(3, 0), 3);
    }
}
