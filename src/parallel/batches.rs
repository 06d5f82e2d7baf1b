//! Splitting the input listing into fixed-size batches

use std::path::PathBuf;

/// Number of batches needed for `files` files, `ceil(files / batch_size)`
pub fn batch_count(files: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        return 0;
    }
    files.div_ceil(batch_size)
}

/// Partition files into consecutive batches of `batch_size`.
///
/// Every batch is full except possibly the last. Order is preserved.
pub fn plan_batches(files: &[PathBuf], batch_size: usize) -> Vec<&[PathBuf]> {
    if batch_size == 0 {
        return Vec::new();
    }
    files.chunks(batch_size).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(count: usize) -> Vec<PathBuf> {
        (0..count).map(|i| PathBuf::from(format!("img{:03}.png", i))).collect()
    }

    #[test]
    fn test_batch_count() {
        assert_eq!(batch_count(0, 5), 0);
        assert_eq!(batch_count(5, 5), 1);
        assert_eq!(batch_count(6, 5), 2);
        assert_eq!(batch_count(31, 30), 2);
    }

    #[test]
    fn test_batches_are_full_except_last() {
        for (count, size) in [(12, 5), (10, 5), (1, 30), (7, 1)] {
            let files = paths(count);
            let batches = plan_batches(&files, size);

            assert_eq!(batches.len(), batch_count(count, size));
            let (last, full) = batches.split_last().unwrap();
            assert!(full.iter().all(|batch| batch.len() == size));
            assert!(!last.is_empty() && last.len() <= size);
        }
    }

    #[test]
    fn test_order_is_preserved() {
        let files = paths(7);
        let flattened: Vec<PathBuf> = plan_batches(&files, 3).concat();
        assert_eq!(flattened, files);
    }

    #[test]
    fn test_empty_input() {
        assert!(plan_batches(&[], 5).is_empty());
        assert!(plan_batches(&paths(3), 0).is_empty());
    }
}
