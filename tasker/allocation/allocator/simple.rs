use crate::matrix::Matrix;

use super::{Allocation, AllocationBook, Allocator};

/// Pairs task `i` with asset `i` up to the shorter list, ignoring scores.
#[derive(Debug, Clone, Default)]
pub struct SimpleAllocator {
    book: AllocationBook,
}

impl Allocator for SimpleAllocator {
    fn name(&self) -> &str {
        "simple"
    }

    fn make_allocations(&mut self, matrix: &Matrix) -> Vec<Allocation> {
        let count = matrix.tasks().len().min(matrix.assets().len());
        let allocations: Vec<_> = (0..count)
            .map(|index| Allocation::new(matrix, index, index))
            .collect();
        self.book.rebuild(&allocations);
        allocations
    }

    fn book(&self) -> &AllocationBook {
        &self.book
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::fixtures;

    #[test]
    fn pairs_positionally_up_to_shorter_side() {
        let matrix = fixtures::matrix(&[&[0.0], &[0.0], &[0.0]], &[1.0, 1.0, 1.0]);
        let mut allocator = SimpleAllocator::default();
        let allocations = allocator.make_allocations(&matrix);
        assert_eq!(fixtures::pairs(&allocations), vec![(0, 0)]);
    }

    #[test]
    fn no_tasks_means_no_pairs() {
        let mut matrix = fixtures::matrix(&[&[1.0, 1.0, 1.0]], &[1.0]);
        matrix.set_tasks(Vec::new());
        let mut allocator = SimpleAllocator::default();
        assert!(allocator.make_allocations(&matrix).is_empty());
        assert!(allocator.book().is_empty());
    }
}
