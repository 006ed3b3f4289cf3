use crate::matrix::Matrix;

use super::{munkres, Allocation, AllocationBook, Allocator};

/// Maximum-total-profit assignment over the whole profit grid.
///
/// The solver may pair rows with zero or negative cells; only strictly positive profits
/// are committed.
#[derive(Debug, Clone, Default)]
pub struct OptimalProfitAllocator {
    book: AllocationBook,
}

impl Allocator for OptimalProfitAllocator {
    fn name(&self) -> &str {
        "optimal_profit"
    }

    fn make_allocations(&mut self, matrix: &Matrix) -> Vec<Allocation> {
        let allocations: Vec<_> = munkres::maximize(matrix.profits())
            .into_iter()
            .enumerate()
            .filter_map(|(task, asset)| asset.map(|asset| (task, asset)))
            .filter(|&(task, asset)| matrix.profit(task, asset) > 0.0)
            .map(|(task, asset)| Allocation::new(matrix, task, asset))
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
    use crate::allocator::fixtures::{matrix, pairs};

    #[test]
    fn maximizes_total_profit() {
        let matrix = matrix(&[&[10.0, 9.0], &[8.0, 1.0]], &[1.0, 1.0]);
        let allocations = OptimalProfitAllocator::default().make_allocations(&matrix);
        assert_eq!(pairs(&allocations), vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn forced_non_positive_pairs_are_dropped() {
        // The solver must place task 1 somewhere; its best total puts it on a zero cell.
        let matrix = matrix(&[&[5.0, 4.0], &[0.0, -2.0]], &[1.0, 1.0]);
        let mut allocator = OptimalProfitAllocator::default();
        let allocations = allocator.make_allocations(&matrix);
        assert_eq!(pairs(&allocations), vec![(0, 1)]);
        assert!(allocations.iter().all(|a| matrix.profit(a.task, a.asset) > 0.0));
        assert!(allocator.allocated_to(matrix.tasks()[1].id).is_empty());
    }

    #[test]
    fn priority_shifts_the_optimum() {
        let matrix = matrix(&[&[2.0], &[1.5]], &[1.0, 2.0]);
        let allocations = OptimalProfitAllocator::default().make_allocations(&matrix);
        assert_eq!(pairs(&allocations), vec![(1, 0)]);
    }
}
