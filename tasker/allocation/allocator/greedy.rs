//! Greedy allocation heuristics.
//!
//! Scans are task-major (outer loop over task rows, inner over asset columns) and a cell
//! only replaces the current best when strictly greater, so the first maximum found wins.
//! Only strictly positive cells are ever committed.

use crate::matrix::Matrix;

use super::{Allocation, AllocationBook, Allocator};

/// Each asset independently takes its highest-profit task; tasks may be shared.
#[derive(Debug, Clone, Default)]
pub struct GreedyIsolatedAllocator {
    book: AllocationBook,
}

impl Allocator for GreedyIsolatedAllocator {
    fn name(&self) -> &str {
        "greedy_isolated"
    }

    fn make_allocations(&mut self, matrix: &Matrix) -> Vec<Allocation> {
        let mut allocations = Vec::new();
        for asset in 0..matrix.assets().len() {
            let mut best: Option<(usize, f64)> = None;
            for task in 0..matrix.tasks().len() {
                let profit = matrix.profit(task, asset);
                if profit > best.map_or(0.0, |(_, p)| p) {
                    best = Some((task, profit));
                }
            }
            if let Some((task, _)) = best {
                allocations.push(Allocation::new(matrix, task, asset));
            }
        }
        self.book.rebuild(&allocations);
        allocations
    }

    fn book(&self) -> &AllocationBook {
        &self.book
    }
}

/// Tasks in descending priority each take the best remaining asset by raw value.
#[derive(Debug, Clone, Default)]
pub struct GreedyPriorityAllocator {
    book: AllocationBook,
}

impl Allocator for GreedyPriorityAllocator {
    fn name(&self) -> &str {
        "greedy_priority"
    }

    fn make_allocations(&mut self, matrix: &Matrix) -> Vec<Allocation> {
        let mut order: Vec<usize> = (0..matrix.tasks().len()).collect();
        // Stable: equal priorities keep row order.
        order.sort_by(|&a, &b| {
            matrix.tasks()[b]
                .priority
                .total_cmp(&matrix.tasks()[a].priority)
        });

        let mut taken = vec![false; matrix.assets().len()];
        let mut allocations = Vec::new();
        for task in order {
            let mut best: Option<(usize, f64)> = None;
            for (asset, _) in taken.iter().enumerate().filter(|(_, taken)| !**taken) {
                let value = matrix.value(task, asset);
                if value > best.map_or(0.0, |(_, v)| v) {
                    best = Some((asset, value));
                }
            }
            if let Some((asset, _)) = best {
                taken[asset] = true;
                allocations.push(Allocation::new(matrix, task, asset));
            }
        }
        self.book.rebuild(&allocations);
        allocations
    }

    fn book(&self) -> &AllocationBook {
        &self.book
    }
}

/// Repeatedly commits the global maximum-value cell, breaking value ties by priority.
#[derive(Debug, Clone, Default)]
pub struct GreedyValueAllocator {
    book: AllocationBook,
}

impl Allocator for GreedyValueAllocator {
    fn name(&self) -> &str {
        "greedy_value"
    }

    fn make_allocations(&mut self, matrix: &Matrix) -> Vec<Allocation> {
        let allocations = sweep(matrix, Matrix::value, true);
        self.book.rebuild(&allocations);
        allocations
    }

    fn book(&self) -> &AllocationBook {
        &self.book
    }
}

/// Repeatedly commits the global maximum-profit cell.
#[derive(Debug, Clone, Default)]
pub struct GreedyProfitAllocator {
    book: AllocationBook,
}

impl Allocator for GreedyProfitAllocator {
    fn name(&self) -> &str {
        "greedy_profit"
    }

    fn make_allocations(&mut self, matrix: &Matrix) -> Vec<Allocation> {
        let allocations = sweep(matrix, Matrix::profit, false);
        self.book.rebuild(&allocations);
        allocations
    }

    fn book(&self) -> &AllocationBook {
        &self.book
    }
}

/// Commits the best remaining cell, then removes its row and column, until no positive
/// cell is left. Works on a copy; `rows`/`columns` map the shrinking copy back to `matrix`.
#[allow(clippy::float_cmp)]
fn sweep(matrix: &Matrix, score: fn(&Matrix, usize, usize) -> f64, prefer_priority: bool) -> Vec<Allocation> {
    let mut work = matrix.clone();
    let mut rows: Vec<usize> = (0..matrix.tasks().len()).collect();
    let mut columns: Vec<usize> = (0..matrix.assets().len()).collect();
    let mut allocations = Vec::new();

    loop {
        let mut best: Option<(usize, usize, f64)> = None;
        for task in 0..work.tasks().len() {
            for asset in 0..work.assets().len() {
                let cell = score(&work, task, asset);
                if cell <= 0.0 {
                    continue;
                }
                let better = match best {
                    None => true,
                    Some((best_task, _, best_cell)) => {
                        cell > best_cell
                            || (prefer_priority
                                && cell == best_cell
                                && work.tasks()[task].priority > work.tasks()[best_task].priority)
                    }
                };
                if better {
                    best = Some((task, asset, cell));
                }
            }
        }
        let Some((task, asset, _)) = best else {
            break;
        };
        allocations.push(Allocation::new(matrix, rows[task], columns[asset]));
        work.erase_task(task);
        work.erase_asset(asset);
        rows.remove(task);
        columns.remove(asset);
    }
    allocations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::fixtures::{matrix, pairs};

    #[test]
    fn greedy_value_takes_non_conflicting_maxima() {
        let matrix = matrix(&[&[5.0, 1.0], &[1.0, 5.0]], &[1.0, 1.0]);
        let mut allocator = GreedyValueAllocator::default();
        let allocations = allocator.make_allocations(&matrix);
        assert_eq!(pairs(&allocations), vec![(0, 0), (1, 1)]);
        assert!(!pairs(&allocations).contains(&(0, 1)));
    }

    #[test]
    fn greedy_value_breaks_ties_by_priority() {
        let matrix = matrix(&[&[3.0], &[3.0]], &[1.0, 2.0]);
        let allocations = GreedyValueAllocator::default().make_allocations(&matrix);
        assert_eq!(pairs(&allocations), vec![(1, 0)]);
    }

    #[test]
    fn greedy_profit_scans_profits() {
        // Values favour task 0, profits favour task 1.
        let matrix = matrix(&[&[4.0], &[3.0]], &[1.0, 2.0]);
        let mut allocator = GreedyProfitAllocator::default();
        let allocations = allocator.make_allocations(&matrix);
        assert_eq!(pairs(&allocations), vec![(1, 0)]);
        assert_eq!(
            allocator.allocation_for(&matrix.assets()[0].key()),
            Some(matrix.tasks()[1].id)
        );
    }

    #[test]
    fn greedy_profit_first_found_wins_ties() {
        let matrix = matrix(&[&[2.0, 2.0], &[2.0, 2.0]], &[1.0, 1.0]);
        let allocations = GreedyProfitAllocator::default().make_allocations(&matrix);
        assert_eq!(allocations[0].task, 0);
        assert_eq!(allocations[0].asset, 0);
        assert_eq!(pairs(&allocations), vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn sweeps_stop_at_non_positive_cells() {
        let matrix = matrix(&[&[0.0, -1.0], &[2.0, 0.0]], &[1.0, 1.0]);
        let allocations = GreedyValueAllocator::default().make_allocations(&matrix);
        assert_eq!(pairs(&allocations), vec![(1, 0)]);
    }

    #[test]
    fn greedy_isolated_lets_assets_share_tasks() {
        let matrix = matrix(&[&[3.0, 3.0, 0.0], &[1.0, 1.0, 0.0]], &[1.0, 1.0]);
        let mut allocator = GreedyIsolatedAllocator::default();
        let allocations = allocator.make_allocations(&matrix);
        assert_eq!(pairs(&allocations), vec![(0, 0), (0, 1)]);
        assert_eq!(allocator.allocated_to(matrix.tasks()[0].id).len(), 2);
    }

    #[test]
    fn greedy_priority_serves_urgent_tasks_first() {
        // Both tasks prefer asset 0; the higher-priority task 1 gets it.
        let matrix = matrix(&[&[5.0, 1.0], &[4.0, 0.0]], &[1.0, 3.0]);
        let allocations = GreedyPriorityAllocator::default().make_allocations(&matrix);
        assert_eq!(pairs(&allocations), vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn greedy_priority_leaves_tasks_without_assets() {
        let matrix = matrix(&[&[5.0], &[4.0], &[3.0]], &[1.0, 1.0, 1.0]);
        let allocations = GreedyPriorityAllocator::default().make_allocations(&matrix);
        assert_eq!(pairs(&allocations), vec![(0, 0)]);
    }
}
