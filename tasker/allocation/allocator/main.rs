//! Allocation algorithms turning a scored matrix into (asset, task) commitments.

/// Greedy heuristics.
pub mod greedy;
/// Maximum-weight bipartite assignment solver.
pub mod munkres;
/// Optimal-profit allocator.
pub mod optimal;
/// Script-backed allocator.
pub mod script;
/// Positional baseline allocator.
pub mod simple;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use greedy::{GreedyIsolatedAllocator, GreedyPriorityAllocator, GreedyProfitAllocator, GreedyValueAllocator};
pub use optimal::OptimalProfitAllocator;
pub use script::ScriptAllocator;
pub use simple::SimpleAllocator;

use crate::{
    matrix::Matrix,
    model::{AssetKey, TaskId},
};

/// One committed pairing. Indices refer to the matrix passed to the allocator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Task row.
    pub task: usize,
    /// Asset column.
    pub asset: usize,
    /// Task identity.
    pub task_id: TaskId,
    /// Asset identity.
    pub asset_key: AssetKey,
}

impl Allocation {
    /// Pairs row `task` with column `asset` of `matrix`.
    #[must_use]
    pub fn new(matrix: &Matrix, task: usize, asset: usize) -> Self {
        Self {
            task,
            asset,
            task_id: matrix.tasks()[task].id,
            asset_key: matrix.assets()[asset].key(),
        }
    }
}

/// Asset-to-task and task-to-assets lookups over the last allocation run.
#[derive(Debug, Clone, Default)]
pub struct AllocationBook {
    by_asset: IndexMap<AssetKey, TaskId>,
    by_task: IndexMap<TaskId, Vec<AssetKey>>,
}

impl AllocationBook {
    /// Forgets the previous run.
    pub fn clear(&mut self) {
        self.by_asset.clear();
        self.by_task.clear();
    }

    /// Records a pairing.
    pub fn record(&mut self, allocation: &Allocation) {
        self.by_asset
            .insert(allocation.asset_key.clone(), allocation.task_id);
        let assets = self.by_task.entry(allocation.task_id).or_default();
        if !assets.contains(&allocation.asset_key) {
            assets.push(allocation.asset_key.clone());
        }
    }

    /// Replaces the contents with `allocations`.
    pub fn rebuild(&mut self, allocations: &[Allocation]) {
        self.clear();
        for allocation in allocations {
            self.record(allocation);
        }
    }

    /// Task allocated to `asset`.
    #[must_use]
    pub fn allocation_for(&self, asset: &AssetKey) -> Option<TaskId> {
        self.by_asset.get(asset).copied()
    }

    /// Assets allocated to `task`.
    #[must_use]
    pub fn allocated_to(&self, task: TaskId) -> &[AssetKey] {
        self.by_task.get(&task).map_or(&[], Vec::as_slice)
    }

    /// Number of assets holding a task.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_asset.len()
    }

    /// True when nothing was allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_asset.is_empty()
    }
}

/// Allocation strategy.
///
/// Implementations clear their book at the start of every run and record each pairing
/// they return, so the lookups reflect the latest call.
pub trait Allocator: Send + Sync {
    /// Registry name.
    fn name(&self) -> &str;

    /// Produces commitments for `matrix`.
    fn make_allocations(&mut self, matrix: &Matrix) -> Vec<Allocation>;

    /// Lookups over the last run.
    fn book(&self) -> &AllocationBook;

    /// Task allocated to `asset` in the last run.
    fn allocation_for(&self, asset: &AssetKey) -> Option<TaskId> {
        self.book().allocation_for(asset)
    }

    /// Assets allocated to `task` in the last run.
    fn allocated_to(&self, task: TaskId) -> &[AssetKey] {
        self.book().allocated_to(task)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::{
        matrix::Matrix,
        model::{Asset, ResourceKind, Task, TaskResource, Vec3},
    };

    /// Matrix with one task per row of `values`, priorities as given, and raw values set.
    pub fn matrix(values: &[&[f64]], priorities: &[f64]) -> Matrix {
        let tasks = priorities
            .iter()
            .enumerate()
            .map(|(row, priority)| {
                Task::new(
                    Some(format!("target-{row}")),
                    "WEAPON",
                    TaskResource::of(ResourceKind::Weapon),
                )
                .with_priority(*priority)
            })
            .collect();
        let columns = values.first().map_or(0, |row| row.len());
        let assets = (0..columns)
            .map(|column| Asset::new(column as u64, format!("asset-{column}"), Vec3::ZERO))
            .collect();
        let mut matrix = Matrix::with(tasks, assets);
        for (row, cells) in values.iter().enumerate() {
            for (column, value) in cells.iter().enumerate() {
                matrix.set_value(row, column, *value);
            }
        }
        matrix
    }

    /// (task row, asset column) pairs, sorted.
    pub fn pairs(allocations: &[super::Allocation]) -> Vec<(usize, usize)> {
        let mut pairs: Vec<_> = allocations.iter().map(|a| (a.task, a.asset)).collect();
        pairs.sort_unstable();
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_tracks_both_directions() {
        let matrix = fixtures::matrix(&[&[1.0, 1.0]], &[1.0]);
        let mut book = AllocationBook::default();
        book.rebuild(&[Allocation::new(&matrix, 0, 0), Allocation::new(&matrix, 0, 1)]);
        let task = matrix.tasks()[0].id;
        assert_eq!(book.allocated_to(task).len(), 2);
        assert_eq!(book.allocation_for(&matrix.assets()[1].key()), Some(task));
        book.clear();
        assert!(book.is_empty());
    }
}
