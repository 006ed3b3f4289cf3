//! Task-by-asset value and profit matrix owning the current cycle's snapshots.

/// Raw grid helpers usable without a matrix.
pub mod grid;

use serde::{Deserialize, Serialize};

pub use grid::Grid;

use crate::{
    evaluator::Evaluator,
    model::{Asset, AssetKey, SimTime, Task, TaskId, TrackSnapshot},
};

/// Owns one cycle's tasks and assets plus the `values` and `profits` grids.
///
/// Both grids are always `tasks.len()` x `assets.len()`. Row and column removal keeps
/// the grids and the lists in lockstep. Indices are caller-checked.
#[derive(Debug, Clone, Default)]
pub struct Matrix {
    tasks: Vec<Task>,
    assets: Vec<Asset>,
    values: Grid,
    profits: Grid,
}

impl Matrix {
    /// Creates an empty matrix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a matrix from tasks and assets with zeroed grids.
    #[must_use]
    pub fn with(tasks: Vec<Task>, assets: Vec<Asset>) -> Self {
        let mut matrix = Self::new();
        matrix.set_tasks(tasks);
        matrix.set_assets(assets);
        matrix
    }

    /// Replaces the asset snapshots, dropping the previous set.
    pub fn set_assets(&mut self, assets: Vec<Asset>) {
        self.assets = assets;
        self.resize();
    }

    /// Replaces the task list. Growing zero-fills new rows, shrinking truncates.
    pub fn set_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        self.resize();
    }

    fn resize(&mut self) {
        let (rows, columns) = (self.tasks.len(), self.assets.len());
        grid::resize_grid(&mut self.values, rows, columns);
        grid::resize_grid(&mut self.profits, rows, columns);
    }

    /// Scores every (task, asset) cell with `evaluator`.
    ///
    /// The target track is resolved by name from `threats`, falling back to the task's
    /// track id; unresolved targets are evaluated with no track.
    pub fn update_evaluations(
        &mut self,
        time: SimTime,
        evaluator: &dyn Evaluator,
        threats: &[TrackSnapshot],
    ) {
        for (row, task) in self.tasks.iter().enumerate() {
            let track = find_track(task, threats);
            for (column, asset) in self.assets.iter().enumerate() {
                let value = evaluator.evaluate(time, task, asset, track);
                self.values[row][column] = value;
                self.profits[row][column] = value * task.priority;
            }
        }
    }

    /// Sets a cell directly, deriving its profit from the task priority.
    pub fn set_value(&mut self, task: usize, asset: usize, value: f64) {
        self.values[task][asset] = value;
        self.profits[task][asset] = value * self.tasks[task].priority;
    }

    /// Zeroes a cell in both grids.
    pub fn mask(&mut self, task: usize, asset: usize) {
        self.values[task][asset] = 0.0;
        self.profits[task][asset] = 0.0;
    }

    /// Removes a task row and hands the task back.
    pub fn remove_task(&mut self, task: usize) -> Task {
        grid::remove_row(&mut self.values, task);
        grid::remove_row(&mut self.profits, task);
        self.tasks.remove(task)
    }

    /// Removes an asset column and hands the asset back.
    pub fn remove_asset(&mut self, asset: usize) -> Asset {
        grid::remove_column(&mut self.values, asset);
        grid::remove_column(&mut self.profits, asset);
        self.assets.remove(asset)
    }

    /// Removes a task row and drops the task.
    pub fn erase_task(&mut self, task: usize) {
        drop(self.remove_task(task));
    }

    /// Removes an asset column and drops the asset.
    pub fn erase_asset(&mut self, asset: usize) {
        drop(self.remove_asset(asset));
    }

    /// Copies the selected rows and columns, in the given order, into a new matrix.
    #[must_use]
    pub fn subset(&self, task_rows: &[usize], asset_columns: &[usize]) -> Self {
        let tasks = task_rows.iter().map(|&row| self.tasks[row].clone()).collect();
        let assets = asset_columns
            .iter()
            .map(|&column| self.assets[column].clone())
            .collect();
        let pick = |grid: &Grid| -> Grid {
            task_rows
                .iter()
                .map(|&row| asset_columns.iter().map(|&column| grid[row][column]).collect())
                .collect()
        };
        Self {
            tasks,
            assets,
            values: pick(&self.values),
            profits: pick(&self.profits),
        }
    }

    /// Tasks in row order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Assets in column order.
    #[must_use]
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Raw evaluator scores.
    #[must_use]
    pub const fn values(&self) -> &Grid {
        &self.values
    }

    /// Scores multiplied by task priority.
    #[must_use]
    pub const fn profits(&self) -> &Grid {
        &self.profits
    }

    /// Raw score of one cell.
    #[must_use]
    pub fn value(&self, task: usize, asset: usize) -> f64 {
        self.values[task][asset]
    }

    /// Profit of one cell.
    #[must_use]
    pub fn profit(&self, task: usize, asset: usize) -> f64 {
        self.profits[task][asset]
    }

    /// Row of the task with `id`.
    #[must_use]
    pub fn task_index(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    /// Column of the asset with `key`.
    #[must_use]
    pub fn asset_index(&self, key: &AssetKey) -> Option<usize> {
        self.assets.iter().position(|asset| &asset.key() == key)
    }

    /// True when there is nothing to allocate.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() || self.assets.is_empty()
    }

    /// Serializable copy for diagnostics tooling.
    #[must_use]
    pub fn snapshot(&self) -> MatrixSnapshot {
        MatrixSnapshot {
            tasks: self.tasks.iter().map(|task| (task.id, task.label())).collect(),
            assets: self.assets.iter().map(Asset::key).collect(),
            values: self.values.clone(),
            profits: self.profits.clone(),
        }
    }
}

fn find_track<'a>(task: &Task, threats: &'a [TrackSnapshot]) -> Option<&'a TrackSnapshot> {
    let by_name = task.target.as_deref().and_then(|name| {
        threats
            .iter()
            .find(|track| track.target_name.as_deref() == Some(name))
    });
    by_name.or_else(|| {
        task.track_id
            .and_then(|id| threats.iter().find(|track| track.track_id == id))
    })
}

/// Matrix contents exposed to visualization and diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatrixSnapshot {
    /// Task ids and labels by row.
    pub tasks: Vec<(TaskId, String)>,
    /// Asset keys by column.
    pub assets: Vec<AssetKey>,
    /// Raw scores.
    pub values: Grid,
    /// Profits.
    pub profits: Grid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        evaluator::{DistanceEvaluator, SimpleEvaluator},
        model::{ResourceKind, TaskResource, Vec3},
    };

    fn task(name: &str, priority: f64) -> Task {
        Task::new(Some(name.into()), "WEAPON", TaskResource::of(ResourceKind::Weapon))
            .with_priority(priority)
    }

    fn asset(index: u64) -> Asset {
        Asset::new(index, format!("asset-{index}"), Vec3::new(index as f64 * 10.0, 0.0, 0.0))
    }

    fn assert_shape(matrix: &Matrix) {
        let expected = (matrix.tasks().len(), matrix.assets().len());
        let (rows, _) = grid::dimensions(matrix.values());
        assert_eq!(rows, expected.0);
        assert_eq!(matrix.profits().len(), expected.0);
        for row in matrix.values().iter().chain(matrix.profits()) {
            assert_eq!(row.len(), expected.1);
        }
    }

    #[test]
    fn grids_follow_every_resize() {
        let mut matrix = Matrix::new();
        assert_shape(&matrix);
        matrix.set_assets(vec![asset(1), asset(2), asset(3)]);
        assert_shape(&matrix);
        matrix.set_tasks(vec![task("a", 1.0), task("b", 1.0)]);
        assert_shape(&matrix);
        matrix.set_assets(vec![asset(1)]);
        assert_shape(&matrix);
        matrix.set_tasks(Vec::new());
        assert_shape(&matrix);
        matrix.set_tasks(vec![task("c", 1.0), task("d", 1.0), task("e", 1.0)]);
        assert_shape(&matrix);
    }

    #[test]
    fn profits_scale_by_priority() {
        let mut matrix = Matrix::with(vec![task("a", 1.0), task("b", 3.0)], vec![asset(1)]);
        matrix.update_evaluations(0.0, &SimpleEvaluator, &[]);
        assert_eq!(matrix.values(), &vec![vec![1.0], vec![1.0]]);
        assert_eq!(matrix.profits(), &vec![vec![1.0], vec![3.0]]);
    }

    #[test]
    fn evaluation_resolves_tracks_by_name() {
        let mut matrix = Matrix::with(vec![task("bandit", 1.0), task("ghost", 1.0)], vec![asset(0)]);
        let threats = [TrackSnapshot::located(7, "bandit", 0.0, Vec3::new(50.0, 0.0, 0.0))];
        matrix.update_evaluations(0.0, &DistanceEvaluator, &threats);
        assert!((matrix.value(0, 0) - 1.0 / 50.0).abs() < 1e-12);
        assert_eq!(matrix.value(1, 0), 0.0);
    }

    #[test]
    fn removal_keeps_lists_and_grids_in_lockstep() {
        let mut matrix = Matrix::with(
            vec![task("a", 1.0), task("b", 1.0)],
            vec![asset(1), asset(2), asset(3)],
        );
        matrix.set_value(1, 2, 4.0);
        let removed = matrix.remove_asset(0);
        assert_eq!(removed.platform.0, 1);
        matrix.erase_task(0);
        assert_shape(&matrix);
        assert_eq!(matrix.tasks()[0].target.as_deref(), Some("b"));
        assert_eq!(matrix.value(0, 1), 4.0);
    }

    #[test]
    fn subset_reorders_cells() {
        let mut matrix = Matrix::with(vec![task("a", 1.0), task("b", 2.0)], vec![asset(1), asset(2)]);
        matrix.set_value(0, 1, 5.0);
        matrix.set_value(1, 0, 3.0);
        let view = matrix.subset(&[1, 0], &[1]);
        assert_eq!(view.values(), &vec![vec![0.0], vec![5.0]]);
        assert_eq!(view.assets()[0].platform.0, 2);
    }
}
