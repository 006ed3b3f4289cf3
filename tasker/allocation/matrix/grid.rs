//! Row/column helpers over raw task-by-asset grids.
//!
//! Indices are caller-checked; out-of-range access panics.

/// Dense grid indexed `[task][asset]`.
pub type Grid = Vec<Vec<f64>>;

/// Resizes to `rows` x `columns`, keeping existing cells and zero-filling new ones.
pub fn resize_grid(grid: &mut Grid, rows: usize, columns: usize) {
    grid.resize_with(rows, Vec::new);
    for row in grid.iter_mut() {
        row.resize(columns, 0.0);
    }
}

/// Overwrites every cell of row `row` with `value`.
pub fn set_row(grid: &mut Grid, row: usize, value: f64) {
    grid[row].fill(value);
}

/// Overwrites every cell of column `column` with `value`.
pub fn set_column(grid: &mut Grid, column: usize, value: f64) {
    for row in grid.iter_mut() {
        row[column] = value;
    }
}

/// Removes row `row`.
pub fn remove_row(grid: &mut Grid, row: usize) {
    grid.remove(row);
}

/// Removes column `column` from every row.
pub fn remove_column(grid: &mut Grid, column: usize) {
    for row in grid.iter_mut() {
        row.remove(column);
    }
}

/// Row and column counts. A grid with no rows reports zero columns.
#[must_use]
pub fn dimensions(grid: &Grid) -> (usize, usize) {
    (grid.len(), grid.first().map_or(0, Vec::len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_keeps_existing_cells() {
        let mut grid = vec![vec![1.0, 2.0]];
        resize_grid(&mut grid, 2, 3);
        assert_eq!(grid, vec![vec![1.0, 2.0, 0.0], vec![0.0, 0.0, 0.0]]);
        resize_grid(&mut grid, 1, 1);
        assert_eq!(grid, vec![vec![1.0]]);
    }

    #[test]
    fn row_and_column_helpers() {
        let mut grid = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        set_column(&mut grid, 0, 9.0);
        set_row(&mut grid, 1, 5.0);
        assert_eq!(grid, vec![vec![9.0, 2.0], vec![5.0, 5.0]]);
        remove_column(&mut grid, 1);
        remove_row(&mut grid, 0);
        assert_eq!(grid, vec![vec![5.0]]);
        assert_eq!(dimensions(&grid), (1, 1));
    }
}
