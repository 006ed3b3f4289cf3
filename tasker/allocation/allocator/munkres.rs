//! Maximum-weight bipartite assignment (Hungarian method with potentials).
//!
//! Rectangular inputs are padded to a square with zero-weight cells, so every real row is
//! assigned to some column whenever there are at least as many columns as rows, even when
//! the weight of that cell is zero or negative. Callers filter those out.

use crate::matrix::grid::{self, Grid};

/// Assigns each row of `weights` to a distinct column maximizing the total weight.
///
/// Returns, per row, the chosen column, or `None` when the row landed on padding.
/// Non-finite weights are treated as zero.
#[must_use]
pub fn maximize(weights: &Grid) -> Vec<Option<usize>> {
    let (rows, columns) = grid::dimensions(weights);
    if rows == 0 || columns == 0 {
        return vec![None; rows];
    }
    let size = rows.max(columns);
    let weight = |row: usize, column: usize| -> f64 {
        if row < rows && column < columns {
            let cell = weights[row][column];
            if cell.is_finite() {
                cell
            } else {
                0.0
            }
        } else {
            0.0
        }
    };
    let ceiling = (0..size)
        .flat_map(|row| (0..size).map(move |column| (row, column)))
        .map(|(row, column)| weight(row, column))
        .fold(0.0_f64, f64::max);
    let cost: Grid = (0..size)
        .map(|row| (0..size).map(|column| ceiling - weight(row, column)).collect())
        .collect();

    minimize_square(&cost)
        .into_iter()
        .take(rows)
        .map(|column| (column < columns).then_some(column))
        .collect()
}

/// Minimum-cost perfect matching on a square cost grid; returns the column of every row.
fn minimize_square(cost: &Grid) -> Vec<usize> {
    let n = cost.len();
    // 1-based potentials and matching; index 0 is the virtual source column.
    let mut u = vec![0.0_f64; n + 1];
    let mut v = vec![0.0_f64; n + 1];
    let mut matched_row = vec![0_usize; n + 1];
    let mut way = vec![0_usize; n + 1];

    for row in 1..=n {
        matched_row[0] = row;
        let mut column = 0;
        let mut min_slack = vec![f64::INFINITY; n + 1];
        let mut used = vec![false; n + 1];
        loop {
            used[column] = true;
            let current_row = matched_row[column];
            let mut delta = f64::INFINITY;
            let mut next_column = 0;
            for candidate in 1..=n {
                if used[candidate] {
                    continue;
                }
                let slack = cost[current_row - 1][candidate - 1] - u[current_row] - v[candidate];
                if slack < min_slack[candidate] {
                    min_slack[candidate] = slack;
                    way[candidate] = column;
                }
                if min_slack[candidate] < delta {
                    delta = min_slack[candidate];
                    next_column = candidate;
                }
            }
            for candidate in 0..=n {
                if used[candidate] {
                    u[matched_row[candidate]] += delta;
                    v[candidate] -= delta;
                } else {
                    min_slack[candidate] -= delta;
                }
            }
            column = next_column;
            if matched_row[column] == 0 {
                break;
            }
        }
        // Augment along the alternating path back to the source.
        loop {
            let previous = way[column];
            matched_row[column] = matched_row[previous];
            column = previous;
            if column == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![0; n];
    for column in 1..=n {
        if matched_row[column] != 0 {
            assignment[matched_row[column] - 1] = column - 1;
        }
    }
    assignment
}
