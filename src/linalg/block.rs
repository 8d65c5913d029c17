//! Block matrix assembly.
//!
//! Builds one matrix out of a rectangular grid of sub-matrices. All blocks in a
//! grid row must share a height and every grid row must add up to the same
//! total width; blocks may be empty (zero rows or zero columns), which is how
//! problems without equality or inequality constraints flow through the KKT
//! assembly.

use crate::E;
use crate::error::{Result, SolverError};
use crate::linalg::matrix::Matrix;

/// Assembles `layout` into a single matrix.
///
/// ```
/// use nlip::linalg::{block::block, matrix::Matrix};
///
/// let eye = Matrix::identity(2);
/// let zero = Matrix::zeros(2, 1);
/// let m = block(&[vec![&eye, &zero]]).unwrap();
/// assert_eq!(m.shape(), (2, 3));
/// ```
pub fn block(layout: &[Vec<&Matrix>]) -> Result<Matrix> {
    let Some(first_row) = layout.first() else {
        return Err(SolverError::mismatch("block", (0, 0), (0, 0)));
    };

    let row_heights: Vec<usize> = layout
        .iter()
        .map(|row| row.first().map_or(0, |m| m.nrows()))
        .collect();
    let total_cols: usize = first_row.iter().map(|m| m.ncols()).sum();

    for (r, row) in layout.iter().enumerate() {
        let width: usize = row.iter().map(|m| m.ncols()).sum();
        if width != total_cols {
            return Err(SolverError::mismatch(
                "block",
                (row_heights[r], width),
                (row_heights[r], total_cols),
            ));
        }
        if let Some(m) = row.iter().find(|m| m.nrows() != row_heights[r]) {
            return Err(SolverError::mismatch(
                "block",
                m.shape(),
                (row_heights[r], m.ncols()),
            ));
        }
    }

    let total_rows: usize = row_heights.iter().sum();
    let mut out: Vec<E> = vec![0.; total_rows * total_cols];

    let mut row_offset = 0;
    for (row, height) in layout.iter().zip(&row_heights) {
        let mut col_offset = 0;
        for m in row {
            let cols = m.ncols();
            for r in 0..m.nrows() {
                let dest = (row_offset + r) * total_cols + col_offset;
                out[dest..dest + cols].copy_from_slice(&m.data()[r * cols..(r + 1) * cols]);
            }
            col_offset += cols;
        }
        row_offset += height;
    }

    Matrix::new(total_rows, total_cols, out)
}
