//! Dense row-major matrices
//!
//! A [`Matrix`] is one contiguous `Vec<f64>` plus its dimensions. Element
//! `(row, col)` lives at flattened index `row * cols + col`.
//!
//! # Example
//!
//! ```
//! use tormenta::Matrix;
//!
//! let m = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
//! assert_eq!(m.shape(), (2, 3));
//! assert_eq!(m.get(1, 0), Some(&4.0));
//! assert_eq!(m.row(1), &[4.0, 5.0, 6.0]);
//! ```

use std::fmt;

use crate::error::{Result, TormentaError};
use crate::store::Lease;

/// A 2D matrix of `f64` with row-major storage
///
/// Dimensions are fixed at creation. Matrices allocated through a
/// [`MatrixStore`](crate::store::MatrixStore) carry a lease that returns the
/// storage to the store's ledger when the matrix is dropped; matrices built
/// with [`Matrix::from_vec`] and friends are untracked.
///
/// # Storage Layout
///
/// For a 2x3 matrix:
/// ```text
/// [[a, b, c],
///  [d, e, f]]
/// ```
/// Data is stored as: [a, b, c, d, e, f]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
    lease: Option<Lease>,
}

impl Matrix {
    /// Creates an untracked matrix from row-major data
    ///
    /// # Errors
    ///
    /// Returns `Format` if `data.len() != rows * cols`
    ///
    /// # Example
    ///
    /// ```
    /// use tormenta::Matrix;
    ///
    /// let m = Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    /// assert_eq!(m.get(1, 1), Some(&4.0));
    /// assert!(Matrix::from_vec(2, 2, vec![1.0]).is_err());
    /// ```
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(TormentaError::Format(format!(
                "Data length {} does not match matrix dimensions {}x{}",
                data.len(),
                rows,
                cols
            )));
        }
        Ok(Matrix {
            rows,
            cols,
            data,
            lease: None,
        })
    }

    /// Creates an untracked matrix from a list of equally long rows
    ///
    /// # Errors
    ///
    /// Returns `Format` if the rows are ragged
    ///
    /// # Example
    ///
    /// ```
    /// use tormenta::Matrix;
    ///
    /// let m = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
    /// assert_eq!(m.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    /// ```
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != cols) {
            return Err(TormentaError::Format(format!(
                "Row {} has {} values, expected {}",
                i,
                row.len(),
                cols
            )));
        }
        Self::from_vec(rows.len(), cols, rows.concat())
    }

    /// Creates an untracked matrix filled with zeros
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Matrix {
            rows,
            cols,
            data: vec![0.0; rows * cols],
            lease: None,
        }
    }

    /// Wraps store-reserved storage together with its ledger lease
    pub(crate) fn leased(rows: usize, cols: usize, data: Vec<f64>, lease: Lease) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        Matrix {
            rows,
            cols,
            data,
            lease: Some(lease),
        }
    }

    /// Returns the number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns the shape as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the matrix has no cells
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true if the storage is accounted for by a store ledger
    pub fn is_tracked(&self) -> bool {
        self.lease.is_some()
    }

    /// Label the owning store gave this matrix, if tracked
    pub fn label(&self) -> Option<&str> {
        self.lease.as_ref().map(Lease::label)
    }

    /// Flattened row-major index of `(row, col)`
    #[inline]
    pub fn flat_index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// Gets a reference to an element at (row, col)
    ///
    /// Returns `None` if indices are out of bounds
    pub fn get(&self, row: usize, col: usize) -> Option<&f64> {
        if row >= self.rows || col >= self.cols {
            None
        } else {
            self.data.get(self.flat_index(row, col))
        }
    }

    /// Gets a mutable reference to an element at (row, col)
    ///
    /// Returns `None` if indices are out of bounds
    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut f64> {
        if row >= self.rows || col >= self.cols {
            None
        } else {
            let idx = self.flat_index(row, col);
            self.data.get_mut(idx)
        }
    }

    /// Row `row` as a contiguous slice
    ///
    /// # Panics
    ///
    /// Panics if `row >= self.rows()`
    #[inline]
    pub fn row(&self, row: usize) -> &[f64] {
        let start = row * self.cols;
        &self.data[start..start + self.cols]
    }

    /// Iterates over column `col` from top to bottom
    #[inline]
    pub fn column(&self, col: usize) -> impl Iterator<Item = &f64> + '_ {
        self.data.iter().skip(col).step_by(self.cols.max(1))
    }

    /// Returns a reference to the underlying data
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Sum of all entries, computed sequentially
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Frobenius norm `sqrt(Σ x²)`, computed sequentially
    pub fn frobenius_norm(&self) -> f64 {
        self.data.iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    /// Single-threaded reference product `C = A × B`
    ///
    /// This is the textbook triple loop; the parallel engine is checked
    /// against it.
    ///
    /// # Errors
    ///
    /// Returns `Dimension` if `self.cols() != other.rows()`
    ///
    /// # Example
    ///
    /// ```
    /// use tormenta::Matrix;
    ///
    /// let a = Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    /// let b = Matrix::from_vec(2, 2, vec![5.0, 6.0, 7.0, 8.0]).unwrap();
    /// let c = a.matmul_sequential(&b).unwrap();
    /// assert_eq!(c.as_slice(), &[19.0, 22.0, 43.0, 50.0]);
    /// ```
    pub fn matmul_sequential(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols != other.rows {
            return Err(TormentaError::Dimension {
                a_rows: self.rows,
                a_cols: self.cols,
                b_rows: other.rows,
                b_cols: other.cols,
            });
        }

        let mut result = Matrix::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            for j in 0..other.cols {
                let mut sum = 0.0;
                for k in 0..self.cols {
                    sum += self.data[i * self.cols + k] * other.data[k * other.cols + j];
                }
                result.data[i * other.cols + j] = sum;
            }
        }
        Ok(result)
    }
}

impl Clone for Matrix {
    /// Clones the values; the copy is untracked
    fn clone(&self) -> Self {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.clone(),
            lease: None,
        }
    }
}

impl PartialEq for Matrix {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows && self.cols == other.cols && self.data == other.data
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matrix")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("label", &self.label())
            .field("data", &self.data)
            .finish()
    }
}
