//! Rendering of results and matrices
//!
//! - [`render_report`]: the human-readable report printed by the CLI
//! - [`ReportSummary`]: the same information as JSON
//! - [`write_matrix`]: a matrix in the text format [`MatrixStore`] reads
//!
//! [`MatrixStore`]: crate::store::MatrixStore
//!
//! # Example
//!
//! ```
//! use tormenta::format::render_matrix;
//! use tormenta::Matrix;
//!
//! let m = Matrix::from_vec(2, 2, vec![19.0, 22.0, 43.0, 50.0]).unwrap();
//! assert_eq!(render_matrix(&m), "[19.000000 22.000000]\n[43.000000 50.000000]\n");
//! ```

use std::io::{self, Write};

use serde::Serialize;

use crate::engine::Product;
use crate::matrix::Matrix;

/// Each row bracketed, values space-separated with six decimals
pub fn render_matrix(matrix: &Matrix) -> String {
    let mut out = String::new();
    for r in 0..matrix.rows() {
        let row: Vec<String> = matrix.row(r).iter().map(|v| format!("{v:.6}")).collect();
        out.push_str(&format!("[{}]\n", row.join(" ")));
    }
    out
}

/// Full text report: optional clamp note, matrix, sum, norm, warnings
///
/// # Example
///
/// ```
/// use tormenta::config::EngineConfig;
/// use tormenta::engine::Engine;
/// use tormenta::format::render_report;
/// use tormenta::Matrix;
///
/// let a = Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
/// let b = Matrix::from_vec(2, 2, vec![5.0, 6.0, 7.0, 8.0]).unwrap();
/// let product = Engine::new(EngineConfig::new(2).unwrap()).multiply(&a, &b).unwrap();
///
/// let report = render_report(&product);
/// assert!(report.contains("Sum of elements in result matrix: 134.00"));
/// assert!(report.contains("Frobenius norm of result matrix: 72.069411"));
/// ```
pub fn render_report(product: &Product) -> String {
    let mut out = String::new();
    if product.is_clamped() {
        out.push_str(&format!(
            "Number of operations ({}) is less than number of threads ({}); using {} threads.\n",
            product.matrix.len(),
            product.requested_workers,
            product.workers
        ));
    }
    out.push_str("Result matrix:\n");
    out.push_str(&render_matrix(&product.matrix));
    out.push_str(&format!(
        "Sum of elements in result matrix: {:.2}\n",
        product.statistics.sum
    ));
    out.push_str(&format!(
        "Frobenius norm of result matrix: {:.6}\n",
        product.statistics.frobenius_norm
    ));
    for warning in &product.warnings {
        out.push_str(&format!("Warning: {warning}\n"));
    }
    out
}

/// Serializable view of a [`Product`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    /// Rows of the result
    pub rows: usize,
    /// Columns of the result
    pub cols: usize,
    /// Result entries, one inner vector per row
    pub data: Vec<Vec<f64>>,
    /// Sum of all entries
    pub sum: f64,
    /// Frobenius norm
    pub frobenius_norm: f64,
    /// Workers that ran
    pub workers: usize,
    /// Workers requested
    pub requested_workers: usize,
    /// Join failures, rendered as text
    pub warnings: Vec<String>,
}

impl ReportSummary {
    /// Pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl From<&Product> for ReportSummary {
    fn from(product: &Product) -> Self {
        let m = &product.matrix;
        ReportSummary {
            rows: m.rows(),
            cols: m.cols(),
            data: (0..m.rows()).map(|r| m.row(r).to_vec()).collect(),
            sum: product.statistics.sum,
            frobenius_norm: product.statistics.frobenius_norm,
            workers: product.workers,
            requested_workers: product.requested_workers,
            warnings: product.warnings.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Writes `matrix` as a `rows cols` header followed by one line per row
///
/// Values use Rust's shortest round-trip formatting, so the output loads
/// back to identical values.
pub fn write_matrix<W: Write>(matrix: &Matrix, mut writer: W) -> io::Result<()> {
    writeln!(writer, "{} {}", matrix.rows(), matrix.cols())?;
    for r in 0..matrix.rows() {
        let row: Vec<String> = matrix.row(r).iter().map(f64::to_string).collect();
        writeln!(writer, "{}", row.join(" "))?;
    }
    writer.flush()
}
