//! Dense row-major matrices.
//!
//! `Matrix` is the numeric buffer behind every weight, bias, activation and
//! gradient in the crate. Column vectors are matrices with a single column.
//!
//! Every binary operation checks operand shapes and returns
//! [`Error::InvalidShape`] on mismatch; nothing is truncated or broadcast.
//!
//! Products go through a single strided GEMM kernel:
//! - default: a simple, safe triple-loop implementation
//! - optional: a faster backend via the `matrixmultiply` feature

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    /// Row-major, `rows * cols` entries.
    data: Vec<f64>,
}

impl Matrix {
    /// All-zero matrix with shape `(rows, cols)`.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Wrap a row-major buffer with shape `(rows, cols)`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidShape(format!(
                "matrix dims must be > 0, got ({rows}, {cols})"
            )));
        }
        if data.len() != rows * cols {
            return Err(Error::InvalidShape(format!(
                "buffer length {} does not match rows * cols ({rows} * {cols})",
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Column vector `(values.len(), 1)`.
    pub fn column(values: &[f64]) -> Self {
        Self {
            rows: values.len(),
            cols: 1,
            data: values.to_vec(),
        }
    }

    /// Build from nested rows (outer index = row).
    ///
    /// Rejects an empty outer sequence, a zero-length first row and ragged rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(Error::InvalidShape("matrix has no rows".to_owned()));
        };
        let cols = first.len();
        if cols == 0 {
            return Err(Error::InvalidShape("matrix row 0 has no columns".to_owned()));
        }

        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(Error::InvalidShape(format!(
                    "matrix row {i} has len {}, expected {cols}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }

        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Nested rows (outer index = row).
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.data.chunks(self.cols).map(<[f64]>::to_vec).collect()
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    #[inline]
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Entry at `(row, col)`.
    ///
    /// Panics if out of bounds.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(row < self.rows && col < self.cols);
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        assert!(row < self.rows && col < self.cols);
        self.data[row * self.cols + col] = value;
    }

    pub fn transpose(&self) -> Matrix {
        let mut out = Matrix::zeros(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                out.data[c * self.rows + r] = self.data[r * self.cols + c];
            }
        }
        out
    }

    /// `self · other`.
    pub fn matmul(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols != other.rows {
            return Err(Error::InvalidShape(format!(
                "cannot multiply {:?} by {:?}",
                self.shape(),
                other.shape()
            )));
        }
        let mut out = Matrix::zeros(self.rows, other.cols);
        gemm_f64(
            self.rows, other.cols, self.cols, 1.0, &self.data, self.cols, 1, &other.data,
            other.cols, 1, 0.0, &mut out.data, other.cols, 1,
        );
        Ok(out)
    }

    /// `selfᵀ · other`, without materializing the transpose.
    pub fn t_matmul(&self, other: &Matrix) -> Result<Matrix> {
        if self.rows != other.rows {
            return Err(Error::InvalidShape(format!(
                "cannot multiply transpose of {:?} by {:?}",
                self.shape(),
                other.shape()
            )));
        }
        let mut out = Matrix::zeros(self.cols, other.cols);
        gemm_f64(
            self.cols, other.cols, self.rows, 1.0, &self.data, 1, self.cols, &other.data,
            other.cols, 1, 0.0, &mut out.data, other.cols, 1,
        );
        Ok(out)
    }

    /// `self · otherᵀ`, without materializing the transpose.
    pub fn matmul_t(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols != other.cols {
            return Err(Error::InvalidShape(format!(
                "cannot multiply {:?} by transpose of {:?}",
                self.shape(),
                other.shape()
            )));
        }
        let mut out = Matrix::zeros(self.rows, other.rows);
        gemm_f64(
            self.rows, other.rows, self.cols, 1.0, &self.data, self.cols, 1, &other.data, 1,
            other.cols, 0.0, &mut out.data, other.rows, 1,
        );
        Ok(out)
    }

    pub fn add(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_with(other, "add", |a, b| a + b)
    }

    pub fn sub(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_with(other, "subtract", |a, b| a - b)
    }

    /// Element-wise (Hadamard) product.
    pub fn hadamard(&self, other: &Matrix) -> Result<Matrix> {
        self.zip_with(other, "take the Hadamard product of", |a, b| a * b)
    }

    pub fn scale(&self, alpha: f64) -> Matrix {
        self.map(|v| alpha * v)
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// In-place `self -= alpha * other`.
    pub fn sub_scaled_assign(&mut self, alpha: f64, other: &Matrix) -> Result<()> {
        self.check_same_shape(other, "subtract")?;
        for (v, &g) in self.data.iter_mut().zip(&other.data) {
            *v = (-alpha).mul_add(g, *v);
        }
        Ok(())
    }

    fn zip_with(&self, other: &Matrix, op: &str, f: impl Fn(f64, f64) -> f64) -> Result<Matrix> {
        self.check_same_shape(other, op)?;
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    fn check_same_shape(&self, other: &Matrix, op: &str) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(Error::InvalidShape(format!(
                "cannot {op} {:?} and {:?}",
                self.shape(),
                other.shape()
            )));
        }
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
#[inline]
fn gemm_f64(
    m: usize,
    n: usize,
    k: usize,
    alpha: f64,
    a: &[f64],
    rsa: usize,
    csa: usize,
    b: &[f64],
    rsb: usize,
    csb: usize,
    beta: f64,
    c: &mut [f64],
    rsc: usize,
    csc: usize,
) {
    // Shapes are validated by the `Matrix` methods above.
    if m == 0 || n == 0 {
        return;
    }

    #[cfg(feature = "matrixmultiply")]
    {
        // matrixmultiply supports arbitrary strides.
        unsafe {
            matrixmultiply::dgemm(
                m,
                k,
                n,
                alpha,
                a.as_ptr(),
                rsa as isize,
                csa as isize,
                b.as_ptr(),
                rsb as isize,
                csb as isize,
                beta,
                c.as_mut_ptr(),
                rsc as isize,
                csc as isize,
            );
        }
    }

    #[cfg(not(feature = "matrixmultiply"))]
    for i in 0..m {
        for j in 0..n {
            let mut acc = 0.0_f64;
            let a0 = i * rsa;
            let b0 = j * csb;

            for p in 0..k {
                let av = a[a0 + p * csa];
                let bv = b[p * rsb + b0];
                acc = av.mul_add(bv, acc);
            }

            let idx = i * rsc + j * csc;
            c[idx] = alpha * acc + beta * c[idx];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(rows: usize, cols: usize, data: &[f64]) -> Matrix {
        Matrix::from_vec(rows, cols, data.to_vec()).unwrap()
    }

    #[test]
    fn matmul_and_transposed_variants_agree() {
        let a = m(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = m(3, 2, &[7.0, 8.0, 9.0, 10.0, 11.0, 12.0]);

        let ab = a.matmul(&b).unwrap();
        assert_eq!(ab, m(2, 2, &[58.0, 64.0, 139.0, 154.0]));

        let at_t = a.transpose();
        assert_eq!(at_t.t_matmul(&b).unwrap(), ab);
        assert_eq!(a.matmul_t(&b.transpose()).unwrap(), ab);
    }

    #[test]
    fn outer_product_via_matmul_t() {
        let col = Matrix::column(&[1.0, 2.0]);
        let row_src = Matrix::column(&[3.0, 4.0, 5.0]);
        let outer = col.matmul_t(&row_src).unwrap();
        assert_eq!(outer, m(2, 3, &[3.0, 4.0, 5.0, 6.0, 8.0, 10.0]));
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let a = m(2, 3, &[0.0; 6]);
        let b = m(2, 3, &[0.0; 6]);
        assert!(matches!(a.matmul(&b), Err(Error::InvalidShape(_))));
        assert!(a.hadamard(&Matrix::column(&[1.0, 2.0])).is_err());
        assert!(a.clone().sub_scaled_assign(0.1, &a.transpose()).is_err());
        assert!(a.add(&b).is_ok());
    }

    #[test]
    fn from_rows_rejects_empty_and_ragged() {
        assert!(Matrix::from_rows(&[]).is_err());
        assert!(Matrix::from_rows(&[vec![]]).is_err());
        assert!(Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]).is_err());

        let rows = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let mat = Matrix::from_rows(&rows).unwrap();
        assert_eq!(mat.get(1, 0), 3.0);
        assert_eq!(mat.to_rows(), rows);
    }

    #[test]
    fn sub_scaled_assign_updates_in_place() {
        let mut w = m(1, 2, &[1.0, 2.0]);
        let g = m(1, 2, &[10.0, -10.0]);
        w.sub_scaled_assign(0.1, &g).unwrap();
        assert!((w.get(0, 0) - 0.0).abs() < 1e-12);
        assert!((w.get(0, 1) - 3.0).abs() < 1e-12);
    }
}
