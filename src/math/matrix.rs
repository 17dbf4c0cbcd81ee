use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Serialize, Deserialize};
use std::f64::consts::PI;

use crate::error::{CriterionError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix{
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f64>>
}

impl Matrix{
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix{
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows]
        }
    }

    /// Samples a single value from N(0, 1) using the Box-Muller transform.
    fn sample_standard_normal(rng: &mut StdRng) -> f64 {
        // Both uniforms in (0, 1] to avoid log(0).
        let u1: f64 = 1.0 - rng.gen::<f64>();
        let u2: f64 = 1.0 - rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    /// Xavier (Glorot) initialization from N(0, sqrt(1 / cols)), seeded so
    /// two models built with the same seed start out identical.
    pub fn xavier(rows: usize, cols: usize, seed: u64) -> Matrix {
        let mut rng = StdRng::seed_from_u64(seed);
        let std_dev = (1.0 / cols.max(1) as f64).sqrt();
        let mut res = Matrix::zeros(rows, cols);
        for i in 0..rows {
            for j in 0..cols {
                res.data[i][j] = Matrix::sample_standard_normal(&mut rng) * std_dev;
            }
        }
        res
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.data[i]
    }

    /// `self += scale * other`, element-wise.
    pub fn add_scaled(&mut self, other: &Matrix, scale: f64) -> Result<()> {
        if self.rows != other.rows || self.cols != other.cols {
            return Err(CriterionError::Shape(format!(
                "{}x{} vs {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        for (row, other_row) in self.data.iter_mut().zip(other.data.iter()) {
            for (x, y) in row.iter_mut().zip(other_row.iter()) {
                *x += scale * y;
            }
        }
        Ok(())
    }

    pub fn map<F>(&self, functor: F) -> Matrix
    where
        F: Fn(f64) -> f64,
    {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .map(|row| row.iter().map(|&x| functor(x)).collect())
                .collect(),
        }
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xavier_is_reproducible() {
        let a = Matrix::xavier(4, 6, 17);
        let b = Matrix::xavier(4, 6, 17);
        let c = Matrix::xavier(4, 6, 18);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_add_scaled() {
        let mut a = Matrix::zeros(2, 2);
        let b = Matrix::zeros(2, 2).map(|_| 2.0);
        a.add_scaled(&b, -0.5).unwrap();
        assert_eq!(a.data, vec![vec![-1.0, -1.0], vec![-1.0, -1.0]]);
    }

    #[test]
    fn test_add_scaled_rejects_shape_mismatch() {
        let mut a = Matrix::zeros(2, 2);
        let b = Matrix::zeros(3, 2);
        assert!(matches!(a.add_scaled(&b, 1.0), Err(CriterionError::Shape(_))));
    }
}
