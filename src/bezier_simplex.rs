use nalgebra::{DMatrix, DVector};
use rand::Rng;
use snafu::ensure;

use crate::{
    ControlPoints, ParamShapeSnafu, Result, RowCountSnafu, ValueShapeSnafu, ZeroValuesSnafu,
    monomial, polynom,
};

/// A Bezier simplex mapping parameter vectors on the `(n_params - 1)`-simplex to value vectors.
///
/// The surface is
/// ```text
/// x(t) = Σ_i polynom(degree, i) * t^i * control_points[i]
/// ```
/// where `i` ranges over all multi-indices of length `n_params` summing to `degree`.
///
/// # Parameters
/// - `n_params`: Number of barycentric parameters (eg. 3 for a triangular patch)
/// - `n_values`: Dimension of the value space the simplex is embedded in
/// - `degree`: Polynomial degree of the basis
///
/// ```rust
/// use bezier_simplex::BezierSimplex;
/// use nalgebra::DMatrix;
///
/// let bs = BezierSimplex::new(3, 2, 3).unwrap();
/// let ts = DMatrix::from_row_slice(2, 3, &[
///     1.0, 0.0, 0.0,
///     0.2, 0.3, 0.5,
/// ]);
/// let xs = bs.forward(&ts).unwrap();
/// assert_eq!(xs.shape(), (2, 2));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct BezierSimplex {
    n_params: usize,
    n_values: usize,
    degree: u32,
    control_points: ControlPoints,
}

impl BezierSimplex {
    /// Create a Bezier simplex with control points drawn from a standard normal.
    pub fn new(n_params: usize, n_values: usize, degree: u32) -> Result<Self> {
        Self::with_rng(n_params, n_values, degree, &mut rand::rng())
    }

    pub fn with_rng(
        n_params: usize,
        n_values: usize,
        degree: u32,
        rng: &mut impl Rng,
    ) -> Result<Self> {
        ensure!(n_values >= 1, ZeroValuesSnafu);
        let control_points = ControlPoints::random(n_params, n_values, degree, rng)?;
        log::debug!(
            "Created Bezier simplex: n_params={} n_values={} degree={} ({} control points)",
            n_params,
            n_values,
            degree,
            control_points.len()
        );
        Ok(Self {
            n_params,
            n_values,
            degree,
            control_points,
        })
    }

    /// Create a Bezier simplex from control point vectors given in [`crate::indices`] order.
    pub fn from_control_points(
        n_params: usize,
        n_values: usize,
        degree: u32,
        values: Vec<DVector<f64>>,
    ) -> Result<Self> {
        ensure!(n_values >= 1, ZeroValuesSnafu);
        let control_points = ControlPoints::from_values(n_params, n_values, degree, values)?;
        Ok(Self {
            n_params,
            n_values,
            degree,
            control_points,
        })
    }

    pub fn n_params(&self) -> usize {
        self.n_params
    }

    pub fn n_values(&self) -> usize {
        self.n_values
    }

    pub fn degree(&self) -> u32 {
        self.degree
    }

    pub fn control_points(&self) -> &ControlPoints {
        &self.control_points
    }

    /// Mutable access for optimizers. Must not be held across a forward pass.
    pub fn control_points_mut(&mut self) -> &mut ControlPoints {
        &mut self.control_points
    }

    /// Bernstein basis weights: one row per parameter vector, one column per control point.
    ///
    /// For parameter vectors on the simplex, each row sums to one.
    pub fn basis(&self, ts: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        ensure!(
            ts.ncols() == self.n_params,
            ParamShapeSnafu {
                expected: self.n_params,
                actual: ts.ncols(),
            }
        );
        let mut weights = DMatrix::zeros(ts.nrows(), self.control_points.len());
        for (j, index) in self.control_points.indices().iter().enumerate() {
            let coeff = polynom(self.degree, index);
            let column = monomial(ts, index)? * coeff;
            weights.set_column(j, &column);
        }
        Ok(weights)
    }

    /// Evaluate the surface for a batch of parameter vectors (one per row).
    ///
    /// Returns one value vector per row.
    pub fn forward(&self, ts: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let weights = self.basis(ts)?;
        Ok(self.combine(&weights))
    }

    /// Evaluate the surface at a single parameter vector.
    pub fn forward_one(&self, t: &[f64]) -> Result<DVector<f64>> {
        let ts = DMatrix::from_row_slice(1, t.len(), t);
        let xs = self.forward(&ts)?;
        Ok(xs.row(0).transpose())
    }

    /// Forward pass that keeps what is needed to back-propagate into the control points.
    pub fn evaluate(&self, ts: &DMatrix<f64>) -> Result<Evaluation> {
        let weights = self.basis(ts)?;
        let values = self.combine(&weights);
        Ok(Evaluation {
            weights,
            values,
            n_params: self.n_params,
            degree: self.degree,
        })
    }

    // x = Σ_i w_i ⊗ cp_i, accumulated into a fresh matrix so control points are only read.
    fn combine(&self, weights: &DMatrix<f64>) -> DMatrix<f64> {
        let mut values = DMatrix::zeros(weights.nrows(), self.n_values);
        for (j, cp) in self.control_points.values().iter().enumerate() {
            values.ger(1.0, &weights.column(j), cp, 1.0);
        }
        values
    }
}

/// Result of [`BezierSimplex::evaluate`].
#[derive(Clone, Debug)]
pub struct Evaluation {
    weights: DMatrix<f64>,
    values: DMatrix<f64>,
    n_params: usize,
    degree: u32,
}

impl Evaluation {
    /// The surface values, one row per parameter vector.
    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    /// Basis weights used for the pass (see [`BezierSimplex::basis`]).
    pub fn weights(&self) -> &DMatrix<f64> {
        &self.weights
    }

    /// Gradient of a scalar loss w.r.t. every control point, given `∂loss/∂values`.
    ///
    /// The surface is linear in its control points, so the gradient of control point `i` is
    /// `Σ_b w[b, i] * grad_values[b, :]`. Control points whose weight is zero for every
    /// parameter vector of the batch get an exactly zero gradient.
    pub fn backward(&self, grad_values: &DMatrix<f64>) -> Result<ControlPoints> {
        ensure!(
            grad_values.nrows() == self.values.nrows(),
            RowCountSnafu {
                expected: self.values.nrows(),
                actual: grad_values.nrows(),
            }
        );
        ensure!(
            grad_values.ncols() == self.values.ncols(),
            ValueShapeSnafu {
                expected: self.values.ncols(),
                actual: grad_values.ncols(),
            }
        );
        let n_values = self.values.ncols();
        let mut grads = ControlPoints::zeros(self.n_params, n_values, self.degree)?;
        for (j, (_, mut grad)) in grads.iter_mut().enumerate() {
            grad.gemv_tr(1.0, grad_values, &self.weights.column(j), 0.0);
        }
        Ok(grads)
    }
}
