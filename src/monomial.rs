use nalgebra::{DMatrix, DVector};
use snafu::ensure;

use crate::{ParamShapeSnafu, Result};

/// Evaluates the monomial `v[0]^d[0] * v[1]^d[1] * ... * v[n]^d[n]` for every row of `vars`.
///
/// `vars` holds one parameter vector per row and `degs` one exponent per column. Following the
/// usual convention, `0^0 == 1`, so parameters with a zero exponent never zero the product.
pub fn monomial(vars: &DMatrix<f64>, degs: &[u32]) -> Result<DVector<f64>> {
    ensure!(
        vars.ncols() == degs.len(),
        ParamShapeSnafu {
            expected: degs.len(),
            actual: vars.ncols(),
        }
    );
    Ok(DVector::from_iterator(
        vars.nrows(),
        vars.row_iter().map(|row| product(row.iter().copied(), degs)),
    ))
}

/// Single parameter vector version of [`monomial`].
pub fn monomial_one(var: &[f64], degs: &[u32]) -> Result<f64> {
    ensure!(
        var.len() == degs.len(),
        ParamShapeSnafu {
            expected: degs.len(),
            actual: var.len(),
        }
    );
    Ok(product(var.iter().copied(), degs))
}

fn product(var: impl Iterator<Item = f64>, degs: &[u32]) -> f64 {
    let mut result = 1.0;
    for (v, &d) in var.zip(degs) {
        // powi(0.0, 0) is 1.0
        result *= match i32::try_from(d) {
            Ok(d) => v.powi(d),
            Err(_) => v.powf(f64::from(d)),
        };
    }
    result
}
