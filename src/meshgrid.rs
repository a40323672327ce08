use nalgebra::DMatrix;
use snafu::ensure;

use crate::{BezierSimplex, Result, ZeroResolutionSnafu, indices, num_compositions};

/// Default number of grid steps along each edge of the simplex.
pub const DEFAULT_MESH_RESOLUTION: u32 = 100;

/// Uniform grid over the standard simplex with `resolution` steps along each edge.
///
/// Rows are `i / resolution` for every multi-index `i` of length `n_params` summing to
/// `resolution`, in [`indices`] order. Every row sums to one.
pub fn simplex_grid(n_params: usize, resolution: u32) -> Result<DMatrix<f64>> {
    ensure!(resolution >= 1, ZeroResolutionSnafu);
    let num_points = num_compositions(n_params, resolution);
    let scale = 1.0 / resolution as f64;

    let mut grid = DMatrix::zeros(num_points, n_params);
    for (r, index) in indices(n_params, resolution)?.enumerate() {
        for (c, &e) in index.iter().enumerate() {
            grid[(r, c)] = e as f64 * scale;
        }
    }
    Ok(grid)
}

impl BezierSimplex {
    /// Sample the surface on a uniform simplex grid.
    ///
    /// Returns `(ts, xs)`: the parameter grid (see [`simplex_grid`]) and the surface value at
    /// each grid point.
    pub fn meshgrid(&self, resolution: u32) -> Result<(DMatrix<f64>, DMatrix<f64>)> {
        let ts = simplex_grid(self.n_params(), resolution)?;
        let xs = self.forward(&ts)?;
        log::debug!("Sampled mesh grid with {} points", ts.nrows());
        Ok((ts, xs))
    }
}
