//! Bezier simplex fitting.
//!
//! A Bezier simplex maps points of the standard simplex (barycentric parameter vectors) to
//! value vectors through a weighted sum of control points. Control points are indexed by all
//! compositions of a fixed degree, and the weights are the Bernstein polynomials of the
//! simplex: `polynom(degree, i) * t^i`.

mod bezier_simplex;
mod binomial;
mod coefficient;
mod control_points;
pub mod data;
mod fit;
mod meshgrid;
mod monomial;
mod multi_index;
mod persist;

#[cfg(test)]
mod test_utils;

pub use bezier_simplex::*;
pub use binomial::*;
pub use coefficient::{COEFFICIENT_CACHE_CAPACITY, polynom};
pub use control_points::ControlPoints;
pub use fit::*;
pub use meshgrid::*;
pub use monomial::{monomial, monomial_one};
pub use multi_index::*;
pub use persist::ModelState;

use snafu::prelude::*;

pub type Result<T, E = BezierSimplexError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BezierSimplexError {
    #[snafu(display("Number of parameters must be at least 1"))]
    ZeroParams,

    #[snafu(display("Number of values must be at least 1"))]
    ZeroValues,

    #[snafu(display("Mesh grid resolution must be at least 1"))]
    ZeroResolution,

    #[snafu(display("Expected {} control points, got {}", expected, actual))]
    ControlPointCount { expected: usize, actual: usize },

    #[snafu(display("Invalid configuration: {}", message))]
    InvalidConfig { message: String },

    #[snafu(display("Parameter vectors have {} components, expected {}", actual, expected))]
    ParamShape { expected: usize, actual: usize },

    #[snafu(display("Value vectors have {} components, expected {}", actual, expected))]
    ValueShape { expected: usize, actual: usize },

    #[snafu(display("Expected {} rows, got {}", expected, actual))]
    RowCount { expected: usize, actual: usize },

    #[snafu(display("No control point with index {:?}", index))]
    UnknownIndex { index: MultiIndex },

    #[snafu(display("Failed to access {}: {}", path.display(), source))]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("{}:{}: {}", path.display(), line, message))]
    Parse {
        path: std::path::PathBuf,
        line: usize,
        message: String,
    },

    #[snafu(display(
        "{}:{}: expected {} fields but found {}",
        path.display(),
        line,
        expected,
        actual
    ))]
    RaggedRow {
        path: std::path::PathBuf,
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[snafu(display("No samples in data"))]
    EmptyData,

    #[snafu(display("Invalid model state JSON: {}", source))]
    Json { source: serde_json::Error },

    #[snafu(display(
        "Unknown normalization {:?} (expected \"max\", \"std\", \"quantile\" or \"none\")",
        name
    ))]
    UnknownNormalization { name: String },
}
