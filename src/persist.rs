use std::path::Path;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use snafu::ResultExt as _;

use crate::{BezierSimplex, IoSnafu, JsonSnafu, Result};

/// Serializable state of a [`BezierSimplex`].
///
/// Control points are listed in [`crate::indices`] order, which makes the indices themselves
/// redundant: `(n_params, degree)` is enough to recover them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
    pub n_params: usize,
    pub n_values: usize,
    pub degree: u32,
    pub control_points: Vec<Vec<f64>>,
}

impl BezierSimplex {
    pub fn state(&self) -> ModelState {
        ModelState {
            n_params: self.n_params(),
            n_values: self.n_values(),
            degree: self.degree(),
            control_points: self
                .control_points()
                .values()
                .iter()
                .map(|v| v.iter().copied().collect())
                .collect(),
        }
    }

    /// Rebuild a model, validating the number and length of control points.
    pub fn from_state(state: ModelState) -> Result<Self> {
        let values = state
            .control_points
            .into_iter()
            .map(DVector::from_vec)
            .collect();
        Self::from_control_points(state.n_params, state.n_values, state.degree, values)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(&self.state()).context(JsonSnafu)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let state: ModelState = serde_json::from_str(json).context(JsonSnafu)?;
        Self::from_state(state)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.state()).context(JsonSnafu)?;
        std::fs::write(path, json).context(IoSnafu { path })?;
        log::info!("Saved Bezier simplex to {}", path.display());
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).context(IoSnafu { path })?;
        Self::from_json_str(&json)
    }
}
