use std::collections::HashMap;

use nalgebra::{DVector, DVectorViewMut};
use rand::Rng;
use rand_distr::StandardNormal;
use snafu::{OptionExt as _, ensure};

use crate::{MultiIndex, Result, UnknownIndexSnafu, ValueShapeSnafu, indices};

/// The trainable state of a Bezier simplex: one value vector per multi-index.
///
/// Entries are stored in the order produced by [`indices`], which is fixed when the store is
/// built. Lookups by index go through a map keyed directly by [`MultiIndex`]. Every vector has
/// exactly `n_values` components: mutable access hands out views, and [`ControlPoints::set`]
/// checks the length of whole replacements.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlPoints {
    indices: Vec<MultiIndex>,
    values: Vec<DVector<f64>>,
    positions: HashMap<MultiIndex, usize>,
    n_values: usize,
}

impl ControlPoints {
    /// Control points with every component drawn independently from a standard normal.
    pub fn random(
        n_params: usize,
        n_values: usize,
        degree: u32,
        rng: &mut impl Rng,
    ) -> Result<Self> {
        Self::from_fn(n_params, n_values, degree, |_| {
            DVector::from_fn(n_values, |_, _| rng.sample(StandardNormal))
        })
    }

    pub fn zeros(n_params: usize, n_values: usize, degree: u32) -> Result<Self> {
        Self::from_fn(n_params, n_values, degree, |_| DVector::zeros(n_values))
    }

    /// Builds the store from values given in index order.
    pub fn from_values(
        n_params: usize,
        n_values: usize,
        degree: u32,
        values: Vec<DVector<f64>>,
    ) -> Result<Self> {
        let indices: Vec<_> = indices(n_params, degree)?.collect();
        ensure!(
            values.len() == indices.len(),
            crate::ControlPointCountSnafu {
                expected: indices.len(),
                actual: values.len(),
            }
        );
        for v in &values {
            ensure!(
                v.len() == n_values,
                ValueShapeSnafu {
                    expected: n_values,
                    actual: v.len(),
                }
            );
        }
        Ok(Self::assemble(indices, values, n_values))
    }

    fn from_fn(
        n_params: usize,
        n_values: usize,
        degree: u32,
        mut init: impl FnMut(&MultiIndex) -> DVector<f64>,
    ) -> Result<Self> {
        let indices: Vec<_> = indices(n_params, degree)?.collect();
        let values = indices.iter().map(&mut init).collect();
        Ok(Self::assemble(indices, values, n_values))
    }

    fn assemble(indices: Vec<MultiIndex>, values: Vec<DVector<f64>>, n_values: usize) -> Self {
        let positions = indices
            .iter()
            .enumerate()
            .map(|(pos, index)| (index.clone(), pos))
            .collect();
        Self {
            indices,
            values,
            positions,
            n_values,
        }
    }

    /// Number of control points.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Length of every control point vector.
    pub fn n_values(&self) -> usize {
        self.n_values
    }

    /// All multi-indices, in index order.
    pub fn indices(&self) -> &[MultiIndex] {
        &self.indices
    }

    /// Position of `index` in index order.
    pub fn position(&self, index: &MultiIndex) -> Option<usize> {
        self.positions.get(index).copied()
    }

    pub fn get(&self, index: &MultiIndex) -> Option<&DVector<f64>> {
        self.position(index).map(|pos| &self.values[pos])
    }

    pub fn get_mut(&mut self, index: &MultiIndex) -> Option<DVectorViewMut<'_, f64>> {
        self.position(index).map(|pos| self.values[pos].column_mut(0))
    }

    /// Overwrites the control point at `index`.
    pub fn set(&mut self, index: &MultiIndex, value: DVector<f64>) -> Result<()> {
        ensure!(
            value.len() == self.n_values,
            ValueShapeSnafu {
                expected: self.n_values,
                actual: value.len(),
            }
        );
        let pos = self
            .position(index)
            .context(UnknownIndexSnafu { index: index.clone() })?;
        self.values[pos] = value;
        Ok(())
    }

    /// Control point vectors, in index order.
    pub fn values(&self) -> &[DVector<f64>] {
        &self.values
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&MultiIndex, &DVector<f64>)> {
        self.indices.iter().zip(self.values.iter())
    }

    pub fn iter_mut(
        &mut self,
    ) -> impl ExactSizeIterator<Item = (&MultiIndex, DVectorViewMut<'_, f64>)> {
        self.indices
            .iter()
            .zip(self.values.iter_mut().map(|v| v.column_mut(0)))
    }
}
