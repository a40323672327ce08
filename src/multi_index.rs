use fmtastic::{Subscript, Superscript};
use smallvec::SmallVec;

use crate::{Result, ZeroParamsSnafu, num_compositions};
use snafu::ensure;

/// Identity of a control point: one non-negative exponent per parameter.
///
/// For a Bezier simplex of degree `d`, the exponents of every index sum to `d`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MultiIndex(SmallVec<[u32; 8]>);

impl MultiIndex {
    pub fn new(exps: &[u32]) -> Self {
        Self(SmallVec::from_slice(exps))
    }

    /// The index that places all of `deg` on parameter `axis`.
    ///
    /// # Panics
    /// Panics if `axis >= dim`.
    pub fn vertex(dim: usize, axis: usize, deg: u32) -> Self {
        assert!(axis < dim, "Vertex axis out of bounds");
        let mut exps: SmallVec<[u32; 8]> = smallvec::smallvec![0; dim];
        exps[axis] = deg;
        Self(exps)
    }

    /// Sum of all exponents.
    pub fn degree(&self) -> u32 {
        self.0.iter().sum()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }
}

impl std::ops::Deref for MultiIndex {
    type Target = [u32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const N: usize> From<[u32; N]> for MultiIndex {
    fn from(exps: [u32; N]) -> Self {
        Self::new(&exps)
    }
}

impl From<&[u32]> for MultiIndex {
    fn from(exps: &[u32]) -> Self {
        Self::new(exps)
    }
}

impl core::fmt::Debug for MultiIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

/// Renders the index as the monomial it stands for, eg. `t₀²t₂` for `[2, 0, 1]`.
impl core::fmt::Display for MultiIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.0.iter().all(|&e| e == 0) {
            return write!(f, "1");
        }
        for (i, &e) in self.0.iter().enumerate() {
            match e {
                0 => continue,
                1 => write!(f, "t{}", Subscript(i))?,
                _ => write!(f, "t{}{}", Subscript(i), Superscript(e))?,
            }
        }
        Ok(())
    }
}

/// Iterates over all multi-indices `[i_0, i_1, ..., i_{dim-1}]` with `i_0 + ... + i_{dim-1} == deg`.
///
/// The order is fixed: coordinates are assigned from first to second-to-last, each one counting
/// down from the remaining budget to zero, and the last coordinate takes whatever is left.
/// For `dim = 3, deg = 2`:
///     `[2,0,0], [1,1,0], [1,0,1], [0,2,0], [0,1,1], [0,0,2]`
///
/// Control point storage, evaluation and serialization all rely on this order.
/// Every call returns a fresh iterator starting from the first index. Creating the iterator is
/// cheap for any `dim` and `deg`; when the total count does not fit in a `usize` the reported
/// length saturates at `usize::MAX`.
pub fn indices(dim: usize, deg: u32) -> Result<Indices> {
    ensure!(dim >= 1, ZeroParamsSnafu);
    Ok(Indices {
        next: Some(MultiIndex::vertex(dim, 0, deg)),
        deg,
        remaining: num_compositions(dim, deg),
    })
}

#[derive(Clone, Debug)]
pub struct Indices {
    next: Option<MultiIndex>,
    deg: u32,
    remaining: usize,
}

impl Iterator for Indices {
    type Item = MultiIndex;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = successor(&current, self.deg);
        self.remaining = self.remaining.saturating_sub(1);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Indices {}

impl std::iter::FusedIterator for Indices {}

fn successor(current: &MultiIndex, deg: u32) -> Option<MultiIndex> {
    let last = current.len() - 1;
    // Rightmost free coordinate that can still give up one unit.
    let k = (0..last).rev().find(|&k| current[k] > 0)?;

    let mut next = current.clone();
    next.0[k] -= 1;
    let used: u32 = next.0[..=k].iter().sum();
    next.0[k + 1] = deg - used;
    for e in next.0[k + 2..].iter_mut() {
        *e = 0;
    }
    Some(next)
}
