use std::sync::OnceLock;

use moka::sync::Cache;

use crate::MultiIndex;

/// Maximum number of `(degree, index)` coefficients kept in the process-wide cache.
pub const COEFFICIENT_CACHE_CAPACITY: u64 = 1024;

// Populated lazily, never cleared. Shared by every model, keyed by degree so that models of
// equal degree reuse entries and models of other degrees can't collide with them.
static COEFFICIENTS: OnceLock<Cache<(u32, MultiIndex), f64>> = OnceLock::new();

fn cache() -> &'static Cache<(u32, MultiIndex), f64> {
    COEFFICIENTS.get_or_init(|| Cache::new(COEFFICIENT_CACHE_CAPACITY))
}

/// Multinomial coefficient `degree! / (index[0]! * index[1]! * ... * index[n]!)`.
///
/// Uses the plain factorial ratio in `f64`. It is exact for small degrees, loses precision as
/// the factorials outgrow the 53-bit mantissa (around degree 20), and is not finite once
/// `degree!` overflows (degree > 170). Callers fitting very high degrees must check the
/// magnitude themselves.
pub fn polynom(degree: u32, index: &MultiIndex) -> f64 {
    let key = (degree, index.clone());
    if let Some(coeff) = cache().get(&key) {
        return coeff;
    }
    let coeff = multinomial(degree, index);
    log::trace!("polynom cache miss: degree={} index={:?} -> {}", degree, index, coeff);
    cache().insert(key, coeff);
    coeff
}

fn multinomial(degree: u32, index: &[u32]) -> f64 {
    let mut r = factorial(degree);
    for &i in index {
        r /= factorial(i);
    }
    r
}

fn factorial(n: u32) -> f64 {
    (2..=n).map(f64::from).product()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{binomial_coefficient, indices};

    #[test]
    fn known_values() {
        assert_eq!(polynom(3, &MultiIndex::from([1, 1, 1])), 6.0);
        assert_eq!(polynom(3, &MultiIndex::from([3, 0, 0])), 1.0);
        assert_eq!(polynom(4, &MultiIndex::from([2, 1, 1])), 12.0);
        assert_eq!(polynom(0, &MultiIndex::from([0, 0])), 1.0);
    }

    #[test]
    fn symmetric_under_permutation() {
        let perms = [
            [1, 2, 3],
            [1, 3, 2],
            [2, 1, 3],
            [2, 3, 1],
            [3, 1, 2],
            [3, 2, 1],
        ];
        let expected = polynom(6, &MultiIndex::from(perms[0]));
        for p in perms {
            assert_eq!(polynom(6, &MultiIndex::from(p)), expected);
        }
    }

    #[test]
    fn two_params_match_binomial() {
        for deg in 0..15u32 {
            for index in indices(2, deg).unwrap() {
                let expected = binomial_coefficient(deg as u64, index[0] as u64) as f64;
                assert_eq!(polynom(deg, &index), expected);
            }
        }
    }

    #[test]
    fn cached_value_is_stable() {
        let index = MultiIndex::from([2, 2, 1]);
        let first = polynom(5, &index);
        let second = polynom(5, &index);
        assert_eq!(first, second);
        assert_eq!(first, 30.0);
    }

    #[test]
    fn overflow_is_not_finite() {
        let index = MultiIndex::from([100, 100]);
        assert!(!polynom(200, &index).is_finite());
    }
}
