/// Number of ways to choose `k` items out of `n`, saturating at `u64::MAX`.
///
/// Computed with the multiplicative formula in `u128`. Every partial product `C(n, i) * (n - i)`
/// fits there as long as `C(n, i)` fits in a `u64`, and the partial values only grow with `i`, so
/// the first one past `u64::MAX` means the result is past it too.
pub fn binomial_coefficient(n: u64, mut k: u64) -> u64 {
    if k > n {
        return 0;
    }
    k = k.min(n - k);
    let mut res = 1u128;
    for i in 0..k {
        res = res * u128::from(n - i) / u128::from(i + 1);
        if res > u128::from(u64::MAX) {
            return u64::MAX;
        }
    }
    res as u64
}

/// Number of compositions of `deg` into `dim` non-negative parts, `C(deg + dim - 1, dim - 1)`.
///
/// This is the number of control points of a Bezier simplex with `dim` parameters and degree
/// `deg`, and the number of grid points of a mesh grid with resolution `deg`. Counts that do not
/// fit in a `usize` saturate at `usize::MAX`.
pub fn num_compositions(dim: usize, deg: u32) -> usize {
    if dim == 0 {
        return 0;
    }
    let dim = dim as u64;
    let count = binomial_coefficient(u64::from(deg) + dim - 1, dim - 1);
    usize::try_from(count).unwrap_or(usize::MAX)
}
