//! Sample data: loading delimited text files, normalizing values, splitting and batching.

use std::path::Path;
use std::str::FromStr;

use nalgebra::DMatrix;
use rand::Rng;
use rand::seq::SliceRandom as _;
use snafu::{ResultExt as _, ensure};

use crate::{
    BezierSimplexError, EmptyDataSnafu, InvalidConfigSnafu, IoSnafu, ParseSnafu, RaggedRowSnafu,
    Result, RowCountSnafu, UnknownNormalizationSnafu,
};

/// How value columns are rescaled after loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    /// Leave values untouched.
    #[default]
    None,
    /// Map each column's `[min, max]` to `[0, 1]`.
    Max,
    /// Subtract the column mean and divide by the (unbiased) standard deviation.
    Std,
    /// Map each column's 5% and 95% quantiles to 0 and 1, ignoring outliers for the scale.
    Quantile,
}

/// Fraction of samples ignored on each side by [`Normalization::Quantile`].
const OUTLIER_QUANTILE: f64 = 0.05;

impl FromStr for Normalization {
    type Err = BezierSimplexError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::None),
            "max" => Ok(Self::Max),
            "std" => Ok(Self::Std),
            "quantile" => Ok(Self::Quantile),
            _ => UnknownNormalizationSnafu { name: s }.fail(),
        }
    }
}

impl Normalization {
    /// Normalize every column of `values` independently.
    pub fn apply(self, values: &DMatrix<f64>) -> DMatrix<f64> {
        let mut out = values.clone();
        if values.nrows() == 0 {
            return out;
        }
        for (c, mut column) in out.column_iter_mut().enumerate() {
            let col: Vec<f64> = values.column(c).iter().copied().collect();
            let (offset, scale) = match self {
                Self::None => continue,
                Self::Max => {
                    let min = col.iter().copied().fold(f64::INFINITY, f64::min);
                    let max = col.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    widen(min, max)
                }
                Self::Std => {
                    let (mean, std) = mean_std(&col);
                    (mean, if std == 0.0 { 1.0 } else { std })
                }
                Self::Quantile => {
                    let mut sorted = col;
                    sorted.sort_by(f64::total_cmp);
                    let min = quantile(&sorted, OUTLIER_QUANTILE);
                    let max = quantile(&sorted, 1.0 - OUTLIER_QUANTILE);
                    widen(min, max)
                }
            };
            for v in column.iter_mut() {
                *v = (*v - offset) / scale;
            }
        }
        out
    }
}

// (offset, scale) for a min/max rescale. A constant column only has its minimum lowered by 0.5,
// so every sample maps to 1.
fn widen(min: f64, max: f64) -> (f64, f64) {
    if min == max {
        (min - 0.5, 0.5)
    } else {
        (min, max - min)
    }
}

fn mean_std(col: &[f64]) -> (f64, f64) {
    let n = col.len() as f64;
    let mean = col.iter().sum::<f64>() / n;
    if col.len() < 2 {
        return (mean, 0.0);
    }
    let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var.sqrt())
}

// Linear interpolation between the two closest order statistics.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Options for reading sample files.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// Field separator. Any whitespace delimiter splits on runs of whitespace.
    pub delimiter: char,
    /// Number of leading lines to skip.
    pub header: usize,
    /// Normalization applied to the value file.
    pub normalize: Normalization,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: ' ',
            header: 0,
            normalize: Normalization::None,
        }
    }
}

/// Read a delimited text file with one sample per line into a `samples x fields` matrix.
pub fn load_matrix(path: impl AsRef<Path>, options: &LoadOptions) -> Result<DMatrix<f64>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).context(IoSnafu { path })?;
    let matrix = parse_matrix(&text, path, options)?;
    log::debug!(
        "Loaded {} samples with {} fields from {}",
        matrix.nrows(),
        matrix.ncols(),
        path.display()
    );
    Ok(matrix)
}

fn parse_matrix(text: &str, path: &Path, options: &LoadOptions) -> Result<DMatrix<f64>> {
    let mut data = vec![];
    let mut ncols = None;
    let mut nrows = 0;

    for (line_no, line) in text.lines().enumerate().skip(options.header) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = if options.delimiter.is_whitespace() {
            line.split_whitespace().collect()
        } else {
            line.split(options.delimiter).map(str::trim).collect()
        };

        let expected = *ncols.get_or_insert(fields.len());
        ensure!(
            fields.len() == expected,
            RaggedRowSnafu {
                path,
                line: line_no + 1,
                expected,
                actual: fields.len(),
            }
        );
        for field in fields {
            let value = field.parse::<f64>().map_err(|e| {
                ParseSnafu {
                    path,
                    line: line_no + 1,
                    message: format!("{field:?}: {e}"),
                }
                .build()
            })?;
            data.push(value);
        }
        nrows += 1;
    }

    ensure!(nrows > 0, EmptyDataSnafu);
    Ok(DMatrix::from_row_slice(nrows, ncols.unwrap_or(0), &data))
}

/// Paired parameter and value samples, one sample per row.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub params: DMatrix<f64>,
    pub values: DMatrix<f64>,
}

impl Dataset {
    pub fn new(params: DMatrix<f64>, values: DMatrix<f64>) -> Result<Self> {
        ensure!(
            params.nrows() == values.nrows(),
            RowCountSnafu {
                expected: params.nrows(),
                actual: values.nrows(),
            }
        );
        Ok(Self { params, values })
    }

    /// Load parameters and values from two files with matching line counts.
    pub fn load(
        params_path: impl AsRef<Path>,
        values_path: impl AsRef<Path>,
        options: &LoadOptions,
    ) -> Result<Self> {
        let params = load_matrix(params_path, options)?;
        let values = options.normalize.apply(&load_matrix(values_path, options)?);
        Self::new(params, values)
    }

    pub fn len(&self) -> usize {
        self.params.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn n_params(&self) -> usize {
        self.params.ncols()
    }

    pub fn n_values(&self) -> usize {
        self.values.ncols()
    }

    /// Subset of rows, in the given order.
    pub fn select(&self, rows: &[usize]) -> Self {
        Self {
            params: self.params.select_rows(rows),
            values: self.values.select_rows(rows),
        }
    }

    /// Random split into `(train, validation)` with `floor(len * ratio)` training samples.
    pub fn split(&self, ratio: f64, rng: &mut impl Rng) -> Result<(Self, Self)> {
        ensure!(
            (0.0..=1.0).contains(&ratio),
            InvalidConfigSnafu {
                message: format!("split ratio must be within [0, 1], got {ratio}"),
            }
        );
        let mut perm: Vec<usize> = (0..self.len()).collect();
        perm.shuffle(rng);
        let n_train = (self.len() as f64 * ratio) as usize;
        let (train, val) = perm.split_at(n_train);
        Ok((self.select(train), self.select(val)))
    }

    /// Shuffled minibatches covering every sample once. `None` yields a single full batch.
    pub fn batches(&self, batch_size: Option<usize>, rng: &mut impl Rng) -> Result<Vec<Self>> {
        ensure!(
            batch_size != Some(0),
            InvalidConfigSnafu {
                message: "batch size must be at least 1",
            }
        );
        let batch_size = batch_size.unwrap_or(self.len()).max(1);
        let mut perm: Vec<usize> = (0..self.len()).collect();
        perm.shuffle(rng);
        Ok(perm.chunks(batch_size).map(|rows| self.select(rows)).collect())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use assertables::{assert_err, assert_ok};
    use pretty_assertions as pa;
    use rand::SeedableRng as _;

    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn parse_normalization() {
        assert_eq!("max".parse::<Normalization>().unwrap(), Normalization::Max);
        assert_eq!("std".parse::<Normalization>().unwrap(), Normalization::Std);
        assert_eq!("quantile".parse::<Normalization>().unwrap(), Normalization::Quantile);
        assert_eq!("none".parse::<Normalization>().unwrap(), Normalization::None);
        let err = assert_err!("minmax".parse::<Normalization>());
        assert!(matches!(err, BezierSimplexError::UnknownNormalization { .. }));
    }

    #[test]
    fn load_space_delimited() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "params.txt", "a b c\n1 0  0\n0.5 0.5 0\n\n0 0 1\n");
        let options = LoadOptions {
            header: 1,
            ..Default::default()
        };
        let m = assert_ok!(load_matrix(&path, &options));
        pa::assert_eq!(
            m,
            DMatrix::from_row_slice(3, 3, &[1.0, 0.0, 0.0, 0.5, 0.5, 0.0, 0.0, 0.0, 1.0])
        );
    }

    #[test]
    fn load_comma_delimited() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "values.csv", "1.5, 2\n-3,4e-1\n");
        let options = LoadOptions {
            delimiter: ',',
            ..Default::default()
        };
        let m = assert_ok!(load_matrix(&path, &options));
        pa::assert_eq!(m, DMatrix::from_row_slice(2, 2, &[1.5, 2.0, -3.0, 0.4]));
    }

    #[test]
    fn load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let options = LoadOptions::default();

        let ragged = write(&dir, "ragged.txt", "1 2\n3\n");
        let err = assert_err!(load_matrix(&ragged, &options));
        assert!(matches!(
            err,
            BezierSimplexError::RaggedRow {
                line: 2,
                expected: 2,
                actual: 1,
                ..
            }
        ));

        let bad = write(&dir, "bad.txt", "1 x\n");
        let err = assert_err!(load_matrix(&bad, &options));
        assert!(matches!(err, BezierSimplexError::Parse { line: 1, .. }));

        let empty = write(&dir, "empty.txt", "\n\n");
        let err = assert_err!(load_matrix(&empty, &options));
        assert!(matches!(err, BezierSimplexError::EmptyData));

        let err = assert_err!(load_matrix(dir.path().join("missing.txt"), &options));
        assert!(matches!(err, BezierSimplexError::Io { .. }));
    }

    #[test]
    fn load_dataset_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let params = write(&dir, "p.txt", "1 0\n0.5 0.5\n0 1\n");
        let values = write(&dir, "v.txt", "2 7\n4 7\n6 7\n");
        let options = LoadOptions {
            normalize: Normalization::Max,
            ..Default::default()
        };
        let data = assert_ok!(Dataset::load(&params, &values, &options));
        assert_eq!(data.len(), 3);
        assert_eq!(data.n_params(), 2);
        assert_eq!(data.n_values(), 2);
        pa::assert_eq!(
            data.values,
            DMatrix::from_row_slice(3, 2, &[0.0, 1.0, 0.5, 1.0, 1.0, 1.0])
        );

        let short = write(&dir, "short.txt", "1\n2\n");
        let err = assert_err!(Dataset::load(&params, &short, &options));
        assert!(matches!(
            err,
            BezierSimplexError::RowCount {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn normalize_std() {
        let values = DMatrix::from_column_slice(4, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 5.0, 5.0, 5.0]);
        let out = Normalization::Std.apply(&values);
        let std = (5.0f64 / 3.0).sqrt();
        assert_abs_diff_eq!(out[(0, 0)], -1.5 / std, epsilon = 1e-12);
        assert_abs_diff_eq!(out[(3, 0)], 1.5 / std, epsilon = 1e-12);
        assert_abs_diff_eq!(out.column(0).sum(), 0.0, epsilon = 1e-12);
        // Constant column: std replaced by one.
        assert!(out.column(1).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn normalize_quantile() {
        let column: Vec<f64> = (0..=20).map(f64::from).collect();
        let values = DMatrix::from_column_slice(21, 1, &column);
        let out = Normalization::Quantile.apply(&values);
        // 5% and 95% quantiles of 0..=20 are 1 and 19.
        assert_abs_diff_eq!(out[(1, 0)], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[(19, 0)], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[(0, 0)], -1.0 / 18.0, epsilon = 1e-12);
    }

    #[test]
    fn normalize_constant_column_maps_to_one() {
        let values = DMatrix::from_column_slice(3, 2, &[7.0, 7.0, 7.0, -2.0, -2.0, -2.0]);
        for normalize in [Normalization::Max, Normalization::Quantile] {
            let out = normalize.apply(&values);
            assert!(out.iter().all(|&v| v == 1.0), "{normalize:?}: {out}");
        }
    }

    #[test]
    fn normalize_none_is_identity() {
        let values = DMatrix::from_row_slice(2, 2, &[1.0, -2.0, 3.0, 8.0]);
        assert_eq!(Normalization::None.apply(&values), values);
    }

    #[test]
    fn split_sizes() {
        let params = DMatrix::from_fn(10, 2, |r, c| (r * 2 + c) as f64);
        let values = DMatrix::from_fn(10, 1, |r, _| r as f64);
        let data = assert_ok!(Dataset::new(params, values));
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);

        let (train, val) = assert_ok!(data.split(0.5, &mut rng));
        assert_eq!(train.len(), 5);
        assert_eq!(val.len(), 5);

        // Rows stay paired and every sample lands in exactly one side.
        let mut seen: Vec<usize> = vec![];
        for part in [&train, &val] {
            for r in 0..part.len() {
                let id = part.values[(r, 0)] as usize;
                assert_eq!(part.params[(r, 0)], (id * 2) as f64);
                seen.push(id);
            }
        }
        seen.sort();
        pa::assert_eq!(seen, (0..10).collect::<Vec<_>>());

        let (train, val) = assert_ok!(data.split(0.33, &mut rng));
        assert_eq!((train.len(), val.len()), (3, 7));

        assert_err!(data.split(1.5, &mut rng));
    }

    #[test]
    fn batches_cover_all_samples() {
        let data = Dataset::new(
            DMatrix::from_fn(7, 2, |r, _| r as f64),
            DMatrix::from_fn(7, 1, |r, _| r as f64),
        )
        .unwrap();
        let mut rng = rand::rngs::StdRng::seed_from_u64(9);

        let batches = assert_ok!(data.batches(Some(3), &mut rng));
        let sizes: Vec<_> = batches.iter().map(Dataset::len).collect();
        pa::assert_eq!(sizes, vec![3, 3, 1]);

        let mut ids: Vec<usize> = batches
            .iter()
            .flat_map(|b| b.values.iter().map(|&v| v as usize).collect::<Vec<_>>())
            .collect();
        ids.sort();
        pa::assert_eq!(ids, (0..7).collect::<Vec<_>>());

        let full = assert_ok!(data.batches(None, &mut rng));
        assert_eq!(full.len(), 1);
        assert_eq!(full[0].len(), 7);

        assert_err!(data.batches(Some(0), &mut rng));
    }
}
