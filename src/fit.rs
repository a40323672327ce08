use nalgebra::DMatrix;
use rand::SeedableRng as _;
use rand::rngs::StdRng;
use snafu::ensure;

use crate::data::Dataset;
use crate::{
    BezierSimplex, EmptyDataSnafu, InvalidConfigSnafu, ParamShapeSnafu, Result, RowCountSnafu,
    ValueShapeSnafu,
};

/// Settings for [`Trainer`].
#[derive(Debug, Clone, PartialEq)]
pub struct FitConfig {
    /// Degree of the fitted Bezier simplex.
    pub degree: u32,
    /// Minibatch size. `None` trains on the full set every step.
    pub batch_size: Option<usize>,
    pub max_epochs: usize,
    /// Gradient descent step size on the mean squared error.
    pub learning_rate: f64,
    /// Number of epochs without improvement of the monitored MSE before stopping.
    pub patience: usize,
    /// Minimum decrease of the monitored MSE that counts as an improvement.
    pub min_delta: f64,
    /// Seed for initialization and shuffling. Drawn from the thread RNG if `None`.
    pub seed: Option<u64>,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            degree: 3,
            batch_size: None,
            max_epochs: 1000,
            learning_rate: 0.5,
            patience: 10,
            min_delta: 0.0,
            seed: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FitReport {
    pub model: BezierSimplex,
    /// Number of epochs actually run.
    pub epochs: usize,
    pub train_mse: f64,
    pub val_mse: Option<f64>,
    pub val_mae: Option<f64>,
}

/// Minibatch gradient descent on the mean squared error, with early stopping.
///
/// The monitored metric is the validation MSE when a validation set is given, otherwise the
/// training MSE.
#[derive(Debug, Clone)]
pub struct Trainer {
    config: FitConfig,
}

impl Trainer {
    pub fn new(config: FitConfig) -> Result<Self> {
        ensure!(
            config.learning_rate.is_finite() && config.learning_rate > 0.0,
            InvalidConfigSnafu {
                message: format!("learning rate must be positive, got {}", config.learning_rate),
            }
        );
        ensure!(
            config.max_epochs >= 1,
            InvalidConfigSnafu {
                message: "max_epochs must be at least 1",
            }
        );
        ensure!(
            config.batch_size != Some(0),
            InvalidConfigSnafu {
                message: "batch size must be at least 1",
            }
        );
        Ok(Self { config })
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    pub fn fit(&self, train: &Dataset, validation: Option<&Dataset>) -> Result<FitReport> {
        ensure!(!train.is_empty(), EmptyDataSnafu);
        if let Some(val) = validation {
            ensure!(
                val.n_params() == train.n_params(),
                ParamShapeSnafu {
                    expected: train.n_params(),
                    actual: val.n_params(),
                }
            );
            ensure!(
                val.n_values() == train.n_values(),
                ValueShapeSnafu {
                    expected: train.n_values(),
                    actual: val.n_values(),
                }
            );
        }

        let cfg = &self.config;
        let mut rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let mut model =
            BezierSimplex::with_rng(train.n_params(), train.n_values(), cfg.degree, &mut rng)?;

        log::info!(
            "Fitting degree {} Bezier simplex to {} samples ({} validation)",
            cfg.degree,
            train.len(),
            validation.map_or(0, Dataset::len)
        );

        let mut best = f64::INFINITY;
        let mut stale = 0;
        let mut epochs = 0;
        let mut train_mse = f64::NAN;
        let mut val_metrics = None;

        for epoch in 1..=cfg.max_epochs {
            epochs = epoch;
            for batch in train.batches(cfg.batch_size, &mut rng)? {
                step(&mut model, &batch, cfg.learning_rate)?;
            }

            train_mse = mse(&model.forward(&train.params)?, &train.values)?;
            ensure!(
                train_mse.is_finite(),
                InvalidConfigSnafu {
                    message: format!(
                        "training diverged at epoch {epoch}, lower the learning rate (currently {})",
                        cfg.learning_rate
                    ),
                }
            );

            val_metrics = match validation {
                Some(val) if !val.is_empty() => {
                    let pred = model.forward(&val.params)?;
                    Some((mse(&pred, &val.values)?, mae(&pred, &val.values)?))
                }
                _ => None,
            };
            let monitored = val_metrics.map_or(train_mse, |(val_mse, _)| val_mse);
            log::debug!(
                "epoch {}: train_mse={:.6e} val_mse={:?}",
                epoch,
                train_mse,
                val_metrics.map(|(m, _)| m)
            );

            if monitored < best - cfg.min_delta {
                best = monitored;
                stale = 0;
            } else {
                stale += 1;
                if stale >= cfg.patience {
                    log::info!(
                        "Stopping early at epoch {}: no improvement for {} epochs",
                        epoch,
                        stale
                    );
                    break;
                }
            }
        }

        log::info!("Finished after {} epochs: train_mse={:.6e}", epochs, train_mse);
        Ok(FitReport {
            model,
            epochs,
            train_mse,
            val_mse: val_metrics.map(|(m, _)| m),
            val_mae: val_metrics.map(|(_, m)| m),
        })
    }
}

// One gradient descent step on the batch MSE.
fn step(model: &mut BezierSimplex, batch: &Dataset, learning_rate: f64) -> Result<()> {
    let eval = model.evaluate(&batch.params)?;
    let residual = eval.values() - &batch.values;
    let n = residual.len().max(1) as f64;
    let grads = eval.backward(&(residual * (2.0 / n)))?;
    for ((_, mut cp), (_, grad)) in model.control_points_mut().iter_mut().zip(grads.iter()) {
        cp.axpy(-learning_rate, grad, 1.0);
    }
    Ok(())
}

/// Fit a Bezier simplex to all given samples, without a validation split.
///
/// `params` holds one parameter vector per row, `values` the matching value vector.
pub fn fit(
    params: &DMatrix<f64>,
    values: &DMatrix<f64>,
    config: FitConfig,
) -> Result<BezierSimplex> {
    let data = Dataset::new(params.clone(), values.clone())?;
    let report = Trainer::new(config)?.fit(&data, None)?;
    Ok(report.model)
}

/// Mean squared error over all elements.
pub fn mse(pred: &DMatrix<f64>, target: &DMatrix<f64>) -> Result<f64> {
    check_shape(pred, target)?;
    Ok((pred - target).norm_squared() / pred.len() as f64)
}

/// Mean absolute error over all elements.
pub fn mae(pred: &DMatrix<f64>, target: &DMatrix<f64>) -> Result<f64> {
    check_shape(pred, target)?;
    Ok((pred - target).abs().sum() / pred.len() as f64)
}

fn check_shape(pred: &DMatrix<f64>, target: &DMatrix<f64>) -> Result<()> {
    ensure!(
        pred.nrows() == target.nrows(),
        RowCountSnafu {
            expected: target.nrows(),
            actual: pred.nrows(),
        }
    );
    ensure!(
        pred.ncols() == target.ncols(),
        ValueShapeSnafu {
            expected: target.ncols(),
            actual: pred.ncols(),
        }
    );
    Ok(())
}
