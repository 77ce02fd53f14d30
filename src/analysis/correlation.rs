//! Correlation functions.
//!
//! Two interchangeable correlators are provided behind the [`Correlator`]
//! trait: Spearman rank correlation and the coefficient of a single-feature
//! Lasso regression. Both reject input they cannot fit with a [`FitError`]
//! instead of returning NaN.

use crate::config::LassoConfig;
use crate::models::CorrelationType;
use thiserror::Error;
use tracing::trace;

/// Errors raised when a correlation cannot be computed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    /// Not enough paired samples.
    #[error("Insufficient data: required {required}, actual {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// The two sequences are not paired.
    #[error("Length mismatch: {left} vs {right} samples")]
    LengthMismatch { left: usize, right: usize },

    /// Input contains NaN or infinity.
    #[error("Non-finite value at sample {index}")]
    NonFinite { index: usize },

    /// An input sequence is constant.
    #[error("Zero variance in {which} input")]
    ZeroVariance { which: &'static str },

    /// The solver hit its iteration cap.
    ///
    /// With a single feature one exact coordinate update reaches the optimum,
    /// so this only triggers for an iteration cap of zero or a tolerance
    /// below the rounding noise of the duality gap.
    #[error("Solver did not converge within {max_iter} iterations (duality gap {gap:.3e})")]
    NotConverged { max_iter: usize, gap: f64 },
}

/// A correlation function over paired samples.
pub trait Correlator {
    /// Compute the correlation score of `a` (reference) against `b` (other).
    fn correlate(&self, a: &[f64], b: &[f64]) -> Result<f64, FitError>;

    /// Name used in logs and output file names.
    fn name(&self) -> &'static str;
}

/// Build the correlator selected by `kind`.
pub fn correlator_for(kind: CorrelationType, lasso: &LassoConfig) -> Box<dyn Correlator> {
    match kind {
        CorrelationType::Spearman => Box::new(Spearman),
        CorrelationType::Lasso => Box::new(Lasso::from(lasso)),
    }
}

/// Check pairing, sample count and finiteness shared by both correlators.
fn check_paired(a: &[f64], b: &[f64]) -> Result<(), FitError> {
    if a.len() != b.len() {
        return Err(FitError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    if a.len() < 2 {
        return Err(FitError::InsufficientData {
            required: 2,
            actual: a.len(),
        });
    }
    if let Some(index) = a.iter().chain(b).position(|v| !v.is_finite()) {
        return Err(FitError::NonFinite {
            index: index % a.len(),
        });
    }
    Ok(())
}

/// Spearman rank correlation: Pearson correlation of average ranks.
#[derive(Debug, Clone, Copy, Default)]
pub struct Spearman;

impl Correlator for Spearman {
    fn correlate(&self, a: &[f64], b: &[f64]) -> Result<f64, FitError> {
        check_paired(a, b)?;
        let ra = average_ranks(a);
        let rb = average_ranks(b);
        pearson(&ra, &rb)
    }

    fn name(&self) -> &'static str {
        "Spearman"
    }
}

/// 1-based ranks with ties assigned the mean of the ranks they span.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let rank = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }
    ranks
}

/// Pearson correlation coefficient.
fn pearson(x: &[f64], y: &[f64]) -> Result<f64, FitError> {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 {
        return Err(FitError::ZeroVariance { which: "reference" });
    }
    if var_y == 0.0 {
        return Err(FitError::ZeroVariance { which: "other" });
    }

    Ok((cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
}

/// Single-feature Lasso regression fitted by coordinate descent.
///
/// The feature is centered and scaled to unit L2 norm before fitting and the
/// target is centered, so the intercept drops out. The objective is
///
/// `(1 / (2n)) * ||y - x w||^2 + alpha * |w|`
///
/// and the returned coefficient is expressed in the original feature scale.
#[derive(Debug, Clone, Copy)]
pub struct Lasso {
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for Lasso {
    fn default() -> Self {
        Self::from(&LassoConfig::default())
    }
}

impl From<&LassoConfig> for Lasso {
    fn from(config: &LassoConfig) -> Self {
        Self {
            alpha: config.alpha,
            max_iter: config.max_iter,
            tol: config.tol,
        }
    }
}

impl Lasso {
    /// Fit the model and return the coefficient of the single feature.
    pub fn fit(&self, x: &[f64], y: &[f64]) -> Result<f64, FitError> {
        check_paired(x, y)?;
        let n = x.len() as f64;

        let x_mean = x.iter().sum::<f64>() / n;
        let y_mean = y.iter().sum::<f64>() / n;
        let mut xs: Vec<f64> = x.iter().map(|v| v - x_mean).collect();
        let ys: Vec<f64> = y.iter().map(|v| v - y_mean).collect();

        let x_scale = xs.iter().map(|v| v * v).sum::<f64>().sqrt();
        if x_scale == 0.0 {
            return Err(FitError::ZeroVariance { which: "reference" });
        }
        for v in xs.iter_mut() {
            *v /= x_scale;
        }

        let w = self.coordinate_descent(&xs, &ys)?;
        Ok(w / x_scale)
    }

    fn coordinate_descent(&self, x: &[f64], y: &[f64]) -> Result<f64, FitError> {
        let l1_reg = self.alpha * x.len() as f64;
        let col_sq: f64 = x.iter().map(|v| v * v).sum();
        let y_sq: f64 = y.iter().map(|v| v * v).sum();
        let tol = self.tol * y_sq;

        let mut w = 0.0;
        let mut residual = y.to_vec();
        let mut gap = f64::INFINITY;

        for iter in 0..self.max_iter {
            let w_old = w;
            let rho = dot(x, &residual) + w_old * col_sq;
            w = soft_threshold(rho, l1_reg) / col_sq;

            if w != w_old {
                let delta = w - w_old;
                for (r, xi) in residual.iter_mut().zip(x) {
                    *r -= xi * delta;
                }
            }

            let w_max = w.abs();
            let d_w = (w - w_old).abs();
            if w_max == 0.0 || d_w / w_max < self.tol || iter + 1 == self.max_iter {
                gap = duality_gap(x, y, &residual, w, l1_reg);
                trace!(iter, w, gap, "lasso gap check");
                if gap <= tol {
                    return Ok(w);
                }
            }
        }

        Err(FitError::NotConverged {
            max_iter: self.max_iter,
            gap,
        })
    }
}

impl Correlator for Lasso {
    fn correlate(&self, a: &[f64], b: &[f64]) -> Result<f64, FitError> {
        self.fit(a, b)
    }

    fn name(&self) -> &'static str {
        "Lasso"
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    value.signum() * (value.abs() - threshold).max(0.0)
}

/// Duality gap of the Lasso problem at coefficient `w` with residual `r`.
fn duality_gap(x: &[f64], y: &[f64], r: &[f64], w: f64, l1_reg: f64) -> f64 {
    let dual_norm = dot(x, r).abs();
    let r_norm2 = dot(r, r);

    let (scale, mut gap) = if dual_norm > l1_reg {
        let scale = l1_reg / dual_norm;
        (scale, 0.5 * (r_norm2 + r_norm2 * scale * scale))
    } else {
        (1.0, r_norm2)
    };
    gap += l1_reg * w.abs() - scale * dot(r, y);
    gap
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_average_ranks_with_ties() {
        let ranks = average_ranks(&[3.0, 1.0, 1.0, 2.0]);
        assert_eq!(ranks, vec![4.0, 1.5, 1.5, 3.0]);
    }

    #[test]
    fn test_spearman_perfect_monotonic() {
        let score = Spearman.correlate(&[0.1, 0.5, 0.9], &[0.2, 0.6, 0.8]).unwrap();
        assert_close(score, 1.0);

        let score = Spearman.correlate(&[1.0, 2.0, 3.0], &[9.0, 4.0, 1.0]).unwrap();
        assert_close(score, -1.0);
    }

    #[test]
    fn test_spearman_invariant_under_monotonic_transform() {
        let a = [0.3, 1.7, 0.2, 2.5, 0.9, 1.1];
        let b = [0.5, 0.4, 0.1, 0.9, 0.35, 0.8];

        let base = Spearman.correlate(&a, &b).unwrap();
        let a_exp: Vec<f64> = a.iter().map(|v: &f64| v.exp()).collect();
        let b_cubed: Vec<f64> = b.iter().map(|v| v * v * v + 4.0).collect();

        assert_close(Spearman.correlate(&a_exp, &b).unwrap(), base);
        assert_close(Spearman.correlate(&a, &b_cubed).unwrap(), base);
        assert_close(Spearman.correlate(&a_exp, &b_cubed).unwrap(), base);
    }

    #[test]
    fn test_spearman_known_value() {
        // d = [0, -1, 1, 0, 0] -> rho = 1 - 6 * 2 / (5 * 24) = 0.9
        let score = Spearman
            .correlate(&[1.0, 2.0, 3.0, 4.0, 5.0], &[1.0, 3.0, 2.0, 4.0, 5.0])
            .unwrap();
        assert_close(score, 0.9);
    }

    #[test]
    fn test_spearman_rejects_degenerate_input() {
        assert_eq!(
            Spearman.correlate(&[1.0], &[2.0]),
            Err(FitError::InsufficientData {
                required: 2,
                actual: 1
            })
        );
        assert_eq!(
            Spearman.correlate(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]),
            Err(FitError::ZeroVariance { which: "reference" })
        );
        assert_eq!(
            Spearman.correlate(&[1.0, 2.0], &[1.0, f64::NAN]),
            Err(FitError::NonFinite { index: 1 })
        );
        assert!(matches!(
            Spearman.correlate(&[1.0, 2.0], &[1.0, 2.0, 3.0]),
            Err(FitError::LengthMismatch { left: 2, right: 3 })
        ));
    }

    #[test]
    fn test_lasso_without_penalty_is_least_squares() {
        let lasso = Lasso {
            alpha: 0.0,
            max_iter: 10_000,
            tol: 1e-4,
        };
        let coef = lasso.fit(&[1.0, 2.0, 3.0, 4.0], &[2.0, 4.0, 6.0, 8.0]).unwrap();
        assert_close(coef, 2.0);
    }

    #[test]
    fn test_lasso_shrinks_coefficient() {
        // Normalized feature has unit norm, so w = soft(2 * sqrt(5), 4) and the
        // coefficient is w / sqrt(5).
        let coef = Lasso::default()
            .fit(&[1.0, 2.0, 3.0, 4.0], &[2.0, 4.0, 6.0, 8.0])
            .unwrap();
        assert_close(coef, 2.0 - 4.0 / 5.0_f64.sqrt());
    }

    #[test]
    fn test_lasso_strong_penalty_zeroes_coefficient() {
        let coef = Lasso::default()
            .fit(&[0.1, 0.2, 0.3], &[0.5, 0.4, 0.6])
            .unwrap();
        assert_eq!(coef, 0.0);
    }

    #[test]
    fn test_lasso_reports_iteration_cap() {
        let lasso = Lasso {
            alpha: 0.0,
            max_iter: 0,
            tol: 1e-4,
        };
        let err = lasso.fit(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap_err();
        assert!(matches!(err, FitError::NotConverged { max_iter: 0, .. }));
        assert!(err.to_string().contains("0 iterations"));
    }

    #[test]
    fn test_lasso_rejects_singleton_and_constant_feature() {
        let lasso = Lasso::default();
        assert!(matches!(
            lasso.fit(&[1.0], &[1.0]),
            Err(FitError::InsufficientData { .. })
        ));
        assert!(matches!(
            lasso.fit(&[2.0, 2.0], &[1.0, 3.0]),
            Err(FitError::ZeroVariance { .. })
        ));
    }

    #[test]
    fn test_correlator_for_selects_implementation() {
        let config = LassoConfig::default();
        assert_eq!(
            correlator_for(CorrelationType::Spearman, &config).name(),
            "Spearman"
        );
        assert_eq!(correlator_for(CorrelationType::Lasso, &config).name(), "Lasso");
    }
}
