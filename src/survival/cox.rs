//! Cox proportional-hazards model over the equipment covariates.

use serde::Serialize;

use super::{Curve, CurvePoint};
use crate::dataset::{Covariate, CovariateVector, EquipmentRecord};

mod train;
pub use train::{FitError, FitOptions, fit};

/// Two-sided 95% normal quantile used for coefficient intervals.
pub const Z_95: f64 = 1.959_963_984_540_054;

/// Fitted effect of one covariate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coefficient {
    pub covariate: Covariate,
    /// Log hazard ratio per unit of the covariate.
    pub coef: f64,
    pub std_error: f64,
    /// `exp(coef)`.
    pub hazard_ratio: f64,
    /// Lower 95% bound on the hazard ratio.
    pub ci_low: f64,
    /// Upper 95% bound on the hazard ratio.
    pub ci_high: f64,
    pub z: f64,
    pub p_value: f64,
}

impl Coefficient {
    pub(crate) fn from_estimate(covariate: Covariate, coef: f64, std_error: f64) -> Self {
        let z = if std_error > 0.0 { coef / std_error } else { 0.0 };
        Self {
            covariate,
            coef,
            std_error,
            hazard_ratio: coef.exp(),
            ci_low: (coef - Z_95 * std_error).exp(),
            ci_high: (coef + Z_95 * std_error).exp(),
            z,
            p_value: super::metrics::two_sided_p_value(z),
        }
    }
}

/// Convergence and goodness-of-fit summary of a fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitDiagnostics {
    pub observations: usize,
    pub events: usize,
    pub iterations: usize,
    /// Log partial likelihood at the estimate.
    pub log_likelihood: f64,
    /// Log partial likelihood with every coefficient at zero.
    pub null_log_likelihood: f64,
    /// Harrell's concordance index on the training data.
    pub concordance: f64,
}

impl FitDiagnostics {
    /// Likelihood-ratio statistic against the null model.
    pub fn likelihood_ratio(&self) -> f64 {
        2.0 * (self.log_likelihood - self.null_log_likelihood)
    }
}

/// Immutable fitted model; re-fitting produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoxModel {
    coefficients: Vec<Coefficient>,
    means: CovariateVector,
    baseline_cumulative_hazard: Curve,
    diagnostics: FitDiagnostics,
}

impl CoxModel {
    pub(crate) fn new(
        coefficients: Vec<Coefficient>,
        means: CovariateVector,
        baseline_cumulative_hazard: Curve,
        diagnostics: FitDiagnostics,
    ) -> Self {
        Self {
            coefficients,
            means,
            baseline_cumulative_hazard,
            diagnostics,
        }
    }

    /// Coefficient table in covariate order.
    pub fn coefficients(&self) -> &[Coefficient] {
        &self.coefficients
    }

    pub fn coefficient(&self, covariate: Covariate) -> Option<&Coefficient> {
        self.coefficients
            .iter()
            .find(|coefficient| coefficient.covariate == covariate)
    }

    /// Covariate means used to center the linear predictor.
    pub fn means(&self) -> &CovariateVector {
        &self.means
    }

    /// Baseline cumulative hazard at mean covariates, starting at `(0, 0)`.
    pub fn baseline_cumulative_hazard(&self) -> &Curve {
        &self.baseline_cumulative_hazard
    }

    pub fn diagnostics(&self) -> &FitDiagnostics {
        &self.diagnostics
    }

    /// Centered linear predictor `(x - mean) · beta`.
    pub fn linear_predictor(&self, covariates: &CovariateVector) -> f64 {
        self.coefficients
            .iter()
            .map(|c| (covariates.get(c.covariate) - self.means.get(c.covariate)) * c.coef)
            .sum()
    }

    /// Relative risk against a record with mean covariates.
    pub fn predict_partial_hazard(&self, record: &EquipmentRecord) -> f64 {
        self.linear_predictor(&record.covariates).exp()
    }

    /// Cumulative hazard of one record on the model time grid.
    pub fn predict_cumulative_hazard(&self, record: &EquipmentRecord) -> Curve {
        let risk = self.predict_partial_hazard(record);
        self.baseline_cumulative_hazard.map_values(|h0| h0 * risk)
    }

    /// Survival probability of one record on the model time grid.
    pub fn predict_survival(&self, record: &EquipmentRecord) -> Curve {
        let hazard = self.predict_cumulative_hazard(record);
        Curve::new(
            hazard
                .points()
                .iter()
                .map(|point| CurvePoint {
                    time: point.time,
                    value: (-point.value).exp(),
                })
                .collect(),
        )
    }
}
