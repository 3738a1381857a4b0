use ndarray::{Array1, Array2, ArrayView1};
use thiserror::Error;

use super::{Coefficient, CoxModel, FitDiagnostics};
use crate::dataset::{Covariate, CovariateVector, Dataset};
use crate::survival::linalg::{invert_spd, solve_spd};
use crate::survival::metrics::concordance_index;
use crate::survival::{Curve, CurvePoint};

/// Newton-Raphson settings for the partial-likelihood fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    pub max_iterations: usize,
    /// Stop once the Newton decrement falls below this value.
    pub tolerance: f64,
    pub max_step_halvings: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-9,
            max_step_halvings: 20,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FitError {
    #[error("cannot fit a model to an empty dataset")]
    EmptyDataset,
    #[error("no failures observed; every record is censored")]
    NoEvents,
    #[error("covariate {0} is constant")]
    ConstantCovariate(Covariate),
    #[error("information matrix is singular; covariates are collinear")]
    Singular,
    #[error("fit did not converge after {iterations} iterations")]
    NotConverged { iterations: usize },
    #[error("fit produced non-finite values")]
    NonFinite,
}

/// Fit a Cox model with Efron tie handling.
///
/// Covariates are standardized internally; coefficients, standard errors and
/// the baseline hazard are reported on the original scale.
pub fn fit(dataset: &Dataset, options: &FitOptions) -> Result<CoxModel, FitError> {
    let records = dataset.records();
    if records.is_empty() {
        return Err(FitError::EmptyDataset);
    }
    let events: Vec<bool> = records.iter().map(|record| record.event).collect();
    let event_count = events.iter().filter(|&&event| event).count();
    if event_count == 0 {
        return Err(FitError::NoEvents);
    }
    let durations: Vec<f64> = records.iter().map(|record| record.duration).collect();

    let p = Covariate::COUNT;
    let n = records.len();
    let mut raw = Array2::<f64>::zeros((n, p));
    for (row, record) in records.iter().enumerate() {
        for (col, &value) in record.covariates.as_slice().iter().enumerate() {
            raw[[row, col]] = value;
        }
    }
    let (means, scales) = column_moments(&raw)?;
    let mut z = raw;
    for mut row in z.rows_mut() {
        for col in 0..p {
            row[col] = (row[col] - means[col]) / scales[col];
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| durations[b].total_cmp(&durations[a]));
    let data = RiskData {
        z: &z,
        durations: &durations,
        events: &events,
        order: &order,
    };

    let mut beta = Array1::<f64>::zeros(p);
    let mut current = data.evaluate(&beta)?;
    let null_log_likelihood = current.log_likelihood;
    let mut iterations = 0;
    loop {
        let information = current.hessian.mapv(|v| -v);
        let delta = solve_spd(&information, &current.gradient).ok_or(FitError::Singular)?;
        let decrement = current.gradient.dot(&delta);
        if !decrement.is_finite() {
            return Err(FitError::NonFinite);
        }
        if decrement <= options.tolerance {
            break;
        }
        if iterations >= options.max_iterations {
            return Err(FitError::NotConverged { iterations });
        }
        iterations += 1;

        let mut step = 1.0;
        let mut halvings = 0;
        loop {
            let candidate = &beta + &(&delta * step);
            match data.evaluate(&candidate) {
                Ok(next) if next.log_likelihood >= current.log_likelihood => {
                    beta = candidate;
                    current = next;
                    break;
                }
                _ if halvings < options.max_step_halvings => {
                    step *= 0.5;
                    halvings += 1;
                }
                _ => return Err(FitError::NotConverged { iterations }),
            }
        }
    }

    let information = current.hessian.mapv(|v| -v);
    let covariance = invert_spd(&information).ok_or(FitError::Singular)?;
    let coefficients: Vec<Coefficient> = Covariate::ALL
        .into_iter()
        .enumerate()
        .map(|(j, covariate)| {
            let coef = beta[j] / scales[j];
            let std_error = covariance[[j, j]].max(0.0).sqrt() / scales[j];
            Coefficient::from_estimate(covariate, coef, std_error)
        })
        .collect();
    if coefficients
        .iter()
        .any(|c| !c.coef.is_finite() || !c.std_error.is_finite())
    {
        return Err(FitError::NonFinite);
    }

    let risk: Vec<f64> = z.rows().into_iter().map(|row| row.dot(&beta).exp()).collect();
    let baseline = breslow_baseline(&durations, &events, &risk);
    let concordance = concordance_index(&durations, &events, &risk);
    let mut mean_vector = CovariateVector::new([0.0; Covariate::COUNT]);
    for covariate in Covariate::ALL {
        mean_vector.set(covariate, means[covariate.index()]);
    }

    tracing::debug!(
        iterations,
        log_likelihood = current.log_likelihood,
        concordance,
        "Cox model converged"
    );
    Ok(CoxModel::new(
        coefficients,
        mean_vector,
        baseline,
        FitDiagnostics {
            observations: n,
            events: event_count,
            iterations,
            log_likelihood: current.log_likelihood,
            null_log_likelihood,
            concordance,
        },
    ))
}

fn column_moments(x: &Array2<f64>) -> Result<(Vec<f64>, Vec<f64>), FitError> {
    let n = x.nrows() as f64;
    let mut means = Vec::with_capacity(x.ncols());
    let mut scales = Vec::with_capacity(x.ncols());
    for (col, covariate) in x.columns().into_iter().zip(Covariate::ALL) {
        let mean = col.sum() / n;
        let variance = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let scale = variance.sqrt();
        if !scale.is_finite() || scale <= 1e-12 * mean.abs().max(1.0) {
            return Err(FitError::ConstantCovariate(covariate));
        }
        means.push(mean);
        scales.push(scale);
    }
    Ok((means, scales))
}

/// Breslow estimate of the baseline cumulative hazard on every distinct
/// duration, prefixed with `(0, 0)`.
fn breslow_baseline(durations: &[f64], events: &[bool], risk: &[f64]) -> Curve {
    let mut order: Vec<usize> = (0..durations.len()).collect();
    order.sort_by(|&a, &b| durations[a].total_cmp(&durations[b]));

    let mut at_risk: f64 = risk.iter().sum();
    let mut cumulative = 0.0;
    let mut points = vec![CurvePoint {
        time: 0.0,
        value: 0.0,
    }];
    let mut start = 0;
    while start < order.len() {
        let time = durations[order[start]];
        let end = start
            + order[start..]
                .iter()
                .take_while(|&&i| durations[i] == time)
                .count();
        let deaths = order[start..end].iter().filter(|&&i| events[i]).count();
        if deaths > 0 && at_risk > 0.0 {
            cumulative += deaths as f64 / at_risk;
        }
        if time > 0.0 {
            points.push(CurvePoint {
                time,
                value: cumulative,
            });
        } else if let Some(origin) = points.first_mut() {
            origin.value = cumulative;
        }
        at_risk -= order[start..end].iter().map(|&i| risk[i]).sum::<f64>();
        start = end;
    }
    Curve::new(points)
}

struct Evaluation {
    log_likelihood: f64,
    gradient: Array1<f64>,
    hessian: Array2<f64>,
}

/// Standardized design matrix with records ordered by decreasing duration.
struct RiskData<'a> {
    z: &'a Array2<f64>,
    durations: &'a [f64],
    events: &'a [bool],
    order: &'a [usize],
}

impl RiskData<'_> {
    /// Efron log partial likelihood with its gradient and Hessian.
    fn evaluate(&self, beta: &Array1<f64>) -> Result<Evaluation, FitError> {
        let p = beta.len();
        let mut log_likelihood = 0.0;
        let mut gradient = Array1::<f64>::zeros(p);
        let mut hessian = Array2::<f64>::zeros((p, p));

        let mut risk0 = 0.0;
        let mut risk1 = Array1::<f64>::zeros(p);
        let mut risk2 = Array2::<f64>::zeros((p, p));

        let mut start = 0;
        while start < self.order.len() {
            let time = self.durations[self.order[start]];
            let mut end = start;
            let mut tie0 = 0.0;
            let mut tie1 = Array1::<f64>::zeros(p);
            let mut tie2 = Array2::<f64>::zeros((p, p));
            let mut deaths = 0usize;
            while end < self.order.len() && self.durations[self.order[end]] == time {
                let i = self.order[end];
                let x = self.z.row(i);
                let eta = x.dot(beta);
                let r = eta.exp();
                if !r.is_finite() {
                    return Err(FitError::NonFinite);
                }
                risk0 += r;
                risk1.scaled_add(r, &x);
                add_outer(&mut risk2, x, r);
                if self.events[i] {
                    deaths += 1;
                    tie0 += r;
                    tie1.scaled_add(r, &x);
                    add_outer(&mut tie2, x, r);
                    log_likelihood += eta;
                    gradient += &x;
                }
                end += 1;
            }

            for l in 0..deaths {
                let fraction = l as f64 / deaths as f64;
                let phi0 = risk0 - fraction * tie0;
                let phi1 = &risk1 - &(&tie1 * fraction);
                let phi2 = &risk2 - &(&tie2 * fraction);
                log_likelihood -= phi0.ln();
                gradient.scaled_add(-1.0 / phi0, &phi1);
                hessian.scaled_add(-1.0 / phi0, &phi2);
                add_outer(&mut hessian, phi1.view(), 1.0 / (phi0 * phi0));
            }
            start = end;
        }

        if !log_likelihood.is_finite() {
            return Err(FitError::NonFinite);
        }
        Ok(Evaluation {
            log_likelihood,
            gradient,
            hessian,
        })
    }
}

fn add_outer(target: &mut Array2<f64>, v: ArrayView1<f64>, weight: f64) {
    let p = v.len();
    for a in 0..p {
        let va = v[a] * weight;
        for b in 0..p {
            target[[a, b]] += va * v[b];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::synthetic::synthesize_seeded;
    use crate::dataset::test_support::record;
    use crate::dataset::{DataOrigin, Dataset};
    use rand::{Rng, SeedableRng, rngs::StdRng};

    /// Records whose failure times shrink as `load` grows.
    fn load_driven_dataset(n: usize, seed: u64) -> Dataset {
        let mut rng = StdRng::seed_from_u64(seed);
        let records = (0..n)
            .map(|i| {
                let mut overrides = Vec::new();
                for covariate in Covariate::ALL {
                    overrides.push((covariate, rng.random_range(0.0..1.0)));
                }
                let load: f64 = rng.random_range(3000.0..6000.0);
                overrides[0] = (Covariate::Load, load);
                let rate = ((load - 4500.0) / 500.0).exp() * 0.02;
                let u: f64 = rng.random_range(1e-6..1.0);
                let failure = -u.ln() / rate;
                let censor = rng.random_range(20.0..200.0);
                record(i + 1, failure.min(censor), failure <= censor, &overrides)
            })
            .collect();
        Dataset::new(records, DataOrigin::Synthetic { seed: Some(seed) })
    }

    #[test]
    fn recovers_planted_load_effect() {
        let dataset = load_driven_dataset(300, 11);
        let model = fit(&dataset, &FitOptions::default()).unwrap();
        let load = model.coefficient(Covariate::Load).unwrap();
        assert!(load.hazard_ratio > 1.0);
        assert!(load.ci_low > 1.0, "ci_low = {}", load.ci_low);
        assert!((load.coef - 1.0 / 500.0).abs() < 1e-3);
        assert!(model.diagnostics().concordance > 0.7);
        assert!(model.diagnostics().likelihood_ratio() > 0.0);
    }

    #[test]
    fn fits_seeded_synthetic_data_with_every_covariate() {
        let dataset = synthesize_seeded(120, 2024);
        let model = fit(&dataset, &FitOptions::default()).unwrap();
        assert_eq!(model.coefficients().len(), Covariate::COUNT);
        for (coefficient, covariate) in model.coefficients().iter().zip(Covariate::ALL) {
            assert_eq!(coefficient.covariate, covariate);
            assert!(coefficient.hazard_ratio > 0.0);
            assert!(coefficient.ci_low <= coefficient.hazard_ratio);
            assert!(coefficient.hazard_ratio <= coefficient.ci_high);
        }
        let diagnostics = model.diagnostics();
        assert_eq!(diagnostics.observations, 120);
        assert!(diagnostics.log_likelihood >= diagnostics.null_log_likelihood);
    }

    #[test]
    fn baseline_is_non_decreasing_and_starts_at_origin() {
        let dataset = synthesize_seeded(80, 5);
        let model = fit(&dataset, &FitOptions::default()).unwrap();
        let baseline = model.baseline_cumulative_hazard();
        let first = baseline.first().unwrap();
        assert_eq!((first.time, first.value), (0.0, 0.0));
        for pair in baseline.points().windows(2) {
            assert!(pair[1].time > pair[0].time);
            assert!(pair[1].value >= pair[0].value);
        }
    }

    #[test]
    fn breslow_matches_hand_computation() {
        // Unit risks: hazard jumps are deaths / at-risk count.
        let durations = [1.0, 2.0, 2.0, 3.0, 4.0];
        let events = [true, true, false, true, false];
        let risk = [1.0; 5];
        let curve = breslow_baseline(&durations, &events, &risk);
        let values: Vec<(f64, f64)> = curve.points().iter().map(|p| (p.time, p.value)).collect();
        let expected = [
            (0.0, 0.0),
            (1.0, 0.2),
            (2.0, 0.2 + 0.25),
            (3.0, 0.2 + 0.25 + 0.5),
            (4.0, 0.2 + 0.25 + 0.5),
        ];
        assert_eq!(values.len(), expected.len());
        for ((t, v), (et, ev)) in values.iter().zip(expected) {
            assert_eq!(*t, et);
            assert!((v - ev).abs() < 1e-12);
        }
    }

    #[test]
    fn rejects_degenerate_inputs() {
        let empty = Dataset::new(Vec::new(), DataOrigin::Synthetic { seed: None });
        assert_eq!(fit(&empty, &FitOptions::default()).unwrap_err(), FitError::EmptyDataset);

        let censored = Dataset::new(
            (0..10)
                .map(|i| record(i, 5.0 + i as f64, false, &[(Covariate::Load, i as f64)]))
                .collect(),
            DataOrigin::Synthetic { seed: None },
        );
        assert_eq!(fit(&censored, &FitOptions::default()).unwrap_err(), FitError::NoEvents);

        let mut constant = synthesize_seeded(40, 8);
        let records: Vec<_> = constant
            .records()
            .iter()
            .cloned()
            .map(|mut record| {
                record.covariates.set(Covariate::Holiday, 1.0);
                record
            })
            .collect();
        constant = Dataset::new(records, DataOrigin::Synthetic { seed: None });
        assert_eq!(
            fit(&constant, &FitOptions::default()).unwrap_err(),
            FitError::ConstantCovariate(Covariate::Holiday)
        );
    }

    #[test]
    fn collinear_covariates_are_singular() {
        let base = synthesize_seeded(60, 21);
        let records: Vec<_> = base
            .records()
            .iter()
            .cloned()
            .map(|mut record| {
                let load = record.covariates.get(Covariate::Load);
                record.covariates.set(Covariate::Capacity, load * 2.0 + 10.0);
                record
            })
            .collect();
        let dataset = Dataset::new(records, DataOrigin::Synthetic { seed: None });
        assert_eq!(fit(&dataset, &FitOptions::default()).unwrap_err(), FitError::Singular);
    }

    #[test]
    fn iteration_cap_is_reported() {
        let dataset = load_driven_dataset(100, 4);
        let options = FitOptions {
            max_iterations: 0,
            ..FitOptions::default()
        };
        assert_eq!(
            fit(&dataset, &options).unwrap_err(),
            FitError::NotConverged { iterations: 0 }
        );
    }
}
