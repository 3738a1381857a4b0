//! Kaplan-Meier product-limit estimator.

use serde::Serialize;

use super::{Curve, CurvePoint};

/// Life-table row at one distinct duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KaplanMeierStep {
    pub time: f64,
    pub at_risk: usize,
    pub events: usize,
    pub censored: usize,
    pub survival: f64,
}

/// Survival estimate for one group of `(duration, event)` observations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KaplanMeierCurve {
    steps: Vec<KaplanMeierStep>,
    observations: usize,
}

impl KaplanMeierCurve {
    pub fn steps(&self) -> &[KaplanMeierStep] {
        &self.steps
    }

    pub fn observations(&self) -> usize {
        self.observations
    }

    /// Survival curve starting at `(0, 1)` with one point per distinct duration.
    pub fn survival(&self) -> Curve {
        let mut points = Vec::with_capacity(self.steps.len() + 1);
        if self.steps.first().is_none_or(|step| step.time > 0.0) {
            points.push(CurvePoint {
                time: 0.0,
                value: 1.0,
            });
        }
        points.extend(self.steps.iter().map(|step| CurvePoint {
            time: step.time,
            value: step.survival,
        }));
        Curve::new(points)
    }

    /// First time the estimate reaches 0.5 or below.
    pub fn median_survival_time(&self) -> Option<f64> {
        self.steps
            .iter()
            .find(|step| step.survival <= 0.5)
            .map(|step| step.time)
    }
}

/// Estimate the survival function of `(duration, event)` observations.
pub fn kaplan_meier(observations: &[(f64, bool)]) -> KaplanMeierCurve {
    let mut sorted = observations.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut steps = Vec::new();
    let mut at_risk = sorted.len();
    let mut survival = 1.0;
    let mut start = 0;
    while start < sorted.len() {
        let time = sorted[start].0;
        let group = sorted[start..]
            .iter()
            .take_while(|(duration, _)| *duration == time)
            .count();
        let events = sorted[start..start + group]
            .iter()
            .filter(|(_, event)| *event)
            .count();
        if events > 0 {
            survival *= 1.0 - events as f64 / at_risk as f64;
        }
        steps.push(KaplanMeierStep {
            time,
            at_risk,
            events,
            censored: group - events,
            survival,
        });
        at_risk -= group;
        start += group;
    }
    KaplanMeierCurve {
        steps,
        observations: observations.len(),
    }
}
